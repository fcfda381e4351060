//! Admission notification dispatch.
//!
//! Delivery is best-effort and fully decoupled from the admission
//! transaction: a failed notice is logged and surfaced as a soft warning,
//! never as a rollback.

use crate::entities::Credential;
use async_trait::async_trait;
use evreg_sdk::objects::AdmissionNoticePayload;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;
use url::Url;
use uuid::Uuid;

/// What a notice carries; the receiver forwards the credential to the
/// participant through whatever channel it owns.
#[derive(Debug, Clone)]
pub struct AdmissionNotice {
    pub registration_id: Uuid,
    pub participant_id: Uuid,
    pub event_id: Uuid,
    pub event_title: String,
    pub credential: Credential,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("http error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("notification endpoint returned status {status}")]
    Rejected { status: u16 },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_admission(&self, notice: &AdmissionNotice) -> Result<(), NotifyError>;
}

/// POSTs the admission payload to a configured webhook endpoint.
pub struct WebhookNotifier {
    endpoint: Url,
    http: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_admission(&self, notice: &AdmissionNotice) -> Result<(), NotifyError> {
        let payload = AdmissionNoticePayload {
            event_type: "registration_admitted".to_owned(),
            registration_id: notice.registration_id,
            participant_id: notice.participant_id,
            event_id: notice.event_id,
            event_title: notice.event_title.clone(),
            credential: notice.credential.to_string(),
            expires_at: notice.expires_at.unix_timestamp(),
            timestamp: OffsetDateTime::now_utc().unix_timestamp(),
        };

        let response = self.http.post(self.endpoint.clone()).json(&payload).send().await?;
        let status = response.status();
        if status.is_success() {
            debug!(registration_id = %notice.registration_id, "Admission notice delivered");
            Ok(())
        } else {
            Err(NotifyError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

/// Swallows notices; used by tests and deployments without a webhook.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify_admission(&self, _notice: &AdmissionNotice) -> Result<(), NotifyError> {
        Ok(())
    }
}
