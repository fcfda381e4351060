//! Admin API client (admin dashboard → evreg server).
//!
//! All requests carry the plaintext admin secret in the
//! `Evreg-Admin-Authorization` header.

use reqwest::Client;
use url::Url;
use uuid::Uuid;

use super::{ClientError, parse_response};
use crate::objects::{ADMIN_AUTH_HEADER, EventSummary, RestoreEventResponse, SweepResponse};

/// Typed HTTP client for the evreg **Admin API**.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: Client,
    base_url: Url,
    admin_secret: String,
}

impl AdminClient {
    pub fn new(base_url: Url, admin_secret: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            admin_secret: admin_secret.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `GET /admin/events/archived` – list archived events.
    pub async fn archived_events(&self) -> Result<Vec<EventSummary>, ClientError> {
        let url = self.base_url.join("/admin/events/archived")?;
        let resp = self
            .http
            .get(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `POST /admin/events/{event_id}/restore` – flip an archived event back
    /// to published.
    pub async fn restore_event(
        &self,
        event_id: Uuid,
    ) -> Result<RestoreEventResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/admin/events/{event_id}/restore"))?;
        let resp = self
            .http
            .post(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `POST /admin/sweeps/archive` – run the archival sweep now.
    pub async fn trigger_archival_sweep(&self) -> Result<SweepResponse, ClientError> {
        let url = self.base_url.join("/admin/sweeps/archive")?;
        let resp = self
            .http
            .post(url)
            .header(ADMIN_AUTH_HEADER, &self.admin_secret)
            .send()
            .await?;
        parse_response(resp).await
    }
}
