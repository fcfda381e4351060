//! Participant API client (participant-facing frontend → evreg server).

use reqwest::Client;
use url::Url;
use uuid::Uuid;

use super::{ClientError, parse_response};
use crate::objects::{
    AdmitRequest, AdmitResponse, AttendanceAvailability, HistoryEntry, RedeemRequest,
    RedeemResponse, VerifyRequest, VerifyResponse,
};

/// Typed HTTP client for the evreg **Participant API**.
#[derive(Debug, Clone)]
pub struct ParticipantClient {
    http: Client,
    base_url: Url,
}

impl ParticipantClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /api/v1/events/{event_id}/registrations` – register for an
    /// event and receive an attendance credential.
    pub async fn admit(
        &self,
        event_id: Uuid,
        participant_id: Uuid,
    ) -> Result<AdmitResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/events/{event_id}/registrations"))?;
        let resp = self
            .http
            .post(url)
            .json(&AdmitRequest { participant_id })
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `GET /api/v1/events/{event_id}/attendance` – is the attendance window
    /// open right now?
    pub async fn attendance_availability(
        &self,
        event_id: Uuid,
    ) -> Result<AttendanceAvailability, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/events/{event_id}/attendance"))?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `POST /api/v1/attendance/verify` – check a credential without
    /// spending it.
    pub async fn verify_token(
        &self,
        credential: impl Into<String>,
        event_id: Uuid,
    ) -> Result<VerifyResponse, ClientError> {
        let url = self.base_url.join("/api/v1/attendance/verify")?;
        let resp = self
            .http
            .post(url)
            .json(&VerifyRequest {
                credential: credential.into(),
                event_id,
            })
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `POST /api/v1/attendance/redeem` – spend a credential for an
    /// attendance record.
    pub async fn redeem_token(
        &self,
        credential: impl Into<String>,
        event_id: Uuid,
    ) -> Result<RedeemResponse, ClientError> {
        let url = self.base_url.join("/api/v1/attendance/redeem")?;
        let resp = self
            .http
            .post(url)
            .json(&RedeemRequest {
                credential: credential.into(),
                event_id,
            })
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `GET /api/v1/participants/{participant_id}/history` – registration
    /// and attendance history, archived events included.
    pub async fn history(
        &self,
        participant_id: Uuid,
    ) -> Result<Vec<HistoryEntry>, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/participants/{participant_id}/history"))?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }
}
