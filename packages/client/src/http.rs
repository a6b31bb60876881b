//! reqwest-backed transport for the Stimmap REST API
//!
//! Speaks the state endpoints of `stimmap-server`:
//!
//! - `GET  {base}/api/project/{uid}/state`
//! - `PUT  {base}/api/project/{uid}/state`
//!
//! A `403 Forbidden` on PUT is the conflict signal; its body is the
//! authoritative `VersionedState`, not an error envelope.

use crate::transport::{SaveOutcome, StateTransport, TransportError};
use async_trait::async_trait;
use reqwest::StatusCode;
use stimmap_core::VersionedState;

/// HTTP transport bound to one project
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    project_uid: String,
    token: String,
}

impl HttpTransport {
    pub fn new(
        base_url: impl Into<String>,
        project_uid: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_uid: project_uid.into(),
            token: token.into(),
        }
    }

    fn state_url(&self) -> String {
        format!("{}/api/project/{}/state", self.base_url, self.project_uid)
    }

    async fn decode_state(response: reqwest::Response) -> Result<VersionedState, TransportError> {
        response
            .json::<VersionedState>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl StateTransport for HttpTransport {
    async fn fetch_state(&self) -> Result<VersionedState, TransportError> {
        let response = self
            .client
            .get(self.state_url())
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::OK => Self::decode_state(response).await,
            StatusCode::UNAUTHORIZED => Err(TransportError::Denied),
            StatusCode::BAD_REQUEST => Err(TransportError::InvalidProject),
            status => Err(TransportError::UnexpectedStatus(status.as_u16())),
        }
    }

    async fn save_state(&self, candidate: &VersionedState) -> Result<SaveOutcome, TransportError> {
        let response = self
            .client
            .put(self.state_url())
            .bearer_auth(&self.token)
            .json(candidate)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::OK => Ok(SaveOutcome::Accepted(Self::decode_state(response).await?)),
            StatusCode::FORBIDDEN => Ok(SaveOutcome::Conflict(Self::decode_state(response).await?)),
            StatusCode::UNAUTHORIZED => Err(TransportError::Denied),
            StatusCode::BAD_REQUEST => Err(TransportError::InvalidProject),
            status => Err(TransportError::UnexpectedStatus(status.as_u16())),
        }
    }
}
