//! reqwest-backed transport for the triage service HTTP contract.

use async_trait::async_trait;
use reqwest::Client;
use shared::{
    error::TransportError,
    protocol::{ChatErrorBody, ChatRequest, HealthTipsResponse, TriageReply},
};
use tracing::debug;

use crate::TriageTransport;

pub struct HttpTriageTransport {
    http: Client,
    base_url: String,
}

impl HttpTriageTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl TriageTransport for HttpTriageTransport {
    async fn send_chat(&self, message: &str) -> Result<TriageReply, TransportError> {
        let response = self
            .http
            .post(format!("{}/chat", self.base_url))
            .json(&ChatRequest {
                message: message.to_string(),
            })
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;

        let status = response.status();
        debug!(status = status.as_u16(), "chat response received");
        if !status.is_success() {
            let error_message = response
                .json::<ChatErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error);
            return Err(TransportError::Status {
                status: status.as_u16(),
                error_message,
            });
        }

        response
            .json::<TriageReply>()
            .await
            .map_err(|err| TransportError::Network(format!("invalid chat response body: {err}")))
    }

    async fn fetch_health_tips(&self) -> Result<Vec<String>, TransportError> {
        let response = self
            .http
            .get(format!("{}/health-tips", self.base_url))
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_message = response
                .json::<ChatErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error);
            return Err(TransportError::Status {
                status: status.as_u16(),
                error_message,
            });
        }

        let body: HealthTipsResponse = response.json().await.map_err(|err| {
            TransportError::Network(format!("invalid health tips response body: {err}"))
        })?;
        Ok(body.tips)
    }
}
