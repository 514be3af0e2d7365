use log::debug;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use std::sync::Arc;

use crate::credentials::TokenProvider;
use crate::errors::ForwardError;
use crate::models::{PredictRequest, PredictResponse, PredictionResult};

/// Forwards one payload to the prediction endpoint and reshapes the answer.
pub struct PredictionForwarder {
    http: reqwest::Client,
    endpoint_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl PredictionForwarder {
    pub fn new(http: reqwest::Client, endpoint_url: String, tokens: Arc<dyn TokenProvider>) -> Self {
        PredictionForwarder {
            http,
            endpoint_url,
            tokens,
        }
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    pub async fn forward(&self, instance: &Value) -> Result<PredictionResult, ForwardError> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|err| ForwardError::setup(format!("{err:#}")))?;

        debug!("POST {}", self.endpoint_url);

        let response = self
            .http
            .post(&self.endpoint_url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&PredictRequest::wrap(instance))
            .send()
            .await
            .map_err(ForwardError::from)?;

        let status = response.status();
        if !status.is_success() {
            let bytes = response.bytes().await.map_err(ForwardError::from)?;
            let body = serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
            return Err(ForwardError::RemoteRejection {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(ForwardError::from)?;
        let decoded: PredictResponse = serde_json::from_slice(&bytes)
            .map_err(|err| ForwardError::setup(format!("unreadable prediction response: {err}")))?;
        Ok(decoded.into_result())
    }
}
