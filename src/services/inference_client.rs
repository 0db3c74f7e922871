// src/services/inference_client.rs
use crate::config::ModelsConfig;
use crate::errors::NeuromarkError;
use base64::{Engine as _, engine::general_purpose};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Body sent to a model server's `/infer` route.
#[derive(Debug, Serialize)]
pub struct InferenceRequest<'a> {
    pub image: String,
    pub width: u32,
    pub height: u32,
    pub options: &'a serde_json::Value,
}

/// HTTP client for one external model server.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    client: Client,
    base_url: String,
}

impl InferenceClient {
    pub fn new(base_url: &str, models: &ModelsConfig) -> Result<Self, NeuromarkError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(models.connect_timeout_secs))
            .timeout(Duration::from_secs(models.request_timeout_secs))
            .build()
            .map_err(|e| NeuromarkError::Inference(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the model server is up and its model is loaded.
    pub async fn probe(&self) -> Result<(), String> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("model server at {} unreachable: {}", self.base_url, e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(format!(
                "model server at {} not ready ({}): {}",
                self.base_url, status, text
            ))
        }
    }

    /// Run inference on a PNG-encoded image and parse the raw model output.
    pub async fn infer<T: DeserializeOwned>(
        &self,
        png: &[u8],
        width: u32,
        height: u32,
        options: &serde_json::Value,
    ) -> Result<T, NeuromarkError> {
        let url = format!("{}/infer", self.base_url);
        let request = InferenceRequest {
            image: general_purpose::STANDARD.encode(png),
            width,
            height,
            options,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        match response.status() {
            StatusCode::OK => {
                let body = response.bytes().await?;
                Ok(serde_json::from_slice(&body)?)
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(NeuromarkError::Inference(format!(
                    "Unexpected status {} from {}: {}",
                    status, url, text
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let client = InferenceClient::new("http://models:9000/", &ModelsConfig::default()).unwrap();
        assert_eq!(client.base_url(), "http://models:9000");
    }

    #[test]
    fn request_body_carries_base64_image_and_options() {
        let options = serde_json::json!({ "conf": 0.5 });
        let request = InferenceRequest {
            image: general_purpose::STANDARD.encode([1u8, 2, 3]),
            width: 3,
            height: 1,
            options: &options,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["image"], "AQID");
        assert_eq!(json["options"]["conf"], 0.5);
    }

    #[tokio::test]
    async fn probe_reports_unreachable_server() {
        let mut models = ModelsConfig::default();
        models.connect_timeout_secs = 1;
        models.request_timeout_secs = 1;
        let client = InferenceClient::new("http://127.0.0.1:9", &models).unwrap();
        let reason = client.probe().await.unwrap_err();
        assert!(reason.contains("unreachable"));
    }
}
