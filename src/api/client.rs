//! Blocking HTTP client for the document endpoint

use reqwest::blocking::Client;

use super::{ApiError, ApiReply, DocumentApi, UploadRequest};

/// Holds a reqwest blocking client, the endpoint and the API key
pub struct HttpClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpClient {
    /// Builds a client without request timeout
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ApiError> {
        let endpoint = endpoint.into();
        let client = Client::builder()
            .timeout(None)
            .user_agent(concat!("gmi-upload/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport {
                endpoint: endpoint.clone(),
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
        })
    }
}

impl DocumentApi for HttpClient {
    fn upload(&self, request: &UploadRequest) -> Result<ApiReply, ApiError> {
        let transport = |e: reqwest::Error| ApiError::Transport {
            endpoint: self.endpoint.clone(),
            message: e.to_string(),
        };

        let res = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(request)
            .send()
            .map_err(transport)?;

        let status = res.status().as_u16();
        let body = res.text().map_err(transport)?;

        Ok(ApiReply { status, body })
    }

    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }
}
