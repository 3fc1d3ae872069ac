use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use shared::protocol::{AskRequest, AskResponse, LoadUrlRequest, ASK_ROUTE, LOAD_URL_ROUTE};

use crate::{
    config::ClientSettings,
    error::{BackendError, Operation},
    QaBackend,
};

/// JSON-over-HTTP client for the question-answering service.
pub struct HttpQaBackend {
    http: Client,
    base_url: String,
}

impl HttpQaBackend {
    pub fn new(settings: &ClientSettings) -> Result<Self, BackendError> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        operation: Operation,
        route: &str,
        body: &B,
    ) -> Result<Vec<u8>, BackendError> {
        let response = self
            .http
            .post(format!("{}{route}", self.base_url))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(BackendError::rejected(operation, status, &bytes));
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl QaBackend for HttpQaBackend {
    async fn load_url(&self, request: &LoadUrlRequest) -> Result<(), BackendError> {
        self.post_json(Operation::LoadUrl, LOAD_URL_ROUTE, request)
            .await
            .map(|_| ())
    }

    async fn ask(&self, request: &AskRequest) -> Result<String, BackendError> {
        let body = self.post_json(Operation::Ask, ASK_ROUTE, request).await?;
        let response: AskResponse = serde_json::from_slice(&body)
            .map_err(|e| BackendError::MalformedResponse(format!("missing answer: {e}")))?;
        Ok(response.answer)
    }
}
