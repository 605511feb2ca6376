use async_trait::async_trait;
use tracing::debug;

use crate::{error::ClientError, routes::MessageResponse, validation::SignupForm};

/// What came back from the server: the status and the `message` field, when the body had one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub message: Option<String>,
}

#[async_trait]
pub trait SignupApi: Send + Sync + 'static {
    /// Send the form. Any status the server answers with is a response, not an error;
    /// `Err` means no response was received.
    async fn signup(&self, form: &SignupForm) -> Result<ApiResponse, ClientError>;
}

pub struct HttpSignupApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSignupApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SignupApi for HttpSignupApi {
    async fn signup(&self, form: &SignupForm) -> Result<ApiResponse, ClientError> {
        let url = format!("{}/signup", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .json(form)
            .send()
            .await
            .map_err(|e| ClientError::Transport {
                source: Box::new(e),
            })?;

        let status = response.status().as_u16();
        let message = response
            .json::<MessageResponse>()
            .await
            .ok()
            .map(|body| body.message);

        debug!(%url, status, "signup response received");

        Ok(ApiResponse { status, message })
    }
}
