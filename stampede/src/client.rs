use stampede_core::ResponseData;
use thiserror::Error;

/// Errors surfaced by an [`HttpClient`] implementation.
///
/// `Transport` failures are per-iteration data and become
/// `FailureReason::TransportError` outcomes; `Fatal` failures mean the
/// client itself is broken and crash the owning virtual user so the
/// scheduler can restart the slot with a fresh one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unrecoverable client failure: {0}")]
    Fatal(String),
}

/// The single operation the engine needs from an HTTP collaborator:
/// perform one request and hand back status and body. Connection pooling,
/// TLS, and redirects are the client's business, not the engine's.
#[trait_variant::make(HttpClient: Send)]
pub trait LocalHttpClient {
    async fn perform(&self, endpoint: &str) -> Result<ResponseData, ClientError>;
}

/// Default [`HttpClient`] backed by `reqwest`. Cloning shares the
/// underlying connection pool.
#[derive(Clone)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, ClientError> {
        let inner = reqwest::Client::builder()
            .build()
            .map_err(|err| ClientError::Fatal(err.to_string()))?;
        Ok(Self { inner })
    }
}

impl HttpClient for ReqwestClient {
    async fn perform(&self, endpoint: &str) -> Result<ResponseData, ClientError> {
        let response = self
            .inner
            .get(endpoint)
            .send()
            .await
            .map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;
        Ok(ResponseData { status, body })
    }
}

fn classify(err: reqwest::Error) -> ClientError {
    if err.is_builder() {
        ClientError::Fatal(err.to_string())
    } else {
        ClientError::Transport(err.to_string())
    }
}
