use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::WalletSettings;

use super::error::RequestError;

/// Status and JSON body of a node response.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

impl HttpResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

/// The HTTP capability the router issues requests through. Timeouts and
/// cancellation are the implementation's concern.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, RequestError>;

    async fn post(&self, url: &str, body: &Value) -> Result<HttpResponse, RequestError>;
}

/// [`HttpTransport`] backed by a shared `reqwest` client.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    inner: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, RequestError> {
        let inner = Client::builder().timeout(timeout).build()?;
        Ok(Self { inner })
    }

    /// Client using the user's configured request timeout.
    pub fn from_settings(settings: &WalletSettings) -> Result<Self, RequestError> {
        Self::new(settings.request_timeout())
    }

    async fn read(response: reqwest::Response) -> Result<HttpResponse, RequestError> {
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, RequestError> {
        let response = self.inner.get(url).send().await?;
        Self::read(response).await
    }

    async fn post(&self, url: &str, body: &Value) -> Result<HttpResponse, RequestError> {
        let response = self.inner.post(url).json(body).send().await?;
        Self::read(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes() {
        assert!(HttpResponse::ok(Value::Null).is_success());
        assert!(!HttpResponse::new(422, Value::Null).is_success());
        assert!(HttpResponse::new(502, Value::Null).is_server_error());
        assert!(!HttpResponse::new(404, Value::Null).is_server_error());
    }

    #[test]
    fn transport_builds_from_settings() {
        let settings = WalletSettings {
            request_timeout_secs: 5,
            ..WalletSettings::default()
        };
        ReqwestTransport::from_settings(&settings).expect("transport");
    }
}
