use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`HttpClient`] backed by `reqwest` with rustls
///
/// Non-2xx responses are returned as responses; only transport failures
/// become [`BridgeError::OperationFailed`].
#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Client whose requests give up after `timeout` unless they set their own
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("music-catalog/", env!("CARGO_PKG_VERSION")))
            .build()
            .map(Self::with_client)
            .map_err(|e| BridgeError::NotAvailable(format!("cannot build HTTP client: {}", e)))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        }
    }

    fn transport_error(error: reqwest::Error) -> BridgeError {
        let kind = if error.is_timeout() {
            "timed out"
        } else if error.is_connect() {
            "connection failed"
        } else {
            "request failed"
        };
        BridgeError::OperationFailed(format!("{}: {}", kind, error))
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
            timeout,
        } = request;
        debug!(?method, %url, "Sending HTTP request");

        let mut builder = self.client.request(Self::method(method), &url);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, %url, "HTTP request failed");
            Self::transport_error(e)
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(Self::transport_error)?;

        debug!(status, bytes = body.len(), "HTTP response received");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
