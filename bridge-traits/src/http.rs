//! Outbound HTTP
//!
//! The core crates describe a request as plain data and hand it to whatever
//! [`HttpClient`] the host provides.

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A request, independent of any HTTP library
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    /// Overrides the client's default timeout for this request
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets an `application/x-www-form-urlencoded` body.
    ///
    /// Fields keep the given order; names and values are percent-encoded.
    pub fn form<K, V>(self, fields: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut encoded = String::new();
        for (name, value) in fields {
            if !encoded.is_empty() {
                encoded.push('&');
            }
            encoded.push_str(&urlencoding::encode(name.as_ref()));
            encoded.push('=');
            encoded.push_str(&urlencoding::encode(value.as_ref()));
        }

        let mut request = self.header("Content-Type", "application/x-www-form-urlencoded");
        request.body = Some(Bytes::from(encoded));
        request
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A fully-read response
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| BridgeError::OperationFailed(format!("response is not valid JSON: {}", e)))
    }

    /// Body as text, with invalid UTF-8 replaced
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Host-provided HTTP transport
///
/// One call is one attempt. A response with any status is `Ok`; only
/// transport failures (DNS, TLS, refused connection, timeout) are errors.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &'static str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::get("https://ws.audioscrobbler.com/2.0/")
            .header("Accept", "application/json")
            .timeout(Duration::from_secs(10));

        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.headers.get("Accept").map(String::as_str), Some("application/json"));
        assert_eq!(request.timeout, Some(Duration::from_secs(10)));
        assert!(request.body.is_none());
    }

    #[test]
    fn test_form_body_is_encoded_in_order() {
        let request = HttpRequest::post("https://example.com")
            .form(&[("method", "auth.getMobileSession"), ("username", "a b&c")]);

        assert_eq!(
            request.body.as_deref(),
            Some(&b"method=auth.getMobileSession&username=a%20b%26c"[..])
        );
        assert_eq!(
            request.headers.get("Content-Type").map(String::as_str),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn test_empty_form() {
        let request = HttpRequest::post("https://example.com").form::<&str, &str>(&[]);
        assert_eq!(request.body.as_deref(), Some(&b""[..]));
    }

    #[test]
    fn test_response_helpers() {
        assert!(response(204, "").is_success());
        assert!(!response(403, "").is_success());
        assert!(!response(503, "").is_success());

        let ok = response(200, r#"{"value": 3}"#);
        let parsed: serde_json::Value = ok.json().unwrap();
        assert_eq!(parsed["value"], 3);

        assert!(response(200, "<html>").json::<serde_json::Value>().is_err());
        assert_eq!(response(500, "oops").text_lossy(), "oops");
    }
}
