//! HTTP types and the executor seam.
//!
//! # Design
//! Requests and responses are described as plain data. `Transport` builds an
//! `HttpRequest`, hands it to an [`HttpExecutor`] for the single round trip,
//! and parses the resulting `HttpResponse`. Production code executes with
//! [`UreqExecutor`]; tests substitute a scripted executor so request
//! construction and response decoding stay deterministic.

use std::fmt;
use std::time::Duration;

use crate::error::{ApiError, Result};

/// Client-side bound on every call, connect through body read.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// HTTP method for a request. The API surface in use never deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute and already carries the encoded query string, including
/// the credentials, so it must never be logged.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.url.split('?').next().unwrap_or_default();
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("path", &path)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .finish()
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Performs exactly one HTTP round trip.
///
/// Implementations return every status code as data. Only faults that
/// prevent a response from being read (DNS, connect, TLS, timeout) are
/// errors, and those must be reported as [`ApiError::Transport`].
pub trait HttpExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

impl<E: HttpExecutor + ?Sized> HttpExecutor for &E {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        (**self).execute(request)
    }
}

/// Blocking executor backed by a `ureq` agent.
#[derive(Clone)]
pub struct UreqExecutor {
    agent: ureq::Agent,
}

impl fmt::Debug for UreqExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqExecutor").finish_non_exhaustive()
    }
}

impl UreqExecutor {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpExecutor for UreqExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let url = request.url.as_str();
        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(url), &request.headers).call(),
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(url), &request.headers).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => with_headers(self.agent.post(url), &request.headers).send_empty(),
            (HttpMethod::Put, Some(body)) => {
                with_headers(self.agent.put(url), &request.headers).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => with_headers(self.agent.put(url), &request.headers).send_empty(),
        };
        let mut response = result.map_err(ApiError::transport)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(ApiError::transport)?;

        Ok(HttpResponse { status, headers, body })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_omits_query_string() {
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: "https://api.trello.com/1/boards/b1/lists?key=k&token=secret".to_string(),
            headers: Vec::new(),
            body: None,
        };
        let rendered = format!("{req:?}");
        assert!(rendered.contains("/1/boards/b1/lists"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn method_names_are_uppercase() {
        assert_eq!(HttpMethod::Get.to_string(), "GET");
        assert_eq!(HttpMethod::Post.to_string(), "POST");
        assert_eq!(HttpMethod::Put.to_string(), "PUT");
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        let executor = UreqExecutor::with_timeout(Duration::from_secs(2));
        let req = HttpRequest {
            method: HttpMethod::Get,
            // Nothing listens on the discard port.
            url: "http://127.0.0.1:9/1/members/me/boards".to_string(),
            headers: Vec::new(),
            body: None,
        };
        let err = executor.execute(&req).unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[test]
    fn silent_server_times_out_as_transport_error() {
        // Connections queue in the backlog; nothing ever answers.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let executor = UreqExecutor::with_timeout(Duration::from_millis(200));
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: format!("http://{addr}/1/members/me/boards"),
            headers: Vec::new(),
            body: None,
        };

        let started = std::time::Instant::now();
        let err = executor.execute(&req).unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(5));
        match err {
            ApiError::Transport(source) => assert!(matches!(
                source.downcast_ref::<ureq::Error>(),
                Some(ureq::Error::Timeout(_))
            )),
            other => panic!("expected Transport, got {other:?}"),
        }
        drop(listener);
    }
}
