//! Authenticated request layer for the Trello REST API.
//!
//! # Design
//! `Transport` holds the base URL, the credentials and an executor, and
//! carries no mutable state between calls. A call is split the same way the
//! rest of the crate is: `build_request` produces an `HttpRequest`,
//! the executor performs the round trip, and `parse_response` turns the
//! `HttpResponse` into a value or an `ApiError`. Every call is made exactly
//! once; nothing is retried or cached.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::config::{Config, Credentials, DEFAULT_BASE_URL};
use crate::error::{ApiError, Result};
use crate::http::{HttpExecutor, HttpMethod, HttpRequest, HttpResponse, UreqExecutor};

/// Query or form parameters. Sorted, so encoding is deterministic.
pub type Params = BTreeMap<String, String>;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Build a [`Params`] map from string pairs.
pub fn params<K, V, I>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Percent-encode `id` so it occupies exactly one path segment.
pub fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

#[derive(Debug, Clone)]
pub struct Transport<E = UreqExecutor> {
    base_url: String,
    credentials: Credentials,
    executor: E,
}

impl Transport<UreqExecutor> {
    /// Transport against the public API with the default 20 second timeout.
    pub fn new(credentials: Credentials) -> Self {
        Self::with_executor(DEFAULT_BASE_URL, credentials, UreqExecutor::new())
    }

    /// Transport for a loaded configuration. Fails before any network access
    /// when the key or token is blank.
    pub fn from_config(config: &Config) -> Result<Self> {
        let credentials = config.credentials()?;
        Ok(Self::with_executor(
            &config.base_url,
            credentials,
            UreqExecutor::new(),
        ))
    }
}

impl<E: HttpExecutor> Transport<E> {
    pub fn with_executor(base_url: &str, credentials: Credentials, executor: E) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            executor,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Execute one call and decode the body into `T`.
    ///
    /// Returns `Ok(None)` when the API answers 2xx with an empty body.
    pub fn invoke<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        query: &Params,
        form: Option<&Params>,
    ) -> Result<Option<T>> {
        let response = self.round_trip(method, path, query, form)?;
        parse_response(response)
    }

    /// Execute one call whose body is not needed. Only the status is checked.
    pub fn send(
        &self,
        method: HttpMethod,
        path: &str,
        query: &Params,
        form: Option<&Params>,
    ) -> Result<()> {
        let response = self.round_trip(method, path, query, form)?;
        check_status(&response)
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str, query: &Params) -> Result<Option<T>> {
        self.invoke(HttpMethod::Get, path, query, None)
    }

    pub fn post<T: DeserializeOwned>(&self, path: &str, form: &Params) -> Result<Option<T>> {
        self.invoke(HttpMethod::Post, path, &Params::new(), Some(form))
    }

    pub fn put<T: DeserializeOwned>(&self, path: &str, form: &Params) -> Result<Option<T>> {
        self.invoke(HttpMethod::Put, path, &Params::new(), Some(form))
    }

    /// Build the request for a call without executing it.
    ///
    /// `key` and `token` are always set from the credentials, replacing any
    /// caller entries of the same name. The form is encoded as the body only
    /// for non-GET calls.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        query: &Params,
        form: Option<&Params>,
    ) -> Result<HttpRequest> {
        let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&joined)
            .map_err(|e| ApiError::config(format!("invalid API URL {:?}: {e}", self.base_url)))?;

        let mut query = query.clone();
        query.insert("key".to_string(), self.credentials.key().to_string());
        query.insert("token".to_string(), self.credentials.token().to_string());
        url.query_pairs_mut().clear().extend_pairs(query.iter());

        let body = match (method, form) {
            (HttpMethod::Get, _) | (_, None) => None,
            (_, Some(form)) => Some(encode_form(form)),
        };
        let headers = if body.is_some() {
            vec![("content-type".to_string(), FORM_CONTENT_TYPE.to_string())]
        } else {
            Vec::new()
        };

        Ok(HttpRequest {
            method,
            url: url.into(),
            headers,
            body,
        })
    }

    fn round_trip(
        &self,
        method: HttpMethod,
        path: &str,
        query: &Params,
        form: Option<&Params>,
    ) -> Result<HttpResponse> {
        let request = self.build_request(method, path, query, form)?;
        tracing::debug!(%method, path, "trello request");
        let response = self.executor.execute(&request)?;
        tracing::debug!(%method, path, status = response.status, "trello response");
        Ok(response)
    }
}

/// Decode a response into `T`, or classify the failure.
///
/// Status >= 300 becomes [`ApiError::Remote`]. A blank success body is
/// `Ok(None)`; any other body must be valid JSON for `T`.
pub fn parse_response<T: DeserializeOwned>(response: HttpResponse) -> Result<Option<T>> {
    check_status(&response)?;
    if response.body.trim().is_empty() {
        return Ok(None);
    }
    let value = serde_json::from_str(&response.body)?;
    Ok(Some(value))
}

fn check_status(response: &HttpResponse) -> Result<()> {
    if response.status < 300 {
        return Ok(());
    }
    let message = remote_message(&response.body);
    tracing::debug!(status = response.status, %message, "trello API error");
    Err(ApiError::Remote {
        status: response.status,
        message,
    })
}

/// `message`, then `error`, then the trimmed raw body, then `"error"`.
///
/// Envelope fields are read independently; a field of another JSON type is
/// skipped without discarding its sibling.
fn remote_message(body: &str) -> String {
    let envelope: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let field = |name: &str| {
        envelope
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    if let Some(message) = field("message").or_else(|| field("error")) {
        return message;
    }
    let raw = body.trim();
    if raw.is_empty() {
        "error".to_string()
    } else {
        raw.to_string()
    }
}

fn encode_form(form: &Params) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(form.iter())
        .finish()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    /// Executor that replays canned responses and records every request.
    #[derive(Debug, Default)]
    pub struct ScriptedExecutor {
        responses: RefCell<VecDeque<Result<HttpResponse>>>,
        requests: RefCell<Vec<HttpRequest>>,
    }

    impl ScriptedExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, status: u16, body: &str) -> Self {
            self.responses.borrow_mut().push_back(Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.to_string(),
            }));
            self
        }

        pub fn fail(self, err: ApiError) -> Self {
            self.responses.borrow_mut().push_back(Err(err));
            self
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.borrow().clone()
        }

        pub fn calls(&self) -> usize {
            self.requests.borrow().len()
        }
    }

    impl HttpExecutor for ScriptedExecutor {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.requests.borrow_mut().push(request.clone());
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| panic!("no scripted response for {request:?}"))
        }
    }

    pub fn transport(executor: ScriptedExecutor) -> Transport<ScriptedExecutor> {
        let credentials = Credentials::new("test-key", "test-token").unwrap();
        Transport::with_executor("https://api.trello.com/", credentials, executor)
    }

    /// Decoded query pairs of a built request URL.
    pub fn query_of(request: &HttpRequest) -> Vec<(String, String)> {
        Url::parse(&request.url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }
}
