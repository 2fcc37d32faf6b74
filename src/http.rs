use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::Credential;
use crate::domain::AuthScheme;
use crate::error::PortalError;

pub const API_KEY_HEADER: &str = "X-API-Key";

const AUTH_MARKERS: &[&str] = &[
    "membership",
    "not authorized",
    "unauthorized",
    "invalid token",
    "access denied",
];
const NOT_FOUND_MARKERS: &[&str] = &["not found"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct ApiRequest<'a> {
    pub method: Method,
    pub url: String,
    pub credential: Option<&'a Credential>,
    pub body: Option<Value>,
}

impl<'a> ApiRequest<'a> {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            credential: None,
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            credential: None,
            body: Some(body),
        }
    }

    pub fn authorized(mut self, credential: &'a Credential) -> Self {
        self.credential = Some(credential);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    headers: BTreeMap<String, String>,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn outcome(&self) -> ResponseOutcome {
        classify_response(&self.body, self.status)
    }

    /// Turns failure outcomes into errors; `Ok` and `Empty` pass through.
    pub fn check(&self, context: &str) -> Result<ResponseOutcome, PortalError> {
        match self.outcome() {
            ResponseOutcome::Unauthorized => {
                Err(PortalError::Authorization(snippet(&self.body, context)))
            }
            ResponseOutcome::NotFound => Err(PortalError::NotFound(context.to_string())),
            ResponseOutcome::Failed(status) => Err(PortalError::HttpStatus {
                status,
                message: snippet(&self.body, context),
            }),
            outcome @ (ResponseOutcome::Ok | ResponseOutcome::Empty) => Ok(outcome),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, PortalError> {
        serde_json::from_str(&self.body).map_err(|err| PortalError::MalformedResponse {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    Ok,
    Unauthorized,
    NotFound,
    Empty,
    Failed(u16),
}

const ENVELOPE_KEYS: &[&str] = &["detail", "message", "error"];

pub fn classify_response(body: &str, status: u16) -> ResponseOutcome {
    match status {
        401 | 403 => return ResponseOutcome::Unauthorized,
        404 => return ResponseOutcome::NotFound,
        200..=299 => {}
        other => return ResponseOutcome::Failed(other),
    }

    let trimmed = body.trim();
    if matches!(trimmed, "" | "[]" | "{}" | "null") {
        return ResponseOutcome::Empty;
    }

    let notice = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(_)) => return ResponseOutcome::Ok,
        Ok(Value::Object(map)) => {
            if !map.keys().all(|key| ENVELOPE_KEYS.contains(&key.as_str())) {
                return ResponseOutcome::Ok;
            }
            map.values()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ")
        }
        Ok(Value::String(text)) => text,
        Ok(_) => return ResponseOutcome::Ok,
        Err(_) => trimmed.to_string(),
    };

    let lowered = notice.to_lowercase();
    if AUTH_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        ResponseOutcome::Unauthorized
    } else if NOT_FOUND_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        ResponseOutcome::NotFound
    } else {
        ResponseOutcome::Ok
    }
}

fn snippet(body: &str, context: &str) -> String {
    let text: String = body.trim().chars().take(200).collect();
    if text.is_empty() {
        context.to_string()
    } else {
        format!("{context}: {text}")
    }
}

pub trait Fetcher {
    fn fetch(&self, request: &ApiRequest<'_>) -> Result<RawResponse, PortalError>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch(&self, request: &ApiRequest<'_>) -> Result<RawResponse, PortalError> {
        (**self).fetch(request)
    }
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, PortalError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("genome-portal/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| PortalError::Transport(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| PortalError::Transport(err.to_string()))?;
        Ok(Self { client })
    }

    fn build(&self, request: &ApiRequest<'_>) -> reqwest::blocking::RequestBuilder {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        if let Some(credential) = request.credential {
            builder = match credential.scheme() {
                AuthScheme::Bearer => builder.bearer_auth(credential.secret()),
                AuthScheme::ApiKey => builder.header(API_KEY_HEADER, credential.secret()),
            };
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, PortalError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(status, delay_ms = delay, "retrying portal request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        tracing::debug!(error = %err, delay_ms = delay, "retrying portal request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(PortalError::Transport(err.to_string()));
                }
            }
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, request: &ApiRequest<'_>) -> Result<RawResponse, PortalError> {
        let response = self.send_with_retries(|| self.build(request))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_ascii_lowercase(), value.to_string()))
            })
            .collect();
        let body = response
            .text()
            .map_err(|err| PortalError::Transport(err.to_string()))?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
