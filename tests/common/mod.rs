#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde_json::Value;

use genome_portal::config::{ContentRetry, Credential, Settings};
use genome_portal::domain::AuthScheme;
use genome_portal::error::PortalError;
use genome_portal::http::{ApiRequest, Fetcher, Method, RawResponse};
use genome_portal::record::Record;

pub const BASE: &str = "https://portal.test/api";

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
    pub authorized: bool,
}

/// Answers by URL. Each URL has a queue of responses; the last one repeats.
/// Unknown URLs get a 404.
#[derive(Default)]
pub struct RoutedFetcher {
    routes: Mutex<HashMap<String, VecDeque<RawResponse>>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl RoutedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: &str, response: RawResponse) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn hits(&self, url: &str) -> usize {
        self.seen().iter().filter(|req| req.url == url).count()
    }
}

impl Fetcher for RoutedFetcher {
    fn fetch(&self, request: &ApiRequest<'_>) -> Result<RawResponse, PortalError> {
        self.seen.lock().unwrap().push(SeenRequest {
            method: request.method,
            url: request.url.clone(),
            body: request.body.clone(),
            authorized: request.credential.is_some(),
        });
        let mut routes = self.routes.lock().unwrap();
        let Some(queue) = routes.get_mut(&request.url) else {
            return Ok(RawResponse::new(404, ""));
        };
        let response = if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        };
        Ok(response)
    }
}

pub fn settings() -> Settings {
    Settings {
        base_url: BASE.to_string(),
        content_retry: ContentRetry {
            attempts: 3,
            delay_ms: 0,
        },
        min_viable_size: 10,
        ..Settings::default()
    }
}

pub fn credential() -> Credential {
    Credential::new(AuthScheme::Bearer, "test-token")
}

pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub fn page_url(page: u32) -> String {
    format!("{BASE}/genomes?page={page}")
}

pub fn page(records: Value, next: Value) -> RawResponse {
    RawResponse::new(200, records.to_string())
        .with_header("X-Pagination", serde_json::json!({ "next_page": next }).to_string())
}
