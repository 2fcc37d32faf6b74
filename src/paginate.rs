use serde_json::{Map, Value};

use crate::config::Credential;
use crate::error::PortalError;
use crate::http::{ApiRequest, Fetcher, RawResponse, ResponseOutcome};
use crate::record::Record;

const CURSOR_KEYS: &[&str] = &["next_page", "next", "next_cursor"];

pub struct Pages<'a, F: Fetcher> {
    fetcher: &'a F,
    credential: &'a Credential,
    endpoint: String,
    pagination_header: String,
    next_page: Option<u32>,
    buffer: std::vec::IntoIter<Record>,
}

impl<'a, F: Fetcher> Pages<'a, F> {
    pub fn new(
        fetcher: &'a F,
        credential: &'a Credential,
        endpoint: impl Into<String>,
        pagination_header: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            credential,
            endpoint: endpoint.into(),
            pagination_header: pagination_header.into(),
            next_page: Some(1),
            buffer: Vec::new().into_iter(),
        }
    }

    fn fetch_page(&self, page: u32) -> Result<(Vec<Record>, bool), PortalError> {
        let url = format!("{}?page={page}", self.endpoint);
        let response = self
            .fetcher
            .fetch(&ApiRequest::get(&url).authorized(self.credential))?;
        let records = match response.check(&format!("catalogue page {page}"))? {
            ResponseOutcome::Empty => Vec::new(),
            _ => response.decode::<Vec<Record>>(&url)?,
        };
        let has_next = has_next_page(&response, &self.pagination_header, &url)?;
        tracing::debug!(page, records = records.len(), has_next, "fetched catalogue page");
        Ok((records, has_next))
    }
}

impl<F: Fetcher> Iterator for Pages<'_, F> {
    type Item = Result<Record, PortalError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.next() {
                return Some(Ok(record));
            }
            let page = self.next_page.take()?;
            match self.fetch_page(page) {
                Ok((records, has_next)) => {
                    if has_next && !records.is_empty() {
                        self.next_page = Some(page + 1);
                    }
                    self.buffer = records.into_iter();
                }
                Err(err) => {
                    tracing::warn!(page, error = %err, "catalogue pagination aborted");
                    return Some(Err(err));
                }
            }
        }
    }
}

pub fn has_next_page(
    response: &RawResponse,
    header: &str,
    endpoint: &str,
) -> Result<bool, PortalError> {
    let Some(raw) = response.header(header) else {
        return Ok(false);
    };
    let descriptor: Map<String, Value> =
        serde_json::from_str(raw).map_err(|err| PortalError::MalformedResponse {
            endpoint: endpoint.to_string(),
            message: format!("pagination header {header}: {err}"),
        })?;
    let cursor = CURSOR_KEYS.iter().find_map(|key| descriptor.get(*key));
    Ok(match cursor {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(cursor)) => !cursor.trim().is_empty(),
        Some(_) => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_header(value: &str) -> RawResponse {
        RawResponse::new(200, "[]").with_header("X-Pagination", value)
    }

    #[test]
    fn cursor_variants() {
        let endpoint = "https://portal/genomes";
        assert!(has_next_page(&with_header(r#"{"next_page": 3}"#), "x-pagination", endpoint).unwrap());
        assert!(has_next_page(&with_header(r#"{"next": "abc"}"#), "x-pagination", endpoint).unwrap());
        assert!(!has_next_page(&with_header(r#"{"next_page": null}"#), "x-pagination", endpoint).unwrap());
        assert!(!has_next_page(&with_header(r#"{"next_page": ""}"#), "x-pagination", endpoint).unwrap());
        assert!(!has_next_page(&with_header(r#"{"total": 10}"#), "x-pagination", endpoint).unwrap());
        assert!(!has_next_page(&RawResponse::new(200, "[]"), "x-pagination", endpoint).unwrap());
        let both = r#"{"page": 1, "next_page": 2, "next": "/genomes?page=2"}"#;
        assert!(has_next_page(&with_header(both), "x-pagination", endpoint).unwrap());
        let last = r#"{"page": 5, "next_page": null, "next_cursor": ""}"#;
        assert!(!has_next_page(&with_header(last), "x-pagination", endpoint).unwrap());
    }

    #[test]
    fn malformed_descriptor_is_an_error() {
        let err = has_next_page(&with_header("next=2"), "x-pagination", "e").unwrap_err();
        assert!(matches!(err, PortalError::MalformedResponse { .. }));
    }
}
