use std::thread;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde_json::Value;

use crate::config::ContentRetry;
use crate::content::{MarkerRule, suffixed_file_name};
use crate::domain::{ArtifactKind, AssemblyId};
use crate::error::PortalError;
use crate::http::{ApiRequest, Fetcher, RawResponse};
use crate::record::scalar_text;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadLink {
    pub url: String,
    pub filename: String,
    pub raw: Value,
}

impl DownloadLink {
    pub fn from_json(
        raw: Value,
        kind: ArtifactKind,
        id: &AssemblyId,
        endpoint: &str,
    ) -> Result<Self, PortalError> {
        let url = raw
            .get("url")
            .and_then(Value::as_str)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| PortalError::MalformedResponse {
                endpoint: endpoint.to_string(),
                message: "download link response has no url".to_string(),
            })?
            .to_string();
        let filename = ["filename", "file_name", "name"]
            .iter()
            .find_map(|key| raw.get(*key).and_then(scalar_text))
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("{}.{}", id.as_str(), kind.default_extension()));
        Ok(Self { url, filename, raw })
    }
}

#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    pub link_only: bool,
    pub force: bool,
    pub directory: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DownloadOutcome {
    LinkOnly,
    Written,
    Overwritten,
    Renamed,
    Skipped,
    WriteFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadReport {
    pub kind: ArtifactKind,
    pub assembly_id: String,
    pub link: DownloadLink,
    pub outcome: DownloadOutcome,
    pub path: Option<String>,
    pub version: Option<String>,
    pub previous_version: Option<String>,
}

impl DownloadReport {
    pub fn completed(&self) -> bool {
        !matches!(self.outcome, DownloadOutcome::WriteFailed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    WriteNew,
    Overwrite { existing: Option<String> },
    Skip { target: Utf8PathBuf, existing: Option<String> },
    RenameAndWrite { target: Utf8PathBuf, existing: String },
}

pub struct Reconciler<'a, F: Fetcher> {
    fetcher: &'a F,
    retry: ContentRetry,
    min_viable_size: u64,
}

impl<'a, F: Fetcher> Reconciler<'a, F> {
    pub fn new(fetcher: &'a F, retry: ContentRetry, min_viable_size: u64) -> Self {
        Self {
            fetcher,
            retry,
            min_viable_size,
        }
    }

    pub fn await_content(&self, url: &str) -> Result<String, PortalError> {
        let attempts = self.retry.attempts.max(1);
        for attempt in 1..=attempts {
            let response = self.fetcher.fetch(&ApiRequest::get(url))?;
            if content_ready(&response) {
                return Ok(response.body);
            }
            tracing::info!(
                attempt,
                attempts,
                status = response.status,
                "artifact content not ready"
            );
            if attempt < attempts {
                thread::sleep(self.retry.delay());
            }
        }
        Err(PortalError::ContentNotReady {
            url: url.to_string(),
            attempts,
        })
    }

    pub fn decide(
        &self,
        path: &Utf8Path,
        rule: &MarkerRule,
        fresh: Option<&str>,
        force: bool,
    ) -> Decision {
        if !self.is_viable(path) {
            return Decision::WriteNew;
        }
        let existing = Store::read_lossy(path)
            .ok()
            .and_then(|text| rule.extract(&text));
        if force {
            return Decision::Overwrite { existing };
        }
        match (existing, fresh) {
            (Some(old), Some(new)) if old == new => Decision::Skip {
                target: path.to_path_buf(),
                existing: Some(old),
            },
            (Some(old), Some(new)) => {
                let file_name = path.file_name().unwrap_or(path.as_str());
                let target = path.with_file_name(suffixed_file_name(file_name, new));
                if self.is_viable(&target) {
                    Decision::Skip {
                        target,
                        existing: Some(old),
                    }
                } else {
                    Decision::RenameAndWrite {
                        target,
                        existing: old,
                    }
                }
            }
            (existing, _) => Decision::Overwrite { existing },
        }
    }

    pub fn reconcile(
        &self,
        kind: ArtifactKind,
        id: &AssemblyId,
        link: DownloadLink,
        store: &Store,
        force: bool,
    ) -> Result<DownloadReport, PortalError> {
        let content = self.await_content(&link.url)?;
        let rule = MarkerRule::for_kind(kind);
        let version = rule.extract(&content);
        let path = store.artifact_path(&link.filename)?;
        let decision = self.decide(&path, &rule, version.as_deref(), force);
        tracing::debug!(?decision, %path, "download decision");

        let (outcome, target, previous_version) = match decision {
            Decision::Skip { target, existing } => {
                tracing::info!(%target, "local {kind} is already up to date");
                (DownloadOutcome::Skipped, target, existing)
            }
            Decision::WriteNew => (
                write_or_warn(&path, &content, DownloadOutcome::Written),
                path,
                None,
            ),
            Decision::Overwrite { existing } => (
                write_or_warn(&path, &content, DownloadOutcome::Overwritten),
                path,
                existing,
            ),
            Decision::RenameAndWrite { target, existing } => {
                tracing::info!(
                    previous = %existing,
                    %target,
                    "{kind} version changed; keeping existing file"
                );
                (
                    write_or_warn(&target, &content, DownloadOutcome::Renamed),
                    target,
                    Some(existing),
                )
            }
        };

        Ok(DownloadReport {
            kind,
            assembly_id: id.as_str().to_string(),
            link,
            outcome,
            path: Some(target.to_string()),
            version,
            previous_version,
        })
    }

    fn is_viable(&self, path: &Utf8Path) -> bool {
        Store::file_size(path).is_some_and(|size| size >= self.min_viable_size)
    }
}

fn write_or_warn(path: &Utf8Path, content: &str, success: DownloadOutcome) -> DownloadOutcome {
    match Store::write_bytes_atomic(path, content.as_bytes()) {
        Ok(()) => success,
        Err(err) => {
            tracing::warn!(%path, error = %err, "failed to write download");
            DownloadOutcome::WriteFailed {
                message: err.to_string(),
            }
        }
    }
}

fn content_ready(response: &RawResponse) -> bool {
    if !response.is_success() {
        return false;
    }
    let body = response.body.trim_start();
    if body.is_empty() {
        return false;
    }
    let head: String = body.chars().take(512).collect();
    !(head.contains("<Error>") || head.contains("NoSuchKey"))
}
