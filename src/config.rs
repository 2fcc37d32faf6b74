use std::fmt;
use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::AuthScheme;
use crate::error::PortalError;

pub const DEFAULT_CONFIG_FILE: &str = "genome-portal.json";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub auth_scheme: AuthScheme,
    pub api_key_env: String,
    pub pagination_header: String,
    pub download_dir: Utf8PathBuf,
    pub catalogue_path: Option<Utf8PathBuf>,
    pub fuzzy_threshold: u8,
    pub id_prefix: String,
    pub min_viable_size: u64,
    pub content_retry: ContentRetry,
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "https://genomes.atcc.org/api".to_string(),
            auth_scheme: AuthScheme::Bearer,
            api_key_env: "GENOME_PORTAL_API_KEY".to_string(),
            pagination_header: "x-pagination".to_string(),
            download_dir: Utf8PathBuf::from("."),
            catalogue_path: None,
            fuzzy_threshold: 75,
            id_prefix: "ATCC".to_string(),
            min_viable_size: 100,
            content_retry: ContentRetry::default(),
            timeout_secs: 60,
        }
    }
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Polling budget for signed content URLs that are not yet materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ContentRetry {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for ContentRetry {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay_ms: 2000,
        }
    }
}

impl ContentRetry {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<Settings, PortalError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| PortalError::ConfigRead(config_path.clone()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Settings, PortalError> {
        let settings: Settings =
            serde_json::from_str(content).map_err(|err| PortalError::ConfigParse(err.to_string()))?;
        if settings.content_retry.attempts == 0 {
            return Err(PortalError::ConfigParse(
                "content_retry.attempts must be at least 1".to_string(),
            ));
        }
        if settings.fuzzy_threshold > 100 {
            return Err(PortalError::ConfigParse(
                "fuzzy_threshold must be between 0 and 100".to_string(),
            ));
        }
        Ok(settings)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    scheme: AuthScheme,
    secret: String,
}

impl Credential {
    pub fn new(scheme: AuthScheme, secret: impl Into<String>) -> Self {
        Self {
            scheme,
            secret: secret.into(),
        }
    }

    pub fn scheme(&self) -> AuthScheme {
        self.scheme
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn resolve(explicit: Option<&str>, settings: &Settings) -> Result<Self, PortalError> {
        Self::resolve_with(
            explicit,
            settings,
            |name| std::env::var(name).ok(),
            prompt_for_key,
        )
    }

    pub fn resolve_with<E, P>(
        explicit: Option<&str>,
        settings: &Settings,
        env: E,
        prompt: P,
    ) -> Result<Self, PortalError>
    where
        E: Fn(&str) -> Option<String>,
        P: FnOnce() -> Option<String>,
    {
        let secret = explicit
            .map(str::to_string)
            .filter(|value| !value.trim().is_empty())
            .or_else(|| env(&settings.api_key_env).filter(|value| !value.trim().is_empty()))
            .or_else(|| prompt().filter(|value| !value.trim().is_empty()))
            .ok_or_else(|| PortalError::MissingCredential(settings.api_key_env.clone()))?;
        Ok(Self::new(settings.auth_scheme, secret.trim()))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("scheme", &self.scheme)
            .field("secret", &"<redacted>")
            .finish()
    }
}

fn prompt_for_key() -> Option<String> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return None;
    }
    eprint!("Genome portal API key: ");
    io::stderr().flush().ok()?;
    let mut line = String::new();
    stdin.lock().read_line(&mut line).ok()?;
    Some(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let settings = ConfigLoader::parse(r#"{"fuzzy_threshold": 90}"#).unwrap();
        assert_eq!(settings.fuzzy_threshold, 90);
        assert_eq!(settings.base_url, Settings::default().base_url);
        assert_eq!(settings.content_retry, ContentRetry::default());
    }

    #[test]
    fn debug_output_redacts_secret() {
        let credential = Credential::new(AuthScheme::Bearer, "s3cret");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("s3cret"));
    }
}
