use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PortalError {
    #[error("invalid assembly id: {0}")]
    InvalidAssemblyId(String),

    #[error("invalid product id: {0}")]
    InvalidProductId(String),

    #[error("no API key supplied (pass --api-key or set {0})")]
    #[diagnostic(help("create an API key on the portal account page"))]
    MissingCredential(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("portal rejected the credential: {0}")]
    #[diagnostic(help("check that the API key is valid and the account has portal access"))]
    Authorization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no results for {0}")]
    EmptyResult(String),

    #[error("malformed response from {endpoint}: {message}")]
    MalformedResponse { endpoint: String, message: String },

    #[error("content at {url} was not ready after {attempts} attempts")]
    ContentNotReady { url: String, attempts: u32 },

    #[error("failed to write {path}: {message}")]
    LocalWrite { path: String, message: String },

    #[error("portal request failed: {0}")]
    Transport(String),

    #[error("portal returned status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("catalogue cache is unreadable: {0}")]
    CatalogueCorrupt(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
