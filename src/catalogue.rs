use std::fs::File;
use std::io::{BufReader, Write};

use camino::Utf8Path;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};

use crate::error::PortalError;
use crate::http::Fetcher;
use crate::paginate::Pages;
use crate::record::Catalogue;
use crate::store::Store;

pub const CATALOGUE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CatalogueFile {
    schema_version: u32,
    fetched_at: String,
    records: Catalogue,
}

/// Drains every page. Any page failure discards the records gathered so far.
pub fn build_catalogue<F: Fetcher>(pages: Pages<'_, F>) -> Result<Catalogue, PortalError> {
    let catalogue = pages.collect::<Result<Catalogue, PortalError>>()?;
    tracing::info!(records = catalogue.len(), "catalogue fetched");
    Ok(catalogue)
}

pub fn persist(catalogue: &Catalogue, path: &Utf8Path) -> Result<(), PortalError> {
    let file = CatalogueFile {
        schema_version: CATALOGUE_SCHEMA_VERSION,
        fetched_at: chrono::Utc::now().to_rfc3339(),
        records: catalogue.clone(),
    };
    let json = serde_json::to_vec(&file).map_err(|err| PortalError::Filesystem(err.to_string()))?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|err| PortalError::Filesystem(err.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|err| PortalError::Filesystem(err.to_string()))?;
    Store::write_bytes_atomic(path, &compressed)?;
    tracing::info!(%path, records = catalogue.len(), "catalogue cached");
    Ok(())
}

pub fn load(path: &Utf8Path) -> Result<Catalogue, PortalError> {
    let file = File::open(path.as_std_path())
        .map_err(|err| PortalError::Filesystem(format!("open catalogue {path}: {err}")))?;
    let reader = BufReader::new(GzDecoder::new(file));
    let parsed: CatalogueFile = serde_json::from_reader(reader)
        .map_err(|err| PortalError::CatalogueCorrupt(format!("{path}: {err}")))?;
    if parsed.schema_version != CATALOGUE_SCHEMA_VERSION {
        return Err(PortalError::CatalogueCorrupt(format!(
            "{path}: unsupported schema version {}",
            parsed.schema_version
        )));
    }
    tracing::debug!(%path, fetched_at = %parsed.fetched_at, "catalogue loaded");
    Ok(parsed.records)
}
