use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;

use crate::config::Settings;
use crate::error::PortalError;

pub const CATALOGUE_FILE: &str = "catalogue.json.gz";

#[derive(Debug, Clone)]
pub struct Store {
    download_dir: Utf8PathBuf,
    cache_root: Utf8PathBuf,
}

impl Store {
    pub fn new(settings: &Settings) -> Result<Self, PortalError> {
        let cache_root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("genome-portal"))
                    .ok()
            })
            .ok_or_else(|| {
                PortalError::Filesystem("unable to resolve cache directory".to_string())
            })?;

        Ok(Self {
            download_dir: settings.download_dir.clone(),
            cache_root,
        })
    }

    pub fn new_with_paths(download_dir: Utf8PathBuf, cache_root: Utf8PathBuf) -> Self {
        Self {
            download_dir,
            cache_root,
        }
    }

    pub fn with_download_dir(mut self, download_dir: Utf8PathBuf) -> Self {
        self.download_dir = download_dir;
        self
    }

    pub fn download_dir(&self) -> &Utf8Path {
        &self.download_dir
    }

    pub fn cache_root(&self) -> &Utf8Path {
        &self.cache_root
    }

    pub fn default_catalogue_path(&self) -> Utf8PathBuf {
        self.cache_root.join(CATALOGUE_FILE)
    }

    pub fn artifact_path(&self, suggested: &str) -> Result<Utf8PathBuf, PortalError> {
        let file_name = Utf8Path::new(suggested.trim())
            .file_name()
            .filter(|name| !name.is_empty() && *name != "..")
            .ok_or_else(|| {
                PortalError::Filesystem(format!("unusable file name suggested: {suggested}"))
            })?;
        Ok(self.download_dir.join(file_name))
    }

    pub fn file_size(path: &Utf8Path) -> Option<u64> {
        fs::metadata(path.as_std_path())
            .ok()
            .filter(|meta| meta.is_file())
            .map(|meta| meta.len())
    }

    pub fn read_lossy(path: &Utf8Path) -> Result<String, PortalError> {
        let bytes =
            fs::read(path.as_std_path()).map_err(|err| PortalError::Filesystem(err.to_string()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Writes into a temp file beside `path`, then renames over it.
    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), PortalError> {
        let local_write = |err: &dyn std::fmt::Display| PortalError::LocalWrite {
            path: path.to_string(),
            message: err.to_string(),
        };
        let parent = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
            _ => Utf8PathBuf::from("."),
        };
        fs::create_dir_all(parent.as_std_path()).map_err(|err| local_write(&err))?;
        let mut temp = tempfile::Builder::new()
            .prefix(".genome-portal")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| local_write(&err))?;
        temp.write_all(content).map_err(|err| local_write(&err))?;
        temp.as_file()
            .sync_all()
            .map_err(|err| local_write(&err))?;
        temp.persist(path.as_std_path())
            .map_err(|err| local_write(&err.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let store = Store::new_with_paths(
            Utf8PathBuf::from("downloads"),
            Utf8PathBuf::from("/tmp/cache/genome-portal"),
        );
        assert!(store.default_catalogue_path().ends_with("genome-portal/catalogue.json.gz"));
        let path = store.artifact_path("../../etc/genome.fasta").unwrap();
        assert_eq!(path, Utf8PathBuf::from("downloads/genome.fasta"));
        assert!(store.artifact_path("..").is_err());
    }

    #[test]
    fn atomic_write_replaces_content() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let path = root.join("nested").join("file.txt");
        Store::write_bytes_atomic(&path, b"first").unwrap();
        Store::write_bytes_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(path.as_std_path()).unwrap(), "second");
        assert_eq!(Store::file_size(&path), Some(6));
    }
}
