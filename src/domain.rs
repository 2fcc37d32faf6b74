use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::PortalError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssemblyId(String);

impl AssemblyId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssemblyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AssemblyId {
    type Err = PortalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let is_valid = !normalized.is_empty()
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        if !is_valid {
            return Err(PortalError::InvalidAssemblyId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(String);

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProductId {
    type Err = PortalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        let has_alnum = normalized.chars().any(|ch| ch.is_ascii_alphanumeric());
        let is_valid = has_alnum
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-');
        if !is_valid {
            return Err(PortalError::InvalidProductId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AuthScheme {
    #[default]
    Bearer,
    ApiKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Assembly,
    Annotations,
}

impl ArtifactKind {
    pub fn link_segment(&self) -> &'static str {
        match self {
            ArtifactKind::Assembly => "download_assembly",
            ArtifactKind::Annotations => "download_annotations",
        }
    }

    pub fn default_extension(&self) -> &'static str {
        match self {
            ArtifactKind::Assembly => "fasta",
            ArtifactKind::Annotations => "gbk",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Assembly => write!(f, "assembly"),
            ArtifactKind::Annotations => write!(f, "annotations"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Exact,
    Fuzzy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RecordOutput {
    #[default]
    Full,
    IdOnly,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_assembly_id_valid() {
        let id: AssemblyId = " 304fd1fb9a4e48ee ".parse().unwrap();
        assert_eq!(id.as_str(), "304fd1fb9a4e48ee");
    }

    #[test]
    fn parse_assembly_id_rejects_path_characters() {
        let err = "../etc".parse::<AssemblyId>().unwrap_err();
        assert_matches!(err, PortalError::InvalidAssemblyId(_));
    }

    #[test]
    fn parse_product_id_normalizes_case() {
        let id: ProductId = "baa-1705".parse().unwrap();
        assert_eq!(id.as_str(), "BAA-1705");
    }

    #[test]
    fn parse_product_id_invalid() {
        assert_matches!(
            "---".parse::<ProductId>().unwrap_err(),
            PortalError::InvalidProductId(_)
        );
        assert_matches!(
            "35 638".parse::<ProductId>().unwrap_err(),
            PortalError::InvalidProductId(_)
        );
    }
}
