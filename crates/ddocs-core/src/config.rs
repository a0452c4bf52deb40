use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DocsError, DocsResult};

/// Behavior switches for the document layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    /// Loading a document that was never created creates it empty instead of
    /// failing with `NotFound`.
    pub auto_create_on_load: bool,
    /// Maintain document-to-list back-references when documents are added to
    /// or cleared from lists.
    pub track_parents: bool,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            auto_create_on_load: true,
            track_parents: true,
        }
    }
}

impl DocsConfig {
    /// Parse a TOML document. Missing keys take their default values.
    pub fn from_toml_str(source: &str) -> DocsResult<Self> {
        toml::from_str(source).map_err(|e| DocsError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> DocsResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| DocsError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Configuration that fails loudly instead of creating documents on read.
    pub fn strict() -> Self {
        Self {
            auto_create_on_load: false,
            ..Default::default()
        }
    }
}
