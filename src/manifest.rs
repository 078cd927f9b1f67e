//! Package manifest (`package.json`) reading and writing.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// File name of the project descriptor in the repository root.
pub const MANIFEST_FILE: &str = "package.json";

/// Project descriptor for the package being released.
///
/// Unknown fields round-trip untouched through `rest`; only the version
/// field is ever rewritten by the release flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,

    /// Allowlist of published file globs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,

    /// Entry-point file of the package.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,

    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Manifest {
    /// Read the manifest from `dir`, if one exists.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Serialize with 2-space indentation and a trailing newline.
    pub fn to_json(&self) -> Result<String> {
        Ok(format!("{}\n", serde_json::to_string_pretty(self)?))
    }

    /// Bare package name without a scope prefix (`@scope/pkg` -> `pkg`).
    pub fn bare_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}
