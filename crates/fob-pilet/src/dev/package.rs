//! The unit's package descriptor (`package.json`).
//!
//! The descriptor is re-read for every metadata document so edits to the
//! name, version, or custom block show up without restarting the server.

use crate::error::{PiletError, Result, ResultExt};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// File name of the descriptor inside the unit root.
pub const DESCRIPTOR_FILE: &str = "package.json";

/// Fields of `package.json` the dev server cares about.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PackageDescriptor {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    /// Opaque custom metadata forwarded to the host untouched
    #[serde(default)]
    pub custom: Option<Value>,
}

impl PackageDescriptor {
    /// Location of the descriptor for a unit root.
    pub fn path_in(root: &Path) -> PathBuf {
        root.join(DESCRIPTOR_FILE)
    }

    /// Parse descriptor contents. `path` is only used for error reporting.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        serde_json::from_str(content).map_err(|source| PiletError::Package {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read the descriptor synchronously.
    ///
    /// Used from build listeners, which must not await.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path_in(root);
        let content = std::fs::read_to_string(&path).with_path(&path)?;
        Self::parse(&content, &path)
    }

    /// Read the descriptor without blocking the runtime.
    pub async fn load_async(root: &Path) -> Result<Self> {
        let path = Self::path_in(root);
        let content = tokio::fs::read_to_string(&path).await.with_path(&path)?;
        Self::parse(&content, &path)
    }
}
