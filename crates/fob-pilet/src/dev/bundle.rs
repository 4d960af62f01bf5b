//! Snapshot of the unit's current build output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Integration protocol the unit is built against.
///
/// Only [`ProtocolVersion::V1`] exposes a protocol reference to the host.
/// Markers other than `v0`, `v1` and `none` are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProtocolVersion {
    V0,
    V1,
    #[default]
    None,
    Other(String),
}

impl ProtocolVersion {
    /// Whether the protocol reference is exposed under this version.
    pub fn exposes_ref(&self) -> bool {
        matches!(self, ProtocolVersion::V1)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProtocolVersion::V0 => "v0",
            ProtocolVersion::V1 => "v1",
            ProtocolVersion::None => "none",
            ProtocolVersion::Other(marker) => marker,
        }
    }
}

impl FromStr for ProtocolVersion {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "v0" => ProtocolVersion::V0,
            "v1" => ProtocolVersion::V1,
            "none" | "" => ProtocolVersion::None,
            other => ProtocolVersion::Other(other.to_string()),
        })
    }
}

impl From<String> for ProtocolVersion {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(version) => version,
            Err(never) => match never {},
        }
    }
}

impl From<ProtocolVersion> for String {
    fn from(value: ProtocolVersion) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the bundler reports about its latest output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleInfo {
    /// Entry artifact name relative to the output directory (e.g. `/index.js`)
    pub name: String,
    /// Content hash of the entry artifact
    pub hash: String,
    /// Directory the artifacts were written to
    pub out_dir: PathBuf,
}

impl BundleInfo {
    /// Entry artifact name without its leading separator.
    pub fn file_name(&self) -> &str {
        self.name.trim_start_matches('/')
    }
}

/// Payload of a build-completion event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEvent {
    pub protocol_ref: Option<String>,
    pub protocol_version: ProtocolVersion,
}

impl BuildEvent {
    pub fn new(protocol_version: ProtocolVersion, protocol_ref: Option<String>) -> Self {
        Self {
            protocol_ref,
            protocol_version,
        }
    }
}

/// Bundle state as seen by requests and subscribers.
///
/// Replaced as a whole on every completed build; never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleState {
    pub bundle: BundleInfo,
    pub protocol_version: ProtocolVersion,
    /// Present only when `protocol_version` is v1
    pub protocol_ref: Option<String>,
}

impl BundleState {
    /// State before the first build completed.
    pub fn empty(out_dir: PathBuf) -> Self {
        Self {
            bundle: BundleInfo {
                out_dir,
                ..BundleInfo::default()
            },
            ..Self::default()
        }
    }

    /// Build the state that follows a completion event.
    ///
    /// Nothing is carried over from the previous state: a reference from an
    /// earlier v1 build is dropped when the new event is not v1.
    pub fn from_build(bundle: BundleInfo, event: &BuildEvent) -> Self {
        let protocol_ref = if event.protocol_version.exposes_ref() {
            event.protocol_ref.clone()
        } else {
            None
        };

        Self {
            bundle,
            protocol_version: event.protocol_version.clone(),
            protocol_ref,
        }
    }
}
