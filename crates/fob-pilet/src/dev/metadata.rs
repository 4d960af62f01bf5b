//! Public metadata document describing the served unit.
//!
//! This is what the host's loader fetches from the unit endpoint, and what
//! every live connection receives after a rebuild.

use crate::dev::bundle::BundleState;
use crate::dev::package::PackageDescriptor;
use crate::error::Result;
use serde::Serialize;
use serde_json::Value;

/// Metadata for the current build. Never cached beyond a single use.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDocument {
    pub name: String,
    pub version: String,
    pub link: String,
    pub hash: String,
    /// Omitted from the JSON entirely unless the build used protocol v1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_ref: Option<String>,
    pub no_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_metadata: Option<Value>,
}

impl MetadataDocument {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Derives [`MetadataDocument`]s for a fixed unit endpoint.
#[derive(Debug, Clone)]
pub struct MetadataBuilder {
    endpoint: String,
}

impl MetadataBuilder {
    /// `endpoint` is the unit's configured path, e.g. `/$pilet-api`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Project bundle state and descriptor into a metadata document.
    pub fn build(&self, state: &BundleState, package: &PackageDescriptor) -> MetadataDocument {
        let protocol_ref = if state.protocol_version.exposes_ref() {
            state.protocol_ref.clone()
        } else {
            None
        };

        MetadataDocument {
            name: package.name.clone(),
            version: package.version.clone(),
            link: format!("{}/{}", self.endpoint, state.bundle.file_name()),
            hash: state.bundle.hash.clone(),
            protocol_ref,
            no_cache: true,
            custom_metadata: package.custom.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dev::bundle::{BuildEvent, BundleInfo, ProtocolVersion};
    use std::path::PathBuf;

    fn package() -> PackageDescriptor {
        PackageDescriptor {
            name: "my-pilet".to_string(),
            version: "1.0.0".to_string(),
            custom: Some(serde_json::json!({ "team": "core" })),
        }
    }

    fn state(event: BuildEvent) -> BundleState {
        BundleState::from_build(
            BundleInfo {
                name: "/index.js".to_string(),
                hash: "deadbeef".to_string(),
                out_dir: PathBuf::from("dist"),
            },
            &event,
        )
    }

    #[test]
    fn test_build_v1_includes_ref() {
        let builder = MetadataBuilder::new("/$pilet-api");
        let doc = builder.build(
            &state(BuildEvent::new(ProtocolVersion::V1, Some("abc".into()))),
            &package(),
        );

        assert_eq!(doc.name, "my-pilet");
        assert_eq!(doc.version, "1.0.0");
        assert_eq!(doc.link, "/$pilet-api/index.js");
        assert_eq!(doc.hash, "deadbeef");
        assert_eq!(doc.protocol_ref.as_deref(), Some("abc"));
        assert!(doc.no_cache);

        let json: Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(json["protocolRef"], "abc");
        assert_eq!(json["noCache"], true);
        assert_eq!(json["customMetadata"]["team"], "core");
    }

    #[test]
    fn test_build_non_v1_omits_ref_key() {
        let builder = MetadataBuilder::new("/$pilet-api");
        let doc = builder.build(
            &state(BuildEvent::new(ProtocolVersion::V0, Some("abc".into()))),
            &package(),
        );

        let json: Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert!(json.get("protocolRef").is_none());
    }

    #[test]
    fn test_build_ignores_stale_ref_on_hand_built_state() {
        let builder = MetadataBuilder::new("/api");
        let mut state = state(BuildEvent::default());
        state.protocol_ref = Some("stale".into());

        let doc = builder.build(&state, &package());
        assert!(doc.protocol_ref.is_none());
    }

    #[test]
    fn test_build_without_custom_metadata() {
        let builder = MetadataBuilder::new("/api");
        let pkg = PackageDescriptor {
            custom: None,
            ..package()
        };

        let json: Value =
            serde_json::from_str(&builder.build(&state(BuildEvent::default()), &pkg).to_json().unwrap())
                .unwrap();
        assert!(json.get("customMetadata").is_none());
        assert_eq!(json["link"], "/api/index.js");
    }
}
