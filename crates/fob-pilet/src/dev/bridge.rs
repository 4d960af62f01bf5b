//! Bridge from bundler completion events to bundle state and subscribers.

use crate::dev::bundle::{BuildEvent, BundleInfo, BundleState};
use crate::dev::bundler::{BuildListener, Bundler};
use crate::dev::registry::BroadcastReport;
use crate::dev::state::SharedState;
use crate::error::Result;
use std::sync::Arc;

/// Applies build events to the shared state and pushes fresh metadata.
pub struct BundleEventBridge {
    state: SharedState,
}

impl BundleEventBridge {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Create a bridge and register it with `bundler`.
    pub fn attach(bundler: &dyn Bundler, state: SharedState) -> Arc<Self> {
        let bridge = Arc::new(Self::new(state));
        bundler.on_build(bridge.clone());
        bridge
    }

    /// Replace the bundle state and broadcast the resulting metadata.
    ///
    /// The state is replaced even when the broadcast cannot be built, so
    /// requests still observe the new build.
    ///
    /// Runs inside the synchronous [`BuildListener`] callback, so the package
    /// descriptor is read with a blocking call. It is one small local file,
    /// read once per build; the short block on the calling worker is accepted.
    pub fn apply(&self, bundle: &BundleInfo, event: &BuildEvent) -> Result<BroadcastReport> {
        self.state
            .replace_bundle(BundleState::from_build(bundle.clone(), event));

        let document = self.state.metadata_document()?.to_json()?;
        Ok(self.state.registry.broadcast(&document))
    }
}

impl BuildListener for BundleEventBridge {
    fn on_build(&self, bundle: &BundleInfo, event: &BuildEvent) {
        match self.apply(bundle, event) {
            Ok(report) => tracing::info!(
                hash = %bundle.hash,
                delivered = report.delivered,
                failed = report.failed,
                "pushed metadata to subscribers"
            ),
            Err(e) => tracing::error!(hash = %bundle.hash, error = %e, "could not push metadata"),
        }
    }
}
