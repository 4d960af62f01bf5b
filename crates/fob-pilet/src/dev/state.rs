//! Shared state for the development server.
//!
//! The bundle state and the connection registry are the only mutable state
//! shared between request handlers and build listeners. Both sit behind
//! parking_lot locks because the tokio runtime runs handlers on many threads.

use crate::dev::bundle::BundleState;
use crate::dev::metadata::{MetadataBuilder, MetadataDocument};
use crate::dev::package::PackageDescriptor;
use crate::dev::registry::ConnectionRegistry;
use crate::error::Result;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared development server state.
pub struct DevServerState {
    /// Latest bundle snapshot, swapped as a whole
    bundle: RwLock<Arc<BundleState>>,

    /// Live subscribers
    pub registry: ConnectionRegistry,

    /// Metadata projection for the configured endpoint
    pub metadata: MetadataBuilder,

    /// Directory holding the unit's package descriptor
    unit_root: PathBuf,
}

impl DevServerState {
    /// Create new dev server state.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Unit endpoint path (e.g. `/$pilet-api`)
    /// * `unit_root` - Directory containing `package.json`
    /// * `initial` - Bundle state before the first build completes
    pub fn new(endpoint: &str, unit_root: PathBuf, initial: BundleState) -> Self {
        Self {
            bundle: RwLock::new(Arc::new(initial)),
            registry: ConnectionRegistry::new(endpoint),
            metadata: MetadataBuilder::new(endpoint),
            unit_root,
        }
    }

    /// Current bundle snapshot.
    pub fn bundle(&self) -> Arc<BundleState> {
        Arc::clone(&self.bundle.read())
    }

    /// Replace the bundle snapshot.
    pub fn replace_bundle(&self, next: BundleState) {
        *self.bundle.write() = Arc::new(next);
    }

    pub fn unit_root(&self) -> &Path {
        &self.unit_root
    }

    /// Metadata for the current bundle, reading the descriptor synchronously.
    ///
    /// For build listeners, which cannot await. Request handlers use
    /// [`DevServerState::load_metadata_document`].
    pub fn metadata_document(&self) -> Result<MetadataDocument> {
        let package = PackageDescriptor::load(&self.unit_root)?;
        Ok(self.metadata.build(&self.bundle(), &package))
    }

    /// Metadata for the current bundle, reading the descriptor asynchronously.
    ///
    /// The snapshot is taken after the descriptor is read, so the document
    /// reflects the newest state available when it is returned.
    pub async fn load_metadata_document(&self) -> Result<MetadataDocument> {
        let package = PackageDescriptor::load_async(&self.unit_root).await?;
        Ok(self.metadata.build(&self.bundle(), &package))
    }
}

/// Shared state handle for passing around the application.
pub type SharedState = Arc<DevServerState>;
