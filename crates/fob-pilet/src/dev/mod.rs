//! Development server for a live-rebuilt pilet.
//!
//! Provides:
//! - Routing between the app shell's static files and the pilet endpoint
//! - Metadata and artifact serving gated on build readiness
//! - Metadata pushes to connected app shells via WebSocket
//! - An output-directory watcher that turns bundler runs into build events

pub mod bridge;
pub mod builder;
pub mod bundle;
pub mod bundler;
pub mod config;
pub mod metadata;
pub mod package;
pub mod registry;
pub mod resolver;
pub mod router;
pub mod server;
pub mod state;
pub mod watcher;

// Re-exports
pub use bridge::BundleEventBridge;
pub use builder::OutputBuilder;
pub use bundle::{BuildEvent, BundleInfo, BundleState, ProtocolVersion};
pub use bundler::{BuildListener, Bundler, DevBundler};
pub use config::DevConfig;
pub use metadata::{MetadataBuilder, MetadataDocument};
pub use package::PackageDescriptor;
pub use registry::{ConnectionId, ConnectionRegistry, PushFn, UserConnected};
pub use resolver::{ContentResolver, Resolution, ResponseDescriptor};
pub use router::{Request, RequestRouter};
pub use server::{AppState, DevServer};
pub use state::{DevServerState, SharedState};
pub use watcher::{FileChange, OutputWatcher};

use std::sync::Arc;

/// Fully wired dev server components.
pub struct DevStack {
    pub state: SharedState,
    pub bundler: Arc<DevBundler>,
    pub router: Arc<RequestRouter>,
    pub bridge: Arc<BundleEventBridge>,
}

impl DevStack {
    /// Wire state, bundler, bridge and router for `config`.
    ///
    /// The bundler starts out not ready; nothing under the endpoint is
    /// served until the first build completes.
    pub fn new(config: &DevConfig) -> Self {
        let out_dir = config.resolved_out_dir();
        let state = Arc::new(DevServerState::new(
            &config.api,
            config.root.clone(),
            BundleState::empty(out_dir.clone()),
        ));

        let bundler = Arc::new(DevBundler::new(BundleInfo {
            out_dir,
            ..BundleInfo::default()
        }));
        let bridge = BundleEventBridge::attach(bundler.as_ref(), state.clone());

        let resolver = ContentResolver::new(config.app.clone(), state.clone(), bundler.clone());
        let router = Arc::new(RequestRouter::new(config.api.clone(), resolver));

        Self {
            state,
            bundler,
            router,
            bridge,
        }
    }

    /// axum router serving this stack.
    pub fn http_router(&self) -> axum::Router {
        server::build_router(AppState {
            router: self.router.clone(),
            shared: self.state.clone(),
        })
    }
}
