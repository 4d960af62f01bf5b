//! Bundler contract consumed by the dev server.
//!
//! The server never drives a build itself. It only needs three things from
//! whatever produces the unit's artifacts:
//! - a readiness future that resolves once no build is in flight
//! - build-completion notifications
//! - a description of the current output
//!
//! [`DevBundler`] is the in-process implementation used by the `fob-pilet`
//! binary and by tests.

use crate::dev::bundle::{BuildEvent, BundleInfo};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;

/// Receives build-completion notifications.
///
/// Listeners run synchronously inside [`DevBundler::complete_build`], before
/// readiness is restored. They must not block.
pub trait BuildListener: Send + Sync {
    fn on_build(&self, bundle: &BundleInfo, event: &BuildEvent);
}

/// Build tool collaborator.
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Resolves once the current build (if any) has completed and every
    /// listener has seen its completion event.
    async fn ready(&self);

    /// Register a listener for build-completion events.
    fn on_build(&self, listener: Arc<dyn BuildListener>);

    /// Output of the latest completed build.
    fn current_bundle(&self) -> BundleInfo;
}

/// Bundler handle fed by an external build process.
pub struct DevBundler {
    bundle: RwLock<BundleInfo>,
    listeners: RwLock<Vec<Arc<dyn BuildListener>>>,
    ready: watch::Sender<bool>,
}

impl DevBundler {
    /// Create a handle that is not ready until the first build completes.
    pub fn new(initial: BundleInfo) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            bundle: RwLock::new(initial),
            listeners: RwLock::new(Vec::new()),
            ready,
        }
    }

    /// Mark a build as in flight. Unit requests wait until it completes.
    pub fn begin_build(&self) {
        self.ready.send_replace(false);
        tracing::debug!("build started");
    }

    /// Publish a finished build.
    ///
    /// Order matters: the bundle is replaced, every listener is notified,
    /// and only then do waiters on [`Bundler::ready`] resume.
    pub fn complete_build(&self, bundle: BundleInfo, event: BuildEvent) {
        *self.bundle.write() = bundle.clone();

        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.on_build(&bundle, &event);
        }

        self.ready.send_replace(true);
        tracing::debug!(hash = %bundle.hash, version = %event.protocol_version, "build completed");
    }

    /// Whether no build is currently in flight.
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

#[async_trait]
impl Bundler for DevBundler {
    async fn ready(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    fn on_build(&self, listener: Arc<dyn BuildListener>) {
        self.listeners.write().push(listener);
    }

    fn current_bundle(&self) -> BundleInfo {
        self.bundle.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dev::bundle::ProtocolVersion;
    use parking_lot::Mutex;
    use std::path::PathBuf;
    use std::time::Duration;

    struct Recorder {
        seen: Mutex<Vec<(String, BuildEvent)>>,
    }

    impl BuildListener for Recorder {
        fn on_build(&self, bundle: &BundleInfo, event: &BuildEvent) {
            self.seen.lock().push((bundle.hash.clone(), event.clone()));
        }
    }

    fn info(hash: &str) -> BundleInfo {
        BundleInfo {
            name: "/index.js".to_string(),
            hash: hash.to_string(),
            out_dir: PathBuf::from("dist"),
        }
    }

    #[tokio::test]
    async fn test_not_ready_before_first_build() {
        let bundler = DevBundler::new(BundleInfo::default());
        assert!(!bundler.is_ready());

        let waited = tokio::time::timeout(Duration::from_millis(50), bundler.ready()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_ready_after_complete() {
        let bundler = DevBundler::new(BundleInfo::default());
        bundler.complete_build(info("h1"), BuildEvent::default());

        tokio::time::timeout(Duration::from_millis(100), bundler.ready())
            .await
            .expect("ready should resolve");
        assert_eq!(bundler.current_bundle().hash, "h1");
    }

    #[tokio::test]
    async fn test_begin_build_blocks_waiters() {
        let bundler = Arc::new(DevBundler::new(BundleInfo::default()));
        bundler.complete_build(info("h1"), BuildEvent::default());
        bundler.begin_build();

        let waiter = {
            let bundler = Arc::clone(&bundler);
            tokio::spawn(async move {
                bundler.ready().await;
                bundler.current_bundle().hash
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        bundler.complete_build(info("h2"), BuildEvent::default());
        assert_eq!(waiter.await.unwrap(), "h2");
    }

    #[test]
    fn test_listeners_see_every_build() {
        let bundler = DevBundler::new(BundleInfo::default());
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        bundler.on_build(recorder.clone());
        assert_eq!(bundler.listener_count(), 1);

        bundler.complete_build(
            info("h1"),
            BuildEvent::new(ProtocolVersion::V1, Some("abc".into())),
        );
        bundler.complete_build(info("h2"), BuildEvent::default());

        let seen = recorder.seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "h1");
        assert_eq!(seen[0].1.protocol_ref.as_deref(), Some("abc"));
        assert_eq!(seen[1].0, "h2");
    }
}
