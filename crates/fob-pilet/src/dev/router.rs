//! Request classification and dispatch.

use crate::dev::resolver::{ContentResolver, Resolution};
use crate::error::Result;
use std::sync::atomic::{AtomicBool, Ordering};

/// An inbound request as seen by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Path relative to the routing target, possibly with a query string
    pub url: String,
    /// Routing target declared by the transport; `None` for shell requests
    pub target: Option<String>,
}

impl Request {
    /// A request without routing target.
    pub fn shell(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            target: None,
        }
    }

    /// A request routed to `target` with `url` relative to it.
    pub fn targeted(target: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            target: Some(target.into()),
        }
    }

    pub fn path(&self) -> &str {
        crate::dev::resolver::strip_query(&self.url)
    }

    pub fn query(&self) -> Option<&str> {
        self.url.split_once('?').map(|(_, query)| query)
    }
}

/// Top-level request entry point.
pub struct RequestRouter {
    endpoint: String,
    resolver: ContentResolver,
    active: AtomicBool,
}

impl RequestRouter {
    pub fn new(endpoint: impl Into<String>, resolver: ContentResolver) -> Self {
        Self {
            endpoint: endpoint.into(),
            resolver,
            active: AtomicBool::new(true),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Enable or disable the router. An inactive router answers NotFound.
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
        tracing::info!(active, "router activation changed");
    }

    /// Map a raw HTTP path onto a [`Request`].
    ///
    /// Paths at or below the endpoint are targeted at it, with the remainder
    /// as their url. Everything else is a shell request.
    pub fn classify(&self, raw: &str) -> Request {
        let (path, query) = match raw.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (raw, None),
        };

        let remainder = path
            .strip_prefix(self.endpoint.as_str())
            .filter(|rest| rest.is_empty() || rest.starts_with('/'));

        match remainder {
            Some(rest) => {
                let url = match query {
                    Some(query) => format!("{}?{}", rest, query),
                    None => rest.to_string(),
                };
                Request::targeted(self.endpoint.clone(), url)
            }
            None => Request::shell(raw),
        }
    }

    /// Dispatch a request to the matching resolver.
    pub async fn handle(&self, request: &Request) -> Result<Resolution> {
        if !self.is_active() {
            return Ok(Resolution::not_found(&request.url));
        }

        match request.target.as_deref() {
            None => self.resolver.resolve_shell(&request.url).await,
            Some(target) if target == self.endpoint => {
                self.resolver.resolve_unit(&request.url).await
            }
            Some(target) => {
                tracing::debug!(route = target, url = %request.url, "no route for target");
                Ok(Resolution::not_found(&request.url))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dev::bundle::{BundleInfo, BundleState};
    use crate::dev::bundler::DevBundler;
    use crate::dev::state::DevServerState;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn router() -> RequestRouter {
        let state = Arc::new(DevServerState::new(
            "/$pilet-api",
            PathBuf::from("."),
            BundleState::empty(PathBuf::from("dist")),
        ));
        let bundler = Arc::new(DevBundler::new(BundleInfo::default()));
        let resolver = ContentResolver::new(PathBuf::from("/nonexistent-app"), state, bundler);
        RequestRouter::new("/$pilet-api", resolver)
    }

    #[test]
    fn test_request_path_and_query() {
        let request = Request::shell("/index.js?v=2");
        assert_eq!(request.path(), "/index.js");
        assert_eq!(request.query(), Some("v=2"));
        assert_eq!(Request::shell("/").query(), None);
    }

    #[test]
    fn test_classify_endpoint_requests() {
        let router = router();

        let request = router.classify("/$pilet-api");
        assert_eq!(request.target.as_deref(), Some("/$pilet-api"));
        assert_eq!(request.url, "");

        let request = router.classify("/$pilet-api/index.js?x=1");
        assert_eq!(request.target.as_deref(), Some("/$pilet-api"));
        assert_eq!(request.url, "/index.js?x=1");
    }

    #[test]
    fn test_classify_shell_requests() {
        let router = router();

        assert_eq!(router.classify("/"), Request::shell("/"));
        assert_eq!(
            router.classify("/$pilet-apix/file"),
            Request::shell("/$pilet-apix/file")
        );
    }

    #[tokio::test]
    async fn test_unknown_target_is_not_found() {
        let router = router();
        let resolution = router
            .handle(&Request::targeted("/other", "/index.js"))
            .await
            .unwrap();
        assert!(resolution.is_not_found());
    }

    #[tokio::test]
    async fn test_inactive_router_is_not_found() {
        let router = router();
        router.set_active(false);

        // Would otherwise block on readiness; inactive short-circuits.
        let resolution = router
            .handle(&Request::targeted("/$pilet-api", ""))
            .await
            .unwrap();
        assert!(resolution.is_not_found());
        assert!(!router.is_active());
    }
}
