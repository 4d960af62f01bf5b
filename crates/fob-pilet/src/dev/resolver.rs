//! Content resolution for shell and unit requests.
//!
//! Three sources can answer a request:
//! - the host application's static files (with a single `index.html` fallback)
//! - the unit's metadata document
//! - the unit's built artifacts
//!
//! Unit requests first wait for the bundler to become ready so a response is
//! never built from a half-written output directory.

use crate::dev::bundler::Bundler;
use crate::dev::state::SharedState;
use crate::error::{Result, ResultExt};
use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Document served when a shell path has no matching file.
pub const SHELL_DOCUMENT: &str = "index.html";

/// A response ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDescriptor {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl ResponseDescriptor {
    /// Successful response with no-cache directives.
    pub fn ok(body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        );
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(header::EXPIRES, HeaderValue::from_static("0"));

        Self {
            status: StatusCode::OK,
            headers,
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    /// Plain-text response with the given status.
    pub fn text(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            content_type: "text/plain; charset=utf-8".to_string(),
            body: message.into().into_bytes(),
        }
    }

    /// Header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl IntoResponse for ResponseDescriptor {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        headers.extend(self.headers);
        match HeaderValue::from_str(&self.content_type) {
            Ok(value) => {
                headers.insert(header::CONTENT_TYPE, value);
            }
            Err(e) => tracing::warn!(content_type = %self.content_type, error = %e, "invalid content type"),
        }

        response
    }
}

/// Outcome of resolving a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Served(ResponseDescriptor),
    NotFound { path: String },
}

impl Resolution {
    pub fn not_found(path: impl Into<String>) -> Self {
        Resolution::NotFound { path: path.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Resolution::NotFound { .. })
    }

    /// HTTP status this resolution answers with.
    pub fn status(&self) -> StatusCode {
        match self {
            Resolution::Served(descriptor) => descriptor.status,
            Resolution::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    /// Turn the resolution into a sendable response; NotFound becomes a 404.
    pub fn into_descriptor(self) -> ResponseDescriptor {
        match self {
            Resolution::Served(descriptor) => descriptor,
            Resolution::NotFound { path } => {
                ResponseDescriptor::text(StatusCode::NOT_FOUND, format!("Not found: {}", path))
            }
        }
    }
}

/// Resolves shell and unit paths to content.
#[derive(Clone)]
pub struct ContentResolver {
    host_root: PathBuf,
    state: SharedState,
    bundler: Arc<dyn Bundler>,
}

impl ContentResolver {
    /// # Arguments
    ///
    /// * `host_root` - Static file tree of the host application
    /// * `state` - Shared bundle state and metadata builder
    /// * `bundler` - Source of the readiness signal
    pub fn new(host_root: PathBuf, state: SharedState, bundler: Arc<dyn Bundler>) -> Self {
        Self {
            host_root,
            state,
            bundler,
        }
    }

    pub fn host_root(&self) -> &Path {
        &self.host_root
    }

    /// Resolve a host-shell path.
    ///
    /// Serves the file under the host root if it is a regular file, otherwise
    /// falls back once to the shell document. The fallback is never retried.
    pub async fn resolve_shell(&self, path: &str) -> Result<Resolution> {
        let path = strip_query(path);

        if let Some(target) = confine(&self.host_root, path) {
            if let Some(descriptor) = serve_file(&target).await? {
                return Ok(Resolution::Served(descriptor));
            }
        }

        let shell = self.host_root.join(SHELL_DOCUMENT);
        match serve_file(&shell).await? {
            Some(descriptor) => {
                tracing::debug!(path, "served shell document as fallback");
                Ok(Resolution::Served(descriptor))
            }
            None => Ok(Resolution::not_found(path)),
        }
    }

    /// Resolve a path below the unit endpoint.
    ///
    /// An empty path answers with the metadata document; anything else is
    /// looked up in the bundle's output directory.
    pub async fn resolve_unit(&self, path: &str) -> Result<Resolution> {
        self.bundler.ready().await;

        let path = strip_query(path);
        let relative = path.trim_start_matches('/');

        if relative.is_empty() {
            let document = self.state.load_metadata_document().await?;
            return Ok(Resolution::Served(ResponseDescriptor::ok(
                document.to_json()?,
                "application/json",
            )));
        }

        let bundle = self.state.bundle();
        let Some(target) = confine(&bundle.bundle.out_dir, relative) else {
            return Ok(Resolution::not_found(path));
        };

        Ok(match serve_file(&target).await? {
            Some(descriptor) => Resolution::Served(descriptor),
            None => Resolution::not_found(path),
        })
    }
}

/// Read `target` if it is a regular file.
///
/// A file that vanishes between the type check and the read is an error,
/// not a miss.
async fn serve_file(target: &Path) -> Result<Option<ResponseDescriptor>> {
    match tokio::fs::metadata(target).await {
        Ok(metadata) if metadata.is_file() => {}
        _ => return Ok(None),
    }

    let content = tokio::fs::read(target).await.with_path(target)?;
    Ok(Some(ResponseDescriptor::ok(content, content_type_for(target))))
}

/// Join a request path onto `root`, refusing anything that climbs out of it.
fn confine(root: &Path, path: &str) -> Option<PathBuf> {
    let relative = Path::new(path.trim_start_matches('/'));
    let escapes = relative
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));

    (!escapes).then(|| root.join(relative))
}

/// Drop a query string from a request path.
pub fn strip_query(path: &str) -> &str {
    path.split_once('?').map_or(path, |(path, _)| path)
}

/// Determine content type from file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "wasm" => "application/wasm",
        "js" | "mjs" | "cjs" => "application/javascript",
        "json" | "map" => "application/json",
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => "application/octet-stream",
    }
}
