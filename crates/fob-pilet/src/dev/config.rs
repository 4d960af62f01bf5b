//! Development server configuration.
//!
//! Sources, lowest priority first:
//! 1. built-in defaults
//! 2. `pilet.config.json` in the pilet root (or `--config`)
//! 3. `PILET_*` environment variables (`PILET_OUT_DIR=build`)
//! 4. command-line arguments

use crate::cli::DevArgs;
use crate::dev::ProtocolVersion;
use crate::error::{ConfigError, Result};
use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
    value::{Uncased, UncasedStr},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Config file looked up in the pilet root.
pub const CONFIG_FILE: &str = "pilet.config.json";

/// Development server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevConfig {
    /// Pilet root containing `package.json`
    pub root: PathBuf,

    /// Static files of the app shell
    pub app: PathBuf,

    /// Endpoint path the pilet is served under
    pub api: String,

    /// Bundler output directory, relative to `root` unless absolute
    pub out_dir: PathBuf,

    /// Entry artifact inside `out_dir`
    pub entry: String,

    /// Pilet schema version
    pub schema: ProtocolVersion,

    /// HTTP port
    pub port: u16,

    /// Quiet period before a burst of output changes counts as a build
    pub debounce_ms: u64,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            app: PathBuf::from("app"),
            api: "/$pilet-api".to_string(),
            out_dir: PathBuf::from("dist"),
            entry: "index.js".to_string(),
            schema: ProtocolVersion::V1,
            port: 1234,
            debounce_ms: 100,
        }
    }
}

impl DevConfig {
    /// Load configuration from defaults, config file, environment and CLI.
    pub fn load(args: &DevArgs) -> Result<Self> {
        let root = args.root.clone().unwrap_or_else(|| PathBuf::from("."));

        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = args.config.clone().or_else(|| {
            let default_path = root.join(CONFIG_FILE);
            default_path.exists().then_some(default_path)
        });

        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path).into());
            }
            tracing::debug!(path = %path.display(), "loading config file");
            figment = figment.merge(Json::file(path));
        }

        figment = figment
            .merge(
                Env::prefixed("PILET_")
                    .map(env_key_to_field)
                    .lowercase(false),
            )
            .merge(Serialized::defaults(args));

        figment.extract().map_err(|e| {
            ConfigError::InvalidValue {
                field: "configuration".to_string(),
                value: e.to_string(),
                hint: format!("Check {} syntax and field types", CONFIG_FILE),
            }
            .into()
        })
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - the endpoint does not start with `/` or ends with one
    /// - the pilet root or the app directory does not exist
    pub fn validate(&self) -> Result<()> {
        if !self.api.starts_with('/') || self.api.len() < 2 || self.api.ends_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "api".to_string(),
                value: self.api.clone(),
                hint: "The endpoint must start with '/' and must not end with one, e.g. /$pilet-api"
                    .to_string(),
            }
            .into());
        }

        if self.entry.trim_start_matches('/').is_empty() {
            return Err(ConfigError::MissingField {
                field: "entry".to_string(),
                hint: "Name the entry artifact, e.g. index.js".to_string(),
            }
            .into());
        }

        for dir in [&self.root, &self.app] {
            if !dir.is_dir() {
                return Err(ConfigError::NotFound(dir.clone()).into());
            }
        }

        Ok(())
    }

    /// Output directory resolved against the pilet root.
    pub fn resolved_out_dir(&self) -> PathBuf {
        resolve(&self.root, &self.out_dir)
    }

    /// Server socket address.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], self.port))
    }

    /// Get the server URL as a string.
    pub fn server_url(&self) -> String {
        format!("http://{}", self.addr())
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// `out_dir` (from `PILET_OUT_DIR`) -> `outDir`.
fn env_key_to_field(key: &UncasedStr) -> Uncased<'_> {
    let mut field = String::with_capacity(key.len());
    let mut upper = false;

    for c in key.as_str().chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            field.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            field.push(c.to_ascii_lowercase());
        }
    }

    Uncased::from_owned(field)
}
