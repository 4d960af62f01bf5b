//! Command-line interface definition.

use crate::dev::ProtocolVersion;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

/// fob-pilet - serve a pilet to its app shell while it is being rebuilt
#[derive(Parser, Debug, Default)]
#[command(
    name = "fob-pilet",
    version,
    about = "Serve a live-rebuilt pilet to its app shell",
    long_about = "Serves the host application's static files and the pilet's build output.\n\
                  Connected app shells receive fresh pilet metadata after every rebuild."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(flatten)]
    pub dev: DevArgs,
}

/// Options for the dev server.
///
/// Every field is optional so values from `pilet.config.json` and the
/// environment are only overridden when given explicitly.
#[derive(clap::Args, Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevArgs {
    /// Pilet root containing package.json
    #[arg(long, value_name = "DIR")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Static files of the app shell
    #[arg(long, value_name = "DIR")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<PathBuf>,

    /// Endpoint path the pilet is served under
    #[arg(long, value_name = "PATH")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,

    /// Directory the bundler writes into (relative to the root)
    #[arg(long, value_name = "DIR")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,

    /// Entry artifact inside the output directory
    #[arg(long, value_name = "FILE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,

    /// Pilet schema version: v0, v1 or none
    #[arg(long, value_name = "VERSION")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<ProtocolVersion>,

    /// Port for the dev server
    #[arg(short, long, value_name = "PORT")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Quiet period in milliseconds before a burst of output changes counts as a build
    #[arg(long, value_name = "MS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,

    /// Explicit config file (defaults to <root>/pilet.config.json)
    #[arg(long, value_name = "FILE")]
    #[serde(skip)]
    pub config: Option<PathBuf>,
}
