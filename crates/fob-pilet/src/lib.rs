//! Fob pilet dev server.
//!
//! Serves a single pilet (an independently built module) to its app shell
//! while the pilet is rebuilt live:
//!
//! - [`dev`] - routing, content resolution, build gating, live connections
//! - [`error`] - error types with actionable messages
//! - [`logger`] - structured logging with tracing
//! - [`ui`] - terminal status lines
//! - `commands` - the `fob-pilet` command implementation
//!
//! # Example
//!
//! ```rust,no_run
//! use fob_pilet::dev::{DevConfig, DevStack, Request};
//!
//! # async fn run() -> fob_pilet::Result<()> {
//! let stack = DevStack::new(&DevConfig::default());
//! let resolution = stack.router.handle(&Request::shell("/")).await?;
//! println!("{}", resolution.status());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

// Re-export commonly used types
pub use error::{ConfigError, PiletError, PushError, Result, ResultExt};
