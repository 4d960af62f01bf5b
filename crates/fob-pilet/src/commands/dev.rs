//! Dev server command implementation.
//!
//! Orchestrates the server lifecycle:
//! - Initial build from the existing bundler output
//! - Output-directory watching
//! - HTTP/WebSocket server
//! - Graceful shutdown on Ctrl+C

use crate::cli::DevArgs;
use crate::dev::{
    DevBundler, DevConfig, DevServer, DevStack, FileChange, OutputBuilder, OutputWatcher,
};
use crate::error::Result;
use crate::ui;
use tokio::signal;
use tokio::sync::mpsc;

/// Execute the dev command.
///
/// # Process Flow
///
/// 1. Load and validate configuration
/// 2. Wire state, bundler, bridge and router
/// 3. Snapshot the existing output as the first build
/// 4. Start the output watcher and the HTTP server
/// 5. Turn every settled burst of output changes into a build
///
/// # Errors
///
/// Returns errors for invalid configuration or watcher failures. Build
/// failures are reported and the server keeps running.
pub async fn execute(args: DevArgs) -> Result<()> {
    let config = DevConfig::load(&args)?;
    config.validate()?;

    ui::info(&format!("Pilet root: {}", config.root.display()));
    ui::info(&format!("App shell: {}", config.app.display()));

    let stack = DevStack::new(&config);
    let builder = OutputBuilder::new(
        config.resolved_out_dir(),
        config.entry.clone(),
        config.schema.clone(),
    );

    let (watcher, mut changes) =
        start_output(&builder, &stack.bundler, config.debounce_ms).await?;

    let server = DevServer::new(config.addr(), stack.router.clone(), stack.state.clone());
    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = server.start().await {
            ui::error(&format!("Server error: {}", e));
        }
    });

    ui::success(&format!(
        "Serving pilet at {}{}",
        config.server_url(),
        config.api
    ));
    ui::info("Press Ctrl+C to stop");

    loop {
        tokio::select! {
            Some(change) = changes.recv() => {
                tracing::debug!(path = %change.path().display(), "output changed");

                match builder.rebuild_after_burst(&stack.bundler, &watcher, &mut changes).await {
                    Ok((duration_ms, folded)) => ui::success(&format!(
                        "Rebuild picked up in {}ms ({} changes, {} subscribers)",
                        duration_ms,
                        folded + 1,
                        stack.state.registry.len()
                    )),
                    Err(e) => ui::error(&format!("Rebuild failed: {}", e)),
                }
            }

            _ = signal::ctrl_c() => {
                ui::info("Shutting down development server...");
                break;
            }

            _ = &mut server_handle => {
                ui::warning("Server task completed unexpectedly");
                break;
            }
        }
    }

    ui::success("Development server stopped");
    Ok(())
}

/// Take the first build from the existing output and start watching it.
///
/// The output directory is created when the bundler has not produced it yet.
/// A missing entry artifact is reported and leaves the bundler not ready;
/// unit requests wait until a later build succeeds.
pub async fn start_output(
    builder: &OutputBuilder,
    bundler: &DevBundler,
    debounce_ms: u64,
) -> Result<(OutputWatcher, mpsc::Receiver<FileChange>)> {
    builder.prepare().await?;

    match builder.rebuild(bundler).await {
        Ok(duration_ms) => ui::success(&format!("Initial build picked up in {}ms", duration_ms)),
        Err(e) => ui::warning(&format!("No build output yet: {}", e)),
    }

    let (watcher, changes) = OutputWatcher::new(builder.out_dir().clone(), debounce_ms)?;
    ui::info(&format!("Watching {}", watcher.root().display()));
    Ok((watcher, changes))
}
