//! fob-pilet - serve a live-rebuilt pilet to its app shell.

use clap::Parser;
use fob_pilet::{cli, commands, error, logger, ui};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let no_color = !ui::colors_enabled(args.no_color);
    logger::init_logger(args.verbose, args.quiet, no_color);

    commands::dev_execute(args.dev)
        .await
        .map_err(error::pilet_error_to_miette)
}
