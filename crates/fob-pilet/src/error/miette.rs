//! Miette diagnostic conversion for pilet errors.

use crate::error::{ConfigError, PiletError};
use miette::Report;

/// Convert PiletError to miette Report
pub fn pilet_error_to_miette(err: PiletError) -> Report {
    match err {
        PiletError::Config(e) => config_error_to_miette(e),
        PiletError::Package { path, source } => {
            miette::miette!(
                "Invalid package descriptor: {}\n{}\n\nHint: Check package.json syntax",
                path.display(),
                source
            )
        }
        _ => miette::miette!("{}", err),
    }
}

fn config_error_to_miette(err: ConfigError) -> Report {
    match err {
        ConfigError::InvalidValue { field, value, hint } => {
            miette::miette!("Invalid value for '{}': {}\n\nHint: {}", field, value, hint)
        }
        _ => miette::miette!("Configuration error: {}", err),
    }
}
