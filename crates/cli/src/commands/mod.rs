//! One-shot subcommands and their shared error reporting.

pub(crate) mod catalog;
pub(crate) mod generate;

use std::path::PathBuf;
use std::process;

use atelier_core::{GatewayError, ImageError, TryOnError};

use crate::OutputFormat;

#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    #[error(transparent)]
    TryOn(#[from] TryOnError),

    #[error("gateway returned an unreadable image: {0}")]
    Output(ImageError),

    #[error("invalid gateway configuration: {0}")]
    Config(#[from] atelier_gemini::ConfigError),

    #[error("failed to start async runtime: {0}")]
    Runtime(std::io::Error),
}

impl CliError {
    /// Attach the user-facing action prefix to a gateway failure.
    pub(crate) fn gateway(context: &str, source: GatewayError) -> Self {
        CliError::TryOn(TryOnError::gateway(context, source))
    }
}

/// Print `err` in the requested format and exit with status 1.
pub(crate) fn fail(err: CliError, output: OutputFormat, quiet: bool) -> ! {
    match output {
        OutputFormat::Json => {
            let body = serde_json::json!({ "error": err.to_string() });
            let text = serde_json::to_string_pretty(&body)
                .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", err));
            eprintln!("{}", text);
        }
        OutputFormat::Text => {
            if !quiet {
                eprintln!("error: {}", err);
            }
        }
    }
    process::exit(1);
}

/// Print a serializable value as pretty JSON on stdout.
pub(crate) fn print_json(value: &serde_json::Value) {
    let pretty =
        serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("serialization error: {}", e));
    println!("{}", pretty);
}
