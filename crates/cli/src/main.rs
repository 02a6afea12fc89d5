mod commands;
mod config;
mod serve;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::commands::{catalog, fail, generate, CliError};
use crate::config::StudioConfig;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Virtual try-on studio: layer garments on a model photo and re-pose it.
#[derive(Parser)]
#[command(
    name = "atelier",
    version,
    about = "Virtual try-on studio: layer garments on a model photo and re-pose it"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log debug detail to stderr
    #[arg(long, global = true)]
    verbose: bool,

    /// Studio configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the pose catalog
    Poses,

    /// List the default wardrobe
    Wardrobe,

    /// Run a single generation and write the image to a file
    Generate {
        #[command(subcommand)]
        command: GenerateCommands,
    },

    /// Start the studio HTTP API server
    Serve {
        /// Port to listen on (default: config file, then 8080)
        #[arg(long)]
        port: Option<u16>,
        /// Path to TLS certificate PEM file (requires --tls-key)
        #[arg(long)]
        tls_cert: Option<PathBuf>,
        /// Path to TLS private key PEM file (requires --tls-cert)
        #[arg(long)]
        tls_key: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub(crate) enum GenerateCommands {
    /// Turn a snapshot into a studio model photo
    Model {
        /// Photo of the person
        #[arg(long)]
        photo: PathBuf,
        /// Where to write the generated image
        #[arg(long)]
        out: PathBuf,
    },

    /// Dress a model photo in a garment
    TryOn {
        /// Model photo
        #[arg(long)]
        model: PathBuf,
        /// Garment image file or http(s) URL
        #[arg(long)]
        garment: String,
        /// Where to write the generated image
        #[arg(long)]
        out: PathBuf,
    },

    /// Re-render a photo in a catalog pose
    Pose {
        /// Photo to re-pose
        #[arg(long)]
        image: PathBuf,
        /// Pose catalog index (see `atelier poses`)
        #[arg(long)]
        pose: usize,
        /// Where to write the generated image
        #[arg(long)]
        out: PathBuf,
    },
}

impl GenerateCommands {
    pub(crate) fn out(&self) -> &Path {
        match self {
            GenerateCommands::Model { out, .. }
            | GenerateCommands::TryOn { out, .. }
            | GenerateCommands::Pose { out, .. } => out,
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = match cli.config.as_deref() {
        Some(path) => match StudioConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        },
        None => StudioConfig::default(),
    };

    match cli.command {
        Commands::Poses => {
            catalog::cmd_poses(&config.catalog(), cli.output);
        }
        Commands::Wardrobe => {
            catalog::cmd_wardrobe(&config.wardrobe(), cli.output);
        }
        Commands::Generate { command } => {
            generate::cmd_generate(command, &config.catalog(), cli.output, cli.quiet);
        }
        Commands::Serve {
            port,
            tls_cert,
            tls_key,
        } => {
            // Validate TLS flags: both must be provided or neither
            if tls_cert.is_some() != tls_key.is_some() {
                eprintln!("error: --tls-cert and --tls-key must both be provided");
                process::exit(1);
            }
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => fail(CliError::Runtime(e), cli.output, cli.quiet),
            };
            let options = serve::ServeOptions {
                port: config.port(port),
                max_body_bytes: config.max_body_bytes(),
                catalog: config.catalog(),
                wardrobe: config.wardrobe(),
                tls_cert,
                tls_key,
            };
            if let Err(e) = rt.block_on(serve::start_server(options)) {
                eprintln!("Server error: {}", e);
                process::exit(1);
            }
        }
    }
}
