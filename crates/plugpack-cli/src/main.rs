use clap::{Parser, Subcommand};
use plugpack::commands::{
    config::{self, ConfigAction},
    inspect,
    pack::{self, PackCommand},
};
use plugpack::GlobalOpts;
use plugpack_logger as logger;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "plugpack")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Package plugin build output",
    long_about = "plugpack reconciles a plugin's DLLs against the host's reference DLLs, stamps the manifest version and publishes one zip to every output directory."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and publish the plugin archive
    Pack(PackCommand),
    /// Print the assembly name and version of binaries
    Inspect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change persistent defaults
    #[command(subcommand_required = false, arg_required_else_help = false)]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| logger::verbosity_to_filter().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logger::init_with_verbosity(cli.global.verbosity_level(), !cli.global.no_log_file)
    {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }
    init_tracing();

    let failed = match cli.command {
        Commands::Pack(cmd) => pack::handle_pack(cmd).is_err(),
        Commands::Inspect { files, json } => match inspect::handle_inspect(&files, json) {
            Ok(()) => false,
            Err(e) => {
                logger::error(&format!("Inspect failed: {}", e));
                true
            }
        },
        Commands::Config { action } => match config::handle_config(action, &cli.global) {
            Ok(()) => false,
            Err(e) => {
                logger::error(&format!("Config command failed: {}", e));
                true
            }
        },
    };

    if failed {
        if cli.global.verbosity_level() > 0 {
            logger::show_log_path();
        }
        std::process::exit(1);
    }
}
