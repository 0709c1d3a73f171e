use std::{net::IpAddr, path::PathBuf, process::ExitCode, time::Duration};

use clap::{CommandFactory, Parser, Subcommand};
use cli::{
    handlers::{
        format_error, handle_encode, handle_models, handle_predict, handle_run,
        handle_serve,
    },
    logging::init_tracing,
    server::ServerConfig,
};
use ctdiag::{ModelId, storage::default_models_dir};

#[derive(Parser)]
#[command(name = "ctdiag_cli", version, about = "CT scan diagnosis")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Diagnose a single image
    Predict {
        /// Path to the image file
        image_path: PathBuf,
        /// Scan type: kidney or chest
        #[arg(short, long)]
        model: ModelId,
        /// Directory holding the weight files
        /// [default: $CTDIAG_MODELS_DIR or ~/.cache/ctdiag/models]
        #[arg(long)]
        models_dir: Option<PathBuf>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Diagnose images interactively
    Run {
        /// Scan type; prompted for when omitted
        #[arg(short, long)]
        model: Option<ModelId>,
        #[arg(long)]
        models_dir: Option<PathBuf>,
    },
    /// Start the HTTP diagnosis service
    Serve {
        #[arg(long)]
        models_dir: Option<PathBuf>,
        #[arg(long, default_value = "127.0.0.1")]
        address: IpAddr,
        #[arg(short, long, default_value_t = 8000)]
        port: u16,
        /// Worker threads [default: number of CPUs]
        #[arg(long)]
        workers: Option<usize>,
        /// Load every model before accepting requests
        #[arg(long)]
        eager: bool,
        /// Per-request prediction timeout in seconds
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
        /// Maximum JSON request body size in MiB
        #[arg(long, default_value_t = 32)]
        body_limit_mib: u64,
    },
    /// Print the base64 payload for an image
    Encode {
        image_path: PathBuf,
        /// Wrap the payload in a request body
        #[arg(long)]
        request: bool,
    },
    /// List supported models and their weight files
    Models {
        #[arg(long)]
        models_dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    };

    let default_directives = match command {
        Commands::Serve {
            ..
        } => "info",
        _ => "warn",
    };
    init_tracing(default_directives);

    let result = match command {
        Commands::Predict {
            image_path,
            model,
            models_dir,
            json,
        } => handle_predict(image_path, model, models_dir, json),
        Commands::Run {
            model,
            models_dir,
        } => handle_run(model, models_dir),
        Commands::Serve {
            models_dir,
            address,
            port,
            workers,
            eager,
            timeout_secs,
            body_limit_mib,
        } => {
            let defaults = ServerConfig::default();
            handle_serve(ServerConfig {
                models_dir: models_dir.unwrap_or_else(default_models_dir),
                address,
                port,
                workers: workers.unwrap_or(defaults.workers),
                eager,
                timeout: Duration::from_secs(timeout_secs),
                body_limit_mib,
            })
        },
        Commands::Encode {
            image_path,
            request,
        } => handle_encode(&image_path, request),
        Commands::Models {
            models_dir,
        } => handle_models(models_dir),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", format_error(&error));
            ExitCode::FAILURE
        },
    }
}
