use std::{
    net::{IpAddr, Ipv4Addr},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use ctdiag::{
    ModelId, ModelResolver, PredictionPipeline, storage::default_models_dir,
};
use rocket::{
    Build, Config, Rocket, catchers,
    config::LogLevel,
    data::{Limits, ToByteUnit},
    routes,
};
use tracing::info;

use crate::{
    CliError,
    error::CliResult,
    handlers::load_models,
    server::{
        DiagnosisState, default_catcher, handle_chest, handle_kidney,
        handle_models, handle_predict,
    },
};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub models_dir: PathBuf,
    pub address: IpAddr,
    pub port: u16,
    pub workers: usize,
    /// Load every model before accepting requests and fail if one is missing.
    pub eager: bool,
    pub timeout: Duration,
    pub body_limit_mib: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8000,
            workers: std::thread::available_parallelism()
                .map(|workers| workers.get())
                .unwrap_or(1),
            eager: false,
            timeout: Duration::from_secs(60),
            body_limit_mib: 32,
        }
    }
}

pub fn build_rocket(
    config: &ServerConfig,
    resolver: Arc<ModelResolver>,
) -> Rocket<Build> {
    let rocket_config = Config {
        address: config.address,
        port: config.port,
        workers: config.workers,
        log_level: LogLevel::Off,
        limits: Limits::default()
            .limit("json", config.body_limit_mib.mebibytes()),
        ..Config::default()
    };
    let state =
        DiagnosisState::new(PredictionPipeline::new(resolver), config.timeout);

    rocket::custom(rocket_config)
        .manage(state)
        .mount(
            "/",
            routes![handle_kidney, handle_chest, handle_predict, handle_models],
        )
        .register("/", catchers![default_catcher])
}

pub async fn run_server(config: ServerConfig) -> CliResult<()> {
    let resolver = Arc::new(ModelResolver::new(config.models_dir.clone()));
    if config.eager {
        load_models(&resolver, &ModelId::ALL)?;
    }

    info!(
        address = %config.address,
        port = config.port,
        workers = config.workers,
        models_dir = %config.models_dir.display(),
        eager = config.eager,
        "Starting diagnosis server"
    );
    println!("Listening on http://{}:{}", config.address, config.port);

    build_rocket(&config, resolver)
        .launch()
        .await
        .map(|_| ())
        .map_err(|error| CliError::Launch(error.to_string()))
}
