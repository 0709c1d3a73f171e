use tokio::runtime::Runtime;

use crate::{
    CliError,
    error::CliResult,
    server::{ServerConfig, run_server},
};

pub fn handle_serve(config: ServerConfig) -> CliResult<()> {
    let runtime = Runtime::new().map_err(CliError::Runtime)?;
    runtime.block_on(run_server(config))
}
