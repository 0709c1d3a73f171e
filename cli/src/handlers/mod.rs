mod encode;
mod loading;
mod models;
mod output;
mod predict;
mod run;
mod serve;

pub use encode::handle_encode;
pub use loading::{load_models, spinner};
pub use models::handle_models;
pub use output::{format_error, format_output};
pub use predict::handle_predict;
pub use run::handle_run;
pub use serve::handle_serve;

use std::path::{Path, PathBuf};

use ctdiag::storage::default_models_dir;

use crate::{CliError, error::CliResult};

pub(crate) fn resolve_models_dir(models_dir: Option<PathBuf>) -> PathBuf {
    models_dir.unwrap_or_else(default_models_dir)
}

pub(crate) fn read_file(path: &Path) -> CliResult<Vec<u8>> {
    std::fs::read(path).map_err(|source| CliError::Read {
        path: path.display().to_string(),
        source,
    })
}
