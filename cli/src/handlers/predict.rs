use std::{path::PathBuf, sync::Arc};

use ctdiag::{ModelId, ModelResolver, PredictionPipeline};
use tracing::info;

use super::{format_output, read_file, resolve_models_dir, spinner};
use crate::error::CliResult;

pub fn handle_predict(
    image_path: PathBuf,
    model: ModelId,
    models_dir: Option<PathBuf>,
    json: bool,
) -> CliResult<()> {
    let resolver = Arc::new(ModelResolver::new(resolve_models_dir(models_dir)));
    let pipeline = PredictionPipeline::new(resolver);
    let bytes = read_file(&image_path)?;

    let progress_bar = spinner("{spinner:.green} Diagnosing: {msg}");
    progress_bar.set_message(image_path.display().to_string());
    let result = pipeline.predict_bytes_detailed(&bytes, model);
    progress_bar.finish_and_clear();
    let output = result?;

    info!(
        %model,
        image = %image_path.display(),
        diagnosis = output.prediction.diagnosis,
        confidence = output.prediction.confidence,
        "Diagnosed image"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", format_output(&output));
    }
    Ok(())
}
