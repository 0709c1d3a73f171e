use std::{path::PathBuf, sync::Arc};

use console::Style;
use ctdiag::{ModelId, ModelResolver, PredictionPipeline};
use inquire::{InquireError, Select, Text};

use super::{
    format_error, format_output, load_models, read_file, resolve_models_dir,
    spinner,
};
use crate::error::CliResult;

fn select_model() -> CliResult<Option<ModelId>> {
    match Select::new("Scan type", ModelId::ALL.to_vec()).prompt() {
        Ok(model) => Ok(Some(model)),
        Err(
            InquireError::OperationCanceled
            | InquireError::OperationInterrupted,
        ) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Interactive loop: choose a scan type once, then diagnose image paths until
/// the prompt is cancelled.
pub fn handle_run(
    model: Option<ModelId>,
    models_dir: Option<PathBuf>,
) -> CliResult<()> {
    let model = match model {
        Some(model) => model,
        None => match select_model()? {
            Some(model) => model,
            None => return Ok(()),
        },
    };

    let resolver = Arc::new(ModelResolver::new(resolve_models_dir(models_dir)));
    load_models(&resolver, &[model])?;
    let pipeline = PredictionPipeline::new(resolver);
    let style_prompt = Style::new().dim();
    println!(
        "{}",
        style_prompt.apply_to(format!("Labels: {}", model.labels().join(", ")))
    );

    loop {
        let input = match Text::new("")
            .with_placeholder("Path to a CT image")
            .prompt()
        {
            Ok(input) => input,
            Err(_) => {
                break;
            },
        };
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let bytes = match read_file(&PathBuf::from(input)) {
            Ok(bytes) => bytes,
            Err(error) => {
                println!("{}", format_error(&error));
                continue;
            },
        };

        let progress_bar = spinner("{spinner:.green} {msg}");
        progress_bar.set_message("Diagnosing");
        let result = pipeline.predict_bytes_detailed(&bytes, model);
        progress_bar.finish_and_clear();

        match result {
            Ok(output) => println!("{}\n", format_output(&output)),
            Err(error) => println!("{}\n", format_error(&error)),
        }
    }
    Ok(())
}
