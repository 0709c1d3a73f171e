use std::time::Duration;

use console::Style;
use ctdiag::{ModelId, ModelResolver};
use indicatif::{ProgressBar, ProgressStyle};

pub fn spinner(template: &str) -> ProgressBar {
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.enable_steady_tick(Duration::from_millis(100));
    progress_bar.set_style(
        ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    progress_bar
}

/// Loads `models` into the resolver's cache behind a spinner.
pub fn load_models(
    resolver: &ModelResolver,
    models: &[ModelId],
) -> ctdiag::Result<()> {
    let style_bold = Style::new().bold();
    for &model in models {
        let model_name = style_bold.apply_to(model.weights_stem()).to_string();
        let progress_bar = spinner("{spinner:.green} Loading: {msg}");
        progress_bar.set_message(model_name.clone());

        if let Err(error) = resolver.resolve(model) {
            progress_bar.finish_and_clear();
            return Err(error);
        }

        if let Ok(style) = ProgressStyle::with_template("Loaded: {msg}") {
            progress_bar.set_style(style);
        }
        progress_bar.finish_with_message(model_name);
    }
    Ok(())
}
