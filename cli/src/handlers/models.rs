use std::path::PathBuf;

use console::Style;
use ctdiag::{ModelId, ModelResolver};

use super::resolve_models_dir;
use crate::error::CliResult;

pub fn handle_models(models_dir: Option<PathBuf>) -> CliResult<()> {
    let resolver = ModelResolver::new(resolve_models_dir(models_dir));
    let style_bold = Style::new().bold();
    let style_found = Style::new().green();
    let style_missing = Style::new().red();

    println!("Models directory: {}", resolver.models_dir().display());
    for model in ModelId::ALL {
        let path = resolver.weights_path(model);
        let status = if path.is_file() {
            style_found.apply_to("found")
        } else {
            style_missing.apply_to("missing")
        };
        println!();
        println!("{} ({})", style_bold.apply_to(model), model.weights_stem());
        println!("  weights: {} [{}]", path.display(), status);
        println!("  labels:  {}", model.labels().join(", "));
    }
    Ok(())
}
