use console::Style;
use ctdiag::PredictionOutput;

pub fn format_output(output: &PredictionOutput) -> String {
    let prediction = &output.prediction;
    let stats = &output.stats;

    let style_diagnosis = Style::new().bold().green();
    let style_dim = Style::new().dim();
    let style_stats = Style::new().bold();

    let mut lines = vec![format!(
        "{} ({:.1}%)",
        style_diagnosis.apply_to(prediction.diagnosis),
        prediction.confidence * 100.0
    )];
    for (label, probability) in &output.probabilities {
        let marker = if *label == prediction.diagnosis {
            "*"
        } else {
            " "
        };
        lines.push(
            style_dim
                .apply_to(format!("{marker} {label:<24} {probability:.4}"))
                .to_string(),
        );
    }
    lines.push(String::new());
    lines.push(
        style_stats
            .apply_to(format!(
                "{:.3}s total, {:.3}s forward pass",
                stats.total_duration, stats.forward_pass_duration,
            ))
            .to_string(),
    );
    lines.join("\n")
}

pub fn format_error(error: &dyn std::fmt::Display) -> String {
    let style_error = Style::new().red().bold();
    format!("{} {error}", style_error.apply_to("error:"))
}
