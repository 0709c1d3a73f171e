use ctdiag::storage::EnvVar;
use tracing_subscriber::{
    EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Installs the global subscriber. `RUST_LOG` wins over `default_directives`.
/// Log lines go to stderr so command output on stdout stays clean.
pub fn init_tracing(default_directives: &str) {
    let filter = EnvVar::LogFilter
        .value()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directives));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
