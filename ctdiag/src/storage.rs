use std::path::PathBuf;

#[derive(Copy, Clone, Debug)]
pub enum EnvVar {
    /// Directory holding `<stem>.safetensors` weight files.
    ModelsDir,
    /// `tracing` filter directives.
    LogFilter,
}

impl EnvVar {
    pub fn key(&self) -> &'static str {
        match self {
            EnvVar::ModelsDir => "CTDIAG_MODELS_DIR",
            EnvVar::LogFilter => "RUST_LOG",
        }
    }

    pub fn value(&self) -> Option<String> {
        std::env::var(self.key()).ok().filter(|value| !value.trim().is_empty())
    }
}

/// `$CTDIAG_MODELS_DIR`, falling back to `$HOME/.cache/ctdiag/models`.
pub fn default_models_dir() -> PathBuf {
    if let Some(dir) = EnvVar::ModelsDir.value() {
        return PathBuf::from(dir);
    }

    let home = std::env::var("HOME").unwrap_or_else(|_| String::from("."));
    PathBuf::from(home).join(".cache").join("ctdiag").join("models")
}
