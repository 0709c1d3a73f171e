mod catchers;
mod diagnosis;
mod error;
pub mod main;
mod state;

pub use catchers::default_catcher;
pub use diagnosis::{
    DiagnosisRequest, DiagnosisResponse, ModelInfo, handle_chest,
    handle_kidney, handle_models, handle_predict,
};
pub use error::{ApiError, ErrorBody};
pub use main::{ServerConfig, build_rocket, run_server};
pub use state::DiagnosisState;
