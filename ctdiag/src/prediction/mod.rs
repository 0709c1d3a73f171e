mod parser;
mod pipeline;
mod result;

pub use parser::parse;
pub use pipeline::PredictionPipeline;
pub use result::{Prediction, PredictionOutput, PredictionStats};
