mod model_id;

pub use model_id::ModelId;
