mod model_resolver;

pub use model_resolver::ModelResolver;
