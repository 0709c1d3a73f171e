mod loader;
pub use loader::{ParameterLoader, ParameterLoaderError, ParameterTree};
mod safetensors_metadata;
pub use safetensors_metadata::{
    Dtype, HashMetadata, HeaderLoadingError, TensorInfo,
    read_metadata as read_safetensors_metadata,
};
mod safetensors_writer;
pub use safetensors_writer::{
    SafetensorView, SafetensorsWriteError, write_safetensors,
};
