mod image_preprocessor;

pub use image_preprocessor::{
    DEFAULT_INPUT_SIZE, ImagePreprocessor, InputTensor, decode_image,
};
