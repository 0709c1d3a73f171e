use image::{DynamicImage, imageops::FilterType};
use ndarray::Array4;

use crate::{Error, Result};

/// Side length of the square images the diagnosis networks were trained on.
pub const DEFAULT_INPUT_SIZE: u32 = 150;

/// `(batch, height, width, channels)` tensor with values in `[0, 1]`.
pub type InputTensor = Array4<f32>;

pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(Error::UnsupportedImage("empty image data".to_string()));
    }
    image::load_from_memory(bytes)
        .map_err(|error| Error::UnsupportedImage(error.to_string()))
}

/// Turns arbitrary images into the fixed network input: RGB, exactly
/// `width x height`, scaled to `[0, 1]`, with a leading batch axis of one.
#[derive(Debug, Clone, Copy)]
pub struct ImagePreprocessor {
    width: u32,
    height: u32,
    filter: FilterType,
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE)
    }
}

impl ImagePreprocessor {
    pub fn new(
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            width,
            height,
            filter: FilterType::CatmullRom,
        }
    }

    pub fn with_filter(
        mut self,
        filter: FilterType,
    ) -> Self {
        self.filter = filter;
        self
    }

    pub fn input_shape(&self) -> [usize; 4] {
        [1, self.height as usize, self.width as usize, 3]
    }

    pub fn preprocess(
        &self,
        image: &DynamicImage,
    ) -> Result<InputTensor> {
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::UnsupportedImage(format!(
                "image has no pixels ({}x{})",
                image.width(),
                image.height()
            )));
        }

        let same_size =
            image.width() == self.width && image.height() == self.height;
        let rgb = if same_size {
            image.to_rgb8()
        } else {
            image.resize_exact(self.width, self.height, self.filter).to_rgb8()
        };

        let shape = self.input_shape();
        Ok(Array4::from_shape_fn(shape, |(_, y, x, c)| {
            rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        }))
    }

    pub fn preprocess_bytes(
        &self,
        bytes: &[u8],
    ) -> Result<InputTensor> {
        self.preprocess(&decode_image(bytes)?)
    }
}
