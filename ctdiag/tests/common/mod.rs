#![allow(dead_code)]

use std::{
    collections::HashMap,
    io::Cursor,
    path::{Path, PathBuf},
};

use ctdiag::{
    ModelId,
    config::{
        Activation, LayerConfig, NETWORK_CONFIG_KEY, NetworkConfig, Padding,
    },
    parameters::{SafetensorView, write_safetensors},
};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};

struct Tensor {
    name: String,
    shape: Vec<usize>,
    values: Vec<f32>,
}

fn deterministic_values(
    len: usize,
    seed: usize,
    scale: f32,
) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let bucket = (i * 7919 + seed * 104_729) % 1000;
            (bucket as f32 / 1000.0 - 0.5) * scale
        })
        .collect()
}

/// A scaled-down version of the frozen VGG feature extractor plus the dense
/// classification head, small enough to run quickly in tests.
pub fn test_network_config(
    name: &str,
    num_outputs: usize,
) -> NetworkConfig {
    NetworkConfig {
        name: name.to_string(),
        input_shape: [150, 150, 3],
        feature_extractor: vec![
            LayerConfig::Conv2d {
                filters: 4,
                kernel_size: 3,
                strides: 1,
                padding: Padding::Same,
                activation: Activation::Relu,
            },
            LayerConfig::MaxPool2d {
                pool_size: 2,
                strides: None,
            },
            LayerConfig::Conv2d {
                filters: 8,
                kernel_size: 3,
                strides: 2,
                padding: Padding::Same,
                activation: Activation::Relu,
            },
            LayerConfig::GlobalMaxPool2d,
        ],
        classification_head: vec![
            LayerConfig::Flatten,
            LayerConfig::Dense {
                units: 16,
                activation: Activation::Relu,
            },
            LayerConfig::BatchNormalization {
                epsilon: 1e-3,
            },
            LayerConfig::Dropout {
                rate: 0.5,
            },
            LayerConfig::Dense {
                units: num_outputs,
                activation: Activation::Softmax,
            },
        ],
    }
}

fn test_tensors(num_outputs: usize) -> Vec<Tensor> {
    let specs: Vec<(&str, Vec<usize>)> = vec![
        ("feature_extractor.0.kernel", vec![3, 3, 3, 4]),
        ("feature_extractor.0.bias", vec![4]),
        ("feature_extractor.2.kernel", vec![3, 3, 4, 8]),
        ("feature_extractor.2.bias", vec![8]),
        ("classification_head.1.kernel", vec![8, 16]),
        ("classification_head.1.bias", vec![16]),
        ("classification_head.2.gamma", vec![16]),
        ("classification_head.2.beta", vec![16]),
        ("classification_head.2.moving_mean", vec![16]),
        ("classification_head.4.kernel", vec![16, num_outputs]),
        ("classification_head.4.bias", vec![num_outputs]),
    ];
    let mut tensors: Vec<Tensor> = specs
        .into_iter()
        .enumerate()
        .map(|(seed, (name, shape))| {
            let len = shape.iter().product();
            Tensor {
                name: name.to_string(),
                values: deterministic_values(len, seed, 2.0),
                shape,
            }
        })
        .collect();
    tensors.push(Tensor {
        name: "classification_head.2.moving_variance".to_string(),
        shape: vec![16],
        values: (0..16).map(|i| 0.5 + i as f32 / 16.0).collect(),
    });
    tensors
}

pub fn write_network_file(
    path: &Path,
    config: &NetworkConfig,
    num_outputs: usize,
    skip: Option<&str>,
) {
    let tensors = test_tensors(num_outputs);
    let views: Vec<SafetensorView<'_>> = tensors
        .iter()
        .filter(|tensor| Some(tensor.name.as_str()) != skip)
        .map(|tensor| {
            SafetensorView::from_f32(
                &tensor.name,
                &tensor.shape,
                &tensor.values,
            )
        })
        .collect();
    let metadata = HashMap::from([(
        NETWORK_CONFIG_KEY.to_string(),
        config.to_json().expect("serialize config"),
    )]);
    write_safetensors(path, &views, Some(metadata)).expect("write weights");
}

/// Writes `<dir>/<stem>.safetensors` for `model` and returns its path.
pub fn write_model(
    dir: &Path,
    model: ModelId,
) -> PathBuf {
    let path = dir.join(model.weights_file_name());
    let config = test_network_config(model.weights_stem(), model.num_labels());
    write_network_file(&path, &config, model.num_labels(), None);
    path
}

/// Synthetic slice: dark background with a brighter elliptical organ and a
/// small dense spot.
pub fn ct_slice(
    width: u32,
    height: u32,
) -> DynamicImage {
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let image = GrayImage::from_fn(width, height, |x, y| {
        let dx = (x as f32 - cx) / (width as f32 * 0.35);
        let dy = (y as f32 - cy) / (height as f32 * 0.25);
        let inside = dx * dx + dy * dy <= 1.0;
        let spot = (x as f32 - cx * 1.2).abs() < width as f32 * 0.05
            && (y as f32 - cy).abs() < height as f32 * 0.05;
        let value = match (inside, spot) {
            (_, true) => 240,
            (true, false) => 120 + ((x + y) % 20) as u8,
            (false, false) => 15,
        };
        Luma([value])
    });
    DynamicImage::ImageLuma8(image)
}

pub fn encode(
    image: &DynamicImage,
    format: ImageFormat,
) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, format).expect("encode image");
    bytes.into_inner()
}
