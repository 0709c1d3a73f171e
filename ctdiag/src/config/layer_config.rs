use serde::{Deserialize, Serialize};

use super::Activation;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Copy, Clone, Default)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    #[default]
    Same,
    Valid,
}

/// One layer of a sequential network, in the vocabulary of the training
/// framework that exported it.
///
/// Shapes handled here never include the batch axis: spatial activations are
/// `[height, width, channels]`, flat ones `[features]`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerConfig {
    Conv2d {
        filters: usize,
        kernel_size: usize,
        #[serde(default = "default_stride")]
        strides: usize,
        #[serde(default)]
        padding: Padding,
        #[serde(default)]
        activation: Activation,
    },
    MaxPool2d {
        pool_size: usize,
        #[serde(default)]
        strides: Option<usize>,
    },
    GlobalMaxPool2d,
    GlobalAveragePool2d,
    Flatten,
    Dense {
        units: usize,
        #[serde(default)]
        activation: Activation,
    },
    BatchNormalization {
        #[serde(default = "default_epsilon")]
        epsilon: f32,
    },
    Dropout {
        rate: f32,
    },
    Rescaling {
        scale: f32,
        #[serde(default)]
        offset: f32,
    },
}

fn default_stride() -> usize {
    1
}

fn default_epsilon() -> f32 {
    1e-3
}

fn spatial(shape: &[usize]) -> Result<[usize; 3], String> {
    match shape {
        &[height, width, channels] => Ok([height, width, channels]),
        _ => Err(format!(
            "expects a [height, width, channels] input, got {shape:?}"
        )),
    }
}

fn flat(shape: &[usize]) -> Result<usize, String> {
    match shape {
        &[features] => Ok(features),
        _ => Err(format!("expects a flat [features] input, got {shape:?}")),
    }
}

/// Output length of a windowed operation along one axis.
pub(crate) fn window_output(
    input: usize,
    window: usize,
    stride: usize,
    padding: Padding,
) -> usize {
    match padding {
        Padding::Same => input.div_ceil(stride),
        Padding::Valid if input >= window => (input - window) / stride + 1,
        Padding::Valid => 0,
    }
}

impl LayerConfig {
    pub fn name(&self) -> &'static str {
        match self {
            LayerConfig::Conv2d { .. } => "conv2d",
            LayerConfig::MaxPool2d { .. } => "max_pool2d",
            LayerConfig::GlobalMaxPool2d => "global_max_pool2d",
            LayerConfig::GlobalAveragePool2d => "global_average_pool2d",
            LayerConfig::Flatten => "flatten",
            LayerConfig::Dense { .. } => "dense",
            LayerConfig::BatchNormalization { .. } => "batch_normalization",
            LayerConfig::Dropout { .. } => "dropout",
            LayerConfig::Rescaling { .. } => "rescaling",
        }
    }

    /// Shape produced by this layer for the given input shape.
    pub fn output_shape(
        &self,
        input: &[usize],
    ) -> Result<Vec<usize>, String> {
        match *self {
            LayerConfig::Conv2d {
                filters,
                kernel_size,
                strides,
                padding,
                ..
            } => {
                if filters == 0 || kernel_size == 0 || strides == 0 {
                    return Err(
                        "filters, kernel_size and strides must be positive"
                            .to_string(),
                    );
                }
                let [height, width, _] = spatial(input)?;
                let out_height =
                    window_output(height, kernel_size, strides, padding);
                let out_width =
                    window_output(width, kernel_size, strides, padding);
                if out_height == 0 || out_width == 0 {
                    return Err(format!(
                        "kernel {kernel_size} does not fit input {input:?}"
                    ));
                }
                Ok(vec![out_height, out_width, filters])
            },
            LayerConfig::MaxPool2d {
                pool_size,
                strides,
            } => {
                let strides = strides.unwrap_or(pool_size);
                if pool_size == 0 || strides == 0 {
                    return Err(
                        "pool_size and strides must be positive".to_string()
                    );
                }
                let [height, width, channels] = spatial(input)?;
                let out_height =
                    window_output(height, pool_size, strides, Padding::Valid);
                let out_width =
                    window_output(width, pool_size, strides, Padding::Valid);
                if out_height == 0 || out_width == 0 {
                    return Err(format!(
                        "pool {pool_size} does not fit input {input:?}"
                    ));
                }
                Ok(vec![out_height, out_width, channels])
            },
            LayerConfig::GlobalMaxPool2d | LayerConfig::GlobalAveragePool2d => {
                let [_, _, channels] = spatial(input)?;
                Ok(vec![channels])
            },
            LayerConfig::Flatten => Ok(vec![input.iter().product()]),
            LayerConfig::Dense {
                units,
                ..
            } => {
                if units == 0 {
                    return Err("units must be positive".to_string());
                }
                flat(input)?;
                Ok(vec![units])
            },
            LayerConfig::BatchNormalization {
                epsilon,
            } => {
                if !(epsilon > 0.0) {
                    return Err("epsilon must be positive".to_string());
                }
                Ok(input.to_vec())
            },
            LayerConfig::Dropout {
                rate,
            } => {
                if !(0.0..1.0).contains(&rate) {
                    return Err(format!("dropout rate {rate} outside [0, 1)"));
                }
                Ok(input.to_vec())
            },
            LayerConfig::Rescaling {
                ..
            } => Ok(input.to_vec()),
        }
    }
}
