use ndarray::{Array1, Array2, Array4, ArrayD, Ix1, Ix2, Ix4};

use super::kernels;
use crate::{
    Error, NetworkLoadError, Result,
    config::{Activation, LayerConfig, Padding},
    parameters::{ParameterLoaderError, ParameterTree},
};

/// A layer with its parameters resolved, ready for inference.
#[derive(Debug, Clone)]
pub enum Layer {
    Conv2d {
        kernel: Array2<f32>,
        bias: Array1<f32>,
        kernel_size: usize,
        strides: usize,
        padding: Padding,
        activation: Activation,
        output_hw: (usize, usize),
    },
    MaxPool2d {
        pool_size: usize,
        strides: usize,
        output_hw: (usize, usize),
    },
    GlobalMaxPool2d,
    GlobalAveragePool2d,
    Flatten,
    Dense {
        kernel: Array2<f32>,
        bias: Array1<f32>,
        activation: Activation,
    },
    BatchNormalization {
        scale: Array1<f32>,
        shift: Array1<f32>,
    },
    Identity,
    Rescaling {
        scale: f32,
        offset: f32,
    },
}

fn load_checked(
    tree: &ParameterTree<'_, '_>,
    name: &str,
    expected: &[usize],
) -> std::result::Result<ArrayD<f32>, NetworkLoadError> {
    let shape = tree.shape(name)?;
    if shape != expected {
        return Err(NetworkLoadError::ParameterShape {
            name: tree.join_prefix(name),
            expected: expected.into(),
            actual: shape.into(),
        });
    }
    Ok(tree.leaf(name)?)
}

fn load_vector(
    tree: &ParameterTree<'_, '_>,
    name: &str,
    length: usize,
) -> std::result::Result<Array1<f32>, NetworkLoadError> {
    let array = load_checked(tree, name, &[length])?;
    array
        .into_dimensionality::<Ix1>()
        .map_err(|_| NetworkLoadError::ParameterShape {
            name: tree.join_prefix(name),
            expected: Box::new([length]),
            actual: Box::new([]),
        })
}

fn load_optional_vector(
    tree: &ParameterTree<'_, '_>,
    name: &str,
    length: usize,
    default: f32,
) -> std::result::Result<Array1<f32>, NetworkLoadError> {
    match load_vector(tree, name, length) {
        Err(NetworkLoadError::Parameter(ParameterLoaderError::KeyNotFound(
            _,
        ))) => Ok(Array1::from_elem(length, default)),
        other => other,
    }
}

fn load_matrix(
    tree: &ParameterTree<'_, '_>,
    name: &str,
    expected: &[usize],
    rows: usize,
    columns: usize,
) -> std::result::Result<Array2<f32>, NetworkLoadError> {
    let array = load_checked(tree, name, expected)?;
    let shape_error = || NetworkLoadError::ParameterShape {
        name: tree.join_prefix(name),
        expected: expected.into(),
        actual: Box::new([rows, columns]),
    };
    array
        .into_shape_with_order((rows, columns))
        .map_err(|_| shape_error())
}

fn shape_mismatch(
    expected: &[usize],
    actual: &[usize],
) -> Error {
    Error::ShapeMismatch {
        expected: expected.into(),
        actual: actual.into(),
    }
}

impl Layer {
    /// Resolves the parameters of `config` for an input of shape
    /// `input_shape` (batch axis excluded).
    ///
    /// `tree` is only consulted by layers that own parameters.
    pub fn load<'loader, 'file: 'loader>(
        config: &LayerConfig,
        input_shape: &[usize],
        output_shape: &[usize],
        tree: impl FnOnce() -> std::result::Result<
            ParameterTree<'loader, 'file>,
            ParameterLoaderError,
        >,
    ) -> std::result::Result<Self, NetworkLoadError> {
        let layer = match *config {
            LayerConfig::Conv2d {
                filters,
                kernel_size,
                strides,
                padding,
                activation,
            } => {
                let tree = tree()?;
                let channels = input_shape[input_shape.len() - 1];
                let patch_len = kernel_size * kernel_size * channels;
                Layer::Conv2d {
                    kernel: load_matrix(
                        &tree,
                        "kernel",
                        &[kernel_size, kernel_size, channels, filters],
                        patch_len,
                        filters,
                    )?,
                    bias: load_vector(&tree, "bias", filters)?,
                    kernel_size,
                    strides,
                    padding,
                    activation,
                    output_hw: (output_shape[0], output_shape[1]),
                }
            },
            LayerConfig::MaxPool2d {
                pool_size,
                strides,
            } => Layer::MaxPool2d {
                pool_size,
                strides: strides.unwrap_or(pool_size),
                output_hw: (output_shape[0], output_shape[1]),
            },
            LayerConfig::GlobalMaxPool2d => Layer::GlobalMaxPool2d,
            LayerConfig::GlobalAveragePool2d => Layer::GlobalAveragePool2d,
            LayerConfig::Flatten => Layer::Flatten,
            LayerConfig::Dense {
                units,
                activation,
            } => {
                let tree = tree()?;
                let features = input_shape[0];
                Layer::Dense {
                    kernel: load_matrix(
                        &tree,
                        "kernel",
                        &[features, units],
                        features,
                        units,
                    )?,
                    bias: load_vector(&tree, "bias", units)?,
                    activation,
                }
            },
            LayerConfig::BatchNormalization {
                epsilon,
            } => {
                let tree = tree()?;
                let features = input_shape[input_shape.len() - 1];
                let gamma =
                    load_optional_vector(&tree, "gamma", features, 1.0)?;
                let beta = load_optional_vector(&tree, "beta", features, 0.0)?;
                let mean = load_vector(&tree, "moving_mean", features)?;
                let variance = load_vector(&tree, "moving_variance", features)?;

                let scale = gamma / variance.mapv(|v| (v + epsilon).sqrt());
                let shift = beta - &mean * &scale;
                Layer::BatchNormalization {
                    scale,
                    shift,
                }
            },
            LayerConfig::Dropout {
                ..
            } => Layer::Identity,
            LayerConfig::Rescaling {
                scale,
                offset,
            } => Layer::Rescaling {
                scale,
                offset,
            },
        };
        Ok(layer)
    }

    pub fn forward(
        &self,
        input: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        let output = match self {
            Layer::Conv2d {
                kernel,
                bias,
                kernel_size,
                strides,
                padding,
                activation,
                output_hw,
            } => {
                let input = into_spatial(input)?;
                let patch_len = kernel_size * kernel_size * input.dim().3;
                if patch_len != kernel.nrows() {
                    return Err(shape_mismatch(
                        &[kernel.nrows() / (kernel_size * kernel_size)],
                        &[input.dim().3],
                    ));
                }
                let mut output = kernels::conv2d(
                    input.view(),
                    kernel.view(),
                    bias.view(),
                    *kernel_size,
                    *strides,
                    *padding,
                    *output_hw,
                )
                .into_dyn();
                kernels::activate(&mut output, *activation);
                output
            },
            Layer::MaxPool2d {
                pool_size,
                strides,
                output_hw,
            } => {
                let input = into_spatial(input)?;
                kernels::max_pool2d(
                    input.view(),
                    *pool_size,
                    *strides,
                    *output_hw,
                )
                .into_dyn()
            },
            Layer::GlobalMaxPool2d => {
                kernels::global_max_pool2d(into_spatial(input)?.view())
                    .into_dyn()
            },
            Layer::GlobalAveragePool2d => {
                kernels::global_average_pool2d(into_spatial(input)?.view())
                    .into_dyn()
            },
            Layer::Flatten => {
                let batch = input.shape().first().copied().unwrap_or(1);
                let features = input.len() / batch.max(1);
                input
                    .to_shape((batch, features))
                    .map_err(|_| {
                        shape_mismatch(&[batch, features], input.shape())
                    })?
                    .into_owned()
                    .into_dyn()
            },
            Layer::Dense {
                kernel,
                bias,
                activation,
            } => {
                let actual: Box<[usize]> = input.shape().into();
                let input = input
                    .into_dimensionality::<Ix2>()
                    .map_err(|_| {
                        shape_mismatch(&[1, kernel.nrows()], &actual)
                    })?;
                if input.ncols() != kernel.nrows() {
                    return Err(shape_mismatch(&[1, kernel.nrows()], &actual));
                }
                let mut output =
                    kernels::dense(input.view(), kernel.view(), bias.view())
                        .into_dyn();
                kernels::activate(&mut output, *activation);
                output
            },
            Layer::BatchNormalization {
                scale,
                shift,
            } => kernels::batch_normalization(input, scale, shift),
            Layer::Identity => input,
            Layer::Rescaling {
                scale,
                offset,
            } => input.mapv_into(|x| x * *scale + *offset),
        };
        Ok(output)
    }
}

fn into_spatial(input: ArrayD<f32>) -> Result<Array4<f32>> {
    let actual: Box<[usize]> = input.shape().into();
    input
        .into_dimensionality::<Ix4>()
        .map_err(|_| shape_mismatch(&[1, 0, 0, 0], &actual))
}
