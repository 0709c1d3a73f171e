use ndarray::{
    Array1, Array2, Array4, ArrayD, ArrayView1, ArrayView2, ArrayView4, Axis, s,
};

use crate::config::{Activation, Padding};

fn same_padding_before(
    input: usize,
    window: usize,
    stride: usize,
    output: usize,
) -> usize {
    ((output - 1) * stride + window).saturating_sub(input) / 2
}

/// 2D convolution over NHWC input via im2col.
///
/// `kernel` is the `(kh, kw, in, out)` kernel flattened to
/// `(kh * kw * in, out)`.
pub fn conv2d(
    input: ArrayView4<'_, f32>,
    kernel: ArrayView2<'_, f32>,
    bias: ArrayView1<'_, f32>,
    kernel_size: usize,
    strides: usize,
    padding: Padding,
    output_hw: (usize, usize),
) -> Array4<f32> {
    let (batch, height, width, channels) = input.dim();
    let (out_height, out_width) = output_hw;
    let filters = kernel.ncols();
    let (pad_top, pad_left) = match padding {
        Padding::Same => (
            same_padding_before(height, kernel_size, strides, out_height),
            same_padding_before(width, kernel_size, strides, out_width),
        ),
        Padding::Valid => (0, 0),
    };

    let mut output = Array4::zeros((batch, out_height, out_width, filters));
    let mut patches =
        Array2::<f32>::zeros((out_height * out_width, kernel.nrows()));
    for n in 0..batch {
        patches.fill(0.0);
        for oy in 0..out_height {
            for ox in 0..out_width {
                let row = oy * out_width + ox;
                for ky in 0..kernel_size {
                    let Some(iy) = (oy * strides + ky).checked_sub(pad_top)
                    else {
                        continue;
                    };
                    if iy >= height {
                        continue;
                    }
                    for kx in 0..kernel_size {
                        let Some(ix) = (ox * strides + kx).checked_sub(pad_left)
                        else {
                            continue;
                        };
                        if ix >= width {
                            continue;
                        }
                        let column = (ky * kernel_size + kx) * channels;
                        patches
                            .slice_mut(s![row, column..column + channels])
                            .assign(&input.slice(s![n, iy, ix, ..]));
                    }
                }
            }
        }

        let result = patches.dot(&kernel) + &bias;
        for (row, values) in result.outer_iter().enumerate() {
            output
                .slice_mut(s![n, row / out_width, row % out_width, ..])
                .assign(&values);
        }
    }
    output
}

pub fn max_pool2d(
    input: ArrayView4<'_, f32>,
    pool_size: usize,
    strides: usize,
    output_hw: (usize, usize),
) -> Array4<f32> {
    let (batch, _, _, channels) = input.dim();
    let (out_height, out_width) = output_hw;
    let mut output = Array4::from_elem(
        (batch, out_height, out_width, channels),
        f32::NEG_INFINITY,
    );
    for n in 0..batch {
        for oy in 0..out_height {
            for ox in 0..out_width {
                let window = input.slice(s![
                    n,
                    oy * strides..oy * strides + pool_size,
                    ox * strides..ox * strides + pool_size,
                    ..
                ]);
                let mut pooled = output.slice_mut(s![n, oy, ox, ..]);
                for values in window.lanes(Axis(2)) {
                    pooled.zip_mut_with(&values, |max, &value| {
                        *max = max.max(value)
                    });
                }
            }
        }
    }
    output
}

pub fn global_max_pool2d(input: ArrayView4<'_, f32>) -> Array2<f32> {
    input
        .fold_axis(Axis(1), f32::NEG_INFINITY, |&a, &b| a.max(b))
        .fold_axis(Axis(1), f32::NEG_INFINITY, |&a, &b| a.max(b))
}

pub fn global_average_pool2d(input: ArrayView4<'_, f32>) -> Array2<f32> {
    let (_, height, width, _) = input.dim();
    input.sum_axis(Axis(1)).sum_axis(Axis(1)) / (height * width) as f32
}

pub fn dense(
    input: ArrayView2<'_, f32>,
    kernel: ArrayView2<'_, f32>,
    bias: ArrayView1<'_, f32>,
) -> Array2<f32> {
    input.dot(&kernel) + &bias
}

/// Inference-time batch normalization with the moving statistics already
/// folded into a per-channel `scale` and `shift`.
pub fn batch_normalization(
    mut input: ArrayD<f32>,
    scale: &Array1<f32>,
    shift: &Array1<f32>,
) -> ArrayD<f32> {
    input *= scale;
    input += shift;
    input
}

pub fn activate(
    input: &mut ArrayD<f32>,
    activation: Activation,
) {
    match activation {
        Activation::Linear => {},
        Activation::Relu => input.mapv_inplace(|x| x.max(0.0)),
        Activation::Sigmoid => input.mapv_inplace(|x| 1.0 / (1.0 + (-x).exp())),
        Activation::Softmax => softmax(input),
    }
}

/// Numerically stable softmax along the last axis.
pub fn softmax(input: &mut ArrayD<f32>) {
    let Some(last_axis) = input.ndim().checked_sub(1) else {
        return;
    };
    for mut lane in input.lanes_mut(Axis(last_axis)) {
        let max = lane.fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        lane.mapv_inplace(|x| (x - max).exp());
        let sum = lane.sum();
        lane.mapv_inplace(|x| x / sum);
    }
}
