use ndarray::{ArrayBase, Data, Dimension};

use crate::{Error, Network, PredictionVectorError, Result};

/// Runs one forward pass of `network` over `tensor`.
///
/// The tensor shape is checked against the network's declared input before
/// any computation happens.
pub fn infer<S, D>(
    network: &dyn Network,
    tensor: &ArrayBase<S, D>,
) -> Result<Box<[f32]>>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    if tensor.shape() != network.input_shape() {
        return Err(Error::ShapeMismatch {
            expected: network.input_shape().into(),
            actual: tensor.shape().into(),
        });
    }

    let output = network.forward(tensor.view().into_dyn())?;
    if output.len() != network.num_outputs() {
        return Err(PredictionVectorError::LengthMismatch {
            expected: network.num_outputs(),
            actual: output.len(),
        }
        .into());
    }
    Ok(output)
}
