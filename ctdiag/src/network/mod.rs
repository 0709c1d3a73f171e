mod kernels;
mod layer;
mod sequential;

use ndarray::ArrayViewD;

use layer::Layer;
pub use sequential::SequentialNetwork;

use crate::Result;

/// Opaque handle over a loaded classification network.
///
/// Implementations are immutable once built, so a single handle can serve
/// concurrent forward passes.
pub trait Network: Send + Sync {
    fn name(&self) -> &str;

    /// Expected input shape including the leading batch axis.
    fn input_shape(&self) -> &[usize];

    /// Length of the vector returned by [`Network::forward`].
    fn num_outputs(&self) -> usize;

    fn forward(
        &self,
        input: ArrayViewD<'_, f32>,
    ) -> Result<Box<[f32]>>;
}
