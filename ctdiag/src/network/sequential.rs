use std::{fs::File, io::ErrorKind, path::Path};

use ndarray::ArrayViewD;
use tracing::debug;

use super::{Layer, Network};
use crate::{
    Error, NetworkLoadError, Result,
    config::{ConfigError, NETWORK_CONFIG_KEY, NetworkConfig},
    parameters::ParameterLoader,
};

/// A feed-forward network whose layers run one after another on the CPU.
#[derive(Debug, Clone)]
pub struct SequentialNetwork {
    name: String,
    input_shape: Box<[usize]>,
    num_outputs: usize,
    layers: Box<[Layer]>,
}

impl SequentialNetwork {
    /// Loads a network from a safetensors file whose `__metadata__` carries
    /// the architecture under `network_config`.
    pub fn load(path: &Path) -> std::result::Result<Self, NetworkLoadError> {
        let file = File::open(path).map_err(|error| match error.kind() {
            ErrorKind::NotFound => {
                NetworkLoadError::WeightsNotFound(path.display().to_string())
            },
            _ => NetworkLoadError::Io(error),
        })?;
        let loader = ParameterLoader::new(&file)?;
        let config_json = loader
            .metadata()
            .get(NETWORK_CONFIG_KEY)
            .ok_or(NetworkLoadError::MissingNetworkConfig)?;
        let config = NetworkConfig::from_json(config_json)?;
        Self::from_loader(&config, &loader)
    }

    pub fn from_loader(
        config: &NetworkConfig,
        loader: &ParameterLoader<'_>,
    ) -> std::result::Result<Self, NetworkLoadError> {
        let output_shape = config.validate()?;

        let root = loader.tree();
        let mut layers = Vec::new();
        let mut shape = config.input_shape.to_vec();
        for (section, layer_configs) in config.sections() {
            for (index, layer_config) in layer_configs.iter().enumerate() {
                let next_shape = layer_config
                    .output_shape(&shape)
                    .map_err(|reason| ConfigError::InvalidLayer {
                        section,
                        index,
                        reason,
                    })?;
                let layer = Layer::load(layer_config, &shape, &next_shape, || {
                    root.subtree(section.key())?.subtree(&index.to_string())
                })?;
                debug!(
                    network = %config.name,
                    %section,
                    index,
                    layer = layer_config.name(),
                    output_shape = ?next_shape,
                    "Loaded layer"
                );
                layers.push(layer);
                shape = next_shape;
            }
        }

        let mut input_shape = vec![1];
        input_shape.extend_from_slice(&config.input_shape);
        Ok(Self {
            name: config.name.clone(),
            input_shape: input_shape.into(),
            num_outputs: output_shape.iter().product(),
            layers: layers.into(),
        })
    }
}

impl Network for SequentialNetwork {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    fn forward(
        &self,
        input: ArrayViewD<'_, f32>,
    ) -> Result<Box<[f32]>> {
        if input.shape() != self.input_shape() {
            return Err(Error::ShapeMismatch {
                expected: self.input_shape.clone(),
                actual: input.shape().into(),
            });
        }

        let mut activations = input.to_owned();
        for layer in self.layers.iter() {
            activations = layer.forward(activations)?;
        }
        Ok(activations.iter().copied().collect())
    }
}
