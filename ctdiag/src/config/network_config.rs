use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Activation, ConfigError, LayerConfig};

/// Metadata key holding the serialized [`NetworkConfig`] inside a weight file.
pub const NETWORK_CONFIG_KEY: &str = "network_config";

const EMBEDDED_RESCALE_TOLERANCE: f32 = 1e-6;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Copy, Clone, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NetworkSection {
    FeatureExtractor,
    ClassificationHead,
}

impl NetworkSection {
    /// Prefix of the parameter names belonging to this section.
    pub fn key(&self) -> &'static str {
        match self {
            NetworkSection::FeatureExtractor => "feature_extractor",
            NetworkSection::ClassificationHead => "classification_head",
        }
    }
}

impl fmt::Display for NetworkSection {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Architecture of a frozen feature extractor followed by a classification
/// head, stored next to the weights.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct NetworkConfig {
    pub name: String,
    /// `[height, width, channels]` of a single input image.
    pub input_shape: [usize; 3],
    pub feature_extractor: Vec<LayerConfig>,
    pub classification_head: Vec<LayerConfig>,
}

impl NetworkConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: NetworkConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn sections(&self) -> [(NetworkSection, &[LayerConfig]); 2] {
        [
            (
                NetworkSection::FeatureExtractor,
                self.feature_extractor.as_slice(),
            ),
            (
                NetworkSection::ClassificationHead,
                self.classification_head.as_slice(),
            ),
        ]
    }

    /// Checks that every layer accepts the shape produced by its predecessor
    /// and that the last one emits a probability distribution. Returns the
    /// final (unbatched) output shape.
    pub fn validate(&self) -> Result<Vec<usize>, ConfigError> {
        if self.input_shape.contains(&0) {
            return Err(ConfigError::InvalidInputShape(self.input_shape));
        }
        let last_layer = self
            .classification_head
            .last()
            .or(self.feature_extractor.last())
            .ok_or(ConfigError::NoLayers)?;
        if !matches!(
            last_layer,
            LayerConfig::Dense {
                activation: Activation::Softmax,
                ..
            }
        ) {
            return Err(ConfigError::MissingSoftmaxOutput);
        }

        let mut shape = self.input_shape.to_vec();
        for (section, layers) in self.sections() {
            for (index, layer) in layers.iter().enumerate() {
                if let LayerConfig::Rescaling {
                    scale,
                    ..
                } = layer
                {
                    let embedded = (*scale - 1.0 / 255.0).abs()
                        < EMBEDDED_RESCALE_TOLERANCE;
                    if embedded {
                        return Err(ConfigError::EmbeddedNormalization {
                            section,
                            index,
                        });
                    }
                }
                shape = layer.output_shape(&shape).map_err(|reason| {
                    ConfigError::InvalidLayer {
                        section,
                        index,
                        reason: format!("{}: {reason}", layer.name()),
                    }
                })?;
            }
        }
        Ok(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Padding;

    fn vgg_like() -> NetworkConfig {
        NetworkConfig {
            name: "kidney_diagnose".to_string(),
            input_shape: [150, 150, 3],
            feature_extractor: vec![
                LayerConfig::Conv2d {
                    filters: 8,
                    kernel_size: 3,
                    strides: 1,
                    padding: Padding::Same,
                    activation: Activation::Relu,
                },
                LayerConfig::MaxPool2d {
                    pool_size: 2,
                    strides: None,
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
                    units: 4,
                    activation: Activation::Softmax,
                },
            ],
        }
    }

    #[test]
    fn test_validate_output_shape() {
        assert_eq!(vgg_like().validate().unwrap(), vec![4]);
    }

    #[test]
    fn test_json_round_trip_keeps_layers() {
        let config = vgg_like();
        let parsed =
            NetworkConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_rejects_embedded_rescaling() {
        let mut config = vgg_like();
        config.feature_extractor.insert(
            0,
            LayerConfig::Rescaling {
                scale: 1.0 / 255.0,
                offset: 0.0,
            },
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmbeddedNormalization {
                section: NetworkSection::FeatureExtractor,
                index: 0,
            })
        ));
    }

    #[test]
    fn test_rejects_dense_on_spatial_input() {
        let mut config = vgg_like();
        config.feature_extractor.pop();
        config.classification_head.remove(0);
        let error = config.validate().unwrap_err();
        assert!(matches!(
            error,
            ConfigError::InvalidLayer {
                section: NetworkSection::ClassificationHead,
                index: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_requires_softmax_output() {
        let mut config = vgg_like();
        config.classification_head[4] = LayerConfig::Dense {
            units: 4,
            activation: Activation::Linear,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingSoftmaxOutput)
        ));

        let mut config = vgg_like();
        config.classification_head.push(LayerConfig::Dropout {
            rate: 0.1,
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingSoftmaxOutput)
        ));

        let mut config = vgg_like();
        config.feature_extractor.clear();
        config.classification_head.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoLayers)));
    }
}
