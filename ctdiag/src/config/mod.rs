mod activation;
mod error;
mod layer_config;
mod network_config;

pub use activation::Activation;
pub use error::ConfigError;
pub use layer_config::{LayerConfig, Padding};
pub use network_config::{NETWORK_CONFIG_KEY, NetworkConfig, NetworkSection};
