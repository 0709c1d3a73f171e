pub mod error;
pub mod handlers;
pub mod logging;
pub mod server;

pub use error::CliError;
