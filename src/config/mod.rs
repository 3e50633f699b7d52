mod defaults;
mod error;
mod loader;
mod raw;

pub use error::ConfigError;
pub(crate) use loader::{CliArgs, initialize_configuration, parse_cli_args};
pub(crate) use raw::{Config, ConfigRaw};
