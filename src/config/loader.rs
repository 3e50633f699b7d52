use std::path::Path;

use clap::{Arg, ArgAction, Command};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use super::{Config, ConfigRaw, defaults};
use crate::config::ConfigError;

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "HARVEST_";
const API_KEY_ENV: &str = "HARVEST_API_KEY";

/// Command line arguments.
#[derive(Debug, Clone, Default)]
pub(crate) struct CliArgs {
    pub config: Option<String>,
    pub hydrate_all: bool,
}

pub(crate) fn parse_cli_args() -> CliArgs {
    let matches = Command::new("chain-harvest")
        .about("Harvests explorer records into local sector stores")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Sets a custom config file (.toml format)"),
        )
        .arg(
            Arg::new("hydrate-all")
                .long("hydrate-all")
                .action(ArgAction::SetTrue)
                .help("Re-fetch detail for every stored record of every target"),
        )
        .get_matches();

    CliArgs {
        config: matches.get_one::<String>("config").cloned(),
        hydrate_all: matches.get_flag("hydrate-all"),
    }
}

pub(crate) fn initialize_configuration(args: &CliArgs) -> Result<Config, ConfigError> {
    let custom_config_path = args.config.as_deref();
    if let Some(path) = custom_config_path
        && !Path::new(path).exists()
    {
        return Err(ConfigError::MissingConfig(path.to_string()));
    }

    // Priority, lowest to highest: defaults, config.toml, -c file, environment
    let mut figment = Figment::from(Serialized::defaults(defaults::config()));

    if Path::new(DEFAULT_CONFIG_FILE).exists() {
        figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE));
    }

    if let Some(config_path) = custom_config_path {
        tracing::info!("Loading custom config file: {}", config_path);
        figment = figment.merge(Toml::file(config_path));
    }

    figment = figment
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["API_KEY"]).split("__"))
        .merge(
            Env::raw()
                .only(&[API_KEY_ENV])
                .map(|_| "client.api_key".into()),
        );

    let config: ConfigRaw = figment.extract().map_err(Box::new)?;

    config.resolve()
}
