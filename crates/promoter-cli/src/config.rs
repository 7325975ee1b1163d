use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, ValueHint};
use std::fs;
use std::path::{Path, PathBuf};

use promoter_core::{EnsembleMode, ServiceConfig};

/// Arguments shared by every subcommand that talks to the model registry.
pub fn service_args() -> Vec<Arg> {
    vec![
        Arg::new("config")
            .short('c')
            .long("config")
            .help("Path to service JSON configuration file")
            .value_parser(clap::value_parser!(PathBuf))
            .value_hint(ValueHint::FilePath),
        Arg::new("models_dir")
            .short('m')
            .long("models-dir")
            .help(
                "Root directory with one sub-directory of model artifacts per organism. \
                 Overrides the directory specified in the configuration file.",
            )
            .value_parser(clap::value_parser!(PathBuf))
            .value_hint(ValueHint::DirPath),
        Arg::new("cache")
            .long("cache")
            .help("Keep loaded models in memory between requests.")
            .action(ArgAction::SetTrue),
        Arg::new("partial")
            .long("partial")
            .help("Report failing models next to successful predictions instead of failing the request.")
            .action(ArgAction::SetTrue),
        Arg::new("sequential")
            .long("sequential")
            .help("Evaluate the models of an ensemble one after another.")
            .action(ArgAction::SetTrue),
    ]
}

/// Read a service configuration file, keeping the default for every field that
/// is missing or does not parse.
pub fn load_service_config(config_path: &Path) -> Result<ServiceConfig> {
    let config_json = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

    let partial: serde_json::Value = serde_json::from_str(&config_json)
        .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;
    let mut config = ServiceConfig::default();

    macro_rules! load_or_default {
        ($field:ident) => {
            if let Some(val) = partial.get(stringify!($field)) {
                if let Ok(parsed) = serde_json::from_value(val.clone()) {
                    config.$field = parsed;
                } else {
                    log::warn!(
                        "Config Invalid value for '{}', using default: {:?}",
                        stringify!($field), config.$field
                    );
                }
            } else {
                log::warn!(
                    "Config Missing field '{}', using default: {:?}",
                    stringify!($field), config.$field
                );
            }
        };
    }

    load_or_default!(models_dir);
    load_or_default!(cache_models);
    load_or_default!(ensemble_mode);
    load_or_default!(parallel_inference);
    load_or_default!(formats);

    Ok(config)
}

/// Build the service configuration from the optional `config` argument and
/// apply the command line overrides on top.
pub fn service_config_from_arguments(matches: &ArgMatches) -> Result<ServiceConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => {
            log::info!("[promoter] Using config: {:?}", path);
            load_service_config(path)?
        }
        None => ServiceConfig::default(),
    };

    // Apply CLI overrides
    if let Some(models_dir) = matches.get_one::<PathBuf>("models_dir") {
        config.models_dir = models_dir.clone();
    }
    if matches.get_flag("cache") {
        config.cache_models = true;
    }
    if matches.get_flag("partial") {
        config.ensemble_mode = EnsembleMode::Partial;
    }
    if matches.get_flag("sequential") {
        config.parallel_inference = false;
    }

    Ok(config)
}
