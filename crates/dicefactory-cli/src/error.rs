use std::path::PathBuf;

use dicefactory_core::config::ConfigError;
use dicefactory_core::scenario::ScenarioError;
use dicefactory_core::serialize::{DeserializeError, SerializeError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error("could not write save file: {0}")]
    Save(#[from] SerializeError),

    #[error("could not load save file {file}: {source}")]
    Load {
        file: PathBuf,
        #[source]
        source: DeserializeError,
    },

    #[error("{file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
