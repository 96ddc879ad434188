use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Name of the project configuration file looked up in the project directory.
pub const CONFIG_FILE_NAME: &str = ".solnorm.toml";

/// The build tool a project was compiled with.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum IdeKind {
    /// Plain standard-JSON compiler output.
    Solidity,
    Truffle,
    Hardhat,
    Brownie,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file {path:?}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Project configuration, as read from [`CONFIG_FILE_NAME`].
///
/// ```toml
/// [project]
/// ide = "hardhat"
/// build_directory = "artifacts"
/// targets = ["contracts/Vault.sol"]
///
/// [report]
/// min_severity = "low"
/// swc_blacklist = ["SWC-103"]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub project: ProjectConfig,
    pub report: ReportConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Overrides build tool detection.
    pub ide: Option<IdeKind>,
    /// Relative paths are resolved against the project directory.
    pub build_directory: Option<PathBuf>,
    /// Files or directories whose contracts are submitted. Empty means everything.
    pub targets: Vec<PathBuf>,
    pub solc_version: Option<String>,
    /// Strip the local directory prefix from submitted paths.
    pub sanitize: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { ide: None, build_directory: None, targets: vec![], solc_version: None, sanitize: true }
    }
}

/// How decoded reports are rendered.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ReportFormat {
    /// One block per issue with its resolved locations.
    #[default]
    Text,
    /// Source files annotated line by line.
    Lines,
    Json,
    JsonPretty,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub min_severity: Option<String>,
    pub swc_blacklist: Vec<String>,
    pub swc_whitelist: Vec<String>,
    pub format: Option<ReportFormat>,
}

impl Config {
    /// Loads the configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        trace!(?path, "loading config");
        let content = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        toml::from_str(&content)
            .map_err(|source| ConfigError::Toml { path: path.to_path_buf(), source })
    }

    /// Loads `<dir>/.solnorm.toml` if it exists, otherwise returns the default configuration.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = dir.as_ref().join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(path)
        } else {
            debug!(?path, "no config file found, using defaults");
            Ok(Self::default())
        }
    }
}
