use std::{
    fs,
    path::PathBuf,
    sync::{LazyLock, RwLock},
    time::Duration,
};

use mirrorgen_utils::{path::xdg_config_home, time::parse_duration};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{ConfigError, Result};

pub const DEFAULT_REGISTRY_URL: &str = "https://skimdb.npmjs.com/registry/_all_docs";
pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_PARALLEL_LIMIT: u32 = 8;
pub const DEFAULT_LICENSE: &str = "WTFPL";
pub const DEFAULT_DESCRIPTION: &str = "A package that gets all packages.";
pub const DEFAULT_PUBLISH_COMMAND: &str = "npm publish";

/// Run configuration.
///
/// Every field is optional in the TOML file; [`Config::resolve`] fills in the
/// defaults and rejects values that can never work.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Config {
    /// Registry index endpoint returning the full snapshot.
    /// Default: https://skimdb.npmjs.com/registry/_all_docs
    pub registry_url: Option<String>,

    /// Number of registry entries per generated package.
    /// Default: 1000
    pub batch_size: Option<usize>,

    /// If false, batches are written and published one at a time.
    /// Default: true
    pub parallel: Option<bool>,

    /// Maximum number of batches in flight. 0 removes the bound.
    /// Default: 8
    pub parallel_limit: Option<u32>,

    /// License written into every manifest.
    /// Default: WTFPL
    pub license: Option<String>,

    /// Description written into every manifest.
    pub description: Option<String>,

    /// Homepage written into every manifest.
    /// Default: empty
    pub homepage: Option<String>,

    /// Entry point written into the `main` field.
    /// Default: empty
    pub main: Option<String>,

    /// Write a README.md next to each manifest.
    /// Default: true
    pub readme: Option<bool>,

    /// Invoke the publish command for every artifact.
    /// Default: true
    pub publish: Option<bool>,

    /// Command line used to publish; the artifact path is appended.
    /// Default: npm publish
    pub publish_command: Option<String>,

    /// Global timeout for the snapshot request, e.g. `10m`.
    pub timeout: Option<String>,

    /// User agent for the snapshot request.
    pub user_agent: Option<String>,
}

pub static CONFIG: LazyLock<RwLock<Option<Config>>> = LazyLock::new(|| RwLock::new(None));

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| {
    RwLock::new(match std::env::var("MIRRORGEN_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => xdg_config_home().join("mirrorgen").join("config.toml"),
    })
});

/// Loads the configuration file into the global [`CONFIG`].
pub fn init() -> Result<()> {
    let config = Config::new()?;
    let mut global_config = CONFIG.write().unwrap();
    *global_config = Some(config);
    Ok(())
}

pub fn get_config() -> Config {
    {
        let config_guard = CONFIG.read().unwrap();
        if let Some(config) = config_guard.as_ref() {
            return config.clone();
        }
    }

    let mut config_guard = CONFIG.write().unwrap();
    config_guard.get_or_insert_with(Config::default_config).clone()
}

impl Config {
    pub fn default_config() -> Self {
        Self {
            registry_url: Some(DEFAULT_REGISTRY_URL.to_string()),
            batch_size: Some(DEFAULT_BATCH_SIZE),
            parallel: Some(true),
            parallel_limit: Some(DEFAULT_PARALLEL_LIMIT),
            license: Some(DEFAULT_LICENSE.to_string()),
            description: Some(DEFAULT_DESCRIPTION.to_string()),
            homepage: Some(String::new()),
            main: Some(String::new()),
            readme: Some(true),
            publish: Some(true),
            publish_command: Some(DEFAULT_PUBLISH_COMMAND.to_string()),
            timeout: None,
            user_agent: None,
        }
    }

    /// Reads the configuration file at [`CONFIG_PATH`].
    /// A missing file yields the default configuration.
    pub fn new() -> Result<Self> {
        let config_path = CONFIG_PATH.read().unwrap().to_path_buf();

        let mut config = match fs::read_to_string(&config_path) {
            Ok(content) => {
                debug!("loading configuration from {}", config_path.display());
                Self::from_toml(&content)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default_config(),
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn resolve(&mut self) -> Result<()> {
        self.registry_url
            .get_or_insert_with(|| DEFAULT_REGISTRY_URL.to_string());
        self.batch_size.get_or_insert(DEFAULT_BATCH_SIZE);
        self.parallel.get_or_insert(true);
        self.parallel_limit.get_or_insert(DEFAULT_PARALLEL_LIMIT);
        self.license.get_or_insert_with(|| DEFAULT_LICENSE.to_string());
        self.description
            .get_or_insert_with(|| DEFAULT_DESCRIPTION.to_string());
        self.homepage.get_or_insert_with(String::new);
        self.main.get_or_insert_with(String::new);
        self.readme.get_or_insert(true);
        self.publish.get_or_insert(true);
        self.publish_command
            .get_or_insert_with(|| DEFAULT_PUBLISH_COMMAND.to_string());

        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        let batch_size = self.batch_size();
        if batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }

        let registry_url = self.registry_url();
        let parsed = Url::parse(registry_url)
            .map_err(|err| ConfigError::InvalidRegistryUrl(format!("{registry_url}: {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidRegistryUrl(registry_url.to_string()));
        }

        self.timeout()?;

        if self.publish_enabled() {
            self.publish_command()?;
        }

        Ok(())
    }

    pub fn registry_url(&self) -> &str {
        self.registry_url.as_deref().unwrap_or(DEFAULT_REGISTRY_URL)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    /// Upper bound on concurrently running batches, `None` when unbounded.
    pub fn max_in_flight(&self) -> Option<usize> {
        if !self.parallel.unwrap_or(true) {
            return Some(1);
        }
        match self.parallel_limit.unwrap_or(DEFAULT_PARALLEL_LIMIT) {
            0 => None,
            limit => Some(limit as usize),
        }
    }

    pub fn license(&self) -> &str {
        self.license.as_deref().unwrap_or(DEFAULT_LICENSE)
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION)
    }

    pub fn homepage(&self) -> &str {
        self.homepage.as_deref().unwrap_or_default()
    }

    pub fn main(&self) -> &str {
        self.main.as_deref().unwrap_or_default()
    }

    pub fn readme_enabled(&self) -> bool {
        self.readme.unwrap_or(true)
    }

    pub fn publish_enabled(&self) -> bool {
        self.publish.unwrap_or(true)
    }

    /// Splits the publish command line into program and leading arguments.
    pub fn publish_command(&self) -> Result<Vec<String>> {
        let parts: Vec<String> = self
            .publish_command
            .as_deref()
            .unwrap_or(DEFAULT_PUBLISH_COMMAND)
            .split_whitespace()
            .map(String::from)
            .collect();

        if parts.is_empty() {
            return Err(ConfigError::EmptyPublishCommand);
        }
        Ok(parts)
    }

    pub fn timeout(&self) -> Result<Option<Duration>> {
        match self.timeout.as_deref() {
            None => Ok(None),
            Some(value) => {
                parse_duration(value)
                    .filter(|d| !d.is_zero())
                    .map(Some)
                    .ok_or_else(|| ConfigError::InvalidDuration(value.to_string()))
            }
        }
    }
}
