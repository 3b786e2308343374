use crate::error::{ConfigError, Result};
use crate::validation::ConfigValidation;
use figment::{
    providers::{Env, Format, Serialized, Toml, Yaml},
    Figment,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};

/// Environment prefix shared by every CareSync binary
pub const DEFAULT_ENV_PREFIX: &str = "CARESYNC_";

/// Separator for nested keys in environment variables,
/// e.g. `CARESYNC_SYNC__ENDPOINT_URL` sets `sync.endpoint_url`.
pub const ENV_NESTING_SEPARATOR: &str = "__";

/// Layered configuration loader
///
/// Precedence, lowest first: `T::default()`, the optional file, environment.
#[derive(Debug, Clone)]
pub struct ConfigEngine {
    file: Option<PathBuf>,
    env_prefix: String,
}

impl Default for ConfigEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigEngine {
    pub fn new() -> Self {
        Self {
            file: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Add a YAML (`.yaml`/`.yml`) or TOML (`.toml`) file layer
    #[must_use]
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn with_optional_file(self, path: Option<impl AsRef<Path>>) -> Self {
        match path {
            Some(path) => self.with_file(path),
            None => self,
        }
    }

    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Assemble the provider stack without extracting
    ///
    /// # Errors
    ///
    /// Fails if the configured file is missing or has an unknown extension.
    pub fn figment<T: Serialize + Default>(&self) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(T::default()));

        if let Some(path) = &self.file {
            if !path.exists() {
                return Err(ConfigError::SourceNotFound(path.display().to_string()));
            }
            let extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();
            figment = match extension.as_str() {
                "yaml" | "yml" => figment.merge(Yaml::file(path)),
                "toml" => figment.merge(Toml::file(path)),
                _ => return Err(ConfigError::UnsupportedFormat(path.display().to_string())),
            };
            tracing::debug!(path = %path.display(), "Configuration file layer added");
        }

        Ok(figment.merge(Env::prefixed(&self.env_prefix).split(ENV_NESTING_SEPARATOR)))
    }

    /// Extract and validate `T`
    ///
    /// # Errors
    ///
    /// Source, parse or validation failures.
    pub fn load<T>(&self) -> Result<T>
    where
        T: DeserializeOwned + Serialize + Default + ConfigValidation,
    {
        let config: T = self.figment::<T>()?.extract()?;
        config.validate()?;
        Ok(config)
    }
}
