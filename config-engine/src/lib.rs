//! Layered configuration for CareSync Engine
//!
//! Every binary loads its settings the same way: compiled-in defaults, then an
//! optional YAML or TOML file, then `CARESYNC_`-prefixed environment
//! variables (`__` separates nested keys).
//!
//! # Example
//!
//! ```rust,no_run
//! use config_engine::{ConfigEngine, ConfigValidation, require_positive};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Default, Serialize, Deserialize)]
//! #[serde(default)]
//! struct AppConfig {
//!     port: u16,
//! }
//!
//! impl ConfigValidation for AppConfig {
//!     fn validate(&self) -> config_engine::Result<()> {
//!         require_positive("port", u64::from(self.port))
//!     }
//! }
//!
//! let config: AppConfig = ConfigEngine::new().with_file("caresync.yaml").load()?;
//! # Ok::<(), config_engine::ConfigError>(())
//! ```

pub mod engine;
pub mod error;
pub mod validation;

pub use engine::*;
pub use error::*;
pub use validation::*;
