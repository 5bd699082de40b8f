//! Configuration system for mesa.
//!
//! This module provides hierarchical configuration with support for:
//! - YAML configuration files (user config and project `mesa.yaml`)
//! - Environment variable overrides
//! - Programmatic configuration via builder pattern
//! - Validation of every layer
//!
//! # Configuration Precedence
//!
//! Configuration is merged from multiple sources with the following precedence
//! (highest to lowest):
//!
//! 1. Programmatic overrides (via `ConfigBuilder::with_config`)
//! 2. Environment variables (`MESA_*`)
//! 3. Private project config (`mesa.local.yaml`)
//! 4. Project config (`mesa.yaml`)
//! 5. User config (`~/.mesa/config.yaml`)
//! 6. Built-in defaults
//!
//! # Examples
//!
//! ```no_run
//! use mesa::config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new().build().unwrap();
//! let settings = config.settings();
//! println!("service hours: {}", settings.describe_windows());
//! ```

pub mod builder;
pub mod environment;
pub mod loader;
pub mod merger;
pub mod schema;
pub mod validator;

#[cfg(test)]
mod proptests;

pub use builder::ConfigBuilder;
pub use environment::EnvironmentConfig;
pub use loader::{ConfigLoader, ConfigSource};
pub use merger::ConfigMerger;
pub use schema::{Config, OutputFormat, RateLimitConfig, ServiceWindow, Settings};
pub use validator::ConfigValidator;
