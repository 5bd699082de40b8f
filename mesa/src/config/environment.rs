//! Environment variable handling for configuration overrides.
//!
//! This module provides support for `MESA_*` environment variables that
//! override configuration file values.

use std::env;
use std::str::FromStr;

use crate::config::schema::{Config, OutputFormat, ServiceWindow};
use crate::error::{Error, Result};

/// Handles environment variable overrides for configuration.
///
/// | Variable | Key |
/// |---|---|
/// | `MESA_SERVICE_WINDOWS` | `service_windows` (`12:00-16:00,19:00-23:30`) |
/// | `MESA_SEATING_BUFFER_MINUTES` | `seating_buffer_minutes` |
/// | `MESA_DEFAULT_DURATION_MINUTES` | `default_duration_minutes` |
/// | `MESA_MAX_PARTY_SIZE` | `max_party_size` |
/// | `MESA_DEFAULT_COUNTRY_CODE` | `default_country_code` |
/// | `MESA_MERGE_SEPARATOR` | `merge_separator` |
/// | `MESA_RATE_LIMIT_MAX_REQUESTS` | `rate_limit.max_requests` |
/// | `MESA_RATE_LIMIT_WINDOW_SECONDS` | `rate_limit.window_seconds` |
/// | `MESA_MAXIMUM_LOCK_WAIT_SECONDS` | `maximum_lock_wait_seconds` |
/// | `MESA_OUTPUT_FORMAT` | `output_format` |
///
/// # Examples
///
/// ```no_run
/// use mesa::config::{Config, EnvironmentConfig};
///
/// let mut config = Config::default();
/// EnvironmentConfig::apply_overrides(&mut config).unwrap();
/// ```
pub struct EnvironmentConfig;

impl EnvironmentConfig {
    /// Apply environment variable overrides to config.
    ///
    /// # Errors
    ///
    /// Returns an error if any environment variable value is invalid.
    pub fn apply_overrides(config: &mut Config) -> Result<()> {
        if let Ok(windows) = env::var("MESA_SERVICE_WINDOWS") {
            config.service_windows = Some(Self::parse_windows(&windows)?);
        }

        if let Some(minutes) = Self::number("MESA_SEATING_BUFFER_MINUTES")? {
            config.seating_buffer_minutes = Some(minutes);
        }

        if let Some(minutes) = Self::number("MESA_DEFAULT_DURATION_MINUTES")? {
            config.default_duration_minutes = Some(minutes);
        }

        if let Some(size) = Self::number("MESA_MAX_PARTY_SIZE")? {
            config.max_party_size = Some(size);
        }

        if let Ok(code) = env::var("MESA_DEFAULT_COUNTRY_CODE") {
            config.default_country_code = Some(code.trim().to_string());
        }

        if let Ok(separator) = env::var("MESA_MERGE_SEPARATOR") {
            config.merge_separator = Some(separator);
        }

        if let Some(max) = Self::number("MESA_RATE_LIMIT_MAX_REQUESTS")? {
            config
                .rate_limit
                .get_or_insert_with(Default::default)
                .max_requests = Some(max);
        }

        if let Some(seconds) = Self::number("MESA_RATE_LIMIT_WINDOW_SECONDS")? {
            config
                .rate_limit
                .get_or_insert_with(Default::default)
                .window_seconds = Some(seconds);
        }

        if let Some(seconds) = Self::number("MESA_MAXIMUM_LOCK_WAIT_SECONDS")? {
            config.maximum_lock_wait_seconds = Some(seconds);
        }

        if let Ok(format) = env::var("MESA_OUTPUT_FORMAT") {
            config.output_format = Some(Self::parse_output_format(&format)?);
        }

        Ok(())
    }

    /// Reads a numeric variable; unset means `None`.
    fn number<T: FromStr>(name: &str) -> Result<Option<T>> {
        match env::var(name) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| Error::Validation {
                    field: name.into(),
                    message: format!("Must be a non-negative integer, got '{raw}'"),
                }),
            Err(_) => Ok(None),
        }
    }

    /// Parses comma-separated `HH:MM-HH:MM` windows.
    fn parse_windows(s: &str) -> Result<Vec<ServiceWindow>> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                ServiceWindow::parse(part).map_err(|message| Error::Validation {
                    field: "MESA_SERVICE_WINDOWS".into(),
                    message,
                })
            })
            .collect()
    }

    fn parse_output_format(s: &str) -> Result<OutputFormat> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "tsv" => Ok(OutputFormat::Tsv),
            "table" => Ok(OutputFormat::Table),
            other => Err(Error::Validation {
                field: "MESA_OUTPUT_FORMAT".into(),
                message: format!("Invalid output format: '{other}' (expected json/csv/tsv/table)"),
            }),
        }
    }
}
