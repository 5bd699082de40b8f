//! Configuration validation.

use crate::config::schema::{Config, RateLimitConfig, ServiceWindow};
use crate::error::{Error, Result};

/// Longest seating buffer accepted, in minutes.
pub const MAX_SEATING_BUFFER_MINUTES: u32 = 240;
/// Longest reservation accepted, in minutes.
pub const MAX_DURATION_MINUTES: u32 = 720;

/// Validates configuration values and their consistency.
///
/// # Examples
///
/// ```
/// use mesa::config::{Config, ConfigValidator};
///
/// ConfigValidator::validate(&Config::default()).unwrap();
///
/// let bad = Config { max_party_size: Some(0), ..Default::default() };
/// assert!(ConfigValidator::validate(&bad).is_err());
/// ```
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a configuration layer or merged configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first offending key.
    pub fn validate(config: &Config) -> Result<()> {
        if let Some(ref windows) = config.service_windows {
            Self::validate_windows(windows)?;
        }

        if let Some(buffer) = config.seating_buffer_minutes {
            if buffer > MAX_SEATING_BUFFER_MINUTES {
                return Err(invalid(
                    "seating_buffer_minutes",
                    format!("{buffer} exceeds {MAX_SEATING_BUFFER_MINUTES}"),
                ));
            }
        }

        if let Some(duration) = config.default_duration_minutes {
            if duration == 0 || duration > MAX_DURATION_MINUTES {
                return Err(invalid(
                    "default_duration_minutes",
                    format!("must be between 1 and {MAX_DURATION_MINUTES}"),
                ));
            }
        }

        if config.max_party_size == Some(0) {
            return Err(invalid("max_party_size", "must be at least 1"));
        }

        if let Some(ref code) = config.default_country_code {
            Self::validate_country_code(code)?;
        }

        if let Some(ref separator) = config.merge_separator {
            if separator.trim().is_empty() {
                return Err(invalid(
                    "merge_separator",
                    "must contain a visible character",
                ));
            }
        }

        if let Some(ref limit) = config.rate_limit {
            Self::validate_rate_limit(limit)?;
        }

        if config.maximum_lock_wait_seconds == Some(0) {
            return Err(invalid(
                "maximum_lock_wait_seconds",
                "Timeout must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Windows must be non-empty, each start before its end, and disjoint.
    fn validate_windows(windows: &[ServiceWindow]) -> Result<()> {
        if windows.is_empty() {
            return Err(invalid("service_windows", "at least one window is required"));
        }
        for window in windows {
            if window.start >= window.end {
                return Err(invalid(
                    "service_windows",
                    format!("{window}: start must be before end"),
                ));
            }
        }
        let mut sorted = windows.to_vec();
        sorted.sort();
        for pair in sorted.windows(2) {
            if pair[1].start <= pair[0].end {
                return Err(invalid(
                    "service_windows",
                    format!("{} overlaps {}", pair[0], pair[1]),
                ));
            }
        }
        Ok(())
    }

    /// `+` followed by one to three digits.
    fn validate_country_code(code: &str) -> Result<()> {
        let valid = code
            .strip_prefix('+')
            .is_some_and(|digits| {
                (1..=3).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
            });
        if valid {
            Ok(())
        } else {
            Err(invalid(
                "default_country_code",
                format!("'{code}' is not of the form +NN"),
            ))
        }
    }

    fn validate_rate_limit(limit: &RateLimitConfig) -> Result<()> {
        if limit.window_seconds == Some(0) && limit.max_requests != Some(0) {
            return Err(invalid(
                "rate_limit.window_seconds",
                "must be greater than 0 while limiting is enabled",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: impl Into<String>) -> Error {
    Error::Validation {
        field: field.into(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start: (u32, u32), end: (u32, u32)) -> ServiceWindow {
        ServiceWindow::hm(start, end).unwrap()
    }

    fn field_of(err: Error) -> String {
        match err {
            Error::Validation { field, .. } => field,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_windows_must_be_ordered_and_disjoint() {
        let inverted = Config {
            service_windows: Some(vec![window((16, 0), (12, 0))]),
            ..Default::default()
        };
        assert_eq!(
            field_of(ConfigValidator::validate(&inverted).unwrap_err()),
            "service_windows"
        );

        let overlapping = Config {
            service_windows: Some(vec![window((19, 0), (23, 0)), window((12, 0), (19, 0))]),
            ..Default::default()
        };
        assert!(ConfigValidator::validate(&overlapping).is_err());

        let empty = Config {
            service_windows: Some(vec![]),
            ..Default::default()
        };
        assert!(ConfigValidator::validate(&empty).is_err());

        let fine = Config {
            service_windows: Some(vec![window((19, 0), (23, 30)), window((12, 0), (16, 0))]),
            ..Default::default()
        };
        assert!(ConfigValidator::validate(&fine).is_ok());
    }

    #[test]
    fn test_country_code_format() {
        for good in ["+1", "+34", "+351"] {
            assert!(ConfigValidator::validate_country_code(good).is_ok(), "{good}");
        }
        for bad in ["34", "+", "+3456", "+3a"] {
            assert!(ConfigValidator::validate_country_code(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_numeric_bounds() {
        let cases = [
            (
                Config {
                    seating_buffer_minutes: Some(241),
                    ..Default::default()
                },
                "seating_buffer_minutes",
            ),
            (
                Config {
                    default_duration_minutes: Some(0),
                    ..Default::default()
                },
                "default_duration_minutes",
            ),
            (
                Config {
                    maximum_lock_wait_seconds: Some(0),
                    ..Default::default()
                },
                "maximum_lock_wait_seconds",
            ),
            (
                Config {
                    merge_separator: Some("  ".into()),
                    ..Default::default()
                },
                "merge_separator",
            ),
        ];
        for (config, field) in cases {
            assert_eq!(field_of(ConfigValidator::validate(&config).unwrap_err()), field);
        }
    }

    #[test]
    fn test_rate_limit_window() {
        let disabled = Config {
            rate_limit: Some(RateLimitConfig {
                max_requests: Some(0),
                window_seconds: Some(0),
            }),
            ..Default::default()
        };
        assert!(ConfigValidator::validate(&disabled).is_ok());

        let broken = Config {
            rate_limit: Some(RateLimitConfig {
                max_requests: Some(3),
                window_seconds: Some(0),
            }),
            ..Default::default()
        };
        assert!(ConfigValidator::validate(&broken).is_err());
    }
}
