//! Configuration merging and precedence handling.

use crate::config::loader::ConfigSource;
use crate::config::schema::{Config, RateLimitConfig};

/// Merges configuration sources according to precedence rules.
///
/// # Examples
///
/// ```
/// use mesa::config::{Config, ConfigMerger};
///
/// let low = Config { max_party_size: Some(10), ..Default::default() };
/// let high = Config { max_party_size: Some(14), ..Default::default() };
///
/// let mut result = low;
/// ConfigMerger::merge_into(&mut result, &high);
/// assert_eq!(result.max_party_size, Some(14));
/// ```
pub struct ConfigMerger;

impl ConfigMerger {
    /// Merge multiple configuration sources into final config.
    ///
    /// Sources should be provided in order from lowest to highest precedence.
    #[must_use]
    pub fn merge(sources: Vec<ConfigSource>) -> Config {
        let mut result = Config::default();
        for source in sources {
            Self::merge_into(&mut result, &source.config);
        }
        result
    }

    /// Merge source config into target (source overwrites target).
    ///
    /// # Merging Rules
    ///
    /// - Scalar fields: source overwrites if Some
    /// - Service windows: the whole list is replaced, never concatenated
    /// - Rate limit: field-by-field merge
    pub fn merge_into(target: &mut Config, source: &Config) {
        if source.service_windows.is_some() {
            target.service_windows.clone_from(&source.service_windows);
        }

        if source.seating_buffer_minutes.is_some() {
            target.seating_buffer_minutes = source.seating_buffer_minutes;
        }

        if source.default_duration_minutes.is_some() {
            target.default_duration_minutes = source.default_duration_minutes;
        }

        if source.max_party_size.is_some() {
            target.max_party_size = source.max_party_size;
        }

        if source.default_country_code.is_some() {
            target
                .default_country_code
                .clone_from(&source.default_country_code);
        }

        if source.merge_separator.is_some() {
            target.merge_separator.clone_from(&source.merge_separator);
        }

        if source.maximum_lock_wait_seconds.is_some() {
            target.maximum_lock_wait_seconds = source.maximum_lock_wait_seconds;
        }

        if source.output_format.is_some() {
            target.output_format = source.output_format;
        }

        if let Some(ref source_limit) = source.rate_limit {
            target.rate_limit = Some(match &target.rate_limit {
                Some(target_limit) => Self::merge_rate_limit(target_limit, source_limit),
                None => source_limit.clone(),
            });
        }
    }

    fn merge_rate_limit(target: &RateLimitConfig, source: &RateLimitConfig) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: source.max_requests.or(target.max_requests),
            window_seconds: source.window_seconds.or(target.window_seconds),
        }
    }
}
