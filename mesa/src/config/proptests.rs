//! Property-based tests for configuration merging and resolution.

use super::merger::ConfigMerger;
use super::schema::{Config, RateLimitConfig, Settings, DEFAULT_SEATING_BUFFER_MINUTES};
use super::validator::ConfigValidator;
use proptest::prelude::*;

fn rate_limit_strategy() -> impl Strategy<Value = RateLimitConfig> {
    (prop::option::of(0u32..50), prop::option::of(1u64..86_400)).prop_map(
        |(max_requests, window_seconds)| RateLimitConfig {
            max_requests,
            window_seconds,
        },
    )
}

fn config_strategy() -> impl Strategy<Value = Config> {
    (
        prop::option::of(0u32..=240),
        prop::option::of(1u32..=720),
        prop::option::of(1u32..=60),
        prop::option::of(rate_limit_strategy()),
        prop::option::of(1u64..120),
    )
        .prop_map(
            |(buffer, duration, party, rate_limit, lock_wait)| Config {
                seating_buffer_minutes: buffer,
                default_duration_minutes: duration,
                max_party_size: party,
                rate_limit,
                maximum_lock_wait_seconds: lock_wait,
                ..Default::default()
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 2000,
        .. ProptestConfig::default()
    })]

    // Higher precedence Some values win, None values never erase
    #[test]
    fn merge_higher_precedence_wins(low in config_strategy(), high in config_strategy()) {
        let mut merged = low.clone();
        ConfigMerger::merge_into(&mut merged, &high);

        prop_assert_eq!(
            merged.seating_buffer_minutes,
            high.seating_buffer_minutes.or(low.seating_buffer_minutes)
        );
        prop_assert_eq!(merged.max_party_size, high.max_party_size.or(low.max_party_size));
        prop_assert_eq!(
            merged.maximum_lock_wait_seconds,
            high.maximum_lock_wait_seconds.or(low.maximum_lock_wait_seconds)
        );
    }

    // Merging a layer into itself changes nothing
    #[test]
    fn merge_idempotent(config in config_strategy()) {
        let mut merged = config.clone();
        ConfigMerger::merge_into(&mut merged, &config);
        prop_assert_eq!(merged, config);
    }

    // Merging with an empty layer changes nothing
    #[test]
    fn merge_with_default_is_identity(config in config_strategy()) {
        let mut merged = config.clone();
        ConfigMerger::merge_into(&mut merged, &Config::default());
        prop_assert_eq!(merged, config);
    }

    // Generated layers are valid and resolve without surprises
    #[test]
    fn generated_layers_validate_and_resolve(config in config_strategy()) {
        prop_assert!(ConfigValidator::validate(&config).is_ok());
        let settings = Settings::from(&config);
        prop_assert_eq!(
            settings.seating_buffer_minutes,
            config.seating_buffer_minutes.unwrap_or(DEFAULT_SEATING_BUFFER_MINUTES)
        );
        prop_assert!(!settings.service_windows.is_empty());
    }
}
