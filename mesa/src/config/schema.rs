//! Configuration schema definitions.
//!
//! [`Config`] is the on-disk shape: every field optional so layers can be
//! merged. [`Settings`] is the resolved shape the coordinator runs with,
//! defaults filled in.

use std::fmt;

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Result;

/// Default seating buffer between consecutive parties on a table.
pub const DEFAULT_SEATING_BUFFER_MINUTES: u32 = 15;
/// Default reservation length.
pub const DEFAULT_DURATION_MINUTES: u32 = crate::reservation::DEFAULT_DURATION_MINUTES;
/// Default largest party accepted.
pub const DEFAULT_MAX_PARTY_SIZE: u32 = 20;
/// Default country code for phones given without one.
pub const DEFAULT_COUNTRY_CODE: &str = "+34";
/// Default separator when concatenating free text during merges.
pub const DEFAULT_MERGE_SEPARATOR: &str = " | ";
/// Default web bookings allowed per phone in one window.
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 5;
/// Default rate-limit window.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 3600;
/// Default database lock wait.
pub const DEFAULT_LOCK_WAIT_SECONDS: u64 = 5;

/// Complete configuration structure.
///
/// # Examples
///
/// ```
/// use mesa::config::Config;
///
/// let config = Config::from_yaml("seating_buffer_minutes: 20\nservice_windows: [\"13:00-16:00\"]\n").unwrap();
/// assert_eq!(config.seating_buffer_minutes, Some(20));
/// assert_eq!(config.service_windows.unwrap()[0].to_string(), "13:00-16:00");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Opening windows; a booking must start inside one.
    pub service_windows: Option<Vec<ServiceWindow>>,

    /// Idle minutes required between consecutive parties on one table.
    pub seating_buffer_minutes: Option<u32>,

    /// Duration used when a booking does not give one.
    pub default_duration_minutes: Option<u32>,

    /// Largest party accepted.
    pub max_party_size: Option<u32>,

    /// Country code prepended to phones given without one.
    pub default_country_code: Option<String>,

    /// Separator used when concatenating free text during customer merges.
    pub merge_separator: Option<String>,

    /// Web booking throttle.
    pub rate_limit: Option<RateLimitConfig>,

    /// Maximum time to wait for the database write lock (seconds).
    pub maximum_lock_wait_seconds: Option<u64>,

    /// Output format for list commands.
    pub output_format: Option<OutputFormat>,
}

impl Config {
    /// Parses a YAML document.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] for malformed YAML or unknown
    /// keys.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty or comment-only file is an empty layer, not an error.
        if contents
            .lines()
            .map(str::trim)
            .all(|line| line.is_empty() || line.starts_with('#'))
        {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Resolves the layer into concrete settings, filling in defaults.
    #[must_use]
    pub fn settings(&self) -> Settings {
        Settings::from(self)
    }
}

/// An opening window, inclusive at both ends.
///
/// Deserializes from `"12:00-16:00"` or `{ start: "12:00", end: "16:00" }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceWindow {
    /// First bookable time.
    pub start: NaiveTime,
    /// Last bookable time.
    pub end: NaiveTime,
}

impl ServiceWindow {
    /// Creates a window from hour/minute pairs.
    ///
    /// Returns `None` for out-of-range values.
    #[must_use]
    pub fn hm(start: (u32, u32), end: (u32, u32)) -> Option<Self> {
        Some(Self {
            start: NaiveTime::from_hms_opt(start.0, start.1, 0)?,
            end: NaiveTime::from_hms_opt(end.0, end.1, 0)?,
        })
    }

    /// Whether `time` is inside the window.
    #[must_use]
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time <= self.end
    }

    /// Parses `"HH:MM-HH:MM"`.
    ///
    /// # Errors
    ///
    /// Returns a message describing the malformed part.
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| format!("expected HH:MM-HH:MM, got '{s}'"))?;
        Ok(Self {
            start: parse_hm(start)?,
            end: parse_hm(end)?,
        })
    }
}

fn parse_hm(s: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| format!("invalid time '{}'", s.trim()))
}

impl fmt::Display for ServiceWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

impl Serialize for ServiceWindow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ServiceWindow {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            String(String),
            Bounds { start: String, end: String },
        }

        match Helper::deserialize(deserializer)? {
            Helper::String(s) => Self::parse(&s).map_err(D::Error::custom),
            Helper::Bounds { start, end } => Ok(Self {
                start: parse_hm(&start).map_err(D::Error::custom)?,
                end: parse_hm(&end).map_err(D::Error::custom)?,
            }),
        }
    }
}

/// Web booking throttle configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Requests allowed per key in one window; 0 disables the limiter.
    pub max_requests: Option<u32>,

    /// Window length in seconds.
    pub window_seconds: Option<u64>,
}

/// Output format for list commands.
///
/// # Examples
///
/// ```
/// use mesa::config::OutputFormat;
///
/// assert_eq!(OutputFormat::Json.to_string(), "json");
/// ```
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output format.
    Json,
    /// CSV output format.
    Csv,
    /// TSV output format.
    Tsv,
    /// Human-readable table format.
    Table,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
            Self::Tsv => write!(f, "tsv"),
            Self::Table => write!(f, "table"),
        }
    }
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Opening windows, sorted by start.
    pub service_windows: Vec<ServiceWindow>,
    /// Idle minutes between parties on one table.
    pub seating_buffer_minutes: u32,
    /// Duration used when a booking does not give one.
    pub default_duration_minutes: u32,
    /// Largest party accepted.
    pub max_party_size: u32,
    /// Country code for phones without one.
    pub default_country_code: String,
    /// Separator for merged free text.
    pub merge_separator: String,
    /// Requests per key per window; 0 disables.
    pub rate_limit_max_requests: u32,
    /// Rate-limit window.
    pub rate_limit_window: Duration,
    /// Database lock wait.
    pub lock_wait: std::time::Duration,
}

/// The lunch and dinner windows used when none are configured.
#[must_use]
pub fn default_service_windows() -> Vec<ServiceWindow> {
    [((12, 0), (16, 0)), ((19, 0), (23, 30))]
        .into_iter()
        .filter_map(|(start, end)| ServiceWindow::hm(start, end))
        .collect()
}

impl Settings {
    /// Whether `time` falls inside any service window.
    #[must_use]
    pub fn in_service(&self, time: NaiveTime) -> bool {
        self.service_windows.iter().any(|w| w.contains(time))
    }

    /// Windows rendered for messages, e.g. `12:00-16:00, 19:00-23:30`.
    #[must_use]
    pub fn describe_windows(&self) -> String {
        self.service_windows
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        let mut service_windows = config
            .service_windows
            .clone()
            .unwrap_or_else(default_service_windows);
        service_windows.sort();
        let rate_limit = config.rate_limit.clone().unwrap_or_default();
        let window_seconds = rate_limit
            .window_seconds
            .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECONDS);

        Self {
            service_windows,
            seating_buffer_minutes: config
                .seating_buffer_minutes
                .unwrap_or(DEFAULT_SEATING_BUFFER_MINUTES),
            default_duration_minutes: config
                .default_duration_minutes
                .unwrap_or(DEFAULT_DURATION_MINUTES),
            max_party_size: config.max_party_size.unwrap_or(DEFAULT_MAX_PARTY_SIZE),
            default_country_code: config
                .default_country_code
                .clone()
                .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_string()),
            merge_separator: config
                .merge_separator
                .clone()
                .unwrap_or_else(|| DEFAULT_MERGE_SEPARATOR.to_string()),
            rate_limit_max_requests: rate_limit
                .max_requests
                .unwrap_or(DEFAULT_RATE_LIMIT_MAX_REQUESTS),
            rate_limit_window: Duration::seconds(i64::try_from(window_seconds).unwrap_or(i64::MAX)),
            lock_wait: std::time::Duration::from_secs(
                config
                    .maximum_lock_wait_seconds
                    .unwrap_or(DEFAULT_LOCK_WAIT_SECONDS),
            ),
        }
    }
}
