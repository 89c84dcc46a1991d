use std::fmt;
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::env::{
    env_or, parse_bool, LOG_RESHAPE_FORMAT_ENV, LOG_RESHAPE_LEVELS_ENV,
    LOG_RESHAPE_LEVEL_FROM_KEY_ENV, LOG_RESHAPE_MIN_LEVEL_ENV, LOG_RESHAPE_SHOW_CALLER_ENV, LOG_RESHAPE_STACKTRACE_ENV,
    LOG_RESHAPE_TIMESTAMP_KEY_ENV, LOG_RESHAPE_TIME_FORMAT_ENV,
};
use crate::error::ConfigError;
use crate::header::Flags;

/// RFC 3339 layout in strftime syntax, e.g. `2024-01-15T10:30:00+01:00`.
pub const RFC3339: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Levels used by [`Config::default`], lowest severity first.
pub const DEFAULT_LEVELS: [&str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];

/// Output encoding applied to every emitted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// `[LEVEL] payload`, filtering only.
    Plain,
    /// `level=INFO key=value msg=...`
    #[default]
    #[serde(alias = "kv", alias = "key-value")]
    Logfmt,
    /// One flat JSON object per line.
    Json,
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(Format::Plain),
            "logfmt" | "kv" | "key-value" | "keyvalue" => Ok(Format::Logfmt),
            "json" => Ok(Format::Json),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Plain => "plain",
            Format::Logfmt => "logfmt",
            Format::Json => "json",
        };
        f.write_str(name)
    }
}

/// Emitted names of the fields the reshaper owns.
///
/// Tokenized fields keep the key they were written with; only these five
/// logical names are remapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyNames {
    pub level: String,
    pub msg: String,
    pub timestamp: String,
    pub caller: String,
    pub stacktrace: String,
}

impl Default for KeyNames {
    fn default() -> Self {
        Self {
            level: "level".to_string(),
            msg: "msg".to_string(),
            timestamp: "timestamp".to_string(),
            caller: "caller".to_string(),
            stacktrace: "stacktrace".to_string(),
        }
    }
}

impl KeyNames {
    /// Override one logical name, e.g. `set("timestamp", "@timestamp")`.
    ///
    /// Unknown logical names and empty overrides are ignored and reported
    /// as `false`.
    pub fn set(&mut self, logical: &str, emitted: impl Into<String>) -> bool {
        let emitted = emitted.into();
        if emitted.is_empty() {
            return false;
        }
        let slot = match logical {
            "level" => &mut self.level,
            "msg" => &mut self.msg,
            "timestamp" => &mut self.timestamp,
            "caller" => &mut self.caller,
            "stacktrace" => &mut self.stacktrace,
            _ => return false,
        };
        *slot = emitted;
        true
    }
}

/// Configuration of an [`Output`](crate::output::Output).
///
/// The value is moved into the output on construction and never changes
/// afterwards; the skip-set derived from `levels`/`min_level` is computed
/// once at that point.
///
/// **Fields**
/// - `min_level`: lowest level that is emitted. Lines without a level
///   marker are reported at this level.
/// - `levels`: hierarchy, lowest severity first.
/// - `format`: see [`Format`].
/// - `time_format`: strftime layout of the timestamp field; `None` or an
///   empty string disables the field.
/// - `show_caller`: emit the caller (`file:line`) field.
/// - `stacktrace`: capture a backtrace on every emitted record.
/// - `key_names`: emitted names of the owned fields.
/// - `level_from_key`: for lines without a `[LEVEL]` marker, take the level
///   from a `key_names.level` pair (key compared case-insensitively), so
///   `level=warn msg=x` is a `WARN` record. Off by default.
/// - `prefix`: literal prefix the upstream logger writes; stripped from the
///   line and prepended to the message.
/// - `flags`: header layout the upstream logger writes, see [`Flags`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub min_level: String,
    pub levels: Vec<String>,
    pub format: Format,
    pub time_format: Option<String>,
    pub show_caller: bool,
    pub stacktrace: bool,
    pub key_names: KeyNames,
    pub level_from_key: bool,
    pub prefix: String,
    pub flags: Flags,
}

impl Default for Config {
    fn default() -> Self {
        Self::new("INFO", DEFAULT_LEVELS)
    }
}

impl Config {
    /// Create a configuration with the given minimum level and hierarchy
    /// and the remaining settings at their defaults.
    pub fn new<I, S>(min_level: impl Into<String>, levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            min_level: min_level.into(),
            levels: levels.into_iter().map(Into::into).collect(),
            format: Format::Logfmt,
            time_format: Some(RFC3339.to_string()),
            show_caller: true,
            stacktrace: true,
            key_names: KeyNames::default(),
            level_from_key: false,
            prefix: String::new(),
            flags: Flags::empty(),
        }
    }

    /// Build a configuration from `LOG_RESHAPE_*` environment variables,
    /// falling back to [`Config::default`] for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        config.min_level = env_or(LOG_RESHAPE_MIN_LEVEL_ENV, &config.min_level);

        if let Ok(levels) = std::env::var(LOG_RESHAPE_LEVELS_ENV) {
            config.levels = levels
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Ok(format) = std::env::var(LOG_RESHAPE_FORMAT_ENV) {
            config.format = format.parse()?;
        }

        if let Ok(layout) = std::env::var(LOG_RESHAPE_TIME_FORMAT_ENV) {
            if !is_valid_time_format(&layout) {
                return Err(ConfigError::InvalidValue {
                    key: LOG_RESHAPE_TIME_FORMAT_ENV.to_string(),
                    value: layout,
                });
            }
            config.time_format = Some(layout);
        }

        config.show_caller = env_toggle(LOG_RESHAPE_SHOW_CALLER_ENV, config.show_caller)?;
        config.stacktrace = env_toggle(LOG_RESHAPE_STACKTRACE_ENV, config.stacktrace)?;
        config.level_from_key = env_toggle(LOG_RESHAPE_LEVEL_FROM_KEY_ENV, config.level_from_key)?;

        if let Ok(key) = std::env::var(LOG_RESHAPE_TIMESTAMP_KEY_ENV) {
            config.key_names.set("timestamp", key);
        }

        Ok(config)
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Set the timestamp layout. An empty layout disables the field, and so
    /// does one chrono cannot format (checked when the output is built).
    pub fn with_time_format(mut self, layout: impl Into<String>) -> Self {
        self.time_format = Some(layout.into());
        self
    }

    pub fn without_timestamp(mut self) -> Self {
        self.time_format = None;
        self
    }

    pub fn with_caller(mut self, show: bool) -> Self {
        self.show_caller = show;
        self
    }

    pub fn with_stacktrace(mut self, capture: bool) -> Self {
        self.stacktrace = capture;
        self
    }

    pub fn with_key_names(mut self, key_names: KeyNames) -> Self {
        self.key_names = key_names;
        self
    }

    /// Read the level from a `level=` pair when the line has no marker.
    pub fn with_level_from_key(mut self, enabled: bool) -> Self {
        self.level_from_key = enabled;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    /// Timestamp layout, if the field is enabled.
    pub fn timestamp_layout(&self) -> Option<&str> {
        self.time_format.as_deref().filter(|l| !l.is_empty())
    }
}

/// Whether chrono understands every specifier in a strftime `layout`.
pub fn is_valid_time_format(layout: &str) -> bool {
    !StrftimeItems::new(layout).any(|item| matches!(item, Item::Error))
}

fn env_toggle(key: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(key) {
        Ok(value) => parse_bool(&value).ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}
