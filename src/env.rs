//! Environment variable names used by this crate for convenient
//! configuration of an [`Output`](crate::output::Output) from services.
//!
//! These are purely helpers; the core types remain decoupled from
//! environment access.

/// Minimum level to emit, e.g. `INFO`.
pub const LOG_RESHAPE_MIN_LEVEL_ENV: &str = "LOG_RESHAPE_MIN_LEVEL";

/// Comma-separated level hierarchy, lowest severity first.
pub const LOG_RESHAPE_LEVELS_ENV: &str = "LOG_RESHAPE_LEVELS";

/// Output format: `plain`, `logfmt` or `json`.
pub const LOG_RESHAPE_FORMAT_ENV: &str = "LOG_RESHAPE_FORMAT";

/// strftime layout for the timestamp field. Empty disables the field.
pub const LOG_RESHAPE_TIME_FORMAT_ENV: &str = "LOG_RESHAPE_TIME_FORMAT";

/// `true`/`false` toggle for the caller field.
pub const LOG_RESHAPE_SHOW_CALLER_ENV: &str = "LOG_RESHAPE_SHOW_CALLER";

/// `true`/`false` toggle for the stack trace field.
pub const LOG_RESHAPE_STACKTRACE_ENV: &str = "LOG_RESHAPE_STACKTRACE";

/// `true`/`false` toggle for reading the level from a `level=` pair when a
/// line has no `[LEVEL]` marker.
pub const LOG_RESHAPE_LEVEL_FROM_KEY_ENV: &str = "LOG_RESHAPE_LEVEL_FROM_KEY";

/// Emitted name of the timestamp field, e.g. `@timestamp`.
pub const LOG_RESHAPE_TIMESTAMP_KEY_ENV: &str = "LOG_RESHAPE_TIMESTAMP_KEY";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a boolean toggle. Accepts `1/0`, `true/false`, `yes/no`, `on/off`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn env_or_falls_back() {
        assert_eq!(env_or("LOG_RESHAPE_SURELY_UNSET_VAR", "x"), "x");
    }
}
