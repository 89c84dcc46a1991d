/// Error type returned when building a [`Config`](crate::config::Config)
/// from strings or the environment.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown output format: {0:?} (expected plain, logfmt or json)")]
    UnknownFormat(String),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}
