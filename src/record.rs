use chrono::{DateTime, FixedOffset};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::Location;

/// Source location of a log call, supplied by the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub file: String,
    pub line: u32,
}

impl Caller {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Location of the code calling the enclosing `#[track_caller]` chain.
    #[track_caller]
    pub fn here() -> Self {
        Self::from(Location::caller())
    }

    /// File name without its directories.
    pub fn short_file(&self) -> &str {
        self.file
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.file.as_str())
    }
}

impl From<&Location<'_>> for Caller {
    fn from(location: &Location<'_>) -> Self {
        Self::new(location.file(), location.line())
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One line in flight between parsing and encoding.
///
/// `level` is already resolved: the upper-cased marker, or the configured
/// minimum when the line carried none. `fields` is the assembled set the
/// encoders render; `payload` is the text after header and marker removal,
/// kept for the plain encoder.
#[derive(Debug, Clone)]
pub struct Record {
    pub level: String,
    pub fields: BTreeMap<String, String>,
    pub payload: String,
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub caller: Option<String>,
}

impl Record {
    pub fn new(level: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            fields: BTreeMap::new(),
            payload: payload.into(),
            timestamp: None,
            caller: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_short_file() {
        assert_eq!(Caller::new("a/b/c.rs", 1).short_file(), "c.rs");
        assert_eq!(Caller::new("c.rs", 1).short_file(), "c.rs");
        assert_eq!(Caller::new(r"a\b.rs", 1).short_file(), "b.rs");
    }

    #[test]
    fn caller_here_points_at_this_file() {
        let caller = Caller::here();
        assert!(caller.file.ends_with("record.rs"));
        assert_eq!(caller.to_string(), format!("{}:{}", caller.file, caller.line));
    }
}
