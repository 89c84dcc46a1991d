//! Level marker extraction and threshold filtering.

use std::collections::HashSet;

/// Find a `[LEVEL]` marker on the first line of `body`.
///
/// Returns the upper-cased marker text and the body with the marker and
/// exactly one following space or tab removed. Without a complete,
/// non-empty marker the body is returned unchanged.
pub fn extract_level(body: &str) -> (Option<String>, String) {
    let first_line = body.find(['\n', '\r']).map_or(body, |end| &body[..end]);

    let Some(open) = first_line.find('[') else {
        return (None, body.to_string());
    };
    let Some(len) = first_line[open + 1..].find(']') else {
        return (None, body.to_string());
    };
    let close = open + 1 + len;

    let level = first_line[open + 1..close].trim();
    if level.is_empty() {
        return (None, body.to_string());
    }

    let after = &body[close + 1..];
    let after = after
        .strip_prefix(' ')
        .or_else(|| after.strip_prefix('\t'))
        .unwrap_or(after);

    let mut payload = String::with_capacity(body.len());
    payload.push_str(&body[..open]);
    payload.push_str(after);

    (Some(level.to_uppercase()), payload)
}

/// Ordered level hierarchy with a minimum threshold.
///
/// The skip-set holds the hierarchy levels ranked strictly below the
/// minimum and is computed once in [`LevelFilter::new`]. Levels outside
/// the hierarchy are never skipped.
#[derive(Debug, Clone)]
pub struct LevelFilter {
    min_level: String,
    skip: HashSet<String>,
}

impl LevelFilter {
    pub fn new<S: AsRef<str>>(levels: &[S], min_level: &str) -> Self {
        let mut skip = HashSet::new();
        let mut found = false;

        for level in levels {
            let level = level.as_ref();
            if level.eq_ignore_ascii_case(min_level) {
                found = true;
                break;
            }
            skip.insert(level.to_uppercase());
        }

        if !found {
            tracing::warn!(
                min_level,
                levels = levels.len(),
                "minimum level is not part of the level hierarchy, nothing will be filtered"
            );
            skip.clear();
        }

        Self {
            min_level: min_level.to_string(),
            skip,
        }
    }

    /// Level a record is reported at: the marker, or the minimum.
    pub fn resolve<'a>(&'a self, level: Option<&'a str>) -> &'a str {
        match level {
            Some(level) if !level.is_empty() => level,
            _ => &self.min_level,
        }
    }

    /// Whether a record at `level` is dropped.
    pub fn skips(&self, level: &str) -> bool {
        !self.skip.is_empty() && self.skip.contains(&level.to_uppercase())
    }

    pub fn min_level(&self) -> &str {
        &self.min_level
    }

    pub fn skipped_levels(&self) -> &HashSet<String> {
        &self.skip
    }
}
