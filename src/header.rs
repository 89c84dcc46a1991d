//! Header written by an upstream plain logger in front of each message.
//!
//! A plain logger configured with [`Flags`] emits
//! `prefix date time file:line: message`. [`render`] produces that layout
//! and [`split`] lifts it back off a line so the pieces are neither
//! re-synthesized nor mistaken for message content.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Caller;

/// Bitmask describing which header pieces a plain logger writes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flags(u32);

impl Flags {
    /// Date in the local time zone: `2009/01/23`.
    pub const DATE: Flags = Flags(1);
    /// Time in the local time zone: `01:23:23`.
    pub const TIME: Flags = Flags(1 << 1);
    /// Microsecond resolution: `01:23:23.123123`. Implies `TIME`.
    pub const MICROSECONDS: Flags = Flags(1 << 2);
    /// Full file path and line number: `/a/b/c/d.rs:23`.
    pub const LONG_FILE: Flags = Flags(1 << 3);
    /// Final file name element and line number: `d.rs:23`.
    pub const SHORT_FILE: Flags = Flags(1 << 4);
    /// Use UTC rather than the local time zone.
    pub const UTC: Flags = Flags(1 << 5);
    /// Move the prefix from the start of the line to just before the message.
    pub const MSG_PREFIX: Flags = Flags(1 << 6);
    /// `DATE | TIME`
    pub const STD: Flags = Flags(1 | 1 << 1);

    pub const fn empty() -> Flags {
        Flags(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Unknown bits are dropped.
    pub const fn from_bits_truncate(bits: u32) -> Flags {
        Flags(bits & 0x7f)
    }

    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Flags) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn has_timestamp(self) -> bool {
        self.intersects(Flags::DATE | Flags::TIME | Flags::MICROSECONDS)
    }

    fn has_file(self) -> bool {
        self.intersects(Flags::LONG_FILE | Flags::SHORT_FILE)
    }

    /// strftime layout and rendered width of the date/time part.
    fn time_layout(self) -> Option<(&'static str, usize)> {
        let date = self.contains(Flags::DATE);
        let micros = self.contains(Flags::MICROSECONDS);
        let time = micros || self.contains(Flags::TIME);

        match (date, time, micros) {
            (true, false, _) => Some(("%Y/%m/%d", 10)),
            (false, true, false) => Some(("%H:%M:%S", 8)),
            (false, true, true) => Some(("%H:%M:%S%.6f", 15)),
            (true, true, false) => Some(("%Y/%m/%d %H:%M:%S", 19)),
            (true, true, true) => Some(("%Y/%m/%d %H:%M:%S%.6f", 26)),
            (false, false, _) => None,
        }
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Flags, &str); 7] = [
            (Flags::DATE, "DATE"),
            (Flags::TIME, "TIME"),
            (Flags::MICROSECONDS, "MICROSECONDS"),
            (Flags::LONG_FILE, "LONG_FILE"),
            (Flags::SHORT_FILE, "SHORT_FILE"),
            (Flags::UTC, "UTC"),
            (Flags::MSG_PREFIX, "MSG_PREFIX"),
        ];

        let set: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();

        if set.is_empty() {
            f.write_str("Flags(empty)")
        } else {
            write!(f, "Flags({})", set.join(" | "))
        }
    }
}

/// Pieces lifted off the front of a line by [`split`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub caller: Option<String>,
}

/// Strip the upstream header from `line`.
///
/// Order is fixed: prefix, then date/time, then `file:line:`, then the
/// message prefix when [`Flags::MSG_PREFIX`] is set. Pieces that do not
/// parse are left in place.
pub fn split<'a>(line: &'a str, prefix: &str, flags: Flags) -> (Header, &'a str) {
    let mut header = Header::default();
    let mut rest = line;

    if !flags.contains(Flags::MSG_PREFIX) {
        rest = strip_literal(rest, prefix);
    }

    if flags.has_timestamp() {
        if let Some((timestamp, after)) = split_timestamp(rest, flags) {
            header.timestamp = Some(timestamp);
            rest = after;
        } else {
            tracing::debug!(line, "upstream timestamp did not parse");
        }
    }

    if flags.has_file() {
        if let Some((caller, after)) = split_caller(rest) {
            header.caller = Some(caller.to_string());
            rest = after;
        }
    }

    if flags.contains(Flags::MSG_PREFIX) {
        rest = strip_literal(rest, prefix);
    }

    (header, rest)
}

fn strip_literal<'a>(line: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return line;
    }
    line.strip_prefix(prefix).unwrap_or(line)
}

fn split_timestamp(line: &str, flags: Flags) -> Option<(DateTime<FixedOffset>, &str)> {
    let (layout, width) = flags.time_layout()?;
    let text = line.get(..width)?;
    let utc = flags.contains(Flags::UTC);

    let naive = if !flags.contains(Flags::DATE) {
        let time = NaiveTime::parse_from_str(text, layout).ok()?;
        let today = if utc {
            Utc::now().date_naive()
        } else {
            Local::now().date_naive()
        };
        today.and_time(time)
    } else if flags.intersects(Flags::TIME | Flags::MICROSECONDS) {
        NaiveDateTime::parse_from_str(text, layout).ok()?
    } else {
        NaiveDate::parse_from_str(text, layout)
            .ok()?
            .and_time(NaiveTime::from_hms_opt(0, 0, 0)?)
    };

    let timestamp: DateTime<FixedOffset> = if utc {
        Utc.from_utc_datetime(&naive).into()
    } else {
        Local.from_local_datetime(&naive).earliest()?.into()
    };

    let rest = &line[width..];
    Some((timestamp, rest.strip_prefix(' ').unwrap_or(rest)))
}

fn split_caller(line: &str) -> Option<(&str, &str)> {
    let (token, rest) = match line.split_once(' ') {
        Some((token, rest)) => (token, rest),
        None => (line, ""),
    };
    let caller = token.strip_suffix(':')?;
    // `file:line` always carries a colon of its own
    caller.contains(':').then_some((caller, rest))
}

/// Render the header a plain logger writes for `flags`, prefix included.
///
/// The result ends with a separator so the message can be appended
/// directly.
pub fn render(now: DateTime<Utc>, caller: &Caller, prefix: &str, flags: Flags) -> String {
    let mut out = String::new();

    if !flags.contains(Flags::MSG_PREFIX) {
        out.push_str(prefix);
    }

    if let Some((layout, _)) = flags.time_layout() {
        let stamp = if flags.contains(Flags::UTC) {
            now.format(layout).to_string()
        } else {
            now.with_timezone(&Local).format(layout).to_string()
        };
        out.push_str(&stamp);
        out.push(' ');
    }

    if flags.has_file() {
        let file = if flags.contains(Flags::SHORT_FILE) {
            caller.short_file()
        } else {
            caller.file.as_str()
        };
        out.push_str(file);
        out.push(':');
        out.push_str(&caller.line.to_string());
        out.push_str(": ");
    }

    if flags.contains(Flags::MSG_PREFIX) {
        out.push_str(prefix);
    }

    out
}
