//! Renders an assembled [`Record`] as one output line.
//!
//! All variants are deterministic: the level key comes first and the
//! remaining fields follow in ascending key order.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::Value;

use crate::config::{Config, Format};
use crate::record::Record;

#[derive(Debug, Clone)]
pub struct Encoder {
    format: Format,
    level_key: String,
}

impl Encoder {
    pub fn new(config: &Config) -> Self {
        Self {
            format: config.format,
            level_key: config.key_names.level.clone(),
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Append the encoded record, newline included, to `out`.
    pub fn encode(&self, record: &Record, out: &mut Vec<u8>) {
        let line = match self.format {
            Format::Plain => encode_plain(record),
            Format::Logfmt => encode_logfmt(&self.level_key, record),
            Format::Json => encode_json(&self.level_key, record),
        };
        out.extend_from_slice(line.as_bytes());
        out.push(b'\n');
    }
}

fn encode_plain(record: &Record) -> String {
    if record.payload.is_empty() {
        format!("[{}]", record.level)
    } else {
        format!("[{}] {}", record.level, record.payload)
    }
}

fn encode_logfmt(level_key: &str, record: &Record) -> String {
    let mut out = String::with_capacity(64);
    write_logfmt_field(&mut out, level_key, &record.level);

    for (key, value) in &record.fields {
        if key == level_key {
            continue;
        }
        out.push(' ');
        write_logfmt_field(&mut out, key, value);
    }

    out
}

pub(crate) fn write_logfmt_field(out: &mut String, key: &str, value: &str) {
    push_key(out, key);
    out.push('=');
    if needs_quoting(value) {
        out.push('"');
        escape_into(out, value);
        out.push('"');
    } else {
        out.push_str(value);
    }
}

/// Keys cannot be quoted, so unsafe characters are replaced.
fn push_key(out: &mut String, key: &str) {
    if key.is_empty() {
        out.push('_');
        return;
    }
    out.extend(key.chars().map(|c| {
        if c.is_whitespace() || c == '=' || c == '"' || c.is_control() {
            '_'
        } else {
            c
        }
    }));
}

fn needs_quoting(value: &str) -> bool {
    value
        .chars()
        .any(|c| c.is_whitespace() || c == '=' || c == '"' || c == '\\' || c.is_control())
}

fn escape_into(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
}

fn encode_json(level_key: &str, record: &Record) -> String {
    let object = JsonRecord { level_key, record };

    // string keys with string or validated raw values always serialize
    serde_json::to_string(&object).unwrap_or_else(|err| {
        tracing::error!(error = %err, "failed to encode record as JSON");
        format!(
            "{{{}:{}}}",
            Value::from(level_key),
            Value::from(record.level.as_str())
        )
    })
}

/// Level first, then the remaining fields in key order.
struct JsonRecord<'a> {
    level_key: &'a str,
    record: &'a Record,
}

impl Serialize for JsonRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = &self.record.fields;
        let mut map = serializer.serialize_map(Some(fields.len() + 1))?;
        map.serialize_entry(self.level_key, &self.record.level)?;

        for (key, value) in fields {
            if key == self.level_key {
                continue;
            }
            map.serialize_entry(key, &typed_value(value))?;
        }
        map.end()
    }
}

/// A field value as it lands in a JSON object.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum JsonValue<'a> {
    /// Number or boolean literal, written with its original text.
    Raw(&'a RawValue),
    Text(&'a str),
}

/// Integers, floats and booleans are emitted raw, everything else as a
/// string.
///
/// A raw value keeps the exact input text: `1.50` stays `1.50` and a
/// 30-digit id is not rounded through `f64`.
pub fn typed_value(raw: &str) -> JsonValue<'_> {
    if raw.is_empty() || raw.trim() != raw {
        return JsonValue::Text(raw);
    }
    // the value parse rejects numbers out of f64 range, the raw parse keeps
    // the digits as written
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Number(_) | Value::Bool(_)) => match serde_json::from_str::<&RawValue>(raw) {
            Ok(value) => JsonValue::Raw(value),
            Err(_) => JsonValue::Text(raw),
        },
        _ => JsonValue::Text(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, &str)]) -> Record {
        let mut record = Record::new("INFO", "payload text");
        for (k, v) in fields {
            record.fields.insert(k.to_string(), v.to_string());
        }
        record
    }

    fn encode(format: Format, record: &Record) -> String {
        let config = Config::default().with_format(format);
        let mut out = Vec::new();
        Encoder::new(&config).encode(record, &mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_logfmt_sorted_after_level() {
        let r = record(&[("num", "8"), ("msg", "info"), ("bool", "true"), ("foo", "bar")]);
        assert_eq!(
            encode(Format::Logfmt, &r),
            "level=INFO bool=true foo=bar msg=info num=8\n"
        );
    }

    #[test]
    fn test_logfmt_quoting() {
        let r = record(&[("a", "bar baz"), ("b", "x=y"), ("c", "say \"hi\""), ("d", ""), ("e", "a\nb")]);
        assert_eq!(
            encode(Format::Logfmt, &r),
            "level=INFO a=\"bar baz\" b=\"x=y\" c=\"say \\\"hi\\\"\" d= e=\"a\\nb\"\n"
        );
    }

    #[test]
    fn test_logfmt_sanitizes_keys() {
        let r = record(&[("bad key", "v")]);
        assert_eq!(encode(Format::Logfmt, &r), "level=INFO bad_key=v\n");
    }

    #[test]
    fn test_json_typing() {
        let r = record(&[
            ("num", "8"),
            ("bool", "true"),
            ("float", "9.99"),
            ("text", "OK"),
            ("neg", "-3"),
        ]);
        assert_eq!(
            encode(Format::Json, &r),
            "{\"level\":\"INFO\",\"bool\":true,\"float\":9.99,\"neg\":-3,\"num\":8,\"text\":\"OK\"}\n"
        );
    }

    #[test]
    fn test_json_rejects_non_json_numbers() {
        for raw in ["inf", "NaN", "+5", "0x10", " 8", "8 ", "08", "-", "True", "null", "[1]", ""] {
            assert!(matches!(typed_value(raw), JsonValue::Text(text) if text == raw), "{raw}");
        }
    }

    #[test]
    fn test_json_numbers_keep_their_text() {
        let r = record(&[
            ("id", "123456789012345678901234567890"),
            ("f", "1.50"),
            ("e", "1E2"),
            ("z", "-0"),
        ]);
        assert_eq!(
            encode(Format::Json, &r),
            "{\"level\":\"INFO\",\"e\":1E2,\"f\":1.50,\"id\":123456789012345678901234567890,\"z\":-0}\n"
        );

        let parsed: Value = serde_json::from_str(&encode(Format::Json, &r)).unwrap();
        assert!(parsed["f"].is_number());
    }

    #[test]
    fn test_json_escapes_strings() {
        let r = record(&[("q", "a \"b\"\n")]);
        let line = encode(Format::Json, &r);
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["q"], "a \"b\"\n");
    }

    #[test]
    fn test_plain() {
        assert_eq!(encode(Format::Plain, &record(&[])), "[INFO] payload text\n");
        assert_eq!(encode(Format::Plain, &Record::new("WARN", "")), "[WARN]\n");
    }
}
