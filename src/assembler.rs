use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, FixedOffset, Local};

use crate::config::{is_valid_time_format, Config, KeyNames};
use crate::record::{Caller, Record};
use crate::tokenizer::Tokens;

/// Merges synthesized and tokenized fields into a record's field set.
///
/// Precedence, later wins on identical keys: timestamp, caller and stack
/// trace; then tokenized pairs; then the message.
#[derive(Debug, Clone)]
pub struct Assembler {
    keys: KeyNames,
    time_format: Option<String>,
    show_caller: bool,
    stacktrace: bool,
}

impl Assembler {
    pub fn new(config: &Config) -> Self {
        let time_format = config.timestamp_layout().and_then(|layout| {
            if is_valid_time_format(layout) {
                Some(layout.to_string())
            } else {
                tracing::warn!(layout, "unsupported timestamp layout, timestamp field disabled");
                None
            }
        });

        Self {
            keys: config.key_names.clone(),
            time_format,
            show_caller: config.show_caller,
            stacktrace: config.stacktrace,
        }
    }

    pub fn keys(&self) -> &KeyNames {
        &self.keys
    }

    /// Fill `record.fields`.
    ///
    /// `record.timestamp`/`record.caller` hold what the upstream header
    /// carried and take precedence over the current time and the explicit
    /// `caller`. `prefix` is prepended to the message text.
    pub fn assemble(&self, record: &mut Record, tokens: Tokens, caller: Option<&Caller>, prefix: &str) {
        let fields = &mut record.fields;

        if let Some(layout) = &self.time_format {
            let now: DateTime<FixedOffset> = Local::now().into();
            let at = record.timestamp.unwrap_or(now);
            let mut stamp = String::with_capacity(layout.len() + 16);
            if write!(stamp, "{}", at.format(layout)).is_ok() {
                fields.insert(self.keys.timestamp.clone(), stamp);
            }
        }

        if self.show_caller {
            let location = record
                .caller
                .clone()
                .or_else(|| caller.map(ToString::to_string));
            if let Some(location) = location {
                fields.insert(self.keys.caller.clone(), location);
            }
        }

        if self.stacktrace {
            fields.insert(
                self.keys.stacktrace.clone(),
                Backtrace::force_capture().to_string(),
            );
        }

        let message = self.merge_tokens(fields, tokens);
        fields.insert(self.keys.msg.clone(), format!("{prefix}{message}"));
    }

    /// Insert tokenized pairs and return the message text: the explicit
    /// `msg` pair if any, else the bare words.
    fn merge_tokens(&self, fields: &mut BTreeMap<String, String>, tokens: Tokens) -> String {
        let mut explicit = None;
        let derived = tokens.message();

        for (key, value) in tokens.pairs {
            if key.eq_ignore_ascii_case(&self.keys.level) {
                continue;
            }
            if key == self.keys.msg {
                explicit = Some(value);
                continue;
            }
            fields.insert(key, value);
        }

        explicit.unwrap_or(derived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn bare_config() -> Config {
        Config::default()
            .without_timestamp()
            .with_caller(false)
            .with_stacktrace(false)
    }

    fn assemble(config: &Config, payload: &str, caller: Option<&Caller>) -> BTreeMap<String, String> {
        let mut record = Record::new("INFO", payload);
        Assembler::new(config).assemble(&mut record, tokenize(payload), caller, "");
        record.fields
    }

    #[test]
    fn test_message_from_bare_words() {
        let fields = assemble(&bare_config(), r#"info foo="bar" num=8"#, None);
        assert_eq!(fields["msg"], "info");
        assert_eq!(fields["foo"], "bar");
        assert_eq!(fields["num"], "8");
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn test_explicit_msg_discards_bare_words() {
        let fields = assemble(&bare_config(), r#"ignored foo="bar" msg="info""#, None);
        assert_eq!(fields["msg"], "info");
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_level_pair_is_reserved() {
        let fields = assemble(&bare_config(), "level=DEBUG Level=x hi", None);
        assert!(!fields.contains_key("level"));
        assert!(!fields.contains_key("Level"));
        assert_eq!(fields["msg"], "hi");
    }

    #[test]
    fn test_prefix_prepended_to_message() {
        let mut record = Record::new("INFO", "foo");
        Assembler::new(&bare_config()).assemble(&mut record, tokenize("foo"), None, "LOG: ");
        assert_eq!(record.fields["msg"], "LOG: foo");
    }

    #[test]
    fn test_synthesized_fields_use_key_names() {
        let mut names = KeyNames::default();
        names.set("timestamp", "@timestamp");
        names.set("msg", "message");
        let config = Config::default()
            .with_time_format("%Y")
            .with_stacktrace(false)
            .with_key_names(names);

        let caller = Caller::new("src/lib.rs", 10);
        let fields = assemble(&config, "hello message=kept", Some(&caller));

        assert_eq!(fields["@timestamp"].len(), 4);
        assert_eq!(fields["caller"], "src/lib.rs:10");
        assert_eq!(fields["message"], "kept");
        assert!(!fields.contains_key("msg"));
    }

    #[test]
    fn test_unsupported_time_format_drops_field() {
        let config = bare_config().with_time_format("%Y %Q");
        let fields = assemble(&config, "still here", None);
        assert!(!fields.contains_key("timestamp"));
        assert_eq!(fields["msg"], "still here");
    }

    #[test]
    fn test_header_caller_wins_over_explicit_caller() {
        let mut record = Record::new("INFO", "x");
        record.caller = Some("main.rs:3".to_string());
        let config = bare_config().with_caller(true);
        let caller = Caller::new("other.rs", 9);
        Assembler::new(&config).assemble(&mut record, tokenize("x"), Some(&caller), "");
        assert_eq!(record.fields["caller"], "main.rs:3");
    }

    #[test]
    fn test_tokenized_field_overrides_synthesized() {
        let config = bare_config().with_caller(true);
        let caller = Caller::new("a.rs", 1);
        let fields = assemble(&config, "caller=custom x", Some(&caller));
        assert_eq!(fields["caller"], "custom");
    }

    #[test]
    fn test_stacktrace_captured_when_enabled() {
        let config = bare_config().with_stacktrace(true);
        let fields = assemble(&config, "x", None);
        assert!(!fields["stacktrace"].is_empty());
    }
}
