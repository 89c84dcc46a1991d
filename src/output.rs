use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::assembler::Assembler;
use crate::config::{Config, Format};
use crate::encoder::Encoder;
use crate::header::{self, Flags};
use crate::level::{extract_level, LevelFilter};
use crate::logger::Attach;
use crate::record::{Caller, Record};
use crate::sink::Sink;
use crate::tokenizer::tokenize;

/// Prefix and flags of the plain logger writing into an [`Output`].
#[derive(Debug, Clone, Default)]
struct Upstream {
    prefix: String,
    flags: Flags,
}

/// [`Write`] adapter that filters plain log lines by level and re-emits
/// them through the configured [`Format`].
///
/// Every write call is one line. The pipeline runs synchronously on the
/// caller's thread: header split, level marker, filter, tokenize,
/// assemble, encode, then a single `write_all` to the sink. Writes from
/// several threads are serialized on the sink lock, so records never
/// interleave.
///
/// A line filtered out by level reports success with its full length and
/// nothing reaches the sink. The only error a write can return is the
/// sink's own.
pub struct Output {
    filter: LevelFilter,
    assembler: Assembler,
    encoder: Encoder,
    level_from_key: bool,
    upstream: RwLock<Upstream>,
    sink: Mutex<Sink>,
}

impl Output {
    /// Build an output writing to `sink`.
    ///
    /// The skip-set is computed here; `config` cannot change afterwards.
    pub fn new(config: Config, sink: impl Write + Send + 'static) -> Self {
        Self {
            filter: LevelFilter::new(&config.levels, &config.min_level),
            assembler: Assembler::new(&config),
            encoder: Encoder::new(&config),
            level_from_key: config.level_from_key,
            upstream: RwLock::new(Upstream {
                prefix: config.prefix.clone(),
                flags: config.flags,
            }),
            sink: Mutex::new(Box::new(sink)),
        }
    }

    /// Output writing to standard error, like a plain logger's default.
    pub fn stderr(config: Config) -> Self {
        Self::new(config, io::stderr())
    }

    pub fn format(&self) -> Format {
        self.encoder.format()
    }

    pub fn level_filter(&self) -> &LevelFilter {
        &self.filter
    }

    /// Prefix the upstream logger writes in front of each line.
    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.upstream.write().prefix = prefix.into();
    }

    /// Header layout the upstream logger writes.
    pub fn set_flags(&self, flags: Flags) {
        self.upstream.write().flags = flags;
    }

    pub fn prefix(&self) -> String {
        self.upstream.read().prefix.clone()
    }

    pub fn flags(&self) -> Flags {
        self.upstream.read().flags
    }

    /// Copy `logger`'s prefix and flags, then redirect its output here.
    pub fn attach<L: Attach + ?Sized>(self: &Arc<Self>, logger: &mut L) {
        self.set_prefix(logger.prefix());
        self.set_flags(logger.flags());
        logger.set_output(Box::new(OutputWriter(Arc::clone(self))));
        tracing::debug!(prefix = %self.prefix(), flags = ?self.flags(), "attached plain logger");
    }

    /// Write one line, reporting the calling location as the caller.
    #[track_caller]
    pub fn log(&self, line: &str) -> io::Result<usize> {
        let caller = Caller::here();
        self.write_line(line, Some(&caller))
    }

    /// Write one line.
    ///
    /// `caller` is used for the caller field unless the upstream header
    /// already carries a file location. Returns `line.len()` on success,
    /// including when the line was filtered out.
    pub fn write_line(&self, line: &str, caller: Option<&Caller>) -> io::Result<usize> {
        let Some(encoded) = self.render(line, caller) else {
            return Ok(line.len());
        };

        self.sink.lock().write_all(&encoded)?;
        Ok(line.len())
    }

    /// Run the pipeline without touching the sink. `None` means the line
    /// was filtered out.
    pub fn render(&self, line: &str, caller: Option<&Caller>) -> Option<Vec<u8>> {
        let Upstream { prefix, flags } = self.upstream.read().clone();

        let body = trim_line_end(line);
        let (head, rest) = header::split(body, &prefix, flags);
        let (mut marker, payload) = extract_level(rest);

        // a `level=` pair stands in for a missing marker
        let mut tokens = None;
        if marker.is_none() && self.level_from_key {
            let scanned = tokenize(&payload);
            marker = scanned
                .value_of(&self.assembler.keys().level)
                .map(str::to_uppercase);
            tokens = Some(scanned);
        }

        let level = self.filter.resolve(marker.as_deref());
        if self.filter.skips(level) {
            return None;
        }

        let mut record = Record::new(level, format!("{prefix}{payload}"));
        record.timestamp = head.timestamp;
        record.caller = head.caller;

        if self.encoder.format() != Format::Plain {
            let tokens = tokens.unwrap_or_else(|| tokenize(&payload));
            self.assembler.assemble(&mut record, tokens, caller, &prefix);
        }

        let mut out = Vec::with_capacity(line.len() + 32);
        self.encoder.encode(&record, &mut out);
        Some(out)
    }

    pub fn flush_sink(&self) -> io::Result<()> {
        self.sink.lock().flush()
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let upstream = self.upstream.read();
        f.debug_struct("Output")
            .field("format", &self.encoder.format())
            .field("min_level", &self.filter.min_level())
            .field("prefix", &upstream.prefix)
            .field("flags", &upstream.flags)
            .finish_non_exhaustive()
    }
}

fn trim_line_end(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

impl Write for &Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let line = String::from_utf8_lossy(buf);
        self.write_line(&line, None)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_sink()
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_sink()
    }
}

/// Shared handle to an [`Output`] usable wherever a [`Sink`] is expected.
#[derive(Debug, Clone)]
pub struct OutputWriter(pub Arc<Output>);

impl Write for OutputWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self.0).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush_sink()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SharedBuffer;

    fn quiet_config() -> Config {
        Config::default()
            .without_timestamp()
            .with_caller(false)
            .with_stacktrace(false)
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_output_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Output>();
    }

    #[test]
    fn test_filtered_write_reports_full_length() {
        let buffer = SharedBuffer::new();
        let mut output = Output::new(quiet_config(), buffer.clone());

        let n = output.write(b"[DEBUG] debug\n").unwrap();
        assert_eq!(n, 14);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_sink_error_propagates() {
        let output = Output::new(quiet_config(), FailingSink);
        let err = output.write_line("[ERROR] boom", None).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

        // filtered lines never reach the failing sink
        assert_eq!(output.write_line("[TRACE] quiet", None).unwrap(), 13);
    }

    #[test]
    fn test_log_reports_call_site() {
        let buffer = SharedBuffer::new();
        let output = Output::new(quiet_config().with_caller(true), buffer.clone());
        output.log("hello").unwrap();

        let line = buffer.contents();
        assert!(line.contains("caller="), "{line}");
        assert!(line.contains("output.rs:"), "{line}");
    }

    #[test]
    fn test_prefix_from_config() {
        let buffer = SharedBuffer::new();
        let output = Output::new(quiet_config().with_prefix("app: "), buffer.clone());
        output.write_line("app: [WARN] disk full", None).unwrap();
        assert_eq!(buffer.contents(), "level=WARN msg=\"app: disk full\"\n");
    }

    #[test]
    fn test_render_marker_is_not_message_content() {
        let output = Output::new(quiet_config(), io::sink());
        let line = output.render("[INFO] info foo=\"bar\" num=8", None).unwrap();
        assert_eq!(
            String::from_utf8(line).unwrap(),
            "level=INFO foo=bar msg=info num=8\n"
        );
    }

    #[test]
    fn test_level_from_key() {
        let output = Output::new(quiet_config().with_level_from_key(true), io::sink());
        let render = |line: &str| output.render(line, None).map(|l| String::from_utf8(l).unwrap());

        assert_eq!(render("level=warn msg=x").as_deref(), Some("level=WARN msg=x\n"));
        assert_eq!(render("LEVEL=Error boom").as_deref(), Some("level=ERROR msg=boom\n"));
        assert_eq!(render("level=debug msg=hidden"), None);
        // an explicit marker wins over the pair
        assert_eq!(render("[ERROR] level=debug x").as_deref(), Some("level=ERROR msg=x\n"));
        assert_eq!(render("no level here").as_deref(), Some("level=INFO msg=\"no level here\"\n"));
    }

    #[test]
    fn test_level_pair_ignored_by_default() {
        let output = Output::new(quiet_config(), io::sink());
        let line = output.render("level=warn msg=x", None).unwrap();
        assert_eq!(String::from_utf8(line).unwrap(), "level=INFO msg=x\n");
    }

    #[test]
    fn test_set_prefix_and_flags() {
        let output = Output::new(quiet_config(), io::sink());
        output.set_prefix("x ");
        output.set_flags(Flags::SHORT_FILE);
        assert_eq!(output.prefix(), "x ");
        assert_eq!(output.flags(), Flags::SHORT_FILE);

        let line = output.render("x main.rs:7: [ERROR] bad", None).unwrap();
        assert_eq!(String::from_utf8(line).unwrap(), "level=ERROR msg=\"x bad\"\n");
    }
}
