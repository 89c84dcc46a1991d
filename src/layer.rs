use crate::encoder::write_logfmt_field;
use crate::output::Output;
use crate::record::Caller;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that renders events as plain
/// `[LEVEL] key=value msg="..."` lines and feeds them through an
/// [`Output`].
///
/// Level filtering, field typing and encoding are all done by the output,
/// so `tracing` events and lines from a plain logger come out identical.
/// The event's file and line become the caller.
pub struct ReshapeLayer {
    output: Arc<Output>,
    include_target: bool,
    /// Total events seen by the layer.
    pub total_events: Arc<AtomicU64>,
    /// Events whose write to the sink failed.
    pub failed_events: Arc<AtomicU64>,
}

impl ReshapeLayer {
    pub fn new(output: Arc<Output>) -> Self {
        Self {
            output,
            include_target: true,
            total_events: Arc::new(AtomicU64::new(0)),
            failed_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Whether to add the event target as a `target` field.
    pub fn with_target(mut self, include: bool) -> Self {
        self.include_target = include;
        self
    }

    fn render_line(&self, level: &Level, target: &str, fields: &BTreeMap<String, String>, message: Option<&str>) -> String {
        let mut line = format!("[{}]", level_name(level));

        if self.include_target {
            line.push(' ');
            write_logfmt_field(&mut line, "target", target);
        }

        for (key, value) in fields {
            line.push(' ');
            write_logfmt_field(&mut line, key, value);
        }

        if let Some(message) = message {
            line.push(' ');
            write_logfmt_field(&mut line, "msg", message);
        }

        line
    }
}

thread_local! {
    // set while this thread is inside `Output::write_line`
    static WRITING: Cell<bool> = const { Cell::new(false) };
}

/// Holds `WRITING` set until dropped, unwinding included.
struct WritingGuard;

impl WritingGuard {
    fn enter() -> Self {
        WRITING.with(|w| w.set(true));
        WritingGuard
    }
}

impl Drop for WritingGuard {
    fn drop(&mut self) {
        WRITING.with(|w| w.set(false));
    }
}

fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "TRACE",
        Level::DEBUG => "DEBUG",
        Level::INFO => "INFO",
        Level::WARN => "WARN",
        Level::ERROR => "ERROR",
    }
}

impl<S> Layer<S> for ReshapeLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        // the output reports its own diagnostics through tracing
        if WRITING.with(Cell::get) {
            return;
        }
        let meta = event.metadata();
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;

        let mut visitor = FieldVisitor { fields: &mut fields, message: &mut message };
        event.record(&mut visitor);

        let line = self.render_line(meta.level(), meta.target(), &fields, message.as_deref());
        let caller = match (meta.file(), meta.line()) {
            (Some(file), Some(line)) => Some(Caller::new(file, line)),
            _ => None,
        };

        let result = {
            let _guard = WritingGuard::enter();
            self.output.write_line(&line, caller.as_ref())
        };

        if let Err(e) = result {
            self.failed_events.fetch_add(1, Ordering::Relaxed);
            eprintln!("error writing log record: {}", e);
        }
    }
}

use tracing::field::{Field, Visit};

pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, String>,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), format!("{:?}", value));
        }
    }
}
