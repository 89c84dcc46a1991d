//! Minimal plain line logger and the attachment seam.
//!
//! [`Logger`] writes `prefix date time file:line: message` lines to any
//! [`Sink`]. It is the collaborator an [`Output`](crate::output::Output)
//! attaches to: the output only reads the prefix and flags and takes over
//! the writer, through the [`Attach`] trait.

use std::fmt;
use std::io::{self, Write};

use chrono::Utc;

use crate::header::{self, Flags};
use crate::record::Caller;
use crate::sink::Sink;

/// Capabilities an [`Output`](crate::output::Output) needs from a logger
/// it attaches to.
pub trait Attach {
    fn prefix(&self) -> String;
    fn flags(&self) -> Flags;
    /// Send every subsequent line to `output` instead.
    fn set_output(&mut self, output: Sink);
}

/// Plain logger writing one line per call.
pub struct Logger {
    prefix: String,
    flags: Flags,
    out: Sink,
}

impl Logger {
    pub fn new(out: impl Write + Send + 'static, prefix: impl Into<String>, flags: Flags) -> Self {
        Self {
            prefix: prefix.into(),
            flags,
            out: Box::new(out),
        }
    }

    /// Logger writing to standard error with [`Flags::STD`].
    pub fn stderr() -> Self {
        Self::new(io::stderr(), "", Flags::STD)
    }

    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    pub fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
    }

    /// Write `message` followed by a newline, with the header for the
    /// current flags. The file location is the caller of this method.
    #[track_caller]
    pub fn println(&mut self, message: impl fmt::Display) -> io::Result<()> {
        let caller = Caller::here();
        self.output(&caller, &message.to_string())
    }

    /// Write one line for `caller`. A trailing newline is added when
    /// missing.
    pub fn output(&mut self, caller: &Caller, message: &str) -> io::Result<()> {
        let mut line = header::render(Utc::now(), caller, &self.prefix, self.flags);
        line.push_str(message);
        if !line.ends_with('\n') {
            line.push('\n');
        }
        self.out.write_all(line.as_bytes())
    }
}

impl Attach for Logger {
    fn prefix(&self) -> String {
        self.prefix.clone()
    }

    fn flags(&self) -> Flags {
        self.flags
    }

    fn set_output(&mut self, output: Sink) {
        self.out = output;
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("prefix", &self.prefix)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
