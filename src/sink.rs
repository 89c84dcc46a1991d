use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

/// Destination of encoded records.
///
/// Any blocking [`Write`] works: `std::io::stderr()`, a file, a socket, or
/// `std::io::sink()` to discard output. Errors returned by the sink are
/// handed back to the caller of the write unchanged.
pub type Sink = Box<dyn Write + Send>;

/// In-memory sink whose contents stay readable after it has been handed
/// to an [`Output`](crate::output::Output).
///
/// Clones share the same buffer.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock()).into_owned()
    }

    /// Written lines without their terminators.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    /// Drain the buffer, returning what it held.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.inner.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
