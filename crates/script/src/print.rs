//! Print adapter: `console.log` / `console.error` and Rhai's `print` / `debug`.
//!
//! Every call writes exactly one line, tagged with the stream it belongs to.
//! There is no buffering and no level filtering; ordering is call order.

use parking_lot::Mutex;
use rhai::Dynamic;
use std::io::Write;
use std::sync::Arc;

use crate::convert;

/// Which host stream a line goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    /// Normal output (`console.log`, `print`)
    Stdout,
    /// Error-classified output (`console.error`, `debug`)
    Stderr,
}

/// Where printed lines end up.
pub trait PrintSink: Send + Sync {
    /// Write one complete line (without the trailing newline)
    fn write_line(&self, stream: OutputStream, line: &str);
}

/// Writes to the process's stdout / stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdioSink;

impl PrintSink for StdioSink {
    fn write_line(&self, stream: OutputStream, line: &str) {
        // a closed pipe must not abort the script
        let _ = match stream {
            OutputStream::Stdout => writeln!(std::io::stdout().lock(), "{}", line),
            OutputStream::Stderr => writeln!(std::io::stderr().lock(), "{}", line),
        };
    }
}

/// Keeps every line in memory. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct BufferSink {
    lines: Arc<Mutex<Vec<(OutputStream, String)>>>,
}

impl BufferSink {
    /// Empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines in write order
    pub fn lines(&self) -> Vec<(OutputStream, String)> {
        self.lines.lock().clone()
    }

    /// Lines written to `stream`, in order
    pub fn stream(&self, stream: OutputStream) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(s, _)| *s == stream)
            .map(|(_, line)| line.clone())
            .collect()
    }

    /// Lines written to stdout
    pub fn stdout(&self) -> Vec<String> {
        self.stream(OutputStream::Stdout)
    }

    /// Lines written to stderr
    pub fn stderr(&self) -> Vec<String> {
        self.stream(OutputStream::Stderr)
    }

    /// Forget everything captured so far
    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl PrintSink for BufferSink {
    fn write_line(&self, stream: OutputStream, line: &str) {
        self.lines.lock().push((stream, line.to_string()));
    }
}

/// Renders script values and hands lines to a [`PrintSink`].
#[derive(Clone)]
pub struct PrintAdapter {
    sink: Arc<dyn PrintSink>,
}

impl std::fmt::Debug for PrintAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintAdapter").finish_non_exhaustive()
    }
}

impl PrintAdapter {
    /// Adapter over `sink`
    pub fn new(sink: Arc<dyn PrintSink>) -> Self {
        Self { sink }
    }

    /// `console.log(...values)`
    pub fn log(&self, values: &[Dynamic]) {
        self.write(OutputStream::Stdout, values);
    }

    /// `console.error(...values)`
    pub fn error(&self, values: &[Dynamic]) {
        self.write(OutputStream::Stderr, values);
    }

    /// Render `values` and write them as one line to `stream`
    pub fn write(&self, stream: OutputStream, values: &[Dynamic]) {
        self.line(stream, &Self::render(values));
    }

    /// Write pre-formatted text as one line
    pub fn line(&self, stream: OutputStream, text: &str) {
        self.sink.write_line(stream, text);
    }

    /// Each value as JSON, joined by a single space.
    ///
    /// Unit renders as `null`, handles as their descriptor. Values with no
    /// JSON form (function pointers) also render as `null`.
    pub fn render(values: &[Dynamic]) -> String {
        values
            .iter()
            .map(|value| convert::to_json_lossy(value).to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
