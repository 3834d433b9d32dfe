//! Line capture for the guest's stdout and stderr.
//!
//! The guest writes arbitrary byte chunks. A [`LineWriter`] splits them on
//! `\n` and hands each complete line (without the newline) to a
//! [`LineSink`], in the order the bytes arrived. Whatever is left without a
//! newline when the engine exits goes out as one last line on
//! [`LineWriter::finish`].

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::{Arc, Mutex, PoisonError};
use wasmtime_wasi::{HostOutputStream, StdoutStream, StreamResult, Subscribe};

use crate::binding::LineSink;
use crate::consts::MAX_WRITE_BYTES;

pub struct LineWriter {
    sink: Option<LineSink>,
    pending: Vec<u8>,
}

impl LineWriter {
    /// A writer that forwards to `sink`, or discards everything when `None`.
    pub fn new(sink: Option<LineSink>) -> Self {
        Self {
            sink,
            pending: Vec::new(),
        }
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            let line = String::from_utf8_lossy(&self.pending[start..end]).into_owned();
            self.emit(&line);
            start = end + 1;
        }
        self.pending.drain(..start);
    }

    /// Emit the trailing partial line, if any.
    pub fn finish(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        self.emit(&line);
    }

    fn emit(&mut self, line: &str) {
        if let Some(sink) = self.sink.as_mut() {
            sink(line);
        }
    }
}

/// Shared handle to a [`LineWriter`], pluggable as a WASI stdout/stderr.
#[derive(Clone)]
pub struct CaptureOutput {
    writer: Arc<Mutex<LineWriter>>,
}

impl CaptureOutput {
    pub fn new(sink: Option<LineSink>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(LineWriter::new(sink))),
        }
    }

    pub fn write(&self, bytes: &[u8]) {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write(bytes);
    }

    pub fn finish(&self) {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .finish();
    }
}

impl StdoutStream for CaptureOutput {
    fn stream(&self) -> Box<dyn HostOutputStream> {
        Box::new(CaptureStream {
            output: self.clone(),
        })
    }

    fn isatty(&self) -> bool {
        false
    }
}

/// The per-descriptor stream wasmtime writes into.
struct CaptureStream {
    output: CaptureOutput,
}

#[async_trait]
impl Subscribe for CaptureStream {
    async fn ready(&mut self) {}
}

impl HostOutputStream for CaptureStream {
    fn write(&mut self, bytes: Bytes) -> StreamResult<()> {
        self.output.write(&bytes);
        Ok(())
    }

    fn flush(&mut self) -> StreamResult<()> {
        Ok(())
    }

    fn check_write(&mut self) -> StreamResult<usize> {
        Ok(MAX_WRITE_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collecting() -> (Arc<Mutex<Vec<String>>>, LineWriter) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink_lines = Arc::clone(&lines);
        let writer = LineWriter::new(Some(Box::new(move |line: &str| {
            sink_lines.lock().unwrap().push(line.to_string());
        })));
        (lines, writer)
    }

    #[test]
    fn splits_on_newlines() {
        let (lines, mut writer) = collecting();
        writer.write(b"one\ntwo\n");
        assert_eq!(*lines.lock().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn joins_lines_across_chunks() {
        let (lines, mut writer) = collecting();
        writer.write(b"expa");
        writer.write(b"nded 42\nnodes");
        assert_eq!(*lines.lock().unwrap(), vec!["expanded 42"]);
        writer.write(b" 7\n");
        assert_eq!(*lines.lock().unwrap(), vec!["expanded 42", "nodes 7"]);
    }

    #[test]
    fn finish_flushes_partial_line() {
        let (lines, mut writer) = collecting();
        writer.write(b"done\nno newline");
        writer.finish();
        writer.finish();
        assert_eq!(*lines.lock().unwrap(), vec!["done", "no newline"]);
    }

    #[test]
    fn empty_lines_are_kept() {
        let (lines, mut writer) = collecting();
        writer.write(b"\n\nx\n");
        assert_eq!(*lines.lock().unwrap(), vec!["", "", "x"]);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let (lines, mut writer) = collecting();
        writer.write(b"bad \xff byte\n");
        assert_eq!(*lines.lock().unwrap(), vec!["bad \u{fffd} byte"]);
    }

    #[test]
    fn no_sink_discards() {
        let mut writer = LineWriter::new(None);
        writer.write(b"ignored\n");
        writer.finish();
    }

    #[test]
    fn streams_share_one_writer() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink_lines = Arc::clone(&lines);
        let output = CaptureOutput::new(Some(Box::new(move |line: &str| {
            sink_lines.lock().unwrap().push(line.to_string());
        })));

        let mut first = output.stream();
        let mut second = output.stream();
        first.write(Bytes::from_static(b"par")).unwrap();
        second.write(Bytes::from_static(b"tial\n")).unwrap();
        output.finish();

        assert_eq!(*lines.lock().unwrap(), vec!["partial"]);
    }
}
