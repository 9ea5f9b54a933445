//! Event stream output.
//!
//! The XML stream framing matches what a modular-input scheduler expects on
//! stdout:
//!
//! ```text
//! <stream>
//! <event><time>1704067200</time><source>1 Main St</source><data>{"metric_name:power":0.5,...}</data></event>
//! </stream>
//! ```

use meter_ingest_core::{EventSink, MergedEvent, SinkError};
use quick_xml::escape::partial_escape;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Pending,
    Open,
    Closed,
}

/// Writes events as an XML stream, flushing after every write.
#[derive(Debug)]
pub struct XmlStreamSink<W: Write> {
    writer: W,
    state: StreamState,
    emitted: u64,
}

impl<W: Write> XmlStreamSink<W> {
    /// Wraps a writer; nothing is written until [`EventSink::open`].
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            state: StreamState::Pending,
            emitted: 0,
        }
    }

    /// Number of events written so far.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, line: &str) -> Result<(), SinkError> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Renders one event record without the trailing newline.
///
/// # Errors
/// Returns an error if the metric payload cannot be encoded.
pub fn render_event(event: &MergedEvent) -> Result<String, SinkError> {
    let payload = event.payload_json()?;
    Ok(format!(
        "<event><time>{}</time><source>{}</source><data>{}</data></event>",
        event.timestamp,
        partial_escape(event.source.as_str()),
        partial_escape(payload.as_str()),
    ))
}

impl<W: Write + Send> EventSink for XmlStreamSink<W> {
    fn open(&mut self) -> Result<(), SinkError> {
        if self.state != StreamState::Pending {
            return Err(SinkError::State("stream already opened"));
        }
        self.write_line("<stream>")?;
        self.state = StreamState::Open;
        Ok(())
    }

    fn emit(&mut self, event: &MergedEvent) -> Result<(), SinkError> {
        match self.state {
            StreamState::Pending => return Err(SinkError::State("emit before open")),
            StreamState::Closed => return Err(SinkError::State("emit after close")),
            StreamState::Open => {}
        }
        let record = render_event(event)?;
        self.write_line(&record)?;
        self.emitted += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        match self.state {
            StreamState::Pending => return Err(SinkError::State("close before open")),
            StreamState::Closed => return Err(SinkError::State("stream already closed")),
            StreamState::Open => {}
        }
        self.write_line("</stream>")?;
        self.state = StreamState::Closed;
        Ok(())
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub opened: u32,
    pub closed: u32,
    pub events: Vec<MergedEvent>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for MemorySink {
    fn open(&mut self) -> Result<(), SinkError> {
        self.opened += 1;
        Ok(())
    }

    fn emit(&mut self, event: &MergedEvent) -> Result<(), SinkError> {
        if self.opened == 0 || self.closed > 0 {
            return Err(SinkError::State("emit outside an open stream"));
        }
        self.events.push(event.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.closed += 1;
        Ok(())
    }
}
