//! Storage and output adapters for the meter collector.
//!
//! This crate provides:
//! - File and in-memory checkpoint stores
//! - The XML event stream sink and an in-memory sink

pub mod checkpoint;
pub mod sink;

pub use checkpoint::{parse_cursor, FileCheckpointStore, MemoryCheckpointStore, CURSOR_FORMAT};
pub use sink::{render_event, MemorySink, XmlStreamSink};
