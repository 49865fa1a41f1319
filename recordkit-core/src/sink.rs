//! Event sinks the session pushes into.
//!
//! Delivery is push-only and must not block: implementations hand events to
//! their own dispatch mechanism.

use crate::models::error::RecordError;
use crate::models::state::RecordState;

/// Receives state transitions and failure notifications.
pub trait StateSink: Send + Sync {
    fn on_state(&self, state: RecordState);
    fn on_error(&self, error: &RecordError);
}

/// Receives encoded byte chunks in capture order, for stream-mode sessions.
pub trait ChunkSink: Send + Sync {
    fn on_chunk(&self, chunk: Vec<u8>);
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl StateSink for NullSink {
    fn on_state(&self, _state: RecordState) {}
    fn on_error(&self, _error: &RecordError) {}
}

impl ChunkSink for NullSink {
    fn on_chunk(&self, _chunk: Vec<u8>) {}
}
