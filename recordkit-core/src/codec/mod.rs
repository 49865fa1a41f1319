//! Codec event protocol.
//!
//! A codec runs on its own thread and delivers tagged events over a bounded
//! channel; the transcoding encoder's dispatch loop consumes them. The
//! channel depth of one keeps the codec in lockstep with dispatch, so at
//! most one end-of-stream signal can ever be pending.

pub mod flac;
pub mod registry;

use std::sync::mpsc::SyncSender;

use crate::models::audio::{AudioFrame, EncodedUnit, MediaParameters};
use crate::models::error::RecordError;

/// Depth of the codec event channel.
pub const EVENT_CHANNEL_DEPTH: usize = 1;

/// Events emitted by an [`AudioCodec`] on its own thread.
#[derive(Debug)]
pub enum CodecEvent {
    /// The output format is known. Emitted exactly once, before any output.
    FormatReady(MediaParameters),
    /// The codec wants the next PCM chunk, answered via
    /// [`AudioCodec::supply`].
    InputNeeded { capacity: usize },
    /// An encoded unit is ready; `end_of_stream` on the unit marks the
    /// final one.
    Output(EncodedUnit),
    /// Terminal failure. No further events follow.
    Error(RecordError),
}

/// An audio codec driven by the event protocol.
pub trait AudioCodec: Send {
    /// Start the codec thread, delivering events to `events`. Fails if
    /// already started.
    fn start(&mut self, events: SyncSender<CodecEvent>) -> Result<(), RecordError>;

    /// Answer an `InputNeeded` event with a PCM chunk. An empty frame with
    /// `end_of_stream` set asks the codec to flush and finish. Never blocks
    /// on the event channel.
    fn supply(&mut self, frame: AudioFrame, end_of_stream: bool) -> Result<(), RecordError>;

    /// Abort encoding without waiting for a flush.
    fn stop(&mut self);

    /// Free codec resources, joining the codec thread. Idempotent.
    fn release(&mut self);
}
