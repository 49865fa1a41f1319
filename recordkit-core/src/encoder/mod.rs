//! Encoders driving the PCM → container pipeline.

mod passthrough;
mod transcode;

pub use passthrough::PassthroughEncoder;
pub use transcode::TranscodeEncoder;

use crate::models::error::RecordError;

/// A running pipeline segment: PCM in, container or stream out.
pub trait Encoder: Send {
    /// Begin encoding. Fails if already started.
    fn start(&mut self) -> Result<(), RecordError>;

    /// Signal end-of-stream and block until the pipeline is drained and the
    /// container finalized.
    fn stop(&mut self);

    /// Free resources. Idempotent; safe after or instead of `stop`.
    fn release(&mut self);
}

/// The session side of an encoder: supplies PCM and receives outcomes.
pub trait EncoderSink: Send + Sync {
    /// Preferred PCM pull size in bytes.
    fn read_size(&self) -> usize;

    /// Pull the next PCM chunk. Blocks while the session is paused; 0 bytes
    /// means no data yet and is valid.
    fn pull(&self, buf: &mut [u8]) -> Result<usize, RecordError>;

    /// Encoded bytes for stream-mode delivery, in capture order.
    fn on_chunk(&self, chunk: Vec<u8>);

    /// The single failure funnel; invoked at most once, before teardown.
    fn on_failure(&self, error: RecordError);

    /// The pipeline has fully stopped: drained, flushed, finalized.
    fn on_stop(&self);
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Scripted sink: serves a fixed number of chunks, then empty reads.
    pub struct ScriptedSink {
        chunk: Vec<u8>,
        serves: AtomicUsize,
        pub chunks: Mutex<Vec<Vec<u8>>>,
        pub failures: Mutex<Vec<RecordError>>,
        pub stopped: AtomicBool,
    }

    impl ScriptedSink {
        pub fn new(chunk: Vec<u8>, serves: usize) -> Self {
            Self {
                chunk,
                serves: AtomicUsize::new(serves),
                chunks: Mutex::new(Vec::new()),
                failures: Mutex::new(Vec::new()),
                stopped: AtomicBool::new(false),
            }
        }

        pub fn served_out(&self) -> bool {
            self.serves.load(Ordering::SeqCst) == 0
        }
    }

    impl EncoderSink for ScriptedSink {
        fn read_size(&self) -> usize {
            self.chunk.len().max(2)
        }

        fn pull(&self, buf: &mut [u8]) -> Result<usize, RecordError> {
            let remaining = self.serves.load(Ordering::SeqCst);
            if remaining == 0 {
                std::thread::sleep(std::time::Duration::from_millis(1));
                return Ok(0);
            }
            self.serves.store(remaining - 1, Ordering::SeqCst);
            let n = self.chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&self.chunk[..n]);
            Ok(n)
        }

        fn on_chunk(&self, chunk: Vec<u8>) {
            self.chunks.lock().push(chunk);
        }

        fn on_failure(&self, error: RecordError) {
            self.failures.lock().push(error);
        }

        fn on_stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }
}
