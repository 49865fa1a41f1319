//! Passthrough encoder for raw PCM formats.
//!
//! Runs its own pull loop: one read per pass, written straight into the
//! container with a timestamp derived from the frames written so far. After
//! the stop flag is observed it makes a final zero-length end-of-stream pass
//! so the container sees the terminal unit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::container::ContainerWriter;
use crate::encoder::{Encoder, EncoderSink};
use crate::models::audio::{EncodedUnit, MediaParameters};
use crate::models::error::RecordError;

pub struct PassthroughEncoder {
    params: MediaParameters,
    container: Option<Box<dyn ContainerWriter>>,
    sink: Arc<dyn EncoderSink>,
    stop_requested: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
    started: bool,
}

impl PassthroughEncoder {
    pub fn new(
        params: MediaParameters,
        container: Box<dyn ContainerWriter>,
        sink: Arc<dyn EncoderSink>,
    ) -> Self {
        Self {
            params,
            container: Some(container),
            sink,
            stop_requested: Arc::new(AtomicBool::new(false)),
            handle: None,
            started: false,
        }
    }
}

impl Encoder for PassthroughEncoder {
    fn start(&mut self) -> Result<(), RecordError> {
        if self.started {
            return Err(RecordError::Codec("encoder already started".to_string()));
        }
        let container = self
            .container
            .take()
            .ok_or_else(|| RecordError::Codec("encoder already released".to_string()))?;
        self.started = true;

        let params = self.params.clone();
        let sink = Arc::clone(&self.sink);
        let stop = Arc::clone(&self.stop_requested);
        let handle = thread::Builder::new()
            .name("passthrough-encoder".to_string())
            .spawn(move || run(container, params, sink, stop))
            .map_err(|e| RecordError::Codec(format!("failed to spawn encoder thread: {e}")))?;
        self.handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn release(&mut self) {
        self.stop();
        if let Some(mut container) = self.container.take() {
            container.release();
        }
    }
}

fn run(
    mut container: Box<dyn ContainerWriter>,
    params: MediaParameters,
    sink: Arc<dyn EncoderSink>,
    stop: Arc<AtomicBool>,
) {
    let track = match container
        .add_track(&params)
        .and_then(|track| container.start().map(|_| track))
    {
        Ok(track) => track,
        Err(e) => {
            sink.on_failure(e);
            container.release();
            sink.on_stop();
            return;
        }
    };

    let frame_size = params.frame_size.max(1);
    let rate = params.sample_rate.max(1) as u64;
    let mut frames_written: u64 = 0;
    loop {
        let stopping = stop.load(Ordering::SeqCst);
        let mut buf = vec![0u8; sink.read_size().max(frame_size)];
        let read = if stopping {
            0
        } else {
            match sink.pull(&mut buf) {
                Ok(n) => n,
                Err(e) => {
                    sink.on_failure(e);
                    break;
                }
            }
        };
        buf.truncate(read);

        let unit = EncodedUnit {
            bytes: buf,
            pts_us: frames_written * 1_000_000 / rate,
            end_of_stream: stopping,
        };
        let written = if container.is_stream() {
            container.write_stream(track, &unit).map(|chunk| {
                if !chunk.is_empty() {
                    sink.on_chunk(chunk);
                }
            })
        } else {
            container.write_sample(track, &unit)
        };
        if let Err(e) = written {
            sink.on_failure(e);
            break;
        }

        frames_written += (read / frame_size) as u64;
        if stopping {
            break;
        }
    }

    if let Err(e) = container.stop() {
        log::warn!("container finalize failed: {e}");
    }
    sink.on_stop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::RawContainer;
    use crate::encoder::test_support::ScriptedSink;
    use crate::models::audio::StreamType;
    use std::sync::atomic::Ordering;

    fn params() -> MediaParameters {
        MediaParameters {
            stream_type: StreamType::RawPcm,
            sample_rate: 16_000,
            bit_rate: 256_000,
            num_channels: 1,
            frame_size: 2,
            aac_profile: None,
        }
    }

    #[test]
    fn test_stream_mode_delivers_chunks_then_stops() {
        let sink = Arc::new(ScriptedSink::new(vec![0x55; 64], 3));
        let container = Box::new(RawContainer::new(None).unwrap());
        let mut encoder =
            PassthroughEncoder::new(params(), container, Arc::clone(&sink) as Arc<dyn EncoderSink>);
        encoder.start().unwrap();

        while !sink.served_out() {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        encoder.stop();
        encoder.release();

        let chunks = sink.chunks.lock();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c == &vec![0x55; 64]));
        assert!(sink.stopped.load(Ordering::SeqCst));
        assert!(sink.failures.lock().is_empty());
    }

    #[test]
    fn test_double_start_fails() {
        let sink = Arc::new(ScriptedSink::new(vec![0; 4], 0));
        let container = Box::new(RawContainer::new(None).unwrap());
        let mut encoder = PassthroughEncoder::new(params(), container, sink);
        encoder.start().unwrap();
        assert!(encoder.start().is_err());
        encoder.release();
    }

    #[test]
    fn test_file_mode_timestamps_advance_by_frames() {
        let path = std::env::temp_dir().join(format!(
            "recordkit_passthrough_{}.pcm",
            std::process::id()
        ));
        let sink = Arc::new(ScriptedSink::new(vec![0x10; 32], 2));
        let container = Box::new(RawContainer::new(Some(path.as_path())).unwrap());
        let mut encoder =
            PassthroughEncoder::new(params(), container, Arc::clone(&sink) as Arc<dyn EncoderSink>);
        encoder.start().unwrap();
        while !sink.served_out() {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        encoder.stop();
        encoder.release();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(bytes.len(), 64);
        assert!(sink.stopped.load(Ordering::SeqCst));
    }
}
