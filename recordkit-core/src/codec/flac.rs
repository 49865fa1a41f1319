//! Built-in FLAC codec backed by `flacenc`.
//!
//! `flacenc` encodes a complete sample buffer, so the codec accumulates PCM
//! on its thread and produces the whole stream when the end-of-stream frame
//! arrives, emitting it as chunked output units with the final unit flagged.

use std::collections::VecDeque;
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread;

use flacenc::bitsink::ByteSink;
use flacenc::component::BitRepr;
use flacenc::config;
use flacenc::error::Verify;
use flacenc::source::MemSource;
use parking_lot::{Condvar, Mutex};

use crate::codec::registry::CodecCapabilities;
use crate::codec::{AudioCodec, CodecEvent};
use crate::models::audio::{AudioFrame, EncodedUnit, MediaParameters, StreamType};
use crate::models::error::RecordError;

const BITS_PER_SAMPLE: usize = 16;

/// Size of the output units handed to the container.
const UNIT_SIZE: usize = 4096;

#[derive(Default)]
struct InputQueue {
    pending: VecDeque<(AudioFrame, bool)>,
    aborted: bool,
}

#[derive(Default)]
struct Shared {
    queue: Mutex<InputQueue>,
    cond: Condvar,
}

pub struct FlacCodec {
    params: MediaParameters,
    shared: Arc<Shared>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FlacCodec {
    pub fn new(params: &MediaParameters) -> Self {
        Self {
            params: params.clone(),
            shared: Arc::new(Shared::default()),
            handle: None,
        }
    }

    pub fn capabilities() -> CodecCapabilities {
        CodecCapabilities {
            stream_type: StreamType::Flac,
            sample_rates: Some(vec![8_000, 11_025, 16_000, 22_050, 44_100, 48_000]),
            // lossless; the rate is not negotiated but must be non-zero to
            // satisfy range clamping
            bit_rate_range: 0..=u32::MAX,
            max_channels: 2,
        }
    }
}

impl AudioCodec for FlacCodec {
    fn start(&mut self, events: SyncSender<CodecEvent>) -> Result<(), RecordError> {
        if self.handle.is_some() {
            return Err(RecordError::Codec("codec already started".to_string()));
        }
        let shared = Arc::clone(&self.shared);
        let params = self.params.clone();
        let handle = thread::Builder::new()
            .name("flac-codec".to_string())
            .spawn(move || run(shared, params, events))
            .map_err(|e| RecordError::Codec(format!("failed to spawn codec thread: {e}")))?;
        self.handle = Some(handle);
        Ok(())
    }

    fn supply(&mut self, frame: AudioFrame, end_of_stream: bool) -> Result<(), RecordError> {
        let mut queue = self.shared.queue.lock();
        queue.pending.push_back((frame, end_of_stream));
        self.shared.cond.notify_one();
        Ok(())
    }

    fn stop(&mut self) {
        let mut queue = self.shared.queue.lock();
        queue.aborted = true;
        self.shared.cond.notify_all();
    }

    fn release(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(shared: Arc<Shared>, params: MediaParameters, events: SyncSender<CodecEvent>) {
    // 100 ms of input per request
    let chunk_bytes = (params.sample_rate as usize / 10).max(1) * params.frame_size;
    if events
        .send(CodecEvent::FormatReady(params.clone()))
        .is_err()
    {
        return;
    }

    let mut samples: Vec<i32> = Vec::new();
    loop {
        if events
            .send(CodecEvent::InputNeeded {
                capacity: chunk_bytes,
            })
            .is_err()
        {
            return;
        }
        let (frame, end_of_stream) = {
            let mut queue = shared.queue.lock();
            loop {
                if queue.aborted {
                    return;
                }
                if let Some(item) = queue.pending.pop_front() {
                    break item;
                }
                shared.cond.wait(&mut queue);
            }
        };
        for pair in frame.bytes.chunks_exact(2) {
            samples.push(i16::from_le_bytes([pair[0], pair[1]]) as i32);
        }
        if end_of_stream {
            break;
        }
    }

    let total_frames = samples.len() / params.num_channels.max(1) as usize;
    match encode(&samples, &params) {
        Ok(stream) => emit(stream, total_frames as u64, &params, &events),
        Err(e) => {
            let _ = events.send(CodecEvent::Error(e));
        }
    }
}

fn encode(samples: &[i32], params: &MediaParameters) -> Result<Vec<u8>, RecordError> {
    let config = config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| RecordError::Codec(format!("flac config rejected: {e:?}")))?;
    let source = MemSource::from_samples(
        samples,
        params.num_channels as usize,
        BITS_PER_SAMPLE,
        params.sample_rate as usize,
    );
    let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| RecordError::Codec(format!("flac encoding failed: {e:?}")))?;
    let mut sink = ByteSink::new();
    stream
        .write(&mut sink)
        .map_err(|e| RecordError::Codec(format!("flac serialization failed: {e}")))?;
    Ok(sink.into_inner())
}

fn emit(
    bytes: Vec<u8>,
    total_frames: u64,
    params: &MediaParameters,
    events: &SyncSender<CodecEvent>,
) {
    let total = bytes.len();
    if total == 0 {
        let _ = events.send(CodecEvent::Output(EncodedUnit {
            bytes: Vec::new(),
            pts_us: 0,
            end_of_stream: true,
        }));
        return;
    }

    let rate = params.sample_rate.max(1) as u64;
    let mut offset = 0;
    while offset < total {
        let end = (offset + UNIT_SIZE).min(total);
        let last = end == total;
        // byte progress mapped onto the frame timeline; the final unit
        // carries the exact total duration
        let frames_done = if last {
            total_frames
        } else {
            total_frames * end as u64 / total as u64
        };
        let unit = EncodedUnit {
            bytes: bytes[offset..end].to_vec(),
            pts_us: frames_done * 1_000_000 / rate,
            end_of_stream: last,
        };
        if events.send(CodecEvent::Output(unit)).is_err() {
            return;
        }
        offset = end;
    }
}
