//! Transcoding encoder: dispatches codec events into a container.
//!
//! A dispatch thread consumes the codec's bounded event channel. The first
//! (and only) `FormatReady` lazily adds the track and starts the container;
//! `InputNeeded` pulls PCM from the sink, answering with an empty
//! end-of-stream frame once stop is requested; `Output` units land in the
//! container or the stream sink, and the unit flagged end-of-stream ends
//! dispatch. Failures report once and tear the pipeline down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::codec::{AudioCodec, CodecEvent, EVENT_CHANNEL_DEPTH};
use crate::container::ContainerWriter;
use crate::encoder::{Encoder, EncoderSink};
use crate::models::audio::AudioFrame;
use crate::models::error::RecordError;

pub struct TranscodeEncoder {
    codec: Arc<Mutex<Box<dyn AudioCodec>>>,
    container: Option<Box<dyn ContainerWriter>>,
    sink: Arc<dyn EncoderSink>,
    stop_requested: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
    started: bool,
}

impl TranscodeEncoder {
    pub fn new(
        codec: Box<dyn AudioCodec>,
        container: Box<dyn ContainerWriter>,
        sink: Arc<dyn EncoderSink>,
    ) -> Self {
        Self {
            codec: Arc::new(Mutex::new(codec)),
            container: Some(container),
            sink,
            stop_requested: Arc::new(AtomicBool::new(false)),
            handle: None,
            started: false,
        }
    }
}

impl Encoder for TranscodeEncoder {
    fn start(&mut self) -> Result<(), RecordError> {
        if self.started {
            return Err(RecordError::Codec("encoder already started".to_string()));
        }
        let container = self
            .container
            .take()
            .ok_or_else(|| RecordError::Codec("encoder already released".to_string()))?;
        self.started = true;

        let (events_tx, events_rx) = sync_channel(EVENT_CHANNEL_DEPTH);
        self.codec.lock().start(events_tx)?;

        let codec = Arc::clone(&self.codec);
        let sink = Arc::clone(&self.sink);
        let stop = Arc::clone(&self.stop_requested);
        let handle = thread::Builder::new()
            .name("codec-dispatch".to_string())
            .spawn(move || dispatch(events_rx, codec, container, sink, stop))
            .map_err(|e| RecordError::Codec(format!("failed to spawn dispatch thread: {e}")))?;
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
        self.codec.lock().release();
        if let Some(mut container) = self.container.take() {
            container.release();
        }
    }
}

fn dispatch(
    events: Receiver<CodecEvent>,
    codec: Arc<Mutex<Box<dyn AudioCodec>>>,
    mut container: Box<dyn ContainerWriter>,
    sink: Arc<dyn EncoderSink>,
    stop: Arc<AtomicBool>,
) {
    let mut track: Option<usize> = None;
    let mut failed = false;
    let mut eos_supplied = false;

    while let Ok(event) = events.recv() {
        match event {
            CodecEvent::FormatReady(params) => {
                let started = container
                    .add_track(&params)
                    .and_then(|t| container.start().map(|_| t));
                match started {
                    Ok(t) => track = Some(t),
                    Err(e) => {
                        sink.on_failure(e);
                        failed = true;
                        break;
                    }
                }
            }
            CodecEvent::InputNeeded { capacity } => {
                let mut buf = vec![0u8; capacity.max(sink.read_size()).max(2)];
                let read = if stop.load(Ordering::SeqCst) || eos_supplied {
                    0
                } else {
                    match sink.pull(&mut buf) {
                        Ok(n) => n,
                        Err(e) => {
                            sink.on_failure(e);
                            failed = true;
                            break;
                        }
                    }
                };
                buf.truncate(read);
                let end_of_stream = stop.load(Ordering::SeqCst);
                eos_supplied |= end_of_stream;
                if let Err(e) = codec.lock().supply(AudioFrame { bytes: buf }, end_of_stream) {
                    sink.on_failure(e);
                    failed = true;
                    break;
                }
            }
            CodecEvent::Output(unit) => {
                let end_of_stream = unit.end_of_stream;
                let written = match track {
                    Some(t) => {
                        if container.is_stream() {
                            container.write_stream(t, &unit).map(|chunk| {
                                if !chunk.is_empty() {
                                    sink.on_chunk(chunk);
                                }
                            })
                        } else {
                            container.write_sample(t, &unit)
                        }
                    }
                    None => Err(RecordError::Codec(
                        "codec produced output before its format".to_string(),
                    )),
                };
                if let Err(e) = written {
                    sink.on_failure(e);
                    failed = true;
                    break;
                }
                if end_of_stream {
                    break;
                }
            }
            CodecEvent::Error(e) => {
                sink.on_failure(e);
                failed = true;
                break;
            }
        }
    }

    // disconnect first so a codec blocked mid-send can exit and be joined
    drop(events);
    if failed {
        codec.lock().stop();
    }
    codec.lock().release();
    if let Err(e) = container.stop() {
        if !failed {
            log::warn!("container finalize failed: {e}");
        }
    }
    sink.on_stop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::RawContainer;
    use crate::encoder::test_support::ScriptedSink;
    use crate::models::audio::{EncodedUnit, MediaParameters, StreamType};
    use std::sync::mpsc::SyncSender;

    fn params() -> MediaParameters {
        MediaParameters {
            stream_type: StreamType::RawPcm,
            sample_rate: 16_000,
            bit_rate: 0,
            num_channels: 1,
            frame_size: 2,
            aac_profile: None,
        }
    }

    /// Codec that echoes supplied PCM back as output units.
    struct EchoCodec {
        params: MediaParameters,
        input: Arc<Mutex<Option<SyncSender<(AudioFrame, bool)>>>>,
        handle: Option<thread::JoinHandle<()>>,
    }

    impl EchoCodec {
        fn new(params: MediaParameters) -> Self {
            Self {
                params,
                input: Arc::new(Mutex::new(None)),
                handle: None,
            }
        }
    }

    impl AudioCodec for EchoCodec {
        fn start(&mut self, events: SyncSender<CodecEvent>) -> Result<(), RecordError> {
            let (input_tx, input_rx) = sync_channel::<(AudioFrame, bool)>(4);
            *self.input.lock() = Some(input_tx);
            let params = self.params.clone();
            let handle = thread::spawn(move || {
                if events.send(CodecEvent::FormatReady(params)).is_err() {
                    return;
                }
                let mut pts = 0u64;
                loop {
                    if events
                        .send(CodecEvent::InputNeeded { capacity: 64 })
                        .is_err()
                    {
                        return;
                    }
                    let Ok((frame, eos)) = input_rx.recv() else {
                        return;
                    };
                    let unit = EncodedUnit {
                        bytes: frame.bytes,
                        pts_us: pts,
                        end_of_stream: eos,
                    };
                    pts += 1_000;
                    if events.send(CodecEvent::Output(unit)).is_err() {
                        return;
                    }
                    if eos {
                        return;
                    }
                }
            });
            self.handle = Some(handle);
            Ok(())
        }

        fn supply(&mut self, frame: AudioFrame, eos: bool) -> Result<(), RecordError> {
            if let Some(tx) = self.input.lock().as_ref() {
                let _ = tx.send((frame, eos));
            }
            Ok(())
        }

        fn stop(&mut self) {
            *self.input.lock() = None;
        }

        fn release(&mut self) {
            self.stop();
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
    }

    /// Codec that reports its format and then fails.
    struct FailingCodec {
        params: MediaParameters,
        handle: Option<thread::JoinHandle<()>>,
    }

    impl AudioCodec for FailingCodec {
        fn start(&mut self, events: SyncSender<CodecEvent>) -> Result<(), RecordError> {
            let params = self.params.clone();
            self.handle = Some(thread::spawn(move || {
                let _ = events.send(CodecEvent::FormatReady(params));
                let _ = events.send(CodecEvent::Error(RecordError::Codec(
                    "simulated mid-stream failure".to_string(),
                )));
            }));
            Ok(())
        }
        fn supply(&mut self, _frame: AudioFrame, _eos: bool) -> Result<(), RecordError> {
            Ok(())
        }
        fn stop(&mut self) {}
        fn release(&mut self) {
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
    }

    #[test]
    fn test_echo_pipeline_streams_until_stop() {
        let sink = Arc::new(ScriptedSink::new(vec![0x42; 32], 4));
        let container = Box::new(RawContainer::new(None).unwrap());
        let codec = Box::new(EchoCodec::new(params()));
        let mut encoder =
            TranscodeEncoder::new(codec, container, Arc::clone(&sink) as Arc<dyn EncoderSink>);
        encoder.start().unwrap();

        while !sink.served_out() {
            thread::sleep(std::time::Duration::from_millis(1));
        }
        encoder.stop();
        encoder.release();

        let chunks = sink.chunks.lock();
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c == &vec![0x42; 32]));
        assert!(sink.stopped.load(Ordering::SeqCst));
        assert!(sink.failures.lock().is_empty());
    }

    #[test]
    fn test_codec_error_reports_once_and_stops() {
        let sink = Arc::new(ScriptedSink::new(vec![0; 4], 0));
        let container = Box::new(RawContainer::new(None).unwrap());
        let codec = Box::new(FailingCodec {
            params: params(),
            handle: None,
        });
        let mut encoder =
            TranscodeEncoder::new(codec, container, Arc::clone(&sink) as Arc<dyn EncoderSink>);
        encoder.start().unwrap();

        while !sink.stopped.load(Ordering::SeqCst) {
            thread::sleep(std::time::Duration::from_millis(1));
        }
        encoder.release();

        let failures = sink.failures.lock();
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], RecordError::Codec(_)));
    }

    #[test]
    fn test_stop_without_start_is_safe() {
        let sink = Arc::new(ScriptedSink::new(vec![0; 4], 0));
        let container = Box::new(RawContainer::new(None).unwrap());
        let codec = Box::new(EchoCodec::new(params()));
        let mut encoder = TranscodeEncoder::new(codec, container, sink);
        encoder.stop();
        encoder.release();
    }
}
