//! Per-session worker: owns the source and encoder for one recording.
//!
//! The worker thread starts the pipeline; the encoder's own threads then
//! carry it. Shared state between the worker, the encoder threads, and the
//! callers lives in `WorkerShared`, which implements the encoder's sink
//! (pull path, failure funnel, teardown) and the routing manager's control
//! handle (pause/resume on focus changes).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::codec::AudioCodec;
use crate::container::ContainerWriter;
use crate::encoder::{Encoder, EncoderSink, PassthroughEncoder, TranscodeEncoder};
use crate::models::audio::MediaParameters;
use crate::models::error::RecordError;
use crate::processing::amplitude::SILENCE_DB;
use crate::routing::SessionControl;
use crate::session::gate::{Completion, PauseGate};
use crate::source::PcmSource;

/// Session-side listener for worker outcomes.
pub(crate) trait WorkerListener: Send + Sync {
    fn on_record(&self);
    fn on_pause(&self);
    fn on_resume(&self);
    fn on_stop(&self);
    fn on_failure(&self, error: RecordError);
    fn on_chunk(&self, chunk: Vec<u8>);
}

/// What the worker will run: raw passthrough or codec transcoding.
pub(crate) enum PipelinePlan {
    Passthrough {
        params: MediaParameters,
        container: Box<dyn ContainerWriter>,
    },
    Transcode {
        codec: Box<dyn AudioCodec>,
        container: Box<dyn ContainerWriter>,
    },
}

pub(crate) struct WorkerShared {
    is_recording: AtomicBool,
    is_paused: AtomicBool,
    canceled: AtomicBool,
    gate: PauseGate,
    completion: Completion,
    source: Mutex<Option<Box<dyn PcmSource>>>,
    encoder: Mutex<Option<Box<dyn Encoder>>>,
    listener: Arc<dyn WorkerListener>,
    output_path: Option<PathBuf>,
    read_size: usize,
}

pub(crate) struct RecordWorker {
    shared: Arc<WorkerShared>,
    handle: Option<thread::JoinHandle<()>>,
}

impl RecordWorker {
    /// Build the shared state and encoder without launching the pipeline,
    /// so the control handle can be registered before anything runs.
    pub fn new(
        source: Box<dyn PcmSource>,
        plan: PipelinePlan,
        output_path: Option<PathBuf>,
        listener: Arc<dyn WorkerListener>,
    ) -> Self {
        let read_size = source.buffer_size().max(2);
        let shared = Arc::new(WorkerShared {
            is_recording: AtomicBool::new(false),
            is_paused: AtomicBool::new(false),
            canceled: AtomicBool::new(false),
            gate: PauseGate::default(),
            completion: Completion::default(),
            source: Mutex::new(Some(source)),
            encoder: Mutex::new(None),
            listener,
            output_path,
            read_size,
        });

        let sink: Arc<dyn EncoderSink> = Arc::clone(&shared) as Arc<dyn EncoderSink>;
        let encoder: Box<dyn Encoder> = match plan {
            PipelinePlan::Passthrough { params, container } => {
                Box::new(PassthroughEncoder::new(params, container, sink))
            }
            PipelinePlan::Transcode { codec, container } => {
                Box::new(TranscodeEncoder::new(codec, container, sink))
            }
        };
        *shared.encoder.lock() = Some(encoder);

        Self {
            shared,
            handle: None,
        }
    }

    pub fn launch(&mut self) -> Result<(), RecordError> {
        let runner = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("record-worker".to_string())
            .spawn(move || runner.run())
            .map_err(|e| RecordError::Device(format!("failed to spawn record worker: {e}")))?;
        self.handle = Some(handle);
        Ok(())
    }

    pub fn shared(&self) -> &Arc<WorkerShared> {
        &self.shared
    }

    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl WorkerShared {
    fn run(&self) {
        match self.start_pipeline() {
            Ok(true) => {}
            // stop raced the launch; tear down quietly
            Ok(false) => self.finish(),
            Err(e) => {
                self.listener.on_failure(e);
                if let Some(mut encoder) = self.encoder.lock().take() {
                    encoder.release();
                }
                self.finish();
            }
        }
    }

    fn start_pipeline(&self) -> Result<bool, RecordError> {
        if self.gate.is_stopping() {
            return Ok(false);
        }
        match self.source.lock().as_mut() {
            Some(source) => source.start()?,
            None => return Ok(false),
        }
        let mut encoder_slot = self.encoder.lock();
        let Some(encoder) = encoder_slot.as_mut() else {
            return Ok(false);
        };
        encoder.start()?;
        // the event precedes the flag, so a caller that observes
        // is_recording cannot get Paused delivered ahead of Recording
        self.listener.on_record();
        self.is_recording.store(true, Ordering::SeqCst);
        Ok(true)
    }

    /// Terminal teardown, reached exactly once per session: after the
    /// encoder reports `on_stop`, or directly when the pipeline never ran.
    fn finish(&self) {
        if let Some(mut source) = self.source.lock().take() {
            source.release();
        }
        if self.canceled.load(Ordering::SeqCst) {
            self.delete_artifact();
        }
        self.is_recording.store(false, Ordering::SeqCst);
        self.is_paused.store(false, Ordering::SeqCst);
        self.listener.on_stop();
        self.completion.complete();
    }

    fn delete_artifact(&self) {
        if let Some(path) = &self.output_path {
            if let Err(e) = std::fs::remove_file(path) {
                if path.exists() {
                    log::warn!(
                        "failed to delete canceled recording {}: {e}",
                        path.display()
                    );
                }
            }
        }
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused.load(Ordering::SeqCst)
    }

    pub fn amplitude_db(&self) -> f64 {
        if !self.is_recording() || self.is_paused() {
            return SILENCE_DB;
        }
        self.source
            .lock()
            .as_ref()
            .map_or(SILENCE_DB, |s| s.amplitude_db())
    }

    pub fn pause(&self) {
        if !self.is_recording() || self.is_paused() {
            return;
        }
        if let Some(source) = self.source.lock().as_mut() {
            source.set_active(false);
        }
        self.is_paused.store(true, Ordering::SeqCst);
        self.gate.pause();
        self.listener.on_pause();
    }

    pub fn resume(&self) {
        if !self.is_recording() || !self.is_paused() {
            return;
        }
        if let Some(source) = self.source.lock().as_mut() {
            source.set_active(true);
        }
        self.is_paused.store(false, Ordering::SeqCst);
        self.gate.resume();
        self.listener.on_resume();
    }

    /// Signal end-of-stream and drive the encoder teardown, blocking until
    /// its threads have drained and finalized.
    pub fn stop(&self) {
        self.gate.open_for_stop();
        let encoder = self.encoder.lock().take();
        if let Some(mut encoder) = encoder {
            encoder.stop();
            encoder.release();
        }
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
        self.stop();
    }

    pub fn wait_stopped(&self) {
        self.completion.wait();
    }
}

impl EncoderSink for WorkerShared {
    fn read_size(&self) -> usize {
        self.read_size
    }

    fn pull(&self, buf: &mut [u8]) -> Result<usize, RecordError> {
        if !self.gate.wait_while_paused() {
            return Ok(0);
        }
        match self.source.lock().as_mut() {
            Some(source) => source.read(buf),
            None => Ok(0),
        }
    }

    fn on_chunk(&self, chunk: Vec<u8>) {
        self.listener.on_chunk(chunk);
    }

    fn on_failure(&self, error: RecordError) {
        self.listener.on_failure(error);
    }

    fn on_stop(&self) {
        self.finish();
    }
}

impl SessionControl for WorkerShared {
    fn pause(&self) {
        WorkerShared::pause(self);
    }

    fn resume(&self) {
        WorkerShared::resume(self);
    }
}
