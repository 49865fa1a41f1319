//! Public recording session orchestrator.

use std::path::PathBuf;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::codec::registry::CodecRegistry;
use crate::format;
use crate::models::audio::Amplitude;
use crate::models::config::{AmplitudeResetPolicy, RecordConfig};
use crate::models::error::RecordError;
use crate::models::state::RecordState;
use crate::processing::amplitude::SILENCE_DB;
use crate::routing::manager::RoutingManager;
use crate::routing::SessionControl;
use crate::session::worker::{PipelinePlan, RecordWorker, WorkerListener, WorkerShared};
use crate::sink::{ChunkSink, StateSink};
use crate::source::SourceBuilder;

struct RecorderInner {
    worker: Option<RecordWorker>,
    last_path: Option<PathBuf>,
}

struct RecorderShared {
    id: Uuid,
    routing: Arc<RoutingManager>,
    state_sink: Arc<dyn StateSink>,
    chunk_sink: Arc<dyn ChunkSink>,
    max_amplitude: Mutex<f64>,
    amplitude_reset: Mutex<AmplitudeResetPolicy>,
}

/// One recording session: Stopped → Recording ⇄ Paused, back to Stopped on
/// stop, cancel, or failure.
///
/// `start` resolves the configuration, builds the container, and opens the
/// device synchronously — a failed start acquires nothing. The pipeline
/// itself runs on worker threads; `stop` blocks until it has drained,
/// flushed, and finalized, and returns the artifact path.
pub struct Recorder {
    source_builder: Arc<dyn SourceBuilder>,
    registry: Arc<CodecRegistry>,
    shared: Arc<RecorderShared>,
    inner: Mutex<RecorderInner>,
    // serializes overlapping starts; held from config resolution through
    // worker installation
    start_lock: Mutex<()>,
}

impl Recorder {
    pub fn new(
        source_builder: Arc<dyn SourceBuilder>,
        registry: Arc<CodecRegistry>,
        routing: Arc<RoutingManager>,
        state_sink: Arc<dyn StateSink>,
        chunk_sink: Arc<dyn ChunkSink>,
    ) -> Self {
        Self {
            source_builder,
            registry,
            shared: Arc::new(RecorderShared {
                id: Uuid::new_v4(),
                routing,
                state_sink,
                chunk_sink,
                max_amplitude: Mutex::new(SILENCE_DB),
                amplitude_reset: Mutex::new(AmplitudeResetPolicy::default()),
            }),
            inner: Mutex::new(RecorderInner {
                worker: None,
                last_path: None,
            }),
            start_lock: Mutex::new(()),
        }
    }

    /// Begin recording into `config.path`.
    pub fn start(&self, config: RecordConfig) -> Result<(), RecordError> {
        if config.path.is_none() {
            return Err(RecordError::Config(
                "an output path is required; use start_stream for stream mode".to_string(),
            ));
        }
        self.start_session(config)
    }

    /// Begin recording in stream mode, delivering encoded chunks to the
    /// chunk sink.
    pub fn start_stream(&self, mut config: RecordConfig) -> Result<(), RecordError> {
        config.path = None;
        self.start_session(config)
    }

    fn start_session(&self, config: RecordConfig) -> Result<(), RecordError> {
        let _start = self.start_lock.lock();
        config.validate()?;

        // a start observed while a prior pipeline runs stops it first
        self.stop();

        let spec = format::for_encoder(config.encoder);
        let mut params = spec.media_parameters(&config)?;

        let plan = if spec.passthrough() {
            let container = spec.container(&params, config.path.as_deref())?;
            PipelinePlan::Passthrough {
                params: params.clone(),
                container,
            }
        } else {
            // resolve before building the container so it sees adjusted
            // parameters; failure here acquires nothing
            let codec = self.registry.resolve(&mut params)?;
            let container = spec.container(&params, config.path.as_deref())?;
            PipelinePlan::Transcode { codec, container }
        };

        let source = match self.source_builder.open(&config, &params) {
            Ok(source) => source,
            Err(e) => {
                self.remove_partial_artifact(&config);
                return Err(e);
            }
        };

        if config.amplitude_reset == AmplitudeResetPolicy::OnStart {
            *self.shared.max_amplitude.lock() = SILENCE_DB;
        }
        *self.shared.amplitude_reset.lock() = config.amplitude_reset;

        let listener = Arc::clone(&self.shared) as Arc<dyn WorkerListener>;
        let mut worker = RecordWorker::new(source, plan, config.path.clone(), listener);

        // registration precedes launch; a pipeline that fails immediately
        // must find its arena entry when its teardown reports on_stop
        let control: Weak<dyn SessionControl> =
            Arc::downgrade(worker.shared()) as Weak<dyn SessionControl>;
        self.shared
            .routing
            .on_session_start(self.shared.id, &config, control);

        if let Err(e) = worker.launch() {
            self.shared.routing.on_session_stop(self.shared.id);
            self.remove_partial_artifact(&config);
            return Err(e);
        }

        let mut inner = self.inner.lock();
        inner.last_path = config.path;
        inner.worker = Some(worker);
        Ok(())
    }

    fn remove_partial_artifact(&self, config: &RecordConfig) {
        // the container already created the output file
        if let Some(path) = &config.path {
            let _ = std::fs::remove_file(path);
        }
    }

    /// Stop the active session, blocking until drain + flush + finalize
    /// complete. Returns the artifact path (None in stream mode), and on an
    /// already-stopped recorder returns the previous path again.
    pub fn stop(&self) -> Option<PathBuf> {
        let worker = { self.inner.lock().worker.take() };
        if let Some(mut worker) = worker {
            let shared = Arc::clone(worker.shared());
            shared.stop();
            shared.wait_stopped();
            worker.join();
        }
        self.inner.lock().last_path.clone()
    }

    /// Stop and delete the artifact. Waits for finalize before deleting; on
    /// an idle recorder removes the previous artifact, if any.
    pub fn cancel(&self) {
        let worker = { self.inner.lock().worker.take() };
        match worker {
            Some(mut worker) => {
                let shared = Arc::clone(worker.shared());
                shared.cancel();
                shared.wait_stopped();
                worker.join();
                self.inner.lock().last_path = None;
            }
            None => {
                let previous = { self.inner.lock().last_path.take() };
                if let Some(path) = previous {
                    let _ = std::fs::remove_file(path);
                }
            }
        }
    }

    /// Pause capture. Frames arriving while paused are dropped. No-op
    /// unless Recording.
    pub fn pause(&self) {
        if let Some(shared) = self.worker_shared() {
            shared.pause();
        }
    }

    /// Resume capture. No-op unless Paused.
    pub fn resume(&self) {
        if let Some(shared) = self.worker_shared() {
            shared.resume();
        }
    }

    pub fn is_recording(&self) -> bool {
        self.worker_shared().is_some_and(|s| s.is_recording())
    }

    pub fn is_paused(&self) -> bool {
        self.worker_shared().is_some_and(|s| s.is_paused())
    }

    /// Amplitude of the most recent chunk plus the session maximum, valid
    /// in any state. `current` is the silence floor unless Recording.
    pub fn amplitude(&self) -> Amplitude {
        let current = self
            .worker_shared()
            .map_or(SILENCE_DB, |s| s.amplitude_db());
        let mut max = self.shared.max_amplitude.lock();
        if current > *max {
            *max = current;
        }
        Amplitude {
            current,
            max: *max,
        }
    }

    /// Stop and release everything this session holds.
    pub fn dispose(&self) {
        self.stop();
    }

    fn worker_shared(&self) -> Option<Arc<WorkerShared>> {
        self.inner
            .lock()
            .worker
            .as_ref()
            .map(|w| Arc::clone(w.shared()))
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl WorkerListener for RecorderShared {
    fn on_record(&self) {
        self.state_sink.on_state(RecordState::Recording);
    }

    fn on_pause(&self) {
        self.routing.on_session_pause(self.id);
        self.state_sink.on_state(RecordState::Paused);
    }

    fn on_resume(&self) {
        self.routing.on_session_resume(self.id);
        self.state_sink.on_state(RecordState::Recording);
    }

    fn on_stop(&self) {
        self.routing.on_session_stop(self.id);
        if *self.amplitude_reset.lock() == AmplitudeResetPolicy::OnStop {
            *self.max_amplitude.lock() = SILENCE_DB;
        }
        self.state_sink.on_state(RecordState::Stopped);
    }

    fn on_failure(&self, error: RecordError) {
        log::error!("recording session {} failed: {error}", self.id);
        self.state_sink.on_error(&error);
    }

    fn on_chunk(&self, chunk: Vec<u8>) {
        self.chunk_sink.on_chunk(chunk);
    }
}
