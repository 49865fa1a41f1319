//! cpal-backed PCM capture source.
//!
//! `cpal::Stream` is not `Send`, so the stream lives on a dedicated capture
//! thread; the data callback writes into a shared ring buffer that the
//! session's pull path drains through [`CpalPcmSource::read`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use parking_lot::{Condvar, Mutex};

use recordkit_core::models::audio::MediaParameters;
use recordkit_core::models::config::RecordConfig;
use recordkit_core::models::error::RecordError;
use recordkit_core::processing::amplitude::{peak_db, SILENCE_DB};
use recordkit_core::processing::ring_buffer::RingBuffer;
use recordkit_core::source::{PcmSource, SourceBuilder};

const READ_TIMEOUT: Duration = Duration::from_millis(100);
const OPEN_TIMEOUT: Duration = Duration::from_secs(5);

struct SharedCapture {
    ring: Mutex<RingBuffer>,
    cond: Condvar,
    active: AtomicBool,
    shutdown: AtomicBool,
    error: Mutex<Option<RecordError>>,
}

impl SharedCapture {
    fn push(&self, samples: &[i16]) {
        if !self.active.load(Ordering::SeqCst) || self.shutdown.load(Ordering::SeqCst) {
            return;
        }
        self.ring.lock().write(samples);
        self.cond.notify_one();
    }

    fn fail(&self, error: RecordError) {
        *self.error.lock() = Some(error);
        self.cond.notify_all();
    }
}

pub struct CpalPcmSource {
    shared: Arc<SharedCapture>,
    handle: Option<thread::JoinHandle<()>>,
    buffer_bytes: usize,
    amplitude: f64,
}

impl CpalPcmSource {
    /// Open the device and spin up the capture thread. The stream is built
    /// and played before this returns, so failures surface here rather than
    /// mid-session.
    pub fn open(config: &RecordConfig, params: &MediaParameters) -> Result<Self, RecordError> {
        for (enabled, effect) in [
            (config.auto_gain, "automatic gain control"),
            (config.echo_cancel, "echo cancellation"),
            (config.noise_suppress, "noise suppression"),
        ] {
            if enabled {
                log::debug!("{effect} is not available on this backend; capturing without it");
            }
        }

        let channels = params.num_channels;
        let sample_rate = params.sample_rate;
        let frames = config
            .platform
            .stream_buffer_size
            .unwrap_or(((sample_rate / 10).max(1) as usize) * 2);
        let buffer_bytes = frames * channels as usize * 2;

        let shared = Arc::new(SharedCapture {
            // a second of headroom before the oldest samples are dropped
            ring: Mutex::new(RingBuffer::new(sample_rate as usize * channels as usize)),
            cond: Condvar::new(),
            active: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            error: Mutex::new(None),
        });

        let device_id = config.device.as_ref().map(|d| d.id.clone());
        let capture = Arc::clone(&shared);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), RecordError>>();

        let handle = thread::Builder::new()
            .name("cpal-capture".to_string())
            .spawn(move || {
                run_capture(capture, device_id, sample_rate, channels, ready_tx);
            })
            .map_err(|e| RecordError::Device(format!("failed to spawn capture thread: {e}")))?;

        match ready_rx.recv_timeout(OPEN_TIMEOUT) {
            Ok(Ok(())) => Ok(Self {
                shared,
                handle: Some(handle),
                buffer_bytes,
                amplitude: SILENCE_DB,
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                shared.shutdown.store(true, Ordering::SeqCst);
                Err(RecordError::Device(
                    "timed out waiting for the capture stream".to_string(),
                ))
            }
        }
    }
}

impl PcmSource for CpalPcmSource {
    fn start(&mut self) -> Result<(), RecordError> {
        self.shared.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn set_active(&mut self, active: bool) {
        self.shared.active.store(active, Ordering::SeqCst);
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, RecordError> {
        if let Some(error) = self.shared.error.lock().take() {
            return Err(error);
        }
        let want = buf.len() / 2;
        if want == 0 {
            return Ok(0);
        }

        let samples = {
            let mut ring = self.shared.ring.lock();
            if ring.is_empty() {
                self.shared.cond.wait_for(&mut ring, READ_TIMEOUT);
            }
            ring.read(want)
        };
        if samples.is_empty() {
            return Ok(0);
        }

        for (i, sample) in samples.iter().enumerate() {
            buf[i * 2..i * 2 + 2].copy_from_slice(&sample.to_le_bytes());
        }
        let written = samples.len() * 2;
        self.amplitude = peak_db(&buf[..written]);
        Ok(written)
    }

    fn buffer_size(&self) -> usize {
        self.buffer_bytes
    }

    fn amplitude_db(&self) -> f64 {
        self.amplitude
    }

    fn release(&mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.active.store(false, Ordering::SeqCst);
        self.shared.cond.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CpalPcmSource {
    fn drop(&mut self) {
        self.release();
    }
}

fn run_capture(
    shared: Arc<SharedCapture>,
    device_id: Option<String>,
    sample_rate: u32,
    channels: u16,
    ready: mpsc::Sender<Result<(), RecordError>>,
) {
    let stream = match build_stream(&shared, device_id, sample_rate, channels) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if let Err(e) = stream.play() {
        let _ = ready.send(Err(RecordError::Device(format!(
            "failed to start the capture stream: {e}"
        ))));
        return;
    }
    let _ = ready.send(Ok(()));

    // the stream delivers through its callbacks; this thread only keeps it
    // alive until release
    while !shared.shutdown.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(20));
    }
}

fn build_stream(
    shared: &Arc<SharedCapture>,
    device_id: Option<String>,
    sample_rate: u32,
    channels: u16,
) -> Result<cpal::Stream, RecordError> {
    let host = cpal::default_host();
    let device = match device_id {
        Some(id) => host
            .input_devices()
            .map_err(|e| RecordError::Device(format!("failed to enumerate input devices: {e}")))?
            .find(|d| d.name().map(|n| n == id).unwrap_or(false))
            .ok_or_else(|| RecordError::Device(format!("input device '{id}' not found")))?,
        None => host
            .default_input_device()
            .ok_or_else(|| RecordError::Device("no default input device".to_string()))?,
    };

    let sample_format = pick_sample_format(&device, sample_rate, channels)?;
    let stream_config = StreamConfig {
        channels,
        sample_rate: SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let on_error = {
        let shared = Arc::clone(shared);
        move |err: cpal::StreamError| {
            log::warn!("capture stream error: {err}");
            shared.fail(map_stream_error(&err));
        }
    };

    let stream = match sample_format {
        SampleFormat::I16 => {
            let shared = Arc::clone(shared);
            device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| shared.push(data),
                on_error,
                None,
            )
        }
        SampleFormat::F32 => {
            let shared = Arc::clone(shared);
            device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let converted: Vec<i16> = data.iter().map(|&s| f32_to_i16(s)).collect();
                    shared.push(&converted);
                },
                on_error,
                None,
            )
        }
        other => {
            return Err(RecordError::Device(format!(
                "unsupported device sample format {other}"
            )))
        }
    };
    stream.map_err(|e| RecordError::Device(format!("failed to open the capture stream: {e}")))
}

fn pick_sample_format(
    device: &cpal::Device,
    sample_rate: u32,
    channels: u16,
) -> Result<SampleFormat, RecordError> {
    let configs = device
        .supported_input_configs()
        .map_err(|e| RecordError::Device(format!("failed to query device configs: {e}")))?;

    let mut fallback = None;
    for range in configs {
        if range.channels() != channels
            || range.min_sample_rate().0 > sample_rate
            || range.max_sample_rate().0 < sample_rate
        {
            continue;
        }
        match range.sample_format() {
            // native i16 avoids a conversion in the callback
            SampleFormat::I16 => return Ok(SampleFormat::I16),
            SampleFormat::F32 => fallback = Some(SampleFormat::F32),
            _ => {}
        }
    }
    fallback.ok_or_else(|| {
        RecordError::Device(format!(
            "device does not support {sample_rate} Hz with {channels} channel(s)"
        ))
    })
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

fn map_stream_error(error: &cpal::StreamError) -> RecordError {
    match error {
        cpal::StreamError::DeviceNotAvailable => RecordError::Read {
            code: -32,
            message: "input device is no longer available".to_string(),
        },
        cpal::StreamError::BackendSpecific { err } => RecordError::Read {
            code: -1,
            message: err.to_string(),
        },
    }
}

/// Builds [`CpalPcmSource`] instances for the session orchestrator.
pub struct CpalSourceBuilder;

impl SourceBuilder for CpalSourceBuilder {
    fn open(
        &self,
        config: &RecordConfig,
        params: &MediaParameters,
    ) -> Result<Box<dyn PcmSource>, RecordError> {
        Ok(Box::new(CpalPcmSource::open(config, params)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_to_i16_clamps_and_scales() {
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(1.0), 32767);
        assert_eq!(f32_to_i16(-1.0), -32767);
        assert_eq!(f32_to_i16(2.0), 32767);
        assert_eq!(f32_to_i16(-2.0), -32767);
        assert_eq!(f32_to_i16(0.5), 16383);
    }

    #[test]
    fn test_stream_error_mapping() {
        let err = map_stream_error(&cpal::StreamError::DeviceNotAvailable);
        assert!(matches!(err, RecordError::Read { code: -32, .. }));
    }
}
