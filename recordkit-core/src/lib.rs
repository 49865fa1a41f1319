//! # recordkit-core
//!
//! Platform-agnostic audio recording pipeline.
//!
//! Provides the format catalog, codecs, container writers, amplitude
//! metering, and session orchestration. Platform backends implement the
//! `PcmSource`/`SourceBuilder` traits for capture and `AudioPolicyBackend`
//! for routing side effects, and plug into the generic `Recorder`.
//!
//! ## Architecture
//!
//! ```text
//! recordkit-core (this crate)
//! ├── models/       ← RecordError, RecordState, RecordConfig, MediaParameters, etc.
//! ├── format/       ← catalog mapping encoder ids to parameters + containers
//! ├── codec/        ← AudioCodec trait, registry, FLAC codec
//! ├── container/    ← WAV, FLAC, ADTS, AMR, Ogg/Opus, raw writers
//! ├── encoder/      ← passthrough and transcoding pipeline drivers
//! ├── processing/   ← RingBuffer, peak amplitude metering
//! ├── routing/      ← RoutingManager, AudioPolicyBackend seam
//! ├── session/      ← Recorder (public orchestrator)
//! ├── source/       ← PcmSource / SourceBuilder capture seam
//! └── sink/         ← state, error, and stream-chunk delivery
//! ```

pub mod codec;
pub mod container;
pub mod encoder;
pub mod format;
pub mod models;
pub mod processing;
pub mod routing;
pub mod session;
pub mod sink;
pub mod source;

// Re-export key types at crate root for convenience.
pub use codec::registry::{CodecCapabilities, CodecRegistry};
pub use codec::{AudioCodec, CodecEvent};
pub use container::ContainerWriter;
pub use format::is_encoder_supported;
pub use models::audio::{
    AacProfile, Amplitude, AudioFrame, EncodedUnit, InputDevice, MediaParameters, StreamType,
};
pub use models::config::{
    AmplitudeResetPolicy, DeviceSelector, EncoderId, InterruptionPolicy, PlatformConfig,
    RecordConfig,
};
pub use models::error::RecordError;
pub use models::state::RecordState;
pub use processing::ring_buffer::RingBuffer;
pub use routing::manager::RoutingManager;
pub use routing::{AudioPolicyBackend, FocusChange, NullAudioPolicy, SessionControl};
pub use session::recorder::Recorder;
pub use sink::{ChunkSink, NullSink, StateSink};
pub use source::{PcmSource, SourceBuilder};
