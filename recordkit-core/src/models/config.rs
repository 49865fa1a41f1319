use std::path::PathBuf;

use serde::{Deserialize, Deserializer};

use crate::models::error::RecordError;

/// Logical encoder id, matching the wire ids of the dispatch layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum EncoderId {
    #[serde(rename = "aacLc")]
    AacLc,
    #[serde(rename = "aacEld")]
    AacEld,
    #[serde(rename = "aacHe")]
    AacHe,
    #[serde(rename = "amrNb")]
    AmrNb,
    #[serde(rename = "amrWb")]
    AmrWb,
    #[serde(rename = "opus")]
    Opus,
    #[serde(rename = "flac")]
    Flac,
    #[serde(rename = "wav")]
    Wav,
    #[serde(rename = "pcm16bits")]
    Pcm16Bits,
}

/// When the session-wide maximum amplitude is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AmplitudeResetPolicy {
    /// Reset when the next session starts; the value stays readable after
    /// stop.
    #[default]
    OnStart,
    /// Cleared as part of stop teardown.
    OnStop,
}

/// Behavior when the platform takes audio focus away mid-session. Focus loss
/// always pauses; the policy only controls what happens when focus returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterruptionPolicy {
    /// The caller must resume explicitly.
    #[default]
    Pause,
    /// Auto-resume when focus is regained.
    PauseResume,
}

/// Platform side effects applied by the routing manager around a session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformConfig {
    /// Route through the telephony-grade Bluetooth link when available.
    pub manage_bluetooth: bool,
    /// Mute output streams while recording, restoring prior levels after.
    pub mute_audio: bool,
    pub interruption_policy: InterruptionPolicy,
    pub speakerphone: bool,
    /// Capture buffer size in frames, overriding the computed minimum.
    pub stream_buffer_size: Option<usize>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            manage_bluetooth: false,
            mute_audio: false,
            interruption_policy: InterruptionPolicy::default(),
            speakerphone: false,
            stream_buffer_size: None,
        }
    }
}

/// Selects a specific input device; absent means the system default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSelector {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Immutable per-session recording configuration.
///
/// Deserializes from the camelCase wire shape; `num_channels` is clamped to
/// the supported 1..=2 range on the way in. Values the selected format
/// cannot honor are snapped by the catalog, never rejected.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordConfig {
    /// Output path; `None` selects stream mode.
    pub path: Option<PathBuf>,
    pub encoder: EncoderId,
    pub bit_rate: u32,
    pub sample_rate: u32,
    #[serde(deserialize_with = "clamp_channels")]
    pub num_channels: u16,
    pub device: Option<DeviceSelector>,
    pub auto_gain: bool,
    pub echo_cancel: bool,
    pub noise_suppress: bool,
    #[serde(flatten)]
    pub platform: PlatformConfig,
    pub amplitude_reset: AmplitudeResetPolicy,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            path: None,
            encoder: EncoderId::AacLc,
            bit_rate: 128_000,
            sample_rate: 44_100,
            num_channels: 2,
            device: None,
            auto_gain: false,
            echo_cancel: false,
            noise_suppress: false,
            platform: PlatformConfig::default(),
            amplitude_reset: AmplitudeResetPolicy::default(),
        }
    }
}

impl RecordConfig {
    /// Channel count clamped to the supported range, for configs built in
    /// code rather than deserialized.
    pub fn channels(&self) -> u16 {
        self.num_channels.clamp(1, 2)
    }

    pub fn is_stream(&self) -> bool {
        self.path.is_none()
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        if self.sample_rate == 0 {
            return Err(RecordError::Config(
                "sample rate must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn clamp_channels<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = u16::deserialize(deserializer)?;
    Ok(raw.clamp(1, 2))
}
