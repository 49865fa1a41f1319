use serde::Serialize;

/// Identifier of the encoded stream a container carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    Aac,
    AmrNb,
    AmrWb,
    Opus,
    Flac,
    RawPcm,
}

impl StreamType {
    /// Canonical mime-type string, used in diagnostics and capability lookup.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aac => "audio/mp4a-latm",
            Self::AmrNb => "audio/3gpp",
            Self::AmrWb => "audio/amr-wb",
            Self::Opus => "audio/opus",
            Self::Flac => "audio/flac",
            Self::RawPcm => "audio/raw",
        }
    }
}

/// AAC profile, as an MPEG-4 audio object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AacProfile {
    Lc,
    He,
    Eld,
}

impl AacProfile {
    pub fn object_type(self) -> u8 {
        match self {
            Self::Lc => 2,
            Self::He => 5,
            Self::Eld => 39,
        }
    }
}

/// Concrete media parameters after catalog and codec adjustment.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaParameters {
    pub stream_type: StreamType,
    pub sample_rate: u32,
    pub bit_rate: u32,
    pub num_channels: u16,
    /// Bytes per PCM frame (channels × 2 for 16-bit samples).
    pub frame_size: usize,
    pub aac_profile: Option<AacProfile>,
}

/// A chunk of raw 16-bit little-endian PCM, owned until consumed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioFrame {
    pub bytes: Vec<u8>,
}

/// Encoded bytes plus timing, owned by the encoder until written.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedUnit {
    pub bytes: Vec<u8>,
    /// Presentation timestamp in microseconds.
    pub pts_us: u64,
    pub end_of_stream: bool,
}

/// Amplitude reading in dBFS. `current` covers the most recent chunk;
/// `max` is the session-wide monotonic peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Amplitude {
    pub current: f64,
    pub max: f64,
}

/// An input device available for capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDevice {
    pub id: String,
    pub label: String,
    pub is_default: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_type_strings() {
        assert_eq!(StreamType::Aac.as_str(), "audio/mp4a-latm");
        assert_eq!(StreamType::AmrWb.as_str(), "audio/amr-wb");
        assert_eq!(StreamType::RawPcm.as_str(), "audio/raw");
    }

    #[test]
    fn test_aac_object_types() {
        assert_eq!(AacProfile::Lc.object_type(), 2);
        assert_eq!(AacProfile::He.object_type(), 5);
        assert_eq!(AacProfile::Eld.object_type(), 39);
    }

    #[test]
    fn test_input_device_wire_shape() {
        let device = InputDevice {
            id: "mic-1".to_string(),
            label: "Built-in Microphone".to_string(),
            is_default: true,
        };
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["id"], "mic-1");
        assert_eq!(json["isDefault"], true);
    }
}
