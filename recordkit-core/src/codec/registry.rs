//! Codec discovery and format adjustment.

use std::ops::RangeInclusive;

use crate::codec::AudioCodec;
use crate::format::nearest_value;
use crate::models::audio::{MediaParameters, StreamType};
use crate::models::error::RecordError;

/// Advertised capabilities of a registered codec.
#[derive(Debug, Clone)]
pub struct CodecCapabilities {
    pub stream_type: StreamType,
    /// Discrete advertised sample rates; `None` accepts any rate.
    pub sample_rates: Option<Vec<u32>>,
    pub bit_rate_range: RangeInclusive<u32>,
    pub max_channels: u16,
}

type CodecFactory = Box<dyn Fn(&MediaParameters) -> Box<dyn AudioCodec> + Send + Sync>;

struct CodecEntry {
    capabilities: CodecCapabilities,
    factory: CodecFactory,
}

/// Registry of available codecs.
///
/// Resolution asks for a codec advertising the requested stream type and
/// adjusts the media parameters into its capabilities: bit rate clamped to
/// the advertised range, sample rate snapped to the nearest advertised
/// value, channels capped. Candidates are tried in registration order.
#[derive(Default)]
pub struct CodecRegistry {
    entries: Vec<CodecEntry>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in codecs.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(super::flac::FlacCodec::capabilities(), |params| {
            Box::new(super::flac::FlacCodec::new(params))
        });
        registry
    }

    pub fn register<F>(&mut self, capabilities: CodecCapabilities, factory: F)
    where
        F: Fn(&MediaParameters) -> Box<dyn AudioCodec> + Send + Sync + 'static,
    {
        self.entries.push(CodecEntry {
            capabilities,
            factory: Box::new(factory),
        });
    }

    /// Whether any registered codec advertises `stream_type`.
    pub fn supports(&self, stream_type: StreamType) -> bool {
        self.entries
            .iter()
            .any(|e| e.capabilities.stream_type == stream_type)
    }

    /// Adjust `params` into a matching codec's capabilities and build it.
    pub fn resolve(
        &self,
        params: &mut MediaParameters,
    ) -> Result<Box<dyn AudioCodec>, RecordError> {
        for entry in &self.entries {
            let caps = &entry.capabilities;
            if caps.stream_type != params.stream_type {
                continue;
            }

            let mut adjusted = params.clone();
            adjusted.bit_rate = adjusted
                .bit_rate
                .clamp(*caps.bit_rate_range.start(), *caps.bit_rate_range.end());
            if let Some(rates) = &caps.sample_rates {
                adjusted.sample_rate = nearest_value(rates, adjusted.sample_rate);
            }
            adjusted.num_channels = adjusted.num_channels.clamp(1, caps.max_channels);
            adjusted.frame_size = adjusted.num_channels as usize * 2;

            if adjusted != *params {
                log::debug!(
                    "adjusted format for {}: {} Hz / {} bps / {} ch",
                    caps.stream_type.as_str(),
                    adjusted.sample_rate,
                    adjusted.bit_rate,
                    adjusted.num_channels
                );
            }
            *params = adjusted;
            return Ok((entry.factory)(params));
        }

        Err(RecordError::UnsupportedFormat(format!(
            "no codec available for {}",
            params.stream_type.as_str()
        )))
    }
}
