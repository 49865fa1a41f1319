use std::path::Path;

use crate::container::{AdtsContainer, ContainerWriter};
use crate::format::FormatSpec;
use crate::models::audio::{AacProfile, MediaParameters, StreamType};
use crate::models::config::{EncoderId, RecordConfig};
use crate::models::error::RecordError;

/// AAC in ADTS framing, covering the LC, HE, and ELD profiles.
pub(super) struct AacFormat;

impl FormatSpec for AacFormat {
    fn stream_type(&self) -> StreamType {
        StreamType::Aac
    }

    fn media_parameters(&self, config: &RecordConfig) -> Result<MediaParameters, RecordError> {
        let profile = match config.encoder {
            EncoderId::AacEld => AacProfile::Eld,
            EncoderId::AacHe => AacProfile::He,
            _ => AacProfile::Lc,
        };
        Ok(MediaParameters {
            stream_type: StreamType::Aac,
            sample_rate: config.sample_rate,
            bit_rate: config.bit_rate,
            num_channels: config.channels(),
            frame_size: config.channels() as usize * 2,
            aac_profile: Some(profile),
        })
    }

    fn container(
        &self,
        params: &MediaParameters,
        path: Option<&Path>,
    ) -> Result<Box<dyn ContainerWriter>, RecordError> {
        let profile = params.aac_profile.unwrap_or(AacProfile::Lc);
        Ok(Box::new(AdtsContainer::new(
            params.sample_rate,
            params.num_channels,
            profile,
            path,
        )?))
    }
}
