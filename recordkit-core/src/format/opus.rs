use std::path::Path;

use crate::container::{ContainerWriter, OggOpusContainer};
use crate::format::{nearest_value, require_path, FormatSpec};
use crate::models::audio::{MediaParameters, StreamType};
use crate::models::config::RecordConfig;
use crate::models::error::RecordError;

const SAMPLE_RATES: [u32; 5] = [8_000, 12_000, 16_000, 24_000, 48_000];

pub(super) struct OpusFormat;

impl FormatSpec for OpusFormat {
    fn stream_type(&self) -> StreamType {
        StreamType::Opus
    }

    fn media_parameters(&self, config: &RecordConfig) -> Result<MediaParameters, RecordError> {
        Ok(MediaParameters {
            stream_type: StreamType::Opus,
            sample_rate: nearest_value(&SAMPLE_RATES, config.sample_rate),
            bit_rate: config.bit_rate,
            num_channels: config.channels(),
            frame_size: config.channels() as usize * 2,
            aac_profile: None,
        })
    }

    fn container(
        &self,
        params: &MediaParameters,
        path: Option<&Path>,
    ) -> Result<Box<dyn ContainerWriter>, RecordError> {
        let path = require_path(path, "opus")?;
        Ok(Box::new(OggOpusContainer::new(
            path,
            params.sample_rate,
            params.num_channels,
        )?))
    }
}
