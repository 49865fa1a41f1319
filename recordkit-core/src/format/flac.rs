use std::path::Path;

use crate::container::{ContainerWriter, FlacContainer};
use crate::format::{nearest_value, require_path, FormatSpec};
use crate::models::audio::{MediaParameters, StreamType};
use crate::models::config::RecordConfig;
use crate::models::error::RecordError;

const SAMPLE_RATES: [u32; 5] = [8_000, 11_025, 22_050, 44_100, 48_000];

pub(super) struct FlacFormat;

impl FormatSpec for FlacFormat {
    fn stream_type(&self) -> StreamType {
        StreamType::Flac
    }

    fn media_parameters(&self, config: &RecordConfig) -> Result<MediaParameters, RecordError> {
        Ok(MediaParameters {
            stream_type: StreamType::Flac,
            sample_rate: nearest_value(&SAMPLE_RATES, config.sample_rate),
            // lossless; the bit rate is not negotiated
            bit_rate: 0,
            num_channels: config.channels(),
            frame_size: config.channels() as usize * 2,
            aac_profile: None,
        })
    }

    fn container(
        &self,
        _params: &MediaParameters,
        path: Option<&Path>,
    ) -> Result<Box<dyn ContainerWriter>, RecordError> {
        let path = require_path(path, "flac")?;
        Ok(Box::new(FlacContainer::new(path)?))
    }
}
