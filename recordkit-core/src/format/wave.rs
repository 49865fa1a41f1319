use std::path::Path;

use crate::container::{ContainerWriter, WaveContainer};
use crate::format::{require_path, FormatSpec};
use crate::models::audio::{MediaParameters, StreamType};
use crate::models::config::RecordConfig;
use crate::models::error::RecordError;

/// 16-bit PCM inside a WAV file.
pub(super) struct WaveFormat;

impl FormatSpec for WaveFormat {
    fn stream_type(&self) -> StreamType {
        StreamType::RawPcm
    }

    fn passthrough(&self) -> bool {
        true
    }

    fn media_parameters(&self, config: &RecordConfig) -> Result<MediaParameters, RecordError> {
        Ok(MediaParameters {
            stream_type: StreamType::RawPcm,
            sample_rate: config.sample_rate,
            bit_rate: config.sample_rate * config.channels() as u32 * 16,
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
        let path = require_path(path, "wav")?;
        Ok(Box::new(WaveContainer::new(path, params.frame_size)?))
    }
}
