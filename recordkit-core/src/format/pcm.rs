use std::path::Path;

use crate::container::{ContainerWriter, RawContainer};
use crate::format::FormatSpec;
use crate::models::audio::{MediaParameters, StreamType};
use crate::models::config::RecordConfig;
use crate::models::error::RecordError;

/// Raw 16-bit PCM, streamed or written verbatim.
pub(super) struct PcmFormat;

impl FormatSpec for PcmFormat {
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
        _params: &MediaParameters,
        path: Option<&Path>,
    ) -> Result<Box<dyn ContainerWriter>, RecordError> {
        Ok(Box::new(RawContainer::new(path)?))
    }
}
