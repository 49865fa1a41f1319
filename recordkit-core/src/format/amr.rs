use std::path::Path;

use crate::container::{AmrContainer, ContainerWriter};
use crate::format::{nearest_value, require_path, FormatSpec};
use crate::models::audio::{MediaParameters, StreamType};
use crate::models::config::RecordConfig;
use crate::models::error::RecordError;

/// Mode bit rates of the narrowband codec ladder.
const NB_BIT_RATES: [u32; 8] = [4_750, 5_150, 5_900, 6_700, 7_400, 7_950, 10_200, 12_200];

/// Mode bit rates of the wideband codec ladder.
const WB_BIT_RATES: [u32; 9] = [
    6_600, 8_850, 12_650, 14_250, 15_850, 18_250, 19_850, 23_050, 23_850,
];

/// AMR, mono with a fixed sample rate (8 kHz narrowband, 16 kHz wideband).
pub(super) struct AmrFormat {
    wideband: bool,
}

impl AmrFormat {
    pub(super) fn narrowband() -> Self {
        Self { wideband: false }
    }

    pub(super) fn wideband() -> Self {
        Self { wideband: true }
    }
}

impl FormatSpec for AmrFormat {
    fn stream_type(&self) -> StreamType {
        if self.wideband {
            StreamType::AmrWb
        } else {
            StreamType::AmrNb
        }
    }

    fn media_parameters(&self, config: &RecordConfig) -> Result<MediaParameters, RecordError> {
        let (sample_rate, rates): (u32, &[u32]) = if self.wideband {
            (16_000, &WB_BIT_RATES)
        } else {
            (8_000, &NB_BIT_RATES)
        };
        Ok(MediaParameters {
            stream_type: self.stream_type(),
            sample_rate,
            bit_rate: nearest_value(rates, config.bit_rate),
            num_channels: 1,
            frame_size: 2,
            aac_profile: None,
        })
    }

    fn container(
        &self,
        _params: &MediaParameters,
        path: Option<&Path>,
    ) -> Result<Box<dyn ContainerWriter>, RecordError> {
        let path = require_path(path, "amr")?;
        Ok(Box::new(AmrContainer::new(path, self.wideband)?))
    }
}
