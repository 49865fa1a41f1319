//! Format catalog: maps a logical encoder id to media parameters, a
//! passthrough flag, and the container packaging its output.

mod aac;
mod amr;
mod flac;
mod opus;
mod pcm;
mod wave;

use std::path::Path;

use crate::codec::registry::CodecRegistry;
use crate::container::ContainerWriter;
use crate::models::audio::{MediaParameters, StreamType};
use crate::models::config::{EncoderId, RecordConfig};
use crate::models::error::RecordError;

/// One catalog entry: what a logical encoder fixes, snaps, and writes into.
pub trait FormatSpec: Send + Sync {
    /// Stream type carried inside the container.
    fn stream_type(&self) -> StreamType;

    /// True if the format takes PCM without transcoding.
    fn passthrough(&self) -> bool {
        false
    }

    /// Media parameters with the values this format fixes or snaps applied.
    /// Unreachable values snap to the nearest supported ones; only
    /// structural problems (a required path missing, say) are errors.
    fn media_parameters(&self, config: &RecordConfig) -> Result<MediaParameters, RecordError>;

    /// Build the container for this format's output.
    fn container(
        &self,
        params: &MediaParameters,
        path: Option<&Path>,
    ) -> Result<Box<dyn ContainerWriter>, RecordError>;
}

/// Catalog lookup for a logical encoder id.
pub fn for_encoder(id: EncoderId) -> Box<dyn FormatSpec> {
    match id {
        EncoderId::AacLc | EncoderId::AacEld | EncoderId::AacHe => Box::new(aac::AacFormat),
        EncoderId::AmrNb => Box::new(amr::AmrFormat::narrowband()),
        EncoderId::AmrWb => Box::new(amr::AmrFormat::wideband()),
        EncoderId::Opus => Box::new(opus::OpusFormat),
        EncoderId::Flac => Box::new(flac::FlacFormat),
        EncoderId::Wav => Box::new(wave::WaveFormat),
        EncoderId::Pcm16Bits => Box::new(pcm::PcmFormat),
    }
}

/// Whether recording with `id` can work: raw formats always can, transcoding
/// formats need a registered codec advertising their stream type.
pub fn is_encoder_supported(id: EncoderId, registry: &CodecRegistry) -> bool {
    let spec = for_encoder(id);
    spec.passthrough() || registry.supports(spec.stream_type())
}

/// Nearest catalog value by absolute distance; ties resolve to the first
/// candidate, and catalogs list values in ascending order. An empty
/// candidate list keeps the value unchanged.
pub(crate) fn nearest_value(values: &[u32], value: u32) -> u32 {
    let Some((&first, rest)) = values.split_first() else {
        return value;
    };
    let mut best = first;
    let mut distance = best.abs_diff(value);
    for &candidate in rest {
        let d = candidate.abs_diff(value);
        if d < distance {
            best = candidate;
            distance = d;
        }
    }
    if best != value {
        log::debug!("value {value} snapped to nearest catalog entry {best}");
    }
    best
}

pub(crate) fn require_path<'a>(
    path: Option<&'a Path>,
    format: &str,
) -> Result<&'a Path, RecordError> {
    path.ok_or_else(|| {
        RecordError::Config(format!("{format} requires an output path; streaming is not supported"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_value_picks_smallest_distance() {
        let rates = [8_000, 11_025, 22_050, 44_100, 48_000];
        assert_eq!(nearest_value(&rates, 44_100), 44_100);
        assert_eq!(nearest_value(&rates, 44_000), 44_100);
        assert_eq!(nearest_value(&rates, 9_000), 8_000);
        assert_eq!(nearest_value(&rates, 500_000), 48_000);
    }

    #[test]
    fn test_nearest_value_ties_resolve_to_first() {
        // 15 is equidistant from 10 and 20
        assert_eq!(nearest_value(&[10, 20], 15), 10);
    }

    #[test]
    fn test_nearest_value_without_candidates_keeps_value() {
        assert_eq!(nearest_value(&[], 44_100), 44_100);
    }

    #[test]
    fn test_passthrough_formats() {
        assert!(for_encoder(EncoderId::Wav).passthrough());
        assert!(for_encoder(EncoderId::Pcm16Bits).passthrough());
        assert!(!for_encoder(EncoderId::AacLc).passthrough());
        assert!(!for_encoder(EncoderId::Flac).passthrough());
    }

    #[test]
    fn test_is_encoder_supported() {
        let registry = CodecRegistry::with_defaults();
        assert!(is_encoder_supported(EncoderId::Wav, &registry));
        assert!(is_encoder_supported(EncoderId::Pcm16Bits, &registry));
        assert!(is_encoder_supported(EncoderId::Flac, &registry));
        assert!(!is_encoder_supported(EncoderId::AacLc, &registry));
        assert!(!is_encoder_supported(EncoderId::Opus, &registry));
    }

    #[test]
    fn test_amr_formats_fix_rate_and_channels() {
        let config = RecordConfig {
            encoder: EncoderId::AmrNb,
            sample_rate: 44_101,
            num_channels: 2,
            bit_rate: 128_000,
            ..RecordConfig::default()
        };
        let params = for_encoder(EncoderId::AmrNb)
            .media_parameters(&config)
            .unwrap();
        assert_eq!(params.sample_rate, 8_000);
        assert_eq!(params.num_channels, 1);
        assert_eq!(params.stream_type, StreamType::AmrNb);
        // bit rate snapped into the narrowband ladder
        assert_eq!(params.bit_rate, 12_200);

        let config = RecordConfig {
            encoder: EncoderId::AmrWb,
            sample_rate: 44_101,
            ..RecordConfig::default()
        };
        let params = for_encoder(EncoderId::AmrWb)
            .media_parameters(&config)
            .unwrap();
        assert_eq!(params.sample_rate, 16_000);
        assert_eq!(params.num_channels, 1);
    }

    #[test]
    fn test_opus_and_flac_snap_rates() {
        let config = RecordConfig {
            encoder: EncoderId::Opus,
            sample_rate: 44_100,
            ..RecordConfig::default()
        };
        let params = for_encoder(EncoderId::Opus)
            .media_parameters(&config)
            .unwrap();
        assert_eq!(params.sample_rate, 48_000);

        let config = RecordConfig {
            encoder: EncoderId::Flac,
            sample_rate: 44_100,
            ..RecordConfig::default()
        };
        let params = for_encoder(EncoderId::Flac)
            .media_parameters(&config)
            .unwrap();
        assert_eq!(params.sample_rate, 44_100);
    }

    #[test]
    fn test_aac_profiles() {
        use crate::models::audio::AacProfile;

        for (id, profile) in [
            (EncoderId::AacLc, AacProfile::Lc),
            (EncoderId::AacHe, AacProfile::He),
            (EncoderId::AacEld, AacProfile::Eld),
        ] {
            let config = RecordConfig {
                encoder: id,
                ..RecordConfig::default()
            };
            let params = for_encoder(id).media_parameters(&config).unwrap();
            assert_eq!(params.aac_profile, Some(profile));
            assert_eq!(params.stream_type, StreamType::Aac);
        }
    }

    #[test]
    fn test_file_only_formats_reject_missing_path() {
        let config = RecordConfig {
            encoder: EncoderId::Wav,
            ..RecordConfig::default()
        };
        let spec = for_encoder(EncoderId::Wav);
        let params = spec.media_parameters(&config).unwrap();
        assert!(matches!(
            spec.container(&params, None),
            Err(RecordError::Config(_))
        ));
    }

    #[test]
    fn test_pcm_allows_stream_and_file() {
        let config = RecordConfig {
            encoder: EncoderId::Pcm16Bits,
            ..RecordConfig::default()
        };
        let spec = for_encoder(EncoderId::Pcm16Bits);
        let params = spec.media_parameters(&config).unwrap();
        let stream = spec.container(&params, None).unwrap();
        assert!(stream.is_stream());
    }
}
