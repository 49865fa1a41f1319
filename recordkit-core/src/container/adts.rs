//! ADTS framing for AAC access units, as a stream or an `.aac` file.
//!
//! Each access unit is prefixed with a 7-byte header carrying the profile,
//! sample-rate index, channel configuration, and total frame length.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::container::{
    check_add_track, check_start, check_stop, check_writable, create_file, io_error,
    ContainerWriter,
};
use crate::models::audio::{AacProfile, EncodedUnit, MediaParameters};
use crate::models::error::RecordError;

/// Sample-rate index table from the ADTS specification.
const SAMPLE_RATES: [u32; 12] = [
    96_000, 88_200, 64_000, 48_000, 44_100, 32_000, 24_000, 22_050, 16_000, 12_000, 11_025, 8_000,
];

const HEADER_LEN: usize = 7;

pub struct AdtsContainer {
    sample_rate: u32,
    num_channels: u16,
    profile: AacProfile,
    file: Option<File>,
    freq_index: u8,
    started: bool,
    track: i32,
}

impl AdtsContainer {
    pub fn new(
        sample_rate: u32,
        num_channels: u16,
        profile: AacProfile,
        path: Option<&Path>,
    ) -> Result<Self, RecordError> {
        let file = match path {
            Some(path) => Some(create_file(path)?),
            None => None,
        };
        Ok(Self {
            sample_rate,
            num_channels,
            profile,
            file,
            freq_index: 0,
            started: false,
            track: -1,
        })
    }

    fn frame_header(&self, payload_len: usize) -> [u8; HEADER_LEN] {
        let frame_len = payload_len + HEADER_LEN;
        // the header's profile field is 2 bits; wider object types truncate,
        // matching MPEG-4 audio object type minus one
        let profile = self.profile.object_type().wrapping_sub(1) & 0x3;
        let channels = self.num_channels as u8;

        let mut header = [0u8; HEADER_LEN];
        header[0] = 0xFF;
        header[1] = 0xF9;
        header[2] = (profile << 6) | (self.freq_index << 2) | (channels >> 2);
        header[3] = ((channels & 0x3) << 6) | ((frame_len >> 11) as u8);
        header[4] = ((frame_len & 0x7FF) >> 3) as u8;
        header[5] = (((frame_len & 0x7) << 5) as u8) | 0x1F;
        header[6] = 0xFC;
        header
    }
}

impl ContainerWriter for AdtsContainer {
    fn start(&mut self) -> Result<(), RecordError> {
        check_start(self.started)?;
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecordError> {
        check_stop(self.started)?;
        self.started = false;
        if let Some(file) = &mut self.file {
            file.flush().map_err(io_error)?;
        }
        Ok(())
    }

    fn release(&mut self) {
        if self.started {
            if let Err(e) = self.stop() {
                log::warn!("adts container finalize failed during release: {e}");
            }
        }
    }

    fn is_stream(&self) -> bool {
        self.file.is_none()
    }

    fn add_track(&mut self, params: &MediaParameters) -> Result<usize, RecordError> {
        check_add_track(self.started, self.track)?;
        self.freq_index = SAMPLE_RATES
            .iter()
            .position(|&r| r == params.sample_rate)
            .ok_or_else(|| {
                RecordError::Container(format!(
                    "sample rate {} has no ADTS index",
                    params.sample_rate
                ))
            })? as u8;
        self.sample_rate = params.sample_rate;
        self.num_channels = params.num_channels;
        self.track = 0;
        Ok(0)
    }

    fn write_sample(&mut self, track: usize, unit: &EncodedUnit) -> Result<(), RecordError> {
        check_writable(self.started, self.track, track)?;
        let header = self.frame_header(unit.bytes.len());
        match &mut self.file {
            Some(file) => {
                file.write_all(&header).map_err(io_error)?;
                file.write_all(&unit.bytes).map_err(io_error)
            }
            None => Err(RecordError::Container(
                "stream container takes write_stream".to_string(),
            )),
        }
    }

    fn write_stream(&mut self, track: usize, unit: &EncodedUnit) -> Result<Vec<u8>, RecordError> {
        check_writable(self.started, self.track, track)?;
        if self.file.is_some() {
            return Err(RecordError::Container(
                "file container takes write_sample".to_string(),
            ));
        }
        let mut framed = Vec::with_capacity(HEADER_LEN + unit.bytes.len());
        framed.extend_from_slice(&self.frame_header(unit.bytes.len()));
        framed.extend_from_slice(&unit.bytes);
        Ok(framed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio::StreamType;

    fn params(sample_rate: u32, num_channels: u16) -> MediaParameters {
        MediaParameters {
            stream_type: StreamType::Aac,
            sample_rate,
            bit_rate: 128_000,
            num_channels,
            frame_size: num_channels as usize * 2,
            aac_profile: Some(AacProfile::Lc),
        }
    }

    fn unit(len: usize) -> EncodedUnit {
        EncodedUnit {
            bytes: vec![0xAB; len],
            pts_us: 0,
            end_of_stream: false,
        }
    }

    #[test]
    fn test_stream_framing_header_fields() {
        let mut container = AdtsContainer::new(44_100, 2, AacProfile::Lc, None).unwrap();
        assert!(container.is_stream());
        let track = container.add_track(&params(44_100, 2)).unwrap();
        container.start().unwrap();

        let framed = container.write_stream(track, &unit(100)).unwrap();
        assert_eq!(framed.len(), 107);
        assert_eq!(framed[0], 0xFF);
        assert_eq!(framed[1], 0xF9);
        // LC profile (1), freq index 4 for 44100, channels 2
        assert_eq!(framed[2], (1 << 6) | (4 << 2));
        assert_eq!(framed[3], 2 << 6);
        assert_eq!(framed[4], (107u16 >> 3) as u8);
        assert_eq!(framed[5], (((107 & 0x7) as u8) << 5) | 0x1F);
        assert_eq!(framed[6], 0xFC);
        assert_eq!(&framed[7..], &[0xAB; 100][..]);
        container.stop().unwrap();
    }

    #[test]
    fn test_file_mode_prefixes_every_unit() {
        let path = std::env::temp_dir().join(format!(
            "recordkit_adts_file_{}.aac",
            std::process::id()
        ));
        let mut container =
            AdtsContainer::new(16_000, 1, AacProfile::Lc, Some(path.as_path())).unwrap();
        assert!(!container.is_stream());
        let track = container.add_track(&params(16_000, 1)).unwrap();
        container.start().unwrap();
        container.write_sample(track, &unit(10)).unwrap();
        container.write_sample(track, &unit(20)).unwrap();
        container.stop().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(bytes.len(), (7 + 10) + (7 + 20));
        assert_eq!(bytes[0], 0xFF);
        assert_eq!(bytes[17], 0xFF); // second frame header
        // freq index 8 for 16 kHz
        assert_eq!(bytes[2] >> 2 & 0x0F, 8);
    }

    #[test]
    fn test_unknown_sample_rate_rejected() {
        let mut container = AdtsContainer::new(44_101, 1, AacProfile::Lc, None).unwrap();
        let err = container.add_track(&params(44_101, 1)).unwrap_err();
        assert!(matches!(err, RecordError::Container(_)));
    }

    #[test]
    fn test_write_modes_are_exclusive() {
        let mut container = AdtsContainer::new(44_100, 1, AacProfile::Lc, None).unwrap();
        let track = container.add_track(&params(44_100, 1)).unwrap();
        container.start().unwrap();
        assert!(container.write_sample(track, &unit(4)).is_err());
        assert!(container.write_stream(track, &unit(4)).is_ok());
    }
}
