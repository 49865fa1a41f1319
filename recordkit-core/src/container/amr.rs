//! AMR file container (RFC 4867 single-channel storage format).

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::container::{
    check_add_track, check_start, check_stop, check_writable, create_file, io_error,
    ContainerWriter,
};
use crate::models::audio::{EncodedUnit, MediaParameters};
use crate::models::error::RecordError;

const AMR_NB_MAGIC: &[u8] = b"#!AMR\n";
const AMR_WB_MAGIC: &[u8] = b"#!AMR-WB\n";

pub struct AmrContainer {
    file: File,
    wideband: bool,
    started: bool,
    track: i32,
}

impl AmrContainer {
    pub fn new(path: &Path, wideband: bool) -> Result<Self, RecordError> {
        Ok(Self {
            file: create_file(path)?,
            wideband,
            started: false,
            track: -1,
        })
    }
}

impl ContainerWriter for AmrContainer {
    fn start(&mut self) -> Result<(), RecordError> {
        check_start(self.started)?;
        self.file.set_len(0).map_err(io_error)?;
        let magic = if self.wideband {
            AMR_WB_MAGIC
        } else {
            AMR_NB_MAGIC
        };
        self.file.write_all(magic).map_err(io_error)?;
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecordError> {
        check_stop(self.started)?;
        self.started = false;
        self.file.flush().map_err(io_error)
    }

    fn release(&mut self) {
        if self.started {
            if let Err(e) = self.stop() {
                log::warn!("amr container finalize failed during release: {e}");
            }
        }
    }

    fn add_track(&mut self, _params: &MediaParameters) -> Result<usize, RecordError> {
        check_add_track(self.started, self.track)?;
        self.track = 0;
        Ok(0)
    }

    fn write_sample(&mut self, track: usize, unit: &EncodedUnit) -> Result<(), RecordError> {
        check_writable(self.started, self.track, track)?;
        self.file.write_all(&unit.bytes).map_err(io_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio::StreamType;

    fn params(wideband: bool) -> MediaParameters {
        MediaParameters {
            stream_type: if wideband {
                StreamType::AmrWb
            } else {
                StreamType::AmrNb
            },
            sample_rate: if wideband { 16_000 } else { 8_000 },
            bit_rate: 12_200,
            num_channels: 1,
            frame_size: 2,
            aac_profile: None,
        }
    }

    fn write_file(wideband: bool) -> Vec<u8> {
        let path = std::env::temp_dir().join(format!(
            "recordkit_amr_{wideband}_{}.amr",
            std::process::id()
        ));
        let mut container = AmrContainer::new(&path, wideband).unwrap();
        let track = container.add_track(&params(wideband)).unwrap();
        container.start().unwrap();
        container
            .write_sample(
                track,
                &EncodedUnit {
                    bytes: vec![0x3C, 1, 2, 3],
                    pts_us: 0,
                    end_of_stream: false,
                },
            )
            .unwrap();
        container.stop().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        bytes
    }

    #[test]
    fn test_narrowband_magic() {
        let bytes = write_file(false);
        assert!(bytes.starts_with(b"#!AMR\n"));
        assert_eq!(&bytes[6..], &[0x3C, 1, 2, 3]);
    }

    #[test]
    fn test_wideband_magic() {
        let bytes = write_file(true);
        assert!(bytes.starts_with(b"#!AMR-WB\n"));
        assert_eq!(&bytes[9..], &[0x3C, 1, 2, 3]);
    }

    #[test]
    fn test_magic_requires_start() {
        let path = std::env::temp_dir().join(format!(
            "recordkit_amr_guard_{}.amr",
            std::process::id()
        ));
        let mut container = AmrContainer::new(&path, false).unwrap();
        let unit = EncodedUnit {
            bytes: vec![1],
            pts_us: 0,
            end_of_stream: false,
        };
        assert!(container.write_sample(0, &unit).is_err());
        std::fs::remove_file(&path).unwrap();
    }
}
