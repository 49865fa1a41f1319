//! FLAC file container.
//!
//! The codec emits a complete FLAC stream, so writing is verbatim; `stop`
//! validates the stream headers and patches the STREAMINFO total-samples
//! field from the final unit's presentation timestamp.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::container::{
    check_add_track, check_start, check_stop, check_writable, create_file, io_error,
    ContainerWriter,
};
use crate::models::audio::{EncodedUnit, MediaParameters};
use crate::models::error::RecordError;

/// fLaC magic + 4-byte block header + 34-byte STREAMINFO.
const HEADER_LEN: usize = 42;

pub struct FlacContainer {
    file: File,
    started: bool,
    track: i32,
    last_pts_us: Option<u64>,
}

impl FlacContainer {
    pub fn new(path: &Path) -> Result<Self, RecordError> {
        Ok(Self {
            file: create_file(path)?,
            started: false,
            track: -1,
            last_pts_us: None,
        })
    }

    fn patch_total_samples(&mut self, pts_us: u64) -> Result<(), RecordError> {
        self.file.seek(SeekFrom::Start(0)).map_err(io_error)?;
        let mut header = [0u8; HEADER_LEN];
        self.file.read_exact(&mut header).map_err(|_| {
            RecordError::Container("EOF reached while reading FLAC headers".to_string())
        })?;

        if &header[0..4] != b"fLaC" {
            return Err(RecordError::Container(
                "missing FLAC stream marker".to_string(),
            ));
        }
        if header[4] & 0x7f != 0 {
            return Err(RecordError::Container(
                "first metadata block is not STREAMINFO".to_string(),
            ));
        }

        // 20-bit sample rate at bit offset 144 of STREAMINFO
        let sample_rate = ((header[18] as u64) << 12)
            | ((header[19] as u64) << 4)
            | ((header[20] as u64) >> 4);
        if sample_rate == 0 {
            return Err(RecordError::Container(
                "STREAMINFO carries a zero sample rate".to_string(),
            ));
        }

        let total_samples = pts_us * sample_rate / 1_000_000;
        if total_samples >= 1 << 36 {
            return Err(RecordError::Container(
                "total sample count exceeds the 36-bit STREAMINFO field".to_string(),
            ));
        }

        // 36-bit field: low nibble of byte 21 plus bytes 22..26
        header[21] = (header[21] & 0xf0) | ((total_samples >> 32) as u8 & 0x0f);
        header[22] = (total_samples >> 24) as u8;
        header[23] = (total_samples >> 16) as u8;
        header[24] = (total_samples >> 8) as u8;
        header[25] = total_samples as u8;

        self.file.seek(SeekFrom::Start(21)).map_err(io_error)?;
        self.file.write_all(&header[21..26]).map_err(io_error)?;
        self.file
            .seek(SeekFrom::End(0))
            .map_err(io_error)
            .map(|_| ())
    }
}

impl ContainerWriter for FlacContainer {
    fn start(&mut self) -> Result<(), RecordError> {
        check_start(self.started)?;
        self.file.set_len(0).map_err(io_error)?;
        self.file.seek(SeekFrom::Start(0)).map_err(io_error)?;
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecordError> {
        check_stop(self.started)?;
        self.started = false;
        if let Some(pts_us) = self.last_pts_us {
            self.patch_total_samples(pts_us)?;
        }
        self.file.flush().map_err(io_error)
    }

    fn release(&mut self) {
        if self.started {
            if let Err(e) = self.stop() {
                log::warn!("flac container finalize failed during release: {e}");
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
        self.file.write_all(&unit.bytes).map_err(io_error)?;
        if unit.end_of_stream {
            self.last_pts_us = Some(unit.pts_us);
        }
        Ok(())
    }
}
