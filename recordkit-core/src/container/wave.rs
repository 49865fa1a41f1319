//! WAV file container.
//!
//! Data is written from offset 44; the header is deferred to `stop`, which
//! seeks back and patches the RIFF/data sizes. Output past the 4 GiB format
//! ceiling clamps the recorded sizes with a warning instead of failing.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use crate::container::{
    check_add_track, check_start, check_stop, check_writable, create_file, io_error,
    ContainerWriter,
};
use crate::models::audio::{EncodedUnit, MediaParameters};
use crate::models::error::RecordError;

const HEADER_SIZE: u64 = 44;

/// RIFF sizes are 32-bit.
const MAX_FILE_SIZE: u64 = u32::MAX as u64;

pub struct WaveContainer {
    file: File,
    frame_size: usize,
    sample_rate: u32,
    num_channels: u16,
    started: bool,
    track: i32,
}

impl WaveContainer {
    pub fn new(path: &Path, frame_size: usize) -> Result<Self, RecordError> {
        Ok(Self {
            file: create_file(path)?,
            frame_size,
            sample_rate: 0,
            num_channels: 0,
            started: false,
            track: -1,
        })
    }
}

impl ContainerWriter for WaveContainer {
    fn start(&mut self) -> Result<(), RecordError> {
        check_start(self.started)?;
        self.file.set_len(0).map_err(io_error)?;
        self.file
            .seek(SeekFrom::Start(HEADER_SIZE))
            .map_err(io_error)?;
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecordError> {
        check_stop(self.started)?;
        self.started = false;
        if self.track >= 0 {
            let file_size = self.file.stream_position().map_err(io_error)?;
            let header = wave_header(
                file_size,
                self.sample_rate,
                self.num_channels,
                self.frame_size,
            );
            self.file.seek(SeekFrom::Start(0)).map_err(io_error)?;
            self.file.write_all(&header).map_err(io_error)?;
        }
        self.file.flush().map_err(io_error)?;
        Ok(())
    }

    fn release(&mut self) {
        if self.started {
            if let Err(e) = self.stop() {
                log::warn!("wave container finalize failed during release: {e}");
            }
        }
    }

    fn add_track(&mut self, params: &MediaParameters) -> Result<usize, RecordError> {
        check_add_track(self.started, self.track)?;
        self.sample_rate = params.sample_rate;
        self.num_channels = params.num_channels;
        self.track = 0;
        Ok(0)
    }

    fn write_sample(&mut self, track: usize, unit: &EncodedUnit) -> Result<(), RecordError> {
        check_writable(self.started, self.track, track)?;
        self.file.write_all(&unit.bytes).map_err(io_error)
    }
}

fn wave_header(file_size: u64, sample_rate: u32, num_channels: u16, frame_size: usize) -> [u8; 44] {
    let (riff_size, data_size) = if file_size > MAX_FILE_SIZE {
        log::warn!("output exceeds the 4 GiB WAV ceiling; recorded sizes are clamped");
        (MAX_FILE_SIZE - 8, MAX_FILE_SIZE - HEADER_SIZE)
    } else {
        (file_size - 8, file_size - HEADER_SIZE)
    };

    let byte_rate = sample_rate * frame_size as u32;
    let bits_per_sample = if num_channels > 0 {
        (frame_size / num_channels as usize * 8) as u16
    } else {
        16
    };

    let mut header = [0u8; 44];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&(riff_size as u32).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes()); // fmt chunk size
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    header[22..24].copy_from_slice(&num_channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&(frame_size as u16).to_le_bytes()); // block align
    header[34..36].copy_from_slice(&bits_per_sample.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&(data_size as u32).to_le_bytes());
    header
}
