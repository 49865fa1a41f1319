//! Minimal Ogg muxer for Opus streams.
//!
//! RFC 3533 page framing plus the RFC 7845 identification and comment
//! headers. Granule positions count 48 kHz samples regardless of the input
//! rate; one audio page is written per encoded unit, with the EOS flag on
//! the final page.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::container::{
    check_add_track, check_start, check_stop, check_writable, create_file, io_error,
    ContainerWriter,
};
use crate::models::audio::{EncodedUnit, MediaParameters};
use crate::models::error::RecordError;

const GRANULE_RATE: u64 = 48_000;

const HEADER_TYPE_BOS: u8 = 0x02;
const HEADER_TYPE_EOS: u8 = 0x04;

pub struct OggOpusContainer {
    file: File,
    sample_rate: u32,
    num_channels: u16,
    serial: u32,
    page_sequence: u32,
    started: bool,
    track: i32,
}

impl OggOpusContainer {
    pub fn new(path: &Path, sample_rate: u32, num_channels: u16) -> Result<Self, RecordError> {
        Ok(Self {
            file: create_file(path)?,
            sample_rate,
            num_channels,
            serial: uuid::Uuid::new_v4().as_u128() as u32,
            page_sequence: 0,
            started: false,
            track: -1,
        })
    }

    fn write_page(
        &mut self,
        header_type: u8,
        granule: u64,
        payload: &[u8],
    ) -> Result<(), RecordError> {
        let mut lacing = Vec::new();
        let mut remaining = payload.len();
        loop {
            if remaining >= 255 {
                lacing.push(255u8);
                remaining -= 255;
            } else {
                lacing.push(remaining as u8);
                break;
            }
        }
        if lacing.len() > 255 {
            return Err(RecordError::Container(
                "packet too large for a single Ogg page".to_string(),
            ));
        }

        let mut page = Vec::with_capacity(27 + lacing.len() + payload.len());
        page.extend_from_slice(b"OggS");
        page.push(0); // stream structure version
        page.push(header_type);
        page.extend_from_slice(&granule.to_le_bytes());
        page.extend_from_slice(&self.serial.to_le_bytes());
        page.extend_from_slice(&self.page_sequence.to_le_bytes());
        page.extend_from_slice(&[0u8; 4]); // checksum, patched below
        page.push(lacing.len() as u8);
        page.extend_from_slice(&lacing);
        page.extend_from_slice(payload);

        let checksum = page_crc(&page);
        page[22..26].copy_from_slice(&checksum.to_le_bytes());

        self.page_sequence += 1;
        self.file.write_all(&page).map_err(io_error)
    }

    fn identification_header(&self) -> Vec<u8> {
        let mut head = Vec::with_capacity(19);
        head.extend_from_slice(b"OpusHead");
        head.push(1); // version
        head.push(self.num_channels as u8);
        head.extend_from_slice(&0u16.to_le_bytes()); // pre-skip, codec specific
        head.extend_from_slice(&self.sample_rate.to_le_bytes());
        head.extend_from_slice(&0i16.to_le_bytes()); // output gain
        head.push(0); // channel mapping family
        head
    }

    fn comment_header(&self) -> Vec<u8> {
        let vendor = b"recordkit";
        let mut tags = Vec::with_capacity(16 + vendor.len());
        tags.extend_from_slice(b"OpusTags");
        tags.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
        tags.extend_from_slice(vendor);
        tags.extend_from_slice(&0u32.to_le_bytes()); // comment count
        tags
    }
}

impl ContainerWriter for OggOpusContainer {
    fn start(&mut self) -> Result<(), RecordError> {
        check_start(self.started)?;
        self.file.set_len(0).map_err(io_error)?;
        self.started = true;
        let head = self.identification_header();
        self.write_page(HEADER_TYPE_BOS, 0, &head)?;
        let tags = self.comment_header();
        self.write_page(0, 0, &tags)
    }

    fn stop(&mut self) -> Result<(), RecordError> {
        check_stop(self.started)?;
        self.started = false;
        self.file.flush().map_err(io_error)
    }

    fn release(&mut self) {
        if self.started {
            if let Err(e) = self.stop() {
                log::warn!("ogg container finalize failed during release: {e}");
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
        if unit.bytes.is_empty() && !unit.end_of_stream {
            return Ok(());
        }
        let granule = unit.pts_us * GRANULE_RATE / 1_000_000;
        let header_type = if unit.end_of_stream {
            HEADER_TYPE_EOS
        } else {
            0
        };
        self.write_page(header_type, granule, &unit.bytes)
    }
}

/// CRC-32 over the whole page with a zeroed checksum field: polynomial
/// 0x04C11DB7, zero initial value, no reflection, no final xor.
fn page_crc(page: &[u8]) -> u32 {
    let mut crc: u32 = 0;
    for &byte in page {
        crc ^= (byte as u32) << 24;
        for _ in 0..8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ 0x04C1_1DB7
            } else {
                crc << 1
            };
        }
    }
    crc
}
