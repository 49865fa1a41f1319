//! Container writers packaging encoded or raw streams.

mod adts;
mod amr;
mod flac;
mod ogg;
mod raw;
mod wave;

pub use adts::AdtsContainer;
pub use amr::AmrContainer;
pub use flac::FlacContainer;
pub use ogg::OggOpusContainer;
pub use raw::RawContainer;
pub use wave::WaveContainer;

use std::fs::File;
use std::path::Path;

use crate::models::audio::{EncodedUnit, MediaParameters};
use crate::models::error::RecordError;

/// Packages an encoded or raw stream into a file or a self-delimited byte
/// stream.
///
/// Exactly one track is added, before `start`. File containers take
/// `write_sample`; stream containers take `write_stream`; `is_stream` says
/// which, and never both on one instance.
pub trait ContainerWriter: Send {
    fn start(&mut self) -> Result<(), RecordError>;

    /// Flush and finalize, patching headers where the format defers them.
    fn stop(&mut self) -> Result<(), RecordError>;

    /// Free resources, stopping first if still open. Idempotent; secondary
    /// errors are logged rather than surfaced so a primary failure is
    /// preserved.
    fn release(&mut self);

    fn is_stream(&self) -> bool {
        false
    }

    /// Register the single track. Returns its index.
    fn add_track(&mut self, params: &MediaParameters) -> Result<usize, RecordError>;

    fn write_sample(&mut self, track: usize, unit: &EncodedUnit) -> Result<(), RecordError>;

    /// Frame `unit` for stream delivery, returning the bytes to emit.
    fn write_stream(&mut self, _track: usize, _unit: &EncodedUnit) -> Result<Vec<u8>, RecordError> {
        Err(RecordError::Container(
            "not a stream container".to_string(),
        ))
    }
}

/// Create (truncating) the container output file, readable for formats that
/// patch their headers at stop.
pub(crate) fn create_file(path: &Path) -> Result<File, RecordError> {
    File::options()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| RecordError::Container(format!("failed to create {}: {e}", path.display())))
}

/// Shared lifecycle guards: started flag and single-track index.
pub(crate) fn check_writable(started: bool, track: i32, index: usize) -> Result<(), RecordError> {
    if !started {
        return Err(RecordError::Container(
            "container not started".to_string(),
        ));
    }
    if track < 0 {
        return Err(RecordError::Container(
            "no track has been added".to_string(),
        ));
    }
    if index != track as usize {
        return Err(RecordError::Container(format!("invalid track: {index}")));
    }
    Ok(())
}

pub(crate) fn check_add_track(started: bool, track: i32) -> Result<(), RecordError> {
    if started {
        return Err(RecordError::Container(
            "tracks must be added before start".to_string(),
        ));
    }
    if track >= 0 {
        return Err(RecordError::Container(
            "container supports a single track".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_start(started: bool) -> Result<(), RecordError> {
    if started {
        return Err(RecordError::Container(
            "container already started".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_stop(started: bool) -> Result<(), RecordError> {
    if !started {
        return Err(RecordError::Container(
            "container not started".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn io_error(err: std::io::Error) -> RecordError {
    RecordError::Container(err.to_string())
}
