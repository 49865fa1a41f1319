//! Verbatim byte container, as a stream or a file.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::container::{
    check_add_track, check_start, check_stop, check_writable, create_file, io_error,
    ContainerWriter,
};
use crate::models::audio::{EncodedUnit, MediaParameters};
use crate::models::error::RecordError;

pub struct RawContainer {
    file: Option<File>,
    started: bool,
    track: i32,
}

impl RawContainer {
    pub fn new(path: Option<&Path>) -> Result<Self, RecordError> {
        let file = match path {
            Some(path) => Some(create_file(path)?),
            None => None,
        };
        Ok(Self {
            file,
            started: false,
            track: -1,
        })
    }
}

impl ContainerWriter for RawContainer {
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
                log::warn!("raw container finalize failed during release: {e}");
            }
        }
    }

    fn is_stream(&self) -> bool {
        self.file.is_none()
    }

    fn add_track(&mut self, _params: &MediaParameters) -> Result<usize, RecordError> {
        check_add_track(self.started, self.track)?;
        self.track = 0;
        Ok(0)
    }

    fn write_sample(&mut self, track: usize, unit: &EncodedUnit) -> Result<(), RecordError> {
        check_writable(self.started, self.track, track)?;
        match &mut self.file {
            Some(file) => file.write_all(&unit.bytes).map_err(io_error),
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
        Ok(unit.bytes.clone())
    }
}
