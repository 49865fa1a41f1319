//! PCM capture sources.

use crate::models::audio::MediaParameters;
use crate::models::config::RecordConfig;
use crate::models::error::RecordError;

/// Reads raw 16-bit little-endian PCM from an input device.
///
/// `read` blocks until data is available or a short internal timeout
/// elapses; 0 bytes is a valid "no data yet" result, and fatal device
/// failures surface as [`RecordError::Read`] with the backend's code.
/// Implementations refresh their amplitude after every non-empty read.
pub trait PcmSource: Send {
    fn start(&mut self) -> Result<(), RecordError>;

    /// Enable or disable sample delivery without closing the device. This is
    /// the session's single pause seam; while inactive, captured frames are
    /// dropped, never buffered.
    fn set_active(&mut self, active: bool);

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, RecordError>;

    /// Capture buffer size in bytes, minimum chunk with headroom applied.
    fn buffer_size(&self) -> usize;

    /// Peak amplitude of the most recent chunk, in dBFS within [-160, 0].
    fn amplitude_db(&self) -> f64;

    /// Free the device and any effect handles. Idempotent.
    fn release(&mut self);
}

/// Opens a [`PcmSource`] for a resolved configuration.
pub trait SourceBuilder: Send + Sync {
    fn open(
        &self,
        config: &RecordConfig,
        params: &MediaParameters,
    ) -> Result<Box<dyn PcmSource>, RecordError>;
}
