use thiserror::Error;

/// Errors surfaced by the recording pipeline.
///
/// Mid-session failures funnel through the session's single failure path and
/// are reported exactly once; teardown after a failure swallows secondary
/// errors (logging them) so the primary cause is preserved.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Unreachable encoder/rate/channel combination, rejected before any
    /// resource is acquired.
    #[error("configuration rejected: {0}")]
    Config(String),

    /// Input device unavailable or failed to open.
    #[error("input device error: {0}")]
    Device(String),

    /// Codec failure, either at creation or mid-stream.
    #[error("codec error: {0}")]
    Codec(String),

    /// No codec can be adjusted to the requested format.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Unwritable path, oversize output, or malformed container data.
    #[error("container error: {0}")]
    Container(String),

    /// Device read failure mid-capture, carrying the backend error code.
    #[error("read failed (code {code}): {message}")]
    Read { code: i32, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RecordError::UnsupportedFormat("audio/opus".to_string());
        assert_eq!(err.to_string(), "unsupported format: audio/opus");

        let err = RecordError::Read {
            code: -32,
            message: "object is no longer valid".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "read failed (code -32): object is no longer valid"
        );
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(
            RecordError::Config("bad".to_string()),
            RecordError::Config("bad".to_string())
        );
        assert_ne!(
            RecordError::Config("bad".to_string()),
            RecordError::Device("bad".to_string())
        );
    }
}
