use soundport_format::LayoutError;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    #[error("Out of memory")]
    OutOfMemory,

    #[error("Unable to initialize audio backend")]
    InitFailed,

    #[error("Out of system resources")]
    SystemResources,

    #[error("Unable to open device")]
    OpeningDevice,

    #[error("No such device")]
    NoSuchDevice,

    #[error("Invalid state for this operation")]
    InvalidState,

    #[error("Backend unavailable")]
    BackendUnavailable,

    #[error("Unrecoverable streaming failure")]
    Streaming,

    #[error("Device does not support the requested parameters")]
    IncompatibleDevice,

    #[error("No such client")]
    NoSuchClient,

    #[error("Backend does not support the requested operation")]
    IncompatibleBackend,

    #[error("Backend server shutdown or became inactive")]
    BackendDisconnected,

    #[error("Interrupted; try again")]
    Interrupted,

    #[error("Buffer underflow")]
    Underflow,

    #[error("Unable to convert to or from UTF-8")]
    EncodingString,
}

impl Error {
    /// The stream or context must be rebuilt; retrying in place cannot succeed.
    pub fn is_fatal(self) -> bool {
        matches!(self, Error::Streaming | Error::BackendDisconnected)
    }

    /// The same call may succeed with a different format, rate or layout.
    pub fn is_retryable_with_other_params(self) -> bool {
        matches!(self, Error::IncompatibleDevice | Error::IncompatibleBackend)
    }
}

impl From<LayoutError> for Error {
    fn from(_: LayoutError) -> Self {
        Error::InvalidState
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert!(Error::Streaming.is_fatal());
        assert!(Error::BackendDisconnected.is_fatal());
        assert!(!Error::Underflow.is_fatal());
        assert!(Error::IncompatibleDevice.is_retryable_with_other_params());
        assert!(!Error::Streaming.is_retryable_with_other_params());
    }

    #[test]
    fn test_layout_error_maps_to_invalid_state() {
        let err: Error = LayoutError::TooManyChannels(30).into();
        assert_eq!(err, Error::InvalidState);
    }
}
