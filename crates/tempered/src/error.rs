//! Error types

use thiserror::Error;

/// Failure message reported by the native sensor library
///
/// The library only ever reports free-form strings, so the message is kept
/// verbatim and not classified further.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct NativeError(pub String);

impl NativeError {
    /// Create a native error from any message
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The provider's diagnostic text
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Errors returned by library, device and sensor operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Operation requires a successful `Tempered::init` first
    #[error("tempered: not initialised")]
    NotInitialized,

    /// Operation requires an open device
    #[error("tempered: device not open")]
    NotOpen,

    /// The provider could not supply the requested sensor value
    #[error("tempered: failed to retrieve sensor reading")]
    RetrievalFailure,

    /// The provider could not refresh the device's readings
    #[error("tempered: failed to update sensors")]
    UpdateFailure,

    /// Pass-through of a native init/exit/enumerate/open failure
    #[error("{0}")]
    Native(String),
}

impl From<NativeError> for Error {
    fn from(e: NativeError) -> Self {
        Error::Native(e.0)
    }
}

/// Type alias for tempered results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(Error::NotInitialized.to_string(), "tempered: not initialised");
        assert_eq!(Error::NotOpen.to_string(), "tempered: device not open");
        assert_eq!(
            Error::RetrievalFailure.to_string(),
            "tempered: failed to retrieve sensor reading"
        );
        assert_eq!(
            Error::UpdateFailure.to_string(),
            "tempered: failed to update sensors"
        );
    }

    #[test]
    fn test_native_message_is_verbatim() {
        let err: Error = NativeError::new("device not found").into();
        assert_eq!(err, Error::Native("device not found".to_string()));
        assert_eq!(err.to_string(), "device not found");
    }
}
