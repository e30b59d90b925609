use std::io;

use num_enum::TryFromPrimitive;
use thiserror::Error;

use crate::http::TransportError;
use crate::utils::enum_name_or_code;

/// Numeric error codes used by the native engine.
#[repr(i32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive)]
pub enum ErrorCode {
    InvalidArgument = 1,
    InternalError = 2,
    NetworkError = 3,
    PreconditionFailed = 4,
    OperationCanceled = 5,
    DecryptionFailed = 6,
    GroupTooBig = 7,
    InvalidVerification = 8,
    TooManyAttempts = 9,
    ExpiredVerification = 10,
    IoError = 11,
    DeviceRevoked = 12,
    Conflict = 13,
    UpgradeRequired = 14,
}

/// Unified bridge error.
/// - `Source` is a host source failure recorded by the input bridge and
///   re-raised to the consumer of the paired output stream.
/// - `Programming` is misuse (double close, concurrent reads); never recovered.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Canceled(String),

    #[error("source read failed: {0}")]
    Source(#[source] io::Error),

    #[error("{code:?}: {message}")]
    Native { code: ErrorCode, message: String },

    #[error("programming error: {0}")]
    Programming(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl BridgeError {
    pub fn canceled() -> Self {
        BridgeError::Canceled("stream operation canceled".into())
    }

    /// Build from a raw native error. Unknown codes become `InternalError`.
    pub fn native(raw_code: i32, message: impl Into<String>) -> Self {
        let message = message.into();
        match ErrorCode::try_from_primitive(raw_code) {
            Ok(code) => BridgeError::Native { code, message },
            Err(_) => BridgeError::Native {
                code: ErrorCode::InternalError,
                message: format!(
                    "Unknown error code returned by native engine: {} - {}",
                    enum_name_or_code::<ErrorCode>(raw_code),
                    message
                ),
            },
        }
    }

    /// Code used when the error is handed across the native boundary.
    pub fn code(&self) -> ErrorCode {
        match self {
            BridgeError::Transport(_) => ErrorCode::NetworkError,
            BridgeError::Canceled(_) => ErrorCode::OperationCanceled,
            BridgeError::Source(_) | BridgeError::Io(_) => ErrorCode::IoError,
            BridgeError::Native { code, .. } => *code,
            BridgeError::Programming(_) => ErrorCode::InternalError,
            BridgeError::InvalidArgument(_) | BridgeError::Config(_) => ErrorCode::InvalidArgument,
        }
    }
}

impl From<BridgeError> for io::Error {
    fn from(e: BridgeError) -> Self {
        let kind = match &e {
            BridgeError::Source(inner) | BridgeError::Io(inner) => inner.kind(),
            BridgeError::Canceled(_) => io::ErrorKind::Interrupted,
            BridgeError::InvalidArgument(_) | BridgeError::Config(_) => io::ErrorKind::InvalidInput,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, e)
    }
}
