use crate::types::MessageType;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur when talking to a Sole treadmill
#[derive(Error, Debug)]
pub enum TreadmillError {
    /// Bluetooth Low Energy related errors
    #[error("BLE error: {0}")]
    Ble(#[from] btleplug::Error),

    /// No device with the configured address was found during scanning
    #[error("treadmill not found")]
    DeviceNotFound,

    /// The device address string could not be parsed
    #[error("invalid device address: {0}")]
    InvalidAddress(String),

    /// The treadmill GATT service is missing
    #[error("missing expected service: {0}")]
    MissingService(Uuid),

    /// A required GATT characteristic is missing
    #[error("missing expected characteristic: {0}")]
    MissingCharacteristic(Uuid),

    /// The notify characteristic has no client configuration descriptor
    #[error("missing expected descriptor on notify characteristic")]
    MissingDescriptor,

    /// The frame envelope is malformed
    #[error("invalid frame: {0}")]
    Framing(String),

    /// A well-framed message carried a tag outside the known set
    #[error("unknown message type {tag:#04x}: {payload}")]
    UnknownType {
        /// The unrecognized tag byte
        tag: u8,
        /// Hex dump of the payload the tag arrived in
        payload: String,
    },

    /// A message payload failed its per-variant length or tag check
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// An ACK arrived without the expected `OK` trailer
    #[error("unexpected data from device: {0}")]
    AckTrailer(String),

    /// A transport failure reported through the listener channel
    #[error("transport error: {0}")]
    Transport(String),

    /// The device never answered a request
    #[error("failed to get acknowledgement from device: waiting on {expected} from command {request}")]
    AckTimeout {
        /// The message type the sender was waiting on
        expected: MessageType,
        /// Rendering of the request that went unanswered
        request: String,
    },

    /// The session has no live transport
    #[error("not connected to treadmill")]
    Disconnected,

    /// The caller's cancellation signal fired
    #[error("operation cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for treadmill operations
pub type Result<T> = std::result::Result<T, TreadmillError>;

impl TreadmillError {
    /// Check if this error was produced while decoding an inbound frame
    ///
    /// Decode errors fail every outstanding response waiter because one
    /// malformed frame usually means the session is desynchronized.
    #[must_use]
    pub const fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::Framing(_)
                | Self::UnknownType { .. }
                | Self::InvalidMessage(_)
                | Self::AckTrailer(_)
        )
    }

    /// Check if this error indicates a connection issue
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Ble(_)
                | Self::DeviceNotFound
                | Self::Disconnected
                | Self::MissingService(_)
                | Self::MissingCharacteristic(_)
                | Self::MissingDescriptor
        )
    }

    /// Owned copy of this error suitable for handing to multiple waiters
    ///
    /// The transport-backed sources (`btleplug`, IO) are not cloneable, so
    /// those variants collapse to [`TreadmillError::Transport`] carrying the
    /// rendered message.
    pub(crate) fn duplicate(&self) -> Self {
        match self {
            Self::Ble(e) => Self::Transport(e.to_string()),
            Self::Io(e) => Self::Transport(e.to_string()),
            Self::DeviceNotFound => Self::DeviceNotFound,
            Self::InvalidAddress(s) => Self::InvalidAddress(s.clone()),
            Self::MissingService(uuid) => Self::MissingService(*uuid),
            Self::MissingCharacteristic(uuid) => Self::MissingCharacteristic(*uuid),
            Self::MissingDescriptor => Self::MissingDescriptor,
            Self::Framing(s) => Self::Framing(s.clone()),
            Self::UnknownType { tag, payload } => Self::UnknownType {
                tag: *tag,
                payload: payload.clone(),
            },
            Self::InvalidMessage(s) => Self::InvalidMessage(s.clone()),
            Self::AckTrailer(s) => Self::AckTrailer(s.clone()),
            Self::Transport(s) => Self::Transport(s.clone()),
            Self::AckTimeout { expected, request } => Self::AckTimeout {
                expected: *expected,
                request: request.clone(),
            },
            Self::Disconnected => Self::Disconnected,
            Self::Cancelled => Self::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let framing = TreadmillError::Framing("bad envelope".to_string());
        assert!(framing.is_decode_error());
        assert!(!framing.is_connection_error());

        let disconnected = TreadmillError::Disconnected;
        assert!(!disconnected.is_decode_error());
        assert!(disconnected.is_connection_error());

        let timeout = TreadmillError::AckTimeout {
            expected: MessageType::Ack,
            request: "Command[Command=LevelUp]".to_string(),
        };
        assert!(!timeout.is_decode_error());
        assert!(!timeout.is_connection_error());
    }

    #[test]
    fn test_error_display() {
        let error = TreadmillError::AckTimeout {
            expected: MessageType::SetWorkoutMode,
            request: "SetWorkoutMode[Mode=Start]".to_string(),
        };
        let rendered = format!("{error}");
        assert!(rendered.contains("SetWorkoutMode"));
        assert!(rendered.contains("Mode=Start"));

        let error = TreadmillError::UnknownType {
            tag: 0x99,
            payload: "990102".to_string(),
        };
        assert!(format!("{error}").contains("0x99"));
    }

    #[test]
    fn test_duplicate_preserves_decode_variants() {
        let original = TreadmillError::InvalidMessage("expected 4 bytes".to_string());
        let copy = original.duplicate();
        assert!(matches!(copy, TreadmillError::InvalidMessage(s) if s == "expected 4 bytes"));

        let io = TreadmillError::Io(std::io::Error::other("pipe closed"));
        assert!(matches!(io.duplicate(), TreadmillError::Transport(_)));
    }
}
