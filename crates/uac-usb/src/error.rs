//! USB layer error type.

use thiserror::Error;

/// A failed USB operation: the operation name plus the underlying libusb
/// error code, so messages read like `claim_interface: Resource busy`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbError {
    #[error("{operation}: {code}")]
    Io {
        operation: &'static str,
        code: rusb::Error,
    },
    #[error("{operation}: transfer allocation failed")]
    TransferAlloc { operation: &'static str },
}

impl UsbError {
    pub fn io(operation: &'static str, code: rusb::Error) -> Self {
        UsbError::Io { operation, code }
    }

    /// The underlying libusb error code, when there is one.
    pub fn code(&self) -> Option<rusb::Error> {
        match self {
            UsbError::Io { code, .. } => Some(*code),
            UsbError::TransferAlloc { .. } => None,
        }
    }
}

pub type UsbResult<T> = Result<T, UsbError>;
