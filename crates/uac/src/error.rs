//! Library error types.

use thiserror::Error;

use uac_proto::ParseError;
use uac_usb::UsbError;

#[derive(Error, Debug)]
pub enum UacError {
    /// The descriptor stream is not a usable UAC 1.0 audio function.
    #[error("invalid device: {0}")]
    InvalidDevice(#[from] ParseError),

    /// A USB layer operation failed.
    #[error(transparent)]
    Usb(#[from] UsbError),

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// No isochronous transfer could be submitted at stream start.
    #[error("no transfers submitted")]
    StreamStartFailure,

    /// No streaming interface links to the requested route.
    #[error("no stream interface is linked to this audio route")]
    NoStreamInterface,

    /// The route has no feature unit next to its output terminal.
    #[error("no feature unit adjacent to the route's output terminal")]
    NoFeatureUnit,
}

pub type UacResult<T> = Result<T, UacError>;

/// Non-fatal streaming condition, retrieved via
/// `StreamHandle::check_streaming_error`. These never abort the stream by
/// themselves; they explain why callbacks stopped arriving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamError {
    #[default]
    None,
    /// The kernel reported more bytes in a packet than were requested.
    KernelMalfunction,
    /// Resubmission failures exhausted the transfer pool while the stream
    /// was still active.
    TransfersWithered,
}
