//! Isochronous transfer surface shared by all backends.
//!
//! A backend hands out [`IsoTransfer`] objects; completions are delivered
//! on the backend's event thread to the [`IsoHandler`] registered at
//! allocation time. The handler decides per completion whether the
//! transfer goes back on the wire or leaves the pool; the backend reports
//! every departure through [`IsoHandler::on_dropped`] so the pool owner
//! can keep an exact in-flight count.

use crate::error::UsbError;

/// Final status of a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Completed,
    Error,
    TimedOut,
    Cancelled,
    Stall,
    NoDevice,
    Overflow,
}

impl TransferStatus {
    /// Statuses that end a transfer's life; completed and timed-out
    /// transfers can go back on the wire.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferStatus::Cancelled
                | TransferStatus::Error
                | TransferStatus::Stall
                | TransferStatus::NoDevice
                | TransferStatus::Overflow
        )
    }
}

/// One isochronous packet of a completed transfer.
///
/// `data` is clamped to `min(actual, requested)` bytes; `actual` is the
/// raw length the kernel reported and may exceed `requested` on a
/// misbehaving stack.
#[derive(Debug)]
pub struct PacketView<'a> {
    pub ok: bool,
    pub requested: usize,
    pub actual: usize,
    pub data: &'a [u8],
}

/// A transfer completion. `packets` is empty unless the transfer
/// completed.
#[derive(Debug)]
pub struct TransferEvent<'a> {
    pub status: TransferStatus,
    pub packets: &'a [PacketView<'a>],
}

/// What the handler wants done with a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsoDisposition {
    Resubmit,
    Drop,
}

/// Why a transfer left the pool.
#[derive(Debug, Clone, Copy)]
pub enum DropReason {
    /// A terminal status ended the transfer; carries that status.
    Terminal(TransferStatus),
    /// The handler returned [`IsoDisposition::Drop`] for a live transfer.
    Requested,
    /// The handler asked for a resubmit and the backend could not deliver.
    ResubmitFailed(UsbError),
}

/// Completion sink for a pool of isochronous transfers.
///
/// Both callbacks run on the backend's event thread and must not block on
/// locks the submitting thread holds across submit/cancel calls.
pub trait IsoHandler: Send + Sync {
    fn on_transfer(&self, event: &TransferEvent<'_>) -> IsoDisposition;
    fn on_dropped(&self, reason: DropReason);
}

/// One allocated isochronous transfer with its packet buffer.
///
/// Dropping the object frees the buffer; the owner must keep it alive
/// until the matching [`IsoHandler::on_dropped`] has been delivered.
pub trait IsoTransfer: Send {
    fn submit(&mut self) -> Result<(), UsbError>;
    /// Ask the backend to cancel an in-flight transfer; completion still
    /// arrives through the handler. Errors are ignored by design of the
    /// drain path.
    fn cancel(&mut self);
}
