//! uac-usb: the USB access layer behind the audio library
//!
//! Defines the object-safe backend traits ([`UsbContext`], [`UsbDevice`],
//! [`UsbHandle`], [`IsoTransfer`]) the rest of the stack is written
//! against, a production implementation over libusb, and a scriptable
//! mock for tests.

mod device;
mod error;
mod iso;
mod libusb;

#[doc(hidden)]
pub mod mock;

pub use device::{UsbContext, UsbDevice, UsbHandle};
pub use error::{UsbError, UsbResult};
pub use iso::{
    DropReason, IsoDisposition, IsoHandler, IsoTransfer, PacketView, TransferEvent, TransferStatus,
};
pub use libusb::LibusbBackend;
