//! Backend traits: the USB capabilities the library needs from whatever
//! talks to the bus.
//!
//! Everything is object-safe and handed around as `Arc<dyn …>`, so the
//! production libusb backend and the test mock are interchangeable.

use std::sync::Arc;
use std::time::Duration;

use uac_proto::view::ConfigView;

use crate::error::UsbResult;
use crate::iso::{IsoHandler, IsoTransfer};

/// A USB library context: enumeration, fd adoption and the event pump.
pub trait UsbContext: Send + Sync {
    fn list_devices(&self) -> UsbResult<Vec<Arc<dyn UsbDevice>>>;

    /// Adopt an already-opened OS file descriptor (Android-style handoff)
    /// and return both the device it belongs to and the open handle.
    fn wrap_fd(&self, fd: i32) -> UsbResult<(Arc<dyn UsbDevice>, Arc<dyn UsbHandle>)>;

    /// Run one round of event handling, waiting at most `timeout`.
    fn handle_events(&self, timeout: Duration) -> UsbResult<()>;

    /// True when this backend has a live event loop that someone must
    /// drive through [`UsbContext::handle_events`]. Backends that deliver
    /// completions on their own (the mock) or are pumped by the caller
    /// report `false`, and the owning context spawns no pump thread for
    /// them.
    fn owns_event_loop(&self) -> bool;
}

/// An enumerated (not necessarily open) device.
pub trait UsbDevice: Send + Sync {
    fn vendor_id(&self) -> u16;
    fn product_id(&self) -> u16;

    /// Snapshot of the active configuration descriptor with the
    /// class-specific `extra` trailers the audio parser feeds on.
    fn config_view(&self) -> UsbResult<ConfigView>;

    fn open(&self) -> UsbResult<Arc<dyn UsbHandle>>;
}

/// An open device handle. Closing happens when the last reference drops.
pub trait UsbHandle: Send + Sync {
    fn set_auto_detach_kernel_driver(&self, enabled: bool) -> UsbResult<()>;

    fn claim_interface(&self, interface: u8) -> UsbResult<()>;
    fn release_interface(&self, interface: u8) -> UsbResult<()>;
    fn set_alt_setting(&self, interface: u8, alt_setting: u8) -> UsbResult<()>;

    fn control_in(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> UsbResult<usize>;

    fn control_out(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> UsbResult<usize>;

    /// The device's product string descriptor.
    fn product_string(&self) -> UsbResult<String>;

    /// An arbitrary string descriptor by index.
    fn read_string(&self, index: u8) -> UsbResult<String>;

    /// Allocate one isochronous transfer of `packets` equal slots of
    /// `packet_size` bytes against `endpoint`. Completions go to
    /// `handler` on the event thread; see [`IsoTransfer`] for the
    /// lifetime contract.
    fn alloc_iso_transfer(
        &self,
        endpoint: u8,
        packets: usize,
        packet_size: usize,
        timeout: Duration,
        handler: Arc<dyn IsoHandler>,
    ) -> UsbResult<Box<dyn IsoTransfer>>;
}
