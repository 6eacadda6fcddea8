//! Library context: USB backend ownership and the event pump.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, error};
use parking_lot::Mutex;

use uac_usb::{LibusbBackend, UsbContext};

use crate::device::{Device, DeviceHandle};
use crate::error::UacResult;

const EVENT_TIMEOUT: Duration = Duration::from_secs(1);

struct ContextInner {
    usb: Arc<dyn UsbContext>,
    alive: Arc<AtomicBool>,
    event_thread: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Release);
        if let Some(thread) = self.event_thread.lock().take() {
            debug!("joining usb event thread");
            let _ = thread.join();
        }
    }
}

/// Owns the USB backend and, for a private backend, the thread pumping
/// its events. Cheap to clone; the last clone tears everything down.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Create a context with a private libusb backend; a dedicated event
    /// thread pumps it.
    pub fn new() -> UacResult<Self> {
        Ok(Self::from_backend(Arc::new(LibusbBackend::new()?)))
    }

    /// Create a context over a caller-supplied backend.
    ///
    /// An event thread is spawned only when the backend reports a live
    /// event loop through [`UsbContext::owns_event_loop`]; backends that
    /// are pumped by the caller, and the mock, report `false`.
    pub fn with_backend(usb: Arc<dyn UsbContext>) -> Self {
        Self::from_backend(usb)
    }

    fn from_backend(usb: Arc<dyn UsbContext>) -> Self {
        let alive = Arc::new(AtomicBool::new(usb.owns_event_loop()));
        let thread = if usb.owns_event_loop() {
            let usb = Arc::clone(&usb);
            let alive = Arc::clone(&alive);
            Some(std::thread::spawn(move || {
                debug!("usb event thread started");
                while alive.load(Ordering::Acquire) {
                    if let Err(err) = usb.handle_events(EVENT_TIMEOUT) {
                        error!("usb event handling failed: {err}");
                        break;
                    }
                }
                debug!("usb event thread stopped");
            }))
        } else {
            None
        };

        Self {
            inner: Arc::new(ContextInner {
                usb,
                alive,
                event_thread: Mutex::new(thread),
            }),
        }
    }

    /// Every device on the bus that scans as a UAC 1.0 audio function.
    /// Devices that fail to scan are skipped.
    pub fn query_all_devices(&self) -> UacResult<Vec<Device>> {
        let mut devices = Vec::new();
        for usb_device in self.inner.usb.list_devices()? {
            let id = format!(
                "{:04x}:{:04x}",
                usb_device.vendor_id(),
                usb_device.product_id()
            );
            match Device::scan(usb_device) {
                Ok(device) => devices.push(device),
                Err(err) => debug!("skipping device {id}: {err}"),
            }
        }
        Ok(devices)
    }

    /// Adopt an already-opened file descriptor (sandboxed hosts hand the
    /// library a pre-authorised fd). Fails with the scan error when the
    /// descriptor stream is not a usable audio function; the fd's handle
    /// is closed in that case.
    pub fn wrap(&self, fd: i32) -> UacResult<DeviceHandle> {
        let (usb_device, usb_handle) = self.inner.usb.wrap_fd(fd)?;
        let device = Device::scan(usb_device)?;
        Ok(DeviceHandle::new(device, usb_handle))
    }
}
