//! Production backend over libusb, via `rusb` for the safe surface and
//! `rusb::ffi` for the isochronous transfer pool rusb does not wrap.

use std::os::raw::{c_int, c_uint, c_void};
use std::ptr::NonNull;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, warn};
use parking_lot::Mutex;
use rusb::UsbContext as _;
use rusb::ffi;
use rusb::ffi::constants::*;

use uac_proto::view::{AltSettingView, ConfigView, EndpointView, InterfaceView};

use crate::device::{UsbContext, UsbDevice, UsbHandle};
use crate::error::{UsbError, UsbResult};
use crate::iso::{DropReason, IsoDisposition, IsoHandler, IsoTransfer, PacketView, TransferEvent, TransferStatus};

/// Map a raw libusb return code to the rusb error enum.
fn error_from_code(code: c_int) -> rusb::Error {
    match code {
        LIBUSB_ERROR_IO => rusb::Error::Io,
        LIBUSB_ERROR_INVALID_PARAM => rusb::Error::InvalidParam,
        LIBUSB_ERROR_ACCESS => rusb::Error::Access,
        LIBUSB_ERROR_NO_DEVICE => rusb::Error::NoDevice,
        LIBUSB_ERROR_NOT_FOUND => rusb::Error::NotFound,
        LIBUSB_ERROR_BUSY => rusb::Error::Busy,
        LIBUSB_ERROR_TIMEOUT => rusb::Error::Timeout,
        LIBUSB_ERROR_OVERFLOW => rusb::Error::Overflow,
        LIBUSB_ERROR_PIPE => rusb::Error::Pipe,
        LIBUSB_ERROR_INTERRUPTED => rusb::Error::Interrupted,
        LIBUSB_ERROR_NO_MEM => rusb::Error::NoMem,
        LIBUSB_ERROR_NOT_SUPPORTED => rusb::Error::NotSupported,
        _ => rusb::Error::Other,
    }
}

/// The libusb-backed [`UsbContext`].
pub struct LibusbBackend {
    context: rusb::Context,
}

impl LibusbBackend {
    pub fn new() -> UsbResult<Self> {
        let context = rusb::Context::new().map_err(|e| UsbError::io("libusb_init", e))?;
        Ok(Self { context })
    }
}

impl UsbContext for LibusbBackend {
    fn list_devices(&self) -> UsbResult<Vec<Arc<dyn UsbDevice>>> {
        let list = self
            .context
            .devices()
            .map_err(|e| UsbError::io("libusb_get_device_list", e))?;
        let mut devices: Vec<Arc<dyn UsbDevice>> = Vec::new();
        for device in list.iter() {
            match device.device_descriptor() {
                Ok(descriptor) => {
                    devices.push(Arc::new(LibusbDevice { device, descriptor }));
                }
                Err(e) => warn!("skipping device without a readable descriptor: {e}"),
            }
        }
        Ok(devices)
    }

    fn wrap_fd(&self, fd: i32) -> UsbResult<(Arc<dyn UsbDevice>, Arc<dyn UsbHandle>)> {
        #[cfg(unix)]
        {
            let handle = unsafe { self.context.open_device_with_fd(fd) }
                .map_err(|e| UsbError::io("libusb_wrap_sys_device", e))?;
            let device = handle.device();
            let descriptor = device
                .device_descriptor()
                .map_err(|e| UsbError::io("libusb_get_device_descriptor", e))?;
            let wrapped: Arc<dyn UsbDevice> = Arc::new(LibusbDevice {
                device: device.clone(),
                descriptor,
            });
            let open: Arc<dyn UsbHandle> = Arc::new(LibusbHandle {
                device,
                handle: Mutex::new(handle),
            });
            Ok((wrapped, open))
        }
        #[cfg(not(unix))]
        {
            let _ = fd;
            Err(UsbError::io("libusb_wrap_sys_device", rusb::Error::NotSupported))
        }
    }

    fn handle_events(&self, timeout: Duration) -> UsbResult<()> {
        self.context
            .handle_events(Some(timeout))
            .map_err(|e| UsbError::io("libusb_handle_events", e))
    }

    fn owns_event_loop(&self) -> bool {
        // libusb only delivers transfer callbacks while someone pumps it
        true
    }
}

struct LibusbDevice {
    device: rusb::Device<rusb::Context>,
    descriptor: rusb::DeviceDescriptor,
}

impl UsbDevice for LibusbDevice {
    fn vendor_id(&self) -> u16 {
        self.descriptor.vendor_id()
    }

    fn product_id(&self) -> u16 {
        self.descriptor.product_id()
    }

    fn config_view(&self) -> UsbResult<ConfigView> {
        // prefer the active configuration, fall back to the first one
        let config = match self.device.active_config_descriptor() {
            Ok(config) => config,
            Err(_) => self
                .device
                .config_descriptor(0)
                .map_err(|e| UsbError::io("libusb_get_config_descriptor", e))?,
        };
        Ok(snapshot_config(&config))
    }

    fn open(&self) -> UsbResult<Arc<dyn UsbHandle>> {
        let handle = self
            .device
            .open()
            .map_err(|e| UsbError::io("libusb_open", e))?;
        Ok(Arc::new(LibusbHandle {
            device: self.device.clone(),
            handle: Mutex::new(handle),
        }))
    }
}

fn snapshot_config(config: &rusb::ConfigDescriptor) -> ConfigView {
    let mut view = ConfigView::default();
    for interface in config.interfaces() {
        let mut interface_view = InterfaceView::default();
        for alt in interface.descriptors() {
            let mut endpoints = Vec::new();
            for ep in alt.endpoint_descriptors() {
                endpoints.push(EndpointView {
                    address: ep.address(),
                    attributes: endpoint_attributes(&ep),
                    max_packet_size: ep.max_packet_size(),
                    extra: ep.extra().map(|e| e.to_vec()).unwrap_or_default(),
                });
            }
            interface_view.alt_settings.push(AltSettingView {
                interface_number: alt.interface_number(),
                alt_setting: alt.setting_number(),
                interface_class: alt.class_code(),
                interface_subclass: alt.sub_class_code(),
                interface_protocol: alt.protocol_code(),
                name_index: alt.description_string_index().unwrap_or(0),
                extra: alt.extra().to_vec(),
                endpoints,
            });
        }
        view.interfaces.push(interface_view);
    }
    view
}

/// Rebuild the standard `bmAttributes` byte from rusb's decoded fields.
fn endpoint_attributes(ep: &rusb::EndpointDescriptor) -> u8 {
    let transfer = match ep.transfer_type() {
        rusb::TransferType::Control => 0,
        rusb::TransferType::Isochronous => 1,
        rusb::TransferType::Bulk => 2,
        rusb::TransferType::Interrupt => 3,
    };
    let sync = match ep.sync_type() {
        rusb::SyncType::NoSync => 0,
        rusb::SyncType::Asynchronous => 1,
        rusb::SyncType::Adaptive => 2,
        rusb::SyncType::Synchronous => 3,
    };
    let usage = match ep.usage_type() {
        rusb::UsageType::Data => 0,
        rusb::UsageType::Feedback => 1,
        rusb::UsageType::FeedbackData => 2,
        rusb::UsageType::Reserved => 3,
    };
    transfer | (sync << 2) | (usage << 4)
}

struct LibusbHandle {
    device: rusb::Device<rusb::Context>,
    handle: Mutex<rusb::DeviceHandle<rusb::Context>>,
}

impl UsbHandle for LibusbHandle {
    fn set_auto_detach_kernel_driver(&self, enabled: bool) -> UsbResult<()> {
        self.handle
            .lock()
            .set_auto_detach_kernel_driver(enabled)
            .map_err(|e| UsbError::io("libusb_set_auto_detach_kernel_driver", e))
    }

    fn claim_interface(&self, interface: u8) -> UsbResult<()> {
        self.handle
            .lock()
            .claim_interface(interface)
            .map_err(|e| UsbError::io("libusb_claim_interface", e))
    }

    fn release_interface(&self, interface: u8) -> UsbResult<()> {
        self.handle
            .lock()
            .release_interface(interface)
            .map_err(|e| UsbError::io("libusb_release_interface", e))
    }

    fn set_alt_setting(&self, interface: u8, alt_setting: u8) -> UsbResult<()> {
        self.handle
            .lock()
            .set_alternate_setting(interface, alt_setting)
            .map_err(|e| UsbError::io("libusb_set_interface_alt_setting", e))
    }

    fn control_in(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> UsbResult<usize> {
        self.handle
            .lock()
            .read_control(request_type, request, value, index, buf, timeout)
            .map_err(|e| UsbError::io("libusb_control_transfer", e))
    }

    fn control_out(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> UsbResult<usize> {
        self.handle
            .lock()
            .write_control(request_type, request, value, index, data, timeout)
            .map_err(|e| UsbError::io("libusb_control_transfer", e))
    }

    fn product_string(&self) -> UsbResult<String> {
        let descriptor = self
            .device
            .device_descriptor()
            .map_err(|e| UsbError::io("libusb_get_device_descriptor", e))?;
        self.handle
            .lock()
            .read_product_string_ascii(&descriptor)
            .map_err(|e| UsbError::io("libusb_get_string_descriptor", e))
    }

    fn read_string(&self, index: u8) -> UsbResult<String> {
        self.handle
            .lock()
            .read_string_descriptor_ascii(index)
            .map_err(|e| UsbError::io("libusb_get_string_descriptor", e))
    }

    fn alloc_iso_transfer(
        &self,
        endpoint: u8,
        packets: usize,
        packet_size: usize,
        timeout: Duration,
        handler: Arc<dyn IsoHandler>,
    ) -> UsbResult<Box<dyn IsoTransfer>> {
        let raw = unsafe { ffi::libusb_alloc_transfer(packets as c_int) };
        let Some(raw) = NonNull::new(raw) else {
            return Err(UsbError::TransferAlloc {
                operation: "libusb_alloc_transfer",
            });
        };
        let mut buffer = vec![0u8; packets * packet_size].into_boxed_slice();
        let state = Box::new(TransferState {
            handler,
            packets,
            packet_size,
            in_flight: AtomicBool::new(false),
        });

        let handle_ptr = self.handle.lock().as_raw();
        unsafe {
            let transfer = raw.as_ptr();
            (*transfer).dev_handle = handle_ptr;
            (*transfer).endpoint = endpoint;
            (*transfer).transfer_type = LIBUSB_TRANSFER_TYPE_ISOCHRONOUS;
            (*transfer).timeout = timeout.as_millis() as c_uint;
            (*transfer).buffer = buffer.as_mut_ptr();
            (*transfer).length = (packets * packet_size) as c_int;
            (*transfer).num_iso_packets = packets as c_int;
            (*transfer).callback = iso_transfer_callback;
            (*transfer).user_data = &*state as *const TransferState as *mut c_void;
            let slots =
                std::slice::from_raw_parts_mut((*transfer).iso_packet_desc.as_mut_ptr(), packets);
            for slot in slots {
                slot.length = packet_size as c_uint;
            }
        }

        Ok(Box::new(LibusbIsoTransfer {
            raw,
            _buffer: buffer,
            state,
        }))
    }
}

/// State shared with the libusb callback through `user_data`.
struct TransferState {
    handler: Arc<dyn IsoHandler>,
    packets: usize,
    packet_size: usize,
    in_flight: AtomicBool,
}

struct LibusbIsoTransfer {
    raw: NonNull<ffi::libusb_transfer>,
    _buffer: Box<[u8]>,
    state: Box<TransferState>,
}

// The raw transfer is only touched from submit/cancel on the owner's
// thread and from the libusb event thread via the callback; libusb
// serialises the two.
unsafe impl Send for LibusbIsoTransfer {}

impl IsoTransfer for LibusbIsoTransfer {
    fn submit(&mut self) -> UsbResult<()> {
        self.state.in_flight.store(true, Ordering::Release);
        let code = unsafe { ffi::libusb_submit_transfer(self.raw.as_ptr()) };
        if code == LIBUSB_SUCCESS {
            Ok(())
        } else {
            self.state.in_flight.store(false, Ordering::Release);
            Err(UsbError::io("libusb_submit_transfer", error_from_code(code)))
        }
    }

    fn cancel(&mut self) {
        if self.state.in_flight.load(Ordering::Acquire) {
            let code = unsafe { ffi::libusb_cancel_transfer(self.raw.as_ptr()) };
            if code != LIBUSB_SUCCESS {
                debug!("libusb_cancel_transfer: {}", error_from_code(code));
            }
        }
    }
}

impl Drop for LibusbIsoTransfer {
    fn drop(&mut self) {
        // the pool owner drains before dropping, so the transfer is idle
        unsafe { ffi::libusb_free_transfer(self.raw.as_ptr()) };
    }
}

fn status_from_code(status: c_int) -> TransferStatus {
    match status {
        LIBUSB_TRANSFER_COMPLETED => TransferStatus::Completed,
        LIBUSB_TRANSFER_TIMED_OUT => TransferStatus::TimedOut,
        LIBUSB_TRANSFER_CANCELLED => TransferStatus::Cancelled,
        LIBUSB_TRANSFER_STALL => TransferStatus::Stall,
        LIBUSB_TRANSFER_NO_DEVICE => TransferStatus::NoDevice,
        LIBUSB_TRANSFER_OVERFLOW => TransferStatus::Overflow,
        _ => TransferStatus::Error,
    }
}

extern "system" fn iso_transfer_callback(transfer: *mut ffi::libusb_transfer) {
    // SAFETY: user_data was set to the transfer's TransferState, which the
    // owning LibusbIsoTransfer keeps alive until after the drop
    // notification below.
    let state = unsafe { &*((*transfer).user_data as *const TransferState) };
    let status = status_from_code(unsafe { (*transfer).status });

    let mut views: Vec<PacketView<'_>> = Vec::new();
    if status == TransferStatus::Completed {
        let slots = unsafe {
            std::slice::from_raw_parts((*transfer).iso_packet_desc.as_ptr(), state.packets)
        };
        let buffer = unsafe { (*transfer).buffer };
        for (i, slot) in slots.iter().enumerate() {
            let requested = slot.length as usize;
            let actual = slot.actual_length as usize;
            let data = unsafe {
                std::slice::from_raw_parts(
                    buffer.add(i * state.packet_size),
                    actual.min(requested),
                )
            };
            views.push(PacketView {
                ok: slot.status == LIBUSB_TRANSFER_COMPLETED,
                requested,
                actual,
                data,
            });
        }
    }

    let event = TransferEvent {
        status,
        packets: &views,
    };
    match state.handler.on_transfer(&event) {
        IsoDisposition::Resubmit => {
            let code = unsafe { ffi::libusb_submit_transfer(transfer) };
            if code != LIBUSB_SUCCESS {
                state.in_flight.store(false, Ordering::Release);
                state.handler.on_dropped(DropReason::ResubmitFailed(UsbError::io(
                    "libusb_submit_transfer",
                    error_from_code(code),
                )));
            }
        }
        IsoDisposition::Drop => {
            state.in_flight.store(false, Ordering::Release);
            let reason = if status.is_terminal() {
                DropReason::Terminal(status)
            } else {
                DropReason::Requested
            };
            state.handler.on_dropped(reason);
        }
    }
}
