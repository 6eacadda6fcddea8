//! The isochronous streaming engine.
//!
//! A stream handle owns a fixed pool of in-flight transfers. Completions
//! arrive on the USB event thread, are depacketised and handed to the
//! user callback, then resubmitted while the stream is active. `stop`
//! cancels the pool and blocks until every transfer has drained.
//!
//! The user callback runs on the USB event thread: packets arrive
//! back-to-back in submission order and never from two threads at once
//! for a given handle. The callback must not call back into the handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use log::{debug, warn};
use parking_lot::{Condvar, Mutex};

use uac_proto::codec::write_u24_le;
use uac_proto::protocol::{REQ_SET_CUR, REQ_TYPE_EP_SET, SAMPLING_FREQ_CONTROL};
use uac_proto::AltSetting;
use uac_usb::{
    DropReason, IsoDisposition, IsoHandler, IsoTransfer, TransferEvent, TransferStatus, UsbHandle,
};

use crate::error::{StreamError, UacError, UacResult};

/// Transfers kept in flight per stream.
pub const NUM_ISO_TRANSFERS: usize = 8;

const CONTROL_TIMEOUT: Duration = Duration::from_secs(1);
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(1);

/// Receives `(packet bytes)` for every delivered isochronous packet.
pub type StreamCallback = Box<dyn FnMut(&[u8]) + Send>;

/// State shared between the caller thread and the USB event thread.
struct StreamShared {
    usb: Arc<dyn UsbHandle>,
    /// The streaming interface this handle claimed.
    interface_number: u8,
    /// The audio-control interface claimed on the handle's behalf.
    control_interface: u8,
    alt_setting: AltSetting,
    active: AtomicBool,
    in_flight: Mutex<usize>,
    drained: Condvar,
    error: Mutex<StreamError>,
    callback: Mutex<StreamCallback>,
    /// Channel-swap quirk: bytes still to consume from the head of the
    /// stream before delivery starts.
    offset: AtomicUsize,
    swap_channels: bool,
    target_sample_rate: AtomicU32,
}

impl StreamShared {
    fn record_error(&self, error: StreamError) {
        let mut slot = self.error.lock();
        if *slot == StreamError::None {
            *slot = error;
        }
    }
}

impl IsoHandler for StreamShared {
    fn on_transfer(&self, event: &TransferEvent<'_>) -> IsoDisposition {
        match event.status {
            TransferStatus::Completed => {
                for packet in event.packets {
                    if !packet.ok {
                        continue;
                    }
                    if packet.actual > packet.requested {
                        warn!(
                            "packet reports {} bytes for a {}-byte slot",
                            packet.actual, packet.requested
                        );
                        self.record_error(StreamError::KernelMalfunction);
                        return IsoDisposition::Drop;
                    }
                    if packet.actual == 0 {
                        continue;
                    }
                    let mut data = packet.data;
                    let pending = self.offset.load(Ordering::Acquire);
                    if pending > 0 {
                        let skip = pending.min(data.len());
                        self.offset.fetch_sub(skip, Ordering::AcqRel);
                        data = &data[skip..];
                    }
                    if data.is_empty() {
                        continue;
                    }
                    let mut callback = self.callback.lock();
                    (*callback)(data);
                }
                if self.active.load(Ordering::Acquire) {
                    IsoDisposition::Resubmit
                } else {
                    IsoDisposition::Drop
                }
            }
            // a timed-out transfer goes straight back on the wire
            TransferStatus::TimedOut => {
                if self.active.load(Ordering::Acquire) {
                    IsoDisposition::Resubmit
                } else {
                    IsoDisposition::Drop
                }
            }
            status => {
                warn!("finish transfer due to {status:?}");
                IsoDisposition::Drop
            }
        }
    }

    fn on_dropped(&self, reason: DropReason) {
        match &reason {
            DropReason::ResubmitFailed(err) => {
                debug!("transfer resubmit failed: {err}");
                if self.active.load(Ordering::Acquire) {
                    self.record_error(StreamError::TransfersWithered);
                }
            }
            DropReason::Terminal(status) => debug!("transfer ended by {status:?}"),
            DropReason::Requested => {}
        }
        let mut count = self.in_flight.lock();
        *count = count.saturating_sub(1);
        debug!("drop transfer, {} left in flight", *count);
        drop(count);
        self.drained.notify_all();
    }
}

/// A handle to an opened audio stream.
pub struct StreamHandle {
    shared: Arc<StreamShared>,
    transfers: Mutex<Vec<Box<dyn IsoTransfer>>>,
}

impl StreamHandle {
    pub(crate) fn new(
        usb: Arc<dyn UsbHandle>,
        control_interface: u8,
        interface_number: u8,
        alt_setting: AltSetting,
        sample_rate: u32,
        swap_channels: bool,
        callback: StreamCallback,
    ) -> Self {
        let first_rate = alt_setting
            .format
            .rates()
            .map(|r| r.first())
            .unwrap_or_default();
        let target = if sample_rate == 0 { first_rate } else { sample_rate };
        Self {
            shared: Arc::new(StreamShared {
                usb,
                interface_number,
                control_interface,
                alt_setting,
                active: AtomicBool::new(false),
                in_flight: Mutex::new(0),
                drained: Condvar::new(),
                error: Mutex::new(StreamError::None),
                callback: Mutex::new(callback),
                offset: AtomicUsize::new(0),
                swap_channels,
                target_sample_rate: AtomicU32::new(target),
            }),
            transfers: Mutex::new(Vec::new()),
        }
    }

    /// Program the endpoint (when it supports it), activate the alternate
    /// setting and fill the transfer pool.
    pub(crate) fn start(&self, burst: usize) -> UacResult<()> {
        let shared = &self.shared;
        let endpoint = &shared.alt_setting.endpoint;
        let packet_size = endpoint.max_packet_size as usize;
        let total = burst * packet_size;
        debug!(
            "configure iso packets: wMaxPacketSize={}, total_size={total}",
            endpoint.max_packet_size
        );

        if endpoint.has_sampling_freq_control() {
            self.write_sampling_freq(shared.target_sample_rate.load(Ordering::Relaxed))?;
        }

        debug!(
            "set_altsetting {} at intf({}) ep 0x{:x}",
            shared.alt_setting.index, shared.interface_number, endpoint.address
        );
        shared
            .usb
            .set_alt_setting(shared.interface_number, shared.alt_setting.index)?;

        // re-arm the channel-swap offset on every start
        let offset = if shared.swap_channels {
            shared.alt_setting.format.subframe_size() as usize
        } else {
            0
        };
        shared.offset.store(offset, Ordering::Release);

        // completions may arrive while we are still submitting
        shared.active.store(true, Ordering::Release);

        let mut pool = self.transfers.lock();
        for i in 0..NUM_ISO_TRANSFERS {
            let mut transfer = match shared.usb.alloc_iso_transfer(
                endpoint.address,
                burst,
                packet_size,
                TRANSFER_TIMEOUT,
                Arc::clone(shared) as Arc<dyn IsoHandler>,
            ) {
                Ok(transfer) => transfer,
                Err(err) => {
                    warn!("transfer {i} allocation failed: {err}");
                    continue;
                }
            };
            *shared.in_flight.lock() += 1;
            match transfer.submit() {
                Ok(()) => pool.push(transfer),
                Err(err) => {
                    debug!("submit transfer {i}: {err}");
                    let mut count = shared.in_flight.lock();
                    *count = count.saturating_sub(1);
                }
            }
        }

        if pool.is_empty() {
            shared.active.store(false, Ordering::Release);
            let _ = shared.usb.set_alt_setting(shared.interface_number, 0);
            return Err(UacError::StreamStartFailure);
        }
        Ok(())
    }

    /// Stop streaming: cancel the pool, revert to the idle alternate
    /// setting and wait until every transfer has drained. Idempotent.
    pub fn stop(&self) {
        if !self.shared.active.swap(false, Ordering::AcqRel) {
            return;
        }
        debug!(
            "stop stream intf({}), altsetting={}",
            self.shared.interface_number, self.shared.alt_setting.index
        );
        {
            let mut pool = self.transfers.lock();
            for transfer in pool.iter_mut() {
                transfer.cancel();
            }
        }

        if let Err(err) = self.shared.usb.set_alt_setting(self.shared.interface_number, 0) {
            debug!("reverting alt setting: {err}");
        }

        let mut count = self.shared.in_flight.lock();
        while *count > 0 {
            self.shared.drained.wait(&mut count);
        }
        drop(count);

        debug!("free up transfers");
        self.transfers.lock().clear();
    }

    /// Retarget the sampling rate; the value is consumed the next time
    /// streaming starts. `0` restores the format's first declared rate.
    pub fn set_sampling_rate(&self, sampling_rate: u32) {
        let rate = if sampling_rate == 0 {
            self.shared
                .alt_setting
                .format
                .rates()
                .map(|r| r.first())
                .unwrap_or_default()
        } else {
            sampling_rate
        };
        self.shared.target_sample_rate.store(rate, Ordering::Relaxed);
    }

    /// The rate the next start will program.
    pub fn target_sampling_rate(&self) -> u32 {
        self.shared.target_sample_rate.load(Ordering::Relaxed)
    }

    /// Non-fatal condition recorded by the transfer pool, if any.
    pub fn check_streaming_error(&self) -> StreamError {
        *self.shared.error.lock()
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    fn write_sampling_freq(&self, sampling_rate: u32) -> UacResult<()> {
        let endpoint = self.shared.alt_setting.endpoint.address;
        debug!("set sampling frequency {sampling_rate} on ep 0x{endpoint:x}");
        self.shared.usb.control_out(
            REQ_TYPE_EP_SET,
            REQ_SET_CUR,
            (SAMPLING_FREQ_CONTROL as u16) << 8,
            endpoint as u16,
            &write_u24_le(sampling_rate),
            CONTROL_TIMEOUT,
        )?;
        Ok(())
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.stop();
        debug!(
            "destroy stream handle and release intf({})",
            self.shared.interface_number
        );
        if let Err(err) = self.shared.usb.release_interface(self.shared.interface_number) {
            debug!("releasing stream interface: {err}");
        }
        if let Err(err) = self.shared.usb.release_interface(self.shared.control_interface) {
            debug!("releasing control interface: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use uac_proto::view::ConfigView;
    use uac_proto::{FormatSpec, IsoEndpoint, RateSpec};
    use uac_usb::PacketView;
    use uac_usb::mock::MockDevice;

    use crate::error::StreamError;

    fn test_alt_setting() -> AltSetting {
        AltSetting {
            index: 1,
            terminal_link: 1,
            delay: 1,
            format_tag: 0x0001,
            format: FormatSpec::TypeI {
                channels: 2,
                subframe_size: 2,
                bit_resolution: 16,
                rates: RateSpec::Discrete(vec![44_100, 48_000]),
            },
            endpoint: IsoEndpoint {
                address: 0x81,
                max_packet_size: 96,
                attributes: 0x01,
                lock_delay_units: 0,
                lock_delay: 0,
            },
        }
    }

    fn test_handle(swap_channels: bool, counter: Arc<Mutex<Vec<usize>>>) -> StreamHandle {
        let device = MockDevice::new(0x1234, 0x0001, ConfigView::default());
        let usb: Arc<dyn UsbHandle> = device.handle();
        StreamHandle::new(
            usb,
            0,
            1,
            test_alt_setting(),
            48_000,
            swap_channels,
            Box::new(move |packet: &[u8]| counter.lock().push(packet.len())),
        )
    }

    #[test]
    fn test_kernel_malfunction_drops_the_transfer() {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let handle = test_handle(false, Arc::clone(&delivered));
        handle.shared.active.store(true, Ordering::Release);

        let data = [0u8; 96];
        let event = TransferEvent {
            status: TransferStatus::Completed,
            packets: &[PacketView {
                ok: true,
                requested: 96,
                actual: 97, // more than the slot holds
                data: &data,
            }],
        };
        assert_eq!(handle.shared.on_transfer(&event), IsoDisposition::Drop);
        assert_eq!(handle.check_streaming_error(), StreamError::KernelMalfunction);
        assert!(delivered.lock().is_empty());
    }

    #[test]
    fn test_delivery_skips_empty_and_failed_packets() {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let handle = test_handle(false, Arc::clone(&delivered));
        handle.shared.active.store(true, Ordering::Release);

        let data = [0u8; 96];
        let event = TransferEvent {
            status: TransferStatus::Completed,
            packets: &[
                PacketView { ok: true, requested: 96, actual: 96, data: &data },
                PacketView { ok: true, requested: 96, actual: 0, data: &[] },
                PacketView { ok: false, requested: 96, actual: 96, data: &data },
                PacketView { ok: true, requested: 96, actual: 48, data: &data[..48] },
            ],
        };
        assert_eq!(handle.shared.on_transfer(&event), IsoDisposition::Resubmit);
        assert_eq!(*delivered.lock(), vec![96, 48]);
    }

    #[test]
    fn test_quirk_offset_spans_packets() {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let handle = test_handle(true, Arc::clone(&delivered));
        handle.shared.active.store(true, Ordering::Release);
        // three bytes to consume: one whole packet plus one byte
        handle.shared.offset.store(3, Ordering::Release);

        let first = [0u8; 2];
        let second = [0u8; 96];
        let event = TransferEvent {
            status: TransferStatus::Completed,
            packets: &[
                PacketView { ok: true, requested: 96, actual: 2, data: &first },
                PacketView { ok: true, requested: 96, actual: 96, data: &second },
            ],
        };
        handle.shared.on_transfer(&event);
        assert_eq!(*delivered.lock(), vec![95]);
        assert_eq!(handle.shared.offset.load(Ordering::Acquire), 0);
    }

    #[test]
    fn test_terminal_status_drops_without_delivery() {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let handle = test_handle(false, Arc::clone(&delivered));
        handle.shared.active.store(true, Ordering::Release);

        for status in [
            TransferStatus::Cancelled,
            TransferStatus::Error,
            TransferStatus::Stall,
            TransferStatus::NoDevice,
            TransferStatus::Overflow,
        ] {
            let event = TransferEvent { status, packets: &[] };
            assert_eq!(handle.shared.on_transfer(&event), IsoDisposition::Drop);
        }
        assert!(delivered.lock().is_empty());
        assert_eq!(handle.check_streaming_error(), StreamError::None);
    }

    #[test]
    fn test_inactive_stream_drops_completed_transfers() {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let handle = test_handle(false, Arc::clone(&delivered));

        let event = TransferEvent {
            status: TransferStatus::Completed,
            packets: &[],
        };
        assert_eq!(handle.shared.on_transfer(&event), IsoDisposition::Drop);
    }

    #[test]
    fn test_on_dropped_notifies_the_drain() {
        let handle = test_handle(false, Arc::new(Mutex::new(Vec::new())));
        *handle.shared.in_flight.lock() = 3;

        handle.shared.on_dropped(DropReason::Requested);
        assert_eq!(*handle.shared.in_flight.lock(), 2);

        // a terminal status decrements without flagging the pool
        handle.shared.on_dropped(DropReason::Terminal(TransferStatus::NoDevice));
        assert_eq!(*handle.shared.in_flight.lock(), 1);
        assert_eq!(handle.check_streaming_error(), StreamError::None);

        // a resubmit failure while inactive does not flag the pool
        handle.shared.on_dropped(DropReason::ResubmitFailed(
            uac_usb::UsbError::io("libusb_submit_transfer", rusb_no_device()),
        ));
        assert_eq!(*handle.shared.in_flight.lock(), 0);
        assert_eq!(handle.check_streaming_error(), StreamError::None);

        // while active it does
        handle.shared.active.store(true, Ordering::Release);
        handle.shared.on_dropped(DropReason::ResubmitFailed(
            uac_usb::UsbError::io("libusb_submit_transfer", rusb_no_device()),
        ));
        assert_eq!(handle.check_streaming_error(), StreamError::TransfersWithered);
    }

    fn rusb_no_device() -> rusb::Error {
        rusb::Error::NoDevice
    }
}
