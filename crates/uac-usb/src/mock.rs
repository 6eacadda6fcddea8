//! Scriptable in-memory backend for tests.
//!
//! A [`MockDevice`] is described by a [`ConfigView`] built from the same
//! descriptor bytes a real device would publish. Its handle records every
//! claim, alt-setting change and control transfer, answers control reads
//! from a scripted FIFO, and drives isochronous completions from a small
//! worker thread: a configured number of transfers complete successfully,
//! then every further service reports a terminal status. Submission
//! failures can be injected by capping the number of accepted submits.
//!
//! Always compiled so integration tests of dependent crates can use it;
//! hidden from the public docs.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::debug;
use parking_lot::{Condvar, Mutex};

use uac_proto::view::ConfigView;

use crate::device::{UsbContext, UsbDevice, UsbHandle};
use crate::error::{UsbError, UsbResult};
use crate::iso::{DropReason, IsoDisposition, IsoHandler, IsoTransfer, PacketView, TransferEvent, TransferStatus};

/// Behaviour script for the iso driver.
#[derive(Debug, Clone)]
pub struct IsoScript {
    /// How many transfer completions succeed before the terminal status.
    pub completions: usize,
    /// Status reported once `completions` are exhausted.
    pub final_status: TransferStatus,
    /// Total submits accepted before `submit` starts failing with
    /// `NoDevice`; `None` accepts everything.
    pub max_submits: Option<usize>,
}

impl Default for IsoScript {
    fn default() -> Self {
        Self {
            completions: usize::MAX,
            final_status: TransferStatus::NoDevice,
            max_submits: None,
        }
    }
}

/// A recorded control transfer.
#[derive(Debug, Clone)]
pub struct ControlRecord {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub data: Vec<u8>,
}

pub struct MockContext {
    devices: Vec<Arc<MockDevice>>,
}

impl MockContext {
    pub fn new(devices: Vec<Arc<MockDevice>>) -> Arc<Self> {
        Arc::new(Self { devices })
    }
}

impl UsbContext for MockContext {
    fn list_devices(&self) -> UsbResult<Vec<Arc<dyn UsbDevice>>> {
        Ok(self
            .devices
            .iter()
            .map(|d| Arc::clone(d) as Arc<dyn UsbDevice>)
            .collect())
    }

    fn wrap_fd(&self, _fd: i32) -> UsbResult<(Arc<dyn UsbDevice>, Arc<dyn UsbHandle>)> {
        let device = self
            .devices
            .first()
            .ok_or(UsbError::io("libusb_wrap_sys_device", rusb::Error::NoDevice))?;
        let handle = device.open()?;
        Ok((Arc::clone(device) as Arc<dyn UsbDevice>, handle))
    }

    fn handle_events(&self, timeout: Duration) -> UsbResult<()> {
        // completions come from the driver thread; nothing to pump
        thread::sleep(timeout.min(Duration::from_millis(5)));
        Ok(())
    }

    fn owns_event_loop(&self) -> bool {
        false
    }
}

pub struct MockDevice {
    vid: u16,
    pid: u16,
    config: ConfigView,
    /// The handle every `open` returns, so tests can inspect its records.
    handle: Arc<MockHandle>,
}

impl MockDevice {
    pub fn new(vid: u16, pid: u16, config: ConfigView) -> Arc<Self> {
        Self::with_script(vid, pid, config, IsoScript::default())
    }

    pub fn with_script(vid: u16, pid: u16, config: ConfigView, script: IsoScript) -> Arc<Self> {
        let handle = MockHandle::new(script);
        handle.set_product(&format!("Mock Audio {vid:04x}:{pid:04x}"));
        Arc::new(Self {
            vid,
            pid,
            config,
            handle,
        })
    }

    /// The handle shared by every `open` call on this device.
    pub fn handle(&self) -> Arc<MockHandle> {
        Arc::clone(&self.handle)
    }
}

impl UsbDevice for MockDevice {
    fn vendor_id(&self) -> u16 {
        self.vid
    }

    fn product_id(&self) -> u16 {
        self.pid
    }

    fn config_view(&self) -> UsbResult<ConfigView> {
        Ok(self.config.clone())
    }

    fn open(&self) -> UsbResult<Arc<dyn UsbHandle>> {
        Ok(Arc::clone(&self.handle) as Arc<dyn UsbHandle>)
    }
}

#[derive(Default)]
struct HandleLog {
    claims: Vec<u8>,
    releases: Vec<u8>,
    alt_settings: Vec<(u8, u8)>,
    controls: Vec<ControlRecord>,
}

pub struct MockHandle {
    log: Mutex<HandleLog>,
    control_in_responses: Mutex<VecDeque<Vec<u8>>>,
    fail_claims: Mutex<Vec<u8>>,
    engine: Arc<IsoEngine>,
    product: Mutex<String>,
}

impl MockHandle {
    fn new(script: IsoScript) -> Arc<Self> {
        Arc::new(Self {
            log: Mutex::new(HandleLog::default()),
            control_in_responses: Mutex::new(VecDeque::new()),
            fail_claims: Mutex::new(Vec::new()),
            engine: IsoEngine::new(script),
            product: Mutex::new(String::from("Mock Audio Device")),
        })
    }

    /// Queue the payload for the next `control_in`.
    pub fn push_control_in_response(&self, data: Vec<u8>) {
        self.control_in_responses.lock().push_back(data);
    }

    /// Make every claim of `interface` fail with `Busy`.
    pub fn fail_claim(&self, interface: u8) {
        self.fail_claims.lock().push(interface);
    }

    pub fn set_product(&self, name: &str) {
        *self.product.lock() = name.to_string();
    }

    pub fn claims(&self) -> Vec<u8> {
        self.log.lock().claims.clone()
    }

    pub fn releases(&self) -> Vec<u8> {
        self.log.lock().releases.clone()
    }

    pub fn alt_settings(&self) -> Vec<(u8, u8)> {
        self.log.lock().alt_settings.clone()
    }

    pub fn controls(&self) -> Vec<ControlRecord> {
        self.log.lock().controls.clone()
    }
}

impl UsbHandle for MockHandle {
    fn set_auto_detach_kernel_driver(&self, _enabled: bool) -> UsbResult<()> {
        Ok(())
    }

    fn claim_interface(&self, interface: u8) -> UsbResult<()> {
        if self.fail_claims.lock().contains(&interface) {
            return Err(UsbError::io("libusb_claim_interface", rusb::Error::Busy));
        }
        self.log.lock().claims.push(interface);
        Ok(())
    }

    fn release_interface(&self, interface: u8) -> UsbResult<()> {
        self.log.lock().releases.push(interface);
        Ok(())
    }

    fn set_alt_setting(&self, interface: u8, alt_setting: u8) -> UsbResult<()> {
        self.log.lock().alt_settings.push((interface, alt_setting));
        Ok(())
    }

    fn control_in(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> UsbResult<usize> {
        self.log.lock().controls.push(ControlRecord {
            request_type,
            request,
            value,
            index,
            data: Vec::new(),
        });
        let response = self.control_in_responses.lock().pop_front();
        match response {
            Some(data) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            None => {
                buf.fill(0);
                Ok(buf.len())
            }
        }
    }

    fn control_out(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        _timeout: Duration,
    ) -> UsbResult<usize> {
        self.log.lock().controls.push(ControlRecord {
            request_type,
            request,
            value,
            index,
            data: data.to_vec(),
        });
        Ok(data.len())
    }

    fn product_string(&self) -> UsbResult<String> {
        Ok(self.product.lock().clone())
    }

    fn read_string(&self, index: u8) -> UsbResult<String> {
        Ok(format!("mock string {index}"))
    }

    fn alloc_iso_transfer(
        &self,
        _endpoint: u8,
        packets: usize,
        packet_size: usize,
        _timeout: Duration,
        handler: Arc<dyn IsoHandler>,
    ) -> UsbResult<Box<dyn IsoTransfer>> {
        let slot = Arc::new(TransferSlot {
            packets,
            packet_size,
            handler,
            cancelled: AtomicBool::new(false),
        });
        Ok(Box::new(MockIsoTransfer {
            slot,
            engine: Arc::clone(&self.engine),
        }))
    }
}

struct TransferSlot {
    packets: usize,
    packet_size: usize,
    handler: Arc<dyn IsoHandler>,
    cancelled: AtomicBool,
}

struct MockIsoTransfer {
    slot: Arc<TransferSlot>,
    engine: Arc<IsoEngine>,
}

impl IsoTransfer for MockIsoTransfer {
    fn submit(&mut self) -> UsbResult<()> {
        self.slot.cancelled.store(false, Ordering::Release);
        IsoEngine::submit(&self.engine, Arc::clone(&self.slot))
    }

    fn cancel(&mut self) {
        self.slot.cancelled.store(true, Ordering::Release);
    }
}

struct EngineState {
    queue: VecDeque<Arc<TransferSlot>>,
    completions_left: usize,
    submits_left: Option<usize>,
    worker_running: bool,
    shutdown: bool,
}

struct IsoEngine {
    state: Mutex<EngineState>,
    wakeup: Condvar,
    final_status: TransferStatus,
}

impl IsoEngine {
    fn new(script: IsoScript) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(EngineState {
                queue: VecDeque::new(),
                completions_left: script.completions,
                submits_left: script.max_submits,
                worker_running: false,
                shutdown: false,
            }),
            wakeup: Condvar::new(),
            final_status: script.final_status,
        })
    }

    fn submit(engine: &Arc<Self>, slot: Arc<TransferSlot>) -> UsbResult<()> {
        let mut state = engine.state.lock();
        if let Some(left) = &mut state.submits_left {
            if *left == 0 {
                return Err(UsbError::io("libusb_submit_transfer", rusb::Error::NoDevice));
            }
            *left -= 1;
        }
        state.queue.push_back(slot);
        if !state.worker_running {
            state.worker_running = true;
            let worker = Arc::clone(engine);
            thread::spawn(move || worker.run());
        }
        drop(state);
        engine.wakeup.notify_one();
        Ok(())
    }

    fn run(self: Arc<Self>) {
        debug!("mock iso driver started");
        loop {
            let slot = {
                let mut state = self.state.lock();
                loop {
                    if state.shutdown {
                        return;
                    }
                    if let Some(slot) = state.queue.pop_front() {
                        break slot;
                    }
                    // park until the next submit; bounded so the thread
                    // also exits once its engine is abandoned
                    let timed_out = self
                        .wakeup
                        .wait_for(&mut state, Duration::from_millis(50))
                        .timed_out();
                    if timed_out && Arc::strong_count(&self) == 1 {
                        debug!("mock iso driver stopped");
                        return;
                    }
                }
            };
            self.service(slot);
        }
    }

    fn service(&self, slot: Arc<TransferSlot>) {
        let status = if slot.cancelled.load(Ordering::Acquire) {
            TransferStatus::Cancelled
        } else {
            let mut state = self.state.lock();
            if state.completions_left > 0 {
                state.completions_left -= 1;
                TransferStatus::Completed
            } else {
                self.final_status
            }
        };

        let disposition = if status == TransferStatus::Completed {
            let buffer: Vec<u8> = (0..slot.packets * slot.packet_size)
                .map(|i| i as u8)
                .collect();
            let views: Vec<PacketView<'_>> = (0..slot.packets)
                .map(|i| PacketView {
                    ok: true,
                    requested: slot.packet_size,
                    actual: slot.packet_size,
                    data: &buffer[i * slot.packet_size..(i + 1) * slot.packet_size],
                })
                .collect();
            slot.handler.on_transfer(&TransferEvent {
                status,
                packets: &views,
            })
        } else {
            slot.handler.on_transfer(&TransferEvent {
                status,
                packets: &[],
            })
        };

        match disposition {
            IsoDisposition::Resubmit => {
                let resubmit = {
                    let mut state = self.state.lock();
                    if let Some(left) = &mut state.submits_left {
                        if *left == 0 {
                            Err(UsbError::io("libusb_submit_transfer", rusb::Error::NoDevice))
                        } else {
                            *left -= 1;
                            state.queue.push_back(Arc::clone(&slot));
                            Ok(())
                        }
                    } else {
                        state.queue.push_back(Arc::clone(&slot));
                        Ok(())
                    }
                };
                if let Err(err) = resubmit {
                    slot.handler.on_dropped(DropReason::ResubmitFailed(err));
                }
            }
            IsoDisposition::Drop => {
                let reason = if status.is_terminal() {
                    DropReason::Terminal(status)
                } else {
                    DropReason::Requested
                };
                slot.handler.on_dropped(reason);
            }
        }
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        let mut state = self.engine.state.lock();
        state.shutdown = true;
        drop(state);
        self.engine.wakeup.notify_all();
    }
}
