//! Device wrapper and open-handle operations.
//!
//! A [`Device`] is built during the context scan: its descriptors are
//! parsed once, quirks applied, routes derived, and the result is
//! immutable for the device's lifetime. A [`DeviceHandle`] adds the
//! operations that need the device open: streaming, feature-unit control
//! reads, string descriptors.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use log::debug;

use uac_proto::protocol::{
    FU_MUTE_CONTROL, FU_VOLUME_CONTROL, REQ_GET_CUR, REQ_TYPE_IF_GET,
};
use uac_proto::topology::NodeKind;
use uac_proto::{
    AudioControl, AudioRoute, RateSpec, StreamConfig, StreamInterface, parse_device,
};
use uac_usb::{UsbDevice, UsbHandle};

use crate::error::{UacError, UacResult};
use crate::quirks::{QuirkFlags, apply_quirks};
use crate::stream::{StreamCallback, StreamHandle};

const CONTROL_TIMEOUT: Duration = Duration::from_secs(1);

/// Channel 0 addresses a feature unit's master controls.
const MASTER_CHANNEL: u16 = 0;

struct DeviceInner {
    usb: Arc<dyn UsbDevice>,
    audio: AudioControl,
    quirks: QuirkFlags,
}

/// A scanned USB audio device.
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

impl Device {
    /// Parse the device's configuration descriptor into the audio model.
    pub(crate) fn scan(usb: Arc<dyn UsbDevice>) -> UacResult<Self> {
        let view = usb.config_view()?;
        let mut audio = parse_device(&view)?;
        let quirks = apply_quirks(usb.vendor_id(), usb.product_id(), &mut audio);
        debug!(
            "created uac device {:04x}:{:04x} with {} route(s)",
            usb.vendor_id(),
            usb.product_id(),
            audio.routes.len()
        );
        Ok(Self {
            inner: Arc::new(DeviceInner { usb, audio, quirks }),
        })
    }

    pub fn vid(&self) -> u16 {
        self.inner.usb.vendor_id()
    }

    pub fn pid(&self) -> u16 {
        self.inner.usb.product_id()
    }

    /// The parsed audio function.
    pub fn audio_control(&self) -> &AudioControl {
        &self.inner.audio
    }

    /// The device needs the engine to realign channels by one subframe.
    pub fn has_quirk_swap_channels(&self) -> bool {
        self.inner.quirks.swap_channels
    }

    /// Routes that contain both terminal types, in parse order. Terminal
    /// types with a zero low byte act as family wildcards.
    pub fn query_audio_routes(&self, terminal_in: u16, terminal_out: u16) -> Vec<&AudioRoute> {
        self.inner
            .audio
            .routes
            .iter()
            .filter(|route| {
                route.contains_terminal(terminal_in) && route.contains_terminal(terminal_out)
            })
            .collect()
    }

    /// The streaming interface whose alternate settings link to one of
    /// the route's terminals.
    pub fn get_stream_interface(&self, route: &AudioRoute) -> UacResult<&StreamInterface> {
        let terminal_ids: Vec<u8> = route.terminal_ids().collect();
        self.inner
            .audio
            .streams
            .iter()
            .find(|stream| {
                stream
                    .alt_settings
                    .iter()
                    .any(|alt| terminal_ids.contains(&alt.terminal_link))
            })
            .ok_or(UacError::NoStreamInterface)
    }

    /// Open the device for streaming and control operations.
    pub fn open(&self) -> UacResult<DeviceHandle> {
        let usb = self.inner.usb.open()?;
        Ok(DeviceHandle {
            device: self.clone(),
            usb,
        })
    }
}

/// An open device.
pub struct DeviceHandle {
    device: Device,
    usb: Arc<dyn UsbHandle>,
}

impl DeviceHandle {
    pub(crate) fn new(device: Device, usb: Arc<dyn UsbHandle>) -> Self {
        Self { device, usb }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Close the handle. Streams started from it keep their own reference
    /// and stay valid until stopped.
    pub fn close(self) {}

    /// Let the USB layer detach any kernel driver before interface claims
    /// and reattach it afterwards.
    pub fn detach(&self) -> UacResult<()> {
        self.usb.set_auto_detach_kernel_driver(true)?;
        Ok(())
    }

    /// Human-readable device name: the product string when the device
    /// publishes one, then the audio function's own name, then vid:pid.
    pub fn get_name(&self) -> String {
        if let Ok(name) = self.usb.product_string()
            && !name.is_empty()
        {
            return name;
        }
        let name_index = self.device.audio_control().name_index;
        if name_index != 0
            && let Ok(name) = self.usb.read_string(name_index)
            && !name.is_empty()
        {
            return name;
        }
        format!("{:04x}:{:04x}", self.device.vid(), self.device.pid())
    }

    /// Start streaming with a burst of one packet per transfer.
    pub fn start_streaming<F>(
        &self,
        stream_if: &StreamInterface,
        config: &StreamConfig,
        callback: F,
    ) -> UacResult<StreamHandle>
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        self.start_streaming_with_burst(stream_if, config, callback, 1)
    }

    /// Start streaming `burst` isochronous packets per transfer.
    ///
    /// Claims the audio-control and streaming interfaces, programs the
    /// sampling frequency when the endpoint supports it, activates the
    /// alternate setting and fills the transfer pool. Every failure path
    /// releases what was acquired.
    pub fn start_streaming_with_burst<F>(
        &self,
        stream_if: &StreamInterface,
        config: &StreamConfig,
        callback: F,
        burst: usize,
    ) -> UacResult<StreamHandle>
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        let Some(alt_setting) = stream_if.find_alt_setting(config.alt_setting) else {
            return Err(UacError::InvalidArgument(
                "alternate setting is not part of this stream interface",
            ));
        };
        if burst < 1 {
            return Err(UacError::InvalidArgument("burst must be at least 1"));
        }

        let control_interface = self.device.audio_control().interface_number;
        self.usb.claim_interface(control_interface)?;
        debug!("claim AS intf({})", stream_if.interface_number);
        if let Err(err) = self.usb.claim_interface(stream_if.interface_number) {
            let _ = self.usb.release_interface(control_interface);
            return Err(err.into());
        }

        let handle = StreamHandle::new(
            Arc::clone(&self.usb),
            control_interface,
            stream_if.interface_number,
            alt_setting.clone(),
            config.sample_rate,
            self.device.has_quirk_swap_channels(),
            Box::new(callback) as StreamCallback,
        );
        // dropping the handle on failure releases both interfaces
        handle.start(burst)?;
        Ok(handle)
    }

    /// Whether the master channel of the route's feature unit is muted.
    pub fn is_master_muted(&self, route: &AudioRoute) -> UacResult<bool> {
        let mut data = [0u8; 1];
        self.feature_control_read(route, FU_MUTE_CONTROL, &mut data)?;
        Ok(data[0] != 0)
    }

    /// Master volume of the route's feature unit, as the raw signed wire
    /// value (not normalised dB).
    pub fn get_feature_master_volume(&self, route: &AudioRoute) -> UacResult<i16> {
        let mut data = [0u8; 2];
        self.feature_control_read(route, FU_VOLUME_CONTROL, &mut data)?;
        Ok(i16::from_le_bytes(data))
    }

    fn feature_control_read(
        &self,
        route: &AudioRoute,
        selector: u8,
        buf: &mut [u8],
    ) -> UacResult<()> {
        let (unit_id, _) = route
            .feature_unit_next_to_root()
            .ok_or(UacError::NoFeatureUnit)?;
        let control_interface = self.device.audio_control().interface_number;
        self.usb.claim_interface(control_interface)?;
        let result = self.usb.control_in(
            REQ_TYPE_IF_GET,
            REQ_GET_CUR,
            ((selector as u16) << 8) | MASTER_CHANNEL,
            ((unit_id as u16) << 8) | control_interface as u16,
            buf,
            CONTROL_TIMEOUT,
        );
        let _ = self.usb.release_interface(control_interface);
        result?;
        Ok(())
    }

    /// Write a human-readable report of the audio function.
    pub fn dump(&self, out: &mut dyn Write) -> io::Result<()> {
        let audio = self.device.audio_control();
        writeln!(
            out,
            "device {:04x}:{:04x} \"{}\"",
            self.device.vid(),
            self.device.pid(),
            self.get_name()
        )?;
        writeln!(
            out,
            "audio control intf({}) bcdADC=0x{:04x}",
            audio.interface_number, audio.bcd_adc
        )?;
        for terminal in &audio.input_terminals {
            writeln!(
                out,
                "  input terminal {}: type=0x{:04x} channels={}",
                terminal.id, terminal.terminal_type, terminal.nr_channels
            )?;
        }
        for terminal in &audio.output_terminals {
            writeln!(
                out,
                "  output terminal {}: type=0x{:04x} source={}",
                terminal.id, terminal.terminal_type, terminal.source_id
            )?;
        }
        for unit in &audio.units {
            writeln!(out, "  unit {}: {:?}", unit.id, unit.kind)?;
        }
        for stream in &audio.streams {
            writeln!(out, "  streaming intf({})", stream.interface_number)?;
            for alt in &stream.alt_settings {
                let rates = alt
                    .format
                    .rates()
                    .map(|r| match r {
                        RateSpec::Continuous { lower, upper } => format!("{lower}..{upper} Hz"),
                        RateSpec::Discrete(list) => format!("{list:?} Hz"),
                    })
                    .unwrap_or_else(|| String::from("-"));
                writeln!(
                    out,
                    "    alt {}: fmt=0x{:04x} ch={} {}bit {} wMaxPacketSize={}",
                    alt.index,
                    alt.format_tag,
                    alt.format.channels(),
                    alt.format.bit_resolution(),
                    rates,
                    alt.endpoint.max_packet_size
                )?;
            }
        }
        for (i, route) in audio.routes.iter().enumerate() {
            let chain: Vec<String> = route
                .nodes()
                .iter()
                .map(|node| match &node.kind {
                    NodeKind::Output(t) => format!("out {} (0x{:04x})", t.id, t.terminal_type),
                    NodeKind::Unit(u) => format!("unit {}", u.id),
                    NodeKind::Input(t) => format!("in {} (0x{:04x})", t.id, t.terminal_type),
                })
                .collect();
            writeln!(out, "  route {i}: {}", chain.join(" < "))?;
        }
        Ok(())
    }
}
