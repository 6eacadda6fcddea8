//! uac: USB Audio Class 1.0 host library
//!
//! Discovers UAC 1.0 devices, exposes their audio topology as queryable
//! routes, and streams uncompressed PCM over isochronous endpoints.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────┐    ┌──────────┐    ┌───────────────┐    ┌──────────────┐
//! │ Context │───▶│ Device   │───▶│ DeviceHandle  │───▶│ StreamHandle │
//! │         │    │          │    │               │    │              │
//! │ - scan  │    │ - routes │    │ - controls    │    │ - iso pool   │
//! │ - pump  │    │ - caps   │    │ - streaming   │    │ - callback   │
//! └─────────┘    └──────────┘    └───────────────┘    └──────────────┘
//! ```
//!
//! Stream callbacks run on the USB event thread; see [`StreamHandle`].

mod context;
mod device;
mod error;
mod quirks;
mod stream;

pub use context::Context;
pub use device::{Device, DeviceHandle};
pub use error::{StreamError, UacError, UacResult};
pub use stream::{NUM_ISO_TRANSFERS, StreamCallback, StreamHandle};

// the descriptor model and wire constants are part of the public surface
pub use uac_proto::{
    AltSetting, AudioControl, AudioRoute, FeatureUnit, FormatSpec, InputTerminal, IsoEndpoint,
    NodeKind, OutputTerminal, RateSpec, RouteNode, StreamConfig, StreamInterface, Unit, UnitKind,
    matches_terminal, protocol,
};
pub use uac_usb::{LibusbBackend, UsbContext, UsbDevice, UsbHandle};
