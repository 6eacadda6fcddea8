//! Snapshot of the standard configuration descriptor handed in by the USB
//! layer.
//!
//! The parser never touches the bus: it consumes this plain-data view,
//! which a backend fills from its own descriptor readout and tests fill
//! from byte fixtures.

/// Active configuration of a device: all interfaces with their alternate
/// settings.
#[derive(Debug, Clone, Default)]
pub struct ConfigView {
    pub interfaces: Vec<InterfaceView>,
}

/// One interface as an ordered list of alternate settings (index 0 first).
#[derive(Debug, Clone, Default)]
pub struct InterfaceView {
    pub alt_settings: Vec<AltSettingView>,
}

/// One alternate setting of an interface, with the class-specific `extra`
/// trailer that follows the standard interface descriptor.
#[derive(Debug, Clone, Default)]
pub struct AltSettingView {
    pub interface_number: u8,
    pub alt_setting: u8,
    pub interface_class: u8,
    pub interface_subclass: u8,
    pub interface_protocol: u8,
    pub name_index: u8,
    pub extra: Vec<u8>,
    pub endpoints: Vec<EndpointView>,
}

/// A standard endpoint descriptor plus its class-specific trailer.
#[derive(Debug, Clone, Default)]
pub struct EndpointView {
    pub address: u8,
    pub attributes: u8,
    pub max_packet_size: u16,
    pub extra: Vec<u8>,
}
