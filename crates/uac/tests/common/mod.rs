//! Descriptor fixtures shared by the integration suites: byte-exact
//! class-specific records assembled into the configuration snapshot a
//! real microphone-style device would publish.

#![allow(dead_code)]

use uac_proto::codec::write_u24_le;
use uac_proto::view::{AltSettingView, ConfigView, EndpointView, InterfaceView};

pub const AC_INTERFACE: u8 = 0;
pub const AS_INTERFACE: u8 = 1;
pub const EP_ADDRESS: u8 = 0x81;
pub const MAX_PACKET: u16 = 96;

pub const OUTPUT_TERMINAL_ID: u8 = 1;
pub const INPUT_TERMINAL_ID: u8 = 2;
pub const FEATURE_UNIT_ID: u8 = 3;

fn input_terminal(id: u8, terminal_type: u16, channels: u8) -> Vec<u8> {
    let t = terminal_type.to_le_bytes();
    vec![0x0C, 0x24, 0x02, id, t[0], t[1], 0x00, channels, 0x00, 0x00, 0x00, 0x00]
}

fn output_terminal(id: u8, terminal_type: u16, source_id: u8) -> Vec<u8> {
    let t = terminal_type.to_le_bytes();
    vec![0x09, 0x24, 0x03, id, t[0], t[1], 0x00, source_id, 0x00]
}

fn feature_unit(id: u8, source_id: u8) -> Vec<u8> {
    // master + one channel, mute|volume on the master
    vec![0x09, 0x24, 0x06, id, source_id, 0x01, 0x03, 0x00, 0x00]
}

fn as_general(terminal_link: u8, format_tag: u16) -> Vec<u8> {
    let f = format_tag.to_le_bytes();
    vec![0x07, 0x24, 0x01, terminal_link, 0x01, f[0], f[1]]
}

fn format_type_i(channels: u8, subframe: u8, bits: u8, rates: &[u32]) -> Vec<u8> {
    let mut record = vec![
        (8 + rates.len() * 3) as u8,
        0x24,
        0x02,
        0x01,
        channels,
        subframe,
        bits,
        rates.len() as u8,
    ];
    for rate in rates {
        record.extend_from_slice(&write_u24_le(*rate));
    }
    record
}

fn iso_endpoint(address: u8, max_packet_size: u16, freq_control: bool) -> EndpointView {
    EndpointView {
        address,
        attributes: 0x05, // isochronous, async
        max_packet_size,
        extra: vec![
            0x07,
            0x25,
            0x01,
            if freq_control { 0x01 } else { 0x00 },
            0x00,
            0x00,
            0x00,
        ],
    }
}

/// The audio-control trailer: header + mic terminal + feature unit +
/// USB-streaming output terminal.
fn ac_extra() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend(input_terminal(INPUT_TERMINAL_ID, 0x0201, 1));
    body.extend(feature_unit(FEATURE_UNIT_ID, INPUT_TERMINAL_ID));
    body.extend(output_terminal(OUTPUT_TERMINAL_ID, 0x0101, FEATURE_UNIT_ID));

    let total = (9 + body.len()) as u16;
    let t = total.to_le_bytes();
    let mut extra = vec![0x09, 0x24, 0x01, 0x00, 0x01, t[0], t[1], 0x01, AS_INTERFACE];
    extra.extend(body);
    extra
}

/// A microphone-style device: one capture route, one streaming interface
/// with a stereo 16-bit PCM alternate setting.
pub fn mic_config(rates: &[u32]) -> ConfigView {
    device_config(2, rates)
}

/// Same device with a mono format, for quirk coverage.
pub fn mono_mic_config(rates: &[u32]) -> ConfigView {
    device_config(1, rates)
}

fn device_config(channels: u8, rates: &[u32]) -> ConfigView {
    ConfigView {
        interfaces: vec![
            InterfaceView {
                alt_settings: vec![AltSettingView {
                    interface_number: AC_INTERFACE,
                    alt_setting: 0,
                    interface_class: 0x01,
                    interface_subclass: 0x01,
                    interface_protocol: 0,
                    name_index: 0,
                    extra: ac_extra(),
                    endpoints: Vec::new(),
                }],
            },
            InterfaceView {
                alt_settings: vec![
                    AltSettingView {
                        interface_number: AS_INTERFACE,
                        alt_setting: 0,
                        interface_class: 0x01,
                        interface_subclass: 0x02,
                        ..Default::default()
                    },
                    AltSettingView {
                        interface_number: AS_INTERFACE,
                        alt_setting: 1,
                        interface_class: 0x01,
                        interface_subclass: 0x02,
                        interface_protocol: 0,
                        name_index: 0,
                        extra: {
                            let mut extra = as_general(OUTPUT_TERMINAL_ID, 0x0001);
                            extra.extend(format_type_i(channels, 2, 16, rates));
                            extra
                        },
                        endpoints: vec![iso_endpoint(EP_ADDRESS, MAX_PACKET, true)],
                    },
                ],
            },
        ],
    }
}
