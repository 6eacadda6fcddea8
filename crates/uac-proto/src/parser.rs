//! Class-specific descriptor parser.
//!
//! Audio descriptors are concatenated variable-length records hidden in
//! the `extra` trailers of the standard configuration descriptor: byte 0
//! is the record length, byte 1 the descriptor type, byte 2 the subtype.
//! The walker clamps every declared length against the remaining bytes;
//! a bad length ends that interface's walk with a warning instead of
//! failing the device.

use log::{debug, error, warn};
use thiserror::Error;

use crate::codec::{read_u16_le, read_u24_le};
use crate::descriptor::{
    AltSetting, AudioControl, FeatureUnit, FormatSpec, InputTerminal, IsoEndpoint, OutputTerminal,
    RateSpec, StreamInterface, Unit, UnitKind,
};
use crate::protocol::*;
use crate::view::{AltSettingView, ConfigView, InterfaceView};

/// Why a device's descriptor stream did not yield an audio function.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("device has no audio control interface")]
    NoAudioFunction,
    #[error("audio control interface does not start with a header descriptor")]
    MissingHeader,
    #[error("audio streaming interface appears before the audio control interface")]
    StreamingBeforeControl,
    #[error("audio function declares streaming interfaces but none are usable")]
    NoUsableStreams,
}

/// Walk a configuration snapshot and build the audio-control aggregate,
/// routes included.
pub fn parse_device(config: &ConfigView) -> Result<AudioControl, ParseError> {
    let mut control: Option<AudioControl> = None;

    for interface in &config.interfaces {
        let Some(first) = interface.alt_settings.first() else {
            continue;
        };
        if first.interface_class != CLASS_AUDIO {
            continue;
        }
        debug!(
            "found audio class interface {}, subclass=0x{:x}, protocol={}",
            first.interface_number, first.interface_subclass, first.interface_protocol
        );
        match first.interface_subclass {
            SUBCLASS_AUDIOCONTROL => {
                control = Some(parse_audio_control(first)?);
            }
            SUBCLASS_AUDIOSTREAMING => match control.as_mut() {
                Some(ac) => scan_audio_streaming(ac, interface),
                // the audio control interface must precede its streams
                None => return Err(ParseError::StreamingBeforeControl),
            },
            _ => {}
        }
    }

    let mut ac = control.ok_or(ParseError::NoAudioFunction)?;
    if !ac.streams.is_empty() && ac.streams.iter().all(|s| s.alt_settings.is_empty()) {
        return Err(ParseError::NoUsableStreams);
    }
    ac.configure_routes();
    Ok(ac)
}

/// Iterator over the variable-length records of an `extra` trailer.
struct Records<'a> {
    data: &'a [u8],
}

impl<'a> Records<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.data.len() < 3 {
            return None;
        }
        let length = self.data[0] as usize;
        if length < 3 {
            warn!("descriptor with impossible length {length}, stopping walk");
            return None;
        }
        if length > self.data.len() {
            warn!(
                "bad descriptor size, exceeds remaining bytes: {} < {}",
                self.data.len(),
                length
            );
            return None;
        }
        let (record, rest) = self.data.split_at(length);
        self.data = rest;
        Some(record)
    }
}

/// Parse the audio-control interface: header first, then terminals and
/// units in declaration order.
pub fn parse_audio_control(interface: &AltSettingView) -> Result<AudioControl, ParseError> {
    let data = &interface.extra;
    if data.len() < 3 {
        error!(
            "no class-specific data on audio control interface {}",
            interface.interface_number
        );
        return Err(ParseError::MissingHeader);
    }
    let header_len = data[0] as usize;
    if data[2] != AC_HEADER || header_len < 8 || header_len > data.len() {
        error!(
            "expected a header descriptor first but got sizeof({}) {}:{}",
            data[0], data[1], data[2]
        );
        return Err(ParseError::MissingHeader);
    }

    let mut ac = AudioControl::new(interface.interface_number, interface.name_index);
    parse_ac_header(&mut ac, &data[..header_len]);
    if ac.total_length as usize != data.len() {
        warn!(
            "wTotalLength mismatch with actual data available: {} != {}",
            ac.total_length,
            data.len()
        );
    }

    for record in Records::new(&data[header_len..]) {
        match record[2] {
            AC_HEADER => debug!("got another header descriptor; a bug or a buggy device?"),
            AC_INPUT_TERMINAL if record.len() >= 12 => {
                ac.input_terminals.push(parse_input_terminal(record));
            }
            AC_OUTPUT_TERMINAL if record.len() >= 9 => {
                ac.output_terminals.push(parse_output_terminal(record));
            }
            AC_MIXER_UNIT if record.len() >= 4 => {
                debug!("got MIXER_UNIT {}", record[3]);
                ac.units.push(Unit {
                    id: record[3],
                    kind: UnitKind::Mixer,
                });
            }
            AC_FEATURE_UNIT if record.len() >= 7 => {
                ac.units.push(parse_feature_unit(record));
            }
            AC_SELECTOR_UNIT if record.len() >= 4 => {
                ac.units.push(Unit {
                    id: record[3],
                    kind: UnitKind::Selector,
                });
            }
            AC_PROCESSING_UNIT if record.len() >= 4 => {
                ac.units.push(Unit {
                    id: record[3],
                    kind: UnitKind::Processing,
                });
            }
            AC_EXTENSION_UNIT if record.len() >= 4 => {
                ac.units.push(Unit {
                    id: record[3],
                    kind: UnitKind::Extension,
                });
            }
            subtype => {
                debug!(
                    "unsupported or truncated AC descriptor: subtype={subtype}, size={}",
                    record.len()
                );
            }
        }
    }
    Ok(ac)
}

/// Header: `bcdADC`, `wTotalLength`, and the collection of streaming
/// interface numbers owned by this audio function.
pub fn parse_ac_header(ac: &mut AudioControl, record: &[u8]) {
    ac.bcd_adc = read_u16_le(&record[3..]);
    ac.total_length = read_u16_le(&record[5..]);
    let in_collection = record[7] as usize;
    for i in 0..in_collection {
        let Some(&interface_number) = record.get(8 + i) else {
            warn!("header collection truncated after {i} entries");
            break;
        };
        debug!("audio streaming interface at {interface_number}");
        ac.streams.push(StreamInterface::new(interface_number));
    }
}

fn parse_input_terminal(record: &[u8]) -> InputTerminal {
    let terminal = InputTerminal {
        id: record[3],
        terminal_type: read_u16_le(&record[4..]),
        assoc_terminal: record[6],
        nr_channels: record[7],
        channel_config: read_u16_le(&record[8..]),
        channel_names_index: record[10],
        name_index: record[11],
    };
    debug!(
        "got INPUT_TERMINAL {}: type=0x{:x}",
        terminal.id, terminal.terminal_type
    );
    terminal
}

fn parse_output_terminal(record: &[u8]) -> OutputTerminal {
    let terminal = OutputTerminal {
        id: record[3],
        terminal_type: read_u16_le(&record[4..]),
        assoc_terminal: record[6],
        source_id: record[7],
        name_index: record[8],
    };
    debug!(
        "got OUTPUT_TERMINAL {}: type=0x{:x}",
        terminal.id, terminal.terminal_type
    );
    terminal
}

fn parse_feature_unit(record: &[u8]) -> Unit {
    let id = record[3];
    let source_id = record[4];
    let control_size = record[5];
    // bmaControls runs from byte 6 up to the trailing iFeature byte
    let controls = record[6..record.len() - 1].to_vec();
    debug!("got FEATURE_UNIT {id}: bSourceId=0x{source_id:x}");
    Unit {
        id,
        kind: UnitKind::Feature(FeatureUnit {
            source_id,
            control_size,
            controls,
        }),
    }
}

/// Attach the alternate settings of a streaming interface named in the
/// audio-control header; interfaces the header does not list are ignored.
fn scan_audio_streaming(ac: &mut AudioControl, interface: &InterfaceView) {
    let Some(first) = interface.alt_settings.first() else {
        return;
    };
    let number = first.interface_number;
    let Some(stream) = ac
        .streams
        .iter_mut()
        .find(|s| s.interface_number == number)
    else {
        debug!("audio streaming interface {number} is not part of the current audio function");
        return;
    };
    debug!("parse AS interface {number}");
    parse_stream_interface(stream, &interface.alt_settings);
}

fn parse_stream_interface(stream: &mut StreamInterface, alt_settings: &[AltSettingView]) {
    for ifdesc in alt_settings {
        // altsetting 0 is the idle, non-streaming setting
        if ifdesc.alt_setting == 0 {
            continue;
        }
        debug!("parsing altsetting={} descriptor", ifdesc.alt_setting);

        let mut general: Option<(u8, u8, u16)> = None;
        let mut format: Option<FormatSpec> = None;
        for record in Records::new(&ifdesc.extra) {
            match record[2] {
                AS_GENERAL if record.len() >= 7 => {
                    general = Some((record[3], record[4], read_u16_le(&record[5..])));
                }
                AS_FORMAT_TYPE if record.len() >= 4 => {
                    format = parse_format_type(record);
                }
                AS_FORMAT_SPECIFIC => {
                    debug!("got AS_FORMAT_SPECIFIC descriptor, not modelled");
                }
                _ => {}
            }
        }

        let Some((terminal_link, delay, format_tag)) = general else {
            debug!("altsetting {} lacks AS_GENERAL, dropped", ifdesc.alt_setting);
            continue;
        };
        let Some(format) = format else {
            debug!(
                "altsetting {} lacks a format type descriptor, dropped",
                ifdesc.alt_setting
            );
            continue;
        };
        if ifdesc.endpoints.is_empty() {
            debug!("altsetting {} declares no endpoints, dropped", ifdesc.alt_setting);
            continue;
        }
        if ifdesc.endpoints.len() != 1 {
            error!(
                "invalid number of endpoints in interface {} altsetting {}: {}",
                ifdesc.interface_number,
                ifdesc.alt_setting,
                ifdesc.endpoints.len()
            );
            continue;
        }
        let ep = &ifdesc.endpoints[0];
        if ep.attributes & TRANSFER_TYPE_MASK != TRANSFER_TYPE_ISOCHRONOUS {
            debug!("altsetting {} uses an unsupported transfer type", ifdesc.alt_setting);
            continue;
        }
        debug!(
            "altsetting endpointAddress=0x{:x}, wMaxPacketSize={}",
            ep.address, ep.max_packet_size
        );
        let (attributes, lock_delay_units, lock_delay) = parse_iso_endpoint(&ep.extra);
        stream.alt_settings.push(AltSetting {
            index: ifdesc.alt_setting,
            terminal_link,
            delay,
            format_tag,
            format,
            endpoint: IsoEndpoint {
                address: ep.address,
                max_packet_size: ep.max_packet_size,
                attributes,
                lock_delay_units,
                lock_delay,
            },
        });
    }
}

fn parse_format_type(record: &[u8]) -> Option<FormatSpec> {
    let format_type = record[3];
    match format_type {
        FORMAT_TYPE_I | FORMAT_TYPE_III => {
            if record.len() < 8 {
                warn!("format type {format_type} descriptor too short: {}", record.len());
                return None;
            }
            let rates = parse_rate_spec(record, 8, record[7])?;
            Some(if format_type == FORMAT_TYPE_I {
                FormatSpec::TypeI {
                    channels: record[4],
                    subframe_size: record[5],
                    bit_resolution: record[6],
                    rates,
                }
            } else {
                FormatSpec::TypeIII {
                    channels: record[4],
                    subframe_size: record[5],
                    bit_resolution: record[6],
                    rates,
                }
            })
        }
        FORMAT_TYPE_II => {
            if record.len() < 9 {
                warn!("format type II descriptor too short: {}", record.len());
                return None;
            }
            let rates = parse_rate_spec(record, 9, record[8])?;
            Some(FormatSpec::TypeII {
                max_bit_rate: read_u16_le(&record[4..]),
                samples_per_frame: read_u16_le(&record[6..]),
                rates,
            })
        }
        other => Some(FormatSpec::Unknown(other)),
    }
}

/// `bSamFreqType == 0` means a continuous range; otherwise that many
/// discrete three-byte rates follow.
fn parse_rate_spec(record: &[u8], offset: usize, sam_freq_type: u8) -> Option<RateSpec> {
    if sam_freq_type == 0 {
        if record.len() < offset + 6 {
            warn!("continuous sample rate bounds truncated");
            return None;
        }
        Some(RateSpec::Continuous {
            lower: read_u24_le(&record[offset..]),
            upper: read_u24_le(&record[offset + 3..]),
        })
    } else {
        let mut rates = Vec::with_capacity(sam_freq_type as usize);
        for i in 0..sam_freq_type as usize {
            let start = offset + i * 3;
            if record.len() < start + 3 {
                warn!("discrete sample rate list truncated after {i} entries");
                break;
            }
            let rate = read_u24_le(&record[start..]);
            debug!("supported freq {rate}");
            rates.push(rate);
        }
        if rates.is_empty() {
            return None;
        }
        Some(RateSpec::Discrete(rates))
    }
}

/// Pull `bmAttributes`, `bLockDelayUnits` and `wLockDelay` out of the
/// endpoint's class-specific EP_GENERAL record; zeros when absent.
fn parse_iso_endpoint(extra: &[u8]) -> (u8, u8, u16) {
    for record in Records::new(extra) {
        if record[2] == EP_GENERAL && record.len() >= 7 {
            return (record[3], record[4], read_u16_le(&record[5..]));
        }
    }
    (0, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ac_interface(extra: Vec<u8>) -> AltSettingView {
        AltSettingView {
            interface_number: 0,
            alt_setting: 0,
            interface_class: CLASS_AUDIO,
            interface_subclass: SUBCLASS_AUDIOCONTROL,
            interface_protocol: 0,
            name_index: 0,
            extra,
            endpoints: Vec::new(),
        }
    }

    #[test]
    fn test_parse_ac_header() {
        // bcdADC=0x0100, wTotalLength=10, empty stream collection
        let interface = ac_interface(vec![0x08, 0x24, 0x01, 0x00, 0x01, 0x0A, 0x00, 0x00]);
        let ac = parse_audio_control(&interface).expect("header parses");
        assert_eq!(ac.bcd_adc, 0x0100);
        assert_eq!(ac.total_length, 10);
        assert!(ac.streams.is_empty());
    }

    #[test]
    fn test_header_must_come_first() {
        // an input terminal record where the header should be
        let interface = ac_interface(vec![
            0x0C, 0x24, 0x02, 0x02, 0x01, 0x02, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
        ]);
        assert_eq!(
            parse_audio_control(&interface).unwrap_err(),
            ParseError::MissingHeader
        );
    }

    #[test]
    fn test_empty_extra_is_not_audio_control() {
        let interface = ac_interface(Vec::new());
        assert_eq!(
            parse_audio_control(&interface).unwrap_err(),
            ParseError::MissingHeader
        );
    }

    #[test]
    fn test_oversized_record_aborts_walk() {
        let mut extra = vec![0x09, 0x24, 0x01, 0x00, 0x01, 0x15, 0x00, 0x01, 0x01];
        // input terminal claiming 0x40 bytes with only 12 present
        extra.extend_from_slice(&[
            0x40, 0x24, 0x02, 0x02, 0x01, 0x02, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
        ]);
        let ac = parse_audio_control(&ac_interface(extra)).expect("header still parses");
        assert!(ac.input_terminals.is_empty());
        assert_eq!(ac.streams.len(), 1);
    }

    #[test]
    fn test_second_header_is_ignored() {
        let mut extra = vec![0x08, 0x24, 0x01, 0x00, 0x01, 0x10, 0x00, 0x00];
        extra.extend_from_slice(&[0x08, 0x24, 0x01, 0x34, 0x12, 0x10, 0x00, 0x00]);
        let ac = parse_audio_control(&ac_interface(extra)).expect("parses");
        assert_eq!(ac.bcd_adc, 0x0100);
    }

    #[test]
    fn test_terminals_and_units() {
        let mut extra = vec![0x09, 0x24, 0x01, 0x00, 0x01, 0x27, 0x00, 0x01, 0x01];
        // input terminal 2: microphone
        extra.extend_from_slice(&[
            0x0C, 0x24, 0x02, 0x02, 0x01, 0x02, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
        ]);
        // feature unit 3 fed by 2, master+ch1 controls
        extra.extend_from_slice(&[0x09, 0x24, 0x06, 0x03, 0x02, 0x01, 0x03, 0x00, 0x00]);
        // output terminal 1: usb streaming, fed by 3
        extra.extend_from_slice(&[0x09, 0x24, 0x03, 0x01, 0x01, 0x01, 0x00, 0x03, 0x00]);

        let ac = parse_audio_control(&ac_interface(extra)).expect("parses");
        assert_eq!(ac.input_terminals.len(), 1);
        assert_eq!(ac.input_terminals[0].terminal_type, TERMINAL_MICROPHONE);
        assert_eq!(ac.output_terminals.len(), 1);
        assert_eq!(ac.output_terminals[0].source_id, 3);
        assert_eq!(ac.units.len(), 1);
        let feature = ac.units[0].feature().expect("feature unit");
        assert_eq!(feature.source_id, 2);
        assert_eq!(feature.control_size, 1);
        assert_eq!(feature.controls, vec![0x03, 0x00]);
    }

    // ── stream interface fixtures ──

    fn as_alt_setting(
        interface_number: u8,
        alt_setting: u8,
        extra: Vec<u8>,
        endpoints: Vec<crate::view::EndpointView>,
    ) -> AltSettingView {
        AltSettingView {
            interface_number,
            alt_setting,
            interface_class: CLASS_AUDIO,
            interface_subclass: SUBCLASS_AUDIOSTREAMING,
            interface_protocol: 0,
            name_index: 0,
            extra,
            endpoints,
        }
    }

    fn iso_endpoint() -> crate::view::EndpointView {
        crate::view::EndpointView {
            address: 0x81,
            attributes: 0x05, // isochronous, async
            max_packet_size: 192,
            extra: vec![0x07, 0x25, 0x01, 0x01, 0x00, 0x00, 0x00],
        }
    }

    fn pcm_stream_extra(discrete: &[u32]) -> Vec<u8> {
        let mut extra = vec![0x07, 0x24, 0x01, 0x01, 0x01, 0x01, 0x00];
        let mut format = vec![
            (8 + discrete.len() * 3) as u8,
            0x24,
            0x02,
            0x01,
            0x02,
            0x02,
            0x10,
            discrete.len() as u8,
        ];
        for rate in discrete {
            format.extend_from_slice(&crate::codec::write_u24_le(*rate));
        }
        extra.extend_from_slice(&format);
        extra
    }

    #[test]
    fn test_stream_alt_setting_parses() {
        let mut stream = StreamInterface::new(1);
        let alts = vec![
            as_alt_setting(1, 0, Vec::new(), Vec::new()),
            as_alt_setting(1, 1, pcm_stream_extra(&[44_100, 48_000]), vec![iso_endpoint()]),
        ];
        parse_stream_interface(&mut stream, &alts);

        assert_eq!(stream.alt_settings.len(), 1);
        let alt = &stream.alt_settings[0];
        assert_eq!(alt.index, 1);
        assert_eq!(alt.terminal_link, 1);
        assert_eq!(alt.format_tag, FORMAT_DATA_PCM);
        assert_eq!(alt.format.channels(), 2);
        assert_eq!(alt.format.subframe_size(), 2);
        assert_eq!(alt.format.bit_resolution(), 16);
        assert!(alt.supports_sample_rate(48_000));
        assert!(!alt.supports_sample_rate(96_000));
        assert_eq!(alt.endpoint.address, 0x81);
        assert_eq!(alt.endpoint.max_packet_size, 192);
        assert!(alt.endpoint.has_sampling_freq_control());
    }

    #[test]
    fn test_alt_setting_without_general_is_dropped() {
        let mut stream = StreamInterface::new(1);
        // format type only, no AS_GENERAL
        let extra = pcm_stream_extra(&[48_000])[7..].to_vec();
        let alts = vec![as_alt_setting(1, 1, extra, vec![iso_endpoint()])];
        parse_stream_interface(&mut stream, &alts);
        assert!(stream.alt_settings.is_empty());
    }

    #[test]
    fn test_alt_setting_without_endpoint_is_dropped() {
        let mut stream = StreamInterface::new(1);
        let alts = vec![as_alt_setting(1, 1, pcm_stream_extra(&[48_000]), Vec::new())];
        parse_stream_interface(&mut stream, &alts);
        assert!(stream.alt_settings.is_empty());
    }

    #[test]
    fn test_alt_setting_with_two_endpoints_is_dropped() {
        let mut stream = StreamInterface::new(1);
        let alts = vec![as_alt_setting(
            1,
            1,
            pcm_stream_extra(&[48_000]),
            vec![iso_endpoint(), iso_endpoint()],
        )];
        parse_stream_interface(&mut stream, &alts);
        assert!(stream.alt_settings.is_empty());
    }

    #[test]
    fn test_non_isochronous_endpoint_is_dropped() {
        let mut stream = StreamInterface::new(1);
        let mut bulk = iso_endpoint();
        bulk.attributes = 0x02;
        let alts = vec![as_alt_setting(1, 1, pcm_stream_extra(&[48_000]), vec![bulk])];
        parse_stream_interface(&mut stream, &alts);
        assert!(stream.alt_settings.is_empty());
    }

    #[test]
    fn test_continuous_rate_format() {
        let mut stream = StreamInterface::new(1);
        let mut extra = vec![0x07, 0x24, 0x01, 0x01, 0x01, 0x01, 0x00];
        // bSamFreqType=0: bounds 8000..96000
        let mut format = vec![0x0E, 0x24, 0x02, 0x01, 0x02, 0x02, 0x10, 0x00];
        format.extend_from_slice(&crate::codec::write_u24_le(8_000));
        format.extend_from_slice(&crate::codec::write_u24_le(96_000));
        extra.extend_from_slice(&format);
        let alts = vec![as_alt_setting(1, 1, extra, vec![iso_endpoint()])];
        parse_stream_interface(&mut stream, &alts);

        let alt = &stream.alt_settings[0];
        match alt.format.rates().expect("rates") {
            RateSpec::Continuous { lower, upper } => {
                assert_eq!(*lower, 8_000);
                assert_eq!(*upper, 96_000);
            }
            other => panic!("expected a continuous range, got {other:?}"),
        }
    }

    // ── whole-device fixtures ──

    fn synthetic_device() -> ConfigView {
        let mut ac_extra = vec![0x09, 0x24, 0x01, 0x00, 0x01, 0x27, 0x00, 0x01, 0x01];
        ac_extra.extend_from_slice(&[
            0x0C, 0x24, 0x02, 0x02, 0x01, 0x02, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
        ]);
        ac_extra.extend_from_slice(&[0x09, 0x24, 0x06, 0x03, 0x02, 0x01, 0x03, 0x00, 0x00]);
        ac_extra.extend_from_slice(&[0x09, 0x24, 0x03, 0x01, 0x01, 0x01, 0x00, 0x03, 0x00]);

        ConfigView {
            interfaces: vec![
                InterfaceView {
                    alt_settings: vec![ac_interface(ac_extra)],
                },
                InterfaceView {
                    alt_settings: vec![
                        as_alt_setting(1, 0, Vec::new(), Vec::new()),
                        as_alt_setting(
                            1,
                            1,
                            pcm_stream_extra(&[44_100, 48_000]),
                            vec![iso_endpoint()],
                        ),
                    ],
                },
            ],
        }
    }

    #[test]
    fn test_parse_device_end_to_end() {
        let ac = parse_device(&synthetic_device()).expect("device parses");
        assert_eq!(ac.streams.len(), 1);
        assert_eq!(ac.streams[0].alt_settings.len(), 1);
        assert_eq!(ac.routes.len(), 1);
        assert!(ac.routes[0].contains_terminal(TERMINAL_MICROPHONE));
        assert!(ac.routes[0].contains_terminal(TERMINAL_USB_STREAMING));
    }

    #[test]
    fn test_device_without_audio_function() {
        let config = ConfigView {
            interfaces: vec![InterfaceView {
                alt_settings: vec![AltSettingView {
                    interface_class: 0x03, // HID
                    ..Default::default()
                }],
            }],
        };
        assert_eq!(
            parse_device(&config).unwrap_err(),
            ParseError::NoAudioFunction
        );
    }

    #[test]
    fn test_all_streams_unusable_fails() {
        let mut config = synthetic_device();
        // strip the endpoint so the only altsetting is dropped
        config.interfaces[1].alt_settings[1].endpoints.clear();
        assert_eq!(
            parse_device(&config).unwrap_err(),
            ParseError::NoUsableStreams
        );
    }

    #[test]
    fn test_unlisted_streaming_interface_is_ignored() {
        let mut config = synthetic_device();
        // renumber the AS interface so the header collection does not list it
        for alt in &mut config.interfaces[1].alt_settings {
            alt.interface_number = 7;
        }
        // the function declares interface 1 which never shows up; its
        // stream stays empty, so the scan reports no usable streams
        assert_eq!(
            parse_device(&config).unwrap_err(),
            ParseError::NoUsableStreams
        );
    }
}
