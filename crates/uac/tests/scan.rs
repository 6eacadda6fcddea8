//! Device scan, route query and control operation tests against the
//! mock backend.

mod common;

use common::*;

use uac::protocol::*;
use uac::{Context, RateSpec, UacError};
use uac_usb::mock::{MockContext, MockDevice};

fn scan_one(device: std::sync::Arc<MockDevice>) -> uac::Device {
    let context = Context::with_backend(MockContext::new(vec![device]));
    let mut devices = context.query_all_devices().expect("enumeration works");
    assert_eq!(devices.len(), 1);
    devices.remove(0)
}

#[test]
fn test_scan_builds_routes_and_streams() {
    let device = scan_one(MockDevice::new(0x1234, 0x0001, mic_config(&[44_100, 48_000])));

    let audio = device.audio_control();
    assert_eq!(audio.bcd_adc, 0x0100);
    assert_eq!(audio.streams.len(), 1);
    assert_eq!(audio.streams[0].alt_settings.len(), 1);
    assert_eq!(audio.routes.len(), 1);

    let routes = device.query_audio_routes(TERMINAL_MICROPHONE, TERMINAL_USB_STREAMING);
    assert_eq!(routes.len(), 1);
    // family wildcards reach the same route
    let routes = device.query_audio_routes(TERMINAL_INPUT_UNDEFINED, TERMINAL_USB_UNDEFINED);
    assert_eq!(routes.len(), 1);
    // a speaker route does not exist on a microphone
    let routes = device.query_audio_routes(TERMINAL_MICROPHONE, TERMINAL_SPEAKER);
    assert!(routes.is_empty());
}

#[test]
fn test_stream_interface_lookup() {
    let device = scan_one(MockDevice::new(0x1234, 0x0001, mic_config(&[48_000])));
    let routes = device.query_audio_routes(TERMINAL_ANY, TERMINAL_USB_STREAMING);
    let stream = device
        .get_stream_interface(routes[0])
        .expect("stream linked to the route");
    assert_eq!(stream.interface_number, AS_INTERFACE);

    let config = stream
        .query_config_uncompressed(FORMAT_DATA_PCM, 2, 48_000)
        .expect("declared configuration");
    assert_eq!(config.alt_setting, 1);
    assert_eq!(config.max_packet_size, MAX_PACKET);
}

#[test]
fn test_devices_that_fail_to_scan_are_skipped() {
    let good = MockDevice::new(0x1234, 0x0001, mic_config(&[48_000]));
    let bad = MockDevice::new(0x1234, 0x0002, Default::default());
    let context = Context::with_backend(MockContext::new(vec![bad, good]));
    let devices = context.query_all_devices().expect("enumeration works");
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].pid(), 0x0001);
}

#[test]
fn test_wrap_scans_the_adopted_device() {
    let device = MockDevice::new(0x1234, 0x0001, mic_config(&[48_000]));
    let context = Context::with_backend(MockContext::new(vec![device]));
    let handle = context.wrap(42).expect("wrap succeeds");
    assert_eq!(handle.device().vid(), 0x1234);
}

#[test]
fn test_wrap_fails_on_invalid_device() {
    let device = MockDevice::new(0x1234, 0x0001, Default::default());
    let context = Context::with_backend(MockContext::new(vec![device]));
    match context.wrap(42) {
        Err(UacError::InvalidDevice(_)) => {}
        Err(other) => panic!("expected InvalidDevice, got {other:?}"),
        Ok(_) => panic!("expected InvalidDevice, got a handle"),
    }
}

#[test]
fn test_quirk_forces_stereo_48k_and_swap() {
    // the dongle reports a mono 44.1 kHz format; the quirk overrides both
    let device = scan_one(MockDevice::new(0x534d, 0x2109, mono_mic_config(&[44_100])));

    assert!(device.has_quirk_swap_channels());
    let audio = device.audio_control();
    let alt = audio.streams.last().unwrap().alt_settings.last().unwrap();
    assert_eq!(alt.format.channels(), 2);
    match alt.format.rates().expect("rates") {
        RateSpec::Discrete(rates) => assert_eq!(rates.first(), Some(&48_000)),
        other => panic!("expected discrete rates, got {other:?}"),
    }
}

#[test]
fn test_other_devices_are_not_quirked() {
    let device = scan_one(MockDevice::new(0x1234, 0x0001, mic_config(&[44_100])));
    assert!(!device.has_quirk_swap_channels());
    let alt = &device.audio_control().streams[0].alt_settings[0];
    assert!(alt.supports_sample_rate(44_100));
    assert!(!alt.supports_sample_rate(48_000));
}

#[test]
fn test_master_mute_and_volume_reads() {
    let mock = MockDevice::new(0x1234, 0x0001, mic_config(&[48_000]));
    let mock_handle = mock.handle();
    let device = scan_one(mock);
    let handle = device.open().expect("open");
    let routes = device.query_audio_routes(TERMINAL_ANY, TERMINAL_USB_STREAMING);
    let route = routes[0];

    mock_handle.push_control_in_response(vec![0x01]);
    assert!(handle.is_master_muted(route).expect("mute read"));

    mock_handle.push_control_in_response(vec![0x00, 0x80]);
    assert_eq!(
        handle.get_feature_master_volume(route).expect("volume read"),
        i16::MIN
    );

    let controls = mock_handle.controls();
    assert_eq!(controls.len(), 2);
    let mute = &controls[0];
    assert_eq!(mute.request_type, REQ_TYPE_IF_GET);
    assert_eq!(mute.request, REQ_GET_CUR);
    assert_eq!(mute.value, (FU_MUTE_CONTROL as u16) << 8);
    assert_eq!(mute.index, ((FEATURE_UNIT_ID as u16) << 8) | AC_INTERFACE as u16);
    let volume = &controls[1];
    assert_eq!(volume.value, (FU_VOLUME_CONTROL as u16) << 8);

    // the control interface was claimed and released around each read
    assert_eq!(mock_handle.claims(), vec![AC_INTERFACE, AC_INTERFACE]);
    assert_eq!(mock_handle.releases(), vec![AC_INTERFACE, AC_INTERFACE]);
}

#[test]
fn test_get_name_and_dump() {
    let mock = MockDevice::new(0x1234, 0x0001, mic_config(&[48_000]));
    mock.handle().set_product("Mock Microphone");
    let device = scan_one(mock);
    let handle = device.open().expect("open");

    assert_eq!(handle.get_name(), "Mock Microphone");

    let mut report = Vec::new();
    handle.dump(&mut report).expect("dump writes");
    let report = String::from_utf8(report).expect("utf8");
    assert!(report.contains("device 1234:0001"));
    assert!(report.contains("route 0"));
    assert!(report.contains("streaming intf(1)"));
}
