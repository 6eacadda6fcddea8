//! Per-device descriptor overrides.
//!
//! Some devices publish descriptors that do not match what they actually
//! stream. The table below patches the parsed model right after the scan;
//! adding a quirk is a data change.

use log::debug;

use uac_proto::{AudioControl, FormatSpec, RateSpec};

/// Behaviour flags a quirk can switch on for the streaming engine.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct QuirkFlags {
    /// The device delivers the channels misaligned by one subframe; the
    /// engine drops the first subframe of the stream to realign them.
    pub swap_channels: bool,
}

struct Quirk {
    vid: u16,
    pid: u16,
    /// Force 2 channels / 48 kHz on the last alternate setting of the
    /// last streaming interface.
    force_stereo_48k: bool,
    swap_channels: bool,
}

// 0x534d:0x2109: UVC/UAC composite capture dongle that reports a mono
// format but streams interleaved stereo at 48 kHz, channels swapped.
const QUIRKS: &[Quirk] = &[Quirk {
    vid: 0x534d,
    pid: 0x2109,
    force_stereo_48k: true,
    swap_channels: true,
}];

pub(crate) fn apply_quirks(vid: u16, pid: u16, audio: &mut AudioControl) -> QuirkFlags {
    let mut flags = QuirkFlags::default();
    for quirk in QUIRKS {
        if quirk.vid != vid || quirk.pid != pid {
            continue;
        }
        debug!("applying descriptor quirks for {vid:04x}:{pid:04x}");
        if quirk.force_stereo_48k
            && let Some(stream) = audio.streams.last_mut()
            && let Some(alt) = stream.alt_settings.last_mut()
        {
            match &mut alt.format {
                FormatSpec::TypeI { channels, rates, .. }
                | FormatSpec::TypeIII { channels, rates, .. } => {
                    *channels = 2;
                    *rates = RateSpec::Discrete(vec![48_000]);
                }
                _ => {}
            }
        }
        flags.swap_channels |= quirk.swap_channels;
    }
    flags
}
