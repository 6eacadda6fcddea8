//! Typed model of the class-specific audio descriptors.
//!
//! The parser lowers the raw descriptor stream into these records; the
//! capability queries on [`StreamInterface`] are the read API an
//! application uses to pick a stream configuration.

use serde::Serialize;

use crate::protocol::{EP_ATTR_SAMPLING_FREQ, FORMAT_DATA_ANY};
use crate::topology::AudioRoute;

/// Input terminal: an audio source at the boundary of the audio function.
#[derive(Debug, Clone, Serialize)]
pub struct InputTerminal {
    pub id: u8,
    pub terminal_type: u16,
    pub assoc_terminal: u8,
    pub nr_channels: u8,
    pub channel_config: u16,
    pub channel_names_index: u8,
    pub name_index: u8,
}

/// Output terminal: an audio sink, fed by the unit or terminal named in
/// `source_id`.
#[derive(Debug, Clone, Serialize)]
pub struct OutputTerminal {
    pub id: u8,
    pub terminal_type: u16,
    pub assoc_terminal: u8,
    pub source_id: u8,
    pub name_index: u8,
}

/// Feature unit payload: per-channel control bitmaps.
///
/// `controls` holds the raw `bmaControls` bytes, `control_size` bytes per
/// channel starting with the master channel.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureUnit {
    pub source_id: u8,
    pub control_size: u8,
    pub controls: Vec<u8>,
}

/// Unit variants. Only feature units (and the mixer skeleton) are modelled
/// in detail; the rest are recognised so routes can name them.
#[derive(Debug, Clone, Serialize)]
pub enum UnitKind {
    Mixer,
    Selector,
    Feature(FeatureUnit),
    Processing,
    Extension,
}

/// An internal processing block of the audio function.
#[derive(Debug, Clone, Serialize)]
pub struct Unit {
    pub id: u8,
    pub kind: UnitKind,
}

impl Unit {
    /// Ids of the entities feeding this unit.
    ///
    /// Mixer units would contribute a multi-source list once modelled in
    /// full; today only feature units resolve further upstream.
    pub fn source_ids(&self) -> Vec<u8> {
        match &self.kind {
            UnitKind::Feature(f) => vec![f.source_id],
            _ => Vec::new(),
        }
    }

    pub fn feature(&self) -> Option<&FeatureUnit> {
        match &self.kind {
            UnitKind::Feature(f) => Some(f),
            _ => None,
        }
    }
}

/// Sampling frequency capability of a format type descriptor.
#[derive(Debug, Clone, Serialize)]
pub enum RateSpec {
    /// Any rate in `lower..=upper` is accepted.
    Continuous { lower: u32, upper: u32 },
    /// Only the listed rates are accepted.
    Discrete(Vec<u32>),
}

impl RateSpec {
    pub fn supports(&self, rate: u32) -> bool {
        match self {
            RateSpec::Continuous { lower, upper } => (*lower..=*upper).contains(&rate),
            RateSpec::Discrete(rates) => rates.contains(&rate),
        }
    }

    /// The format's first declared rate; the lower bound for a range.
    pub fn first(&self) -> u32 {
        match self {
            RateSpec::Continuous { lower, .. } => *lower,
            RateSpec::Discrete(rates) => rates.first().copied().unwrap_or(0),
        }
    }

    /// Every rate the descriptor names: the discrete list, or both range
    /// bounds.
    pub fn declared(&self) -> Vec<u32> {
        match self {
            RateSpec::Continuous { lower, upper } => vec![*lower, *upper],
            RateSpec::Discrete(rates) => rates.clone(),
        }
    }
}

/// Format type descriptor. Type III shares Type I's layout.
#[derive(Debug, Clone, Serialize)]
pub enum FormatSpec {
    TypeI {
        channels: u8,
        subframe_size: u8,
        bit_resolution: u8,
        rates: RateSpec,
    },
    TypeII {
        max_bit_rate: u16,
        samples_per_frame: u16,
        rates: RateSpec,
    },
    TypeIII {
        channels: u8,
        subframe_size: u8,
        bit_resolution: u8,
        rates: RateSpec,
    },
    /// Recognised but unmodelled format type code.
    Unknown(u8),
}

impl FormatSpec {
    /// True for the uncompressed (Type I/III) layouts the streaming engine
    /// can depacketise.
    pub fn is_uncompressed(&self) -> bool {
        matches!(self, FormatSpec::TypeI { .. } | FormatSpec::TypeIII { .. })
    }

    pub fn channels(&self) -> u8 {
        match self {
            FormatSpec::TypeI { channels, .. } | FormatSpec::TypeIII { channels, .. } => *channels,
            _ => 0,
        }
    }

    pub fn subframe_size(&self) -> u8 {
        match self {
            FormatSpec::TypeI { subframe_size, .. } | FormatSpec::TypeIII { subframe_size, .. } => {
                *subframe_size
            }
            _ => 0,
        }
    }

    pub fn bit_resolution(&self) -> u8 {
        match self {
            FormatSpec::TypeI { bit_resolution, .. }
            | FormatSpec::TypeIII { bit_resolution, .. } => *bit_resolution,
            _ => 0,
        }
    }

    pub fn rates(&self) -> Option<&RateSpec> {
        match self {
            FormatSpec::TypeI { rates, .. }
            | FormatSpec::TypeII { rates, .. }
            | FormatSpec::TypeIII { rates, .. } => Some(rates),
            FormatSpec::Unknown(_) => None,
        }
    }

    pub fn rates_mut(&mut self) -> Option<&mut RateSpec> {
        match self {
            FormatSpec::TypeI { rates, .. }
            | FormatSpec::TypeII { rates, .. }
            | FormatSpec::TypeIII { rates, .. } => Some(rates),
            FormatSpec::Unknown(_) => None,
        }
    }
}

/// Isochronous data endpoint of an alternate setting, merged from the
/// standard endpoint descriptor and the class-specific EP_GENERAL record.
#[derive(Debug, Clone, Serialize)]
pub struct IsoEndpoint {
    pub address: u8,
    pub max_packet_size: u16,
    pub attributes: u8,
    pub lock_delay_units: u8,
    pub lock_delay: u16,
}

impl IsoEndpoint {
    /// The host may program the sampling rate through this endpoint.
    pub fn has_sampling_freq_control(&self) -> bool {
        self.attributes & EP_ATTR_SAMPLING_FREQ != 0
    }
}

/// One streaming variant of an AudioStreaming interface. Alternate
/// setting 0 is the idle setting and never appears here.
#[derive(Debug, Clone, Serialize)]
pub struct AltSetting {
    pub index: u8,
    pub terminal_link: u8,
    pub delay: u8,
    pub format_tag: u16,
    pub format: FormatSpec,
    pub endpoint: IsoEndpoint,
}

impl AltSetting {
    pub fn supports_sample_rate(&self, rate: u32) -> bool {
        self.format.rates().is_some_and(|r| r.supports(rate))
    }

    fn matches_tag(&self, format_tag: u16) -> bool {
        format_tag == FORMAT_DATA_ANY || self.format_tag == format_tag
    }
}

/// A concrete, startable stream configuration picked from an alternate
/// setting.
#[derive(Debug, Clone, Serialize)]
pub struct StreamConfig {
    pub format_tag: u16,
    pub alt_setting: u8,
    pub subframe_size: u8,
    pub bit_resolution: u8,
    pub channels: u8,
    pub max_packet_size: u16,
    pub sample_rate: u32,
}

/// An AudioStreaming interface and its usable alternate settings.
#[derive(Debug, Clone, Serialize)]
pub struct StreamInterface {
    pub interface_number: u8,
    pub alt_settings: Vec<AltSetting>,
}

impl StreamInterface {
    pub(crate) fn new(interface_number: u8) -> Self {
        Self {
            interface_number,
            alt_settings: Vec::new(),
        }
    }

    fn uncompressed(&self, format_tag: u16) -> impl Iterator<Item = &AltSetting> {
        self.alt_settings
            .iter()
            .filter(move |alt| alt.matches_tag(format_tag) && alt.format.is_uncompressed())
    }

    /// Distinct data format tags across all alternate settings, sorted.
    pub fn audio_formats(&self) -> Vec<u16> {
        let mut tags: Vec<u16> = self.alt_settings.iter().map(|alt| alt.format_tag).collect();
        tags.sort_unstable();
        tags.dedup();
        tags
    }

    /// Distinct channel counts offered for `format_tag`
    /// ([`FORMAT_DATA_ANY`] matches every format).
    pub fn channel_counts(&self, format_tag: u16) -> Vec<u8> {
        let mut counts: Vec<u8> = self
            .uncompressed(format_tag)
            .map(|alt| alt.format.channels())
            .collect();
        counts.sort_unstable();
        counts.dedup();
        counts
    }

    /// Distinct bit resolutions offered for `format_tag`.
    pub fn bit_resolutions(&self, format_tag: u16) -> Vec<u8> {
        let mut bits: Vec<u8> = self
            .uncompressed(format_tag)
            .map(|alt| alt.format.bit_resolution())
            .collect();
        bits.sort_unstable();
        bits.dedup();
        bits
    }

    /// Union of all declared sample rates for `format_tag`. A continuous
    /// range contributes its two bounds.
    pub fn sample_rates(&self, format_tag: u16) -> Vec<u32> {
        let mut rates: Vec<u32> = self
            .uncompressed(format_tag)
            .filter_map(|alt| alt.format.rates())
            .flat_map(|spec| spec.declared())
            .collect();
        rates.sort_unstable();
        rates.dedup();
        rates
    }

    /// First alternate setting satisfying format, channel count and sample
    /// rate, packaged for [`StreamConfig`]-driven streaming.
    pub fn query_config_uncompressed(
        &self,
        format_tag: u16,
        channels: u8,
        sample_rate: u32,
    ) -> Option<StreamConfig> {
        self.uncompressed(format_tag)
            .find(|alt| alt.format.channels() == channels && alt.supports_sample_rate(sample_rate))
            .map(|alt| StreamConfig {
                format_tag: alt.format_tag,
                alt_setting: alt.index,
                subframe_size: alt.format.subframe_size(),
                bit_resolution: alt.format.bit_resolution(),
                channels: alt.format.channels(),
                max_packet_size: alt.endpoint.max_packet_size,
                sample_rate,
            })
    }

    /// Look up a parsed alternate setting by its index.
    pub fn find_alt_setting(&self, index: u8) -> Option<&AltSetting> {
        self.alt_settings.iter().find(|alt| alt.index == index)
    }
}

/// The audio-control aggregate: one audio function on a device.
///
/// Immutable after the device scan; routes are derived once from the
/// terminal and unit sets.
#[derive(Debug, Clone, Serialize)]
pub struct AudioControl {
    pub interface_number: u8,
    pub name_index: u8,
    pub bcd_adc: u16,
    pub total_length: u16,
    pub input_terminals: Vec<InputTerminal>,
    pub output_terminals: Vec<OutputTerminal>,
    pub units: Vec<Unit>,
    pub streams: Vec<StreamInterface>,
    pub routes: Vec<AudioRoute>,
}

impl AudioControl {
    pub(crate) fn new(interface_number: u8, name_index: u8) -> Self {
        Self {
            interface_number,
            name_index,
            bcd_adc: 0,
            total_length: 0,
            input_terminals: Vec::new(),
            output_terminals: Vec::new(),
            units: Vec::new(),
            streams: Vec::new(),
            routes: Vec::new(),
        }
    }

    pub fn find_unit(&self, id: u8) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn find_input_terminal(&self, id: u8) -> Option<&InputTerminal> {
        self.input_terminals.iter().find(|t| t.id == id)
    }

    pub fn find_output_terminal(&self, id: u8) -> Option<&OutputTerminal> {
        self.output_terminals.iter().find(|t| t.id == id)
    }

    pub fn find_stream_interface(&self, interface_number: u8) -> Option<&StreamInterface> {
        self.streams
            .iter()
            .find(|s| s.interface_number == interface_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::*;

    fn alt(index: u8, tag: u16, channels: u8, rates: RateSpec) -> AltSetting {
        AltSetting {
            index,
            terminal_link: 1,
            delay: 1,
            format_tag: tag,
            format: FormatSpec::TypeI {
                channels,
                subframe_size: 2,
                bit_resolution: 16,
                rates,
            },
            endpoint: IsoEndpoint {
                address: 0x81,
                max_packet_size: 192,
                attributes: EP_ATTR_SAMPLING_FREQ,
                lock_delay_units: 0,
                lock_delay: 0,
            },
        }
    }

    fn stereo_pcm_interface() -> StreamInterface {
        StreamInterface {
            interface_number: 1,
            alt_settings: vec![
                alt(1, FORMAT_DATA_PCM, 2, RateSpec::Discrete(vec![44_100, 48_000])),
                alt(2, FORMAT_DATA_PCM, 1, RateSpec::Discrete(vec![48_000])),
            ],
        }
    }

    #[test]
    fn test_query_config_discrete() {
        let stream = stereo_pcm_interface();

        let config = stream
            .query_config_uncompressed(FORMAT_DATA_PCM, 2, 48_000)
            .expect("48 kHz stereo is declared");
        assert_eq!(config.alt_setting, 1);
        assert_eq!(config.channels, 2);
        assert_eq!(config.sample_rate, 48_000);
        assert_eq!(config.max_packet_size, 192);

        assert!(
            stream
                .query_config_uncompressed(FORMAT_DATA_PCM, 2, 96_000)
                .is_none()
        );
    }

    #[test]
    fn test_query_config_any_format() {
        let stream = stereo_pcm_interface();
        let config = stream
            .query_config_uncompressed(FORMAT_DATA_ANY, 1, 48_000)
            .expect("mono setting matches the wildcard");
        assert_eq!(config.alt_setting, 2);
        assert_eq!(config.format_tag, FORMAT_DATA_PCM);
    }

    #[test]
    fn test_continuous_rate_membership() {
        let stream = StreamInterface {
            interface_number: 1,
            alt_settings: vec![alt(
                1,
                FORMAT_DATA_PCM,
                2,
                RateSpec::Continuous {
                    lower: 8_000,
                    upper: 96_000,
                },
            )],
        };

        assert_eq!(stream.sample_rates(FORMAT_DATA_PCM), vec![8_000, 96_000]);
        assert!(
            stream
                .query_config_uncompressed(FORMAT_DATA_PCM, 2, 48_000)
                .is_some()
        );
        assert!(
            stream
                .query_config_uncompressed(FORMAT_DATA_PCM, 2, 7_999)
                .is_none()
        );
    }

    #[test]
    fn test_capability_queries_dedup_and_sort() {
        let stream = StreamInterface {
            interface_number: 1,
            alt_settings: vec![
                alt(1, FORMAT_DATA_PCM, 2, RateSpec::Discrete(vec![48_000, 44_100])),
                alt(2, FORMAT_DATA_PCM, 2, RateSpec::Discrete(vec![44_100])),
                alt(3, FORMAT_DATA_PCM8, 1, RateSpec::Discrete(vec![8_000])),
            ],
        };

        assert_eq!(
            stream.audio_formats(),
            vec![FORMAT_DATA_PCM, FORMAT_DATA_PCM8]
        );
        assert_eq!(stream.channel_counts(FORMAT_DATA_PCM), vec![2]);
        assert_eq!(stream.channel_counts(FORMAT_DATA_ANY), vec![1, 2]);
        assert_eq!(
            stream.sample_rates(FORMAT_DATA_PCM),
            vec![44_100, 48_000]
        );
    }

    #[test]
    fn test_rate_spec_first() {
        assert_eq!(RateSpec::Discrete(vec![44_100, 48_000]).first(), 44_100);
        assert_eq!(
            RateSpec::Continuous {
                lower: 8_000,
                upper: 96_000
            }
            .first(),
            8_000
        );
    }
}
