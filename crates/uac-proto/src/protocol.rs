//! USB Audio Class 1.0 wire constants.
//!
//! Values come straight from the class specification tables (descriptor
//! types, interface subtypes, terminal types, data format tags, control
//! selectors, request codes). All multi-byte fields on the wire are
//! little-endian.

// Interface class / subclass codes
pub const CLASS_AUDIO: u8 = 0x01;
pub const SUBCLASS_AUDIOCONTROL: u8 = 0x01;
pub const SUBCLASS_AUDIOSTREAMING: u8 = 0x02;
pub const SUBCLASS_MIDISTREAMING: u8 = 0x03;

// Class-specific descriptor types
pub const CS_UNDEFINED: u8 = 0x20;
pub const CS_DEVICE: u8 = 0x21;
pub const CS_CONFIGURATION: u8 = 0x22;
pub const CS_STRING: u8 = 0x23;
pub const CS_INTERFACE: u8 = 0x24;
pub const CS_ENDPOINT: u8 = 0x25;

// AudioControl interface descriptor subtypes
pub const AC_HEADER: u8 = 0x01;
pub const AC_INPUT_TERMINAL: u8 = 0x02;
pub const AC_OUTPUT_TERMINAL: u8 = 0x03;
pub const AC_MIXER_UNIT: u8 = 0x04;
pub const AC_SELECTOR_UNIT: u8 = 0x05;
pub const AC_FEATURE_UNIT: u8 = 0x06;
pub const AC_PROCESSING_UNIT: u8 = 0x07;
pub const AC_EXTENSION_UNIT: u8 = 0x08;

// AudioStreaming interface descriptor subtypes
pub const AS_GENERAL: u8 = 0x01;
pub const AS_FORMAT_TYPE: u8 = 0x02;
pub const AS_FORMAT_SPECIFIC: u8 = 0x03;

// Class-specific endpoint descriptor subtype
pub const EP_GENERAL: u8 = 0x01;

// Format type codes
pub const FORMAT_TYPE_I: u8 = 0x01;
pub const FORMAT_TYPE_II: u8 = 0x02;
pub const FORMAT_TYPE_III: u8 = 0x03;

// Audio data format tags (Type I-III)
pub const FORMAT_DATA_TYPE_I_UNDEFINED: u16 = 0x0000;
pub const FORMAT_DATA_PCM: u16 = 0x0001;
pub const FORMAT_DATA_PCM8: u16 = 0x0002;
pub const FORMAT_DATA_IEEE_FLOAT: u16 = 0x0003;
pub const FORMAT_DATA_ALAW: u16 = 0x0004;
pub const FORMAT_DATA_MULAW: u16 = 0x0005;
pub const FORMAT_DATA_TYPE_II_UNDEFINED: u16 = 0x1000;
pub const FORMAT_DATA_MPEG: u16 = 0x1001;
pub const FORMAT_DATA_AC3: u16 = 0x1002;
pub const FORMAT_DATA_TYPE_III_UNDEFINED: u16 = 0x2000;
pub const FORMAT_DATA_IEC1937_AC3: u16 = 0x2001;
pub const FORMAT_DATA_IEC1937_MPEG1: u16 = 0x2002;
pub const FORMAT_DATA_IEC1937_MPEG2: u16 = 0x2003;
pub const FORMAT_DATA_IEC1937_MPEG2_EXT: u16 = 0x2004;
pub const FORMAT_DATA_IEC1937_MPEG2_L1_LS: u16 = 0x2005;
pub const FORMAT_DATA_IEC1937_MPEG2_L2_LS: u16 = 0x2006;
/// Wildcard accepted by the capability queries; matches any format tag.
pub const FORMAT_DATA_ANY: u16 = 0xFFFF;

// Terminal types. The low byte selects a member within a family; a type
// with a zero low byte acts as a family wildcard in containment queries.
pub const TERMINAL_USB_UNDEFINED: u16 = 0x0100;
pub const TERMINAL_USB_STREAMING: u16 = 0x0101;
pub const TERMINAL_USB_VENDOR_SPEC: u16 = 0x01FF;
pub const TERMINAL_INPUT_UNDEFINED: u16 = 0x0200;
pub const TERMINAL_MICROPHONE: u16 = 0x0201;
pub const TERMINAL_DESKTOP_MIC: u16 = 0x0202;
pub const TERMINAL_PERSONAL_MIC: u16 = 0x0203;
pub const TERMINAL_OMNIDIR_MIC: u16 = 0x0204;
pub const TERMINAL_MIC_ARRAY: u16 = 0x0205;
pub const TERMINAL_PROC_MIC_ARRAY: u16 = 0x0206;
pub const TERMINAL_OUTPUT_UNDEFINED: u16 = 0x0300;
pub const TERMINAL_SPEAKER: u16 = 0x0301;
pub const TERMINAL_HEADPHONES: u16 = 0x0302;
pub const TERMINAL_HMD_AUDIO: u16 = 0x0303;
pub const TERMINAL_DESKTOP_SPEAKER: u16 = 0x0304;
pub const TERMINAL_ROOM_SPEAKER: u16 = 0x0305;
pub const TERMINAL_COMM_SPEAKER: u16 = 0x0306;
pub const TERMINAL_LFR_SPEAKER: u16 = 0x0307;
pub const TERMINAL_BIDIR_UNDEFINED: u16 = 0x0400;
pub const TERMINAL_HANDSET: u16 = 0x0401;
pub const TERMINAL_HEADSET: u16 = 0x0402;
pub const TERMINAL_SPEAKERPHONE: u16 = 0x0403;
pub const TERMINAL_SPEAKERPHONE_ECHO_SUPPRESSING: u16 = 0x0404;
pub const TERMINAL_SPEAKERPHONE_ECHO_CANCELLING: u16 = 0x0405;
pub const TERMINAL_EXTERNAL_UNDEFINED: u16 = 0x0600;
pub const TERMINAL_EXTERNAL_ANALOG: u16 = 0x0601;
pub const TERMINAL_EXTERNAL_DIGITAL: u16 = 0x0602;
/// Wildcard accepted by route queries; matches any terminal type.
pub const TERMINAL_ANY: u16 = 0x0F00;

// Standard request type bytes for class requests
pub const REQ_TYPE_IF_SET: u8 = 0x21;
pub const REQ_TYPE_IF_GET: u8 = 0xA1;
pub const REQ_TYPE_EP_SET: u8 = 0x22;
pub const REQ_TYPE_EP_GET: u8 = 0xA2;

// Class request codes
pub const REQ_SET_CUR: u8 = 0x01;
pub const REQ_SET_MIN: u8 = 0x02;
pub const REQ_SET_MAX: u8 = 0x03;
pub const REQ_SET_RES: u8 = 0x04;
pub const REQ_GET_CUR: u8 = 0x81;
pub const REQ_GET_MIN: u8 = 0x82;
pub const REQ_GET_MAX: u8 = 0x83;
pub const REQ_GET_RES: u8 = 0x84;

// Feature unit control selectors
pub const FU_MUTE_CONTROL: u8 = 0x01;
pub const FU_VOLUME_CONTROL: u8 = 0x02;
pub const FU_BASS_CONTROL: u8 = 0x03;
pub const FU_MID_CONTROL: u8 = 0x04;
pub const FU_TREBLE_CONTROL: u8 = 0x05;
pub const FU_GRAPHIC_EQUALIZER_CONTROL: u8 = 0x06;
pub const FU_AUTOMATIC_GAIN_CONTROL: u8 = 0x07;
pub const FU_DELAY_CONTROL: u8 = 0x08;
pub const FU_BASS_BOOST_CONTROL: u8 = 0x09;
pub const FU_LOUDNESS_CONTROL: u8 = 0x0A;

// Endpoint control selectors
pub const SAMPLING_FREQ_CONTROL: u8 = 0x01;
pub const PITCH_CONTROL: u8 = 0x02;

/// Bit in the iso endpoint's class-specific `bmAttributes`: the endpoint
/// accepts `SAMPLING_FREQ_CONTROL` requests.
pub const EP_ATTR_SAMPLING_FREQ: u8 = 0x01;

// Standard endpoint bmAttributes transfer-type field
pub const TRANSFER_TYPE_MASK: u8 = 0x03;
pub const TRANSFER_TYPE_ISOCHRONOUS: u8 = 0x01;
