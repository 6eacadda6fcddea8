//! uac-proto: USB Audio Class 1.0 descriptor model and topology queries
//!
//! Lowers the class-specific descriptor stream of a UAC 1.0 device into a
//! typed model, derives per-output-terminal audio routes, and answers
//! capability queries (formats, channel counts, sample rates, bit
//! resolutions) over the parsed alternate settings.
//!
//! This crate is pure data: it consumes a [`view::ConfigView`] snapshot of
//! the standard configuration descriptor and never talks to the bus.

pub mod codec;
pub mod descriptor;
pub mod parser;
pub mod protocol;
pub mod topology;
pub mod view;

pub use descriptor::*;
pub use parser::{ParseError, parse_device};
pub use topology::{AudioRoute, NodeKind, NodeRef, RouteNode, matches_terminal};
pub use view::*;
