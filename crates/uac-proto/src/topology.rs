//! Audio routes: the directed graph from an output terminal back through
//! units to the input terminals feeding it.
//!
//! Nodes live in a flat arena inside each route and link to each other by
//! index, so a route is plainly cloneable and needs no graph bookkeeping
//! beyond the vector itself. Node 0 is always the root output terminal.

use std::collections::HashSet;

use log::{debug, warn};
use serde::Serialize;

use crate::descriptor::{AudioControl, FeatureUnit, InputTerminal, OutputTerminal, Unit};
use crate::protocol::TERMINAL_ANY;

/// Index of a node within its route's arena.
pub type NodeRef = u32;

/// Payload of a route node.
#[derive(Debug, Clone, Serialize)]
pub enum NodeKind {
    Output(OutputTerminal),
    Unit(Unit),
    Input(InputTerminal),
}

/// One node of a route. `sink` points toward the output terminal,
/// `sources` toward the entities feeding this node.
#[derive(Debug, Clone, Serialize)]
pub struct RouteNode {
    pub kind: NodeKind,
    pub sink: Option<NodeRef>,
    pub sources: Vec<NodeRef>,
}

/// A rooted route through the audio function, keyed by its output
/// terminal.
#[derive(Debug, Clone, Serialize)]
pub struct AudioRoute {
    nodes: Vec<RouteNode>,
    /// Set when a source chain revisited a unit; the cycle was truncated.
    pub malformed: bool,
}

/// Terminal-type match with family wildcards: a type whose low byte is
/// zero matches every member of its family (high byte), and
/// [`TERMINAL_ANY`] matches everything.
pub fn matches_terminal(candidate: u16, expected: u16) -> bool {
    if expected == TERMINAL_ANY {
        true
    } else if expected & 0x00FF == 0 {
        candidate & 0xFF00 == expected & 0xFF00
    } else {
        candidate == expected
    }
}

impl AudioRoute {
    /// The output terminal this route is keyed by.
    pub fn output_terminal(&self) -> &OutputTerminal {
        match &self.nodes[0].kind {
            NodeKind::Output(t) => t,
            // the builder always roots a route at an output terminal
            _ => unreachable!("route root is an output terminal"),
        }
    }

    pub fn nodes(&self) -> &[RouteNode] {
        &self.nodes
    }

    /// The input terminals reachable from the root, in arena order.
    pub fn input_terminals(&self) -> impl Iterator<Item = &InputTerminal> {
        self.nodes.iter().filter_map(|n| match &n.kind {
            NodeKind::Input(t) => Some(t),
            _ => None,
        })
    }

    /// Every terminal id appearing in this route, root included.
    pub fn terminal_ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.nodes.iter().filter_map(|n| match &n.kind {
            NodeKind::Output(t) => Some(t.id),
            NodeKind::Input(t) => Some(t.id),
            NodeKind::Unit(_) => None,
        })
    }

    /// The feature unit directly feeding the output terminal, if that is
    /// what the root's source resolves to. Control operations (mute,
    /// volume) address this unit.
    pub fn feature_unit_next_to_root(&self) -> Option<(u8, &FeatureUnit)> {
        let first = *self.nodes[0].sources.first()?;
        match &self.nodes[first as usize].kind {
            NodeKind::Unit(unit) => unit.feature().map(|f| (unit.id, f)),
            _ => None,
        }
    }

    /// True when `terminal_type` matches the root output terminal or any
    /// input terminal of the route, honouring family wildcards.
    pub fn contains_terminal(&self, terminal_type: u16) -> bool {
        if matches_terminal(self.output_terminal().terminal_type, terminal_type) {
            return true;
        }
        self.input_terminals()
            .any(|t| matches_terminal(t.terminal_type, terminal_type))
    }
}

/// Build the route rooted at `output` by walking source ids breadth-first
/// through the unit set down to input terminals.
fn build_route(output: &OutputTerminal, units: &[Unit], inputs: &[InputTerminal]) -> AudioRoute {
    let mut nodes = vec![RouteNode {
        kind: NodeKind::Output(output.clone()),
        sink: None,
        sources: Vec::new(),
    }];
    let mut malformed = false;
    let mut seen_units: HashSet<u8> = HashSet::new();
    let mut chain = format!("out {}", output.id);

    let mut queue: Vec<NodeRef> = vec![0];
    let mut next = 0;
    while next < queue.len() {
        let current = queue[next];
        next += 1;

        let source_ids = match &nodes[current as usize].kind {
            NodeKind::Output(t) => vec![t.source_id],
            NodeKind::Unit(u) => u.source_ids(),
            NodeKind::Input(_) => Vec::new(),
        };

        for source_id in source_ids {
            if let Some(unit) = units.iter().find(|u| u.id == source_id) {
                if !seen_units.insert(source_id) {
                    warn!(
                        "audio route for terminal {}: unit {} appears twice, truncating cycle",
                        output.id, source_id
                    );
                    malformed = true;
                    continue;
                }
                chain.push_str(&format!(" < unit {}", unit.id));
                let node = RouteNode {
                    kind: NodeKind::Unit(unit.clone()),
                    sink: Some(current),
                    sources: Vec::new(),
                };
                let reference = nodes.len() as NodeRef;
                nodes.push(node);
                nodes[current as usize].sources.push(reference);
                queue.push(reference);
            } else if let Some(terminal) = inputs.iter().find(|t| t.id == source_id) {
                chain.push_str(&format!(" < in {}", terminal.id));
                let reference = nodes.len() as NodeRef;
                nodes.push(RouteNode {
                    kind: NodeKind::Input(terminal.clone()),
                    sink: Some(current),
                    sources: Vec::new(),
                });
                nodes[current as usize].sources.push(reference);
            } else {
                warn!(
                    "audio route for terminal {}: source id {} resolves to neither a unit nor an input terminal",
                    output.id, source_id
                );
            }
        }
    }

    debug!("audio route chain: {chain}");
    AudioRoute { nodes, malformed }
}

impl AudioControl {
    /// Derive one route per output terminal, in parse order.
    pub fn configure_routes(&mut self) {
        self.routes = self
            .output_terminals
            .iter()
            .map(|t| build_route(t, &self.units, &self.input_terminals))
            .collect();
    }
}
