//! Text-only diagram export (§4.6): walks a frozen [`Graph`] plus a
//! [`StateOfMind`] snapshot and renders Graphviz `dot`, Mermaid
//! `stateDiagram-v2`, or `state-machine-cat` source. No layout, no
//! rendering — those stay with whatever external tool consumes this text.

use std::fmt::Write as _;

use crate::graph::{ChildrenMode, Graph, NodeId};
use crate::state_of_mind::StateOfMind;
use crate::transition::TransitionDefinition;
use crate::types::{EventSpec, StateTag};

/// Output formats this crate knows how to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramFormat {
    Dot,
    Mermaid,
    Smcat,
}

/// Render `graph`, marking every leaf active in `snapshot`, as `format`'s
/// source text.
#[must_use]
pub fn render<S: StateTag, Ev: EventSpec>(
    graph: &Graph<S, Ev>,
    snapshot: &StateOfMind<S>,
    format: DiagramFormat,
) -> String {
    let active: Vec<NodeId> = snapshot
        .leaves()
        .into_iter()
        .filter_map(|kind| graph.lookup(kind))
        .collect();
    match format {
        DiagramFormat::Dot => render_dot(graph, &active),
        DiagramFormat::Mermaid => render_mermaid(graph, &active),
        DiagramFormat::Smcat => render_smcat(graph, &active),
    }
}

/// All non-root node ids reachable from the top level, parent before children.
fn all_node_ids<S: StateTag, Ev: EventSpec>(graph: &Graph<S, Ev>) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = graph.top_level_nodes().iter().map(|&(_, id)| id).rev().collect();
    while let Some(id) = stack.pop() {
        out.push(id);
        for &(_, child) in graph.node(id).children().iter().rev() {
            stack.push(child);
        }
    }
    out
}

fn for_each_edge<S: StateTag, Ev: EventSpec>(graph: &Graph<S, Ev>, mut f: impl FnMut(S, Ev::Kind, S)) {
    for idx in all_node_ids(graph) {
        let Some(from_kind) = graph.node(idx).kind() else { continue };
        for trigger in all_triggers(graph, idx) {
            let Some(defs) = graph.node(idx).transitions_for(trigger) else { continue };
            for def in defs {
                let targets: Vec<S> = match def {
                    TransitionDefinition::Plain { target, .. } | TransitionDefinition::Join { target, .. } => {
                        vec![*target]
                    }
                    TransitionDefinition::Fork { targets, .. } => targets.clone(),
                    TransitionDefinition::NoOp { .. } => vec![],
                };
                for target in targets {
                    f(from_kind, trigger, target);
                }
            }
        }
    }
}

fn all_triggers<S: StateTag, Ev: EventSpec>(graph: &Graph<S, Ev>, idx: NodeId) -> Vec<Ev::Kind> {
    graph.node(idx).registered_triggers()
}

fn render_dot<S: StateTag, Ev: EventSpec>(graph: &Graph<S, Ev>, active: &[NodeId]) -> String {
    let mut out = String::new();
    out.push_str("digraph statechart {\n");
    for idx in all_node_ids(graph) {
        let Some(kind) = graph.node(idx).kind() else { continue };
        let shape = if graph.node(idx).children_mode() == ChildrenMode::Concurrent {
            "doubleoctagon"
        } else {
            "box"
        };
        let style = if active.contains(&idx) {
            ", style=filled, fillcolor=lightgray"
        } else {
            ""
        };
        let _ = writeln!(out, "  \"{kind:?}\" [shape={shape}{style}];");
    }
    for_each_edge(graph, |from_kind, trigger, target_kind| {
        let _ = writeln!(out, "  \"{from_kind:?}\" -> \"{target_kind:?}\" [label=\"{trigger:?}\"];");
    });
    out.push_str("}\n");
    out
}

fn render_mermaid<S: StateTag, Ev: EventSpec>(graph: &Graph<S, Ev>, active: &[NodeId]) -> String {
    let mut out = String::new();
    out.push_str("stateDiagram-v2\n");
    for &idx in active {
        if let Some(kind) = graph.node(idx).kind() {
            let _ = writeln!(out, "    [*] --> {kind:?}");
        }
    }
    for_each_edge(graph, |from_kind, trigger, target_kind| {
        let _ = writeln!(out, "    {from_kind:?} --> {target_kind:?} : {trigger:?}");
    });
    out
}

fn render_smcat<S: StateTag, Ev: EventSpec>(graph: &Graph<S, Ev>, _active: &[NodeId]) -> String {
    let mut out = String::new();
    for_each_edge(graph, |from_kind, trigger, target_kind| {
        let _ = writeln!(out, "{from_kind:?} => {target_kind:?} : {trigger:?};");
    });
    out
}
