//! Event selection and execution (§4.2 / §4.3): the pure core of the event
//! loop, factored out of [`crate::engine`] so it can run without touching any
//! channel or lock. Operates on a snapshot of active leaves and hands back
//! the next snapshot; [`crate::engine::Machine`]'s background task owns the
//! only mutable copy and serializes calls into this function one at a time.

use tracing::trace;

use crate::error::EngineError;
use crate::graph::{Graph, NodeId};
use crate::transition::TransitionDefinition;
use crate::types::{EventSpec, StateTag};

/// Select and execute one transition per currently-active orthogonal region,
/// given `event`. Regions whose ancestor walk finds nothing stay put; if
/// *no* region finds anything, the whole dispatch is an [`EngineError::InvalidTransition`].
pub(crate) fn dispatch<S: StateTag, Ev: EventSpec>(
    graph: &Graph<S, Ev>,
    current_leaves: &[NodeId],
    event: &Ev,
) -> Result<Vec<NodeId>, EngineError<S, Ev>> {
    let mut remaining = current_leaves.to_vec();
    let mut next_leaves = Vec::with_capacity(current_leaves.len());
    let mut matched = false;

    while let Some(leaf) = remaining.pop() {
        match find_transition(graph, leaf, event, current_leaves) {
            Some((def, consumed)) => {
                matched = true;
                let produced = execute(graph, leaf, def, event);
                remaining.retain(|l| !consumed.contains(l));
                next_leaves.extend(produced);
            }
            None => next_leaves.push(leaf),
        }
    }

    if !matched {
        let from = graph
            .node(current_leaves[0])
            .kind()
            .expect("an active leaf is never the virtual root");
        return Err(EngineError::InvalidTransition {
            from,
            event: event.clone(),
        });
    }

    Ok(next_leaves)
}

/// Walk from `leaf` up through its ancestors looking for the first
/// transition, in authoring order, whose guard passes (and, for a `Join`,
/// whose sibling sources are all satisfied by `active_leaves`). Returns the
/// matching definition plus the full set of leaves it consumes.
fn find_transition<'g, S: StateTag, Ev: EventSpec>(
    graph: &'g Graph<S, Ev>,
    leaf: NodeId,
    event: &Ev,
    active_leaves: &[NodeId],
) -> Option<(&'g TransitionDefinition<S, Ev>, Vec<NodeId>)> {
    let mut node = leaf;
    loop {
        if let Some(defs) = graph.node(node).transitions_for(event.kind()) {
            for def in defs {
                if def.is_no_op() {
                    continue;
                }
                let guard_ok = def.guard().map_or(true, |g| g(event));
                if !guard_ok {
                    continue;
                }
                if let TransitionDefinition::Join { sources, .. } = def {
                    let source_ids: Vec<NodeId> = sources.iter().map(|s| graph.lookup(*s).unwrap()).collect();
                    let all_satisfied = source_ids
                        .iter()
                        .all(|&sid| active_leaves.iter().any(|&l| l == sid || graph.is_self_or_ancestor(sid, l)));
                    if !all_satisfied {
                        continue;
                    }
                    return Some((def, source_ids));
                }
                return Some((def, vec![leaf]));
            }
        }

        if node == NodeId::ROOT {
            return None;
        }
        trace!(?node, "dispatch: no match at this level, climbing to parent");
        node = match graph.node(node).parent() {
            crate::graph::ParentLink::Root => NodeId::ROOT,
            crate::graph::ParentLink::Node(parent) => parent,
        };
    }
}

/// Run one transition: exit from every consumed leaf up to the LCA with the
/// transition's target(s), fire the effect, then enter back down. Returns the
/// leaf(s) now active as a result.
fn execute<S: StateTag, Ev: EventSpec>(
    graph: &Graph<S, Ev>,
    from_leaf: NodeId,
    def: &TransitionDefinition<S, Ev>,
    event: &Ev,
) -> Vec<NodeId> {
    match def {
        TransitionDefinition::Plain { effect, target, .. } => {
            let target_id = graph.lookup(*target).expect("analyzer guarantees targets resolve");
            let entered = run_transition(graph, from_leaf, target_id, effect.as_deref(), event);
            notify(graph, from_leaf, event, entered);
            vec![entered]
        }
        TransitionDefinition::Fork { effect, targets, .. } => {
            if let Some(effect) = effect {
                effect(event);
            }
            let from_kind = graph.node(from_leaf).kind();
            let target_ids: Vec<NodeId> = targets.iter().map(|t| graph.lookup(*t).unwrap()).collect();
            let lca = {
                let mut ids = vec![from_leaf];
                ids.extend(&target_ids);
                graph.least_common_ancestor(&ids)
            };
            // One source exits in favor of several targets; there is no single
            // "other endpoint" to report, so the first declared target stands
            // in for the whole fork in the exit callback.
            let exit_other_kind = targets.first().copied();
            exit_path(graph, from_leaf, lca, event, exit_other_kind);
            target_ids
                .iter()
                .map(|&target_id| {
                    enter_path(graph, lca, target_id, event, from_kind);
                    let entered = graph.leftmost_leaf_descent(target_id);
                    notify(graph, from_leaf, event, entered);
                    entered
                })
                .collect()
        }
        TransitionDefinition::Join {
            sources,
            effect,
            target,
            ..
        } => {
            if let Some(effect) = effect {
                effect(event);
            }
            let source_ids: Vec<NodeId> = sources.iter().map(|s| graph.lookup(*s).unwrap()).collect();
            let target_id = graph.lookup(*target).expect("analyzer guarantees targets resolve");
            let lca = {
                let mut ids = source_ids.clone();
                ids.push(target_id);
                graph.least_common_ancestor(&ids)
            };
            for &source in &source_ids {
                exit_path(graph, source, lca, event, Some(*target));
            }
            // Several sources enter in favor of one target; there is no single
            // "other endpoint" to report, so the first declared source stands
            // in for the whole join in the enter callback.
            let enter_other_kind = sources.first().copied();
            enter_path(graph, lca, target_id, event, enter_other_kind);
            let entered = graph.leftmost_leaf_descent(target_id);
            for &source in &source_ids {
                notify(graph, source, event, entered);
            }
            vec![entered]
        }
        TransitionDefinition::NoOp { .. } => vec![from_leaf],
    }
}

/// Invoke every registered observer with `(from, event, to)`.
fn notify<S: StateTag, Ev: EventSpec>(graph: &Graph<S, Ev>, from: NodeId, event: &Ev, to: NodeId) {
    let Some(from_kind) = graph.node(from).kind() else {
        return;
    };
    let Some(to_kind) = graph.node(to).kind() else {
        return;
    };
    for observer in graph.observers() {
        observer(from_kind, event, to_kind);
    }
}

fn run_transition<S: StateTag, Ev: EventSpec>(
    graph: &Graph<S, Ev>,
    from_leaf: NodeId,
    target: NodeId,
    effect: Option<&(dyn Fn(&Ev) + Send + Sync)>,
    event: &Ev,
) -> NodeId {
    let lca = graph.least_common_ancestor(&[from_leaf, target]);
    let from_kind = graph.node(from_leaf).kind();
    let target_kind = graph.node(target).kind();
    exit_path(graph, from_leaf, lca, event, target_kind);
    if let Some(effect) = effect {
        effect(event);
    }
    enter_path(graph, lca, target, event, from_kind);
    graph.leftmost_leaf_descent(target)
}

/// Fire `on_exit` from `from` up to, but not including, `lca`.
fn exit_path<S: StateTag, Ev: EventSpec>(
    graph: &Graph<S, Ev>,
    from: NodeId,
    lca: NodeId,
    event: &Ev,
    other_kind: Option<S>,
) {
    let mut node = from;
    while node != lca {
        if let Some(on_exit) = &graph.node(node).on_exit {
            let kind = graph.node(node).kind().expect("non-root node always has a kind");
            on_exit(other_kind.unwrap_or(kind), event);
        }
        node = match graph.node(node).parent() {
            crate::graph::ParentLink::Root => break,
            crate::graph::ParentLink::Node(parent) => parent,
        };
    }
}

/// Fire `on_enter` from just below `lca` down to `target`.
fn enter_path<S: StateTag, Ev: EventSpec>(
    graph: &Graph<S, Ev>,
    lca: NodeId,
    target: NodeId,
    event: &Ev,
    other_kind: Option<S>,
) {
    let mut chain = Vec::new();
    let mut node = target;
    while node != lca {
        chain.push(node);
        node = match graph.node(node).parent() {
            crate::graph::ParentLink::Root => break,
            crate::graph::ParentLink::Node(parent) => parent,
        };
    }
    chain.reverse();
    for node in chain {
        if let Some(on_enter) = &graph.node(node).on_enter {
            let kind = graph.node(node).kind().expect("non-root node always has a kind");
            on_enter(other_kind.unwrap_or(kind), event);
        }
    }
}
