//! Static validation run once, at [`crate::builder::GraphBuilder::build`] time.
//!
//! Every check here runs unconditionally, independent of `production_mode`:
//! shipping a structurally broken graph into production and only then
//! discovering it via a runtime `InvalidTransition` would defeat the point
//! of validating "at construction" at all. `production_mode` only gates the
//! runtime suppression of [`crate::error::EngineError::InvalidTransition`]
//! (§4.4), never the analyzer.

use std::collections::{HashSet, VecDeque};

use tracing::warn;

use crate::error::GraphError;
use crate::graph::{ChildrenMode, Graph, NodeId};
use crate::transition::TransitionDefinition;
use crate::types::{EventSpec, StateTag};

pub(crate) fn analyze<S: StateTag, Ev: EventSpec>(graph: &Graph<S, Ev>) -> Result<(), GraphError<S>> {
    check_initial_is_leaf(graph)?;
    check_targets(graph)?;
    check_forks_and_joins(graph)?;
    check_reachability(graph)?;
    check_guard_ordering(graph)?;
    Ok(())
}

/// Within a single `(node, trigger)` list, at most one entry may have no
/// guard, and if present it must be the last entry.
fn check_guard_ordering<S: StateTag, Ev: EventSpec>(graph: &Graph<S, Ev>) -> Result<(), GraphError<S>> {
    for node in &graph.arena {
        for defs in node.transitions.values() {
            let guardless_count = defs.iter().filter(|d| d.guard().is_none() && !d.is_no_op()).count();
            let last_is_guardless = defs.last().is_some_and(|d| d.guard().is_none());
            if guardless_count > 1 || (guardless_count == 1 && !last_is_guardless) {
                let state = node.kind().expect("transitions are never registered on the virtual root");
                warn!(?state, "analyzer: guardless transition must be last for its trigger");
                return Err(GraphError::NullChoiceMustBeLast { state });
            }
        }
    }
    Ok(())
}

fn check_initial_is_leaf<S: StateTag, Ev: EventSpec>(graph: &Graph<S, Ev>) -> Result<(), GraphError<S>> {
    let initial = graph.node(graph.initial_leaf());
    if !initial.is_leaf() {
        let kind = initial.kind().expect("initial leaf is never the virtual root");
        warn!(?kind, "analyzer: initial state is not a leaf");
        return Err(GraphError::InitialStateNotLeaf(kind));
    }
    Ok(())
}

fn check_targets<S: StateTag, Ev: EventSpec>(graph: &Graph<S, Ev>) -> Result<(), GraphError<S>> {
    for node in &graph.arena {
        for defs in node.transitions.values() {
            for def in defs {
                let targets: Vec<S> = match def {
                    TransitionDefinition::Plain { target, .. } | TransitionDefinition::Join { target, .. } => {
                        vec![*target]
                    }
                    TransitionDefinition::Fork { targets, .. } => targets.clone(),
                    TransitionDefinition::NoOp { .. } => vec![],
                };
                for target in targets {
                    match graph.lookup(target) {
                        None => {
                            warn!(?target, "analyzer: transition targets unregistered state");
                            return Err(GraphError::UnknownState(target));
                        }
                        Some(id) if graph.node(id).is_abstract() => {
                            warn!(?target, "analyzer: transition targets abstract state");
                            return Err(GraphError::AbstractTargetState(target));
                        }
                        Some(_) => {}
                    }
                }
            }
        }
    }
    Ok(())
}

fn check_forks_and_joins<S: StateTag, Ev: EventSpec>(graph: &Graph<S, Ev>) -> Result<(), GraphError<S>> {
    for node in &graph.arena {
        for defs in node.transitions.values() {
            for def in defs {
                match def {
                    TransitionDefinition::Fork { targets, .. } => {
                        let target_ids: Vec<NodeId> = targets.iter().map(|t| graph.lookup(*t).unwrap()).collect();
                        let lca = graph.least_common_ancestor(&target_ids);
                        let regions = graph.node(lca).children();
                        if graph.node(lca).children_mode() != ChildrenMode::Concurrent {
                            return Err(GraphError::ForkTargetsNotDistinctRegions(targets[0]));
                        }
                        let mut seen_regions: HashSet<NodeId> = HashSet::new();
                        for &target_id in &target_ids {
                            let Some((_, region)) = regions
                                .iter()
                                .find(|(_, child)| graph.is_self_or_ancestor(*child, target_id))
                            else {
                                return Err(GraphError::ForkTargetsNotDistinctRegions(targets[0]));
                            };
                            if !seen_regions.insert(*region) {
                                return Err(GraphError::ForkTargetsNotDistinctRegions(targets[0]));
                            }
                        }
                    }
                    TransitionDefinition::Join { sources, target, .. } => {
                        let source_ids: Vec<NodeId> = sources.iter().map(|s| graph.lookup(*s).unwrap()).collect();
                        let lca = graph.least_common_ancestor(&source_ids);
                        if graph.node(lca).children_mode() != ChildrenMode::Concurrent {
                            return Err(GraphError::JoinSourcesIncomplete(*target));
                        }
                        let sibling_count = graph.node(lca).children().len();
                        let mut covered: HashSet<NodeId> = HashSet::new();
                        for &source_id in &source_ids {
                            let Some((_, region)) = graph
                                .node(lca)
                                .children()
                                .iter()
                                .find(|(_, child)| graph.is_self_or_ancestor(*child, source_id))
                            else {
                                return Err(GraphError::JoinSourcesIncomplete(*target));
                            };
                            covered.insert(*region);
                        }
                        if covered.len() != sibling_count {
                            return Err(GraphError::JoinSourcesIncomplete(*target));
                        }
                    }
                    TransitionDefinition::Plain { .. } | TransitionDefinition::NoOp { .. } => {}
                }
            }
        }
    }
    Ok(())
}

fn check_reachability<S: StateTag, Ev: EventSpec>(graph: &Graph<S, Ev>) -> Result<(), GraphError<S>> {
    let mut reached: HashSet<NodeId> = HashSet::new();
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    reached.insert(graph.initial_leaf());
    queue.push_back(graph.initial_leaf());

    while let Some(id) = queue.pop_front() {
        for defs in graph.node(id).transitions.values().flatten() {
            let targets: Vec<S> = match defs {
                TransitionDefinition::Plain { target, .. } | TransitionDefinition::Join { target, .. } => {
                    vec![*target]
                }
                TransitionDefinition::Fork { targets, .. } => targets.clone(),
                TransitionDefinition::NoOp { .. } => vec![],
            };
            for target in targets {
                if let Some(target_id) = graph.lookup(target) {
                    if reached.insert(target_id) {
                        queue.push_back(target_id);
                    }
                }
            }
        }
        // Ancestors of a reached node also count as reached, and their own
        // transitions are reachable from this descendant by the hierarchical
        // ancestor-fallback walk (§4.2), so they need exploring too.
        for ancestor in graph.ancestors(id) {
            if reached.insert(ancestor) {
                queue.push_back(ancestor);
            }
        }
    }

    for (idx, node) in graph.arena.iter().enumerate() {
        if node.is_leaf() && !node.is_abstract() {
            let id = NodeId(idx);
            if !reached.contains(&id) {
                let kind = node.kind().expect("non-root leaf always has a kind");
                warn!(?kind, "analyzer: state is unreachable from the initial state");
                return Err(GraphError::UnreachableState(kind));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::builder::GraphBuilder;
    use crate::error::GraphError;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum S {
        A,
        B,
        C,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Ev {
        Go,
    }

    impl crate::types::EventSpec for Ev {
        type Kind = Ev;
        fn kind(&self) -> Self::Kind {
            *self
        }
    }

    #[test]
    fn unreachable_leaf_is_rejected() {
        let err = GraphBuilder::new(S::A)
            .state(S::A, |s| {
                s.on(Ev::Go, S::A, None::<fn(&Ev) -> bool>, None::<fn(&Ev)>);
            })
            .state(S::B, |_| {})
            .build()
            .unwrap_err();
        assert!(matches!(err, GraphError::UnreachableState(S::B)));
    }

    #[test]
    fn ancestor_transition_makes_descendant_reachable() {
        let graph = GraphBuilder::new(S::A)
            .state(S::A, |s| {
                s.on(Ev::Go, S::C, None::<fn(&Ev) -> bool>, None::<fn(&Ev)>);
                s.nested_state(S::B, |_| {});
            })
            .state(S::C, |_| {})
            .build();
        assert!(graph.is_ok(), "C is reachable via the ancestor-registered transition on A");
    }

    #[test]
    fn duplicate_state_is_rejected() {
        let err = GraphBuilder::new(S::A)
            .state(S::A, |_| {})
            .state(S::A, |_| {})
            .build()
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateState(S::A)));
    }

    #[test]
    fn guardless_transition_must_be_last() {
        let err = GraphBuilder::new(S::A)
            .state(S::A, |s| {
                s.on(Ev::Go, S::B, None::<fn(&Ev) -> bool>, None::<fn(&Ev)>);
                s.on(Ev::Go, S::C, Some(|_: &Ev| true), None::<fn(&Ev)>);
            })
            .state(S::B, |_| {})
            .state(S::C, |_| {})
            .build()
            .unwrap_err();
        assert!(matches!(err, GraphError::NullChoiceMustBeLast { state: S::A }));
    }
}
