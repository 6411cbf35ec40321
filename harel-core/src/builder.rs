//! The fluent graph-construction API.
//!
//! The distilled spec treats the builder as an external collaborator; a
//! runnable crate has to ship the only supported way to actually produce a
//! [`Graph`], so it lives here. `GraphBuilder` and `StateBuilder` assemble a
//! plain tree (`PendingState`) which `build()` compiles into the frozen
//! arena, running the analyzer (§4.5) before handing back a `Graph`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::analyzer;
use crate::error::GraphError;
use crate::graph::{Callback, ChildrenMode, Graph, NodeId, Observer, ParentLink, StateNode};
use crate::transition::{Effect, Guard, TransitionDefinition};
use crate::types::{EventSpec, StateTag};

struct PendingState<S: StateTag, Ev: EventSpec> {
    kind: S,
    children: Vec<PendingState<S, Ev>>,
    children_mode: ChildrenMode,
    transitions: HashMap<Ev::Kind, Vec<TransitionDefinition<S, Ev>>>,
    on_enter: Option<Callback<S, Ev>>,
    on_exit: Option<Callback<S, Ev>>,
}

impl<S: StateTag, Ev: EventSpec> PendingState<S, Ev> {
    fn leaf(kind: S) -> Self {
        PendingState {
            kind,
            children: Vec::new(),
            children_mode: ChildrenMode::Leaf,
            transitions: HashMap::new(),
            on_enter: None,
            on_exit: None,
        }
    }
}

type JoinFanout<S, Ev> = Vec<(Vec<S>, <Ev as EventSpec>::Kind, TransitionDefinition<S, Ev>)>;

/// Configures one node while it is being registered; see [`GraphBuilder::state`].
pub struct StateBuilder<S: StateTag, Ev: EventSpec> {
    pending: PendingState<S, Ev>,
    join_fanout: JoinFanout<S, Ev>,
}

impl<S: StateTag, Ev: EventSpec> StateBuilder<S, Ev> {
    fn new(kind: S) -> Self {
        StateBuilder {
            pending: PendingState::leaf(kind),
            join_fanout: Vec::new(),
        }
    }

    /// Register a mutually-exclusive nested child.
    pub fn nested_state(
        &mut self,
        kind: S,
        configure: impl FnOnce(&mut StateBuilder<S, Ev>),
    ) -> &mut Self {
        self.pending.children_mode = ChildrenMode::Nested;
        let mut child = StateBuilder::new(kind);
        configure(&mut child);
        self.join_fanout.extend(child.join_fanout);
        self.pending.children.push(child.pending);
        self
    }

    /// Register an orthogonal (concurrent) region.
    pub fn concurrent_region(
        &mut self,
        kind: S,
        configure: impl FnOnce(&mut StateBuilder<S, Ev>),
    ) -> &mut Self {
        self.pending.children_mode = ChildrenMode::Concurrent;
        let mut child = StateBuilder::new(kind);
        configure(&mut child);
        self.join_fanout.extend(child.join_fanout);
        self.pending.children.push(child.pending);
        self
    }

    /// Register a plain transition: exactly one target.
    pub fn on<G, E>(
        &mut self,
        trigger: Ev::Kind,
        target: S,
        guard: Option<G>,
        effect: Option<E>,
    ) -> &mut Self
    where
        G: Fn(&Ev) -> bool + Send + Sync + 'static,
        E: Fn(&Ev) + Send + Sync + 'static,
    {
        let def = TransitionDefinition::Plain {
            from: NodeId::ROOT, // patched in during compilation, see `compile`
            trigger,
            guard: guard.map(|g| Arc::new(g) as Guard<Ev>),
            effect: effect.map(|e| Arc::new(e) as Effect<Ev>),
            target,
        };
        self.pending.transitions.entry(trigger).or_default().push(def);
        self
    }

    /// Register a fork: fans out into two or more concurrent regions of a
    /// common ancestor. Validated in full by the analyzer at `build()` time.
    pub fn on_fork<G, E>(
        &mut self,
        trigger: Ev::Kind,
        targets: Vec<S>,
        guard: Option<G>,
        effect: Option<E>,
    ) -> &mut Self
    where
        G: Fn(&Ev) -> bool + Send + Sync + 'static,
        E: Fn(&Ev) + Send + Sync + 'static,
    {
        let def = TransitionDefinition::Fork {
            from: NodeId::ROOT,
            trigger,
            guard: guard.map(|g| Arc::new(g) as Guard<Ev>),
            effect: effect.map(|e| Arc::new(e) as Effect<Ev>),
            targets,
        };
        self.pending.transitions.entry(trigger).or_default().push(def);
        self
    }

    /// Register a join. Call this on the builder for the node whose children
    /// are the concurrent regions the join gathers; `sources` names one
    /// join-source leaf per sibling region.
    pub fn on_join<G, E>(
        &mut self,
        trigger: Ev::Kind,
        sources: Vec<S>,
        target: S,
        guard: Option<G>,
        effect: Option<E>,
    ) -> &mut Self
    where
        G: Fn(&Ev) -> bool + Send + Sync + 'static,
        E: Fn(&Ev) + Send + Sync + 'static,
    {
        let def = TransitionDefinition::Join {
            sources: sources.clone(),
            trigger,
            guard: guard.map(|g| Arc::new(g) as Guard<Ev>),
            effect: effect.map(|e| Arc::new(e) as Effect<Ev>),
            target,
        };
        // A join is registered on every declared source node, not on `self`;
        // stash it here and fan it out once every node's NodeId is known.
        self.join_fanout.push((sources, trigger, def));
        self
    }

    pub fn on_enter(&mut self, f: impl Fn(S, &Ev) + Send + Sync + 'static) -> &mut Self {
        self.pending.on_enter = Some(Arc::new(f));
        self
    }

    pub fn on_exit(&mut self, f: impl Fn(S, &Ev) + Send + Sync + 'static) -> &mut Self {
        self.pending.on_exit = Some(Arc::new(f));
        self
    }
}

/// Assembles a [`Graph`] from scratch.
pub struct GraphBuilder<S: StateTag, Ev: EventSpec> {
    initial: Option<S>,
    top_level: Vec<PendingState<S, Ev>>,
    observers: Vec<Observer<S, Ev>>,
    join_fanout: JoinFanout<S, Ev>,
}

impl<S: StateTag, Ev: EventSpec> GraphBuilder<S, Ev> {
    /// Start a new graph; `initial` is used as the configured initial leaf
    /// unless it turns out not to be a leaf, in which case `build()` fails.
    #[must_use]
    pub fn new(initial: S) -> Self {
        GraphBuilder {
            initial: Some(initial),
            top_level: Vec::new(),
            observers: Vec::new(),
            join_fanout: Vec::new(),
        }
    }

    /// Register a top-level state.
    pub fn state(mut self, kind: S, configure: impl FnOnce(&mut StateBuilder<S, Ev>)) -> Self {
        let mut sb = StateBuilder::new(kind);
        configure(&mut sb);
        self.join_fanout.extend(sb.join_fanout);
        self.top_level.push(sb.pending);
        self
    }

    /// Register a global transition observer, invoked as `(from, event, to)`
    /// once per executed sub-transition.
    #[must_use]
    pub fn observe(mut self, f: impl Fn(S, &Ev, S) + Send + Sync + 'static) -> Self {
        self.observers.push(Arc::new(f));
        self
    }

    /// Freeze the tree, run the analyzer, and return the ready-to-dispatch
    /// graph, or the first structural violation found.
    pub fn build(self) -> Result<Graph<S, Ev>, GraphError<S>> {
        let mut arena = vec![StateNode::root()];
        let mut index = HashMap::new();

        for pending in &self.top_level {
            compile_node(pending, ParentLink::Root, &mut arena, &mut index)?;
        }

        for (sources, trigger, def) in &self.join_fanout {
            for source in sources {
                let Some(&id) = index.get(source) else {
                    return Err(GraphError::UnknownState(*source));
                };
                arena[id.0]
                    .transitions
                    .entry(*trigger)
                    .or_default()
                    .push(def.clone());
            }
        }

        let initial = self.initial.expect("GraphBuilder::new always sets initial");
        let initial_leaf = *index.get(&initial).ok_or(GraphError::UnknownState(initial))?;

        let graph = Graph {
            arena,
            index,
            initial_leaf,
            observers: self.observers,
        };

        analyzer::analyze(&graph)?;
        Ok(graph)
    }
}

fn compile_node<S: StateTag, Ev: EventSpec>(
    pending: &PendingState<S, Ev>,
    parent: ParentLink,
    arena: &mut Vec<StateNode<S, Ev>>,
    index: &mut HashMap<S, NodeId>,
) -> Result<NodeId, GraphError<S>> {
    if index.contains_key(&pending.kind) {
        return Err(GraphError::DuplicateState(pending.kind));
    }

    let id = NodeId(arena.len());
    arena.push(StateNode {
        kind: Some(pending.kind),
        parent,
        children: Vec::new(),
        children_mode: pending.children_mode,
        transitions: HashMap::new(),
        on_enter: pending.on_enter.clone(),
        on_exit: pending.on_exit.clone(),
    });
    index.insert(pending.kind, id);

    let mut children = Vec::with_capacity(pending.children.len());
    for child in &pending.children {
        let child_id = compile_node(child, ParentLink::Node(id), arena, index)?;
        children.push((child.kind, child_id));
    }

    // Patch transitions now that this node's id, and every other node's id
    // registered so far, are known: resolve each `from: NodeId::ROOT`
    // placeholder to the node it was actually authored on.
    let mut transitions = HashMap::new();
    for (trigger, defs) in &pending.transitions {
        let patched: Vec<TransitionDefinition<S, Ev>> = defs.iter().map(|d| patch_from(d, id)).collect();
        transitions.insert(*trigger, patched);
    }

    let node = &mut arena[id.0];
    node.children = children;
    node.transitions = transitions;
    Ok(id)
}

fn patch_from<S: StateTag, Ev: EventSpec>(
    def: &TransitionDefinition<S, Ev>,
    from: NodeId,
) -> TransitionDefinition<S, Ev> {
    match def.clone() {
        TransitionDefinition::Plain {
            trigger,
            guard,
            effect,
            target,
            ..
        } => TransitionDefinition::Plain {
            from,
            trigger,
            guard,
            effect,
            target,
        },
        TransitionDefinition::Fork {
            trigger,
            guard,
            effect,
            targets,
            ..
        } => TransitionDefinition::Fork {
            from,
            trigger,
            guard,
            effect,
            targets,
        },
        other @ (TransitionDefinition::Join { .. } | TransitionDefinition::NoOp { .. }) => other,
    }
}
