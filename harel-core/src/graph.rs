//! The frozen state tree: [`StateNode`], the arena that owns it, and [`Graph`],
//! the read-only, `Arc`-shareable handle the engine dispatches against.

use std::collections::HashMap;
use std::sync::Arc;

use crate::state_path::StatePath;
use crate::transition::TransitionDefinition;
use crate::types::{EventSpec, StateTag};

/// A stable index into a [`Graph`]'s node arena.
///
/// Replaces the source's self-referencing `VirtualRoot.parent == VirtualRoot`
/// sentinel: nodes own their children by value, and a parent is a
/// non-owning back-link resolved through this arena rather than a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The synthetic virtual root is always the first node in the arena.
    pub const ROOT: NodeId = NodeId(0);
}

/// A node's parent, modeled as a closed variant instead of a self-loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParentLink {
    /// This node is the synthetic virtual root; upward walks terminate here.
    Root,
    /// This node's parent is the named node.
    Node(NodeId),
}

/// How a node's children relate to one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildrenMode {
    /// No children; this node is a leaf.
    Leaf,
    /// Children are mutually exclusive; exactly one is active at a time.
    Nested,
    /// Children are all simultaneously active whenever this node is entered.
    Concurrent,
}

/// Invoked on entry/exit of a node, given the complementary node's kind
/// (the transition's other endpoint) and the event driving the transition.
pub type Callback<S, Ev> = Arc<dyn Fn(S, &Ev) + Send + Sync>;

/// Invoked once per executed sub-transition: `(from, event, to)`.
pub type Observer<S, Ev> = Arc<dyn Fn(S, &Ev, S) + Send + Sync>;

/// One node in the frozen state tree.
pub struct StateNode<S: StateTag, Ev: EventSpec> {
    /// `None` only for the synthetic virtual root.
    pub(crate) kind: Option<S>,
    pub(crate) parent: ParentLink,
    /// Ordered child kind -> node id; authoring order is preserved.
    pub(crate) children: Vec<(S, NodeId)>,
    pub(crate) children_mode: ChildrenMode,
    /// Authoring-order transition lists, keyed by trigger kind.
    pub(crate) transitions: HashMap<Ev::Kind, Vec<TransitionDefinition<S, Ev>>>,
    pub(crate) on_enter: Option<Callback<S, Ev>>,
    pub(crate) on_exit: Option<Callback<S, Ev>>,
}

impl<S: StateTag, Ev: EventSpec> StateNode<S, Ev> {
    pub(crate) fn root() -> Self {
        StateNode {
            kind: None,
            parent: ParentLink::Root,
            children: Vec::new(),
            children_mode: ChildrenMode::Nested,
            transitions: HashMap::new(),
            on_enter: None,
            on_exit: None,
        }
    }

    /// This node's state tag, or `None` for the virtual root.
    #[must_use]
    pub fn kind(&self) -> Option<S> {
        self.kind
    }

    #[must_use]
    pub fn parent(&self) -> ParentLink {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[(S, NodeId)] {
        &self.children
    }

    #[must_use]
    pub fn children_mode(&self) -> ChildrenMode {
        self.children_mode
    }

    /// No children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Has children, or is the virtual root: cannot be a direct transition target.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.kind.is_none() || !self.children.is_empty()
    }

    pub(crate) fn transitions_for(&self, trigger: Ev::Kind) -> Option<&[TransitionDefinition<S, Ev>]> {
        self.transitions.get(&trigger).map(Vec::as_slice)
    }

    /// Every trigger kind this node has at least one transition registered for.
    #[must_use]
    pub fn registered_triggers(&self) -> Vec<Ev::Kind> {
        self.transitions.keys().copied().collect()
    }
}

/// The frozen, immutable state tree produced by [`crate::builder::GraphBuilder::build`].
///
/// Cheaply `Arc`-shareable: once built, a `Graph` lives for the machine's
/// lifetime and is read by the dispatcher without any locking.
pub struct Graph<S: StateTag, Ev: EventSpec> {
    pub(crate) arena: Vec<StateNode<S, Ev>>,
    pub(crate) index: HashMap<S, NodeId>,
    pub(crate) initial_leaf: NodeId,
    pub(crate) observers: Vec<Observer<S, Ev>>,
}

impl<S: StateTag, Ev: EventSpec> Graph<S, Ev> {
    /// O(1) lookup of a node by its state kind.
    #[must_use]
    pub fn lookup(&self, kind: S) -> Option<NodeId> {
        self.index.get(&kind).copied()
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &StateNode<S, Ev> {
        &self.arena[id.0]
    }

    /// Immediate children of the virtual root.
    #[must_use]
    pub fn top_level_nodes(&self) -> &[(S, NodeId)] {
        &self.arena[NodeId::ROOT.0].children
    }

    #[must_use]
    pub fn initial_leaf(&self) -> NodeId {
        self.initial_leaf
    }

    #[must_use]
    pub fn observers(&self) -> &[Observer<S, Ev>] {
        &self.observers
    }

    /// Walk from `id` up to (and including) the virtual root.
    pub(crate) fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = Some(id);
        std::iter::from_fn(move || {
            let this = current?;
            current = match self.node(this).parent {
                ParentLink::Root if this == NodeId::ROOT => None,
                ParentLink::Root => Some(NodeId::ROOT),
                ParentLink::Node(parent) => Some(parent),
            };
            Some(this)
        })
    }

    /// Whether `ancestor` is `node` itself or one of its ancestors.
    #[must_use]
    pub fn is_self_or_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|n| n == ancestor)
    }

    /// The depth of a node (number of ancestors, root = 0).
    fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count() - 1
    }

    /// The deepest node that is an ancestor-or-self of every node in `ids`.
    pub(crate) fn least_common_ancestor(&self, ids: &[NodeId]) -> NodeId {
        let Some((first, rest)) = ids.split_first() else {
            return NodeId::ROOT;
        };
        let mut candidates: Vec<NodeId> = self.ancestors(*first).collect();
        for &id in rest {
            let this_chain: std::collections::HashSet<NodeId> = self.ancestors(id).collect();
            candidates.retain(|c| this_chain.contains(c));
        }
        candidates
            .into_iter()
            .max_by_key(|&c| self.depth(c))
            .unwrap_or(NodeId::ROOT)
    }

    /// Build the root-to-leaf [`StatePath`] ending at `leaf`.
    #[must_use]
    pub fn path_of(&self, leaf: NodeId) -> StatePath<S> {
        let mut kinds: Vec<S> = self
            .ancestors(leaf)
            .filter_map(|id| self.node(id).kind)
            .collect();
        kinds.reverse();
        StatePath::new(kinds)
    }

    /// The full set of active leaves a machine starts in: the designated
    /// `initial_leaf`'s branch at every `Nested` ancestor, fanned out to
    /// every sibling at every `Concurrent` ancestor along the way. A bare
    /// `initial_leaf` is not enough once any ancestor is a concurrent
    /// region — entering that region enters all of it, not just the branch
    /// leading to the configured initial leaf.
    #[must_use]
    pub fn initial_configuration(&self) -> Vec<NodeId> {
        let chain: std::collections::HashSet<NodeId> = self.ancestors(self.initial_leaf).collect();
        let mut leaves = Vec::new();
        self.expand_initial(NodeId::ROOT, &chain, &mut leaves);
        leaves
    }

    fn expand_initial(&self, node: NodeId, chain: &std::collections::HashSet<NodeId>, leaves: &mut Vec<NodeId>) {
        let this = self.node(node);
        if this.is_leaf() {
            leaves.push(node);
            return;
        }
        match this.children_mode {
            ChildrenMode::Concurrent => {
                for &(_, child) in this.children() {
                    self.expand_initial(child, chain, leaves);
                }
            }
            ChildrenMode::Nested | ChildrenMode::Leaf => {
                let chosen = this
                    .children()
                    .iter()
                    .find(|(_, child)| chain.contains(child))
                    .or_else(|| this.children().first())
                    .expect("non-leaf node always has at least one child");
                self.expand_initial(chosen.1, chain, leaves);
            }
        }
    }

    /// Whether `id` has no outgoing transition for any event, counting
    /// transitions registered on its ancestors too (an ancestor's transition
    /// can still fire for a leaf, so it still blocks termination).
    #[must_use]
    pub fn is_terminal(&self, id: NodeId) -> bool {
        self.ancestors(id).all(|n| self.node(n).transitions.is_empty())
    }

    /// Descend from `from` toward `target`, extending through the leftmost
    /// child at each abstract node, until a leaf is reached.
    #[must_use]
    pub fn leftmost_leaf_descent(&self, target: NodeId) -> NodeId {
        let mut current = target;
        loop {
            let node = self.node(current);
            match node.children.first() {
                Some((_, child)) if node.children_mode == ChildrenMode::Nested => {
                    current = *child;
                }
                _ => break,
            }
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::GraphBuilder;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum S {
        Running,
        AudioOn,
        AudioOff,
        VideoOn,
        VideoOff,
        Idle,
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
    fn initial_configuration_fans_out_concurrent_regions() {
        let graph = GraphBuilder::new(S::AudioOn)
            .state(S::Running, |s| {
                s.concurrent_region(S::AudioOn, |_| {});
                s.concurrent_region(S::VideoOn, |_| {});
            })
            .build()
            .expect("graph is well-formed");

        let config = graph.initial_configuration();
        assert_eq!(config.len(), 2);
        assert!(config.contains(&graph.lookup(S::AudioOn).unwrap()));
        assert!(config.contains(&graph.lookup(S::VideoOn).unwrap()));
    }

    #[test]
    fn initial_configuration_is_single_leaf_without_concurrency() {
        let graph = GraphBuilder::new(S::Idle).state(S::Idle, |_| {}).build().expect("graph is well-formed");
        let config = graph.initial_configuration();
        assert_eq!(config, vec![graph.lookup(S::Idle).unwrap()]);
    }

    #[test]
    fn terminal_state_has_no_transitions_anywhere_on_its_ancestor_chain() {
        let graph = GraphBuilder::new(S::Idle)
            .state(S::Idle, |s| {
                s.on(Ev::Go, S::AudioOn, None::<fn(&Ev) -> bool>, None::<fn(&Ev)>);
            })
            .state(S::AudioOn, |_| {})
            .build()
            .expect("graph is well-formed");

        assert!(!graph.is_terminal(graph.lookup(S::Idle).unwrap()));
        assert!(graph.is_terminal(graph.lookup(S::AudioOn).unwrap()));
    }
}
