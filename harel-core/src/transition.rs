//! [`TransitionDefinition`]: the tagged variants describing what can happen
//! when a trigger event reaches a node, plus the uniform guard/effect
//! closure signatures every variant shares.

use std::sync::Arc;

use crate::graph::NodeId;
use crate::types::{EventSpec, StateTag};

/// A pure predicate over an event value. May close over external state, but
/// the engine treats it as opaque and invokes it with nothing but the event.
pub type Guard<Ev> = Arc<dyn Fn(&Ev) -> bool + Send + Sync>;

/// A side effect invoked exactly once when a transition fires.
pub type Effect<Ev> = Arc<dyn Fn(&Ev) + Send + Sync>;

/// One possible transition registered against a node for a given trigger.
///
/// A single `(node, trigger)` pair maps to an ordered `Vec` of these;
/// authoring order is the guard-evaluation order (§4.2).
pub enum TransitionDefinition<S: StateTag, Ev: EventSpec> {
    /// Exactly one target leaf (or abstract state resolved via leftmost descent).
    Plain {
        from: NodeId,
        trigger: Ev::Kind,
        guard: Option<Guard<Ev>>,
        effect: Option<Effect<Ev>>,
        target: S,
    },
    /// Fans out into `targets.len() >= 2` distinct concurrent regions of a
    /// common ancestor.
    Fork {
        from: NodeId,
        trigger: Ev::Kind,
        guard: Option<Guard<Ev>>,
        effect: Option<Effect<Ev>>,
        targets: Vec<S>,
    },
    /// Fires once every concurrent sibling region has reached its declared
    /// join source. Registered identically on each source node.
    Join {
        sources: Vec<S>,
        trigger: Ev::Kind,
        guard: Option<Guard<Ev>>,
        effect: Option<Effect<Ev>>,
        target: S,
    },
    /// Synthesized when no user transition applies at this node; signals the
    /// dispatcher to retry at the parent.
    NoOp { from: NodeId, trigger: Ev::Kind },
}

impl<S: StateTag, Ev: EventSpec> TransitionDefinition<S, Ev> {
    pub(crate) fn trigger(&self) -> Ev::Kind {
        match self {
            TransitionDefinition::Plain { trigger, .. }
            | TransitionDefinition::Fork { trigger, .. }
            | TransitionDefinition::Join { trigger, .. }
            | TransitionDefinition::NoOp { trigger, .. } => *trigger,
        }
    }

    pub(crate) fn guard(&self) -> Option<&Guard<Ev>> {
        match self {
            TransitionDefinition::Plain { guard, .. }
            | TransitionDefinition::Fork { guard, .. }
            | TransitionDefinition::Join { guard, .. } => guard.as_ref(),
            TransitionDefinition::NoOp { .. } => None,
        }
    }

    pub(crate) fn is_no_op(&self) -> bool {
        matches!(self, TransitionDefinition::NoOp { .. })
    }
}

impl<S: StateTag, Ev: EventSpec> Clone for TransitionDefinition<S, Ev> {
    fn clone(&self) -> Self {
        match self {
            TransitionDefinition::Plain {
                from,
                trigger,
                guard,
                effect,
                target,
            } => TransitionDefinition::Plain {
                from: *from,
                trigger: *trigger,
                guard: guard.clone(),
                effect: effect.clone(),
                target: *target,
            },
            TransitionDefinition::Fork {
                from,
                trigger,
                guard,
                effect,
                targets,
            } => TransitionDefinition::Fork {
                from: *from,
                trigger: *trigger,
                guard: guard.clone(),
                effect: effect.clone(),
                targets: targets.clone(),
            },
            TransitionDefinition::Join {
                sources,
                trigger,
                guard,
                effect,
                target,
            } => TransitionDefinition::Join {
                sources: sources.clone(),
                trigger: *trigger,
                guard: guard.clone(),
                effect: effect.clone(),
                target: *target,
            },
            TransitionDefinition::NoOp { from, trigger } => TransitionDefinition::NoOp {
                from: *from,
                trigger: *trigger,
            },
        }
    }
}
