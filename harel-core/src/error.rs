//! Error types for graph construction and event dispatch.

use std::fmt::Debug;

use crate::types::EventSpec;

/// Errors the [`crate::builder::GraphBuilder`] can reject a graph for at `build()` time.
///
/// Construction errors are always fatal: a graph that fails validation
/// never produces a [`crate::engine::Machine`].
#[derive(Debug, thiserror::Error)]
pub enum GraphError<S: Debug> {
    /// The same state kind was registered more than once.
    #[error("state {0:?} was registered more than once")]
    DuplicateState(S),

    /// A transition targets a state kind that was never registered.
    #[error("transition targets unregistered state {0:?}")]
    UnknownState(S),

    /// A transition targets a state that has children (cannot be entered directly).
    #[error("transition targets abstract state {0:?}, which has children")]
    AbstractTargetState(S),

    /// A non-abstract state is not reachable from the initial state's transitive closure.
    #[error("state {0:?} is unreachable from the initial state")]
    UnreachableState(S),

    /// The configured (or defaulted) initial state is not a leaf.
    #[error("initial state {0:?} is not a leaf")]
    InitialStateNotLeaf(S),

    /// A guardless transition was registered before a guarded one, or a second
    /// guardless transition was registered, for the same `(state, trigger)` pair.
    #[error("state {state:?}: a guardless transition for this trigger must be registered last")]
    NullChoiceMustBeLast {
        /// The state the offending transitions were registered on.
        state: S,
    },

    /// A fork's targets do not inhabit distinct concurrent regions of a common ancestor.
    #[error("fork from {0:?} has targets that are not in distinct concurrent regions")]
    ForkTargetsNotDistinctRegions(S),

    /// A join's sources do not cover exactly the concurrent siblings of their shared parent.
    #[error("join to {0:?} does not cover every concurrent sibling of its source region")]
    JoinSourcesIncomplete(S),
}

/// Errors surfaced through the handle returned by [`crate::engine::Machine::apply`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError<S: Debug, Ev: EventSpec> {
    /// No transition exists for this event anywhere from the active leaf up to the root.
    #[error("no transition for event {event:?} from active state {from:?} (or any ancestor)")]
    InvalidTransition {
        /// The active leaf the event was applied against.
        from: S,
        /// The event that had no matching trigger.
        event: Ev,
    },

    /// A query referenced a state kind that does not exist in the graph.
    #[error("unknown state {0:?}")]
    UnknownState(S),

    /// The machine's dispatch task has shut down (all handles to it were dropped).
    #[error("the machine's dispatch task is no longer running")]
    Stopped,
}
