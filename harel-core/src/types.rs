//! Marker traits tagging user-provided state and event values.
//!
//! The graph never inspects a state or event value directly; it keys
//! everything off a small, cheap tag (`StateTag` / `EventTag`), usually the
//! discriminant of a user-defined enum. This is the "type-tag indexing"
//! redesign called for in place of the reflective type queries an
//! object-oriented source would reach for.

use std::fmt::Debug;
use std::hash::Hash;

/// A tag identifying one node in the state tree.
///
/// Blanket-implemented for any `Copy + Eq + Hash + Debug` type usable as a
/// `HashMap` key, which in practice means a fieldless enum.
pub trait StateTag: Copy + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> StateTag for T where T: Copy + Eq + Hash + Debug + Send + Sync + 'static {}

/// A tag identifying one trigger event kind.
pub trait EventTag: Copy + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> EventTag for T where T: Copy + Eq + Hash + Debug + Send + Sync + 'static {}

/// Binds a concrete event value type to the tag the graph dispatches on.
///
/// Events, unlike states, carry data (e.g. `Heat { delta_degrees: i32 }`);
/// `kind()` extracts the cheap discriminant used for transition lookup,
/// while guards and effects still see the full value.
pub trait EventSpec: Clone + Debug + Send + Sync + 'static {
    /// The discriminant used to key `StateNode::transitions`.
    type Kind: EventTag;

    /// Extract this event's kind.
    fn kind(&self) -> Self::Kind;
}
