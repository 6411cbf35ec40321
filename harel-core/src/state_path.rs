//! [`StatePath`]: an ordered root-to-leaf chain of state kinds.

use crate::types::StateTag;

/// An ordered sequence of kinds from the virtual root's first real
/// descendant down to a leaf. Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatePath<S: StateTag>(Vec<S>);

impl<S: StateTag> StatePath<S> {
    pub(crate) fn new(kinds: Vec<S>) -> Self {
        StatePath(kinds)
    }

    /// The active leaf this path ends at.
    #[must_use]
    pub fn leaf(&self) -> S {
        *self.0.last().expect("a StatePath always has at least one kind")
    }

    /// The top-level region this path starts in.
    #[must_use]
    pub fn root_child(&self) -> S {
        self.0[0]
    }

    /// Whether `kind` is the leaf or any ancestor along this path.
    #[must_use]
    pub fn contains(&self, kind: S) -> bool {
        self.0.contains(&kind)
    }

    /// The full chain, top-level-first, leaf-last.
    #[must_use]
    pub fn kinds(&self) -> &[S] {
        &self.0
    }
}

impl<S: StateTag> std::fmt::Display for StatePath<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(|k| format!("{k:?}")).collect();
        write!(f, "{}", rendered.join("/"))
    }
}
