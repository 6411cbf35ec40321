//! [`StateOfMind`]: the machine's active configuration.

use crate::state_path::StatePath;
use crate::types::StateTag;

/// The set of currently-active root-to-leaf paths.
///
/// Because orthogonal regions exist, more than one path may be active at
/// once; any two distinct paths in a well-formed configuration diverge only
/// at a concurrent node (§3 invariant, checked by the analyzer at
/// construction and preserved by construction during dispatch).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateOfMind<S: StateTag> {
    paths: Vec<StatePath<S>>,
}

impl<S: StateTag> StateOfMind<S> {
    pub(crate) fn new(paths: Vec<StatePath<S>>) -> Self {
        StateOfMind { paths }
    }

    /// All currently-active paths.
    #[must_use]
    pub fn paths(&self) -> &[StatePath<S>] {
        &self.paths
    }

    /// True if `kind` is the active leaf, or an ancestor of the active leaf,
    /// along any active path.
    #[must_use]
    pub fn is_in(&self, kind: S) -> bool {
        self.paths.iter().any(|p| p.contains(kind))
    }

    /// The active leaves, one per currently-active path.
    #[must_use]
    pub fn leaves(&self) -> Vec<S> {
        self.paths.iter().map(StatePath::leaf).collect()
    }

    pub(crate) fn paths_mut(&mut self) -> &mut Vec<StatePath<S>> {
        &mut self.paths
    }
}

impl<S: StateTag> std::fmt::Display for StateOfMind<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self.paths.iter().map(std::string::ToString::to_string).collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}
