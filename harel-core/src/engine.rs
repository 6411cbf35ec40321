//! [`Machine`]: the runtime engine driving a [`Graph`] through events.
//!
//! Mirrors the mailbox/`Address` shape the rest of this codebase uses for
//! actor message delivery, but with a single permanently-running background
//! task instead of a pool: that task is the sole owner of the active
//! configuration and the sole mutator of it, which is what gives dispatch its
//! serialization guarantee (§4.4/§5) without a separate lock. A `try_lock`
//! trampoline was considered and rejected: the drainer can observe an empty
//! queue and decide to exit in the same window a re-entrant `apply()` fails
//! to acquire the lock and assumes the outgoing drainer will pick its event
//! up, stranding it. A task that blocks on `recv().await` has no such gap.

use std::io;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, error, warn};

use crate::dispatch;
use crate::error::EngineError;
use crate::export::DiagramFormat;
use crate::graph::{Graph, NodeId};
use crate::state_of_mind::StateOfMind;
use crate::types::{EventSpec, StateTag};

const DEFAULT_MAILBOX_CAPACITY: usize = 64;
const BROADCAST_CAPACITY: usize = 16;

struct Envelope<S: StateTag, Ev: EventSpec> {
    event: Ev,
    reply: oneshot::Sender<Result<StateOfMind<S>, EngineError<S, Ev>>>,
}

/// A running state machine: a frozen [`Graph`] paired with its active
/// configuration and the background task driving it.
pub struct Machine<S: StateTag, Ev: EventSpec> {
    graph: Arc<Graph<S, Ev>>,
    mailbox: mpsc::Sender<Envelope<S, Ev>>,
    snapshot: Arc<RwLock<StateOfMind<S>>>,
    broadcast: broadcast::Sender<StateOfMind<S>>,
    production_mode: bool,
}

impl<S: StateTag, Ev: EventSpec> Machine<S, Ev> {
    /// Start a machine from a frozen graph, spawning its dispatch task.
    ///
    /// When `production_mode` is true, a dispatch step that finds no
    /// transition anywhere for the active leaf(s) is logged and otherwise
    /// ignored instead of surfacing [`EngineError::InvalidTransition`] to the
    /// caller; the analyzer (§4.5) always runs regardless of this flag.
    #[must_use]
    pub fn new(graph: Graph<S, Ev>, production_mode: bool) -> Self {
        Self::with_mailbox_capacity(graph, production_mode, DEFAULT_MAILBOX_CAPACITY)
    }

    /// Like [`Machine::new`], with an explicit mailbox bound.
    #[must_use]
    pub fn with_mailbox_capacity(graph: Graph<S, Ev>, production_mode: bool, mailbox_capacity: usize) -> Self {
        let graph = Arc::new(graph);
        let initial_paths = graph.initial_configuration().iter().map(|&id| graph.path_of(id)).collect();
        let initial = StateOfMind::new(initial_paths);

        let (tx, rx) = mpsc::channel(mailbox_capacity);
        let snapshot = Arc::new(RwLock::new(initial));
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);

        tokio::spawn(run_dispatch_loop(
            Arc::clone(&graph),
            rx,
            Arc::clone(&snapshot),
            broadcast_tx.clone(),
            production_mode,
        ));

        Machine {
            graph,
            mailbox: tx,
            snapshot,
            broadcast: broadcast_tx,
            production_mode,
        }
    }

    /// Enqueue `event` and await the resulting configuration.
    ///
    /// Re-entrant calls made from inside a guard, effect, or entry/exit
    /// callback enqueue onto this same mailbox and are processed, in
    /// submission order, once the transition currently executing finishes.
    ///
    /// # Errors
    /// [`EngineError::Stopped`] if the dispatch task is no longer running;
    /// [`EngineError::InvalidTransition`] if no active region had a matching
    /// transition and `production_mode` is false.
    pub async fn apply(&self, event: Ev) -> Result<StateOfMind<S>, EngineError<S, Ev>> {
        let (reply, rx) = oneshot::channel();
        self.mailbox
            .send(Envelope { event, reply })
            .await
            .map_err(|_| EngineError::Stopped)?;
        rx.await.map_err(|_| EngineError::Stopped)?
    }

    /// Synchronous snapshot read: is `kind` the active leaf, or an active
    /// ancestor, along any currently-active path?
    ///
    /// # Errors
    /// [`EngineError::UnknownState`] if `kind` was never registered in the graph.
    pub async fn is_in(&self, kind: S) -> Result<bool, EngineError<S, Ev>> {
        if self.graph.lookup(kind).is_none() {
            return Err(EngineError::UnknownState(kind));
        }
        Ok(self.snapshot.read().await.is_in(kind))
    }

    /// Synchronous snapshot read of the full active configuration.
    pub async fn state_of_mind(&self) -> StateOfMind<S> {
        self.snapshot.read().await.clone()
    }

    /// A stream of every configuration produced by a successful dispatch.
    /// Lagged-subscriber errors surface as stream items rather than feeding
    /// back into `apply`; a subscriber that falls behind can choose to
    /// ignore them or resynchronize via [`Machine::state_of_mind`].
    #[must_use]
    pub fn subscribe(&self) -> BroadcastStream<StateOfMind<S>> {
        BroadcastStream::new(self.broadcast.subscribe())
    }

    /// Whether the engine was constructed with `production_mode = true`.
    #[must_use]
    pub fn production_mode(&self) -> bool {
        self.production_mode
    }

    /// Render the frozen graph, annotated with the current configuration, in
    /// `format` and write it to `path`.
    pub async fn export(&self, path: impl AsRef<std::path::Path>, format: DiagramFormat) -> io::Result<()> {
        let snapshot = self.state_of_mind().await;
        let rendered = crate::export::render(&self.graph, &snapshot, format);
        tokio::fs::write(path, rendered).await
    }
}

async fn run_dispatch_loop<S: StateTag, Ev: EventSpec>(
    graph: Arc<Graph<S, Ev>>,
    mut mailbox: mpsc::Receiver<Envelope<S, Ev>>,
    snapshot: Arc<RwLock<StateOfMind<S>>>,
    broadcast_tx: broadcast::Sender<StateOfMind<S>>,
    production_mode: bool,
) {
    let mut leaves: Vec<NodeId> = snapshot
        .read()
        .await
        .paths()
        .iter()
        .map(|p| graph.lookup(p.leaf()).expect("snapshot leaves always resolve"))
        .collect();

    while let Some(Envelope { event, reply }) = mailbox.recv().await {
        debug!(?event, "engine: dispatching event");
        let outcome = dispatch::dispatch(&graph, &leaves, &event);
        let result = match outcome {
            Ok(next_leaves) => {
                leaves = next_leaves;
                let paths = leaves.iter().map(|&id| graph.path_of(id)).collect();
                let new_state = StateOfMind::new(paths);
                *snapshot.write().await = new_state.clone();
                if broadcast_tx.send(new_state.clone()).is_err() {
                    debug!("engine: no active subscribers for this configuration update");
                }
                Ok(new_state)
            }
            Err(err) if production_mode => {
                warn!(?err, "engine: suppressing invalid transition in production mode");
                Ok(snapshot.read().await.clone())
            }
            Err(err) => Err(err),
        };

        if reply.send(result).is_err() {
            debug!("engine: apply() caller dropped its handle before the reply was sent");
        }
    }

    error!("engine: mailbox closed, dispatch task exiting");
}
