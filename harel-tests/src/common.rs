//! Shared fixtures: the state/event types and graph builders used across
//! the integration and property tests.

use harel_core::{EventSpec, GraphBuilder};

/// Setup tracing for tests.
pub fn setup_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt().with_env_filter(EnvFilter::from_default_env()).try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatterState {
    Solid,
    Soft,
    Hard,
    Liquid,
    Gas,
    Boiling,
    Idle,
    Running,
    AudioRegion,
    AudioOn,
    AudioOff,
    VideoRegion,
    VideoOn,
    VideoOff,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatterEvent {
    Melted,
    Vaporized,
    Heat { delta_degrees: i32 },
    Start,
    MuteAudio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatterEventKind {
    Melted,
    Vaporized,
    Heat,
    Start,
    MuteAudio,
}

impl EventSpec for MatterEvent {
    type Kind = MatterEventKind;

    fn kind(&self) -> Self::Kind {
        match self {
            MatterEvent::Melted => MatterEventKind::Melted,
            MatterEvent::Vaporized => MatterEventKind::Vaporized,
            MatterEvent::Heat { .. } => MatterEventKind::Heat,
            MatterEvent::Start => MatterEventKind::Start,
            MatterEvent::MuteAudio => MatterEventKind::MuteAudio,
        }
    }
}

/// Scenario 1 — Linear: `Solid --Melted--> Liquid --Vaporized--> Gas`.
pub fn linear_graph() -> GraphBuilder<MatterState, MatterEvent> {
    GraphBuilder::new(MatterState::Solid)
        .state(MatterState::Solid, |s| {
            s.on(
                MatterEventKind::Melted,
                MatterState::Liquid,
                None::<fn(&MatterEvent) -> bool>,
                None::<fn(&MatterEvent)>,
            );
        })
        .state(MatterState::Liquid, |s| {
            s.on(
                MatterEventKind::Vaporized,
                MatterState::Gas,
                None::<fn(&MatterEvent) -> bool>,
                None::<fn(&MatterEvent)>,
            );
        })
        .state(MatterState::Gas, |_| {})
}

/// Scenario 2 — Guarded: two `Heat` entries on `Solid`, boiling guard first.
pub fn guarded_graph() -> GraphBuilder<MatterState, MatterEvent> {
    GraphBuilder::new(MatterState::Solid)
        .state(MatterState::Solid, |s| {
            s.on(
                MatterEventKind::Heat,
                MatterState::Boiling,
                Some(|e: &MatterEvent| matches!(e, MatterEvent::Heat { delta_degrees } if *delta_degrees > 100)),
                None::<fn(&MatterEvent)>,
            );
            s.on(
                MatterEventKind::Heat,
                MatterState::Liquid,
                Some(|e: &MatterEvent| matches!(e, MatterEvent::Heat { delta_degrees } if *delta_degrees > 0)),
                None::<fn(&MatterEvent)>,
            );
        })
        .state(MatterState::Liquid, |_| {})
        .state(MatterState::Boiling, |_| {})
}

/// Scenario 3 — Ancestor fallback: `Solid { Soft, Hard }`, `Melted` registered on `Solid`.
pub fn ancestor_fallback_graph() -> GraphBuilder<MatterState, MatterEvent> {
    GraphBuilder::new(MatterState::Soft)
        .state(MatterState::Solid, |s| {
            s.on(
                MatterEventKind::Melted,
                MatterState::Liquid,
                None::<fn(&MatterEvent) -> bool>,
                None::<fn(&MatterEvent)>,
            );
            s.nested_state(MatterState::Soft, |_| {});
            s.nested_state(MatterState::Hard, |_| {});
        })
        .state(MatterState::Liquid, |_| {})
}

/// Scenario 4 — Concurrent regions: `Running { Audio{On,Off} , Video{On,Off} }`.
pub fn concurrent_graph() -> GraphBuilder<MatterState, MatterEvent> {
    GraphBuilder::new(MatterState::AudioOn)
        .state(MatterState::Running, |s| {
            s.concurrent_region(MatterState::AudioRegion, |a| {
                a.nested_state(MatterState::AudioOn, |on| {
                    on.on(
                        MatterEventKind::MuteAudio,
                        MatterState::AudioOff,
                        None::<fn(&MatterEvent) -> bool>,
                        None::<fn(&MatterEvent)>,
                    );
                });
                a.nested_state(MatterState::AudioOff, |_| {});
            });
            s.concurrent_region(MatterState::VideoRegion, |v| {
                v.nested_state(MatterState::VideoOn, |_| {});
                v.nested_state(MatterState::VideoOff, |_| {});
            });
        })
}

/// Scenario 6 — Production suppression: only `Melted` registered on `Solid`.
pub fn suppression_graph() -> GraphBuilder<MatterState, MatterEvent> {
    GraphBuilder::new(MatterState::Solid)
        .state(MatterState::Solid, |s| {
            s.on(
                MatterEventKind::Melted,
                MatterState::Liquid,
                None::<fn(&MatterEvent) -> bool>,
                None::<fn(&MatterEvent)>,
            );
        })
        .state(MatterState::Liquid, |_| {})
}
