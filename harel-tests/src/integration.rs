//! End-to-end scenarios, §8 of the design: one `#[tokio::test]` per scenario.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use harel_core::{EngineError, GraphBuilder, Machine};

use crate::common::*;

#[tokio::test]
async fn scenario_1_linear() {
    setup_tracing();
    let graph = linear_graph().build().expect("graph is well-formed");
    let machine = Machine::new(graph, false);

    let after_melt = machine.apply(MatterEvent::Melted).await.expect("transition applies");
    assert!(after_melt.is_in(MatterState::Liquid));

    let after_vaporize = machine.apply(MatterEvent::Vaporized).await.expect("transition applies");
    assert!(after_vaporize.is_in(MatterState::Gas));
    assert!(!after_vaporize.is_in(MatterState::Solid));
}

#[tokio::test]
async fn scenario_2_guarded() {
    setup_tracing();
    let graph = guarded_graph().build().expect("graph is well-formed");
    let machine = Machine::new(graph, false);

    let mild = machine
        .apply(MatterEvent::Heat { delta_degrees: 50 })
        .await
        .expect("transition applies");
    assert!(mild.is_in(MatterState::Liquid));

    let graph = guarded_graph().build().expect("graph is well-formed");
    let machine = Machine::new(graph, false);
    let hot = machine
        .apply(MatterEvent::Heat { delta_degrees: 150 })
        .await
        .expect("transition applies");
    assert!(hot.is_in(MatterState::Boiling));
}

#[tokio::test]
async fn scenario_3_ancestor_fallback() {
    setup_tracing();
    let graph = ancestor_fallback_graph().build().expect("graph is well-formed");
    let machine = Machine::new(graph, false);

    assert!(machine.is_in(MatterState::Soft).await.expect("Soft is a registered state"));
    let after = machine.apply(MatterEvent::Melted).await.expect("transition applies");
    assert!(after.is_in(MatterState::Liquid));
    assert!(!after.is_in(MatterState::Soft));
    assert!(!after.is_in(MatterState::Solid));
}

#[tokio::test]
async fn scenario_4_concurrent_regions() {
    setup_tracing();
    let graph = concurrent_graph().build().expect("graph is well-formed");
    let machine = Machine::new(graph, false);

    let initial = machine.state_of_mind().await;
    assert_eq!(initial.paths().len(), 2);
    assert!(initial.is_in(MatterState::AudioOn));
    assert!(initial.is_in(MatterState::VideoOn));

    let after = machine.apply(MatterEvent::MuteAudio).await.expect("transition applies");
    assert!(after.is_in(MatterState::AudioOff));
    assert!(after.is_in(MatterState::VideoOn), "the video region must be untouched");
}

#[tokio::test]
async fn scenario_5_fork() {
    setup_tracing();
    let effect_calls = Arc::new(AtomicUsize::new(0));
    let observed: Arc<std::sync::Mutex<Vec<(MatterState, MatterState)>>> = Arc::new(std::sync::Mutex::new(Vec::new()));

    let calls = Arc::clone(&effect_calls);
    let obs = Arc::clone(&observed);
    let graph = GraphBuilder::new(MatterState::Idle)
        .state(MatterState::Idle, move |s| {
            s.on_fork(
                MatterEventKind::Start,
                vec![MatterState::AudioOn, MatterState::VideoOn],
                None::<fn(&MatterEvent) -> bool>,
                Some(move |_: &MatterEvent| {
                    calls.fetch_add(1, Ordering::SeqCst);
                }),
            );
        })
        .state(MatterState::Running, |s| {
            s.concurrent_region(MatterState::AudioOn, |_| {});
            s.concurrent_region(MatterState::VideoOn, |_| {});
        })
        .observe(move |from, _event: &MatterEvent, to| {
            obs.lock().unwrap().push((from, to));
        })
        .build()
        .expect("graph is well-formed");
    let machine = Machine::new(graph, false);

    let after = machine.apply(MatterEvent::Start).await.expect("transition applies");
    assert!(after.is_in(MatterState::AudioOn));
    assert!(after.is_in(MatterState::VideoOn));
    assert_eq!(after.paths().len(), 2);
    assert_eq!(effect_calls.load(Ordering::SeqCst), 1, "effect runs exactly once per fork, not once per target");

    let seen = observed.lock().unwrap();
    assert!(seen.contains(&(MatterState::Idle, MatterState::AudioOn)));
    assert!(seen.contains(&(MatterState::Idle, MatterState::VideoOn)));
}

#[tokio::test]
async fn scenario_6_production_suppression() {
    setup_tracing();

    let graph = suppression_graph().build().expect("graph is well-formed");
    let machine = Machine::new(graph, true);
    let unchanged = machine.apply(MatterEvent::Vaporized).await.expect("suppressed, not failed");
    assert!(unchanged.is_in(MatterState::Solid));

    let graph = suppression_graph().build().expect("graph is well-formed");
    let machine = Machine::new(graph, false);
    let err = machine.apply(MatterEvent::Vaporized).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
}

#[tokio::test]
async fn is_in_rejects_a_kind_the_graph_never_registered() {
    setup_tracing();
    // `suppression_graph` only registers `Solid` and `Liquid`; `Gas` is never
    // declared as a state in it.
    let graph = suppression_graph().build().expect("graph is well-formed");
    let machine = Machine::new(graph, false);

    assert!(machine.is_in(MatterState::Solid).await.expect("Solid is registered"));
    let err = machine.is_in(MatterState::Gas).await.unwrap_err();
    assert!(matches!(err, EngineError::UnknownState(MatterState::Gas)));
}
