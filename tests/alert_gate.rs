// tests/alert_gate.rs
use quake_watch::alert::{AlertGate, AlertKind, LatchState};

#[test]
fn second_trigger_without_release_is_dropped() {
    let gate = AlertGate::new();
    assert!(gate.try_trigger(AlertKind::SeismicIntensity));
    assert!(!gate.try_trigger(AlertKind::SeismicIntensity));
    assert_eq!(gate.state(AlertKind::SeismicIntensity), LatchState::Active);
}

#[test]
fn cancel_always_leaves_gate_idle() {
    let gate = AlertGate::new();

    // Idle --cancel--> Idle
    gate.cancel(AlertKind::Eew);
    assert_eq!(gate.state(AlertKind::Eew), LatchState::Idle);

    // Active --cancel--> Idle
    assert!(gate.try_trigger(AlertKind::Eew));
    gate.cancel(AlertKind::Eew);
    assert_eq!(gate.state(AlertKind::Eew), LatchState::Idle);

    // Cancel twice in a row stays Idle
    gate.cancel(AlertKind::Eew);
    assert_eq!(gate.state(AlertKind::Eew), LatchState::Idle);
}

#[test]
fn release_reopens_the_trigger_window() {
    let gate = AlertGate::new();
    assert!(gate.try_trigger(AlertKind::Eew));
    assert!(!gate.try_trigger(AlertKind::Eew));
    gate.release(AlertKind::Eew);
    assert!(gate.try_trigger(AlertKind::Eew));
}

#[test]
fn concurrent_triggers_let_exactly_one_through() {
    use std::sync::Arc;

    let gate = Arc::new(AlertGate::new());
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let g = Arc::clone(&gate);
            std::thread::spawn(move || g.try_trigger(AlertKind::Eew))
        })
        .collect();
    let wins = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(wins, 1);
}

#[test]
fn snapshot_lists_every_kind() {
    let gate = AlertGate::new();
    gate.try_trigger(AlertKind::Eew);
    let snap = gate.snapshot();
    assert_eq!(snap.get(&AlertKind::Eew), Some(&LatchState::Active));
    assert_eq!(
        snap.get(&AlertKind::SeismicIntensity),
        Some(&LatchState::Idle)
    );
}
