use super::*;

#[test]
fn sample_and_scanline_paths_are_allowed() {
    for last in [RequestPhase::Aggregating, RequestPhase::Copying] {
        let mut t = PhaseTracker::new(RequestId(1));
        t.advance(RequestPhase::Dispatching).unwrap();
        t.advance(RequestPhase::InFlight).unwrap();
        t.advance(last).unwrap();
        t.advance(RequestPhase::Complete).unwrap();
        assert!(t.phase().is_terminal());
    }
}

#[test]
fn skipping_a_phase_is_rejected() {
    let mut t = PhaseTracker::new(RequestId(2));
    let err = t.advance(RequestPhase::InFlight).unwrap_err();
    assert!(matches!(err, RaypoolError::Dispatch(_)));
    assert!(err.to_string().contains("idle -> in_flight"), "{err}");
    assert_eq!(t.phase(), RequestPhase::Idle);
}

#[test]
fn any_live_phase_can_fail_but_terminal_phases_stick() {
    let mut t = PhaseTracker::new(RequestId(3));
    t.advance(RequestPhase::Dispatching).unwrap();
    t.fail();
    assert_eq!(t.phase(), RequestPhase::Failed);
    assert!(t.advance(RequestPhase::InFlight).is_err());

    assert!(!RequestPhase::Complete.can_advance_to(RequestPhase::Failed));
    assert!(RequestPhase::Idle.can_advance_to(RequestPhase::Failed));
}

#[test]
fn phases_serialize_snake_case() {
    let s = serde_json::to_string(&RequestPhase::InFlight).unwrap();
    assert_eq!(s, "\"in_flight\"");
    assert_eq!(RequestPhase::default(), RequestPhase::Idle);
}
