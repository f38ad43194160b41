//! Behavioral properties of the risk engine over deterministic sample
//! streams. No randomness; every stream comes from `synthetic`.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use fallwatch_risk::history::seconds;
use fallwatch_risk::synthetic::{body_sample, Scenario, ScenarioKind};
use fallwatch_risk::{
    AlertCategory, KeypointSample, OccupancyPolicy, RiskConfig, RiskEngine, RiskEvent, RiskState,
    TickOutcome, TickReport, TransitionReason,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// 02:00 UTC, outside the default shower window.
fn night() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 2, 0, 0).unwrap()
}

/// 08:00 UTC, inside the default shower window.
fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
}

fn engine_with(config: RiskConfig) -> RiskEngine {
    RiskEngine::new(Arc::new(config)).expect("valid config")
}

fn engine() -> RiskEngine {
    engine_with(RiskConfig::default())
}

fn run<I>(engine: &mut RiskEngine, samples: I) -> Vec<TickReport>
where
    I: IntoIterator<Item = KeypointSample>,
{
    samples.into_iter().map(|s| engine.tick(s)).collect()
}

fn events(reports: &[TickReport]) -> Vec<RiskEvent> {
    reports.iter().flat_map(|r| r.events.clone()).collect()
}

fn offset_s(start: DateTime<Utc>, at: DateTime<Utc>) -> f64 {
    (at - start).num_milliseconds() as f64 / 1000.0
}

/// Lying still at 10 Hz from `from_s` to `to_s` (inclusive) after `start`.
fn lying(start: DateTime<Utc>, from_s: f64, to_s: f64, hip_x: f32) -> Vec<KeypointSample> {
    let frames = ((to_s - from_s) * 10.0).round() as i64;
    (0..=frames)
        .map(|i| {
            let ts = start + seconds(from_s) + Duration::milliseconds(i * 100);
            body_sample(ts, (hip_x, 0.82), 5.0, 0.9)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Drops without low posture
// ---------------------------------------------------------------------------

#[test]
fn upright_jump_never_becomes_fall_candidate() {
    let mut engine = engine();
    let reports = run(&mut engine, Scenario::new(ScenarioKind::UprightJump, night()).samples());

    assert!(
        reports.iter().any(|r| r.detector.is_some_and(|d| d.is_candidate())),
        "the landing should register as a drop"
    );
    assert!(reports.iter().all(|r| r.state != RiskState::FallCandidate));
    assert!(events(&reports).is_empty());
}

// ---------------------------------------------------------------------------
// Immobility path
// ---------------------------------------------------------------------------

#[test]
fn upright_still_emits_one_soft_and_one_hard_then_cools_down() {
    let mut engine = engine();
    let reports = run(&mut engine, Scenario::new(ScenarioKind::UprightStill, night()).samples());
    let events = events(&reports);

    let categories: Vec<_> = events.iter().map(|e| e.category).collect();
    assert_eq!(
        categories,
        [AlertCategory::ImmobilitySoft, AlertCategory::ImmobilityHard]
    );
    assert!((offset_s(night(), events[0].at) - 30.0).abs() < 0.15);
    assert!((offset_s(night(), events[1].at) - 60.0).abs() < 0.15);
    assert_eq!(engine.state(), RiskState::Cooldown);
}

#[test]
fn shower_hours_delay_soft_alert() {
    let mut engine = engine();
    let reports = run(&mut engine, Scenario::new(ScenarioKind::UprightStill, morning()).samples());
    let events = events(&reports);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].category, AlertCategory::ImmobilitySoft);
    assert!(events[0].thresholds.shower_active);
    let soft_at = offset_s(morning(), events[0].at);
    assert!(soft_at >= 120.0, "soft alert at {soft_at}s");
    assert!(soft_at < 120.5);
}

#[test]
fn immobility_can_require_low_posture() {
    let mut engine = engine_with(RiskConfig {
        immobility_requires_low_posture: true,
        ..RiskConfig::default()
    });
    let reports = run(&mut engine, Scenario::new(ScenarioKind::UprightStill, night()).samples());
    assert!(events(&reports).is_empty());
    assert_eq!(engine.state(), RiskState::Idle);
}

// ---------------------------------------------------------------------------
// Fast-fall path
// ---------------------------------------------------------------------------

#[test]
fn hard_fall_alerts_faster_than_immobility_path() {
    let mut fall_engine = engine();
    let fall_reports = run(&mut fall_engine, Scenario::new(ScenarioKind::HardFall, night()).samples());
    let fall_events = events(&fall_reports);

    assert_eq!(fall_events.len(), 1);
    assert_eq!(fall_events[0].category, AlertCategory::FallFast);
    assert!(fall_reports
        .iter()
        .any(|r| r.state == RiskState::FallCandidate));
    let fast_at = offset_s(night(), fall_events[0].at);

    let mut slow_engine = engine();
    let slow_reports = run(
        &mut slow_engine,
        Scenario::new(ScenarioKind::SlowLieDown, night()).samples(),
    );
    let slow_events = events(&slow_reports);
    assert!(slow_reports
        .iter()
        .all(|r| r.state != RiskState::FallCandidate));
    let hard = slow_events
        .iter()
        .find(|e| e.category == AlertCategory::ImmobilityHard)
        .expect("slow lie-down should escalate through immobility");
    let hard_at = offset_s(night(), hard.at);

    assert!(fast_at < hard_at, "fast fall at {fast_at}s, immobility at {hard_at}s");
    assert!(fast_at < 3.6 + 12.0 + 2.0);
}

#[test]
fn fall_event_carries_snapshot() {
    let mut engine = engine();
    let reports = run(&mut engine, Scenario::new(ScenarioKind::HardFall, night()).samples());
    let event = events(&reports).remove(0);
    let snapshot = event.snapshot.expect("snapshot attached");
    assert_eq!(snapshot.points.len(), 17);
    assert!(event.torso_angle.is_some_and(|a| a < 10.0));
}

// ---------------------------------------------------------------------------
// Recovery and acknowledgment
// ---------------------------------------------------------------------------

#[test]
fn single_large_movement_recovers_from_soft_alert() {
    let mut engine = engine();
    run(&mut engine, lying(night(), 0.0, 31.0, 0.45));
    assert_eq!(engine.state(), RiskState::SoftAlert);

    let moved = body_sample(night() + seconds(31.1), (0.75, 0.82), 5.0, 0.9);
    let report = engine.tick(moved);

    assert_eq!(report.state, RiskState::Idle);
    assert_eq!(
        report.transitions.last().map(|t| t.reason),
        Some(TransitionReason::MovementResumed)
    );
    assert!(engine.tracker().fall_candidate_armed_at().is_none());
}

#[test]
fn acknowledgment_returns_to_idle_while_motionless() {
    let mut engine = engine();
    run(&mut engine, lying(night(), 0.0, 31.0, 0.45));
    assert_eq!(engine.state(), RiskState::SoftAlert);

    let ack_at = night() + seconds(31.0);
    let transition = engine.acknowledge(ack_at).expect("transition");
    assert_eq!(transition.to, RiskState::Idle);

    // Still motionless: stillness is measured again from the acknowledgment.
    let reports = run(&mut engine, lying(night(), 31.1, 50.0, 0.45));
    assert!(reports.iter().all(|r| r.state == RiskState::Idle));
    assert!(events(&reports).is_empty());
}

// ---------------------------------------------------------------------------
// Session hygiene
// ---------------------------------------------------------------------------

#[test]
fn absence_resets_session() {
    let mut engine = engine();
    run(&mut engine, lying(night(), 0.0, 31.0, 0.45));
    assert_eq!(engine.state(), RiskState::SoftAlert);

    let blanks: Vec<_> = (1..=120)
        .map(|i| KeypointSample::new(night() + seconds(31.0) + Duration::milliseconds(i * 100)))
        .collect();
    let reports = run(&mut engine, blanks);
    assert!(reports
        .iter()
        .all(|r| matches!(r.outcome, TickOutcome::Inconclusive(_))));
    assert!(reports
        .iter()
        .flat_map(|r| r.transitions.iter())
        .any(|t| t.reason == TransitionReason::SessionReset));
    assert_eq!(engine.state(), RiskState::Idle);
}

#[test]
fn gap_beyond_limit_excludes_only_the_excess() {
    let mut engine = engine_with(RiskConfig {
        max_tick_gap_s: 5.0,
        absence_reset_s: 0.0,
        ..RiskConfig::default()
    });
    run(&mut engine, lying(night(), 0.0, 20.0, 0.45));
    // 8 s gap against a 5 s limit: 3 s do not count as stillness.
    let reports = run(&mut engine, lying(night(), 28.0, 45.0, 0.45));
    let events = events(&reports);
    assert_eq!(events.len(), 1);
    let soft_at = offset_s(night(), events[0].at);
    assert!((32.9..33.2).contains(&soft_at), "soft alert at {soft_at}s");
}

/// Lying still, one sample every `every_s` seconds.
fn lying_sparse(start: DateTime<Utc>, every_s: f64, count: usize) -> Vec<KeypointSample> {
    (0..count)
        .map(|i| body_sample(start + seconds(i as f64 * every_s), (0.45, 0.82), 5.0, 0.9))
        .collect()
}

#[test]
fn sparse_steady_cadence_accrues_stillness() {
    let mut engine = engine();
    let reports = run(&mut engine, lying_sparse(night(), 6.0, 20));
    let events = events(&reports);
    assert!(!events.is_empty(), "no alert from a 6 s cadence");
    assert_eq!(events[0].category, AlertCategory::ImmobilitySoft);
    let soft_at = offset_s(night(), events[0].at);
    assert!((29.9..30.1).contains(&soft_at), "soft alert at {soft_at}s");
}

#[test]
fn cadence_above_gap_limit_still_alerts() {
    let mut engine = engine_with(RiskConfig {
        max_tick_gap_s: 5.0,
        absence_reset_s: 0.0,
        ..RiskConfig::default()
    });
    // Each 6 s gap contributes 5 s of stillness.
    let reports = run(&mut engine, lying_sparse(night(), 6.0, 20));
    let events = events(&reports);
    assert!(!events.is_empty(), "no alert from a 6 s cadence");
    assert_eq!(events[0].category, AlertCategory::ImmobilitySoft);
    let soft_at = offset_s(night(), events[0].at);
    assert!((35.9..36.1).contains(&soft_at), "soft alert at {soft_at}s");
}

#[test]
fn freeze_policy_pauses_timers_while_unoccupied() {
    let mut engine = engine_with(RiskConfig {
        occupancy_policy: OccupancyPolicy::Freeze,
        ..RiskConfig::default()
    });
    run(&mut engine, lying(night(), 0.0, 20.0, 0.45));
    engine.set_occupancy(false, night() + seconds(20.05));

    let ignored = run(&mut engine, lying(night(), 21.0, 60.0, 0.45));
    assert!(ignored.iter().all(|r| r.outcome == TickOutcome::Paused));

    engine.set_occupancy(true, night() + seconds(120.05));
    let reports = run(&mut engine, lying(night(), 120.1, 135.0, 0.45));
    let events = events(&reports);
    assert_eq!(events.len(), 1);
    let soft_at = offset_s(night(), events[0].at);
    assert!((129.5..131.0).contains(&soft_at), "soft alert at {soft_at}s");
}

#[test]
fn reset_policy_restarts_timers_after_vacancy() {
    let mut engine = engine_with(RiskConfig {
        occupancy_policy: OccupancyPolicy::Reset,
        ..RiskConfig::default()
    });
    run(&mut engine, lying(night(), 0.0, 20.0, 0.45));
    engine.set_occupancy(false, night() + seconds(20.05));
    engine.set_occupancy(true, night() + seconds(120.05));

    let reports = run(&mut engine, lying(night(), 120.1, 135.0, 0.45));
    assert!(events(&reports).is_empty());
}

#[test]
fn sessions_are_isolated() {
    let config = Arc::new(RiskConfig::default());
    let mut a = RiskEngine::new(Arc::clone(&config)).unwrap();
    let mut b = RiskEngine::new(config).unwrap();

    let falls = Scenario::new(ScenarioKind::HardFall, night());
    let jumps = Scenario::new(ScenarioKind::UprightJump, night());
    for (fa, ju) in falls.samples().zip(jumps.samples()) {
        a.tick(fa);
        b.tick(ju);
    }
    assert_ne!(a.state(), RiskState::Idle);
    assert_eq!(b.state(), RiskState::Idle);
}
