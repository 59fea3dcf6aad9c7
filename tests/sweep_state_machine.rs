// Drives the orchestrator by hand: every Issue is answered in order and every
// pacing request fires immediately. No runtime, no network.

use std::collections::VecDeque;

use qkd_sweep::{
    BannerState, RequestTag, RunMode, SimulationRequest, SimulationResult, SweepAction, SweepError, SweepEvent,
    SweepOrchestrator, SweepPlan, SweepState,
};

fn result_for(req: &SimulationRequest) -> SimulationResult {
    let qber = req.distance / 1000.0 + if req.eve { 0.2 } else { 0.0 };
    SimulationResult {
        qber,
        fidelity: 1.0 - qber,
        final_key_length: 100 - (qber * 100.0) as u64,
        eve_detected: qber > 0.11,
        secure: qber <= 0.11,
        key_rate: 1.0 - qber,
        channel_loss: req.distance * 0.2,
    }
}

/// Play a sweep to its end, answering requests with `answer`.
fn play(
    orch: &mut SweepOrchestrator,
    plan: SweepPlan,
    mut answer: impl FnMut(&SimulationRequest) -> Result<SimulationResult, SweepError>,
) -> (Vec<SimulationRequest>, Vec<SweepAction>) {
    let mut issued = Vec::new();
    let mut seen = Vec::new();
    let mut queue: VecDeque<SweepAction> = orch.handle(SweepEvent::Start(plan)).into();
    while let Some(action) = queue.pop_front() {
        let next = match &action {
            SweepAction::Issue { tag, request } => {
                issued.push(request.clone());
                orch.handle(SweepEvent::Response { tag: *tag, outcome: answer(request) })
            }
            SweepAction::SchedulePacing { session, .. } => orch.handle(SweepEvent::PacingElapsed { session: *session }),
            _ => Vec::new(),
        };
        seen.push(action);
        queue.extend(next);
    }
    (issued, seen)
}

#[test]
fn default_sweep_yields_ten_points_without_eve() {
    let mut orch = SweepOrchestrator::new();
    let plan = SweepPlan::sweep(SweepPlan::default_distances(), 0, false).unwrap();
    let (issued, actions) = play(&mut orch, plan, |r| Ok(result_for(r)));

    assert_eq!(issued.len(), 10);
    assert!(issued.iter().all(|r| !r.eve && r.qubits == 100));
    let session = orch.session().unwrap();
    let points = session.aggregator().points();
    assert_eq!(points.len(), 10);
    let distances: Vec<f64> = points.iter().map(|p| p.distance).collect();
    assert_eq!(distances, SweepPlan::default_distances());
    assert!(points.iter().all(|p| p.qber_eve.is_none()));
    assert_eq!(session.aggregator().history().len(), 10);
    assert_eq!(orch.state(), SweepState::Complete);
    assert!(matches!(actions.last(), Some(SweepAction::Completed { .. })));
}

#[test]
fn comparison_sweep_populates_both_columns_in_sequence() {
    let mut orch = SweepOrchestrator::new();
    let plan = SweepPlan::sweep(SweepPlan::default_distances(), 2, true).unwrap();
    let (issued, _) = play(&mut orch, plan, |r| Ok(result_for(r)));

    assert_eq!(issued.len(), 20);
    for (i, pair) in issued.chunks(2).enumerate() {
        let d = (i as f64 + 1.0) * 10.0;
        assert_eq!(pair[0], SimulationRequest { qubits: 100, distance: d, repeaters: 2, eve: false });
        assert_eq!(pair[1], SimulationRequest { qubits: 100, distance: d, repeaters: 2, eve: true });
    }
    let points = orch.session().unwrap().aggregator().points().to_vec();
    assert_eq!(points.len(), 10);
    for p in &points {
        assert!((p.qber_normal - p.distance / 1000.0).abs() < 1e-12);
        let eve = p.qber_eve.expect("eve column populated");
        assert!((eve - (p.distance / 1000.0 + 0.2)).abs() < 1e-12);
    }
}

#[test]
fn repeater_comparison_pairs_bare_link_with_chain() {
    let mut orch = SweepOrchestrator::new();
    let plan = SweepPlan::repeater_comparison(SweepPlan::default_distances(), 2, true).unwrap();
    let (issued, _) = play(&mut orch, plan, |r| {
        // a chain of r repeaters splits the error over r + 1 segments
        let mut res = result_for(r);
        res.qber /= f64::from(r.repeaters) + 1.0;
        Ok(res)
    });

    assert_eq!(issued.len(), 20);
    for (i, pair) in issued.chunks(2).enumerate() {
        let d = (i as f64 + 1.0) * 10.0;
        assert_eq!(pair[0], SimulationRequest { qubits: 100, distance: d, repeaters: 0, eve: true });
        assert_eq!(pair[1], SimulationRequest { qubits: 100, distance: d, repeaters: 2, eve: true });
    }
    let agg = orch.session().unwrap().aggregator();
    assert_eq!(agg.points().len(), 10);
    for p in agg.points() {
        assert!(p.qber_eve.is_none());
        let rep = p.qber_repeater.expect("repeater column populated");
        assert!((rep * 3.0 - p.qber_normal).abs() < 1e-12);
    }
    assert!(agg.to_csv().starts_with("Distance,QBER_No_Repeater,QBER_Repeater\n"));
    assert_eq!(orch.state(), SweepState::Complete);
}

#[test]
fn failed_eavesdropper_run_leaves_no_reading_for_the_dropped_point() {
    let mut orch = SweepOrchestrator::new();
    let plan = SweepPlan::sweep(vec![10.0, 20.0], 0, true).unwrap();
    play(&mut orch, plan, |r| {
        if r.distance == 20.0 && r.eve {
            Err(SweepError::network("reset by peer"))
        } else {
            Ok(result_for(r))
        }
    });
    let agg = orch.session().unwrap().aggregator();
    assert_eq!(agg.points().len(), 1);
    // still the reading of the 10 km point, not the unrecorded 20 km baseline
    assert_eq!(agg.latest().unwrap().channel_loss, 2.0);
    assert_eq!(agg.latest().unwrap().qber, 0.01);
}

#[test]
fn banner_tracks_baseline_verdict_only() {
    let mut orch = SweepOrchestrator::new();
    let plan = SweepPlan::sweep(vec![10.0, 20.0], 0, true).unwrap();
    play(&mut orch, plan, |r| Ok(result_for(r)));
    // eavesdropper runs are insecure but only the baseline feeds the banner
    assert_eq!(orch.session().unwrap().aggregator().banner(), BannerState::Secure);
    assert_eq!(orch.session().unwrap().aggregator().latest().unwrap().qber, 0.02);
}

#[test]
fn stale_response_from_superseded_sweep_is_ignored() {
    let mut orch = SweepOrchestrator::new();
    let start_a = orch.handle(SweepEvent::Start(SweepPlan::sweep(vec![10.0, 20.0], 0, false).unwrap()));
    let tag_a = start_a
        .iter()
        .find_map(|a| match a {
            SweepAction::Issue { tag, .. } => Some(*tag),
            _ => None,
        })
        .unwrap();

    // Sweep B runs to completion, then A's delayed answer shows up.
    let (_, _) = play(&mut orch, SweepPlan::sweep(vec![30.0, 40.0], 0, false).unwrap(), |r| Ok(result_for(r)));
    let before = orch.session().unwrap().aggregator().points().to_vec();
    let late = SimulationResult { qber: 0.9, ..result_for(&SimulationRequest { qubits: 100, distance: 10.0, repeaters: 0, eve: false }) };
    let actions = orch.handle(SweepEvent::Response { tag: tag_a, outcome: Ok(late) });

    assert!(actions.is_empty());
    assert_eq!(orch.session().unwrap().aggregator().points(), &before[..]);
    assert_eq!(orch.stale_discarded(), 1);
    assert_ne!(orch.session().unwrap().id(), tag_a.session);
}

#[test]
fn stale_response_while_new_sweep_is_mid_flight() {
    let mut orch = SweepOrchestrator::new();
    let tag_of = |actions: &[SweepAction]| {
        actions
            .iter()
            .find_map(|a| match a {
                SweepAction::Issue { tag, .. } => Some(*tag),
                _ => None,
            })
            .unwrap()
    };
    let a = tag_of(&orch.handle(SweepEvent::Start(SweepPlan::sweep(vec![10.0], 0, false).unwrap())));
    let b = tag_of(&orch.handle(SweepEvent::Start(SweepPlan::sweep(vec![10.0], 0, false).unwrap())));
    // Same point index and mode; only the session differs.
    assert_eq!((a.index, a.mode), (b.index, b.mode));
    let err = orch.handle(SweepEvent::Response { tag: a, outcome: Err(SweepError::network("late failure")) });
    assert!(err.is_empty(), "stale failures must not abort the live sweep");
    assert_eq!(orch.state(), SweepState::Running { index: 0, phase: qkd_sweep::PointPhase::Baseline });
}

#[test]
fn protocol_error_aborts_and_next_run_restarts() {
    let mut orch = SweepOrchestrator::new();
    let plan = SweepPlan::sweep(SweepPlan::default_distances(), 0, true).unwrap();
    let (issued, actions) = play(&mut orch, plan.clone(), |r| {
        if r.distance == 40.0 && r.eve {
            Err(SweepError::protocol("missing field `secure`"))
        } else {
            Ok(result_for(r))
        }
    });

    // 3 full points (6 requests) + baseline and eve for the 4th.
    assert_eq!(issued.len(), 8);
    let failures: Vec<&SweepAction> = actions.iter().filter(|a| matches!(a, SweepAction::Failed { .. })).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(orch.state(), SweepState::Idle);
    let kept: Vec<f64> = orch.session().unwrap().aggregator().points().iter().map(|p| p.distance).collect();
    assert_eq!(kept, vec![10.0, 20.0, 30.0]);

    let (issued, _) = play(&mut orch, plan, |r| Ok(result_for(r)));
    assert_eq!(issued[0].distance, 10.0);
    assert_eq!(orch.session().unwrap().aggregator().points().len(), 10);
}

#[test]
fn every_tag_names_its_mode() {
    let mut orch = SweepOrchestrator::new();
    let plan = SweepPlan::sweep(vec![10.0, 20.0], 0, true).unwrap();
    let mut modes = Vec::new();
    let mut queue: VecDeque<SweepAction> = orch.handle(SweepEvent::Start(plan)).into();
    while let Some(action) = queue.pop_front() {
        match action {
            SweepAction::Issue { tag, request } => {
                let RequestTag { index, mode, .. } = tag;
                modes.push((index, mode));
                queue.extend(orch.handle(SweepEvent::Response { tag, outcome: Ok(result_for(&request)) }));
            }
            SweepAction::SchedulePacing { session, .. } => {
                queue.extend(orch.handle(SweepEvent::PacingElapsed { session }));
            }
            _ => {}
        }
    }
    assert_eq!(
        modes,
        vec![(0, RunMode::Baseline), (0, RunMode::Eavesdropper), (1, RunMode::Baseline), (1, RunMode::Eavesdropper)]
    );
}
