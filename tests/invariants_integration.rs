//! Property-based checks of the update protocol
//!
//! Random graphs, chains, extents and time steps; each property must hold
//! for every generated case.

mod common;

use common::builders::{link, out, ChainBuilder};
use common::counting::{counting, log_entries, new_log, CancelOnExecute};
use common::{image, values};
use proptest::prelude::*;
use vispipe_rs::pipeline::nodes::{Append, ConstantSource, PassThrough, RampSource, Scale, TimeSnap, TimeSource};
use vispipe_rs::pipeline::{keys, AlgorithmId, Coordinator, Payload, PipelineError, UpdateStatus};
use vispipe_rs::types::Extent;

/// Whether `to` is downstream of `from` along `edges`.
fn reaches(edges: &[(usize, usize)], from: usize, to: usize, n: usize) -> bool {
    let mut seen = vec![false; n];
    let mut stack = vec![from];
    while let Some(at) = stack.pop() {
        if at == to {
            return true;
        }
        if std::mem::replace(&mut seen[at], true) {
            continue;
        }
        stack.extend(edges.iter().filter(|(a, _)| *a == at).map(|(_, b)| *b));
    }
    false
}

fn sub_range(a: i64, b: i64, len: i64) -> (i64, i64) {
    (a.min(b).min(len - 1), a.max(b).min(len - 1))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Connections that would close a cycle are rejected, everything else is
    /// accepted, and updates run producers before consumers.
    #[test]
    fn test_random_dags_stay_acyclic(
        n in 2usize..8,
        attempts in prop::collection::vec((0usize..8, 0usize..8), 0..24)
    ) {
        let log = new_log();
        let mut pipeline = Coordinator::new();
        let mut nodes = Vec::new();
        for i in 0..n {
            let (seed, _) = counting(ConstantSource::new(vec![i as f64]), &format!("s{}", i), &log);
            let (node, _) = counting(Append::new(), &format!("n{}", i), &log);
            let seed = pipeline.add_algorithm(seed);
            let node = pipeline.add_algorithm(node);
            link(&mut pipeline, seed, node);
            nodes.push(node);
        }

        let mut edges: Vec<(usize, usize)> = Vec::new();
        for (a, b) in attempts {
            let (a, b) = (a % n, b % n);
            let sink = pipeline.input_port(nodes[b], 0).unwrap();
            let result = pipeline.add_input_connection(sink, out(&pipeline, nodes[a]));
            if a == b || reaches(&edges, b, a, n) {
                let is_cycle = matches!(result, Err(PipelineError::WouldCreateCycle { .. }));
                prop_assert!(is_cycle);
            } else {
                prop_assert!(result.is_ok());
                edges.push((a, b));
            }
        }
        prop_assert_eq!(pipeline.connections().len(), n + edges.len());

        for &node in &nodes {
            let report = pipeline.update(out(&pipeline, node));
            prop_assert!(report.is_success());
        }

        let order = log_entries(&log);
        for (a, b) in &edges {
            let pa = order.iter().position(|l| *l == format!("n{}", a));
            let pb = order.iter().position(|l| *l == format!("n{}", b));
            prop_assert!(pa < pb, "n{} must run before n{}: {:?}", a, b, order);
        }
        // Nothing was modified between updates, so nothing ran twice.
        for id in (0..pipeline.algorithm_count()).map(|i| AlgorithmId(i as u32)) {
            prop_assert!(pipeline.execute_count(id).unwrap() <= 1);
        }
    }

    /// Repeated updates are free; modifying one stage re-executes exactly
    /// that stage and everything downstream of it.
    #[test]
    fn test_modified_reexecutes_downstream_only(
        factors in prop::collection::vec(-4.0f64..4.0, 1..6),
        touched in 0usize..6
    ) {
        let log = new_log();
        let mut builder = ChainBuilder::new(&log).stage("S", ConstantSource::new(vec![1.0, -2.0]));
        for (i, f) in factors.iter().enumerate() {
            builder = builder.stage(&format!("X{}", i), Scale::new(*f));
        }
        let mut chain = builder.build();
        let tail = chain.tail();

        prop_assert!(chain.pipeline.update(tail).is_success());
        let first = values(&chain.pipeline, tail);
        let report = chain.pipeline.update(tail);
        prop_assert!(report.executed.is_empty());
        prop_assert_eq!(values(&chain.pipeline, tail), first.clone());

        for (i, &id) in chain.ids.iter().enumerate() {
            let executed = chain.pipeline.port(chain.port(i)).unwrap().last_executed().unwrap();
            prop_assert!(executed > chain.pipeline.parameter_stamp(id).unwrap());
        }

        let touched = touched % chain.ids.len();
        chain.pipeline.modified(chain.ids[touched]).unwrap();
        prop_assert!(chain.pipeline.update(tail).is_success());
        for (i, calls) in chain.calls.iter().enumerate() {
            let expected = if i >= touched { 2 } else { 1 };
            prop_assert_eq!(calls.execute(), expected);
        }
        prop_assert_eq!(values(&chain.pipeline, tail), first);
    }

    /// Upstream requests are the downstream request, grown by the ghost
    /// margin and clamped to the whole extent.
    #[test]
    fn test_ghost_requests_are_grown_subsets(
        nx in 1i64..20,
        ny in 1i64..20,
        (x0, x1, y0, y1) in (0i64..20, 0i64..20, 0i64..20, 0i64..20),
        margin in 0i64..4
    ) {
        let whole = Extent::new(0, nx - 1, 0, ny - 1, 0, 0);
        let (x0, x1) = sub_range(x0, x1, nx);
        let (y0, y1) = sub_range(y0, y1, ny);
        let request = Extent::new(x0, x1, y0, y1, 0, 0);

        let log = new_log();
        let mut chain = ChainBuilder::new(&log)
            .stage("S", RampSource::new(whole))
            .stage("G", PassThrough::new().with_ghost_margin(margin))
            .build();
        let tail = chain.tail();
        chain.pipeline.set_update_extent(tail, request).unwrap();
        prop_assert!(chain.pipeline.update(tail).is_success());

        let upstream = chain.calls[0].requests()[0].get(&keys::UPDATE_EXTENT).unwrap();
        prop_assert_eq!(upstream, request.grow(margin).intersect(&whole));
        prop_assert!(whole.contains(&upstream));
        prop_assert!(upstream.contains(&request));
        prop_assert_eq!(image(&chain.pipeline, tail).extent(), request);
    }

    /// Streamed pieces combine to exactly the non-streamed result.
    #[test]
    fn test_streaming_matches_whole_update(
        nx in 1i64..16,
        ny in 1i64..6,
        nz in 1i64..3,
        pieces in 1usize..9
    ) {
        let whole = Extent::new(0, nx - 1, 0, ny - 1, 0, nz - 1);
        let build = || {
            let mut pipeline = Coordinator::new();
            let ramp = pipeline.add_algorithm(RampSource::new(whole));
            let pass = pipeline.add_algorithm(PassThrough::new().with_ghost_margin(1));
            link(&mut pipeline, ramp, pass);
            let port = out(&pipeline, pass);
            (pipeline, port)
        };

        let (mut streamed_pipeline, port) = build();
        let streamed = streamed_pipeline.update_streamed(port, pieces);
        prop_assert!(streamed.report.is_success());

        let (mut whole_pipeline, whole_port) = build();
        prop_assert!(whole_pipeline.update(whole_port).is_success());

        let combined = streamed.combined.unwrap();
        match combined.payload() {
            Payload::Image(img) => prop_assert_eq!(img, &image(&whole_pipeline, whole_port)),
            other => prop_assert!(false, "expected an image, got {:?}", other),
        }
    }

    /// Snapped data always carries the advertised step nearest the request.
    #[test]
    fn test_time_snap_picks_nearest_step(
        increments in prop::collection::vec(0.01f64..5.0, 1..10),
        offset in -1.0f64..1.0,
        pick in 0.0f64..1.0
    ) {
        let mut steps = Vec::with_capacity(increments.len());
        let mut t = -5.0;
        for inc in increments {
            t += inc;
            steps.push(t);
        }
        let first = steps[0];
        let last = steps[steps.len() - 1];
        let requested = first - 1.0 + pick * (last - first + 2.0) + offset * 0.01;

        let mut pipeline = Coordinator::new();
        let source = pipeline.add_algorithm(TimeSource::new(steps.clone()));
        let snap = pipeline.add_algorithm(TimeSnap::new(0.01));
        link(&mut pipeline, source, snap);
        let port = out(&pipeline, snap);
        pipeline.set_update_time_step(port, requested).unwrap();
        prop_assert!(pipeline.update(port).is_success());

        let data = pipeline.output_data(port).unwrap();
        let got = data.information().get(&keys::DATA_TIME_STEP).unwrap();
        prop_assert!(steps.contains(&got));
        for s in &steps {
            prop_assert!((requested - got).abs() <= (requested - s).abs());
        }
    }

    /// Ports flagged for release are empty after the update, all others keep
    /// their data, and the requested port always has data.
    #[test]
    fn test_release_flags_conserve_requested_data(flags in prop::collection::vec(any::<bool>(), 2..6)) {
        let log = new_log();
        let mut builder = ChainBuilder::new(&log).stage("S", ConstantSource::new(vec![3.0]));
        for i in 1..flags.len() {
            builder = builder.stage(&format!("X{}", i), Scale::new(2.0));
        }
        let mut chain = builder.build();
        let tail = chain.tail();
        for (i, &flag) in flags.iter().enumerate() {
            chain.pipeline.set_release_data_flag(chain.port(i), flag).unwrap();
        }

        prop_assert!(chain.pipeline.update(tail).is_success());
        prop_assert!(chain.pipeline.output_data(tail).is_some());
        for (i, &flag) in flags.iter().enumerate().take(flags.len() - 1) {
            prop_assert_eq!(chain.pipeline.output_data(chain.port(i)).is_none(), flag);
        }
    }

    /// A cancelled update leaves every port with its pre-call data.
    #[test]
    fn test_cancellation_rolls_back(before in 0usize..3, after in 0usize..3) {
        let mut pipeline = Coordinator::new();
        let canceller = CancelOnExecute::new(pipeline.cancellation_token());
        let mut ids = vec![pipeline.add_algorithm(ConstantSource::new(vec![1.0, 2.0]))];
        for _ in 0..before {
            ids.push(pipeline.add_algorithm(Scale::new(2.0)));
        }
        let cancel_id = pipeline.add_algorithm(canceller);
        ids.push(cancel_id);
        for _ in 0..after {
            ids.push(pipeline.add_algorithm(Scale::new(3.0)));
        }
        for pair in ids.windows(2) {
            link(&mut pipeline, pair[0], pair[1]);
        }
        let ports: Vec<_> = ids.iter().map(|&id| out(&pipeline, id)).collect();
        let tail = *ports.last().unwrap();

        prop_assert!(pipeline.update(tail).is_success());
        let snapshot: Vec<Vec<f64>> = ports.iter().map(|&p| values(&pipeline, p)).collect();

        pipeline.configure::<ConstantSource, _>(ids[0], |s| s.set_values(vec![7.0, 8.0])).unwrap();
        pipeline.configure::<CancelOnExecute, _>(cancel_id, |c| c.armed = true).unwrap();
        let report = pipeline.update(tail);
        prop_assert_eq!(report.status, UpdateStatus::Cancelled);

        for (port, old) in ports.iter().zip(&snapshot) {
            let now = values(&pipeline, *port);
            prop_assert!(now == *old || now.is_empty(), "{:?}: {:?} vs {:?}", port, now, old);
        }
    }
}
