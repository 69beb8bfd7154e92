//! Shared and process-wide coordinators

mod common;

use common::builders::{link, out};
use common::counting::{counting, new_log};
use serial_test::serial;
use std::thread;
use vispipe_rs::pipeline::nodes::{ConstantSource, Scale};
use vispipe_rs::pipeline::{
    Algorithm, AlgorithmError, AlgorithmResult, DataKind, ErrorKind, ExecuteContext, OutputPortSpec,
    PipelineError, SharedCoordinator,
};

static OUT: &[OutputPortSpec] = &[OutputPortSpec::new("out", DataKind::Scalar)];

/// Calls back into the coordinator that is running it.
struct Reentrant {
    shared: SharedCoordinator,
}

impl Algorithm for Reentrant {
    fn name(&self) -> &str {
        "Reentrant"
    }

    fn output_ports(&self) -> &[OutputPortSpec] {
        OUT
    }

    fn execute(&mut self, _ctx: &mut ExecuteContext<'_>) -> AlgorithmResult {
        match self.shared.with(|c| c.algorithm_count()) {
            Err(PipelineError::ReentrantUpdate) => Err(AlgorithmError::new(
                ErrorKind::ReentrantUpdate,
                "coordinator is already updating on this thread",
            )),
            Err(e) => Err(AlgorithmError::internal(e.to_string())),
            Ok(_) => Err(AlgorithmError::internal("nested access was allowed")),
        }
    }
}

#[test]
fn test_reentrant_update_from_callback() {
    let shared = SharedCoordinator::default();
    let callback = Reentrant { shared: shared.clone() };
    let port = shared
        .with(|c| {
            let id = c.add_algorithm(callback);
            out(c, id)
        })
        .unwrap();

    let report = shared.update(port).unwrap();
    assert!(!report.is_success());
    assert_eq!(report.errors[0].kind, ErrorKind::ReentrantUpdate);

    // The lock is usable again afterwards.
    assert_eq!(shared.with(|c| c.algorithm_count()).unwrap(), 1);
}

#[test]
fn test_concurrent_updates_execute_once() {
    let log = new_log();
    let (source, source_calls) = counting(ConstantSource::new(vec![1.0, 2.0]), "S", &log);
    let (scale, scale_calls) = counting(Scale::new(4.0), "X", &log);

    let shared = SharedCoordinator::default();
    let port = shared
        .with(|c| {
            let s = c.add_algorithm(source);
            let x = c.add_algorithm(scale);
            link(c, s, x);
            out(c, x)
        })
        .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let shared = shared.clone();
            thread::spawn(move || shared.update(port).unwrap().is_success())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }

    assert_eq!(source_calls.execute(), 1);
    assert_eq!(scale_calls.execute(), 1);
    let result = shared
        .with(|c| c.output_data(port).and_then(|d| d.payload().as_values().map(<[f64]>::to_vec)))
        .unwrap();
    assert_eq!(result, Some(vec![4.0, 8.0]));
}

#[test]
#[serial]
fn test_global_coordinator_is_shared() {
    let port = SharedCoordinator::global()
        .with(|c| {
            let id = c.add_algorithm(ConstantSource::new(vec![9.0]));
            out(c, id)
        })
        .unwrap();

    let report = thread::spawn(move || SharedCoordinator::global().update(port))
        .join()
        .unwrap()
        .unwrap();
    assert!(report.is_success());

    let seen = SharedCoordinator::global()
        .with(|c| c.output_data(port).is_some())
        .unwrap();
    assert!(seen);
}

#[test]
#[serial]
fn test_global_teardown() {
    let global = SharedCoordinator::global();
    let port = global
        .with(|c| {
            let id = c.add_algorithm(ConstantSource::new(vec![1.0]));
            out(c, id)
        })
        .unwrap();
    assert!(global.update(port).unwrap().is_success());

    global.with(|c| c.teardown()).unwrap();
    assert!(global.with(|c| c.output_data(port).is_none()).unwrap());
}
