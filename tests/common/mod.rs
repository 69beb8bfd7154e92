//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod counting;

use vispipe_rs::pipeline::{Coordinator, ImageData, Payload, PortId};

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Numeric content of a port's data, or an empty vec when there is none.
pub fn values(pipeline: &Coordinator, port: PortId) -> Vec<f64> {
    pipeline
        .output_data(port)
        .and_then(|d| d.payload().as_values().map(<[f64]>::to_vec))
        .unwrap_or_default()
}

/// Image held by a port. Panics when the port holds something else.
pub fn image(pipeline: &Coordinator, port: PortId) -> ImageData {
    match pipeline.output_data(port).map(|d| d.payload()) {
        Some(Payload::Image(img)) => img.clone(),
        other => panic!("expected image data on {:?}, got {:?}", port, other),
    }
}
