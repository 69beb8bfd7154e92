//! TimeSnap — snaps requested times to the nearest advertised step.
//!
//! The snapping itself happens in the executive, which rewrites the request
//! before it reaches this algorithm or its cache. Requests that snap to the
//! step already served are therefore answered from cache.

use crate::pipeline::algorithm::{Algorithm, AlgorithmTraits, ExecuteContext};
use crate::pipeline::data::{DataKind, DataObject};
use crate::pipeline::error::AlgorithmResult;
use crate::pipeline::info::keys;
use crate::pipeline::port::{InputPortSpec, OutputPortSpec};

static INPUTS: &[InputPortSpec] = &[InputPortSpec::new("in", DataKind::Any)];
static OUTPUTS: &[OutputPortSpec] = &[OutputPortSpec::new("out", DataKind::Any)];

pub struct TimeSnap {
    tolerance: f64,
    last_step: Option<f64>,
}

impl TimeSnap {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            last_step: None,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance;
    }

    /// Step of the data produced most recently.
    pub fn last_step(&self) -> Option<f64> {
        self.last_step
    }
}

impl Default for TimeSnap {
    fn default() -> Self {
        Self::new(1e-6)
    }
}

impl Algorithm for TimeSnap {
    fn name(&self) -> &str {
        "TimeSnap"
    }

    fn input_ports(&self) -> &[InputPortSpec] {
        INPUTS
    }

    fn output_ports(&self) -> &[OutputPortSpec] {
        OUTPUTS
    }

    fn traits(&self) -> AlgorithmTraits {
        AlgorithmTraits::default().with_time_snapping(self.tolerance)
    }

    fn execute(&mut self, ctx: &mut ExecuteContext<'_>) -> AlgorithmResult {
        let input = ctx.input(0, 0)?;
        let mut output = DataObject::empty();
        output.shallow_copy(input);
        self.last_step = input
            .information()
            .lookup(&keys::DATA_TIME_STEP)?
            .or_else(|| ctx.requested_time(0));
        ctx.set_output(0, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::coordinator::Coordinator;
    use crate::pipeline::nodes::TimeSource;

    #[test]
    fn test_snap_shares_payload() {
        let mut pipeline = Coordinator::new();
        let source = pipeline.add_algorithm(TimeSource::new(vec![0.0, 1.0, 2.0]));
        let snap = pipeline.add_algorithm(TimeSnap::new(0.05));
        let from = pipeline.output_port(source, 0).unwrap();
        let to = pipeline.input_port(snap, 0).unwrap();
        pipeline.connect(from, to).unwrap();
        let out = pipeline.output_port(snap, 0).unwrap();

        pipeline.set_update_time_step(out, 0.9).unwrap();
        assert!(pipeline.update(out).is_success());

        let snapped = pipeline.output_data(out).unwrap();
        let produced = pipeline.output_data(from).unwrap();
        assert!(snapped.shares_payload(produced));
        assert_eq!(snapped.information().get(&keys::DATA_TIME_STEP).unwrap(), 1.0);
        assert_eq!(pipeline.algorithm::<TimeSnap>(snap).unwrap().last_step(), Some(1.0));
    }
}
