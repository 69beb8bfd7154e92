//! TimeSource — scalar that varies over discrete time steps.
//!
//! Advertises its steps and answers a time request with the value of the
//! step a file reader would load: the last step at or before the requested
//! time.

use crate::pipeline::algorithm::{Algorithm, ExecuteContext, InformationContext};
use crate::pipeline::data::{DataKind, DataObject};
use crate::pipeline::error::AlgorithmResult;
use crate::pipeline::info::keys;
use crate::pipeline::port::OutputPortSpec;
use crate::pipeline::time;

static OUTPUTS: &[OutputPortSpec] = &[OutputPortSpec::new("value", DataKind::Scalar)];

pub struct TimeSource {
    steps: Vec<f64>,
    amplitude: f64,
    /// Step served by the most recent execute.
    last_time: Option<f64>,
}

impl TimeSource {
    pub fn new(steps: impl Into<Vec<f64>>) -> Self {
        Self {
            steps: steps.into(),
            amplitude: 1.0,
            last_time: None,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    pub fn steps(&self) -> &[f64] {
        &self.steps
    }

    pub fn set_steps(&mut self, steps: impl Into<Vec<f64>>) {
        self.steps = steps.into();
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn last_time(&self) -> Option<f64> {
        self.last_time
    }
}

impl Algorithm for TimeSource {
    fn name(&self) -> &str {
        "TimeSource"
    }

    fn output_ports(&self) -> &[OutputPortSpec] {
        OUTPUTS
    }

    fn report_information(&mut self, ctx: &mut InformationContext<'_>) -> AlgorithmResult {
        let out = ctx.output_mut(0)?;
        if self.steps.is_empty() {
            out.remove(&keys::TIME_STEPS);
            out.remove(&keys::TIME_RANGE);
        } else {
            out.set(&keys::TIME_STEPS, self.steps.clone());
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ExecuteContext<'_>) -> AlgorithmResult {
        let step = match ctx.requested_time(0) {
            Some(t) => time::step_at_or_before(&self.steps, t).unwrap_or(t),
            None => self.steps.first().copied().unwrap_or(0.0),
        };
        self.last_time = Some(step);

        let mut data = DataObject::scalar(self.amplitude * step);
        data.information_mut().set(&keys::DATA_TIME_STEP, step);
        ctx.set_output(0, data)
    }
}
