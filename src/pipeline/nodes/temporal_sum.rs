//! TemporalSum — sums its input over every advertised time step.
//!
//! One update walks all steps: each execute adds one step and asks the
//! executive to continue until the last step is in. The output is not time
//! varying, so the step keys are removed from its information.

use crate::pipeline::algorithm::{Algorithm, ExecuteContext, InformationContext, RequestContext};
use crate::pipeline::data::{DataKind, DataObject};
use crate::pipeline::error::{AlgorithmError, AlgorithmResult};
use crate::pipeline::info::keys;
use crate::pipeline::port::{InputPortSpec, OutputPortSpec};

static INPUTS: &[InputPortSpec] = &[InputPortSpec::new("in", DataKind::Any)];
static OUTPUTS: &[OutputPortSpec] = &[OutputPortSpec::new("sum", DataKind::Tuple)];

#[derive(Default)]
pub struct TemporalSum {
    steps: Vec<f64>,
    /// Step requested for the current iteration.
    index: usize,
    sum: Vec<f64>,
}

impl TemporalSum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps found upstream during the last information pass.
    pub fn steps(&self) -> &[f64] {
        &self.steps
    }
}

impl Algorithm for TemporalSum {
    fn name(&self) -> &str {
        "TemporalSum"
    }

    fn input_ports(&self) -> &[InputPortSpec] {
        INPUTS
    }

    fn output_ports(&self) -> &[OutputPortSpec] {
        OUTPUTS
    }

    fn report_information(&mut self, ctx: &mut InformationContext<'_>) -> AlgorithmResult {
        self.steps = match ctx.input(0, 0) {
            Some(info) => info.lookup(&keys::TIME_STEPS)?.unwrap_or_default(),
            None => Vec::new(),
        };
        let out = ctx.output_mut(0)?;
        out.remove(&keys::TIME_STEPS);
        out.remove(&keys::TIME_RANGE);
        Ok(())
    }

    fn request_update_extent(&mut self, ctx: &mut RequestContext<'_>) -> AlgorithmResult {
        if ctx.iteration() == 0 {
            self.index = 0;
        }
        if let Some(&t) = self.steps.get(self.index) {
            ctx.input_request_mut(0, 0)?.set(&keys::UPDATE_TIME_STEP, t);
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ExecuteContext<'_>) -> AlgorithmResult {
        if ctx.iteration() == 0 {
            self.sum.clear();
        }

        let input = ctx.input(0, 0)?;
        let values = input
            .payload()
            .as_values()
            .ok_or_else(|| AlgorithmError::input_type_mismatch("TemporalSum needs scalar or tuple input"))?;
        if self.sum.is_empty() {
            self.sum = values.to_vec();
        } else if self.sum.len() == values.len() {
            for (acc, v) in self.sum.iter_mut().zip(values) {
                *acc += v;
            }
        } else {
            return Err(AlgorithmError::failure(format!(
                "step {} has {} values, earlier steps had {}",
                self.index,
                values.len(),
                self.sum.len()
            )));
        }

        self.index += 1;
        if self.index < self.steps.len() {
            ctx.request_continue();
        }
        ctx.set_output(0, DataObject::tuple(self.sum.clone()))
    }
}
