//! ConstantSource — emits a fixed tuple.

use crate::pipeline::algorithm::{Algorithm, ExecuteContext};
use crate::pipeline::data::{DataKind, DataObject};
use crate::pipeline::error::AlgorithmResult;
use crate::pipeline::port::OutputPortSpec;

static OUTPUTS: &[OutputPortSpec] = &[OutputPortSpec::new("values", DataKind::Tuple)];

pub struct ConstantSource {
    values: Vec<f64>,
}

impl ConstantSource {
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn set_values(&mut self, values: impl Into<Vec<f64>>) {
        self.values = values.into();
    }
}

impl Default for ConstantSource {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Algorithm for ConstantSource {
    fn name(&self) -> &str {
        "ConstantSource"
    }

    fn output_ports(&self) -> &[OutputPortSpec] {
        OUTPUTS
    }

    fn execute(&mut self, ctx: &mut ExecuteContext<'_>) -> AlgorithmResult {
        ctx.set_output(0, DataObject::tuple(self.values.clone()))
    }
}
