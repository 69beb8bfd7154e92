//! Scale — multiplies every sample by a factor.
//!
//! Works on scalars, tuples and images; the output has the input's shape.

use crate::pipeline::algorithm::{Algorithm, ExecuteContext};
use crate::pipeline::data::{DataKind, DataObject, ImageData, Payload};
use crate::pipeline::error::{AlgorithmError, AlgorithmResult};
use crate::pipeline::port::{InputPortSpec, OutputPortSpec};

static INPUTS: &[InputPortSpec] = &[InputPortSpec::new("in", DataKind::Any)];
static OUTPUTS: &[OutputPortSpec] = &[OutputPortSpec::new("out", DataKind::Any)];

pub struct Scale {
    factor: f64,
}

impl Scale {
    pub fn new(factor: f64) -> Self {
        Self { factor }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn set_factor(&mut self, factor: f64) {
        self.factor = factor;
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl Algorithm for Scale {
    fn name(&self) -> &str {
        "Scale"
    }

    fn input_ports(&self) -> &[InputPortSpec] {
        INPUTS
    }

    fn output_ports(&self) -> &[OutputPortSpec] {
        OUTPUTS
    }

    fn execute(&mut self, ctx: &mut ExecuteContext<'_>) -> AlgorithmResult {
        let input = ctx.input(0, 0)?;
        let factor = self.factor;
        let output = match input.payload() {
            Payload::Empty => DataObject::empty(),
            Payload::Scalar(v) => DataObject::scalar(v * factor),
            Payload::Tuple(values) => DataObject::tuple(values.iter().map(|v| v * factor).collect::<Vec<_>>()),
            Payload::Image(img) => {
                let values = img.values().iter().map(|v| v * factor).collect();
                DataObject::image(ImageData::new(img.extent(), values)?)
            }
            Payload::Opaque(_) => {
                return Err(AlgorithmError::input_type_mismatch("Scale needs numeric input"));
            }
        };
        ctx.set_output(0, output)
    }
}
