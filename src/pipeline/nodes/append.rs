//! Append — combines every connection of a repeatable input, in connection
//! order.

use crate::pipeline::algorithm::{Algorithm, ExecuteContext};
use crate::pipeline::data::{DataKind, DataObject};
use crate::pipeline::error::AlgorithmResult;
use crate::pipeline::port::{InputPortSpec, OutputPortSpec};

static INPUTS: &[InputPortSpec] = &[InputPortSpec::new("pieces", DataKind::Any).repeatable()];
static OUTPUTS: &[OutputPortSpec] = &[OutputPortSpec::new("combined", DataKind::Any)];

#[derive(Default)]
pub struct Append;

impl Append {
    pub fn new() -> Self {
        Self
    }
}

impl Algorithm for Append {
    fn name(&self) -> &str {
        "Append"
    }

    fn input_ports(&self) -> &[InputPortSpec] {
        INPUTS
    }

    fn output_ports(&self) -> &[OutputPortSpec] {
        OUTPUTS
    }

    fn execute(&mut self, ctx: &mut ExecuteContext<'_>) -> AlgorithmResult {
        let pieces: Vec<DataObject> = ctx.inputs(0).iter().map(|input| input.data.clone()).collect();
        let combined = DataObject::concatenate(&pieces)?;
        ctx.set_output(0, combined)
    }
}
