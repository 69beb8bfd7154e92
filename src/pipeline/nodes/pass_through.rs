//! PassThrough — forwards an image restricted to the requested extent.
//!
//! With a ghost margin it asks upstream for a larger region than it was
//! asked for, then crops back down, which is what a neighbourhood filter
//! does minus the arithmetic.

use crate::pipeline::algorithm::{Algorithm, AlgorithmTraits, ExecuteContext};
use crate::pipeline::data::DataKind;
use crate::pipeline::error::AlgorithmResult;
use crate::pipeline::port::{InputPortSpec, OutputPortSpec};

static INPUTS: &[InputPortSpec] = &[InputPortSpec::new("image", DataKind::Image)];
static OUTPUTS: &[OutputPortSpec] = &[OutputPortSpec::new("image", DataKind::Image)];

#[derive(Default)]
pub struct PassThrough {
    ghost_margin: i64,
}

impl PassThrough {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ghost_margin(mut self, margin: i64) -> Self {
        self.ghost_margin = margin;
        self
    }

    pub fn ghost_margin(&self) -> i64 {
        self.ghost_margin
    }

    pub fn set_ghost_margin(&mut self, margin: i64) {
        self.ghost_margin = margin;
    }
}

impl Algorithm for PassThrough {
    fn name(&self) -> &str {
        "PassThrough"
    }

    fn input_ports(&self) -> &[InputPortSpec] {
        INPUTS
    }

    fn output_ports(&self) -> &[OutputPortSpec] {
        OUTPUTS
    }

    fn traits(&self) -> AlgorithmTraits {
        AlgorithmTraits::default().with_ghost_margin(self.ghost_margin)
    }

    fn execute(&mut self, ctx: &mut ExecuteContext<'_>) -> AlgorithmResult {
        let input = ctx.input(0, 0)?;
        let output = match ctx.requested_extent(0) {
            Some(extent) => input.crop(&extent),
            None => input.clone(),
        };
        ctx.set_output(0, output)
    }
}
