//! RampSource — synthetic structured image.
//!
//! Sample `(i, j, k)` has the value `i + 10 j + 100 k`, so any sub-extent is
//! easy to verify. Only the requested part of the whole extent is generated.

use crate::pipeline::algorithm::{Algorithm, ExecuteContext, InformationContext};
use crate::pipeline::data::{DataKind, DataObject, ImageData};
use crate::pipeline::error::AlgorithmResult;
use crate::pipeline::info::keys;
use crate::pipeline::port::OutputPortSpec;
use crate::types::{Bounds, Extent, ScalarType};

static OUTPUTS: &[OutputPortSpec] = &[OutputPortSpec::new("image", DataKind::Image)];

pub struct RampSource {
    whole_extent: Extent,
    origin: [f64; 3],
    spacing: [f64; 3],
}

impl RampSource {
    pub fn new(whole_extent: Extent) -> Self {
        Self {
            whole_extent,
            origin: [0.0; 3],
            spacing: [1.0; 3],
        }
    }

    pub fn with_geometry(mut self, origin: [f64; 3], spacing: [f64; 3]) -> Self {
        self.origin = origin;
        self.spacing = spacing;
        self
    }

    pub fn whole_extent(&self) -> Extent {
        self.whole_extent
    }

    pub fn set_whole_extent(&mut self, extent: Extent) {
        self.whole_extent = extent;
    }

    pub fn value(i: i64, j: i64, k: i64) -> f64 {
        (i + 10 * j + 100 * k) as f64
    }
}

impl Default for RampSource {
    fn default() -> Self {
        Self::new(Extent::new(0, 9, 0, 0, 0, 0))
    }
}

impl Algorithm for RampSource {
    fn name(&self) -> &str {
        "RampSource"
    }

    fn output_ports(&self) -> &[OutputPortSpec] {
        OUTPUTS
    }

    fn report_information(&mut self, ctx: &mut InformationContext<'_>) -> AlgorithmResult {
        let whole = self.whole_extent;
        let out = ctx.output_mut(0)?;
        out.set(&keys::WHOLE_EXTENT, whole);
        out.set(&keys::SCALAR_TYPE, ScalarType::Float64);
        out.set(&keys::BOUNDS, Bounds::from_extent(&whole, self.origin, self.spacing));
        if !whole.is_empty() {
            let [x0, x1, y0, y1, z0, z1] = whole.0;
            out.set(&keys::SCALAR_RANGE, [Self::value(x0, y0, z0), Self::value(x1, y1, z1)]);
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ExecuteContext<'_>) -> AlgorithmResult {
        let extent = ctx
            .requested_extent(0)
            .unwrap_or(self.whole_extent)
            .intersect(&self.whole_extent);
        let image = ImageData::from_fn(extent, Self::value);
        ctx.set_output(0, DataObject::image(image))
    }
}
