//! Algorithm abstraction.
//!
//! An [`Algorithm`] declares its ports and implements up to three callbacks,
//! one per pass of the update protocol:
//!
//! - **`report_information`**: publish meta-information (whole extent, time
//!   steps, ...) on the outputs. Entries from the first input are already
//!   copied in.
//! - **`request_update_extent`**: translate the request on an output into
//!   requests on the inputs. Identity (or ghost-grown) requests are already
//!   filled in.
//! - **`execute`**: read inputs, write every output exactly once.
//!
//! Callbacks only see the context they are given; the executive owns all
//! port state and does the bookkeeping around them.

use crate::pipeline::cancel::CancellationToken;
use crate::pipeline::data::DataObject;
use crate::pipeline::error::{AlgorithmError, AlgorithmResult};
use crate::pipeline::info::{keys, InfoRecord};
use crate::pipeline::port::{InputPortSpec, OutputPortSpec};
use crate::types::Extent;
use std::any::Any;

/// Upcast to `Any` for typed parameter access through the coordinator.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// How default input requests are derived from an output request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtentPolicy {
    /// Inputs are asked for exactly the output request.
    #[default]
    Identity,
    /// Inputs are asked for the output extent grown by this many points on
    /// every side, clamped to the input's whole extent.
    Ghost(i64),
}

/// Time snapping declared by an algorithm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSnapPolicy {
    /// Relative tolerance used for logging and cache comparisons.
    pub tolerance: f64,
}

/// Static behaviour flags the executive consults.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AlgorithmTraits {
    pub extent_policy: ExtentPolicy,
    pub time_snapping: Option<TimeSnapPolicy>,
    /// The same inputs and request may produce different output.
    pub non_deterministic: bool,
    /// A source without a whole extent can still produce any requested
    /// piece. Sources lacking this are only executed for piece 0; later
    /// pieces receive empty data.
    pub handles_pieces: bool,
}

impl AlgorithmTraits {
    pub fn with_ghost_margin(mut self, margin: i64) -> Self {
        self.extent_policy = if margin > 0 {
            ExtentPolicy::Ghost(margin)
        } else {
            ExtentPolicy::Identity
        };
        self
    }

    pub fn with_time_snapping(mut self, tolerance: f64) -> Self {
        self.time_snapping = Some(TimeSnapPolicy { tolerance });
        self
    }

    pub fn non_deterministic(mut self) -> Self {
        self.non_deterministic = true;
        self
    }

    pub fn with_piece_handling(mut self) -> Self {
        self.handles_pieces = true;
        self
    }
}

/// A node of the pipeline.
pub trait Algorithm: AsAny + Send {
    /// Human-readable name, used in logs and error records.
    fn name(&self) -> &str;

    fn input_ports(&self) -> &[InputPortSpec] {
        &[]
    }

    fn output_ports(&self) -> &[OutputPortSpec];

    fn traits(&self) -> AlgorithmTraits {
        AlgorithmTraits::default()
    }

    fn report_information(&mut self, _ctx: &mut InformationContext<'_>) -> AlgorithmResult {
        Ok(())
    }

    fn request_update_extent(&mut self, _ctx: &mut RequestContext<'_>) -> AlgorithmResult {
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ExecuteContext<'_>) -> AlgorithmResult;
}

/// View handed to [`Algorithm::report_information`].
pub struct InformationContext<'a> {
    pub(crate) inputs: &'a [Vec<InfoRecord>],
    pub(crate) outputs: &'a mut [InfoRecord],
}

impl<'a> InformationContext<'a> {
    pub fn input_count(&self, port: usize) -> usize {
        self.inputs.get(port).map_or(0, Vec::len)
    }

    /// Information of the producer feeding `connection` of input `port`.
    pub fn input(&self, port: usize, connection: usize) -> Option<&InfoRecord> {
        self.inputs.get(port)?.get(connection)
    }

    pub fn inputs(&self, port: usize) -> &[InfoRecord] {
        self.inputs.get(port).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn output(&self, port: usize) -> Option<&InfoRecord> {
        self.outputs.get(port)
    }

    pub fn output_mut(&mut self, port: usize) -> AlgorithmResult<&mut InfoRecord> {
        let count = self.outputs.len();
        self.outputs
            .get_mut(port)
            .ok_or_else(|| AlgorithmError::internal(format!("output {} of {} does not exist", port, count)))
    }
}

/// View handed to [`Algorithm::request_update_extent`].
pub struct RequestContext<'a> {
    pub(crate) requested_port: usize,
    pub(crate) outputs: &'a [InfoRecord],
    pub(crate) inputs: &'a [Vec<InfoRecord>],
    pub(crate) input_requests: &'a mut [Vec<InfoRecord>],
    pub(crate) iteration: u32,
}

impl<'a> RequestContext<'a> {
    /// Index of the output port the update was asked for.
    pub fn requested_port(&self) -> usize {
        self.requested_port
    }

    /// 0 on the first request of an update, counting up while `execute`
    /// keeps asking to continue.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Finalized request (and meta-information) of the requested output.
    pub fn request(&self) -> &InfoRecord {
        &self.outputs[self.requested_port]
    }

    pub fn output(&self, port: usize) -> Option<&InfoRecord> {
        self.outputs.get(port)
    }

    pub fn input_count(&self, port: usize) -> usize {
        self.inputs.get(port).map_or(0, Vec::len)
    }

    /// Meta-information published by the producer of an input connection.
    pub fn input(&self, port: usize, connection: usize) -> Option<&InfoRecord> {
        self.inputs.get(port)?.get(connection)
    }

    /// Request that will be sent upstream on an input connection.
    pub fn input_request(&self, port: usize, connection: usize) -> Option<&InfoRecord> {
        self.input_requests.get(port)?.get(connection)
    }

    pub fn input_request_mut(&mut self, port: usize, connection: usize) -> AlgorithmResult<&mut InfoRecord> {
        self.input_requests
            .get_mut(port)
            .and_then(|conns| conns.get_mut(connection))
            .ok_or_else(|| {
                AlgorithmError::internal(format!("input {} has no connection {}", port, connection))
            })
    }
}

/// One input connection's data and its producer's information.
#[derive(Debug, Clone)]
pub struct InputData {
    pub data: DataObject,
    pub information: InfoRecord,
}

/// Output written by `execute`, checked by the executive afterwards.
#[derive(Debug)]
pub(crate) struct OutputSlot {
    pub(crate) information: InfoRecord,
    pub(crate) data: Option<DataObject>,
    pub(crate) writes: u32,
}

impl OutputSlot {
    pub(crate) fn new(information: InfoRecord) -> Self {
        Self {
            information,
            data: None,
            writes: 0,
        }
    }
}

/// View handed to [`Algorithm::execute`].
pub struct ExecuteContext<'a> {
    pub(crate) inputs: &'a [Vec<InputData>],
    pub(crate) outputs: &'a mut [OutputSlot],
    pub(crate) cancel: &'a CancellationToken,
    pub(crate) iteration: u32,
    pub(crate) continue_requested: bool,
}

impl<'a> ExecuteContext<'a> {
    pub fn input_count(&self, port: usize) -> usize {
        self.inputs.get(port).map_or(0, Vec::len)
    }

    /// Data on `connection` of input `port`.
    pub fn input(&self, port: usize, connection: usize) -> AlgorithmResult<&DataObject> {
        self.inputs
            .get(port)
            .and_then(|conns| conns.get(connection))
            .map(|input| &input.data)
            .ok_or_else(|| {
                AlgorithmError::input_missing(format!("input {} has no connection {}", port, connection))
            })
    }

    pub fn inputs(&self, port: usize) -> &[InputData] {
        self.inputs.get(port).map(Vec::as_slice).unwrap_or_default()
    }

    /// Request and meta-information of an output.
    pub fn output_info(&self, port: usize) -> Option<&InfoRecord> {
        self.outputs.get(port).map(|slot| &slot.information)
    }

    /// Extent requested on an output, if any.
    pub fn requested_extent(&self, port: usize) -> Option<Extent> {
        self.output_info(port)
            .and_then(|info| info.lookup(&keys::UPDATE_EXTENT).ok().flatten())
    }

    /// Time requested on an output, if any.
    pub fn requested_time(&self, port: usize) -> Option<f64> {
        self.output_info(port)
            .and_then(|info| info.lookup(&keys::UPDATE_TIME_STEP).ok().flatten())
    }

    pub fn set_output(&mut self, port: usize, data: DataObject) -> AlgorithmResult {
        let count = self.outputs.len();
        let slot = self
            .outputs
            .get_mut(port)
            .ok_or_else(|| AlgorithmError::internal(format!("output {} of {} does not exist", port, count)))?;
        slot.writes += 1;
        slot.data = Some(data);
        Ok(())
    }

    /// Ask the executive to run the request and execute passes again for the
    /// same update once this call returns.
    pub fn request_continue(&mut self) {
        self.continue_requested = true;
    }

    /// 0 on the first call of an update, counting up across continued calls.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// `Err(Cancelled)` once the update has been cancelled.
    pub fn check_cancelled(&self) -> AlgorithmResult {
        if self.is_cancelled() {
            Err(AlgorithmError::cancelled())
        } else {
            Ok(())
        }
    }
}
