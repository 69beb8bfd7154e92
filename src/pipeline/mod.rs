//! Demand-driven visualization pipeline.
//!
//! Algorithms are connected output-to-input into a DAG. Asking for the data
//! on an output port pulls it through the graph in three passes:
//!
//! ```text
//!   information ───────────►  (sources publish extents, time steps, ...)
//!   request update extent ◄─  (consumers say which piece / extent / time)
//!   execute ───────────────►  (only what is stale for this request runs)
//! ```
//!
//! # Design
//!
//! - **Owned coordinator**: [`Coordinator`] owns every algorithm, port and
//!   connection; `&mut self` keeps one update at a time. [`SharedCoordinator`]
//!   adds locking and a process-wide instance.
//! - **Stamps, not flags**: every change takes a fresh value from one global
//!   counter; "needs execute" is a stamp comparison plus a request compare.
//! - **Typed keys**: [`InfoKey<T>`] carries the value type and whether the
//!   entry travels downstream (meta-information), upstream (requests) or not
//!   at all (facts about one data object).
//! - **Failures are data**: errors become [`ErrorRecord`]s in the
//!   [`UpdateReport`]; a cancelled update rolls its ports back.

pub mod algorithm;
pub mod cancel;
pub mod connection;
pub mod coordinator;
pub mod data;
pub mod error;
pub mod events;
pub mod executive;
mod graph;
pub mod id;
pub mod info;
pub mod nodes;
pub mod plan;
pub mod port;
pub mod report;
pub mod shared;
pub mod snapshot;
pub mod stamp;
pub mod time;

pub use algorithm::{
    Algorithm, AlgorithmTraits, ExecuteContext, ExtentPolicy, InformationContext, InputData, RequestContext,
    TimeSnapPolicy,
};
pub use cancel::CancellationToken;
pub use connection::Connection;
pub use coordinator::Coordinator;
pub use data::{DataKind, DataObject, ImageData, Payload};
pub use error::{
    AlgorithmError, AlgorithmResult, DataError, ErrorKind, ErrorRecord, InfoError, Pass, PipelineError,
    PipelineResult,
};
pub use events::{EventBus, PipelineEvent};
pub use executive::{Executive, ExecutivePhase};
pub use id::{AlgorithmId, ConnectionId, InputPortId, PortId};
pub use info::{keys, InfoEntry, InfoKey, InfoRecord, InfoValue, Propagation};
pub use plan::{PlanStats, UpdatePlan};
pub use port::{InputPortSpec, OutputPort, OutputPortSpec, PortDirection};
pub use report::{StreamedUpdate, UpdateReport, UpdateStatus};
pub use shared::SharedCoordinator;
pub use snapshot::{AlgorithmSnapshot, ConnectionSnapshot, PortSnapshot, TopologySnapshot};
pub use stamp::Stamp;
