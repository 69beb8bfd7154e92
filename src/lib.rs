//! # vispipe-rs: Demand-Driven Visualization Pipelines
//!
//! An execution engine for pipelines of data-processing algorithms. A
//! consumer asks an output port for data; the engine works out what is
//! stale for that request (extent, piece, time step) and runs only that,
//! upstream first.
//!
//! ## Architecture
//!
//! - **Pipeline**: coordinator, per-algorithm executives, ports, typed
//!   information records and the built-in algorithms
//! - **Config**: coordinator defaults loaded from TOML or JSON
//! - **Logging**: `tracing` subscriber setup
//! - **Communication**: crossbeam channels for pipeline events
//!
//! ## Configuration
//!
//! The default config file lives in the platform data directory under
//! `dev.vispipe.vispipe-rs`; see [`config`].
//!
//! ## Example
//!
//! ```ignore
//! use vispipe_rs::pipeline::{nodes::{PassThrough, RampSource}, Coordinator};
//! use vispipe_rs::types::Extent;
//!
//! let mut pipeline = Coordinator::new();
//! let ramp = pipeline.add_algorithm(RampSource::new(Extent::new(0, 99, 0, 99, 0, 0)));
//! let crop = pipeline.add_algorithm(PassThrough::new().with_ghost_margin(1));
//! pipeline.connect(pipeline.output_port(ramp, 0)?, pipeline.input_port(crop, 0)?)?;
//!
//! let out = pipeline.output_port(crop, 0)?;
//! let streamed = pipeline.update_streamed(out, 4);
//! assert!(streamed.report.is_success());
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod types;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use error::{Result, VisPipeError};
pub use pipeline::{Algorithm, Coordinator, DataObject, InfoRecord, PipelineError, SharedCoordinator, UpdateReport};
pub use types::{Bounds, Extent, ScalarType};
