//! Built-in algorithms.
//!
//! Small, general building blocks: sources for tuples, images and
//! time-varying scalars, and filters that scale, crop, snap time, append
//! and accumulate over time.

pub mod append;
pub mod constant_source;
pub mod pass_through;
pub mod ramp_source;
pub mod scale;
pub mod temporal_sum;
pub mod time_snap;
pub mod time_source;

pub use append::Append;
pub use constant_source::ConstantSource;
pub use pass_through::PassThrough;
pub use ramp_source::RampSource;
pub use scale::Scale;
pub use temporal_sum::TemporalSum;
pub use time_snap::TimeSnap;
pub use time_source::TimeSource;
