#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Capability traits of the pipeline and their native implementations.
pub mod backend;

/// Typed configuration of a calibration run.
pub mod config;

/// Error types of the pipeline.
pub mod error;

/// Resolution of the input images.
pub mod input;

/// Calibration target description.
pub mod pattern;

/// The calibration pipeline and its stages.
pub mod pipeline;

/// State accumulated during a calibration run.
pub mod session;

/// Persistence of the calibration result.
pub mod writer;

pub use crate::config::CalibrationConfig;
pub use crate::error::CalibError;
pub use crate::pipeline::{run, Pipeline, RunSummary};
pub use crate::writer::CalibrationResult;
