#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the io module.
pub mod error;

/// High-level image reading functions.
///
/// See [`functional::read_image_any_gray8`] for automatic format detection.
pub mod functional;

/// PNG image encoding.
pub mod png;

pub use crate::error::IoError;
