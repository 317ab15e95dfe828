//! Utility functions and supporting infrastructure.
//!
//! Provides the sample FIFO, the growable scratch region and error types.

pub mod errors;
pub mod fifo;
pub mod scratch;
