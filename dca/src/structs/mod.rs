//! Data types shared by the encoding pipeline.

pub mod chunk;
pub mod config;
pub mod frame;
