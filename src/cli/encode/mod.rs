mod encode_impl;
pub mod output;
pub mod preset;
pub mod progress;
pub mod source_thread;

pub use encode_impl::cmd_encode;
