//! Pipeline assembly for keymorph: profile-driven builders, the staged
//! manager chain, and the async dispatcher service.
//!
//! The capture collaborator feeds entries in, the virtual-HID collaborator
//! consumes the emitted stream, and everything in between is deterministic
//! and clock-explicit. [`Pipeline`] is the synchronous core;
//! [`DispatcherService`] wraps it in the single-task runtime described by
//! the concurrency model.

mod builder;
mod pipeline;
mod service;

pub use builder::{build_complex_modifications_manager, build_simple_modifications_manager};
pub use pipeline::Pipeline;
pub use service::{COMMAND_CHANNEL_CAP, Command, DispatcherService, OUTPUT_CHANNEL_CAP};
