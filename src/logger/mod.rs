//! The [Logger] collaborator invoked by a
//! [Dispatcher](crate::Dispatcher) once for every emitted message.
//! This module also contains [SimpleLogger], a logger which forwards
//! messages to the [log](https://docs.rs/log) facade.

pub mod simple_logger;

pub use simple_logger::{LogLevel, SimpleLogger};

use std::fmt::Debug;

/// Records messages emitted through a [Dispatcher](crate::Dispatcher).
///
/// Both methods are called on the emitting thread, at the moment the
/// emit operation is invoked, before delivery is scheduled. For
/// delayed emission this means the record precedes the delay.
pub trait Logger: Send + Sync {
    /// Record an `Action` which is about to be broadcast.
    fn log_action(&self, action: &dyn Debug);

    /// Record an `Effect` which is about to be applied.
    fn log_effect(&self, effect: &dyn Debug);
}
