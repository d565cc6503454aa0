mod dispatcher;
mod error;
pub mod logger;
mod message;
mod queue;
mod subscriber;

pub use dispatcher::{Dispatcher, DispatcherRef};
pub use error::QueueError;
pub use message::*;
pub use queue::{Queue, Queues};
pub use subscriber::*;
