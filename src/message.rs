use std::{borrow::Cow, fmt};

/// The name of an execution [Queue](crate::Queue).
///
/// Messages declare the label of the queue they prefer to be
/// delivered on, and the [Dispatcher](crate::Dispatcher) resolves it
/// to a running queue through its [Queues](crate::Queues).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueLabel(Cow<'static, str>);

impl QueueLabel {
    /// The main (UI) queue, which always exists on a
    /// [Queues](crate::Queues) registry.
    pub const MAIN: QueueLabel = QueueLabel::from_static("main");

    pub const fn from_static(label: &'static str) -> Self {
        QueueLabel(Cow::Borrowed(label))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for QueueLabel {
    fn from(label: &'static str) -> Self {
        QueueLabel::from_static(label)
    }
}

impl From<String> for QueueLabel {
    fn from(label: String) -> Self {
        QueueLabel(Cow::Owned(label))
    }
}

/// An immutable message describing something that happened, broadcast
/// by the [Dispatcher](crate::Dispatcher) to every
/// [Subscriber](crate::Subscriber).
pub trait Action: fmt::Debug + Send + Sync + 'static {
    /// The queue this action prefers to be delivered on.
    fn execution_queue(&self) -> QueueLabel;
}

/// A message carrying its own side effect. Effects are not broadcast
/// to subscribers, the [Dispatcher](crate::Dispatcher) only logs and
/// schedules them, and then calls [Effect::apply()] exactly once on
/// the effect's declared queue.
pub trait Effect: fmt::Debug + Send + 'static {
    /// The queue this effect prefers to be applied on.
    fn execution_queue(&self) -> QueueLabel;

    /// Perform the side effect.
    fn apply(self);
}
