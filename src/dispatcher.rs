use crate::{
    logger::{Logger, SimpleLogger},
    Action, Effect, Queue, QueueError, QueueLabel, Queues, Subscriber,
};
use parking_lot::RwLock;
use std::{fmt::Debug, ops::Deref, sync::Arc, time::Duration};

type Registry<A> = Arc<RwLock<Vec<Arc<dyn Subscriber<A>>>>>;

/// Take a copy of the registered subscribers, so that notification
/// happens outside the lock and a subscriber may itself call
/// [Dispatcher::subscribe()].
fn snapshot<A>(registry: &Registry<A>) -> Vec<Arc<dyn Subscriber<A>>> {
    registry.read().clone()
}

/// Notify every subscriber of `action`, in registration order.
fn notify_all<A>(registry: &Registry<A>, action: &A) {
    for subscriber in snapshot(registry) {
        subscriber.notify(action);
    }
}

/// A wrapper for an [Arc] reference to a [Dispatcher].
///
/// This is the handle which the application's composition root hands
/// out to the producers of actions and to the subscribers which react
/// to them.
///
/// A subscriber holding a clone of the handle keeps the dispatcher
/// alive through its own registry, so the dispatcher and its queues are
/// never dropped. Their worker threads then only stop when
/// [Dispatcher::shutdown()] is called.
pub struct DispatcherRef<A>(Arc<Dispatcher<A>>);

impl<A: Action> DispatcherRef<A> {
    /// Create a new [Dispatcher] with the default configuration, see
    /// [Dispatcher::new()].
    pub fn new() -> Self {
        Self(Arc::new(Dispatcher::new()))
    }
}

impl<A: Action> Default for DispatcherRef<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> From<Dispatcher<A>> for DispatcherRef<A> {
    fn from(dispatcher: Dispatcher<A>) -> Self {
        Self(Arc::new(dispatcher))
    }
}

impl<A> Clone for DispatcherRef<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A> Deref for DispatcherRef<A> {
    type Target = Dispatcher<A>;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl<A> PartialEq for DispatcherRef<A> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Broadcasts `Action`s to a registry of [Subscriber]s and applies
/// [Effect]s, on the execution [Queue] each message declares.
///
/// Every emit operation records the message with the dispatcher's
/// [Logger] exactly once, on the calling thread, before delivery is
/// scheduled. Subscribers are notified in the order they subscribed.
///
/// The asynchronous operations are fire-and-forget: they return as
/// soon as the delivery has been handed to its queue, and the caller
/// cannot observe when (or whether) it completes. If the queue can't
/// accept the delivery (because it was shut down), a warning is
/// logged and the message is dropped.
///
/// A subscriber or effect which panics is not caught by the
/// dispatcher. The subscribers after it in the registry are not
/// notified of that action. During [emit_sync()](Dispatcher::emit_sync())
/// the panic resumes on the calling thread, otherwise it is logged by
/// the queue worker, which carries on with its next job.
pub struct Dispatcher<A> {
    /// The subscribers, in the order they will be notified.
    subscribers: Registry<A>,
    logger: Box<dyn Logger>,
    queues: Arc<Queues>,
}

impl<A> Debug for Dispatcher<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Dispatcher {{ subscribers: {} }}",
            self.subscribers.read().len()
        )
    }
}

impl<A: Action> Default for Dispatcher<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Action> Dispatcher<A> {
    /// Create a new [Dispatcher] with no subscribers, logging through a
    /// [SimpleLogger], and owning its own [Queues].
    pub fn new() -> Self {
        Self::with_queues(Arc::new(Queues::new()))
    }

    /// Create a new [Dispatcher] which delivers on the provided
    /// `queues`, which may be shared with other dispatchers.
    pub fn with_queues(queues: Arc<Queues>) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
            logger: Box::new(SimpleLogger::new()),
            queues,
        }
    }

    /// Set the [Logger] which records every emitted message.
    pub fn logger<L: Logger + 'static>(mut self, logger: L) -> Self {
        self.logger = Box::new(logger);
        self
    }

    /// The execution queues this dispatcher delivers on.
    pub fn queues(&self) -> &Arc<Queues> {
        &self.queues
    }

    /// Subscribe to every `Action` emitted after this call.
    ///
    /// There is no duplicate detection and no way to unsubscribe;
    /// the subscriber lives as long as this dispatcher.
    pub fn subscribe<S: Subscriber<A> + 'static>(&self, subscriber: S) {
        self.subscribers.write().push(Arc::new(subscriber));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Shut down every queue this dispatcher delivers on. Messages
    /// emitted afterwards are logged and dropped.
    pub fn shutdown(&self) {
        self.queues.shutdown();
    }

    /// Resolve `label` and hand the queue to `schedule`, logging a
    /// warning if the message could not be scheduled.
    fn schedule<F>(&self, label: &QueueLabel, schedule: F)
    where
        F: FnOnce(&Queue) -> Result<(), QueueError>,
    {
        let result = self
            .queues
            .get(label)
            .and_then(|queue| schedule(&queue));

        if let Err(error) = result {
            log::warn!("dropping message: {}", error);
        }
    }

    /// Broadcast `action` on its declared queue, blocking until every
    /// subscriber has been notified.
    ///
    /// # Deadlocks
    ///
    /// Calling this from the worker of the action's own queue (for
    /// instance from a subscriber of an action on that queue) blocks
    /// forever.
    pub fn emit_sync(&self, action: A) {
        self.logger.log_action(&action);

        let subscribers = self.subscribers.clone();
        self.schedule(&action.execution_queue(), move |queue| {
            queue.exec_sync(move || notify_all(&subscribers, &action))
        });
    }

    /// Broadcast `action` on its declared queue, returning
    /// immediately.
    pub fn emit_async(&self, action: A) {
        let label = action.execution_queue();
        self.emit_async_on(action, &label);
    }

    /// Broadcast `action` on the queue labelled `label`, instead of the
    /// action's declared queue, returning immediately.
    pub fn emit_async_on(&self, action: A, label: &QueueLabel) {
        self.logger.log_action(&action);

        let subscribers = self.subscribers.clone();
        self.schedule(label, move |queue| {
            queue.exec(move || notify_all(&subscribers, &action))
        });
    }

    /// Broadcast `action` on the main queue, returning immediately.
    pub fn emit_async_main(&self, action: A) {
        self.emit_async_on(action, &QueueLabel::MAIN);
    }

    /// Broadcast `action` on its declared queue once `delay` has
    /// elapsed, returning immediately. The action is logged now, not
    /// when it is delivered.
    pub fn emit_async_after(&self, action: A, delay: Duration) {
        self.logger.log_action(&action);

        let subscribers = self.subscribers.clone();
        self.schedule(&action.execution_queue(), move |queue| {
            queue.exec_after(delay, move || notify_all(&subscribers, &action))
        });
    }

    /// Broadcast a batch of `actions` in a single job on the first
    /// action's declared queue, returning immediately.
    ///
    /// Each subscriber receives every action in the batch, in order,
    /// before the next subscriber is notified. An empty batch does
    /// nothing.
    pub fn emit_async_batch(&self, actions: Vec<A>) {
        let label = match actions.first() {
            Some(action) => action.execution_queue(),
            None => return,
        };

        for action in &actions {
            self.logger.log_action(action);
        }

        let subscribers = self.subscribers.clone();
        self.schedule(&label, move |queue| {
            queue.exec(move || {
                for subscriber in snapshot(&subscribers) {
                    for action in &actions {
                        subscriber.notify(action);
                    }
                }
            })
        });
    }

    /// Apply `effect` on its declared queue, blocking until it has
    /// been applied. Subscribers are not notified.
    ///
    /// # Deadlocks
    ///
    /// Calling this from the worker of the effect's own queue blocks
    /// forever.
    pub fn emit_effect_sync<E: Effect>(&self, effect: E) {
        self.logger.log_effect(&effect);

        self.schedule(&effect.execution_queue(), move |queue| {
            queue.exec_sync(move || effect.apply())
        });
    }

    /// Apply `effect` on its declared queue, returning immediately.
    pub fn emit_effect_async<E: Effect>(&self, effect: E) {
        self.logger.log_effect(&effect);

        self.schedule(&effect.execution_queue(), move |queue| {
            queue.exec(move || effect.apply())
        });
    }

    /// Apply a batch of `effects`, in order, in a single job on the
    /// first effect's declared queue, returning immediately. An empty
    /// batch does nothing.
    pub fn emit_effects_async<E: Effect>(&self, effects: Vec<E>) {
        let label = match effects.first() {
            Some(effect) => effect.execution_queue(),
            None => return,
        };

        for effect in &effects {
            self.logger.log_effect(effect);
        }

        self.schedule(&label, move |queue| {
            queue.exec(move || {
                for effect in effects {
                    effect.apply();
                }
            })
        });
    }

    /// Apply `effect` on its declared queue once `delay` has elapsed,
    /// returning immediately. The effect is logged now, not when it is
    /// applied.
    pub fn emit_effect_async_after<E: Effect>(&self, effect: E, delay: Duration) {
        self.logger.log_effect(&effect);

        self.schedule(&effect.execution_queue(), move |queue| {
            queue.exec_after(delay, move || effect.apply())
        });
    }
}
