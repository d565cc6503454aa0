use std::sync::Arc;

/// An entity registered with a [Dispatcher](crate::Dispatcher) to
/// receive every broadcast `Action`.
pub trait Subscriber<A>: Send + Sync {
    /// Invoked by the dispatcher once per delivered action.
    fn notify(&self, action: &A);
}

impl<A, S> Subscriber<A> for Arc<S>
where
    S: Subscriber<A> + ?Sized,
{
    fn notify(&self, action: &A) {
        (**self).notify(action)
    }
}

/// A wrapper for a closure which is notified of `Action`s broadcast by
/// a [Dispatcher](crate::Dispatcher).
pub struct Callback<A>(Arc<dyn Fn(&A) + Send + Sync>);

impl<A> Clone for Callback<A> {
    fn clone(&self) -> Self {
        Callback(self.0.clone())
    }
}

impl<A> Callback<A> {
    pub fn new<C: Fn(&A) + Send + Sync + 'static>(closure: C) -> Self {
        Callback(Arc::new(closure))
    }

    pub fn emit(&self, action: &A) {
        (self.0)(action)
    }
}

impl<A> Subscriber<A> for Callback<A> {
    fn notify(&self, action: &A) {
        self.emit(action)
    }
}

impl<C, A> From<C> for Callback<A>
where
    C: Fn(&A) + Send + Sync + 'static,
{
    fn from(closure: C) -> Self {
        Callback(Arc::new(closure))
    }
}
