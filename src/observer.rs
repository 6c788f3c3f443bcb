//! Observer handlers and the normalized entry points handed to producers.
//!
//! [`Observer`] is what a consumer passes to `subscribe`: up to three
//! independent handlers. [`Emitter`] is what a producer receives: the
//! `next`/`error`/`complete` entry points routed through the subscription's
//! state machine, so that calls arriving too early or too late are rejected
//! or escalated instead of reaching the handlers.

use std::rc::Rc;

use crate::{
  error::RxError,
  subscription::{Channel, SubscriptionLike},
};

pub(crate) type NextHandler<Item, Err> = Box<dyn FnMut(Item) -> Result<(), RxError<Err>>>;
pub(crate) type ErrorHandler<Err> = Box<dyn FnOnce(Err) -> Result<(), RxError<Err>>>;
pub(crate) type CompleteHandler<Err> = Box<dyn FnOnce() -> Result<(), RxError<Err>>>;

// ============================================================================
// HandlerOutput
// ============================================================================

/// Return types accepted from user handlers.
///
/// A handler either cannot fail (`()`) or reports a failure with
/// `Result<(), Err>`; a failure is surfaced as [`RxError::Handler`].
pub trait HandlerOutput<Err> {
  fn into_result(self) -> Result<(), Err>;
}

impl<Err> HandlerOutput<Err> for () {
  #[inline]
  fn into_result(self) -> Result<(), Err> { Ok(()) }
}

impl<Err> HandlerOutput<Err> for Result<(), Err> {
  #[inline]
  fn into_result(self) -> Result<(), Err> { self }
}

// ============================================================================
// Observer
// ============================================================================

/// The consumer side of a subscription.
///
/// Every handler is optional:
/// - without `next`, delivered values are dropped;
/// - without `error`, a delivered error is escalated back to the producer as
///   [`RxError::Unhandled`];
/// - without `complete`, completion is a no-op.
///
/// ```rust
/// use lazy_rx::prelude::*;
///
/// let observer = Observer::<i32, String>::new()
///   .next(|v| println!("value {v}"))
///   .error(|e| eprintln!("failed: {e}"))
///   .complete(|| println!("done"));
/// # let _ = observer;
/// ```
pub struct Observer<Item, Err> {
  pub(crate) next: Option<NextHandler<Item, Err>>,
  pub(crate) error: Option<ErrorHandler<Err>>,
  pub(crate) complete: Option<CompleteHandler<Err>>,
}

impl<Item, Err> Default for Observer<Item, Err> {
  fn default() -> Self { Self { next: None, error: None, complete: None } }
}

impl<Item: 'static, Err: 'static> Observer<Item, Err> {
  /// An observer with no handlers.
  pub fn new() -> Self { Self::default() }

  /// Shorthand for `Observer::new().next(f)`.
  pub fn from_next<F, R>(f: F) -> Self
  where
    F: FnMut(Item) -> R + 'static,
    R: HandlerOutput<Err> + 'static,
  {
    Self::new().next(f)
  }

  /// An observer forwarding every notification into `emitter`, and passing
  /// back whatever the emitter answers.
  ///
  /// This is how a subscriber routine relays a foreign source into its own
  /// subscription.
  pub fn forward(emitter: Emitter<Item, Err>) -> Self {
    let next = emitter.clone();
    Self::relay(emitter, move |v| next.next(v))
  }

  pub fn next<F, R>(mut self, mut f: F) -> Self
  where
    F: FnMut(Item) -> R + 'static,
    R: HandlerOutput<Err> + 'static,
  {
    self.next = Some(Box::new(move |v| f(v).into_result().map_err(RxError::Handler)));
    self
  }

  pub fn error<F, R>(mut self, f: F) -> Self
  where
    F: FnOnce(Err) -> R + 'static,
    R: HandlerOutput<Err> + 'static,
  {
    self.error = Some(Box::new(move |e| f(e).into_result().map_err(RxError::Handler)));
    self
  }

  pub fn complete<F, R>(mut self, f: F) -> Self
  where
    F: FnOnce() -> R + 'static,
    R: HandlerOutput<Err> + 'static,
  {
    self.complete = Some(Box::new(move || f().into_result().map_err(RxError::Handler)));
    self
  }

  /// An observer whose terminal notifications go into `emitter` while values
  /// go through `next`, which may deliver any item type into it.
  ///
  /// `next` failures are already expressed as [`RxError`] and are relayed
  /// unchanged.
  pub(crate) fn relay<B>(
    emitter: Emitter<B, Err>,
    next: impl FnMut(Item) -> Result<(), RxError<Err>> + 'static,
  ) -> Self
  where
    B: 'static,
  {
    let error = emitter.clone();
    Self {
      next: Some(Box::new(next)),
      error: Some(Box::new(move |e| error.error(e))),
      complete: Some(Box::new(move || emitter.complete())),
    }
  }
}

// ============================================================================
// Emitter
// ============================================================================

/// The normalized `next`/`error`/`complete` entry points of one subscription.
///
/// Every entry point answers with a `Result` the producer can act on:
/// - [`RxError::NotReady`] when called before `subscribe` returned;
/// - [`RxError::Unhandled`] when an error has nowhere to go;
/// - whatever the consumer's handler failed with.
///
/// Entry points must not be called concurrently; the type is neither `Send`
/// nor `Sync`.
pub struct Emitter<Item, Err>(pub(crate) Rc<Channel<Item, Err>>);

impl<Item, Err> Clone for Emitter<Item, Err> {
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<Item, Err> Emitter<Item, Err> {
  /// Delivers a value. Dropped silently once the subscription is closed or if
  /// the consumer has no `next` handler. A handler failure is returned and
  /// leaves the subscription open.
  #[inline]
  pub fn next(&self, value: Item) -> Result<(), RxError<Err>> { self.0.next(value) }

  /// Terminates the subscription with an error.
  #[inline]
  pub fn error(&self, err: Err) -> Result<(), RxError<Err>> { self.0.error(err) }

  /// Terminates the subscription normally.
  #[inline]
  pub fn complete(&self) -> Result<(), RxError<Err>> { self.0.complete() }

  /// Whether the subscription has terminated; producers use this to stop
  /// early.
  #[inline]
  pub fn is_closed(&self) -> bool { self.0.is_closed() }
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;

  use super::*;

  #[test]
  fn handler_failures_become_handler_errors() {
    let mut observer = Observer::<i32, &str>::new().next(|v| if v > 1 { Err("too big") } else { Ok(()) });
    let next = observer.next.as_mut().unwrap();
    assert_eq!(next(1), Ok(()));
    assert_eq!(next(2), Err(RxError::Handler("too big")));
  }

  #[test]
  fn forward_relays_into_emitter() {
    let seen = Rc::new(RefCell::new(vec![]));
    let s = seen.clone();
    let channel = Channel::<i32, ()>::new(Observer::from_next(move |v| s.borrow_mut().push(v)));
    channel.ready(None);

    let Observer { next, complete, .. } = Observer::forward(Emitter(channel.clone()));
    let mut next = next.unwrap();
    assert_eq!(next(7), Ok(()));
    assert_eq!((complete.unwrap())(), Ok(()));
    assert_eq!(next(8), Ok(()));

    assert_eq!(*seen.borrow(), vec![7]);
    assert!(channel.is_closed());
  }

  #[test]
  fn relay_bridges_item_types() {
    let seen = Rc::new(RefCell::new(vec![]));
    let s = seen.clone();
    let channel = Channel::<String, ()>::new(Observer::from_next(move |v| s.borrow_mut().push(v)));
    channel.ready(None);

    let sink = Emitter(channel.clone());
    let Observer { next, complete, .. } =
      Observer::<u8, ()>::relay(Emitter(channel.clone()), move |v| sink.next(format!("#{v}")));
    let mut next = next.unwrap();
    assert_eq!(next(1), Ok(()));
    assert_eq!(next(2), Ok(()));
    assert_eq!((complete.unwrap())(), Ok(()));

    assert_eq!(*seen.borrow(), vec!["#1", "#2"]);
    assert!(channel.is_closed());
  }
}
