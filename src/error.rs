//! Error taxonomy shared by observables, subscriptions and operators.
//!
//! Every failure the crate can observe is expressed as an [`RxError`] so that
//! it can be returned to whoever is able to act on it: the producer calling an
//! entry point, the caller of `subscribe`, or the awaiter of a `for_each`
//! future.

use thiserror::Error;

/// Failures surfaced by the stream primitive.
///
/// `E` is the error type carried by the observable itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RxError<E> {
  /// An entry point was called while the subscription was still being wired
  /// up, i.e. the producer tried to emit before `subscribe` returned.
  #[error("observer entry point called before subscribe returned")]
  NotReady,

  /// An error was delivered to a subscription that has no error handler, or
  /// that already terminated.
  #[error("error delivered with no error handler to receive it")]
  Unhandled(E),

  /// A user handler or an operator closure failed.
  #[error("observer handler failed")]
  Handler(E),

  /// The producer failed: either the subscriber routine failed at startup or
  /// the source delivered an error to a consumer that reports it as a result.
  #[error("producer failed")]
  Producer(E),

  /// `from` was given a source that is neither observable nor iterable.
  #[error("source is neither observable nor iterable")]
  NotObservable,
}

impl<E> RxError<E> {
  /// The error value carried by this failure, if any.
  pub fn into_inner(self) -> Option<E> {
    match self {
      RxError::Unhandled(e) | RxError::Handler(e) | RxError::Producer(e) => Some(e),
      RxError::NotReady | RxError::NotObservable => None,
    }
  }

  /// Whether this failure is a programmer error rather than a data-plane one.
  pub fn is_usage(&self) -> bool { matches!(self, RxError::NotReady | RxError::NotObservable) }
}
