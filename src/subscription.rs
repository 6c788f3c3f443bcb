//! Subscription lifecycle.
//!
//! Every call to `subscribe` creates one channel between a producer and a
//! consumer. The channel is a three-state machine:
//!
//! ```text
//! Initializing --(subscribe wired up)--> Ready --(complete | error | unsubscribe)--> Completed
//! ```
//!
//! The channel owns the consumer's handlers and the producer's cleanup
//! action. On entering `Completed` every reference is released and the
//! cleanup runs exactly once, whichever path got there first.

use std::{
  cell::RefCell,
  collections::VecDeque,
  fmt::{Debug, Formatter},
  rc::Rc,
};

use crate::{
  error::RxError,
  observer::{CompleteHandler, ErrorHandler, NextHandler, Observer},
};

// ============================================================================
// State
// ============================================================================

/// Lifecycle of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
  /// `subscribe` is still running the producer's subscriber routine.
  Initializing,
  /// Values are accepted.
  Ready,
  /// Terminal: completed, errored or unsubscribed.
  Completed,
}

// ============================================================================
// SubscriptionLike / Subscription
// ============================================================================

/// Anything exposing the `unsubscribe` capability.
pub trait SubscriptionLike {
  /// Cancels the delivery. Must be idempotent.
  fn unsubscribe(&self);

  fn is_closed(&self) -> bool;

  fn state(&self) -> SubscriptionState {
    if self.is_closed() { SubscriptionState::Completed } else { SubscriptionState::Ready }
  }
}

/// Handle returned by `subscribe`; the only way to cancel a delivery early.
///
/// Cloning the handle does not create a new subscription. Dropping it does
/// not unsubscribe, see [`Subscription::unsubscribe_when_dropped`] for that.
#[derive(Clone)]
pub struct Subscription(Rc<dyn SubscriptionLike>);

impl Subscription {
  /// Wraps a foreign subscription so it can be returned from a
  /// [`StreamSource`](crate::observable::StreamSource).
  pub fn new(inner: impl SubscriptionLike + 'static) -> Self { Self(Rc::new(inner)) }

  pub(crate) fn from_channel<Item: 'static, Err: 'static>(channel: Rc<Channel<Item, Err>>) -> Self {
    Self(channel)
  }

  #[inline]
  pub fn unsubscribe(&self) { self.0.unsubscribe() }

  #[inline]
  pub fn is_closed(&self) -> bool { self.0.is_closed() }

  #[inline]
  pub fn state(&self) -> SubscriptionState { self.0.state() }

  /// Whether both handles refer to the same subscription.
  pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.0, &other.0) }

  /// Activates "RAII" behavior for this subscription: `unsubscribe()` is
  /// called as soon as the returned guard goes out of scope.
  ///
  /// **Attention:** If you don't assign the return value to a variable,
  /// `unsubscribe()` is called immediately.
  pub fn unsubscribe_when_dropped(self) -> SubscriptionGuard { SubscriptionGuard(self) }
}

impl SubscriptionLike for Subscription {
  #[inline]
  fn unsubscribe(&self) { Subscription::unsubscribe(self) }
  #[inline]
  fn is_closed(&self) -> bool { Subscription::is_closed(self) }
  #[inline]
  fn state(&self) -> SubscriptionState { Subscription::state(self) }
}

impl Debug for Subscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("state", &self.state())
      .finish()
  }
}

/// An RAII implementation of a "scoped subscribed" of a subscription.
/// When this structure is dropped (falls out of scope), the subscription will
/// be unsubscribed.
///
/// If you want to drop it immediately, wrap it in its own scope
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard(Subscription);

impl SubscriptionGuard {
  /// Access to the guarded subscription.
  pub fn subscription(&self) -> &Subscription { &self.0 }
}

impl Drop for SubscriptionGuard {
  #[inline]
  fn drop(&mut self) { self.0.unsubscribe() }
}

// ============================================================================
// Teardown
// ============================================================================

/// The cleanup action a subscriber routine hands back to its subscription.
///
/// Runs exactly once, when the subscription terminates by any path.
pub struct Teardown(Box<dyn FnOnce()>);

impl Teardown {
  pub fn new(f: impl FnOnce() + 'static) -> Self { Self(Box::new(f)) }

  /// Adapts anything with an `unsubscribe` capability into a cleanup action.
  pub fn from_subscription(subscription: impl SubscriptionLike + 'static) -> Self {
    Self::new(move || subscription.unsubscribe())
  }

  pub(crate) fn run(self) {
    tracing::debug!("running subscription cleanup");
    (self.0)()
  }
}

impl Debug for Teardown {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str("Teardown") }
}

/// Conversion of a subscriber routine's return value into its cleanup action.
///
/// Accepted shapes are nothing (`()`), a [`Teardown`], an optional
/// [`Teardown`], a [`Subscription`], or a `Result` of any of those. An `Err`
/// signals that the routine failed while starting up.
pub trait IntoTeardown<Err> {
  fn into_teardown(self) -> Result<Option<Teardown>, RxError<Err>>;
}

macro_rules! impl_into_teardown {
  ($($ty:ty => |$v:ident| $conv:expr;)*) => {
    $(
      impl<Err> IntoTeardown<Err> for $ty {
        #[inline]
        fn into_teardown(self) -> Result<Option<Teardown>, RxError<Err>> {
          let $v = self;
          Ok($conv)
        }
      }

      impl<Err> IntoTeardown<Err> for Result<$ty, RxError<Err>> {
        #[inline]
        fn into_teardown(self) -> Result<Option<Teardown>, RxError<Err>> {
          let $v = self?;
          Ok($conv)
        }
      }
    )*
  };
}

impl_into_teardown! {
  () => |_unit| None;
  Teardown => |teardown| Some(teardown);
  Option<Teardown> => |teardown| teardown;
  Subscription => |subscription| Some(Teardown::from_subscription(subscription));
}

// ============================================================================
// Channel: the state machine behind a Subscription
// ============================================================================

pub(crate) struct Channel<Item, Err> {
  inner: RefCell<Inner<Item, Err>>,
}

struct Inner<Item, Err> {
  state: SubscriptionState,
  next: Option<NextHandler<Item, Err>>,
  /// Set while the `next` handler runs; values arriving meanwhile queue in
  /// `reentrant` and are delivered once it returns.
  delivering: bool,
  reentrant: VecDeque<Item>,
  error: Option<ErrorHandler<Err>>,
  complete: Option<CompleteHandler<Err>>,
  cleanup: Option<Teardown>,
}

/// Everything a channel held when it terminated.
///
/// Dropping it runs the cleanup, so a terminal handler that panics still
/// releases the producer's resources.
struct Released<Item, Err> {
  _next: Option<NextHandler<Item, Err>>,
  _reentrant: VecDeque<Item>,
  error: Option<ErrorHandler<Err>>,
  complete: Option<CompleteHandler<Err>>,
  cleanup: Option<Teardown>,
}

impl<Item, Err> Drop for Released<Item, Err> {
  fn drop(&mut self) {
    if let Some(cleanup) = self.cleanup.take() {
      cleanup.run();
    }
  }
}

impl<Item, Err> Inner<Item, Err> {
  fn release(&mut self) -> Released<Item, Err> {
    self.state = SubscriptionState::Completed;
    self.delivering = false;
    Released {
      _next: self.next.take(),
      _reentrant: std::mem::take(&mut self.reentrant),
      error: self.error.take(),
      complete: self.complete.take(),
      cleanup: self.cleanup.take(),
    }
  }
}

impl<Item, Err> Channel<Item, Err> {
  pub(crate) fn new(observer: Observer<Item, Err>) -> Rc<Self> {
    let Observer { next, error, complete } = observer;
    Rc::new(Self {
      inner: RefCell::new(Inner {
        state: SubscriptionState::Initializing,
        next,
        delivering: false,
        reentrant: VecDeque::new(),
        error,
        complete,
        cleanup: None,
      }),
    })
  }

  pub(crate) fn state(&self) -> SubscriptionState { self.inner.borrow().state }

  /// Records the cleanup and opens the channel for delivery. A channel that
  /// was already terminated while initializing runs the cleanup at once.
  pub(crate) fn ready(&self, cleanup: Option<Teardown>) {
    let late = {
      let mut inner = self.inner.borrow_mut();
      match inner.state {
        SubscriptionState::Initializing => {
          inner.state = SubscriptionState::Ready;
          inner.cleanup = cleanup;
          None
        }
        _ => cleanup,
      }
    };
    if let Some(cleanup) = late {
      cleanup.run();
    }
  }

  /// Delivers `value`. A value sent from inside the running `next` handler
  /// is queued and delivered after it, so order is kept; a failure of such a
  /// queued delivery is returned to the outermost caller.
  pub(crate) fn next(&self, value: Item) -> Result<(), RxError<Err>> {
    let mut handler = {
      let mut inner = self.inner.borrow_mut();
      match inner.state {
        SubscriptionState::Initializing => return Err(RxError::NotReady),
        SubscriptionState::Completed => return Ok(()),
        SubscriptionState::Ready if inner.delivering => {
          inner.reentrant.push_back(value);
          return Ok(());
        }
        SubscriptionState::Ready => match inner.next.take() {
          Some(handler) => {
            inner.delivering = true;
            handler
          }
          None => return Ok(()),
        },
      }
    };

    // The borrow is released while the handler runs so it may unsubscribe.
    let mut result = handler(value);
    loop {
      let queued = {
        let mut inner = self.inner.borrow_mut();
        if inner.state != SubscriptionState::Ready {
          return result;
        }
        match inner.reentrant.pop_front() {
          Some(queued) => queued,
          None => {
            inner.delivering = false;
            inner.next = Some(handler);
            return result;
          }
        }
      };
      result = result.and(handler(queued));
    }
  }

  pub(crate) fn error(&self, err: Err) -> Result<(), RxError<Err>> {
    let mut released = {
      let mut inner = self.inner.borrow_mut();
      match inner.state {
        SubscriptionState::Initializing => return Err(RxError::NotReady),
        SubscriptionState::Completed => return Err(RxError::Unhandled(err)),
        SubscriptionState::Ready => inner.release(),
      }
    };
    tracing::trace!("subscription terminated by error");
    match released.error.take() {
      Some(handler) => handler(err),
      None => Err(RxError::Unhandled(err)),
    }
  }

  pub(crate) fn complete(&self) -> Result<(), RxError<Err>> {
    let mut released = {
      let mut inner = self.inner.borrow_mut();
      match inner.state {
        SubscriptionState::Initializing => return Err(RxError::NotReady),
        SubscriptionState::Completed => return Ok(()),
        SubscriptionState::Ready => inner.release(),
      }
    };
    tracing::trace!("subscription completed");
    match released.complete.take() {
      Some(handler) => handler(),
      None => Ok(()),
    }
  }
}

impl<Item, Err> SubscriptionLike for Channel<Item, Err> {
  fn unsubscribe(&self) {
    let released = {
      let mut inner = self.inner.borrow_mut();
      if inner.state == SubscriptionState::Completed {
        return;
      }
      inner.release()
    };
    tracing::trace!("subscription cancelled");
    drop(released);
  }

  fn is_closed(&self) -> bool { self.state() == SubscriptionState::Completed }

  fn state(&self) -> SubscriptionState { Channel::state(self) }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;

  use super::*;

  fn counter() -> (Rc<Cell<u32>>, Teardown) {
    let count = Rc::new(Cell::new(0));
    let c = count.clone();
    (count, Teardown::new(move || c.set(c.get() + 1)))
  }

  #[test]
  fn entry_points_reject_while_initializing() {
    let channel = Channel::<i32, &str>::new(Observer::new());
    assert_eq!(channel.next(1), Err(RxError::NotReady));
    assert_eq!(channel.error("e"), Err(RxError::NotReady));
    assert_eq!(channel.complete(), Err(RxError::NotReady));
    assert_eq!(channel.state(), SubscriptionState::Initializing);
  }

  #[test]
  fn cleanup_runs_once_across_repeated_unsubscribe() {
    let (count, teardown) = counter();
    let channel = Channel::<i32, ()>::new(Observer::new());
    channel.ready(Some(teardown));

    channel.unsubscribe();
    channel.unsubscribe();
    assert_eq!(count.get(), 1);
    assert!(channel.is_closed());
  }

  #[test]
  fn terminated_during_initialization_runs_cleanup_when_ready() {
    let (count, teardown) = counter();
    let channel = Channel::<i32, ()>::new(Observer::new());
    channel.unsubscribe();
    assert_eq!(count.get(), 0);

    channel.ready(Some(teardown));
    assert_eq!(count.get(), 1);
    assert_eq!(channel.state(), SubscriptionState::Completed);
  }

  #[test]
  fn second_error_escalates() {
    let channel = Channel::<i32, &str>::new(Observer::new().error(|_| {}));
    channel.ready(None);
    assert_eq!(channel.error("first"), Ok(()));
    assert_eq!(channel.error("second"), Err(RxError::Unhandled("second")));
  }

  #[test]
  fn cleanup_runs_after_terminal_handler() {
    let log = Rc::new(RefCell::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    let channel = Channel::<i32, ()>::new(Observer::new().complete(move || l1.borrow_mut().push("handler")));
    channel.ready(Some(Teardown::new(move || l2.borrow_mut().push("cleanup"))));

    assert_eq!(channel.complete(), Ok(()));
    assert_eq!(*log.borrow(), vec!["handler", "cleanup"]);
  }

  #[test]
  fn cleanup_runs_even_if_terminal_handler_panics() {
    let (count, teardown) = counter();
    let channel =
      Channel::<i32, ()>::new(Observer::new().complete(|| -> () { panic!("handler failed") }));
    channel.ready(Some(teardown));

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| channel.complete()));
    assert!(outcome.is_err());
    assert_eq!(count.get(), 1);
    assert!(channel.is_closed());
  }

  #[test]
  fn next_handler_may_unsubscribe_reentrantly() {
    let seen = Rc::new(RefCell::new(vec![]));
    let slot: Rc<RefCell<Option<Rc<Channel<i32, ()>>>>> = Rc::new(RefCell::new(None));
    let (s, sl) = (seen.clone(), slot.clone());
    let channel = Channel::new(Observer::new().next(move |v| {
      s.borrow_mut().push(v);
      if let Some(channel) = sl.borrow().as_ref() {
        channel.unsubscribe();
      }
    }));
    *slot.borrow_mut() = Some(channel.clone());
    channel.ready(None);

    assert_eq!(channel.next(1), Ok(()));
    assert_eq!(channel.next(2), Ok(()));
    assert_eq!(*seen.borrow(), vec![1]);
    slot.borrow_mut().take();
  }

  #[test]
  fn values_sent_from_inside_next_are_delivered_in_order() {
    let log = Rc::new(RefCell::new(vec![]));
    let slot: Rc<RefCell<Option<Rc<Channel<i32, ()>>>>> = Rc::new(RefCell::new(None));
    let (l, sl) = (log.clone(), slot.clone());
    let channel = Channel::new(Observer::new().next(move |v| {
      l.borrow_mut().push(format!("start {v}"));
      if v == 1 {
        let channel = sl.borrow().clone();
        if let Some(channel) = channel {
          assert_eq!(channel.next(2), Ok(()));
          assert_eq!(channel.next(3), Ok(()));
        }
      }
      l.borrow_mut().push(format!("end {v}"));
    }));
    *slot.borrow_mut() = Some(channel.clone());
    channel.ready(None);

    assert_eq!(channel.next(1), Ok(()));
    assert_eq!(*log.borrow(), vec!["start 1", "end 1", "start 2", "end 2", "start 3", "end 3"]);
    assert_eq!(channel.next(4), Ok(()));
    assert_eq!(log.borrow().len(), 8);
    slot.borrow_mut().take();
  }

  #[test]
  fn queued_value_failure_reaches_the_outer_caller() {
    let slot: Rc<RefCell<Option<Rc<Channel<i32, &str>>>>> = Rc::new(RefCell::new(None));
    let sl = slot.clone();
    let channel = Channel::new(Observer::new().next(move |v| {
      if v == 1 {
        let channel = sl.borrow().clone();
        if let Some(channel) = channel {
          let _ = channel.next(2);
        }
        Ok(())
      } else {
        Err("nested failed")
      }
    }));
    *slot.borrow_mut() = Some(channel.clone());
    channel.ready(None);

    assert_eq!(channel.next(1), Err(RxError::Handler("nested failed")));
    assert_eq!(channel.state(), SubscriptionState::Ready);
    slot.borrow_mut().take();
  }

  #[test]
  fn failing_terminal_handlers_report_and_still_clean_up() {
    let (count, teardown) = counter();
    let channel = Channel::<i32, &str>::new(Observer::new().error(|e| Err::<(), _>(e)));
    channel.ready(Some(teardown));
    assert_eq!(channel.error("rejected"), Err(RxError::Handler("rejected")));
    assert_eq!(count.get(), 1);
    assert!(channel.is_closed());

    let (count, teardown) = counter();
    let channel = Channel::<i32, &str>::new(Observer::new().complete(|| Err::<(), _>("not done")));
    channel.ready(Some(teardown));
    assert_eq!(channel.complete(), Err(RxError::Handler("not done")));
    assert_eq!(count.get(), 1);
    assert!(channel.is_closed());
  }

  struct ForeignHandle(Rc<Cell<u32>>);

  impl SubscriptionLike for ForeignHandle {
    fn unsubscribe(&self) { self.0.set(self.0.get() + 1) }

    fn is_closed(&self) -> bool { self.0.get() > 0 }
  }

  #[test]
  fn foreign_subscription_behind_a_guard() {
    let calls = Rc::new(Cell::new(0));
    let subscription = Subscription::new(ForeignHandle(calls.clone()));
    assert_eq!(subscription.state(), SubscriptionState::Ready);
    {
      let guard = subscription.clone().unsubscribe_when_dropped();
      assert!(guard.subscription().ptr_eq(&subscription));
      assert!(!guard.subscription().is_closed());
    }
    assert_eq!(calls.get(), 1);
    assert_eq!(subscription.state(), SubscriptionState::Completed);
  }

  #[test]
  fn guard_unsubscribes_on_drop() {
    let (count, teardown) = counter();
    let channel = Channel::<i32, ()>::new(Observer::new());
    channel.ready(Some(teardown));
    let subscription = Subscription::from_channel(channel);
    {
      let _guard = subscription.clone().unsubscribe_when_dropped();
    }
    assert_eq!(count.get(), 1);
    assert!(subscription.is_closed());
  }
}
