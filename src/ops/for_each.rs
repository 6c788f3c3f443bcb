//! `for_each`: consuming a stream as a single future result.
//!
//! ## Behavior
//!
//! - **Completion**: the future resolves with `Ok(())`
//! - **Error from the source**: resolves with `Err(RxError::Producer(err))`
//! - **Callback failure**: resolves with `Err(RxError::Handler(err))` and the
//!   subscription is cancelled
//! - **Subscribe failure**: resolves with the failure `subscribe` returned
//!
//! Polling drains the [`scheduler`](crate::scheduler) queue first, so a
//! `ForEach` over a job-driven source makes progress under any executor.
//! Dropping an unsettled `ForEach` unsubscribes.

use std::{
  cell::RefCell,
  future::Future,
  pin::Pin,
  rc::Rc,
  task::{Context as TaskContext, Poll, Waker},
};

use crate::{
  error::RxError,
  observable::{Observable, Species},
  observer::{HandlerOutput, Observer},
  scheduler,
  subscription::Subscription,
};

// ============================================================================
// Internal State
// ============================================================================

/// Shared state between the future and the observer
struct SharedState<Err> {
  outcome: Option<Result<(), RxError<Err>>>,
  settled: bool,
  waker: Option<Waker>,
}

/// Records the first outcome and wakes the future; later outcomes are ignored.
fn settle<Err>(shared: &RefCell<SharedState<Err>>, outcome: Result<(), RxError<Err>>) {
  let waker = {
    let mut shared = shared.borrow_mut();
    if shared.settled {
      return;
    }
    shared.settled = true;
    shared.outcome = Some(outcome);
    shared.waker.take()
  };
  if let Some(waker) = waker {
    waker.wake();
  }
}

// ============================================================================
// ForEach
// ============================================================================

/// Future returned by [`Observable::for_each`].
#[must_use = "futures do nothing unless polled"]
pub struct ForEach<Err> {
  shared: Rc<RefCell<SharedState<Err>>>,
  subscription: Option<Subscription>,
}

impl<Err> Future for ForEach<Err> {
  type Output = Result<(), RxError<Err>>;

  fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
    scheduler::run_pending();

    let shared = self.shared.clone();
    let mut state = shared.borrow_mut();
    match state.outcome.take() {
      Some(outcome) => {
        drop(state);
        self.subscription = None;
        Poll::Ready(outcome)
      }
      None => {
        state.waker = Some(cx.waker().clone());
        Poll::Pending
      }
    }
  }
}

impl<Err> Drop for ForEach<Err> {
  fn drop(&mut self) {
    if let Some(subscription) = self.subscription.take() {
      subscription.unsubscribe();
    }
  }
}

impl<Item, Err, S> Observable<Item, Err, S>
where
  Item: 'static,
  Err: Clone + 'static,
  S: Species,
{
  /// Calls `f` for every value and resolves once the stream terminates.
  ///
  /// ```rust
  /// use std::{cell::Cell, rc::Rc};
  ///
  /// use lazy_rx::prelude::*;
  ///
  /// let sum = Rc::new(Cell::new(0));
  /// let s = sum.clone();
  /// let done = Local::of::<i32, (), _>([1, 2, 3]).for_each(move |v| s.set(s.get() + v));
  ///
  /// assert_eq!(futures::executor::block_on(done), Ok(()));
  /// assert_eq!(sum.get(), 6);
  /// ```
  pub fn for_each<F, R>(&self, mut f: F) -> ForEach<Err>
  where
    F: FnMut(Item) -> R + 'static,
    R: HandlerOutput<Err> + 'static,
  {
    let shared = Rc::new(RefCell::new(SharedState { outcome: None, settled: false, waker: None }));
    let handle: Rc<RefCell<Option<Subscription>>> = Rc::default();

    let on_next = {
      let (shared, handle) = (shared.clone(), handle.clone());
      move |value| {
        if let Err(err) = f(value).into_result() {
          settle(&shared, Err(RxError::Handler(err)));
          let subscription = handle.borrow().clone();
          if let Some(subscription) = subscription {
            subscription.unsubscribe();
          }
        }
      }
    };
    let on_error = {
      let shared = shared.clone();
      move |err| settle(&shared, Err(RxError::Producer(err)))
    };
    let on_complete = {
      let shared = shared.clone();
      move || settle(&shared, Ok(()))
    };

    let observer = Observer::new().next(on_next).error(on_error).complete(on_complete);
    let subscription = match self.subscribe(observer) {
      Ok(subscription) => Some(subscription),
      Err(err) => {
        // The failure `subscribe` returned wins over what the error handler saw.
        let mut state = shared.borrow_mut();
        state.settled = true;
        state.outcome = Some(Err(err));
        None
      }
    };
    *handle.borrow_mut() = subscription.clone();

    ForEach { shared, subscription }
  }
}
