//! The implicit job queue.
//!
//! A FIFO of zero-argument jobs, one per thread of control. Jobs never run
//! during the call that scheduled them: they run when the owner of the thread
//! drains the queue with [`run_pending`], or while a future is driven by
//! [`run_until`] (the `for_each` future also drains it when polled).
//!
//! `from`/`of` use it to defer walking an iterable, so that `subscribe`
//! always hands the caller its [`Subscription`](crate::subscription::Subscription)
//! before the first value is delivered.
//!
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//!
//! use lazy_rx::scheduler;
//!
//! let log = Rc::new(RefCell::new(vec![]));
//! let l = log.clone();
//! scheduler::schedule(move || l.borrow_mut().push("job"));
//! log.borrow_mut().push("caller");
//!
//! assert_eq!(scheduler::run_pending(), 1);
//! assert_eq!(*log.borrow(), vec!["caller", "job"]);
//! ```

use std::{
  cell::{Cell, RefCell},
  collections::VecDeque,
  future::Future,
  pin::pin,
  task::{Context, Poll},
};

use futures::task::noop_waker_ref;

type Job = Box<dyn FnOnce()>;

thread_local! {
  static QUEUE: RefCell<VecDeque<Job>> = RefCell::new(VecDeque::new());
  static DRAINING: Cell<bool> = const { Cell::new(false) };
}

/// Appends `job` to this thread's queue.
pub fn schedule(job: impl FnOnce() + 'static) {
  QUEUE.with(|queue| queue.borrow_mut().push_back(Box::new(job)));
}

/// Number of jobs waiting to run.
pub fn pending_jobs() -> usize { QUEUE.with(|queue| queue.borrow().len()) }

/// Runs queued jobs in submission order until the queue is empty, including
/// jobs scheduled by the jobs themselves. Returns how many jobs ran.
///
/// Only one drain loop runs at a time: calling this from inside a job returns
/// `0` immediately and leaves the queue to the outer loop.
pub fn run_pending() -> usize {
  if DRAINING.with(|draining| draining.replace(true)) {
    return 0;
  }
  let _guard = DrainGuard;

  let mut ran = 0;
  while let Some(job) = QUEUE.with(|queue| queue.borrow_mut().pop_front()) {
    ran += 1;
    tracing::trace!(job = ran, "running scheduled job");
    job();
  }
  ran
}

/// Polls `fut` to completion, draining the queue whenever it is pending.
///
/// Returns `None` if the future is still pending once the queue is idle, since
/// no queued work is left that could wake it.
pub fn run_until<F: Future>(fut: F) -> Option<F::Output> {
  let mut fut = pin!(fut);
  let mut cx = Context::from_waker(noop_waker_ref());
  loop {
    if let Poll::Ready(output) = fut.as_mut().poll(&mut cx) {
      return Some(output);
    }
    if run_pending() == 0 {
      tracing::trace!("job queue idle while future is pending");
      return None;
    }
  }
}

struct DrainGuard;

impl Drop for DrainGuard {
  fn drop(&mut self) { DRAINING.with(|draining| draining.set(false)); }
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use super::*;

  #[test]
  fn jobs_run_later_in_submission_order() {
    let log = Rc::new(RefCell::new(vec![]));
    for i in 0..3 {
      let log = log.clone();
      schedule(move || log.borrow_mut().push(i));
    }
    assert!(log.borrow().is_empty());
    assert_eq!(pending_jobs(), 3);

    assert_eq!(run_pending(), 3);
    assert_eq!(*log.borrow(), vec![0, 1, 2]);
    assert_eq!(pending_jobs(), 0);
  }

  #[test]
  fn jobs_scheduled_by_jobs_run_after_earlier_ones() {
    let log = Rc::new(RefCell::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    schedule(move || {
      l1.borrow_mut().push("outer");
      let l = l1.clone();
      schedule(move || l.borrow_mut().push("nested"));
    });
    schedule(move || l2.borrow_mut().push("second"));

    assert_eq!(run_pending(), 3);
    assert_eq!(*log.borrow(), vec!["outer", "second", "nested"]);
  }

  #[test]
  fn nested_drain_is_a_no_op() {
    let nested = Rc::new(Cell::new(usize::MAX));
    let n = nested.clone();
    schedule(move || n.set(run_pending()));
    schedule(|| {});

    assert_eq!(run_pending(), 2);
    assert_eq!(nested.get(), 0);
  }

  #[test]
  fn run_until_drives_queued_work() {
    let flag = Rc::new(Cell::new(false));
    let f = flag.clone();
    schedule(move || f.set(true));

    let polled = flag.clone();
    let out = run_until(futures::future::poll_fn(move |_| {
      if polled.get() { Poll::Ready(42) } else { Poll::Pending }
    }));
    assert_eq!(out, Some(42));
  }

  #[test]
  fn run_until_gives_up_when_idle() {
    assert_eq!(run_until(futures::future::pending::<()>()), None);
  }
}
