//! # lazy-rx: a single-subscriber push stream primitive
//!
//! An [`Observable`] wraps a producer routine that runs lazily, once per
//! [`subscribe`](Observable::subscribe). Each subscription is a small state
//! machine that guarantees exactly-once, race-free termination and cleanup,
//! however it ends: completion, error, or `unsubscribe()`.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//!
//! use lazy_rx::prelude::*;
//!
//! let seen = Rc::new(RefCell::new(vec![]));
//! let s = seen.clone();
//!
//! let subscription = Local::of([0, 1, 2, 3, 4, 5])
//!   .filter(|v: &i32| v % 2 == 0)
//!   .map(|v| v * 2)
//!   .subscribe(Observer::<_, ()>::from_next(move |v| s.borrow_mut().push(v)))
//!   .unwrap();
//!
//! // Nothing is delivered before subscribe returned the handle.
//! assert!(seen.borrow().is_empty());
//!
//! scheduler::run_pending();
//! assert_eq!(*seen.borrow(), vec![0, 4, 8]);
//! assert!(subscription.is_closed());
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | Immutable producer, subscribable any number of times |
//! | [`Subscription`] | Handle to one delivery; the only way to cancel it |
//! | [`Observer`] | Optional `next`, `error` and `complete` handlers |
//! | [`Emitter`] | The entry points a producer delivers through |
//! | [`Species`] | The constructor derived observables are built with |
//! | [`scheduler`] | The implicit FIFO job queue |
//!
//! Everything is single-threaded (`Rc`/`RefCell`); nothing here is `Send`.
//!
//! [`Observable`]: observable::Observable
//! [`Subscription`]: subscription::Subscription
//! [`Observer`]: observer::Observer
//! [`Emitter`]: observer::Emitter
//! [`Species`]: observable::Species

pub mod error;
pub mod factory;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod scheduler;
pub mod subscription;

pub use prelude::*;
