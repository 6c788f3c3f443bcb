//! Turning foreign sources into observables.
//!
//! A source takes part through [`Interop`], which exposes up to two
//! capabilities, probed in this order:
//!
//! 1. **observable**: a stream view implementing [`StreamSource`];
//! 2. **iterable**: an [`IterableSource`] handing out fresh iterators.
//!
//! Probing a capability never starts an iteration: iterators are only created
//! by the scheduled walk, one per subscription.
//!
//! A source with neither capability is rejected by `from` with
//! [`RxError::NotObservable`].

use std::{
  any::Any,
  cell::Cell,
  collections::VecDeque,
  rc::Rc,
};

use super::{Observable, Species};
use crate::{
  error::RxError,
  observer::{Emitter, Observer},
  scheduler,
  subscription::{Subscription, Teardown},
};

// ============================================================================
// Capability protocol
// ============================================================================

/// Something that can be subscribed to.
pub trait StreamSource<Item, Err> {
  fn subscribe_observer(&self, observer: Observer<Item, Err>) -> Result<Subscription, RxError<Err>>;

  /// The view as a native observable, when it is one. `from` uses it to hand
  /// back an observable of the requested species unchanged.
  fn as_native(&self) -> Option<&dyn Any> { None }
}

/// Something that can be iterated any number of times.
pub trait IterableSource<Item> {
  /// A fresh iterator over the items.
  fn fresh_iter(&self) -> Box<dyn Iterator<Item = Item> + '_>;
}

/// The capabilities `from` looks for. Both default to absent.
pub trait Interop<Item, Err> {
  /// The stream view of this source.
  fn observable(&self) -> Option<Rc<dyn StreamSource<Item, Err>>> { None }

  /// The iteration capability of this source. Looking it up must not start
  /// an iteration.
  fn iterable(&self) -> Option<&dyn IterableSource<Item>> { None }
}

impl<Item, Err, S> StreamSource<Item, Err> for Observable<Item, Err, S>
where
  Item: 'static,
  Err: Clone + 'static,
  S: Species,
{
  fn subscribe_observer(&self, observer: Observer<Item, Err>) -> Result<Subscription, RxError<Err>> {
    self.subscribe(observer)
  }

  fn as_native(&self) -> Option<&dyn Any> { Some(self) }
}

impl<Item, Err, S> Interop<Item, Err> for Observable<Item, Err, S>
where
  Item: 'static,
  Err: Clone + 'static,
  S: Species,
{
  fn observable(&self) -> Option<Rc<dyn StreamSource<Item, Err>>> { Some(Rc::new(self.clone())) }
}

impl<T: Clone> IterableSource<T> for Vec<T> {
  fn fresh_iter(&self) -> Box<dyn Iterator<Item = T> + '_> { Box::new(self.iter().cloned()) }
}

impl<T: Clone, Err> Interop<T, Err> for Vec<T> {
  fn iterable(&self) -> Option<&dyn IterableSource<T>> { Some(self) }
}

impl<T: Clone> IterableSource<T> for VecDeque<T> {
  fn fresh_iter(&self) -> Box<dyn Iterator<Item = T> + '_> { Box::new(self.iter().cloned()) }
}

impl<T: Clone, Err> Interop<T, Err> for VecDeque<T> {
  fn iterable(&self) -> Option<&dyn IterableSource<T>> { Some(self) }
}

impl<T: Clone> IterableSource<T> for &'static [T] {
  fn fresh_iter(&self) -> Box<dyn Iterator<Item = T> + '_> { Box::new(self.iter().cloned()) }
}

impl<T: Clone, Err> Interop<T, Err> for &'static [T] {
  fn iterable(&self) -> Option<&dyn IterableSource<T>> { Some(self) }
}

impl<T: Clone, const N: usize> IterableSource<T> for [T; N] {
  fn fresh_iter(&self) -> Box<dyn Iterator<Item = T> + '_> { Box::new(self.iter().cloned()) }
}

impl<T: Clone, Err, const N: usize> Interop<T, Err> for [T; N] {
  fn iterable(&self) -> Option<&dyn IterableSource<T>> { Some(self) }
}

/// Adapter giving any re-iterable producer the iterable capability.
///
/// The closure is called once per subscription, so infinite iterators work:
/// the walk stops as soon as the subscription is closed.
///
/// ```rust
/// use lazy_rx::prelude::*;
///
/// let naturals = Observable::<u64, ()>::from(Iterable(|| 0..)).unwrap();
/// # let _ = naturals;
/// ```
#[derive(Clone, Copy)]
pub struct Iterable<F>(pub F);

impl<F, I> IterableSource<I::Item> for Iterable<F>
where
  F: Fn() -> I,
  I: IntoIterator,
  I::IntoIter: 'static,
{
  fn fresh_iter(&self) -> Box<dyn Iterator<Item = I::Item> + '_> { Box::new((self.0)().into_iter()) }
}

impl<F, I, Err> Interop<I::Item, Err> for Iterable<F>
where
  F: Fn() -> I,
  I: IntoIterator,
  I::IntoIter: 'static,
{
  fn iterable(&self) -> Option<&dyn IterableSource<I::Item>> { Some(self) }
}

// ============================================================================
// from / of
// ============================================================================

impl<Item: 'static, Err: Clone + 'static, S: Species> Observable<Item, Err, S> {
  /// Converts `source` into an observable of species `S`.
  ///
  /// - A stream view that already is an `Observable<Item, Err, S>` is returned
  ///   as is; any other view is wrapped so each subscribe is forwarded to it.
  /// - An iterable source is walked in a scheduled job after `subscribe`
  ///   returned, one fresh iterator per subscription.
  /// - Anything else fails with [`RxError::NotObservable`].
  pub fn from<T>(source: T) -> Result<Self, RxError<Err>>
  where
    T: Interop<Item, Err> + 'static,
  {
    if let Some(view) = source.observable() {
      if let Some(native) = view.as_native().and_then(|any| any.downcast_ref::<Self>()) {
        return Ok(native.clone());
      }
      return Ok(Self::new(move |emitter| view.subscribe_observer(Observer::forward(emitter))));
    }
    if source.iterable().is_none() {
      return Err(RxError::NotObservable);
    }
    Ok(Self::walk(Rc::new(source)))
  }

  /// An observable delivering `items` in order, then completing.
  ///
  /// Like every iterable source, delivery waits for the scheduler.
  pub fn of<I>(items: I) -> Self
  where
    I: IntoIterator<Item = Item>,
    Item: Clone,
  {
    Self::walk(Rc::new(items.into_iter().collect::<Vec<_>>()))
  }

  fn walk<T>(source: Rc<T>) -> Self
  where
    T: Interop<Item, Err> + 'static,
  {
    Self::new(move |emitter: Emitter<Item, Err>| {
      let stopped = Rc::new(Cell::new(false));
      let stop = stopped.clone();
      let source = source.clone();
      scheduler::schedule(move || push_items(&*source, &emitter, &stopped));
      Teardown::new(move || stop.set(true))
    })
  }
}

fn push_items<Item, Err, T>(source: &T, emitter: &Emitter<Item, Err>, stopped: &Cell<bool>)
where
  T: Interop<Item, Err> + ?Sized,
{
  let items = match source.iterable() {
    Some(iterable) => iterable.fresh_iter(),
    None => return,
  };
  for item in items {
    if stopped.get() {
      tracing::trace!("iteration stopped by unsubscribe");
      return;
    }
    if let Err(err) = emitter.next(item) {
      tracing::error!(error = %err, "next handler failed, iteration aborted");
      return;
    }
  }
  if stopped.get() {
    return;
  }
  if let Err(err) = emitter.complete() {
    tracing::error!(error = %err, "complete handler failed");
  }
}
