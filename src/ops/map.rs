use std::rc::Rc;

use crate::{
  observable::{Observable, Species},
  observer::{Emitter, Observer},
};

impl<Item, Err, S> Observable<Item, Err, S>
where
  Item: 'static,
  Err: Clone + 'static,
  S: Species,
{
  /// Creates a new stream which calls a closure on each element and uses
  /// its return as the value.
  ///
  /// ```rust
  /// use std::{cell::RefCell, rc::Rc};
  ///
  /// use lazy_rx::prelude::*;
  ///
  /// let out = Rc::new(RefCell::new(vec![]));
  /// let o = out.clone();
  /// Local::of([1, 2, 3])
  ///   .map(|v: i32| v * 10)
  ///   .subscribe(Observer::<_, ()>::from_next(move |v| o.borrow_mut().push(v)))
  ///   .unwrap();
  ///
  /// scheduler::run_pending();
  /// assert_eq!(*out.borrow(), vec![10, 20, 30]);
  /// ```
  pub fn map<B, F>(&self, f: F) -> Observable<B, Err, S>
  where
    B: 'static,
    F: Fn(Item) -> B + 'static,
  {
    self.try_map(move |v| Ok(f(v)))
  }

  /// Like [`map`](Observable::map), but the closure may fail. A failure is
  /// delivered as the derived stream's error instead of a value.
  pub fn try_map<B, F>(&self, f: F) -> Observable<B, Err, S>
  where
    B: 'static,
    F: Fn(Item) -> Result<B, Err> + 'static,
  {
    let source = self.clone();
    let f = Rc::new(f);
    Observable::new(move |downstream: Emitter<B, Err>| {
      let f = f.clone();
      let sink = downstream.clone();
      source.subscribe(Observer::relay(downstream, move |v| match f(v) {
        Ok(mapped) => sink.next(mapped),
        Err(err) => sink.error(err),
      }))
    })
  }
}
