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
  /// Emit only those items from an Observable that pass a predicate test.
  ///
  /// ```rust
  /// use std::{cell::RefCell, rc::Rc};
  ///
  /// use lazy_rx::prelude::*;
  ///
  /// let coll = Rc::new(RefCell::new(vec![]));
  /// let c = coll.clone();
  /// Local::from_source(vec![0, 1, 2, 3, 4, 5])
  ///   .unwrap()
  ///   .filter(|v: &i32| v % 2 == 0)
  ///   .subscribe(Observer::<_, ()>::from_next(move |v| c.borrow_mut().push(v)))
  ///   .unwrap();
  ///
  /// scheduler::run_pending();
  /// // only even numbers received.
  /// assert_eq!(*coll.borrow(), vec![0, 2, 4]);
  /// ```
  pub fn filter<P>(&self, predicate: P) -> Observable<Item, Err, S>
  where
    P: Fn(&Item) -> bool + 'static,
  {
    self.try_filter(move |v| Ok(predicate(v)))
  }

  /// Like [`filter`](Observable::filter), but the predicate may fail. A
  /// failure is delivered as the derived stream's error.
  pub fn try_filter<P>(&self, predicate: P) -> Observable<Item, Err, S>
  where
    P: Fn(&Item) -> Result<bool, Err> + 'static,
  {
    let source = self.clone();
    let predicate = Rc::new(predicate);
    Observable::new(move |downstream: Emitter<Item, Err>| {
      let predicate = predicate.clone();
      let sink = downstream.clone();
      source.subscribe(Observer::relay(downstream, move |v| {
        match predicate(&v) {
          Ok(true) => sink.next(v),
          Ok(false) => Ok(()),
          Err(err) => sink.error(err),
        }
      }))
    })
  }
}
