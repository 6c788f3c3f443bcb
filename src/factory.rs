//! Observable factory pattern
//!
//! `ObservableFactory` puts the constructors on the species itself, so a chain
//! can start from `Local::of(..)` or from any custom species without spelling
//! out the full `Observable<Item, Err, S>` type.
//!
//! It is implemented for every [`Species`]; users never implement it
//! directly.
//!
//! ```rust
//! use lazy_rx::prelude::*;
//!
//! let numbers: Observable<i32, ()> = Local::of([1, 2, 3]);
//! let letters: Observable<char, ()> = Local::from_source(vec!['a', 'b']).unwrap();
//! # let _ = (numbers, letters);
//! ```

use crate::{
  error::RxError,
  observable::{Interop, Observable, Species},
  observer::Emitter,
  subscription::IntoTeardown,
};

pub trait ObservableFactory: Species + Sized {
  /// See [`Observable::new`].
  fn create<Item, Err, F, R>(subscriber: F) -> Observable<Item, Err, Self>
  where
    Item: 'static,
    Err: 'static,
    F: Fn(Emitter<Item, Err>) -> R + 'static,
    R: IntoTeardown<Err> + 'static,
  {
    Observable::new(subscriber)
  }

  /// See [`Observable::of`].
  fn of<Item, Err, I>(items: I) -> Observable<Item, Err, Self>
  where
    Item: Clone + 'static,
    Err: Clone + 'static,
    I: IntoIterator<Item = Item>,
  {
    Observable::of(items)
  }

  /// See [`Observable::from`].
  fn from_source<Item, Err, T>(source: T) -> Result<Observable<Item, Err, Self>, RxError<Err>>
  where
    Item: 'static,
    Err: Clone + 'static,
    T: Interop<Item, Err> + 'static,
  {
    Observable::from(source)
  }
}

impl<S: Species> ObservableFactory for S {}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, rc::Rc};

  use crate::prelude::*;

  #[test]
  fn factory_builds_observables_of_the_calling_species() {
    struct Tagged;
    impl Species for Tagged {}

    let values = Rc::new(RefCell::new(vec![]));
    let v = values.clone();
    let source: Observable<i32, (), Tagged> = Tagged::of([1, 2]);
    assert_eq!(source.species_name(), std::any::type_name::<Tagged>());

    source.subscribe(Observer::from_next(move |x| v.borrow_mut().push(x))).unwrap();
    scheduler::run_pending();
    assert_eq!(*values.borrow(), vec![1, 2]);
  }

  #[test]
  fn create_forwards_to_new() {
    let source: Observable<i32, ()> = Local::create(|emitter: Emitter<i32, ()>| {
      scheduler::schedule(move || {
        let _ = emitter.complete();
      });
    });
    let subscription = source.subscribe(Observer::new()).unwrap();
    assert!(!subscription.is_closed());
    scheduler::run_pending();
    assert!(subscription.is_closed());
  }
}
