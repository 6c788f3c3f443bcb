//! The Observable: a lazily invoked producer.
//!
//! An [`Observable`] stores one subscriber routine and nothing else. Each
//! call to [`Observable::subscribe`] creates a fresh subscription and runs the
//! routine once, synchronously, with that subscription's [`Emitter`]. There is
//! no multicast: two subscribes run the routine twice.
//!
//! The routine runs while the subscription is still `Initializing`, so it
//! cannot deliver synchronously: producers defer delivery (for instance
//! through the [`scheduler`](crate::scheduler)) until `subscribe` has handed
//! the caller its [`Subscription`].

use std::{marker::PhantomData, rc::Rc};

use crate::{
  error::RxError,
  observer::{Emitter, Observer},
  subscription::{Channel, IntoTeardown, Subscription, SubscriptionLike, Teardown},
};

mod from;
pub use from::{Interop, Iterable, IterableSource, StreamSource};

pub(crate) type Routine<Item, Err> =
  Rc<dyn Fn(Emitter<Item, Err>) -> Result<Option<Teardown>, RxError<Err>>>;

// ============================================================================
// Species
// ============================================================================

/// The "constructor" an observable and everything derived from it belong to.
///
/// Constructors (`from`, `of`, [`ObservableFactory`](crate::factory::ObservableFactory))
/// and operators (`map`, `filter`) always build `Observable<_, _, S>` for the
/// species `S` they were called on, so a custom species propagates through a
/// whole chain.
///
/// ```rust
/// use lazy_rx::prelude::*;
///
/// struct Audited;
/// impl Species for Audited {
///   fn on_subscribe() { println!("subscribed") }
/// }
///
/// let doubled: Observable<i32, (), Audited> = Audited::of([1, 2]).map(|v| v * 2);
/// assert_eq!(doubled.species_name(), std::any::type_name::<Audited>());
/// ```
pub trait Species: 'static {
  fn name() -> &'static str { std::any::type_name::<Self>() }

  /// Called at the start of every `subscribe` on an observable of this
  /// species, before the subscriber routine runs.
  fn on_subscribe() {}
}

/// The default species.
#[derive(Debug, Clone, Copy, Default)]
pub struct Local;

impl Species for Local {}

// ============================================================================
// Observable
// ============================================================================

pub struct Observable<Item, Err, S = Local> {
  routine: Routine<Item, Err>,
  _species: PhantomData<fn() -> S>,
}

impl<Item, Err, S> Clone for Observable<Item, Err, S> {
  fn clone(&self) -> Self { Self { routine: self.routine.clone(), _species: PhantomData } }
}

impl<Item: 'static, Err: 'static, S: Species> Observable<Item, Err, S> {
  /// Wraps a subscriber routine.
  ///
  /// The routine receives the subscription's [`Emitter`] and returns its
  /// cleanup action: `()`, a [`Teardown`], a [`Subscription`], or a `Result`
  /// of one of those. Returning `Err` reports a startup failure.
  ///
  /// ```rust
  /// use lazy_rx::prelude::*;
  ///
  /// let ticks = Observable::<u32, (), Local>::new(|emitter| {
  ///   scheduler::schedule(move || {
  ///     let _ = emitter.next(1);
  ///     let _ = emitter.complete();
  ///   });
  ///   Teardown::new(|| println!("released"))
  /// });
  /// # let _ = ticks;
  /// ```
  pub fn new<F, R>(subscriber: F) -> Self
  where
    F: Fn(Emitter<Item, Err>) -> R + 'static,
    R: IntoTeardown<Err> + 'static,
  {
    Self {
      routine: Rc::new(move |emitter| subscriber(emitter).into_teardown()),
      _species: PhantomData,
    }
  }

  pub fn species_name(&self) -> &'static str { S::name() }

  /// Whether both observables share the same subscriber routine.
  pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.routine, &other.routine) }
}

impl<Item: 'static, Err: Clone + 'static, S: Species> Observable<Item, Err, S> {
  /// Runs the subscriber routine for a new subscription.
  ///
  /// If the routine fails, a failure carrying an error value (`Producer`,
  /// `Handler`, `Unhandled`) is also offered to the observer's `error`
  /// handler before being returned; the subscription is closed either way.
  pub fn subscribe(&self, observer: Observer<Item, Err>) -> Result<Subscription, RxError<Err>> {
    S::on_subscribe();
    let channel = Channel::new(observer);
    let emitter = Emitter(channel.clone());
    tracing::trace!(species = S::name(), "subscribing");

    match (self.routine)(emitter.clone()) {
      Ok(cleanup) => channel.ready(cleanup),
      Err(err) => {
        tracing::warn!(species = S::name(), error = %err, "subscriber routine failed on startup");
        channel.ready(None);
        match err.clone().into_inner() {
          Some(e) => {
            let _ = emitter.error(e);
          }
          None => channel.unsubscribe(),
        }
        return Err(err);
      }
    }
    Ok(Subscription::from_channel(channel))
  }
}
