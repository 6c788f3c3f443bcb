//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Error taxonomy
pub use crate::error::RxError;
// Factory trait
pub use crate::factory::ObservableFactory;
// Core types and the capability protocol
pub use crate::observable::{
  Interop, Iterable, IterableSource, Local, Observable, Species, StreamSource,
};
// Observer side
pub use crate::observer::{Emitter, HandlerOutput, Observer};
// Operators
pub use crate::ops::ForEach;
// Job queue
pub use crate::scheduler;
// Subscription
pub use crate::subscription::{
  IntoTeardown, Subscription, SubscriptionGuard, SubscriptionLike, SubscriptionState, Teardown,
};
