//! Operators.
//!
//! `map` and `filter` derive a new observable of the same species that
//! subscribes to the source for every subscription of its own. `for_each`
//! turns a subscription into a single future result.
//!
//! A transform or predicate failure is delivered to the derived
//! subscription's `error`. Since the derived subscription's cleanup is the
//! upstream subscription, that termination also unsubscribes the source: no
//! further values are pulled through the failed chain.

pub mod filter;
pub mod for_each;
pub mod map;

pub use for_each::ForEach;
