//! Join and race combinators for callback-based asynchronous operations.
//!
//! Mint one token per operation, hand each token to its operation as the
//! completion callback, and register a single completion closure. The
//! closure runs exactly once with the aggregate result, no matter how the
//! branch callbacks are ordered or whether the caller still holds the
//! coordinator.
//!
//! ```
//! use converge::Race;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let race = Race::new(true, false, -1);
//! let cloud = race.new_callback();
//! let peer = race.new_callback();
//!
//! let winner = Rc::new(Cell::new(None));
//! let slot = winner.clone();
//! race.finalize(move |ok, value| slot.set(Some((ok, value))));
//!
//! cloud.invoke(false, 0);
//! peer.invoke(true, 42);
//! assert_eq!(winner.get(), Some((true, 42)));
//! ```

// Core infrastructure modules
pub mod core {
    pub mod config;
    pub mod errors;
}

pub mod coord;

// Re-exports for convenience
pub use crate::core::config::CoordinatorConfig;
pub use crate::core::errors::{ConvergeError, Result};
pub use coord::*;
