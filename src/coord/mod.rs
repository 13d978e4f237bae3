//! Join/race coordination over single-shot callbacks
//!
//! A `Coordinator` hands out one `CallbackToken` per outstanding operation
//! and delivers a single aggregate outcome once the join or race policy
//! decides it.

pub mod types;
pub mod hooks;
pub mod coordinator;
pub mod policies;
pub mod completion;

pub use types::*;
pub use hooks::*;
pub use coordinator::*;
pub use policies::*;
pub use completion::*;
