//! Hook system for coordinator lifecycle events
//!
//! Hooks observe events; they never drive the state machine.

use super::types::CoordinatorEvent;
use std::rc::Rc;

/// Observer of coordinator lifecycle events.
///
/// Called after the coordinator's internal borrow is released, in the order
/// the events happened.
pub trait CoordinatorHook {
    fn on_event(&self, coordinator: &str, event: &CoordinatorEvent);
}

/// Composite hook that chains multiple hooks
#[derive(Default)]
pub struct CompositeHook {
    hooks: Vec<Rc<dyn CoordinatorHook>>,
}

impl CompositeHook {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    pub fn add_hook(&mut self, hook: Rc<dyn CoordinatorHook>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl CoordinatorHook for CompositeHook {
    fn on_event(&self, coordinator: &str, event: &CoordinatorEvent) {
        for hook in &self.hooks {
            hook.on_event(coordinator, event);
        }
    }
}

/// Logging hook
pub struct LoggingHook;

impl CoordinatorHook for LoggingHook {
    fn on_event(&self, coordinator: &str, event: &CoordinatorEvent) {
        match event {
            CoordinatorEvent::Minted { index } => {
                tracing::trace!(coordinator, index, "callback minted");
            }
            CoordinatorEvent::Invoked {
                index,
                success,
                pending,
            } => {
                tracing::debug!(coordinator, index, success, pending, "callback invoked");
            }
            CoordinatorEvent::Ignored { index } => {
                tracing::debug!(coordinator, index, "late callback ignored");
            }
            CoordinatorEvent::Resolved { success } => {
                tracing::info!(coordinator, success, "aggregate resolved");
            }
            CoordinatorEvent::Fired => {
                tracing::debug!(coordinator, "completion fired");
            }
            CoordinatorEvent::Cancelled => {
                tracing::info!(coordinator, "coordinator cancelled");
            }
        }
    }
}
