//! Core types shared by the coordinator, its tokens and hooks

use serde::{Deserialize, Serialize};

/// Which aggregation rule a coordinator applies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Wait for every branch; the first failure short-circuits
    Join,
    /// First success wins; otherwise a default once every branch reported
    Race,
}

/// Aggregated values delivered to the completion closure
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<V> {
    /// Join: one value per branch in creation order, empty on failure
    All(Vec<V>),
    /// Race: the winning value, or the default value when nobody won
    First(V),
}

impl<V> Outcome<V> {
    /// Values as a list. A race outcome becomes a single-element list.
    pub fn into_values(self) -> Vec<V> {
        match self {
            Outcome::All(values) => values,
            Outcome::First(value) => vec![value],
        }
    }

    /// The race value, if this is a race outcome
    pub fn into_first(self) -> Option<V> {
        match self {
            Outcome::First(value) => Some(value),
            Outcome::All(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Outcome::All(values) => values.len(),
            Outcome::First(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lifecycle events reported to hooks
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoordinatorEvent {
    /// A token was minted for creation-order slot `index`
    Minted { index: usize },
    /// A token contributed to the aggregate
    Invoked {
        index: usize,
        success: bool,
        pending: usize,
    },
    /// A token arrived after resolution or cancellation and was dropped
    Ignored { index: usize },
    /// The aggregate outcome was decided
    Resolved { success: bool },
    /// The completion closure ran
    Fired,
    /// The coordinator was cancelled before firing
    Cancelled,
}

/// Point-in-time view of a coordinator's counters and flags
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorSnapshot {
    pub name: String,
    pub policy: PolicyKind,
    pub minted: usize,
    pub pending: usize,
    pub resolved: bool,
    pub finalize_registered: bool,
    pub finalized: bool,
    pub cancelled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let all = Outcome::All(vec![1, 2, 3]);
        assert_eq!(all.len(), 3);
        assert_eq!(all.clone().into_first(), None);
        assert_eq!(all.into_values(), vec![1, 2, 3]);

        let first = Outcome::First("peer");
        assert_eq!(first.len(), 1);
        assert_eq!(first.into_first(), Some("peer"));

        assert!(Outcome::<u8>::All(Vec::new()).is_empty());
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(CoordinatorEvent::Invoked {
            index: 2,
            success: true,
            pending: 1,
        })
        .unwrap();
        assert_eq!(json["type"], "invoked");
        assert_eq!(json["index"], 2);
    }
}
