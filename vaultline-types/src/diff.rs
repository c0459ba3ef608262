//! Structural diffs returned by every mutating vault operation.
//!
//! Subscribers apply `added`/`removed` identifiers incrementally instead of
//! re-fetching whole collections.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diff {
    pub added: Vec<Uuid>,
    pub removed: Vec<Uuid>,
}

impl Diff {
    pub fn added(id: impl Into<Uuid>) -> Self {
        Self {
            added: vec![id.into()],
            removed: Vec::new(),
        }
    }

    pub fn removed<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Uuid>,
    {
        Self {
            added: Vec::new(),
            removed: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn merge(mut self, other: Diff) -> Self {
        self.added.extend(other.added);
        self.removed.extend(other.removed);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// The info view of an item after a mutation, with the diff it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changed<T> {
    pub info: T,
    pub diff: Diff,
}

impl<T> Changed<T> {
    /// A mutation that neither added nor removed anything, e.g. an update
    /// in place or a state transition.
    pub fn unchanged(info: T) -> Self {
        Self {
            info,
            diff: Diff::default(),
        }
    }
}
