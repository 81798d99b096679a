//! Vector clock implementation.

use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Causal relationship of one clock to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occurred {
    /// Strictly happened before the other clock.
    Before,
    /// Strictly happened after the other clock.
    After,
    /// Neither clock dominates: independent updates.
    Concurrently,
    /// Same causal history.
    Equal,
}

/// Per-node version counters plus the wall-clock time of the last write.
///
/// Equality only considers the counters. The timestamp is informational and
/// never participates in ordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorClock {
    entries: BTreeMap<NodeId, u64>,
    timestamp: u64,
}

impl VectorClock {
    /// Create an empty clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a clock from explicit `(node, version)` entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (NodeId, u64)>, timestamp: u64) -> Self {
        Self {
            entries: entries.into_iter().filter(|(_, v)| *v > 0).collect(),
            timestamp,
        }
    }

    /// Counter recorded for `node_id`, zero if the node never wrote.
    pub fn version_of(&self, node_id: NodeId) -> u64 {
        self.entries.get(&node_id).copied().unwrap_or(0)
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (NodeId, u64)> + '_ {
        self.entries.iter().map(|(n, v)| (*n, *v))
    }

    /// Return a copy of this clock with `node_id`'s counter bumped by one.
    pub fn incremented(&self, node_id: NodeId, timestamp: u64) -> Self {
        let mut next = self.clone();
        *next.entries.entry(node_id).or_insert(0) += 1;
        next.timestamp = timestamp;
        next
    }

    /// Pointwise maximum of two clocks.
    pub fn merge(&self, other: &VectorClock) -> Self {
        let mut merged = self.entries.clone();
        for (&node, &version) in &other.entries {
            let slot = merged.entry(node).or_insert(0);
            *slot = (*slot).max(version);
        }
        Self {
            entries: merged,
            timestamp: self.timestamp.max(other.timestamp),
        }
    }

    /// Compare this clock against `other`.
    ///
    /// `a.compare(b) == Occurred::After` means `a` causally follows `b`.
    pub fn compare(&self, other: &VectorClock) -> Occurred {
        let mut self_bigger = false;
        let mut other_bigger = false;

        let nodes = self.entries.keys().chain(other.entries.keys());
        for &node in nodes {
            match self.version_of(node).cmp(&other.version_of(node)) {
                Ordering::Greater => self_bigger = true,
                Ordering::Less => other_bigger = true,
                Ordering::Equal => {}
            }
            if self_bigger && other_bigger {
                return Occurred::Concurrently;
            }
        }

        match (self_bigger, other_bigger) {
            (true, false) => Occurred::After,
            (false, true) => Occurred::Before,
            (false, false) => Occurred::Equal,
            (true, true) => Occurred::Concurrently,
        }
    }

    /// Whether this clock strictly follows `other`.
    pub fn is_after(&self, other: &VectorClock) -> bool {
        self.compare(other) == Occurred::After
    }

    /// Whether neither clock causally follows the other.
    pub fn is_concurrent_with(&self, other: &VectorClock) -> bool {
        self.compare(other) == Occurred::Concurrently
    }
}

impl PartialEq for VectorClock {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for VectorClock {}

impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "version(")?;
        for (i, (node, version)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", node, version)?;
        }
        write!(f, ") ts:{}", self.timestamp)
    }
}
