//! A value paired with the vector clock it was written under.

use crate::error::Result;
use crate::types::Cluster;
use crate::versioning::VectorClock;
use serde::{Deserialize, Serialize};

/// A value tagged with its causal version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
    value: T,
    version: VectorClock,
}

impl<T> Versioned<T> {
    /// Wrap a value that has never been written anywhere.
    ///
    /// The empty clock happens before every other clock.
    pub fn unversioned(value: T) -> Self {
        Self {
            value,
            version: VectorClock::new(),
        }
    }

    pub fn new(value: T, version: VectorClock) -> Self {
        Self { value, version }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn version(&self) -> &VectorClock {
        &self.version
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn into_parts(self) -> (T, VectorClock) {
        (self.value, self.version)
    }
}

impl Versioned<Cluster> {
    /// Serialize the versioned cluster to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize a versioned cluster from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }
}
