//! Causal versioning for cluster metadata.
//!
//! Every node stamps the cluster configuration it accepted with a
//! [`VectorClock`]. Comparing two clocks tells whether one update causally
//! follows the other or whether they were made independently:
//!
//! ```text
//!   {1:1}          {1:2}           {1:2, 2:1}
//!     │  ──after──►  │  ──after──►    │
//!     │                              ▲
//!     └──► {1:1, 3:1} ──concurrent───┘
//! ```
//!
//! Concurrent clocks on cluster metadata mean two writers changed topology
//! without seeing each other's change. That is never resolved automatically.

mod clock;
mod versioned;

pub use clock::{Occurred, VectorClock};
pub use versioned::Versioned;
