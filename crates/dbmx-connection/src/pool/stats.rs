//! Pool statistics types

use serde::{Deserialize, Serialize};

/// Snapshot of a pool's bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolStats {
    /// Connections currently borrowed
    pub active: usize,
    /// Connections waiting in the idle queue
    pub idle: usize,
    /// Connections being opened right now
    pub pending: usize,
    /// Borrowers waiting for a free slot
    pub waiting: usize,
    /// Physical connections opened since the pool was created
    pub created: u64,
    /// Physical connections discarded since the pool was created
    pub destroyed: u64,
}

impl PoolStats {
    /// Connections held by the pool, borrowed or idle
    pub fn total(&self) -> usize {
        self.active + self.idle
    }

    /// Share of held connections that are borrowed (0.0 to 1.0)
    pub fn utilization(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.active as f64 / total as f64,
        }
    }

    /// Whether borrowers are queueing for connections
    pub fn is_exhausted(&self) -> bool {
        self.idle == 0 && self.waiting > 0
    }
}
