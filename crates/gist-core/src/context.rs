//! Explicit execution context for mutating operations.

use serde::{Deserialize, Serialize};

/// Wall-clock timestamp and sequence (block) position of a mutation.
///
/// Passed into every write so history entries never depend on a clock read
/// inside the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockContext {
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    /// Monotonic sequence number.
    pub block: u64,
}

impl BlockContext {
    pub const fn new(timestamp: u64, block: u64) -> Self {
        Self { timestamp, block }
    }

    /// The context `blocks` sequence steps later, assuming `seconds_per_block`.
    /// Both keys saturate at `u64::MAX`.
    pub const fn advance(self, blocks: u64, seconds_per_block: u64) -> Self {
        Self {
            timestamp: self
                .timestamp
                .saturating_add(blocks.saturating_mul(seconds_per_block)),
            block: self.block.saturating_add(blocks),
        }
    }
}
