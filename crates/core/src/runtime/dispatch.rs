//! Block-to-thread dispatch policies.
//!
//! Which control thread services which compute block is not part of the
//! runtime's contract; it only has to be safe under concurrent dispatch.
//! The policy is therefore an injectable trait, testable in isolation from
//! thread spawning.

use std::fmt;

/// Assigns compute-block indices to control threads.
///
/// Implementations must be pure functions of their inputs: the scheduler
/// calls `assign` once per thread before spawning, and every block index in
/// `0..block_dim` must be assigned to exactly one thread across the whole
/// launch.
pub trait DispatchPolicy: Send + Sync + fmt::Debug {
    /// Returns the block indices thread `thread_idx` of `thread_num`
    /// services for a launch over `block_dim` blocks.
    fn assign(&self, thread_idx: u32, thread_num: u32, block_dim: u32) -> Vec<u32>;
}

/// Contiguous split: each thread takes a consecutive run of blocks, with
/// the remainder spread over the low-indexed threads.
///
/// This is the default policy; it matches the production executor's
/// per-thread core runs while lifting its divisibility restriction.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContiguousBlocks;

impl DispatchPolicy for ContiguousBlocks {
    fn assign(&self, thread_idx: u32, thread_num: u32, block_dim: u32) -> Vec<u32> {
        let base = block_dim / thread_num;
        let extra = block_dim % thread_num;
        // Threads below `extra` take one extra block each.
        let count = base + u32::from(thread_idx < extra);
        let start = thread_idx * base + thread_idx.min(extra);
        (start..start + count).collect()
    }
}

/// Round-robin split: block `b` goes to thread `b % thread_num`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RoundRobinBlocks;

impl DispatchPolicy for RoundRobinBlocks {
    fn assign(&self, thread_idx: u32, thread_num: u32, block_dim: u32) -> Vec<u32> {
        (0..block_dim).filter(|b| b % thread_num == thread_idx).collect()
    }
}
