//! Deterministic sampling RNG.
//!
//! The spatial index inserts at most `index_sample_cap` nodes per partition.
//! Which nodes are chosen must not depend on the order partitions are
//! visited (they may be sampled in parallel), so each partition gets its own
//! `SmallRng` seeded by:
//!
//!   seed = global_seed XOR (partition_key * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads neighbouring cell keys uniformly across the seed space.

use rand::SeedableRng;
use rand::rngs::SmallRng;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Per-partition deterministic RNG.
pub struct SampleRng(SmallRng);

impl SampleRng {
    /// Seed deterministically from the run's global seed and a partition key.
    pub fn new(global_seed: u64, partition_key: u64) -> Self {
        let seed = global_seed ^ partition_key.wrapping_mul(MIXING_CONSTANT);
        SampleRng(SmallRng::seed_from_u64(seed))
    }

    /// Choose `amount` distinct indices from `0..len`, returned in ascending
    /// order.  If `amount >= len` every index is returned.
    pub fn sample_indices(&mut self, len: usize, amount: usize) -> Vec<usize> {
        if amount >= len {
            return (0..len).collect();
        }
        let mut picked = rand::seq::index::sample(&mut self.0, len, amount).into_vec();
        picked.sort_unstable();
        picked
    }
}
