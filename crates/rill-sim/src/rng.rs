//! Deterministic random sources for the propagation engine.
//!
//! Spreading order and source placement are the only random decisions a step
//! makes. Both draw from a single seeded [`ChaCha8Rng`] so a run is reproducible
//! from its seed regardless of thread or platform.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// The RNG a simulation uses unless the caller injects another one.
pub type SimRng = ChaCha8Rng;

/// Builds the simulation RNG for `seed`.
pub fn sim_rng(seed: u64) -> SimRng {
    ChaCha8Rng::seed_from_u64(seed)
}
