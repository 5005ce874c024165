//! Deterministic simulation context: seeded RNG plus a virtual clock.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

/// Stream id for graph layout / topology randomness.
pub const LAYOUT_STREAM: u64 = 1;

/// Simulation context backed by deterministic time and RNG.
///
/// All entropy for one simulation comes from a single 64-bit seed:
/// - the dynamics stream (`rng()`), drawn from once per tick
/// - derived side streams (`derive_rng`), so that e.g. switching the
///   model does not change the generated graph
pub struct SimContext {
    /// Master seed for this simulation
    seed: u64,

    /// Current virtual time (nanoseconds since simulation start)
    virtual_time_ns: u64,

    /// Dynamics RNG
    rng: ChaCha8Rng,
}

impl SimContext {
    /// Creates a new SimContext with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            virtual_time_ns: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The dynamics RNG stream.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Derives an independent RNG from the master seed and `extension`.
    pub fn derive_rng(&self, extension: u64) -> ChaCha8Rng {
        let combined_seed = self.seed.wrapping_mul(0x517cc1b727220a95) ^ extension;
        ChaCha8Rng::seed_from_u64(combined_seed)
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&mut self, duration: Duration) {
        self.virtual_time_ns += duration.as_nanos() as u64;
    }

    /// Sets the virtual time to a specific value.
    pub fn set_time(&mut self, time_ns: u64) {
        self.virtual_time_ns = time_ns;
    }

    pub fn now(&self) -> Duration {
        Duration::from_nanos(self.virtual_time_ns)
    }

    pub fn time_ns(&self) -> u64 {
        self.virtual_time_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_sim_context_time() {
        let mut ctx = SimContext::new(42);
        assert_eq!(ctx.now(), Duration::ZERO);

        ctx.advance_time(Duration::from_secs(1));
        assert_eq!(ctx.now(), Duration::from_secs(1));

        ctx.advance_time(Duration::from_millis(500));
        assert_eq!(ctx.now(), Duration::from_millis(1500));

        ctx.set_time(0);
        assert_eq!(ctx.time_ns(), 0);
    }

    #[test]
    fn test_sim_context_deterministic_rng() {
        let mut ctx1 = SimContext::new(42);
        let mut ctx2 = SimContext::new(42);

        let a: Vec<u32> = (0..8).map(|_| ctx1.rng().gen()).collect();
        let b: Vec<u32> = (0..8).map(|_| ctx2.rng().gen()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_derived_streams_differ() {
        let ctx = SimContext::new(42);

        let x: u64 = ctx.derive_rng(1).gen();
        let y: u64 = ctx.derive_rng(1).gen();
        let z: u64 = ctx.derive_rng(2).gen();

        // Same extension = same stream
        assert_eq!(x, y);
        assert_ne!(x, z);
    }

    #[test]
    fn test_sim_context_seed() {
        let ctx = SimContext::new(12345);
        assert_eq!(ctx.seed(), 12345);
    }
}
