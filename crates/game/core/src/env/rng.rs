//! Deterministic randomness for flee nudges and level generation.
//!
//! Nothing in the core touches a global RNG. Every random draw is a pure
//! function of a seed derived from the game seed plus whatever context makes
//! the draw unique (turn, entity, purpose), so a replayed game with the same
//! seed and inputs commits exactly the same positions.

/// Stateless seed-to-value mapping.
pub trait RngOracle: Send + Sync {
    fn next_u32(&self, seed: u64) -> u32;

    /// Either `-1` or `+1`.
    fn sign(&self, seed: u64) -> i32 {
        if self.next_u32(seed) & 1 == 0 { -1 } else { 1 }
    }
}

/// PCG-XSH-RR: 64-bit LCG state, 32-bit permuted output.
#[derive(Clone, Copy, Debug, Default)]
pub struct PcgRng;

impl PcgRng {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    #[inline]
    fn step(state: u64) -> u64 {
        state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT)
    }

    #[inline]
    fn output(state: u64) -> u32 {
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }
}

impl RngOracle for PcgRng {
    fn next_u32(&self, seed: u64) -> u32 {
        Self::output(Self::step(seed))
    }
}

/// Purposes mixed into [`compute_seed`] so independent draws never collide.
pub mod context {
    pub const FLEE_NUDGE_X: u32 = 0;
    pub const FLEE_NUDGE_Y: u32 = 1;
    pub const LEVEL_OBSTACLES: u32 = 16;
    pub const LEVEL_SPAWNS: u32 = 17;
    pub const LEVEL_TERRAIN: u32 = 18;
}

/// Mixes the game seed with per-draw context into a well-avalanched seed.
///
/// `nonce` is the turn number for in-turn draws and a running counter for
/// level generation; `entity` is the raw entity id (0 when not applicable).
pub fn compute_seed(game_seed: u64, nonce: u64, entity: u32, context: u32) -> u64 {
    let mut hash = game_seed;
    hash ^= nonce.wrapping_mul(0x9e3779b97f4a7c15);
    hash ^= u64::from(entity).wrapping_mul(0x517cc1b727220a95);
    hash ^= u64::from(context).wrapping_mul(0x85ebca6b);

    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xff51afd7ed558ccd);
    hash ^= hash >> 33;
    hash
}

/// Sequential stream over [`PcgRng`] for generators that need many draws.
#[derive(Clone, Debug)]
pub struct SeededStream {
    seed: u64,
    context: u32,
    counter: u64,
}

impl SeededStream {
    pub fn new(seed: u64, context: u32) -> Self {
        Self {
            seed,
            context,
            counter: 0,
        }
    }

    fn next_seed(&mut self) -> u64 {
        let seed = compute_seed(self.seed, self.counter, 0, self.context);
        self.counter += 1;
        seed
    }

    pub fn next_u32(&mut self) -> u32 {
        let seed = self.next_seed();
        PcgRng.next_u32(seed)
    }

    /// Uniform value in `[0, bound)`; `bound` of zero yields zero.
    pub fn below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.next_u32() % bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_value() {
        let seed = compute_seed(42, 3, 7, context::FLEE_NUDGE_X);
        assert_eq!(PcgRng.next_u32(seed), PcgRng.next_u32(seed));
    }

    #[test]
    fn context_changes_the_seed() {
        assert_ne!(
            compute_seed(42, 3, 7, context::FLEE_NUDGE_X),
            compute_seed(42, 3, 7, context::FLEE_NUDGE_Y)
        );
    }

    #[test]
    fn sign_is_plus_or_minus_one() {
        for nonce in 0..64 {
            let sign = PcgRng.sign(compute_seed(9, nonce, 2, 0));
            assert!(sign == -1 || sign == 1);
        }
    }

    #[test]
    fn streams_replay_identically() {
        let mut a = SeededStream::new(5, context::LEVEL_OBSTACLES);
        let mut b = SeededStream::new(5, context::LEVEL_OBSTACLES);
        let xs: Vec<u32> = (0..16).map(|_| a.below(10)).collect();
        let ys: Vec<u32> = (0..16).map(|_| b.below(10)).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|&v| v < 10));
    }
}
