//! Level data and the seeded randomness that produces it.
//!
//! Everything here is computed once per level (or once per spawn request)
//! and never consulted by the resolver except through [`rng`] for flee
//! nudges.
mod level;
pub mod rng;
mod spawn;

pub use level::{LevelBlueprint, LevelKind, SpawnSpec, open, scattered, template, terrain};
pub use rng::{PcgRng, RngOracle, SeededStream, compute_seed};
pub use spawn::{DEFAULT_GENERATED_NAME, SpawnRequest, classify_spawn_prompt, extract_enemy_name};
