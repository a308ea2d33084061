//! Level generation.
//!
//! A [`LevelBlueprint`] is a static layout plus an ordered spawn list; list
//! order becomes movement order when the blueprint is instantiated.
use crate::config::GameConfig;
use crate::grid::{Layer, LevelError, LevelLayout};
use crate::policy::{AxisPreference, MovementPolicy};
use crate::state::Position;

use super::rng::{SeededStream, context};

/// Initial placement of one entity.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpawnSpec {
    pub name: String,
    pub position: Position,
    pub policy: MovementPolicy,
}

impl SpawnSpec {
    pub fn new(name: impl Into<String>, position: Position, policy: MovementPolicy) -> Self {
        Self {
            name: name.into(),
            position,
            policy,
        }
    }

    pub fn player(position: Position) -> Self {
        Self::new("pug", position, MovementPolicy::PlayerInput)
    }

    /// Seeker that prefers vertical movement.
    pub fn roach(position: Position) -> Self {
        Self::new(
            "roach",
            position,
            MovementPolicy::seek().with_axis(AxisPreference::Vertical),
        )
    }

    /// Fleer that keeps its distance from the player.
    pub fn roach_mother(position: Position) -> Self {
        Self::new("roachMother", position, MovementPolicy::flee())
    }
}

/// Which generator builds the starting level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, strum::EnumString, strum::IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LevelKind {
    /// Fixed hand-made level with seeded terrain and a few random rocks.
    #[default]
    Template,
    /// Random rocks and random enemy placement.
    Scattered,
    /// No walls, uniform terrain, player only.
    Open,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LevelBlueprint {
    pub layout: LevelLayout,
    pub spawns: Vec<SpawnSpec>,
}

impl LevelBlueprint {
    pub fn generate(
        kind: LevelKind,
        config: &GameConfig,
        seed: u64,
        enemies: usize,
    ) -> Result<Self, LevelError> {
        match kind {
            LevelKind::Template => template(config, seed),
            LevelKind::Scattered => scattered(config, seed, enemies),
            LevelKind::Open => open(config),
        }
    }
}

const TEMPLATE_WALLS: [Position; 6] = [
    Position::new(7, 0),
    Position::new(8, 0),
    Position::new(9, 0),
    Position::new(7, 1),
    Position::new(9, 1),
    Position::new(7, 2),
];

const TEMPLATE_ROCKS: u32 = 5;
const NOISE_SCALE: f64 = 0.2;
const PLACEMENT_ATTEMPTS: u32 = 1_000;

/// The hand-made starting level: a wall cluster in the top-right corner the
/// pug can hide behind, five seeded rocks, two roaches and a roach mother.
pub fn template(config: &GameConfig, seed: u64) -> Result<LevelBlueprint, LevelError> {
    let (width, height) = (config.width, config.height);
    let spawns = vec![
        SpawnSpec::player(Position::new(1, 1)),
        SpawnSpec::roach(Position::new(2, 8)),
        SpawnSpec::roach(Position::new(7, 8)),
        SpawnSpec::roach_mother(Position::new(8, 2)),
    ];

    let mut obstacles = Layer::filled(width, height, GameConfig::OPEN);
    for wall in TEMPLATE_WALLS {
        obstacles.set(wall, GameConfig::WALL);
    }

    let mut rng = SeededStream::new(seed, context::LEVEL_OBSTACLES);
    let mut placed = 0;
    let mut attempts = 0;
    while placed < TEMPLATE_ROCKS {
        attempts += 1;
        if attempts > PLACEMENT_ATTEMPTS {
            return Err(LevelError::PlacementFailed {
                name: "rock".into(),
                attempts: PLACEMENT_ATTEMPTS,
            });
        }
        let cell = Position::new(rng.below(width) as i32, rng.below(height) as i32);
        let reserved = spawns.iter().any(|spawn| spawn.position == cell);
        let in_cluster = cell.x >= 7 && cell.y <= 2;
        if reserved || in_cluster || obstacles.get(cell) != Some(GameConfig::OPEN) {
            continue;
        }
        obstacles.set(cell, GameConfig::WALL);
        placed += 1;
    }

    let spawns = spawns
        .into_iter()
        .filter(|spawn| obstacles.contains(spawn.position))
        .collect();
    let layout = LevelLayout::new(width, height, terrain(width, height, seed), obstacles)?;
    Ok(LevelBlueprint { layout, spawns })
}

/// Random rocks (about one cell in ten) and `enemies` roaches placed at
/// least `min_spawn_distance` away from the player. Every third enemy is a
/// roach mother.
pub fn scattered(
    config: &GameConfig,
    seed: u64,
    enemies: usize,
) -> Result<LevelBlueprint, LevelError> {
    let (width, height) = (config.width, config.height);
    if width == 0 || height == 0 {
        return Err(LevelError::EmptyGrid { width, height });
    }

    let mut rng = SeededStream::new(seed, context::LEVEL_SPAWNS);
    let player = Position::new(rng.below(width) as i32, rng.below(height) as i32);

    let mut obstacles = Layer::filled(width, height, GameConfig::OPEN);
    let mut rocks = SeededStream::new(seed, context::LEVEL_OBSTACLES);
    for _ in 0..(width * height / 10) {
        let cell = Position::new(rocks.below(width) as i32, rocks.below(height) as i32);
        if cell != player {
            obstacles.set(cell, GameConfig::WALL);
        }
    }

    let mut spawns = vec![SpawnSpec::player(player)];
    for index in 0..enemies {
        let mut attempts = 0;
        let position = loop {
            attempts += 1;
            if attempts > PLACEMENT_ATTEMPTS {
                return Err(LevelError::PlacementFailed {
                    name: format!("enemy {index}"),
                    attempts: PLACEMENT_ATTEMPTS,
                });
            }
            let cell = Position::new(rng.below(width) as i32, rng.below(height) as i32);
            let free = obstacles.get(cell) == Some(GameConfig::OPEN)
                && spawns.iter().all(|spawn| spawn.position != cell);
            if free && cell.chebyshev(player) >= config.min_spawn_distance {
                break cell;
            }
        };
        let spawn = if index % 3 == 2 {
            SpawnSpec::roach_mother(position)
        } else {
            SpawnSpec::roach(position)
        };
        spawns.push(spawn);
    }

    let layout = LevelLayout::new(width, height, terrain(width, height, seed), obstacles)?;
    Ok(LevelBlueprint { layout, spawns })
}

/// Empty grid with the player in the top-left corner.
pub fn open(config: &GameConfig) -> Result<LevelBlueprint, LevelError> {
    let layout = LevelLayout::open(config.width, config.height)?;
    Ok(LevelBlueprint {
        layout,
        spawns: vec![SpawnSpec::player(Position::ORIGIN)],
    })
}

/// Grass shades from smoothed value noise so neighboring cells cluster.
pub fn terrain(width: u32, height: u32, seed: u64) -> Layer {
    let salt = SeededStream::new(seed, context::LEVEL_TERRAIN).next_u32() as i32;
    let mut layer = Layer::filled(width, height, GameConfig::TERRAIN_CODES[0]);
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let value = value_noise(f64::from(x) * NOISE_SCALE, f64::from(y) * NOISE_SCALE, salt);
            let code = if value < 0.33 {
                GameConfig::TERRAIN_CODES[0]
            } else if value < 0.66 {
                GameConfig::TERRAIN_CODES[1]
            } else {
                GameConfig::TERRAIN_CODES[2]
            };
            layer.set(Position::new(x, y), code);
        }
    }
    layer
}

/// Bilinear interpolation over a hashed integer lattice; output in `[0, 1)`.
fn value_noise(x: f64, y: f64, salt: i32) -> f64 {
    let (x0, y0) = (x.floor() as i32, y.floor() as i32);
    let (fx, fy) = (x - x.floor(), y - y.floor());
    let lerp = |a: f64, b: f64, t: f64| a + (b - a) * t;

    let top = lerp(lattice(x0, y0, salt), lattice(x0 + 1, y0, salt), fx);
    let bottom = lerp(lattice(x0, y0 + 1, salt), lattice(x0 + 1, y0 + 1, salt), fx);
    lerp(top, bottom, fy)
}

fn lattice(x: i32, y: i32, salt: i32) -> f64 {
    let n = x.wrapping_add(y.wrapping_mul(57)).wrapping_add(salt);
    let n = (n << 13) ^ n;
    let hashed = n
        .wrapping_mul(n.wrapping_mul(n).wrapping_mul(15731).wrapping_add(789_221))
        .wrapping_add(1_376_312_589)
        & 0x7fff_ffff;
    f64::from(hashed) / 2_147_483_648.0
}
