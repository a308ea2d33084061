/// Game configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameConfig {
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Maximum number of undo snapshots kept; `None` keeps every turn.
    pub history_capacity: Option<usize>,
    /// Minimum Chebyshev distance between the player and any enemy when
    /// enemies are placed randomly.
    pub min_spawn_distance: u32,
}

impl GameConfig {
    // ===== compile-time constants =====
    /// Obstacle-layer code for an impassable wall.
    pub const WALL: i32 = 92;
    /// Obstacle-layer code for an empty cell.
    pub const OPEN: i32 = 0;
    /// Terrain codes produced by the noise generator (grass shades).
    pub const TERRAIN_CODES: [i32; 3] = [1, 6, 12];

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_WIDTH: u32 = 10;
    pub const DEFAULT_HEIGHT: u32 = 10;
    pub const DEFAULT_MIN_SPAWN_DISTANCE: u32 = 3;
    /// Preferred cell for enemies spawned during play.
    pub const DEFAULT_SPAWN: (i32, i32) = (8, 8);

    pub fn new() -> Self {
        Self {
            width: Self::DEFAULT_WIDTH,
            height: Self::DEFAULT_HEIGHT,
            history_capacity: None,
            min_spawn_distance: Self::DEFAULT_MIN_SPAWN_DISTANCE,
        }
    }

    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::new()
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}
