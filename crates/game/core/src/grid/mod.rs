//! Grid model: static level layers plus the per-turn occupancy layer.
//!
//! [`LevelLayout`] holds the two layers produced by level generation
//! (terrain and obstacles) and never changes for the lifetime of a level.
//! [`OccupancyGrid`] is rebuilt at the start of every turn and mutated by the
//! resolver as each entity's move is settled. [`GridModel`] pairs the two and
//! answers the only question policies care about: can this cell be entered?
mod occupancy;

pub use occupancy::{Occupant, OccupancyGrid};

use crate::config::GameConfig;
use crate::state::Position;

/// Errors raised while building a level.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LevelError {
    #[error("grid must be at least 1x1 (got {width}x{height})")]
    EmptyGrid { width: u32, height: u32 },

    #[error("{layer} layer has {actual} cells, expected {expected}")]
    DimensionMismatch {
        layer: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("could not place {name} after {attempts} attempts")]
    PlacementFailed { name: String, attempts: u32 },
}

impl crate::error::GameError for LevelError {
    fn severity(&self) -> crate::error::ErrorSeverity {
        crate::error::ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyGrid { .. } => "LEVEL_EMPTY_GRID",
            Self::DimensionMismatch { .. } => "LEVEL_DIMENSION_MISMATCH",
            Self::PlacementFailed { .. } => "LEVEL_PLACEMENT_FAILED",
        }
    }
}

/// A dense `width × height` layer of integer codes, stored row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Layer {
    width: u32,
    height: u32,
    cells: Vec<i32>,
}

impl Layer {
    /// Layer filled with a single code.
    pub fn filled(width: u32, height: u32, code: i32) -> Self {
        Self {
            width,
            height,
            cells: vec![code; width as usize * height as usize],
        }
    }

    /// Builds a layer from rows (`rows[y][x]`).
    pub fn from_rows(rows: &[Vec<i32>]) -> Result<Self, LevelError> {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |row| row.len() as u32);
        if width == 0 || height == 0 {
            return Err(LevelError::EmptyGrid { width, height });
        }
        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for row in rows {
            if row.len() != width as usize {
                return Err(LevelError::DimensionMismatch {
                    layer: "row",
                    expected: width as usize,
                    actual: row.len(),
                });
            }
            cells.extend_from_slice(row);
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn contains(&self, position: Position) -> bool {
        position.x >= 0
            && position.y >= 0
            && position.x < self.width as i32
            && position.y < self.height as i32
    }

    pub fn get(&self, position: Position) -> Option<i32> {
        self.index(position).map(|idx| self.cells[idx])
    }

    pub fn set(&mut self, position: Position, code: i32) -> bool {
        match self.index(position) {
            Some(idx) => {
                self.cells[idx] = code;
                true
            }
            None => false,
        }
    }

    /// Iterates rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[i32]> {
        self.cells.chunks(self.width.max(1) as usize)
    }

    fn index(&self, position: Position) -> Option<usize> {
        self.contains(position)
            .then(|| position.y as usize * self.width as usize + position.x as usize)
    }
}

/// Immutable per-level layout: terrain (layer 0) and obstacles (layer 1).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LevelLayout {
    width: u32,
    height: u32,
    terrain: Layer,
    obstacles: Layer,
}

impl LevelLayout {
    pub fn new(
        width: u32,
        height: u32,
        terrain: Layer,
        obstacles: Layer,
    ) -> Result<Self, LevelError> {
        if width == 0 || height == 0 {
            return Err(LevelError::EmptyGrid { width, height });
        }
        let expected = width as usize * height as usize;
        for (name, layer) in [("terrain", &terrain), ("obstacle", &obstacles)] {
            if layer.width != width || layer.height != height {
                return Err(LevelError::DimensionMismatch {
                    layer: name,
                    expected,
                    actual: layer.cells.len(),
                });
            }
        }
        Ok(Self {
            width,
            height,
            terrain,
            obstacles,
        })
    }

    /// Plain layout with uniform terrain and no walls.
    pub fn open(width: u32, height: u32) -> Result<Self, LevelError> {
        Self::new(
            width,
            height,
            Layer::filled(width, height, GameConfig::TERRAIN_CODES[0]),
            Layer::filled(width, height, GameConfig::OPEN),
        )
    }

    /// Returns a copy with walls placed at the given cells (out-of-range cells are ignored).
    pub fn with_walls(mut self, walls: &[Position]) -> Self {
        for &wall in walls {
            self.obstacles.set(wall, GameConfig::WALL);
        }
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn terrain(&self) -> &Layer {
        &self.terrain
    }

    pub fn obstacles(&self) -> &Layer {
        &self.obstacles
    }

    pub fn contains(&self, position: Position) -> bool {
        self.terrain.contains(position)
    }

    /// True when the obstacle layer marks the cell as a wall.
    pub fn is_wall(&self, position: Position) -> bool {
        self.obstacles.get(position) == Some(GameConfig::WALL)
    }

    /// Clamps a position into the grid.
    pub fn clamp(&self, position: Position) -> Position {
        Position::new(
            position.x.clamp(0, self.width as i32 - 1),
            position.y.clamp(0, self.height as i32 - 1),
        )
    }
}

/// Level layout paired with the live occupancy of the turn being resolved.
#[derive(Clone, Debug)]
pub struct GridModel<'a> {
    layout: &'a LevelLayout,
    occupancy: OccupancyGrid,
}

impl<'a> GridModel<'a> {
    /// Creates a model with an empty occupancy layer.
    pub fn new(layout: &'a LevelLayout) -> Self {
        Self {
            layout,
            occupancy: OccupancyGrid::new(layout.width(), layout.height()),
        }
    }

    pub fn layout(&self) -> &'a LevelLayout {
        self.layout
    }

    pub fn occupancy(&self) -> &OccupancyGrid {
        &self.occupancy
    }

    /// Bounds check, then wall check (skipped for flyers), then occupancy check.
    pub fn is_passable(&self, position: Position, ignore_walls: bool) -> bool {
        self.layout.contains(position)
            && (ignore_walls || !self.layout.is_wall(position))
            && self.occupancy.get(position).is_none()
    }

    /// Claims a cell. Returns false when the cell is outside the grid or
    /// already claimed by someone else.
    pub fn mark_occupied(&mut self, position: Position, occupant: Occupant) -> bool {
        self.occupancy.mark(position, occupant)
    }

    /// Releases a cell and returns its previous occupant.
    pub fn clear_occupied(&mut self, position: Position) -> Option<Occupant> {
        self.occupancy.clear(position)
    }
}
