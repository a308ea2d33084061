use crate::state::{EntityId, EntityKind, Position};

/// Who claimed a cell during the current turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Occupant {
    pub id: EntityId,
    pub kind: EntityKind,
}

impl Occupant {
    pub const fn new(id: EntityId, kind: EntityKind) -> Self {
        Self { id, kind }
    }
}

/// Per-turn scratch layer tracking claimed cells.
///
/// Only the turn resolver mutates it; policies observe it through
/// [`crate::policy::WorldView::is_passable`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OccupancyGrid {
    width: u32,
    height: u32,
    cells: Vec<Option<Occupant>>,
}

impl OccupancyGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width as usize * height as usize],
        }
    }

    pub fn get(&self, position: Position) -> Option<Occupant> {
        self.index(position).and_then(|idx| self.cells[idx])
    }

    pub(crate) fn mark(&mut self, position: Position, occupant: Occupant) -> bool {
        let Some(idx) = self.index(position) else {
            return false;
        };
        match self.cells[idx] {
            Some(existing) if existing.id != occupant.id => false,
            _ => {
                self.cells[idx] = Some(occupant);
                true
            }
        }
    }

    pub(crate) fn clear(&mut self, position: Position) -> Option<Occupant> {
        self.index(position).and_then(|idx| self.cells[idx].take())
    }

    /// Number of claimed cells.
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    fn index(&self, position: Position) -> Option<usize> {
        let inside = position.x >= 0
            && position.y >= 0
            && position.x < self.width as i32
            && position.y < self.height as i32;
        inside.then(|| position.y as usize * self.width as usize + position.x as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claimant_is_refused() {
        let mut grid = OccupancyGrid::new(4, 4);
        let first = Occupant::new(EntityId(1), EntityKind::Player);
        let second = Occupant::new(EntityId(2), EntityKind::Seeker);

        assert!(grid.mark(Position::new(1, 2), first));
        assert!(!grid.mark(Position::new(1, 2), second));
        assert!(grid.mark(Position::new(1, 2), first));
        assert_eq!(grid.get(Position::new(1, 2)), Some(first));
        assert_eq!(grid.occupied_count(), 1);
    }

    #[test]
    fn out_of_range_cells_are_never_claimed() {
        let mut grid = OccupancyGrid::new(2, 2);
        let occupant = Occupant::new(EntityId(1), EntityKind::Player);
        assert!(!grid.mark(Position::new(2, 0), occupant));
        assert_eq!(grid.clear(Position::new(-1, 0)), None);
    }
}
