//! Immutable post-commit view for presentation layers.
use crate::grid::LevelLayout;
use crate::state::{Entity, EntityKind, GameState, Position};

/// What the render layer sees after a commit. Never built mid-turn.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderSnapshot {
    pub turn: u64,
    pub width: u32,
    pub height: u32,
    pub entities: Vec<Entity>,
    /// `cells[y][x]`: kind of the entity standing there.
    pub cells: Vec<Vec<Option<EntityKind>>>,
}

impl RenderSnapshot {
    pub fn capture(state: &GameState, layout: &LevelLayout) -> Self {
        let (width, height) = (layout.width(), layout.height());
        let mut cells = vec![vec![None; width as usize]; height as usize];
        for entity in state.entities() {
            if layout.contains(entity.position) {
                cells[entity.position.y as usize][entity.position.x as usize] = Some(entity.kind);
            }
        }
        Self {
            turn: state.turn,
            width,
            height,
            entities: state.entities().to_vec(),
            cells,
        }
    }

    pub fn kind_at(&self, position: Position) -> Option<EntityKind> {
        if position.x < 0 || position.y < 0 {
            return None;
        }
        self.cells
            .get(position.y as usize)
            .and_then(|row| row.get(position.x as usize))
            .copied()
            .flatten()
    }

    pub fn entity_at(&self, position: Position) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.position == position)
    }

    pub fn player(&self) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.is_player())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::SpawnSpec;

    #[test]
    fn cells_mirror_entity_positions() {
        let layout = LevelLayout::open(4, 3).unwrap();
        let mut state = GameState::new(0);
        state
            .spawn(&layout, SpawnSpec::player(Position::new(0, 2)))
            .unwrap();
        state
            .spawn(&layout, SpawnSpec::roach_mother(Position::new(3, 0)))
            .unwrap();

        let snapshot = RenderSnapshot::capture(&state, &layout);
        assert_eq!(snapshot.cells.len(), 3);
        assert_eq!(snapshot.cells[0].len(), 4);
        assert_eq!(snapshot.kind_at(Position::new(0, 2)), Some(EntityKind::Player));
        assert_eq!(snapshot.kind_at(Position::new(3, 0)), Some(EntityKind::Fleer));
        assert_eq!(snapshot.kind_at(Position::new(1, 1)), None);
        assert_eq!(snapshot.kind_at(Position::new(-1, 1)), None);
        assert_eq!(snapshot.player().map(|p| p.name.as_str()), Some("pug"));
    }
}
