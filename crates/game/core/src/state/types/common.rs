use std::fmt;

/// Unique identifier for any entity tracked in the state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(pub u32);

impl EntityId {
    /// Identifier given to the player by the level generators.
    ///
    /// Nothing relies on it: the player is found by kind, not by id.
    pub const PLAYER: Self = Self(1);
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Discrete grid position expressed in cell coordinates.
///
/// `y` grows downward, matching the rendered grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Applies an offset without any bounds handling.
    pub const fn offset(self, offset: Offset) -> Self {
        Self::new(self.x + offset.dx, self.y + offset.dy)
    }

    /// Offset that leads from `self` to `other`, saturating at the `i32`
    /// range so far-away targets still read as "not a step".
    pub const fn offset_to(self, other: Position) -> Offset {
        Offset::new(other.x.saturating_sub(self.x), other.y.saturating_sub(self.y))
    }

    /// Chebyshev (king-move) distance.
    pub fn chebyshev(self, other: Position) -> u32 {
        let dx = (i64::from(other.x) - i64::from(self.x)).unsigned_abs();
        let dy = (i64::from(other.y) - i64::from(self.y)).unsigned_abs();
        u32::try_from(dx.max(dy)).unwrap_or(u32::MAX)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Relative displacement between two cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
}

impl Offset {
    pub const STAY: Self = Self { dx: 0, dy: 0 };

    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// Reduces any vector to a single step by taking the sign of each axis.
    pub const fn signum(self) -> Self {
        Self::new(self.dx.signum(), self.dy.signum())
    }

    /// Negates both axes.
    pub const fn reversed(self) -> Self {
        Self::new(self.dx.saturating_neg(), self.dy.saturating_neg())
    }

    /// True when the offset moves at most one cell on each axis.
    pub const fn is_step(self) -> bool {
        self.dx.unsigned_abs() <= 1 && self.dy.unsigned_abs() <= 1
    }

    pub const fn is_stay(self) -> bool {
        self.dx == 0 && self.dy == 0
    }

    pub const fn is_diagonal(self) -> bool {
        self.dx != 0 && self.dy != 0
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:+}, {:+})", self.dx, self.dy)
    }
}

/// The eight compass steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "kebab-case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Direction {
    pub const ORTHOGONAL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub const ALL: [Direction; 8] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::UpLeft,
        Direction::UpRight,
        Direction::DownLeft,
        Direction::DownRight,
    ];

    pub const fn offset(self) -> Offset {
        match self {
            Direction::Up => Offset::new(0, -1),
            Direction::Down => Offset::new(0, 1),
            Direction::Left => Offset::new(-1, 0),
            Direction::Right => Offset::new(1, 0),
            Direction::UpLeft => Offset::new(-1, -1),
            Direction::UpRight => Offset::new(1, -1),
            Direction::DownLeft => Offset::new(-1, 1),
            Direction::DownRight => Offset::new(1, 1),
        }
    }

    /// Inverse of [`Direction::offset`]; `None` for stay and non-steps.
    pub fn from_offset(offset: Offset) -> Option<Self> {
        Self::ALL.into_iter().find(|dir| dir.offset() == offset)
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_offsets_round_trip() {
        for dir in Direction::ALL {
            assert_eq!(Direction::from_offset(dir.offset()), Some(dir));
        }
        assert_eq!(Direction::from_offset(Offset::STAY), None);
        assert_eq!(Direction::from_offset(Offset::new(2, 0)), None);
    }

    #[test]
    fn up_points_toward_row_zero() {
        assert_eq!(Position::new(3, 3).offset(Direction::Up.offset()), Position::new(3, 2));
    }

    #[test]
    fn signum_reduces_pointer_vectors() {
        assert_eq!(Offset::new(-7, 3).signum(), Offset::new(-1, 1));
        assert_eq!(Offset::new(0, -12).signum(), Offset::new(0, -1));
    }

    #[test]
    fn chebyshev_counts_king_moves() {
        assert_eq!(Position::new(1, 1).chebyshev(Position::new(8, 4)), 7);
        assert_eq!(Position::new(2, 2).chebyshev(Position::new(2, 2)), 0);
    }

    #[test]
    fn extreme_vectors_are_not_steps() {
        assert!(!Offset::new(i32::MIN, 0).is_step());
        assert!(!Offset::new(0, i32::MAX).is_step());

        let far = Position::new(3, 0).offset_to(Position::new(i32::MIN, 0));
        assert_eq!(far, Offset::new(i32::MIN, 0));
        assert_eq!(far.signum().reversed(), Offset::new(1, 0));
        assert_eq!(Position::new(i32::MAX, 0).chebyshev(Position::new(i32::MIN, 0)), u32::MAX);
    }

    #[test]
    fn direction_names_are_kebab_case() {
        assert_eq!(Direction::DownRight.as_str(), "down-right");
        assert_eq!(Direction::Up.as_str(), "up");
    }
}
