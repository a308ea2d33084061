//! Movement policies.
//!
//! Every entity carries a [`MovementPolicy`]. Built-in policies are pure
//! functions of a [`WorldView`] and the mover; external policies are decided
//! outside the core and handed back as a [`Proposal`]. Either way the result
//! goes through [`validate`] before it can touch the committed state.
mod chase;
mod input;
mod proposal;
mod view;

pub use input::PlayerInput;
pub use proposal::{Proposal, Rejection, validate};
pub use view::WorldView;

use std::fmt;

use crate::state::{Direction, Entity, EntityId, EntityKind, Offset};

/// What a seek or flee policy reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Target {
    #[default]
    Player,
    Entity(EntityId),
}

/// Axis tried first when the diagonal is unavailable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AxisPreference {
    #[default]
    Vertical,
    Horizontal,
}

/// Offsets a policy may produce besides staying put.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MoveSet {
    Orthogonal,
    #[default]
    All,
    /// Pattern declared by a generated enemy. Entries that are not single
    /// steps are never allowed.
    Custom(Vec<Offset>),
}

impl MoveSet {
    /// Stay is always allowed; anything else must be a step in the set.
    pub fn allows(&self, offset: Offset) -> bool {
        if offset.is_stay() {
            return true;
        }
        if !offset.is_step() {
            return false;
        }
        match self {
            Self::Orthogonal => !offset.is_diagonal(),
            Self::All => true,
            Self::Custom(offsets) => offsets.contains(&offset),
        }
    }

    /// Directions permitted by this set, in [`Direction::ALL`] order.
    pub fn directions(&self) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|dir| self.allows(dir.offset()))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeekPolicy {
    pub target: Target,
    pub axis: AxisPreference,
    pub moves: MoveSet,
    pub flying: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FleePolicy {
    pub target: Target,
    pub moves: MoveSet,
    pub flying: bool,
}

/// Name under which an external backend is registered in the runtime.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BackendId(pub String);

impl BackendId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BackendId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BackendId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExternalPolicy {
    pub backend: BackendId,
    pub moves: MoveSet,
    pub flying: bool,
}

/// Closed set of movement behaviors.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MovementPolicy {
    PlayerInput,
    Seek(SeekPolicy),
    Flee(FleePolicy),
    External(ExternalPolicy),
}

impl MovementPolicy {
    pub fn seek() -> Self {
        Self::Seek(SeekPolicy::default())
    }

    pub fn flee() -> Self {
        Self::Flee(FleePolicy::default())
    }

    /// External policy restricted to orthogonal steps, the shape of the
    /// direction-word backends.
    pub fn external(backend: impl Into<BackendId>) -> Self {
        Self::External(ExternalPolicy {
            backend: backend.into(),
            moves: MoveSet::Orthogonal,
            flying: false,
        })
    }

    pub fn flying(mut self) -> Self {
        match &mut self {
            Self::PlayerInput => {}
            Self::Seek(policy) => policy.flying = true,
            Self::Flee(policy) => policy.flying = true,
            Self::External(policy) => policy.flying = true,
        }
        self
    }

    pub fn with_moves(mut self, moves: MoveSet) -> Self {
        match &mut self {
            Self::PlayerInput => {}
            Self::Seek(policy) => policy.moves = moves,
            Self::Flee(policy) => policy.moves = moves,
            Self::External(policy) => policy.moves = moves,
        }
        self
    }

    pub fn with_target(mut self, target: Target) -> Self {
        match &mut self {
            Self::Seek(policy) => policy.target = target,
            Self::Flee(policy) => policy.target = target,
            Self::PlayerInput | Self::External(_) => {}
        }
        self
    }

    pub fn with_axis(mut self, axis: AxisPreference) -> Self {
        if let Self::Seek(policy) = &mut self {
            policy.axis = axis;
        }
        self
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::PlayerInput => EntityKind::Player,
            Self::Seek(_) => EntityKind::Seeker,
            Self::Flee(_) => EntityKind::Fleer,
            Self::External(_) => EntityKind::External,
        }
    }

    pub fn is_flying(&self) -> bool {
        match self {
            Self::PlayerInput => false,
            Self::Seek(policy) => policy.flying,
            Self::Flee(policy) => policy.flying,
            Self::External(policy) => policy.flying,
        }
    }

    /// The player may use all eight directions.
    pub fn move_set(&self) -> &MoveSet {
        static ALL: MoveSet = MoveSet::All;
        match self {
            Self::PlayerInput => &ALL,
            Self::Seek(policy) => &policy.moves,
            Self::Flee(policy) => &policy.moves,
            Self::External(policy) => &policy.moves,
        }
    }

    pub fn backend(&self) -> Option<&BackendId> {
        match self {
            Self::External(policy) => Some(&policy.backend),
            _ => None,
        }
    }
}

/// Decides a built-in move for `mover`.
///
/// External policies are decided by the runtime and always stay here. The
/// player stays when no input is supplied.
pub fn decide(view: &WorldView<'_>, mover: &Entity, input: Option<&PlayerInput>) -> Proposal {
    match &mover.policy {
        MovementPolicy::PlayerInput => match input {
            Some(input) => input::decide(view, mover, input),
            None => Proposal::Stay,
        },
        MovementPolicy::Seek(policy) => chase::seek(view, mover, policy),
        MovementPolicy::Flee(policy) => chase::flee(view, mover, policy),
        MovementPolicy::External(_) => Proposal::Stay,
    }
}
