pub mod common;
pub mod entity;

// Re-export common types
pub use common::{Direction, EntityId, Offset, Position};

// Re-export entity types
pub use entity::{Entity, EntityKind};
