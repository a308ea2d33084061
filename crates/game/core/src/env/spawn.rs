//! Turning a free-text "add enemy" request into something spawnable.
use crate::state::Position;

use super::level::SpawnSpec;

/// Name used when a generation request does not name its enemy.
pub const DEFAULT_GENERATED_NAME: &str = "CustomEnemy";

/// Classification of an add-enemy request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpawnRequest {
    Roach,
    RoachMother,
    /// "... called X" / "... named X": the description goes to the enemy
    /// generator and the enemy is registered under `name`.
    Generated { name: String, description: String },
}

impl SpawnRequest {
    /// Built-in spawn spec at `position`, or `None` for generated enemies.
    pub fn builtin_spec(&self, position: Position) -> Option<SpawnSpec> {
        match self {
            Self::Roach => Some(SpawnSpec::roach(position)),
            Self::RoachMother => Some(SpawnSpec::roach_mother(position)),
            Self::Generated { .. } => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Roach => "roach",
            Self::RoachMother => "roachMother",
            Self::Generated { name, .. } => name,
        }
    }
}

/// Naming an enemy asks for a generated one; otherwise any mention of
/// "mother" or "flee" gives a roach mother and everything else a roach.
pub fn classify_spawn_prompt(text: &str) -> SpawnRequest {
    if let Some(name) = extract_enemy_name(text) {
        return SpawnRequest::Generated {
            name,
            description: text.trim().to_owned(),
        };
    }
    let lowered = text.to_lowercase();
    if lowered.contains("mother") || lowered.contains("flee") {
        SpawnRequest::RoachMother
    } else {
        SpawnRequest::Roach
    }
}

/// Word following the first "called" or "named" (case-insensitive).
pub fn extract_enemy_name(text: &str) -> Option<String> {
    let mut words = text.split_whitespace();
    while let Some(word) = words.next() {
        let keyword = word.trim_matches(|c: char| !c.is_alphanumeric());
        if keyword.eq_ignore_ascii_case("called") || keyword.eq_ignore_ascii_case("named") {
            let name: String = words
                .next()?
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            return (!name.is_empty()).then_some(name);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mother_and_flee_make_a_fleer() {
        assert_eq!(classify_spawn_prompt("a roach MOTHER"), SpawnRequest::RoachMother);
        assert_eq!(classify_spawn_prompt("something that flees"), SpawnRequest::RoachMother);
        assert_eq!(classify_spawn_prompt("roach"), SpawnRequest::Roach);
        assert_eq!(classify_spawn_prompt(""), SpawnRequest::Roach);
    }

    #[test]
    fn named_requests_are_generated() {
        let request = classify_spawn_prompt("A beetle called Zig that zigzags");
        assert_eq!(
            request,
            SpawnRequest::Generated {
                name: "Zig".into(),
                description: "A beetle called Zig that zigzags".into(),
            }
        );
        assert_eq!(request.builtin_spec(Position::new(8, 8)), None);
    }

    #[test]
    fn name_extraction_stops_at_punctuation() {
        assert_eq!(extract_enemy_name("one Named Bob, please"), Some("Bob".into()));
        assert_eq!(extract_enemy_name("a thing called"), None);
        assert_eq!(extract_enemy_name("nothing here"), None);
    }
}
