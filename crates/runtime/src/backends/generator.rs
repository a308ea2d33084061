//! Natural-language enemy generation.
use std::sync::Arc;
use std::time::Duration;

use pug_core::env::DEFAULT_GENERATED_NAME;
use pug_core::extract_enemy_name;

use super::coerce::strip_fences;
use super::llm::CompletionClient;
use super::{GenerationError, ScriptPolicy};

const GENERATOR_SYSTEM: &str = r#"You write movement scripts for enemies in a turn-based grid game.
The script is Rhai code: the body of a function that runs once per turn for one enemy,
after the player has moved.

AVAILABLE VALUES:
- me: #{x, y}, the enemy's position
- player: #{x, y}, the pug's position, or () if there is none
- entities: array of #{id, name, kind, x, y} for every other character
- width, height: grid size; y grows downward
- is_valid(x, y): true when the cell is inside the grid, not a wall and empty

RETURN one of:
- #{x: .., y: ..} a cell next to me (diagonals allowed)
- #{dx: .., dy: ..} an offset of at most one step
- "up", "down", "left", "right", "up-left", ... a direction
- me, to stay

EXAMPLE (seek the pug, prefer vertical moves when the diagonal is blocked):
if player == () { return me; }
let dx = sign(player.x - me.x);
let dy = sign(player.y - me.y);
if is_valid(me.x + dx, me.y + dy) { return #{x: me.x + dx, y: me.y + dy}; }
if dy != 0 && is_valid(me.x, me.y + dy) { return #{x: me.x, y: me.y + dy}; }
if dx != 0 && is_valid(me.x + dx, me.y) { return #{x: me.x + dx, y: me.y}; }
me

Reply with the script body only. Keep it short. No function declaration, no markdown."#;

/// Upper bound on one code-generation request.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(20);

/// A described enemy, compiled and ready to spawn.
#[derive(Clone)]
pub struct GeneratedEnemy {
    pub name: String,
    pub description: String,
    pub policy: ScriptPolicy,
}

/// Turns descriptions into [`ScriptPolicy`] backends through a completion
/// model.
#[derive(Clone)]
pub struct EnemyGenerator {
    client: Arc<dyn CompletionClient>,
    max_operations: u64,
    timeout: Duration,
}

impl EnemyGenerator {
    pub fn new(client: Arc<dyn CompletionClient>, max_operations: u64) -> Self {
        Self {
            client,
            max_operations,
            timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Asks for code, strips fences, rejects truncated or uncompilable code.
    pub async fn generate(&self, description: &str) -> Result<GeneratedEnemy, GenerationError> {
        let name = extract_enemy_name(description)
            .unwrap_or_else(|| DEFAULT_GENERATED_NAME.to_owned());
        let prompt = format!(
            "{description}\n\nWrite the movement script for this enemy. Remember: only the \
             script body, no function declaration, no markdown."
        );

        let completion = self.client.complete(GENERATOR_SYSTEM, &prompt);
        let raw = tokio::time::timeout(self.timeout, completion)
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))?
            .map_err(|err| GenerationError::Completion(err.to_string()))?;
        let source = strip_fences(&raw);
        tracing::debug!(
            target: "runtime::generator",
            enemy = %name,
            bytes = source.len(),
            "received enemy script"
        );

        let policy = ScriptPolicy::compile(name.clone(), source, self.max_operations)?;
        Ok(GeneratedEnemy {
            name,
            description: description.to_owned(),
            policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pug_core::{Direction, EntityId, Position, Proposal};

    use super::*;
    use crate::api::{BackendError, DecisionRequest};
    use crate::backends::ScriptError;

    struct Canned(&'static str);

    #[async_trait]
    impl CompletionClient for Canned {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, BackendError> {
            Ok(self.0.to_owned())
        }
    }

    struct Offline;

    struct Silent;

    #[async_trait]
    impl CompletionClient for Silent {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, BackendError> {
            std::future::pending().await
        }
    }

    #[async_trait]
    impl CompletionClient for Offline {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, BackendError> {
            Err(BackendError::Unavailable("offline".into()))
        }
    }

    fn generator(reply: &'static str) -> EnemyGenerator {
        EnemyGenerator::new(Arc::new(Canned(reply)), 10_000)
    }

    #[tokio::test]
    async fn fenced_code_is_cleaned_and_compiled() {
        let enemy = generator("```rhai\n#{dx: 1, dy: 0}\n```")
            .generate("a crab called Pinchy that walks right")
            .await
            .unwrap();
        assert_eq!(enemy.name, "Pinchy");
        assert_eq!(enemy.policy.source(), "#{dx: 1, dy: 0}");

        let request = DecisionRequest {
            turn: 0,
            entity: EntityId(5),
            name: enemy.name.clone(),
            position: Position::new(1, 1),
            width: 4,
            height: 4,
            player: None,
            allowed: Direction::ALL.to_vec(),
            others: Vec::new(),
            blocked: Vec::new(),
            grid: String::new(),
        };
        assert_eq!(
            enemy.policy.evaluate(&request),
            Ok(Proposal::Step(pug_core::Offset::new(1, 0)))
        );
    }

    #[tokio::test]
    async fn unnamed_enemies_get_the_default_name() {
        let enemy = generator("me").generate("something spooky").await.unwrap();
        assert_eq!(enemy.name, "CustomEnemy");
    }

    #[tokio::test]
    async fn truncated_replies_are_rejected() {
        let err = generator("let dx = sign(player.x - me.x);\nreturn #{x: me.x + dx,")
            .generate("a beetle named Bob")
            .await;
        assert!(matches!(
            err,
            Err(GenerationError::Script(ScriptError::Truncated(_)))
        ));
    }

    #[tokio::test]
    async fn completion_failures_are_reported() {
        let err = EnemyGenerator::new(Arc::new(Offline), 10_000)
            .generate("a moth")
            .await;
        assert!(matches!(err, Err(GenerationError::Completion(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_completion_times_out() {
        let timeout = Duration::from_secs(3);
        let err = EnemyGenerator::new(Arc::new(Silent), 10_000)
            .with_timeout(timeout)
            .generate("a ghost called Boo")
            .await;
        assert!(matches!(err, Err(GenerationError::Timeout(waited)) if waited == timeout));
    }
}
