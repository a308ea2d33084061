//! Completion-model backends.
//!
//! The transport is abstracted behind [`CompletionClient`]; nothing here
//! knows about HTTP, model loading or tokens. Prompts only describe the
//! board, every reply goes through coercion and validation afterwards.
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;

use crate::api::{
    BackendError, BackendReply, BatchPolicyBackend, BatchRequest, DecisionRequest, PolicyBackend,
};

/// Black-box text completion.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, BackendError>;
}

/// Goal and behavioural hint for one kind of navigated entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Persona {
    pub goal: String,
    pub prompt: String,
}

impl Persona {
    pub fn new(goal: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            prompt: prompt.into(),
        }
    }

    pub fn roach() -> Self {
        Self::new(
            "You are a roach. You are hungry. You want to reach the player and eat them.",
            "You prefer vertical movement over horizontal movement.",
        )
    }

    pub fn roach_mother() -> Self {
        Self::new(
            "You want to flee the pug.",
            "You want to maximise the distance to the pug.",
        )
    }
}

const NAVIGATOR_SYSTEM: &str =
    "You are a navigator and must return a single direction from the allowed list.";

/// Asks a completion model for one direction word per entity.
///
/// The persona is picked by entity name; unknown names use the roach.
pub struct LlmNavigator {
    client: Arc<dyn CompletionClient>,
    personas: HashMap<String, Persona>,
    fallback: Persona,
}

impl LlmNavigator {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        let personas = HashMap::from([
            ("roach".to_owned(), Persona::roach()),
            ("roachMother".to_owned(), Persona::roach_mother()),
        ]);
        Self {
            client,
            personas,
            fallback: Persona::roach(),
        }
    }

    pub fn with_persona(mut self, name: impl Into<String>, persona: Persona) -> Self {
        self.personas.insert(name.into(), persona);
        self
    }

    fn persona(&self, name: &str) -> &Persona {
        self.personas.get(name).unwrap_or(&self.fallback)
    }

    fn prompt(&self, request: &DecisionRequest) -> String {
        let persona = self.persona(&request.name);
        let allowed: Vec<&str> = request.allowed.iter().map(|dir| dir.as_str()).collect();
        let mut prompt = format!("{}\n{}\n\n", persona.goal, persona.prompt);
        let _ = writeln!(prompt, "You are `@` at {}.", request.position);
        if let Some(player) = request.player {
            let _ = writeln!(prompt, "The pug `P` is at {player}.");
        }
        for other in &request.others {
            let _ = writeln!(
                prompt,
                "{} ({}) is at {}, offset {}.",
                other.name,
                other.kind.tag(),
                other.position,
                other.offset
            );
        }
        let _ = writeln!(prompt, "`#` cells are walls, `.` cells are free.\n");
        let _ = writeln!(prompt, "{}\n", request.grid);
        let _ = write!(
            prompt,
            "Allowed directions: {}. Answer with one of them, or `stay`.",
            allowed.join(", ")
        );
        prompt
    }
}

#[async_trait]
impl PolicyBackend for LlmNavigator {
    async fn decide(&self, request: &DecisionRequest) -> Result<BackendReply, BackendError> {
        let prompt = self.prompt(request);
        let text = self.client.complete(NAVIGATOR_SYSTEM, &prompt).await?;
        tracing::trace!(
            target: "runtime::backends",
            entity = %request.entity,
            reply = %text,
            "navigator replied"
        );
        Ok(BackendReply::Direction(text))
    }
}

fn describe_batch(request: &BatchRequest) -> String {
    let mut prompt = String::new();
    if let Some(player) = request.player {
        let _ = writeln!(prompt, "The pug `P` is at {player}.");
    }
    let _ = writeln!(prompt, "Grid ({}x{}):\n{}\n", request.width, request.height, request.grid);
    let _ = writeln!(prompt, "You control these units, in order:");
    for (index, member) in request.members.iter().enumerate() {
        let _ = writeln!(
            prompt,
            "{index}. {} `{}` at {}",
            member.name, member.token, member.position
        );
    }
    prompt
}

const FORMATION_SYSTEM: &str = "You coordinate a group of units on a grid. Reply with a JSON \
array holding one [dx, dy] pair per unit, in the order given. Each of dx and dy is -1, 0 or 1; \
y grows downward.";

/// Plans a whole group at once and replies with one offset per member.
pub struct FormationPlanner {
    client: Arc<dyn CompletionClient>,
    goal: String,
}

impl FormationPlanner {
    pub fn new(client: Arc<dyn CompletionClient>, goal: impl Into<String>) -> Self {
        Self {
            client,
            goal: goal.into(),
        }
    }
}

#[async_trait]
impl BatchPolicyBackend for FormationPlanner {
    async fn decide_batch(&self, request: &BatchRequest) -> Result<BackendReply, BackendError> {
        let prompt = format!("{}\n\n{}", self.goal, describe_batch(request));
        let text = self.client.complete(FORMATION_SYSTEM, &prompt).await?;
        Ok(BackendReply::Offsets(text))
    }
}

const GRID_SYSTEM: &str = "You coordinate a group of units on a grid. Reply with the grid \
after your units move, same size, same characters, nothing else. Each unit moves at most one \
cell in any direction; walls and other characters stay where they are.";

/// Plans a whole group at once and replies with a redrawn grid.
pub struct GridPlanner {
    client: Arc<dyn CompletionClient>,
    goal: String,
}

impl GridPlanner {
    pub fn new(client: Arc<dyn CompletionClient>, goal: impl Into<String>) -> Self {
        Self {
            client,
            goal: goal.into(),
        }
    }
}

#[async_trait]
impl BatchPolicyBackend for GridPlanner {
    async fn decide_batch(&self, request: &BatchRequest) -> Result<BackendReply, BackendError> {
        let prompt = format!("{}\n\n{}", self.goal, describe_batch(request));
        let text = self.client.complete(GRID_SYSTEM, &prompt).await?;
        Ok(BackendReply::Grid(text))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pug_core::{Direction, EntityId, Position};

    use super::*;

    #[derive(Default)]
    struct Recorder {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionClient for Recorder {
        async fn complete(&self, _system: &str, prompt: &str) -> Result<String, BackendError> {
            self.prompts.lock().unwrap().push(prompt.to_owned());
            Ok("Up".into())
        }
    }

    fn request(name: &str) -> DecisionRequest {
        DecisionRequest {
            turn: 3,
            entity: EntityId(4),
            name: name.into(),
            position: Position::new(2, 2),
            width: 3,
            height: 3,
            player: Some(Position::new(0, 0)),
            allowed: Direction::ORTHOGONAL.to_vec(),
            others: Vec::new(),
            blocked: Vec::new(),
            grid: "P..\n...\n..@".into(),
        }
    }

    #[tokio::test]
    async fn navigator_uses_the_persona_for_the_name() {
        let client = Arc::new(Recorder::default());
        let navigator = LlmNavigator::new(client.clone());

        let reply = navigator.decide(&request("roachMother")).await.unwrap();
        assert_eq!(reply, BackendReply::Direction("Up".into()));

        let prompts = client.prompts.lock().unwrap();
        assert!(prompts[0].starts_with("You want to flee the pug."));
        assert!(prompts[0].contains("Allowed directions: up, down, left, right"));
    }

    #[tokio::test]
    async fn unknown_names_fall_back_to_the_roach() {
        let client = Arc::new(Recorder::default());
        let navigator = LlmNavigator::new(client.clone());
        navigator.decide(&request("beetle")).await.unwrap();
        assert!(client.prompts.lock().unwrap()[0].contains("You are a roach."));
    }
}
