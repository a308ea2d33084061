//! Embedded Rhai scripts as movement policies.
//!
//! A script is the body of a `move` function. It sees the deciding entity as
//! `me`, the player as `player` (or `()`), every other entity in `entities`,
//! the grid size as `width`/`height`, and may call `is_valid(x, y)`. It
//! returns a position map `#{x, y}`, an offset map `#{dx, dy}`, a direction
//! string, or nothing to stay.
//!
//! Every run gets a fresh engine with an operation budget and runs on the
//! blocking pool, so a runaway script cannot stall the worker.
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use rhai::{AST, Array, Dynamic, Engine, EvalAltResult, Map, Scope};

use pug_core::{Offset, Position, Proposal};

use super::ScriptError;
use super::coerce::parse_direction_word;
use crate::api::{BackendError, BackendReply, DecisionRequest, PolicyBackend};

pub const DEFAULT_MAX_OPERATIONS: u64 = 50_000;

/// Rejects code that obviously stops mid-statement.
fn check_complete(code: &str) -> Result<(), ScriptError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ScriptError::Empty);
    }
    if let Some(index) = code.rfind("return") {
        let tail = code[index + "return".len()..].trim_start();
        let opens_map = tail.starts_with('{') || tail.starts_with("#{");
        if opens_map && !tail.contains('}') {
            return Err(ScriptError::Truncated("unclosed map after return"));
        }
    }
    match code.chars().last() {
        Some('=') => Err(ScriptError::Truncated("ends with `=`")),
        Some('(') => Err(ScriptError::Truncated("ends with `(`")),
        Some('{') => Err(ScriptError::Truncated("ends with `{`")),
        _ => Ok(()),
    }
}

fn position_map(position: Position) -> Map {
    let mut map = Map::new();
    map.insert("x".into(), Dynamic::from(i64::from(position.x)));
    map.insert("y".into(), Dynamic::from(i64::from(position.y)));
    map
}

fn proposal_from(result: Dynamic) -> Result<Proposal, ScriptError> {
    if result.is_unit() {
        return Ok(Proposal::Stay);
    }
    if result.is_string() {
        let text = result
            .into_string()
            .map_err(|kind| ScriptError::BadResult(kind.to_owned()))?;
        return parse_direction_word(&text)
            .map(Proposal::Step)
            .map_err(|err| ScriptError::BadResult(err.to_string()));
    }
    let type_name = result.type_name().to_owned();
    let Some(map) = result.try_cast::<Map>() else {
        return Err(ScriptError::BadResult(type_name));
    };
    let int = |key: &str| {
        map.get(key)
            .and_then(|value| value.as_int().ok())
            .map(|value| value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
    };
    if let (Some(x), Some(y)) = (int("x"), int("y")) {
        return Ok(Proposal::Target(Position::new(x, y)));
    }
    if let (Some(dx), Some(dy)) = (int("dx"), int("dy")) {
        return Ok(Proposal::Step(Offset::new(dx, dy)));
    }
    Err(ScriptError::BadResult(type_name))
}

/// A compiled script ready to decide for any number of entities.
#[derive(Clone)]
pub struct ScriptPolicy {
    name: String,
    source: Arc<str>,
    ast: Arc<AST>,
    max_operations: u64,
}

impl ScriptPolicy {
    /// Checks for truncation, then compiles.
    pub fn compile(
        name: impl Into<String>,
        source: &str,
        max_operations: u64,
    ) -> Result<Self, ScriptError> {
        check_complete(source)?;
        let ast = Engine::new()
            .compile(source)
            .map_err(|err| ScriptError::Compile(err.to_string()))?;
        Ok(Self {
            name: name.into(),
            source: Arc::from(source.trim()),
            ast: Arc::new(ast),
            max_operations,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Runs the script synchronously for one request.
    pub fn evaluate(&self, request: &DecisionRequest) -> Result<Proposal, ScriptError> {
        let mut engine = Engine::new();
        engine.set_max_operations(self.max_operations);

        let blocked: HashSet<Position> = request.blocked.iter().copied().collect();
        let (width, height) = (i64::from(request.width), i64::from(request.height));
        engine.register_fn("is_valid", move |x: i64, y: i64| {
            (0..width).contains(&x)
                && (0..height).contains(&y)
                && !blocked.contains(&Position::new(x as i32, y as i32))
        });

        let entities: Array = request
            .others
            .iter()
            .map(|other| {
                let mut map = position_map(other.position);
                map.insert("id".into(), Dynamic::from(i64::from(other.id.0)));
                map.insert("name".into(), Dynamic::from(other.name.clone()));
                map.insert("kind".into(), Dynamic::from(other.kind.tag().to_owned()));
                Dynamic::from_map(map)
            })
            .collect();

        let mut scope = Scope::new();
        scope.push("me", position_map(request.position));
        scope.push(
            "player",
            request
                .player
                .map_or(Dynamic::UNIT, |position| Dynamic::from_map(position_map(position))),
        );
        scope.push("entities", entities);
        scope.push("width", width);
        scope.push("height", height);

        let result = engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &self.ast)
            .map_err(|err| match *err {
                EvalAltResult::ErrorTooManyOperations(_) => ScriptError::Budget,
                other => ScriptError::Runtime(other.to_string()),
            })?;
        proposal_from(result)
    }
}

#[async_trait]
impl PolicyBackend for ScriptPolicy {
    async fn decide(&self, request: &DecisionRequest) -> Result<BackendReply, BackendError> {
        let policy = self.clone();
        let request = request.clone();
        let proposal = tokio::task::spawn_blocking(move || policy.evaluate(&request))
            .await
            .map_err(|err| BackendError::Join(err.to_string()))??;
        Ok(BackendReply::Proposal(proposal))
    }
}

#[cfg(test)]
mod tests {
    use pug_core::{Direction, EntityId};

    use super::*;

    fn request() -> DecisionRequest {
        DecisionRequest {
            turn: 0,
            entity: EntityId(2),
            name: "ghost".into(),
            position: Position::new(5, 5),
            width: 10,
            height: 10,
            player: Some(Position::new(1, 1)),
            allowed: Direction::ALL.to_vec(),
            others: Vec::new(),
            blocked: vec![Position::new(4, 4)],
            grid: String::new(),
        }
    }

    #[test]
    fn truncated_code_is_rejected_before_compiling() {
        for code in ["", "let x =", "if true {", "foo(", "return #{x: 1, y: "] {
            let err = ScriptPolicy::compile("bad", code, DEFAULT_MAX_OPERATIONS);
            assert!(
                matches!(err, Err(ScriptError::Empty | ScriptError::Truncated(_))),
                "{code:?} accepted"
            );
        }
    }

    #[test]
    fn syntax_errors_are_compile_errors() {
        let err = ScriptPolicy::compile("bad", "let = 3;", DEFAULT_MAX_OPERATIONS);
        assert!(matches!(err, Err(ScriptError::Compile(_))));
    }

    #[test]
    fn seeking_script_uses_is_valid() {
        let source = r#"
            let dx = sign(player.x - me.x);
            let dy = sign(player.y - me.y);
            if is_valid(me.x + dx, me.y + dy) {
                return #{x: me.x + dx, y: me.y + dy};
            }
            if is_valid(me.x, me.y + dy) {
                return #{x: me.x, y: me.y + dy};
            }
            me
        "#;
        let policy = ScriptPolicy::compile("seeker", source, DEFAULT_MAX_OPERATIONS).unwrap();
        // (4, 4) is blocked, so the vertical step wins.
        assert_eq!(
            policy.evaluate(&request()).unwrap(),
            Proposal::Target(Position::new(5, 4))
        );
    }

    #[test]
    fn results_of_every_shape_are_read() {
        let eval = |source: &str| {
            ScriptPolicy::compile("s", source, DEFAULT_MAX_OPERATIONS)
                .unwrap()
                .evaluate(&request())
        };
        assert_eq!(eval("\"left\""), Ok(Proposal::Step(Offset::new(-1, 0))));
        assert_eq!(eval("#{dx: 0, dy: 1}"), Ok(Proposal::Step(Offset::new(0, 1))));
        assert_eq!(eval("()"), Ok(Proposal::Stay));
        assert!(matches!(eval("42"), Err(ScriptError::BadResult(_))));
    }

    #[test]
    fn runaway_scripts_hit_the_budget() {
        let policy = ScriptPolicy::compile("spin", "loop { }", 1_000).unwrap();
        assert_eq!(policy.evaluate(&request()), Err(ScriptError::Budget));
    }

    #[tokio::test]
    async fn backend_reply_is_a_structured_proposal() {
        let policy = ScriptPolicy::compile("still", "()", DEFAULT_MAX_OPERATIONS).unwrap();
        let reply = policy.decide(&request()).await.unwrap();
        assert_eq!(reply, BackendReply::Proposal(Proposal::Stay));
    }
}
