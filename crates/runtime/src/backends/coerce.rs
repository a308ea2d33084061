//! Turning free-form backend replies into proposals.
//!
//! Coercion is lenient about shape and strict about meaning: anything that
//! cannot be read becomes an error (and the entity stays), while readable
//! but illegal values such as `[2, 0]` pass through untouched so the core
//! validator rejects them with a precise reason.
use std::collections::HashSet;

use serde_json::Value;

use pug_core::{Direction, Offset, Position, Proposal};

use super::CoerceError;
use crate::api::backend::SELF_TOKEN;
use crate::api::{BackendReply, BatchRequest, DecisionRequest};

const STAY_WORDS: [&str; 6] = ["stay", "wait", "none", "skip", "hold", "still"];

fn vertical(word: &str) -> Option<i32> {
    match word {
        "up" | "north" => Some(-1),
        "down" | "south" => Some(1),
        _ => None,
    }
}

fn horizontal(word: &str) -> Option<i32> {
    match word {
        "left" | "west" => Some(-1),
        "right" | "east" => Some(1),
        _ => None,
    }
}

/// Reads one word, including glued compounds such as `upleft` or
/// `northeast`.
fn word_offset(word: &str) -> Option<Offset> {
    if STAY_WORDS.contains(&word) {
        return Some(Offset::STAY);
    }
    if let Some(dy) = vertical(word) {
        return Some(Offset::new(0, dy));
    }
    if let Some(dx) = horizontal(word) {
        return Some(Offset::new(dx, 0));
    }
    ["up", "north", "down", "south"].into_iter().find_map(|prefix| {
        let rest = word.strip_prefix(prefix)?;
        Some(Offset::new(horizontal(rest)?, vertical(prefix)?))
    })
}

/// Finds the first direction word in `text`.
///
/// A vertical word directly followed by a horizontal one (`up left`,
/// `down-right`) reads as the diagonal. Stay words map to
/// [`Offset::STAY`].
pub fn parse_direction_word(text: &str) -> Result<Offset, CoerceError> {
    let lowered = text.to_ascii_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|word| !word.is_empty())
        .collect();

    for (index, word) in words.iter().enumerate() {
        let Some(offset) = word_offset(word) else {
            continue;
        };
        if offset.dx == 0
            && offset.dy != 0
            && let Some(dx) = words.get(index + 1).and_then(|next| horizontal(next))
        {
            return Ok(Offset::new(dx, offset.dy));
        }
        return Ok(offset);
    }
    Err(CoerceError::NoDirection(text.trim().to_owned()))
}

/// Removes a surrounding markdown code fence, if any.
pub fn strip_fences(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        body = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest,
        };
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Floors a JSON number. Non-numeric and non-finite values yield `None`.
fn component(value: &Value) -> Option<i32> {
    let number = value.as_f64()?;
    number.is_finite().then(|| number.floor() as i32)
}

fn is_scalar(value: &Value) -> bool {
    !(value.is_array() || value.is_object() || value.is_string())
}

fn pair(value: &Value) -> Option<(&Value, &Value)> {
    match value {
        Value::Array(items) if items.len() == 2 && items.iter().all(is_scalar) => {
            Some((&items[0], &items[1]))
        }
        Value::Object(map) => match (map.get("dx"), map.get("dy")) {
            (Some(dx), Some(dy)) => Some((dx, dy)),
            _ => Some((map.get("x")?, map.get("y")?)),
        },
        _ => None,
    }
}

/// One offset from a JSON value; unreadable entries are "stay".
fn value_offset(value: &Value) -> Offset {
    if let Value::String(word) = value {
        return parse_direction_word(word).unwrap_or(Offset::STAY);
    }
    match pair(value) {
        Some((dx, dy)) => match (component(dx), component(dy)) {
            (Some(dx), Some(dy)) => Offset::new(dx, dy),
            _ => Offset::STAY,
        },
        None => Offset::STAY,
    }
}

fn value_offsets(value: &Value) -> Option<Vec<Offset>> {
    if let Value::Object(map) = value
        && let Some(inner) = map.get("moves").or_else(|| map.get("offsets"))
    {
        return value_offsets(inner);
    }
    if pair(value).is_some() || value.is_string() {
        return Some(vec![value_offset(value)]);
    }
    match value {
        Value::Array(items) => Some(items.iter().map(value_offset).collect()),
        _ => None,
    }
}

/// Reads structured offsets: `[dx, dy]`, `[[dx, dy], ...]`, `{"dx", "dy"}`,
/// `{"x", "y"}`, `{"moves": [...]}` or direction strings, optionally wrapped
/// in prose or a code fence.
pub fn parse_offsets(text: &str) -> Result<Vec<Offset>, CoerceError> {
    let body = strip_fences(text);
    let value = serde_json::from_str::<Value>(body).ok().or_else(|| {
        let start = body.find(['[', '{'])?;
        let end = body.rfind([']', '}'])?;
        (start < end)
            .then(|| serde_json::from_str::<Value>(&body[start..=end]).ok())
            .flatten()
    });
    value
        .as_ref()
        .and_then(value_offsets)
        .ok_or_else(|| CoerceError::NotOffsets(body.to_owned()))
}

fn parse_grid(text: &str, width: u32, height: u32) -> Result<Vec<Vec<char>>, CoerceError> {
    let rows: Vec<Vec<char>> = strip_fences(text)
        .lines()
        .map(|line| line.chars().filter(|c| !c.is_whitespace()).collect::<Vec<_>>())
        .filter(|row| !row.is_empty())
        .collect();
    let found_width = rows.first().map_or(0, Vec::len) as u32;
    if rows.len() as u32 != height || rows.iter().any(|row| row.len() as u32 != width) {
        return Err(CoerceError::GridShape {
            width,
            height,
            found_width,
            found_height: rows.len() as u32,
        });
    }
    Ok(rows)
}

fn token_at(rows: &[Vec<char>], position: Position) -> Option<char> {
    if position.x < 0 || position.y < 0 {
        return None;
    }
    rows.get(position.y as usize)?
        .get(position.x as usize)
        .copied()
}

/// Maps a replacement grid back to one offset per member.
///
/// Members are matched in order: a member whose own cell still shows its
/// token stays; otherwise it takes the first unclaimed cell with its token
/// within one step, in [`Direction::ALL`] order. A member with no match
/// stays.
pub fn infer_from_grid(request: &BatchRequest, text: &str) -> Result<Vec<Offset>, CoerceError> {
    let rows = parse_grid(text, request.width, request.height)?;
    let mut claimed = HashSet::new();

    let offsets = request
        .members
        .iter()
        .map(|member| {
            let candidates = std::iter::once(Offset::STAY)
                .chain(Direction::ALL.into_iter().map(Direction::offset));
            for offset in candidates {
                let cell = member.position.offset(offset);
                if token_at(&rows, cell) == Some(member.token) && claimed.insert(cell) {
                    return offset;
                }
            }
            Offset::STAY
        })
        .collect();
    Ok(offsets)
}

/// Coerces a per-entity reply into one proposal.
pub fn coerce_reply(
    request: &DecisionRequest,
    reply: BackendReply,
) -> Result<Proposal, CoerceError> {
    match reply {
        BackendReply::Proposal(proposal) => Ok(proposal),
        BackendReply::Direction(text) => parse_direction_word(&text).map(Proposal::Step),
        BackendReply::Offsets(text) => {
            let offsets = parse_offsets(&text)?;
            Ok(Proposal::Step(offsets.first().copied().unwrap_or(Offset::STAY)))
        }
        BackendReply::Grid(text) => {
            let rows = parse_grid(&text, request.width, request.height)?;
            rows.iter()
                .enumerate()
                .find_map(|(y, row)| {
                    let x = row.iter().position(|&c| c == SELF_TOKEN)?;
                    Some(Proposal::Target(Position::new(x as i32, y as i32)))
                })
                .ok_or(CoerceError::MissingSelf)
        }
    }
}

/// Coerces a batched reply into one proposal per member, in member order.
///
/// Missing entries are "stay"; surplus entries are ignored.
pub fn coerce_batch(
    request: &BatchRequest,
    reply: BackendReply,
) -> Result<Vec<Proposal>, CoerceError> {
    let count = request.members.len();
    let offsets = match reply {
        BackendReply::Proposal(proposal) => return Ok(vec![proposal; count]),
        BackendReply::Direction(text) => vec![parse_direction_word(&text)?; count],
        BackendReply::Offsets(text) => parse_offsets(&text)?,
        BackendReply::Grid(text) => infer_from_grid(request, &text)?,
    };
    Ok((0..count)
        .map(|index| Proposal::Step(offsets.get(index).copied().unwrap_or(Offset::STAY)))
        .collect())
}

#[cfg(test)]
mod tests {
    use pug_core::EntityId;

    use super::*;
    use crate::api::BatchMember;

    fn batch(members: &[(u32, i32, i32)]) -> BatchRequest {
        BatchRequest {
            turn: 0,
            width: 4,
            height: 3,
            player: None,
            members: members
                .iter()
                .map(|&(id, x, y)| BatchMember {
                    id: EntityId(id),
                    name: "ant".into(),
                    position: Position::new(x, y),
                    token: 'E',
                })
                .collect(),
            grid: String::new(),
        }
    }

    #[test]
    fn direction_words_are_found_in_prose() {
        assert_eq!(parse_direction_word("I will go UP."), Ok(Offset::new(0, -1)));
        assert_eq!(parse_direction_word("Direction: left"), Ok(Offset::new(-1, 0)));
        assert_eq!(parse_direction_word("down-right"), Ok(Offset::new(1, 1)));
        assert_eq!(parse_direction_word("northwest"), Ok(Offset::new(-1, -1)));
        assert_eq!(parse_direction_word("up left"), Ok(Offset::new(-1, -1)));
        assert_eq!(parse_direction_word("I'll wait here"), Ok(Offset::STAY));
    }

    #[test]
    fn text_without_direction_is_an_error() {
        assert!(matches!(
            parse_direction_word("banana"),
            Err(CoerceError::NoDirection(_))
        ));
        // "upward" is not a compound of known words
        assert!(parse_direction_word("upward").is_err());
    }

    #[test]
    fn fences_are_stripped() {
        assert_eq!(strip_fences("```json\n[1, 0]\n```"), "[1, 0]");
        assert_eq!(strip_fences("  [1, 0]  "), "[1, 0]");
    }

    #[test]
    fn offsets_accept_several_shapes() {
        assert_eq!(parse_offsets("[1, -1]"), Ok(vec![Offset::new(1, -1)]));
        assert_eq!(
            parse_offsets("[[1, 0], [0, 1]]"),
            Ok(vec![Offset::new(1, 0), Offset::new(0, 1)])
        );
        assert_eq!(parse_offsets(r#"{"dx": -1, "dy": 0}"#), Ok(vec![Offset::new(-1, 0)]));
        assert_eq!(
            parse_offsets(r#"{"moves": [{"x": 0, "y": 1}, "left"]}"#),
            Ok(vec![Offset::new(0, 1), Offset::new(-1, 0)])
        );
        assert_eq!(
            parse_offsets("Sure! Here you go: [[0, -1]] hope it helps"),
            Ok(vec![Offset::new(0, -1)])
        );
    }

    #[test]
    fn unreadable_entries_become_stay_and_big_ones_pass_through() {
        assert_eq!(
            parse_offsets(r#"[["a", 1], [2.7, -0.5], [null, 0]]"#),
            Ok(vec![Offset::STAY, Offset::new(2, -1), Offset::STAY])
        );
        assert!(parse_offsets("no json here").is_err());
    }

    #[test]
    fn grid_replies_are_mapped_back_in_member_order() {
        let request = batch(&[(2, 0, 0), (3, 1, 0)]);
        // Both members slide one row down.
        let grid = "....\nEE..\n....";
        assert_eq!(
            infer_from_grid(&request, grid),
            Ok(vec![Offset::new(0, 1), Offset::new(0, 1)])
        );
    }

    #[test]
    fn grid_tokens_are_claimed_once() {
        let request = batch(&[(2, 0, 0), (3, 2, 0)]);
        // Only one token left, adjacent to both members.
        let grid = ".E..\n....\n....";
        assert_eq!(
            infer_from_grid(&request, grid),
            Ok(vec![Offset::new(1, 0), Offset::STAY])
        );
    }

    #[test]
    fn grid_shape_mismatch_is_an_error() {
        let request = batch(&[(2, 0, 0)]);
        assert!(matches!(
            infer_from_grid(&request, "E...\n...."),
            Err(CoerceError::GridShape { .. })
        ));
    }

    #[test]
    fn short_batches_are_padded_with_stay() {
        let request = batch(&[(2, 0, 0), (3, 1, 0), (4, 2, 0)]);
        let proposals = coerce_batch(&request, BackendReply::Offsets("[[0, 1]]".into())).unwrap();
        assert_eq!(
            proposals,
            vec![
                Proposal::Step(Offset::new(0, 1)),
                Proposal::Step(Offset::STAY),
                Proposal::Step(Offset::STAY),
            ]
        );
    }
}
