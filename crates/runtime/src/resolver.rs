//! Async driver for [`PendingTurn`].
//!
//! The player has moved once [`PendingTurn::begin`] returns. Batched
//! backends are then asked once each for all of their members; their
//! answers are parked and handed out as the members come up. Every enemy is
//! settled in movement order, awaiting its backend if it has one, so each
//! decision sees the moves settled before it.
//!
//! A backend that errors, times out or answers nonsense only costs its own
//! entities their move.
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use pug_core::{
    BackendId, Entity, EntityId, GameState, HistoryEntry, LevelLayout, PendingTurn, PlayerInput,
    Proposal, TurnError, TurnSummary,
};

use crate::api::{
    Backend, BackendError, BackendRegistry, BatchPolicyBackend, BatchRequest, DecisionRequest,
    PolicyBackend,
};
use crate::backends::{coerce_batch, coerce_reply};
use crate::events::{EventBus, StatusEvent};

/// What the resolver needs besides the state itself.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub layout: &'a LevelLayout,
    pub backends: &'a BackendRegistry,
    pub timeout: Duration,
    pub events: &'a EventBus,
}

impl ResolveContext<'_> {
    fn unavailable(&self, entity: EntityId, backend: &BackendId, reason: impl ToString) {
        let reason = reason.to_string();
        warn!(
            target: "runtime::resolver",
            entity = %entity,
            backend = %backend,
            %reason,
            "backend unavailable, entity stays"
        );
        self.events.publish(StatusEvent::BackendUnavailable {
            entity,
            backend: backend.to_string(),
            reason,
        });
    }

    fn malformed(&self, entity: EntityId, backend: &BackendId, reason: impl ToString) {
        let reason = reason.to_string();
        warn!(
            target: "runtime::resolver",
            entity = %entity,
            backend = %backend,
            %reason,
            "malformed backend reply, entity stays"
        );
        self.events.publish(StatusEvent::MalformedReply {
            entity,
            backend: backend.to_string(),
            reason,
        });
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, BackendError>>,
    ) -> Result<T, BackendError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(self.timeout)),
        }
    }

    async fn consult(
        &self,
        entity: EntityId,
        id: &BackendId,
        backend: &dyn PolicyBackend,
        request: DecisionRequest,
    ) -> Proposal {
        match self.bounded(backend.decide(&request)).await {
            Ok(reply) => coerce_reply(&request, reply).unwrap_or_else(|err| {
                self.malformed(entity, id, err);
                Proposal::Stay
            }),
            Err(err) => {
                self.unavailable(entity, id, err);
                Proposal::Stay
            }
        }
    }

    async fn consult_batch(
        &self,
        id: &BackendId,
        backend: &dyn BatchPolicyBackend,
        request: BatchRequest,
        planned: &mut HashMap<EntityId, Proposal>,
    ) {
        let members = request.members.iter().map(|member| member.id);
        match self.bounded(backend.decide_batch(&request)).await {
            Ok(reply) => match coerce_batch(&request, reply) {
                Ok(proposals) => planned.extend(members.zip(proposals)),
                Err(err) => members.for_each(|member| self.malformed(member, id, &err)),
            },
            Err(err) => members.for_each(|member| self.unavailable(member, id, &err)),
        }
    }
}

/// Batched backends and their members, grouped in first-member order.
fn batch_requests(
    pending: &PendingTurn<'_>,
    backends: &BackendRegistry,
) -> Vec<(BackendId, Arc<dyn BatchPolicyBackend>, BatchRequest)> {
    let mut groups: Vec<(BackendId, Arc<dyn BatchPolicyBackend>, Vec<&Entity>)> = Vec::new();
    for entity in pending.queued() {
        let Some(id) = entity.policy.backend() else {
            continue;
        };
        let Some(Backend::Batched(backend)) = backends.get(id) else {
            continue;
        };
        match groups.iter_mut().find(|(group, _, _)| group == id) {
            Some((_, _, members)) => members.push(entity),
            None => groups.push((id.clone(), Arc::clone(backend), vec![entity])),
        }
    }

    let view = pending.view();
    groups
        .into_iter()
        .map(|(id, backend, members)| {
            let request = BatchRequest::build(&view, members);
            (id, backend, request)
        })
        .collect()
}

/// Resolves one full turn, awaiting external backends in movement order.
///
/// Structural errors abort the turn before anything is mutated. On success
/// returns the summary and the history entry to push.
pub async fn resolve_turn(
    state: &mut GameState,
    input: PlayerInput,
    ctx: ResolveContext<'_>,
) -> Result<(TurnSummary, HistoryEntry), TurnError> {
    let mut pending = PendingTurn::begin(state, ctx.layout, input)?;
    debug!(
        target: "runtime::resolver",
        turn = pending.turn(),
        enemies = pending.remaining(),
        "player resolved"
    );

    let mut planned = HashMap::new();
    for (id, backend, request) in batch_requests(&pending, ctx.backends) {
        ctx.consult_batch(&id, backend.as_ref(), request, &mut planned)
            .await;
    }

    while let Some(enemy) = pending.next_enemy() {
        let proposal = match enemy.entity().policy.backend() {
            None => pending.decide_builtin(&enemy),
            Some(id) => match ctx.backends.get(id) {
                None => {
                    ctx.unavailable(enemy.id(), id, "no backend registered under this id");
                    Proposal::Stay
                }
                Some(Backend::Batched(_)) => planned.remove(&enemy.id()).unwrap_or_default(),
                Some(Backend::Single(backend)) => {
                    let request = DecisionRequest::build(&pending.view(), enemy.entity());
                    ctx.consult(enemy.id(), id, backend.as_ref(), request).await
                }
            },
        };

        let outcome = pending.settle(enemy, proposal);
        if let Some(rejection) = outcome.rejection {
            debug!(
                target: "runtime::resolver",
                entity = %outcome.id,
                %rejection,
                "proposal rejected, entity stays"
            );
        }
    }

    Ok(pending.commit())
}
