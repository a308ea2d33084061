use std::sync::Arc;

use async_trait::async_trait;

use pug_core::Proposal;

use crate::api::{BackendError, BackendReply, DecisionRequest, PolicyBackend};

type DecideFn = dyn Fn(&DecisionRequest) -> Proposal + Send + Sync;

/// A host closure used as a movement backend.
///
/// Handy for tests and for compiled-in behaviours that still want to go
/// through the external contract.
#[derive(Clone)]
pub struct FnPolicy {
    decide: Arc<DecideFn>,
}

impl FnPolicy {
    pub fn new(decide: impl Fn(&DecisionRequest) -> Proposal + Send + Sync + 'static) -> Self {
        Self {
            decide: Arc::new(decide),
        }
    }
}

#[async_trait]
impl PolicyBackend for FnPolicy {
    async fn decide(&self, request: &DecisionRequest) -> Result<BackendReply, BackendError> {
        Ok(BackendReply::Proposal((self.decide)(request)))
    }
}
