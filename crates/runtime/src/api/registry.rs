//! Registry of external movement backends.
//!
//! Entities name their backend through [`pug_core::BackendId`]; the registry
//! maps that id to either a per-entity or a batched implementation. An id
//! with no registered backend is not an error: the entity simply stays.

use std::collections::HashMap;
use std::sync::Arc;

use pug_core::BackendId;

use super::{BatchPolicyBackend, PolicyBackend};

/// A registered backend instance.
#[derive(Clone)]
pub enum Backend {
    /// Consulted once per entity, in movement order.
    Single(Arc<dyn PolicyBackend>),
    /// Consulted once per turn for all of its entities.
    Batched(Arc<dyn BatchPolicyBackend>),
}

impl Backend {
    pub fn is_batched(&self) -> bool {
        matches!(self, Self::Batched(_))
    }
}

/// Backend instances by id, shared across entities.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<BackendId, Backend>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a per-entity backend.
    ///
    /// If a backend already exists for this id, it will be replaced.
    pub fn register_single(
        &mut self,
        id: impl Into<BackendId>,
        backend: impl PolicyBackend + 'static,
    ) {
        self.register_shared(id, Backend::Single(Arc::new(backend)));
    }

    /// Register a batched backend.
    pub fn register_batched(
        &mut self,
        id: impl Into<BackendId>,
        backend: impl BatchPolicyBackend + 'static,
    ) {
        self.register_shared(id, Backend::Batched(Arc::new(backend)));
    }

    pub fn register_shared(&mut self, id: impl Into<BackendId>, backend: Backend) {
        let id = id.into();
        tracing::debug!(
            target: "runtime::backends",
            backend = %id,
            batched = backend.is_batched(),
            "registered backend"
        );
        self.backends.insert(id, backend);
    }

    pub fn get(&self, id: &BackendId) -> Option<&Backend> {
        self.backends.get(id)
    }

    pub fn contains(&self, id: &BackendId) -> bool {
        self.backends.contains_key(id)
    }

    pub fn remove(&mut self, id: &BackendId) -> Option<Backend> {
        self.backends.remove(id)
    }

    /// Drops every backend whose id fails `keep`; returns the dropped ids.
    pub fn retain(&mut self, mut keep: impl FnMut(&BackendId) -> bool) -> Vec<BackendId> {
        let dropped: Vec<BackendId> = self
            .backends
            .keys()
            .filter(|id| !keep(id))
            .cloned()
            .collect();
        for id in &dropped {
            self.backends.remove(id);
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pug_core::Proposal;

    use super::*;
    use crate::api::{BackendError, BackendReply, DecisionRequest};

    struct Idle;

    #[async_trait]
    impl PolicyBackend for Idle {
        async fn decide(&self, _request: &DecisionRequest) -> Result<BackendReply, BackendError> {
            Ok(BackendReply::Proposal(Proposal::Stay))
        }
    }

    #[test]
    fn registering_twice_replaces() {
        let mut registry = BackendRegistry::new();
        registry.register_single("idle", Idle);
        registry.register_single("idle", Idle);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&BackendId::from("idle")));
        assert!(registry.remove(&BackendId::from("idle")).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn retain_reports_what_it_dropped() {
        let mut registry = BackendRegistry::new();
        registry.register_single("keep", Idle);
        registry.register_single("drop", Idle);

        let dropped = registry.retain(|id| id.as_str() == "keep");
        assert_eq!(dropped, [BackendId::from("drop")]);
        assert_eq!(registry.len(), 1);
    }
}
