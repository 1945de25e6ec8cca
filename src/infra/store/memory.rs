//! In-memory entity store.

use std::collections::BTreeMap;

use crate::core::{Blackboard, RequesterId, RequesterState, RequesterStore};

#[derive(Debug, Default, Clone)]
struct Entity {
    requester: Option<RequesterState>,
    blackboard: Option<Blackboard>,
}

/// Minimal entity store: entities carry an optional requester record and an
/// optional blackboard.
///
/// Ids are handed out in increasing order and never reused.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    entities: BTreeMap<RequesterId, Entity>,
    next_id: RequesterId,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bare entity and return its id.
    pub fn spawn(&mut self) -> RequesterId {
        let id = self.next_id;
        self.next_id += 1;
        self.entities.insert(id, Entity::default());
        id
    }

    /// Remove an entity with everything attached to it.
    pub fn despawn(&mut self, id: RequesterId) -> bool {
        self.entities.remove(&id).is_some()
    }

    /// True if the entity is alive.
    #[must_use]
    pub fn contains(&self, id: RequesterId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True if no entity is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Attach (or replace) a requester record. Returns false if `id` is not alive.
    pub fn attach_requester(&mut self, id: RequesterId, state: RequesterState) -> bool {
        self.entities.get_mut(&id).is_some_and(|e| {
            e.requester = Some(state);
            true
        })
    }

    /// Remove and return the requester record.
    pub fn detach_requester(&mut self, id: RequesterId) -> Option<RequesterState> {
        self.entities.get_mut(&id)?.requester.take()
    }

    /// Attach (or replace) a blackboard. Returns false if `id` is not alive.
    pub fn attach_blackboard(&mut self, id: RequesterId, blackboard: Blackboard) -> bool {
        self.entities.get_mut(&id).is_some_and(|e| {
            e.blackboard = Some(blackboard);
            true
        })
    }

    /// Remove and return the blackboard.
    pub fn detach_blackboard(&mut self, id: RequesterId) -> Option<Blackboard> {
        self.entities.get_mut(&id)?.blackboard.take()
    }

    /// The blackboard of `id`.
    #[must_use]
    pub fn blackboard(&self, id: RequesterId) -> Option<&Blackboard> {
        self.entities.get(&id)?.blackboard.as_ref()
    }
}

impl RequesterStore for InMemoryStore {
    fn requester_ids(&self) -> Vec<RequesterId> {
        self.entities
            .iter()
            .filter(|(_, e)| e.requester.is_some())
            .map(|(&id, _)| id)
            .collect()
    }

    fn requester(&self, id: RequesterId) -> Option<&RequesterState> {
        self.entities.get(&id)?.requester.as_ref()
    }

    fn requester_mut(&mut self, id: RequesterId) -> Option<&mut RequesterState> {
        self.entities.get_mut(&id)?.requester.as_mut()
    }

    fn has_sink(&self, id: RequesterId) -> bool {
        self.entities
            .get(&id)
            .is_some_and(|e| e.blackboard.is_some())
    }

    fn sink_mut(&mut self, id: RequesterId) -> Option<&mut Blackboard> {
        self.entities.get_mut(&id)?.blackboard.as_mut()
    }
}
