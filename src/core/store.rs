//! Boundary to the host's entity storage.

use super::{Blackboard, RequesterId, RequesterState};

/// Storage of requester records and their writable-state sinks.
///
/// The scheduler only reads and writes through this trait, so any entity
/// store can host requesters. Ids must be stable for the lifetime of an
/// entity; a despawned id simply stops resolving.
pub trait RequesterStore {
    /// Ids of every entity currently carrying a requester record.
    fn requester_ids(&self) -> Vec<RequesterId>;

    /// Requester record of `id`, if the entity still exists and carries one.
    fn requester(&self, id: RequesterId) -> Option<&RequesterState>;

    /// Mutable requester record of `id`.
    fn requester_mut(&mut self, id: RequesterId) -> Option<&mut RequesterState>;

    /// True if `id` has a sink for parsed responses.
    fn has_sink(&self, id: RequesterId) -> bool;

    /// Mutable sink of `id`.
    fn sink_mut(&mut self, id: RequesterId) -> Option<&mut Blackboard>;
}
