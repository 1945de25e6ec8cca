//! Infrastructure adapters: reference clients and requester stores.

pub mod client;
pub mod store;

pub use client::MockClient;
pub use store::InMemoryStore;
