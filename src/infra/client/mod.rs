//! Reference [`LlmClient`](crate::core::LlmClient) implementations.

pub mod mock;

pub use mock::{MockClient, ResponseFn};
