use serde::{Deserialize, Serialize};

pub mod auth;
pub mod servers;

/// The api wraps list payloads as `{ "data": [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}
