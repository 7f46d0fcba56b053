//! Wire types for the nimproxy HTTP surface and the NIM upstream schema.
//!
//! This crate intentionally does **not** depend on axum or any concrete HTTP
//! client; it holds only serde shapes shared by the core and the binary.

pub mod chat;
pub mod error;
pub mod models;

pub use chat::{ChatCompletionRequestBody, ChatMessage, UpstreamPayload};
pub use error::{ErrorBody, ErrorDetail};
pub use models::{ListModelsResponse, ListObjectType, Model, ModelObjectType};
