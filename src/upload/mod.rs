//! Upload coordinator: publishes markup so it is addressable by a stable URL
//!
//! Implementations only need to honour the [`Uploader`] contract. The render
//! state machine decides when to call it and whether the result still counts.

use crate::shape::ShapeId;
use crate::Result;
use async_trait::async_trait;

pub mod memory;
pub use memory::MemoryUploader;

#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::HttpUploader;

/// Publishes markup for a shape and reports the resulting version token.
///
/// Calls may take arbitrarily long and must be safe to make even if the
/// caller ends up discarding the result.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, id: &ShapeId, markup: &str) -> Result<u64>;
}
