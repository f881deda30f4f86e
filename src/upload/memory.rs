use super::Uploader;
use crate::shape::{content_digest, ShapeId};
use crate::Result;
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Published {
    version: u64,
    digest: String,
    markup: String,
}

/// In-process upload coordinator
///
/// Versions are assigned per identity starting at 1. Re-uploading identical
/// markup returns the current version; new markup bumps it.
#[derive(Default)]
pub struct MemoryUploader {
    published: Mutex<HashMap<ShapeId, Published>>,
    calls: AtomicUsize,
    latency: Option<Duration>,
}

impl MemoryUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a slow link host by sleeping before each publish.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Number of `upload` calls made so far, including idempotent repeats.
    pub fn upload_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The markup currently published for `id`.
    pub fn published(&self, id: &ShapeId) -> Option<String> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|p| p.markup.clone())
    }

    pub fn version(&self, id: &ShapeId) -> Option<u64> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|p| p.version)
    }
}

#[async_trait]
impl Uploader for MemoryUploader {
    async fn upload(&self, id: &ShapeId, markup: &str) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let digest = content_digest(markup);
        let mut published = self.published.lock().unwrap_or_else(PoisonError::into_inner);
        let version = match published.get(id) {
            Some(existing) if existing.digest == digest => existing.version,
            Some(existing) => existing.version + 1,
            None => 1,
        };
        debug!("published {} at v{}", id, version);
        published.insert(
            id.clone(),
            Published {
                version,
                digest,
                markup: markup.to_string(),
            },
        );
        Ok(version)
    }
}
