//! Preview shape data model
//!
//! A preview shape carries the markup to render plus the bookkeeping written
//! back by the upload coordinator. The frame may only be shown once that
//! bookkeeping proves an upload happened for *this* identity; see
//! [`PreviewProps::is_ready_for`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

const SHAPE_PREFIX: &str = "shape:";

/// Stable handle identifying one preview instance on the canvas
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(String);

impl ShapeId {
    pub fn new(id: impl Into<String>) -> Self {
        ShapeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identity with one leading `shape:` removed, as used in link paths.
    pub fn without_prefix(&self) -> &str {
        self.0.strip_prefix(SHAPE_PREFIX).unwrap_or(&self.0)
    }

    /// Element id under which the live frame for this shape is registered.
    pub fn frame_element_id(&self) -> String {
        format!("iframe-1-{}", self.0)
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShapeId {
    fn from(s: &str) -> Self {
        ShapeId(s.to_string())
    }
}

impl From<String> for ShapeId {
    fn from(s: String) -> Self {
        ShapeId(s)
    }
}

/// Width and height of a preview, always finite and positive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    width: f64,
    height: f64,
}

impl Dimensions {
    pub fn new(width: f64, height: f64) -> Result<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(width) || !valid(height) {
            return Err(Error::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            width: 960.0 * 2.0 / 3.0,
            height: 540.0 * 2.0 / 3.0,
        }
    }
}

/// Mutable properties of a preview shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewProps {
    /// Markup to render; empty means nothing to render yet
    pub markup: String,
    /// Provenance of the markup, passed through untouched
    pub source: String,
    pub dimensions: Dimensions,
    /// Version token of the last completed upload, `None` if never uploaded
    pub upload_version: Option<u64>,
    /// Which identity `upload_version` was produced for
    pub uploaded_for: Option<ShapeId>,
    /// Creation time in milliseconds since the Unix epoch
    pub created_at: u64,
}

impl Default for PreviewProps {
    fn default() -> Self {
        Self {
            markup: String::new(),
            source: String::new(),
            dimensions: Dimensions::default(),
            upload_version: None,
            uploaded_for: None,
            created_at: now_millis(),
        }
    }
}

impl PreviewProps {
    /// The readiness guard: a version exists and it belongs to `id`.
    pub fn is_ready_for(&self, id: &ShapeId) -> bool {
        self.upload_version.is_some() && self.uploaded_for.as_ref() == Some(id)
    }

    /// Whether an upload has to be started for `id`.
    pub fn needs_upload_for(&self, id: &ShapeId) -> bool {
        !self.markup.is_empty() && !self.is_ready_for(id)
    }

    /// Apply a partial update atomically; on error nothing changes.
    pub fn apply(&mut self, patch: PropsPatch) -> Result<()> {
        if let Some(d) = patch.dimensions {
            // Dimensions built through `new` are valid, but deserialized ones may not be
            Dimensions::new(d.width, d.height)?;
        }
        if let Some(markup) = patch.markup {
            self.markup = markup;
        }
        if let Some(source) = patch.source {
            self.source = source;
        }
        if let Some(d) = patch.dimensions {
            self.dimensions = d;
        }
        if let Some(version) = patch.upload_version {
            self.upload_version = version;
        }
        if let Some(owner) = patch.uploaded_for {
            self.uploaded_for = owner;
        }
        Ok(())
    }
}

/// A partial props update, applied in one step by the editor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropsPatch {
    pub markup: Option<String>,
    pub source: Option<String>,
    pub dimensions: Option<Dimensions>,
    pub upload_version: Option<Option<u64>>,
    pub uploaded_for: Option<Option<ShapeId>>,
}

impl PropsPatch {
    /// Completion write of the upload coordinator.
    pub fn uploaded(version: u64, id: &ShapeId) -> Self {
        Self {
            upload_version: Some(Some(version)),
            uploaded_for: Some(Some(id.clone())),
            ..Default::default()
        }
    }

    /// New markup; clears the upload bookkeeping so the shape goes back to
    /// loading and is uploaded again.
    pub fn replace_markup(markup: impl Into<String>) -> Self {
        Self {
            markup: Some(markup.into()),
            upload_version: Some(None),
            uploaded_for: Some(None),
            ..Default::default()
        }
    }

    pub fn resize(dimensions: Dimensions) -> Self {
        Self {
            dimensions: Some(dimensions),
            ..Default::default()
        }
    }

    pub fn source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Default::default()
        }
    }
}

/// One live preview element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewShape {
    pub id: ShapeId,
    pub props: PreviewProps,
}

impl PreviewShape {
    /// A fresh shape with default props.
    pub fn new(id: impl Into<ShapeId>) -> Self {
        Self {
            id: id.into(),
            props: PreviewProps::default(),
        }
    }

    pub fn with_markup(mut self, markup: impl Into<String>) -> Self {
        self.props.markup = markup.into();
        self
    }

    /// Copy of this shape under a new identity. Props are copied verbatim,
    /// so the copy starts out loading until it is uploaded under its own id.
    pub fn duplicate_as(&self, id: impl Into<ShapeId>) -> Self {
        Self {
            id: id.into(),
            props: PreviewProps {
                created_at: now_millis(),
                ..self.props.clone()
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        self.props.is_ready_for(&self.id)
    }
}

/// SHA-256 hex digest of a markup payload.
pub fn content_digest(markup: &str) -> String {
    hex::encode(Sha256::digest(markup.as_bytes()))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
