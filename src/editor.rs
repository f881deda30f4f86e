//! Editor collaborator
//!
//! The editor owns shape state. The core only reads shapes and writes them
//! back through single `update_props` calls.

use crate::shape::{PreviewShape, PropsPatch, ShapeId};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Page transform of a shape, as far as the preview needs it
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShapeTransform {
    pub x: f64,
    pub y: f64,
    /// Rotation in radians
    pub rotation: f64,
}

/// Read/update/query surface the preview core consumes
pub trait Editor: Send + Sync {
    /// Current state of a shape, if it exists
    fn shape(&self, id: &ShapeId) -> Option<PreviewShape>;

    /// Apply a partial props update in one step
    fn update_props(&self, id: &ShapeId, patch: PropsPatch) -> Result<()>;

    /// Apply `patch` only if `still_current` holds, evaluated in the same step
    /// as the write. Returns whether the patch was applied.
    fn update_props_if(
        &self,
        id: &ShapeId,
        patch: PropsPatch,
        still_current: &(dyn Fn() -> bool + Sync),
    ) -> Result<bool>;

    /// The selected shape, if exactly one is selected
    fn only_selected_id(&self) -> Option<ShapeId>;

    fn shape_transform(&self, id: &ShapeId) -> Option<ShapeTransform>;
}

#[derive(Default)]
struct DocumentState {
    shapes: HashMap<ShapeId, PreviewShape>,
    transforms: HashMap<ShapeId, ShapeTransform>,
    selection: Vec<ShapeId>,
}

/// In-memory editor document
#[derive(Default)]
pub struct Document {
    state: Mutex<DocumentState>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DocumentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a shape, replacing any shape with the same identity.
    pub fn create_shape(&self, shape: PreviewShape) {
        let mut state = self.lock();
        state.transforms.entry(shape.id.clone()).or_default();
        state.shapes.insert(shape.id.clone(), shape);
    }

    /// Remove a shape and everything attached to it.
    pub fn delete_shape(&self, id: &ShapeId) -> Option<PreviewShape> {
        let mut state = self.lock();
        state.transforms.remove(id);
        state.selection.retain(|s| s != id);
        state.shapes.remove(id)
    }

    pub fn select(&self, ids: &[ShapeId]) {
        let mut state = self.lock();
        let selection = ids
            .iter()
            .filter(|id| state.shapes.contains_key(*id))
            .cloned()
            .collect();
        state.selection = selection;
    }

    pub fn set_transform(&self, id: &ShapeId, transform: ShapeTransform) -> Result<()> {
        let mut state = self.lock();
        if !state.shapes.contains_key(id) {
            return Err(Error::ShapeNotFound(id.to_string()));
        }
        state.transforms.insert(id.clone(), transform);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Editor for Document {
    fn shape(&self, id: &ShapeId) -> Option<PreviewShape> {
        self.lock().shapes.get(id).cloned()
    }

    fn update_props(&self, id: &ShapeId, patch: PropsPatch) -> Result<()> {
        let mut state = self.lock();
        let shape = state
            .shapes
            .get_mut(id)
            .ok_or_else(|| Error::ShapeNotFound(id.to_string()))?;
        shape.props.apply(patch)
    }

    fn update_props_if(
        &self,
        id: &ShapeId,
        patch: PropsPatch,
        still_current: &(dyn Fn() -> bool + Sync),
    ) -> Result<bool> {
        let mut state = self.lock();
        if !still_current() {
            return Ok(false);
        }
        let shape = state
            .shapes
            .get_mut(id)
            .ok_or_else(|| Error::ShapeNotFound(id.to_string()))?;
        shape.props.apply(patch)?;
        Ok(true)
    }

    fn only_selected_id(&self) -> Option<ShapeId> {
        match self.lock().selection.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        }
    }

    fn shape_transform(&self, id: &ShapeId) -> Option<ShapeTransform> {
        self.lock().transforms.get(id).copied()
    }
}
