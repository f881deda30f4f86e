//! Render state machine for a mounted preview
//!
//! Each mount of a preview shape owns a [`PreviewController`]. Every time the
//! host renders the shape it calls [`PreviewController::observe`], which
//! derives the [`RenderState`] and, when the upload dependencies changed,
//! runs the upload effect:
//!
//! - the previous effect is cancelled (its completion becomes a no-op)
//! - if the shape has markup but no upload for its own identity, exactly one
//!   upload task is spawned
//!
//! The dependencies are the identity, the markup, the version and the owner
//! of that version. Selection, resizing and other props never re-run the
//! effect.

use crate::editor::Editor;
use crate::shape::{content_digest, PreviewShape, PropsPatch, ShapeId};
use crate::upload::Uploader;
use crate::{Error, PreviewConfig, Result};
use log::{debug, warn};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

/// What the host should present for a preview
#[derive(Debug, Clone, PartialEq)]
pub enum RenderState {
    /// Placeholder; the upload for this identity has not completed
    Loading,
    /// Embedded frame pointed at `src`
    Ready { src: Url },
}

impl RenderState {
    pub fn is_ready(&self) -> bool {
        matches!(self, RenderState::Ready { .. })
    }

    pub fn src(&self) -> Option<&Url> {
        match self {
            RenderState::Ready { src } => Some(src),
            RenderState::Loading => None,
        }
    }
}

/// How a spawned upload task ended
#[derive(Debug)]
pub enum UploadOutcome {
    /// Version written back to the shape
    Applied { version: u64 },
    /// The effect was cancelled before completion; nothing was written
    Stale,
    /// Upload or write-back failed; the shape stays loading
    Failed(Error),
}

/// `{protocol}://{link_host}/{id without prefix}`
pub fn link_url(config: &PreviewConfig, id: &ShapeId) -> Result<Url> {
    let mut url = config.base_url()?;
    url.path_segments_mut()
        .map_err(|_| {
            Error::ConfigError(format!("link host cannot carry a path: {}", config.link_host))
        })?
        .pop_if_empty()
        .push(id.without_prefix());
    Ok(url)
}

/// Link URL plus `?preview=1&v={version}`. A new version yields a new URL,
/// which forces the frame to reload.
pub fn frame_url(config: &PreviewConfig, id: &ShapeId, version: u64) -> Result<Url> {
    let mut url = link_url(config, id)?;
    url.query_pairs_mut()
        .append_pair("preview", "1")
        .append_pair("v", &version.to_string());
    Ok(url)
}

/// Derive the render state of a shape without side effects.
pub fn render_state(config: &PreviewConfig, shape: &PreviewShape) -> Result<RenderState> {
    match shape.props.upload_version {
        Some(version) if shape.is_ready() => Ok(RenderState::Ready {
            src: frame_url(config, &shape.id, version)?,
        }),
        _ => Ok(RenderState::Loading),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct UploadDeps {
    id: ShapeId,
    markup_digest: String,
    upload_version: Option<u64>,
    uploaded_for: Option<ShapeId>,
}

impl UploadDeps {
    fn of(shape: &PreviewShape) -> Self {
        Self {
            id: shape.id.clone(),
            markup_digest: content_digest(&shape.props.markup),
            upload_version: shape.props.upload_version,
            uploaded_for: shape.props.uploaded_for.clone(),
        }
    }
}

struct Effect {
    deps: UploadDeps,
    cancel: CancellationToken,
}

/// Lifecycle driver for one mounted preview shape
pub struct PreviewController {
    id: ShapeId,
    editor: Arc<dyn Editor>,
    uploader: Arc<dyn Uploader>,
    config: Arc<PreviewConfig>,
    mount: CancellationToken,
    effect: Option<Effect>,
    pending: Option<JoinHandle<UploadOutcome>>,
    uploads_started: usize,
}

impl PreviewController {
    /// Mount a controller for `id`. Upload tasks are spawned on the current
    /// tokio runtime, so `observe` fails outside of one.
    pub fn mount(
        id: ShapeId,
        editor: Arc<dyn Editor>,
        uploader: Arc<dyn Uploader>,
        config: Arc<PreviewConfig>,
    ) -> Self {
        Self {
            id,
            editor,
            uploader,
            config,
            mount: CancellationToken::new(),
            effect: None,
            pending: None,
            uploads_started: 0,
        }
    }

    pub fn id(&self) -> &ShapeId {
        &self.id
    }

    /// Render pass: re-run the upload effect if its dependencies changed and
    /// return what to present.
    pub fn observe(&mut self, shape: &PreviewShape) -> Result<RenderState> {
        if shape.id != self.id {
            return Err(Error::Other(format!(
                "controller for {} observed shape {}",
                self.id, shape.id
            )));
        }

        let deps = UploadDeps::of(shape);
        let changed = self.effect.as_ref().map_or(true, |e| e.deps != deps);
        if changed && !self.mount.is_cancelled() {
            self.run_effect(shape, deps)?;
        }

        render_state(&self.config, shape)
    }

    /// Fetch the shape from the editor and observe it.
    pub fn refresh(&mut self) -> Result<RenderState> {
        let shape = self
            .editor
            .shape(&self.id)
            .ok_or_else(|| Error::ShapeNotFound(self.id.to_string()))?;
        self.observe(&shape)
    }

    /// Forget the current dependencies so the next `observe` runs the effect
    /// again, e.g. after an upload failed.
    pub fn retry(&mut self) {
        if let Some(effect) = self.effect.take() {
            effect.cancel.cancel();
        }
    }

    /// Handle of the most recently spawned upload task, if not taken yet.
    pub fn take_pending(&mut self) -> Option<JoinHandle<UploadOutcome>> {
        self.pending.take()
    }

    /// Number of upload tasks this mount has started.
    pub fn uploads_started(&self) -> usize {
        self.uploads_started
    }

    /// Tear down the mount. In-flight uploads finish as `Stale`.
    pub fn unmount(self) {
        self.mount.cancel();
    }

    fn run_effect(&mut self, shape: &PreviewShape, deps: UploadDeps) -> Result<()> {
        let runtime = Handle::try_current()
            .map_err(|_| Error::Other("upload effect requires a tokio runtime".into()))?;

        if let Some(previous) = self.effect.take() {
            previous.cancel.cancel();
        }

        let cancel = self.mount.child_token();
        if shape.props.needs_upload_for(&shape.id) {
            self.uploads_started += 1;
            self.pending = Some(runtime.spawn(upload_task(
                shape.id.clone(),
                shape.props.markup.clone(),
                Arc::clone(&self.editor),
                Arc::clone(&self.uploader),
                cancel.clone(),
            )));
        }
        self.effect = Some(Effect { deps, cancel });
        Ok(())
    }
}

impl Drop for PreviewController {
    fn drop(&mut self) {
        self.mount.cancel();
    }
}

async fn upload_task(
    id: ShapeId,
    markup: String,
    editor: Arc<dyn Editor>,
    uploader: Arc<dyn Uploader>,
    cancel: CancellationToken,
) -> UploadOutcome {
    let result = uploader.upload(&id, &markup).await;

    if cancel.is_cancelled() {
        debug!("discarding stale upload completion for {}", id);
        return UploadOutcome::Stale;
    }

    let version = match result {
        Ok(version) => version,
        Err(err) => {
            warn!("upload for {} failed: {}", id, err);
            return UploadOutcome::Failed(err);
        }
    };

    // The token is checked again under the editor's update so an unmount
    // racing this write cannot let it land on a recreated shape.
    let still_current = || !cancel.is_cancelled();
    match editor.update_props_if(&id, PropsPatch::uploaded(version, &id), &still_current) {
        Ok(true) => {
            debug!("{} ready at v{}", id, version);
            UploadOutcome::Applied { version }
        }
        Ok(false) => {
            debug!("discarding stale upload completion for {}", id);
            UploadOutcome::Stale
        }
        Err(err) => {
            warn!("could not record upload for {}: {}", id, err);
            UploadOutcome::Failed(err)
        }
    }
}
