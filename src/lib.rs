//! Live preview shapes
//!
//! A preview shape renders generated markup inside an isolated embedded
//! frame. The markup is first published to a link host, then the frame is
//! pointed at the published URL. On export the frame is asked for a still
//! image of what it currently shows.
//!
//! # Features
//!
//! - **Upload-then-render**: [`PreviewController`] starts exactly one upload
//!   per markup change and ignores completions for superseded mounts
//! - **Snapshot capture**: [`MessageWindow::capture_snapshot`] performs the
//!   request/reply handshake with the frame, bounded by a timeout
//! - **HTTP link host** (default `http` feature): [`upload::HttpUploader`]
//!
//! # Example
//!
//! ```no_run
//! use livepreview::{Document, MemoryUploader, PreviewConfig, PreviewController, PreviewShape};
//! use std::sync::Arc;
//!
//! # async fn run() -> livepreview::Result<()> {
//! let doc = Arc::new(Document::new());
//! let shape = PreviewShape::new("shape:abc").with_markup("<h1>hi</h1>");
//! doc.create_shape(shape.clone());
//!
//! let mut controller = PreviewController::mount(
//!     shape.id.clone(),
//!     doc.clone(),
//!     Arc::new(MemoryUploader::new()),
//!     Arc::new(PreviewConfig::default()),
//! );
//! assert!(!controller.observe(&shape)?.is_ready());
//! if let Some(upload) = controller.take_pending() {
//!     let _ = upload.await;
//! }
//! let state = controller.refresh()?;
//! println!("frame src: {:?}", state.src());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::PreviewConfig;

pub mod shape;
pub use shape::{Dimensions, PreviewProps, PreviewShape, PropsPatch, ShapeId};

pub mod editor;
pub use editor::{Document, Editor, ShapeTransform};

pub mod upload;
pub use upload::{MemoryUploader, Uploader};

pub mod render;
pub use render::{PreviewController, RenderState, UploadOutcome};

pub mod capture;
pub use capture::{FrameHandle, Listener, MessageWindow, Snapshot};

pub mod export;
pub use export::ExportImage;

// Presentation facets (menu, pointer passthrough, shadow)
pub mod view;

pub mod settings;
pub use settings::SettingsStore;
