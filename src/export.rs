//! Export of preview shapes as still images
//!
//! A capture failure never fails an export: the shape is exported as a
//! placeholder of the same size instead.

use crate::capture::{MessageWindow, Snapshot};
use crate::shape::{Dimensions, PreviewShape, ShapeId};
use crate::PreviewConfig;
use futures::future::join_all;
use log::warn;

/// Exported representation of one preview shape
#[derive(Debug, Clone, PartialEq)]
pub enum ExportImage {
    Captured(Snapshot),
    Placeholder { dimensions: Dimensions },
}

impl ExportImage {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, ExportImage::Placeholder { .. })
    }

    /// SVG fragment sized to the shape.
    pub fn to_svg(&self) -> String {
        match self {
            ExportImage::Captured(snapshot) => format!(
                r#"<image href="{}" width="{}" height="{}"/>"#,
                escape_attr(&snapshot.href),
                snapshot.dimensions.width(),
                snapshot.dimensions.height()
            ),
            ExportImage::Placeholder { dimensions } => format!(
                r##"<rect width="{}" height="{}" fill="#efefef"/>"##,
                dimensions.width(),
                dimensions.height()
            ),
        }
    }
}

/// Capture one shape, falling back to a placeholder.
pub async fn export_image(
    window: &MessageWindow,
    shape: &PreviewShape,
    config: &PreviewConfig,
) -> ExportImage {
    match window
        .capture_snapshot(shape, config.capture_timeout(), &config.target_origin)
        .await
    {
        Ok(snapshot) => ExportImage::Captured(snapshot),
        Err(err) => {
            warn!("no snapshot for {}, exporting placeholder: {}", shape.id, err);
            ExportImage::Placeholder {
                dimensions: shape.props.dimensions,
            }
        }
    }
}

/// Capture several shapes concurrently; results keep the input order.
pub async fn export_all(
    window: &MessageWindow,
    shapes: &[PreviewShape],
    config: &PreviewConfig,
) -> Vec<(ShapeId, ExportImage)> {
    let images = join_all(shapes.iter().map(|shape| export_image(window, shape, config))).await;
    shapes.iter().map(|s| s.id.clone()).zip(images).collect()
}

fn escape_attr(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}
