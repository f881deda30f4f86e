//! Presentation facets derived from editor state. Nothing here writes to the
//! shape, so none of it can influence the render state machine.

use crate::editor::Editor;
use crate::render::RenderState;
use crate::shape::PreviewShape;

struct Shadow {
    offset_x: f64,
    offset_y: f64,
    blur: f64,
    spread: f64,
    color: &'static str,
}

const ROTATING_BOX_SHADOWS: [Shadow; 2] = [
    Shadow {
        offset_x: 0.0,
        offset_y: 2.0,
        blur: 4.0,
        spread: -1.0,
        color: "#0000003a",
    },
    Shadow {
        offset_x: 0.0,
        offset_y: 3.0,
        blur: 12.0,
        spread: -2.0,
        color: "#0000001f",
    },
];

/// CSS `box-shadow` that keeps pointing down the page when the shape is
/// rotated by `rotation` radians.
pub fn rotated_box_shadow(rotation: f64) -> String {
    let (sin, cos) = (-rotation).sin_cos();
    ROTATING_BOX_SHADOWS
        .iter()
        .map(|s| {
            let x = s.offset_x * cos - s.offset_y * sin;
            let y = s.offset_x * sin + s.offset_y * cos;
            format!(
                "{}px {}px {}px {}px {}",
                round(x),
                round(y),
                s.blur,
                s.spread,
                s.color
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn round(v: f64) -> f64 {
    let r = (v * 1000.0).round() / 1000.0;
    // avoid "-0px"
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

/// Everything the host needs to draw a preview besides the frame itself
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewView {
    pub state: RenderState,
    /// Overlay menu shown next to a ready, solely selected preview
    pub menu_visible: bool,
    /// Frame receives pointer events only while editing
    pub interactive: bool,
    pub hint: &'static str,
    pub box_shadow: String,
}

impl PreviewView {
    pub fn build(
        editor: &dyn Editor,
        shape: &PreviewShape,
        state: RenderState,
        is_editing: bool,
    ) -> Self {
        let rotation = editor
            .shape_transform(&shape.id)
            .map(|t| t.rotation)
            .unwrap_or(0.0);
        let only_selected = editor.only_selected_id().as_ref() == Some(&shape.id);
        let menu_visible = only_selected && state.is_ready();

        Self {
            state,
            menu_visible,
            interactive: is_editing,
            hint: if is_editing {
                "Click the canvas to exit"
            } else {
                "Double click to interact"
            },
            box_shadow: rotated_box_shadow(rotation),
        }
    }
}
