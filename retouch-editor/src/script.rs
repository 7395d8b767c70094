//! Batch edit scripts.
//!
//! A script is a JSON array mixing plain edits and tool steps:
//!
//! ```json
//! [
//!   { "action": "set_brightness", "value": 120 },
//!   { "action": "rotate_right" },
//!   { "tool": "remove_background" },
//!   { "tool": "erase", "brush_size": 30, "points": [[40, 40], [60, 45]] },
//!   { "tool": "upscale", "level": 2 },
//!   { "tool": "undo" }
//! ]
//! ```

use retouch_core::{CoreError, EditAction};
use serde::{Deserialize, Serialize};

use crate::error::EditorResult;
use crate::session::EditorSession;

/// A step that is not a plain [`EditAction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolStep {
    /// Remove the background, or restore it if already removed.
    RemoveBackground,
    /// Draw one masking stroke and erase under it.
    Erase {
        /// Brush diameter in display pixels.
        brush_size: u32,
        /// Stroke points in display coordinates.
        points: Vec<[f32; 2]>,
    },
    /// Record an upscale level.
    Upscale {
        /// 2 or 4.
        level: u8,
    },
    /// Undo the last step.
    Undo,
    /// Redo the last undone step.
    Redo,
    /// Back to the original image.
    Reset,
}

/// One entry of a batch script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptStep {
    /// An adjustment, geometry or filter edit.
    Edit(EditAction),
    /// A tool invocation or history step.
    Tool(ToolStep),
}

/// Parse a script.
///
/// # Errors
///
/// Returns [`crate::EditorError::Core`] if the JSON is not a list of steps.
pub fn parse_script(json: &str) -> EditorResult<Vec<ScriptStep>> {
    Ok(serde_json::from_str(json).map_err(CoreError::from)?)
}

/// Run `steps` against `session` in order, stopping at the first failure.
///
/// # Errors
///
/// Returns the first step's error; earlier steps stay applied.
pub async fn run_script(session: &EditorSession, steps: &[ScriptStep]) -> EditorResult<()> {
    for (index, step) in steps.iter().enumerate() {
        tracing::debug!(index, ?step, "Running script step");
        match step {
            ScriptStep::Edit(action) => {
                session.apply(action)?;
            }
            ScriptStep::Tool(ToolStep::RemoveBackground) => {
                session.remove_background().await?;
            }
            ScriptStep::Tool(ToolStep::Erase { brush_size, points }) => {
                draw_stroke(session, *brush_size, points).await?;
            }
            ScriptStep::Tool(ToolStep::Upscale { level }) => {
                session.upscale(*level).await?;
            }
            ScriptStep::Tool(ToolStep::Undo) => {
                session.undo()?;
            }
            ScriptStep::Tool(ToolStep::Redo) => {
                session.redo()?;
            }
            ScriptStep::Tool(ToolStep::Reset) => {
                session.reset();
            }
        }
    }
    Ok(())
}

async fn draw_stroke(session: &EditorSession, brush_size: u32, points: &[[f32; 2]]) -> EditorResult<()> {
    let Some(([x, y], rest)) = points.split_first() else {
        return Ok(());
    };
    let was_active = session.masking_active();
    session.set_masking_active(true);
    session.set_brush_size(brush_size);

    let result = match session.pointer_down(*x, *y) {
        Ok(()) => {
            for [x, y] in rest {
                session.pointer_move(*x, *y);
            }
            session.pointer_up().await.map(|_| ())
        }
        Err(err) => Err(err),
    };

    session.set_masking_active(was_active);
    result
}
