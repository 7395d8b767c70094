//! # Stroke Capture
//!
//! Pointer input for the masking tool, modelled as an explicit state machine:
//!
//! ```text
//!        begin          end            take_committed
//! Idle ────────▶ Capturing ────▶ Committed ──────────────▶ Idle
//!   ▲               │ extend
//!   └─── cancel ────┘
//! ```
//!
//! A stroke only leaves the capture through [`StrokeCapture::take_committed`],
//! so nothing downstream ever sees a half-drawn path.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Smallest brush diameter in display pixels.
pub const MIN_BRUSH_SIZE: u32 = 5;

/// Largest brush diameter in display pixels.
pub const MAX_BRUSH_SIZE: u32 = 100;

/// Brush diameter a new session starts with.
pub const DEFAULT_BRUSH_SIZE: u32 = 20;

/// Brush diameter in display pixels, always within
/// [`MIN_BRUSH_SIZE`]`..=`[`MAX_BRUSH_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct BrushSize(u32);

impl BrushSize {
    /// Create a brush size, clamping into the valid range.
    #[must_use]
    pub fn new(diameter: u32) -> Self {
        Self(diameter.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE))
    }

    /// Diameter in display pixels.
    #[must_use]
    pub const fn diameter(self) -> u32 {
        self.0
    }
}

impl Default for BrushSize {
    fn default() -> Self {
        Self(DEFAULT_BRUSH_SIZE)
    }
}

impl From<u32> for BrushSize {
    fn from(diameter: u32) -> Self {
        Self::new(diameter)
    }
}

impl From<BrushSize> for u32 {
    fn from(size: BrushSize) -> Self {
        size.0
    }
}

/// A point in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    /// Horizontal offset from the left edge of the displayed image.
    pub x: f32,
    /// Vertical offset from the top edge of the displayed image.
    pub y: f32,
}

impl StrokePoint {
    /// Create a point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An ordered path of points with the brush size in effect when it began.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EraserStroke {
    /// Points in capture order.
    pub points: Vec<StrokePoint>,
    /// Brush size at capture time.
    pub brush_size: BrushSize,
}

impl EraserStroke {
    /// Brush radius in display pixels.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn radius(&self) -> f32 {
        self.brush_size.diameter() as f32 / 2.0
    }
}

/// Phase of a [`StrokeCapture`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturePhase {
    /// No stroke in progress.
    #[default]
    Idle,
    /// Pointer is down and points are being recorded.
    Capturing,
    /// Pointer released; stroke awaits hand-off.
    Committed,
}

impl CapturePhase {
    /// Lowercase name for messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Capturing => "capturing",
            Self::Committed => "committed",
        }
    }
}

/// Captures brush input while the masking tool is active.
#[derive(Debug, Clone, Default)]
pub struct StrokeCapture {
    active: bool,
    brush_size: BrushSize,
    phase: CapturePhase,
    current: Option<EraserStroke>,
}

impl StrokeCapture {
    /// Create an inactive capture with the default brush.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the masking tool is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Turn the masking tool on or off. Turning it off drops any stroke in
    /// progress.
    pub fn set_active(&mut self, active: bool) {
        if !active {
            self.cancel();
        }
        self.active = active;
    }

    /// Current brush size.
    #[must_use]
    pub fn brush_size(&self) -> BrushSize {
        self.brush_size
    }

    /// Change the brush size for subsequent strokes. Out-of-range values are
    /// clamped.
    pub fn set_brush_size(&mut self, diameter: u32) -> BrushSize {
        self.brush_size = BrushSize::new(diameter);
        self.brush_size
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    /// Stroke being captured or awaiting hand-off.
    #[must_use]
    pub fn current_stroke(&self) -> Option<&EraserStroke> {
        self.current.as_ref()
    }

    /// Pointer down: start a stroke at `point`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ToolInactive`] if the masking tool is off, or
    /// [`CoreError::StrokeTransition`] unless the capture is idle.
    pub fn begin(&mut self, point: StrokePoint) -> CoreResult<()> {
        if !self.active {
            return Err(CoreError::ToolInactive);
        }
        if self.phase != CapturePhase::Idle {
            return Err(CoreError::StrokeTransition {
                action: "begin a stroke",
                phase: self.phase.as_str(),
            });
        }
        self.current = Some(EraserStroke {
            points: vec![point],
            brush_size: self.brush_size,
        });
        self.phase = CapturePhase::Capturing;
        Ok(())
    }

    /// Pointer move: append `point` to the stroke. Returns `false` (and
    /// records nothing) unless a stroke is being captured.
    pub fn extend(&mut self, point: StrokePoint) -> bool {
        if self.phase != CapturePhase::Capturing {
            return false;
        }
        match self.current.as_mut() {
            Some(stroke) => {
                stroke.points.push(point);
                true
            }
            None => false,
        }
    }

    /// Pointer up or leave: commit the stroke. Returns `false` if no stroke
    /// was being captured.
    pub fn end(&mut self) -> bool {
        if self.phase != CapturePhase::Capturing {
            return false;
        }
        self.phase = CapturePhase::Committed;
        true
    }

    /// Hand off the committed stroke and return to idle.
    pub fn take_committed(&mut self) -> Option<EraserStroke> {
        if self.phase != CapturePhase::Committed {
            return None;
        }
        self.phase = CapturePhase::Idle;
        self.current.take()
    }

    /// Drop any stroke and return to idle.
    pub fn cancel(&mut self) {
        self.phase = CapturePhase::Idle;
        self.current = None;
    }
}
