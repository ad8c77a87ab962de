use crate::core::config::NavigationConfig;
use crate::core::geo::Point;
use serde::{Deserialize, Serialize};

/// High-level navigation input, already decoded from raw pointer activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputEvent {
    /// Press and release in place. `quick` is set when the press was short
    /// and did not travel, see [`is_quick_click`].
    Click {
        position: Point,
        quick: bool,
        shift: bool,
    },
    /// Pointer moved while pressed, `delta` in pixels
    Drag {
        position: Point,
        delta: Point,
        shift: bool,
    },
    /// Pointer released after a press
    Release { inside_press: bool },
    /// Wheel turned by `scroll` notches, positive away from the user
    Scroll {
        position: Point,
        scroll: f64,
        shift: bool,
    },
    /// Container resized
    Resize { size: Point },
}

/// Whether an event was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventHandled {
    Handled,
    NotHandled,
}

/// Notifications raised by the viewer, drained by the host
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    Open,
    OpenFailed(String),
    Close,
    Resize,
    AnimationStart,
    Animation,
    AnimationFinish,
}

impl InputEvent {
    /// Gets the pixel position associated with this event, if any
    pub fn position(&self) -> Option<Point> {
        match self {
            InputEvent::Click { position, .. }
            | InputEvent::Drag { position, .. }
            | InputEvent::Scroll { position, .. } => Some(*position),
            InputEvent::Release { .. } | InputEvent::Resize { .. } => None,
        }
    }

    pub fn is_pointer_event(&self) -> bool {
        !matches!(self, InputEvent::Resize { .. })
    }

    pub fn shift(&self) -> bool {
        match self {
            InputEvent::Click { shift, .. }
            | InputEvent::Drag { shift, .. }
            | InputEvent::Scroll { shift, .. } => *shift,
            _ => false,
        }
    }
}

impl ViewerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ViewerEvent::Open => "open",
            ViewerEvent::OpenFailed(_) => "open_failed",
            ViewerEvent::Close => "close",
            ViewerEvent::Resize => "resize",
            ViewerEvent::AnimationStart => "animation_start",
            ViewerEvent::Animation => "animation",
            ViewerEvent::AnimationFinish => "animation_finish",
        }
    }
}

/// A press counts as a click when it is released within the time threshold
/// and moved no further than the distance threshold
pub fn is_quick_click(duration_ms: f64, distance: f64, config: &NavigationConfig) -> bool {
    duration_ms <= config.click_time_threshold as f64 && distance <= config.click_dist_threshold
}
