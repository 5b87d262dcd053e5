//! The display request exchanged between a client and the running server.
//!
//! A [`DisplayRequest`] is built once per invocation from the command line
//! (or from the defaults below), encoded by [`ipc::codec`](crate::ipc::codec),
//! and consumed by the [render loop](crate::render).

use serde::{Deserialize, Serialize};

/// Label shown above the progress bar when none is given.
pub const DEFAULT_LABEL: &str = "PROGRESS";
/// CSS font shorthand used when none is given.
pub const DEFAULT_FONT: &str = "bold 18px monospace";
/// Text and bar colour used when none is given.
pub const DEFAULT_COLOR: &str = "LawnGreen";
/// Seconds the surface stays visible when no timeout is given.
pub const DEFAULT_TIMEOUT_SECS: i32 = 2;

/// One notification to render.
///
/// `progress` is intended to be in `0..=100` but is never clamped or
/// rejected here: out-of-range values travel to the rendering surface
/// unchanged.  `font` and `color` are opaque to everything except the
/// surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRequest {
    pub progress: i32,
    /// Seconds before the surface hides itself.  `<= 0` disables auto-hide.
    pub timeout_secs: i32,
    /// Render a third `"{progress}%"` text line under the bar.
    pub show_progress_line: bool,
    pub label: String,
    pub font: String,
    pub color: String,
}

impl Default for DisplayRequest {
    fn default() -> Self {
        Self {
            progress: 0,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            show_progress_line: false,
            label: DEFAULT_LABEL.into(),
            font: DEFAULT_FONT.into(),
            color: DEFAULT_COLOR.into(),
        }
    }
}

impl DisplayRequest {
    /// The optional third line, e.g. `"55%"`.
    pub fn progress_text(&self) -> Option<String> {
        self.show_progress_line.then(|| format!("{}%", self.progress))
    }
}
