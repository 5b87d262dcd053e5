//! The rendering-surface seam.
//!
//! The server never draws anything itself.  It hands a [`Frame`] to a
//! [`Surface`] implementation and waits for the surface to report that it
//! is no longer visible.  Concrete surfaces live in [`surface`](crate::surface):
//! a GTK4 layer-shell overlay and a plain console renderer.

use crate::config::{Align, Layout, Position};
use crate::request::DisplayRequest;
use crate::surface::HideSignal;
use std::time::Duration;

/// One line of surface content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// A text line (the label, or the optional `"55%"` line).
    Text(String),
    /// A percentage indicator.  The value is passed through unclamped;
    /// a surface clamps only when it needs a drawable fraction.
    Percentage(i32),
}

/// Everything a surface needs to render one [`DisplayRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub font: String,
    pub color: String,
    pub shadow_offset: i32,
    pub align: Align,
    pub position: Position,
    pub lines: Vec<Line>,
    /// `None` means the surface stays visible until hidden explicitly.
    pub timeout: Option<Duration>,
}

impl Frame {
    /// Build the frame for `req` using the server's `layout`.
    ///
    /// Lines are always `label`, `Percentage(progress)` and, when the
    /// request asks for it, the textual percentage.
    pub fn from_request(req: &DisplayRequest, layout: &Layout) -> Self {
        let mut lines = vec![Line::Text(req.label.clone()), Line::Percentage(req.progress)];
        if let Some(text) = req.progress_text() {
            lines.push(Line::Text(text));
        }

        Self {
            font: req.font.clone(),
            color: req.color.clone(),
            shadow_offset: layout.shadow_offset,
            align: layout.align,
            position: layout.position,
            lines,
            timeout: u64::try_from(req.timeout_secs)
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }
}

/// Abstraction over something that can display a [`Frame`].
///
/// The [render loop](crate::render) drives a surface through
/// `show → wait_until_hidden → destroy` once per displayed request.
/// All methods are called from the thread that created the surface;
/// other threads interact with it only through the [`HideSignal`].
pub trait Surface {
    /// The error type produced by this surface.
    type Error: std::error::Error + Send + 'static;

    /// Configure the surface for `frame` and make it visible.
    fn show(&mut self, frame: &Frame) -> Result<(), Self::Error>;

    /// Block until the surface is no longer visible, either because the
    /// frame's timeout elapsed or because the [`HideSignal`] was raised.
    fn wait_until_hidden(&mut self) -> Result<(), Self::Error>;

    /// Release whatever [`show`](Surface::show) allocated.
    fn destroy(&mut self);

    /// A handle other threads can use to hide the surface early.
    fn hide_signal(&self) -> HideSignal;
}
