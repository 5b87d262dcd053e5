//! GTK4 + layer-shell surface that runs on the **calling** thread.
//!
//! # Widget tree
//!
//! ```text
//! window                 (layer-shell overlay, transparent)
//! └ .osd                 (vertical box, rebuilt per frame)
//!     ├ .osd-text        (label)
//!     ├ .osd-bar         (GtkProgressBar)
//!     └ .osd-text        (optional "55%")
//! ```
//!
//! Font, colour and shadow come from the frame and are turned into a CSS
//! stylesheet that replaces the previous one on every [`show`](Surface::show).
//! Waiting iterates the default GLib main context until the frame's
//! deadline passes or the [`HideSignal`] is raised; the signal's waker
//! calls [`glib::MainContext::wakeup`] so a raise from another thread
//! interrupts a blocking iteration.

use crate::config::{Align, Position};
use crate::surface::HideSignal;
use crate::traits::{Frame, Line, Surface};
use gtk4::prelude::*;
use gtk4::{gdk, glib};
use gtk4_layer_shell::{Edge, LayerShell};
use log::{debug, info, warn};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

const BAR_WIDTH: i32 = 400;

#[derive(Debug, thiserror::Error)]
pub enum GtkSurfaceError {
    #[error("failed to initialise GTK4: {0}")]
    Init(String),
}

pub struct GtkSurface {
    window: gtk4::Window,
    provider: gtk4::CssProvider,
    hide: HideSignal,
    deadline: Option<Instant>,
}

impl GtkSurface {
    /// Initialise GTK on the current thread and create the (hidden)
    /// overlay window.  All later calls must come from this thread.
    pub fn new() -> Result<Self, GtkSurfaceError> {
        gtk4::init().map_err(|e| GtkSurfaceError::Init(e.to_string()))?;
        info!("GTK4 initialised");

        let provider = gtk4::CssProvider::new();
        if let Some(display) = gdk::Display::default() {
            gtk4::style_context_add_provider_for_display(
                &display,
                &provider,
                gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
            );
        } else {
            warn!("no GDK display, CSS will not be applied");
        }

        let window = gtk4::Window::new();
        window.init_layer_shell();
        window.set_layer(gtk4_layer_shell::Layer::Overlay);
        window.set_namespace("osd-tac");
        window.set_keyboard_mode(gtk4_layer_shell::KeyboardMode::None);
        window.set_decorated(false);
        window.set_can_target(false);
        window.remove_css_class("background");

        let hide = HideSignal::new();
        let ctx = glib::MainContext::default();
        hide.set_waker(move || ctx.wakeup());

        Ok(Self {
            window,
            provider,
            hide,
            deadline: None,
        })
    }

    fn place(&self, position: Position, align: Align) {
        for edge in [Edge::Top, Edge::Bottom, Edge::Left, Edge::Right] {
            self.window.set_anchor(edge, false);
        }
        match position {
            Position::Top => self.window.set_anchor(Edge::Top, true),
            Position::Bottom => self.window.set_anchor(Edge::Bottom, true),
            Position::Middle => {}
        }
        match align {
            Align::Left => self.window.set_anchor(Edge::Left, true),
            Align::Right => self.window.set_anchor(Edge::Right, true),
            Align::Center => {}
        }
    }
}

impl Surface for GtkSurface {
    type Error = GtkSurfaceError;

    fn show(&mut self, frame: &Frame) -> Result<(), GtkSurfaceError> {
        #[allow(deprecated)]
        self.provider.load_from_data(&frame_css(frame));

        let content = gtk4::Box::new(gtk4::Orientation::Vertical, 4);
        content.add_css_class("osd");
        let xalign = match frame.align {
            Align::Left => 0.0,
            Align::Center => 0.5,
            Align::Right => 1.0,
        };

        for line in &frame.lines {
            match line {
                Line::Text(text) => {
                    let label = gtk4::Label::new(Some(text.as_str()));
                    label.add_css_class("osd-text");
                    label.set_xalign(xalign);
                    content.append(&label);
                }
                Line::Percentage(percent) => {
                    let bar = gtk4::ProgressBar::new();
                    bar.add_css_class("osd-bar");
                    bar.set_fraction((f64::from(*percent) / 100.0).clamp(0.0, 1.0));
                    bar.set_size_request(BAR_WIDTH, -1);
                    content.append(&bar);
                }
            }
        }

        self.place(frame.position, frame.align);
        self.window.set_child(Some(&content));
        self.window.set_visible(true);
        self.window.present();
        self.deadline = frame.timeout.map(|t| Instant::now() + t);
        debug!("overlay shown, deadline {:?}", frame.timeout);
        Ok(())
    }

    fn wait_until_hidden(&mut self) -> Result<(), GtkSurfaceError> {
        let ctx = glib::MainContext::default();

        // A timer source so a blocking iteration returns at the deadline.
        let fired = Rc::new(Cell::new(false));
        let timer = self.deadline.map(|deadline| {
            let fired = fired.clone();
            let left = deadline.saturating_duration_since(Instant::now());
            glib::timeout_add_local_once(left, move || fired.set(true))
        });

        loop {
            if self.hide.take() {
                debug!("overlay hidden early");
                break;
            }
            if fired.get() || self.deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
            ctx.iteration(true);
        }

        if let Some(timer) = timer {
            if !fired.get() {
                timer.remove();
            }
        }
        self.window.set_visible(false);
        self.deadline = None;
        Ok(())
    }

    fn destroy(&mut self) {
        self.window.set_child(None::<&gtk4::Widget>);
        self.window.set_visible(false);
        self.deadline = None;
    }

    fn hide_signal(&self) -> HideSignal {
        self.hide.clone()
    }
}

/// Stylesheet for one frame.  Font and colour are inserted verbatim:
/// GTK reports anything it cannot parse and keeps its defaults.
fn frame_css(frame: &Frame) -> String {
    let o = frame.shadow_offset;
    format!(
        r#"
window,
window.background {{
    background-color: transparent;
    background: none;
}}

.osd .osd-text {{
    font: {font};
    color: {color};
    text-shadow: {o}px {o}px 0 black;
}}

.osd .osd-bar trough {{
    min-height: 14px;
    background-color: transparent;
    border: none;
}}

.osd .osd-bar progress {{
    min-height: 14px;
    background-color: {color};
    border-radius: 0;
    box-shadow: {o}px {o}px 0 black;
}}
"#,
        font = frame.font,
        color = frame.color,
    )
}
