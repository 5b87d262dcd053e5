//! Text surface that writes each frame to a byte sink (stderr by default).
//!
//! Used when the GTK surface is unavailable or disabled with `--console`.
//! The layout fields that only make sense on screen (font, colour,
//! shadow, position) are ignored; alignment is applied by padding.

use crate::config::Align;
use crate::surface::HideSignal;
use crate::traits::{Frame, Line, Surface};
use std::io::{self, Write};
use std::time::Duration;

const BAR_WIDTH: usize = 30;

pub struct ConsoleSurface<W: Write> {
    out: W,
    hide: HideSignal,
    timeout: Option<Duration>,
    visible: bool,
}

impl ConsoleSurface<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> ConsoleSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            hide: HideSignal::new(),
            timeout: None,
            visible: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Surface for ConsoleSurface<W> {
    type Error = io::Error;

    fn show(&mut self, frame: &Frame) -> io::Result<()> {
        for line in &frame.lines {
            let text = match line {
                Line::Text(t) => t.clone(),
                Line::Percentage(p) => progress_bar(*p),
            };
            writeln!(self.out, "{}", aligned(&text, frame.align))?;
        }
        self.out.flush()?;
        self.timeout = frame.timeout;
        self.visible = true;
        Ok(())
    }

    fn wait_until_hidden(&mut self) -> io::Result<()> {
        if self.visible {
            self.hide.wait(self.timeout);
            self.visible = false;
        }
        Ok(())
    }

    fn destroy(&mut self) {
        self.visible = false;
        self.timeout = None;
    }

    fn hide_signal(&self) -> HideSignal {
        self.hide.clone()
    }
}

/// `[#########.....................]` for a percentage, clamped for drawing.
fn progress_bar(percent: i32) -> String {
    let filled = (percent.clamp(0, 100) as usize * BAR_WIDTH) / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

fn aligned(text: &str, align: Align) -> String {
    let width = BAR_WIDTH + 2;
    match align {
        Align::Left => text.to_string(),
        Align::Center => format!("{:^width$}", text),
        Align::Right => format!("{:>width$}", text),
    }
}
