//! Command-line flags.
//!
//! Short options match the classic `osd_tac` letters (`-t -f -c -p -T -P`)
//! so existing key bindings keep working.

use crate::config::Config;
use crate::coordinator::Options;
use crate::surface::SurfaceKind;
use clap::Parser;
use std::path::PathBuf;

/// Show a progress OSD.  The first invocation displays it; later
/// invocations update the one already on screen.
#[derive(Debug, Parser)]
#[command(name = "osd-tac", version, about)]
pub struct Cli {
    /// Text above the progress bar.
    #[arg(short = 't', long = "text")]
    pub text: Option<String>,

    /// Font (CSS font shorthand, e.g. "bold 18px monospace").
    #[arg(short = 'f', long)]
    pub font: Option<String>,

    /// Colour of the text and progress bar.
    #[arg(short = 'c', long)]
    pub color: Option<String>,

    /// Progress to show (0..100).  Not clamped.
    #[arg(short = 'p', long, allow_negative_numbers = true)]
    pub progress: Option<i32>,

    /// Seconds before the OSD hides itself (0 or less: never).
    #[arg(short = 'T', long, allow_negative_numbers = true)]
    pub timeout: Option<i32>,

    /// Show the percentage as text under the progress bar.
    #[arg(short = 'P', long = "show-percentage")]
    pub show_percentage: bool,

    /// Rendezvous socket path.
    #[arg(short = 's', long, env = "OSD_TAC_SOCKET")]
    pub socket: Option<PathBuf>,

    /// Configuration file (default: $XDG_CONFIG_HOME/osd-tac/config.json).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Render as text on stderr instead of an on-screen overlay.
    #[arg(long)]
    pub console: bool,

    /// Take over a socket file left behind by a dead server.
    #[arg(long)]
    pub reclaim_stale: bool,

    /// Verbose logging.
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Merge flags over `config`.
    pub fn options(&self, config: &Config) -> Options {
        let mut request = config.base_request();
        if let Some(text) = &self.text {
            request.label = text.clone();
        }
        if let Some(font) = &self.font {
            request.font = font.clone();
        }
        if let Some(color) = &self.color {
            request.color = color.clone();
        }
        if let Some(progress) = self.progress {
            request.progress = progress;
        }
        if let Some(timeout) = self.timeout {
            request.timeout_secs = timeout;
        }
        request.show_progress_line |= self.show_percentage;

        Options {
            socket_path: self.socket.clone().unwrap_or_else(|| config.socket_path()),
            request,
            layout: config.layout,
            reclaim_stale: self.reclaim_stale || config.reclaim_stale,
        }
    }

    pub fn surface_kind(&self, config: &Config) -> SurfaceKind {
        if self.console {
            SurfaceKind::Console
        } else {
            config.surface
        }
    }
}
