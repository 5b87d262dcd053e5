//! Application configuration.
//!
//! Loaded from `$XDG_CONFIG_HOME/osd-tac/config.json` (or the path given
//! with `--config`).  Every key is optional; command-line flags override
//! whatever the file sets.
//!
//! # Example
//!
//! ```json
//! {
//!   "socket_path": "/run/user/1000/osd-tac.sock",
//!   "label": "VOLUME",
//!   "color": "orange",
//!   "timeout_secs": 3,
//!   "show_progress_line": true,
//!   "surface": "gtk",
//!   "layout": { "shadow_offset": 2, "align": "center", "position": "bottom" }
//! }
//! ```

use crate::request::{
    DisplayRequest, DEFAULT_COLOR, DEFAULT_FONT, DEFAULT_LABEL, DEFAULT_TIMEOUT_SECS,
};
use crate::surface::SurfaceKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
///
/// A minimal `{}` file is valid; every field falls back to its compiled-in
/// default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rendezvous socket.  `None` means [`default_socket_path`].
    pub socket_path: Option<PathBuf>,
    pub label: String,
    pub font: String,
    pub color: String,
    pub timeout_secs: i32,
    pub show_progress_line: bool,
    /// Remove a socket file nobody is listening on and become the server.
    pub reclaim_stale: bool,
    pub surface: SurfaceKind,
    pub layout: Layout,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: None,
            label: DEFAULT_LABEL.into(),
            font: DEFAULT_FONT.into(),
            color: DEFAULT_COLOR.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            show_progress_line: false,
            reclaim_stale: false,
            surface: SurfaceKind::default(),
            layout: Layout::default(),
        }
    }
}

/// Horizontal text alignment inside the overlay, and the screen edge the
/// overlay hugs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    #[default]
    Center,
    Right,
}

/// Vertical position of the overlay on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Top,
    #[default]
    Middle,
    Bottom,
}

/// Surface layout that does not travel with a request: it belongs to the
/// server instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Drop-shadow offset in pixels.
    pub shadow_offset: i32,
    pub align: Align,
    pub position: Position,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            shadow_offset: 5,
            align: Align::Center,
            position: Position::Middle,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// The request this invocation sends when no flag overrides a field.
    pub fn base_request(&self) -> DisplayRequest {
        DisplayRequest {
            progress: 0,
            timeout_secs: self.timeout_secs,
            show_progress_line: self.show_progress_line,
            label: self.label.clone(),
            font: self.font.clone(),
            color: self.color.clone(),
        }
    }

    pub fn socket_path(&self) -> PathBuf {
        self.socket_path.clone().unwrap_or_else(default_socket_path)
    }
}

/// `$XDG_RUNTIME_DIR/osd-tac.sock`, or `/tmp/osd-tac.sock` without a
/// runtime directory.
pub fn default_socket_path() -> PathBuf {
    let runtime = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(runtime).join("osd-tac.sock")
}

/// Resolve the config directory (`$XDG_CONFIG_HOME/osd-tac`).
pub fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    PathBuf::from(base).join("osd-tac")
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_full_config() {
        let json = r#"{
            "socket_path": "/tmp/custom.sock",
            "label": "VOLUME",
            "font": "12px sans",
            "color": "orange",
            "timeout_secs": 5,
            "show_progress_line": true,
            "reclaim_stale": true,
            "surface": "console",
            "layout": { "shadow_offset": 1, "align": "right", "position": "top" }
        }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.socket_path(), PathBuf::from("/tmp/custom.sock"));
        assert_eq!(cfg.label, "VOLUME");
        assert_eq!(cfg.timeout_secs, 5);
        assert!(cfg.show_progress_line);
        assert!(cfg.reclaim_stale);
        assert_eq!(cfg.surface, SurfaceKind::Console);
        assert_eq!(cfg.layout.shadow_offset, 1);
        assert_eq!(cfg.layout.align, Align::Right);
        assert_eq!(cfg.layout.position, Position::Top);
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        let req = cfg.base_request();
        assert_eq!(req, DisplayRequest::default());
        assert!(!cfg.reclaim_stale);
        assert_eq!(cfg.surface, SurfaceKind::Gtk);
        assert_eq!(cfg.layout, Layout::default());
    }

    #[test]
    fn deserialize_partial_layout() {
        let cfg: Config = serde_json::from_str(r#"{ "layout": { "position": "bottom" } }"#).unwrap();
        assert_eq!(cfg.layout.position, Position::Bottom);
        assert_eq!(cfg.layout.shadow_offset, 5);
        assert_eq!(cfg.layout.align, Align::Center);
    }

    #[test]
    fn unknown_top_level_keys_ignored() {
        let json = r#"{ "label": "X", "future_section": { "key": 42 } }"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.label, "X");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Config::load(Path::new("/nonexistent/osd-tac/config.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
