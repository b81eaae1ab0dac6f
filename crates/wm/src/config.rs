// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

use crate::client::FocusOverride;
use crate::geom::FrameExtents;

/// Reparenting window manager for X11 displays.
#[derive(Debug, Clone, Parser)]
#[command(name = "casement", version, about)]
pub struct Config {
    /// Display backend (loopback, or a display name handled by an external
    /// adapter).
    #[arg(long, env = "CASEMENT_BACKEND", default_value = "loopback")]
    pub backend: String,

    /// Number of workspaces.
    #[arg(long, env = "CASEMENT_DESKTOPS", default_value = "4")]
    pub desktops: u32,

    /// Workspace names, comma separated; padded with numbers when short.
    #[arg(long, env = "CASEMENT_DESKTOP_NAMES", value_delimiter = ',')]
    pub desktop_names: Vec<String>,

    /// Frame border width in pixels.
    #[arg(long, env = "CASEMENT_BORDER_WIDTH", default_value = "1")]
    pub border_width: u32,

    /// Title bar height in pixels.
    #[arg(long, env = "CASEMENT_TITLE_HEIGHT", default_value = "18")]
    pub title_height: u32,

    /// Bottom resize handle height in pixels.
    #[arg(long, env = "CASEMENT_HANDLE_HEIGHT", default_value = "4")]
    pub handle_height: u32,

    /// Raise a window when it takes focus.
    #[arg(
        long,
        env = "CASEMENT_FOCUS_RAISE",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub focus_raise: bool,

    /// Focus policy for newly mapped windows (auto, always, never).
    #[arg(long, env = "CASEMENT_FOCUS_NEW", default_value = "auto")]
    pub focus_new: String,

    /// Path to a JSON window-rules file.
    #[arg(long, env = "CASEMENT_RULES")]
    pub rules: Option<PathBuf>,

    /// Pidfile used by the control flags.
    #[arg(long, env = "CASEMENT_PIDFILE")]
    pub pidfile: Option<PathBuf>,

    /// Maximum number of managed clients.
    #[arg(long, env = "CASEMENT_CLIENT_CAPACITY", default_value = "4096")]
    pub client_capacity: usize,

    /// Events ingested per tick before yielding to processing.
    #[arg(long, env = "CASEMENT_EVENT_BUDGET", default_value = "512")]
    pub event_budget: usize,

    /// Replies drained per tick.
    #[arg(long, env = "CASEMENT_REPLY_BUDGET", default_value = "64")]
    pub reply_budget: usize,

    /// Reply deadline in seconds.
    #[arg(long, env = "CASEMENT_REPLY_TIMEOUT", default_value = "5")]
    pub reply_timeout: u64,

    /// Log format (json or text).
    #[arg(long, env = "CASEMENT_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "CASEMENT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Ask a running instance to reload its rules, then exit.
    #[arg(long)]
    pub reconfigure: bool,

    /// Ask a running instance to re-exec itself, then exit.
    #[arg(long)]
    pub restart: bool,

    /// Ask a running instance to shut down, then exit.
    #[arg(long)]
    pub exit: bool,
}

impl Default for Config {
    fn default() -> Self {
        // Defaults come from the clap attributes; parsing an empty command
        // line is the one place they are all spelled out.
        Self::parse_from::<_, &str>([])
    }
}

/// A window rule matched against `WM_CLASS` at adoption time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WindowRule {
    pub class: Option<String>,
    pub instance: Option<String>,
    #[serde(default)]
    pub focus: Option<FocusOverride>,
    pub desktop: Option<u32>,
    #[serde(default)]
    pub undecorated: bool,
}

impl WindowRule {
    pub fn matches(&self, class: &str, instance: &str) -> bool {
        let class_ok = self.class.as_deref().map_or(true, |c| c.eq_ignore_ascii_case(class));
        let inst_ok =
            self.instance.as_deref().map_or(true, |i| i.eq_ignore_ascii_case(instance));
        (self.class.is_some() || self.instance.is_some()) && class_ok && inst_ok
    }
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> Result<(), crate::error::WmError> {
        use crate::error::WmError;
        if self.desktops == 0 {
            return Err(WmError::Config("--desktops must be at least 1".into()));
        }
        if self.desktop_names.len() > self.desktops as usize {
            return Err(WmError::Config("more desktop names than desktops".into()));
        }
        if !matches!(self.focus_new.as_str(), "auto" | "always" | "never") {
            return Err(WmError::Config(format!("unknown focus policy: {}", self.focus_new)));
        }
        if !matches!(self.log_format.as_str(), "json" | "text") {
            return Err(WmError::Config(format!("unknown log format: {}", self.log_format)));
        }
        let controls = [self.reconfigure, self.restart, self.exit];
        if controls.iter().filter(|c| **c).count() > 1 {
            return Err(WmError::Config(
                "--reconfigure, --restart and --exit are mutually exclusive".into(),
            ));
        }
        Ok(())
    }

    pub fn focus_new_policy(&self) -> FocusOverride {
        match self.focus_new.as_str() {
            "always" => FocusOverride::Always,
            "never" => FocusOverride::Never,
            _ => FocusOverride::Auto,
        }
    }

    /// Desktop names padded to the configured count.
    pub fn desktop_name_list(&self) -> Vec<String> {
        let mut names = self.desktop_names.clone();
        for i in names.len()..self.desktops as usize {
            names.push(format!("{}", i + 1));
        }
        names.truncate(self.desktops as usize);
        names
    }

    /// Decoration thickness for a decorated client.
    pub fn extents(&self, undecorated: bool) -> FrameExtents {
        if undecorated {
            return FrameExtents::default();
        }
        let bw = self.border_width;
        FrameExtents {
            left: bw,
            right: bw,
            top: self.title_height + bw,
            bottom: self.handle_height.max(bw),
        }
    }

    /// Load window rules from the configured path; a missing path is an
    /// empty rule set, a malformed file is a config error.
    pub fn load_rules(&self) -> Result<Vec<WindowRule>, crate::error::WmError> {
        let Some(ref path) = self.rules else { return Ok(Vec::new()) };
        let contents = std::fs::read_to_string(path)
            .map_err(|e| crate::error::WmError::Config(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&contents)
            .map_err(|e| crate::error::WmError::Config(format!("rules file: {e}")))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
