// SPDX-License-Identifier: MIT
//
// Configuration: plain structs with defaults, plus environment overrides.
//
// Every knob has a default that works on a modern terminal. The caller (or
// whoever detects terminal capabilities) overrides fields directly; the
// `WEFT_*` environment variables exist for poking at a running app without
// recompiling:
//
//   WEFT_STRATEGY            full | diff | smart
//   WEFT_COLOR_DEPTH         16 | 256 | truecolor
//   WEFT_ESCAPE_TIMEOUT_MS   milliseconds to wait after a lone ESC
//
// Unparseable values are ignored with a warning; they never fail startup.

use std::time::Duration;

use log::warn;

use crate::color::ColorDepth;
use crate::strategy::StrategyKind;

pub const ENV_STRATEGY: &str = "WEFT_STRATEGY";
pub const ENV_COLOR_DEPTH: &str = "WEFT_COLOR_DEPTH";
pub const ENV_ESCAPE_TIMEOUT_MS: &str = "WEFT_ESCAPE_TIMEOUT_MS";

// ─── RenderConfig ────────────────────────────────────────────────────────────

/// How frames get to the terminal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    pub strategy: StrategyKind,
    /// Row churn (percent) above which a full repaint beats a diff.
    pub full_redraw_threshold: f64,
    /// Force a full repaint after this many partial frames.
    pub full_redraw_interval: u32,
    /// Whether partial updates help on this transport.
    pub partial_updates: bool,
    /// Wrap frames in DEC 2026 synchronized output.
    pub synchronized_output: bool,
    /// Colors beyond this depth are downgraded before encoding.
    pub color_depth: ColorDepth,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Smart,
            full_redraw_threshold: 70.0,
            full_redraw_interval: 60,
            partial_updates: true,
            synchronized_output: true,
            color_depth: ColorDepth::TrueColor,
        }
    }
}

// ─── InputConfig ─────────────────────────────────────────────────────────────

/// Input parser limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputConfig {
    /// How long an incomplete escape sequence may wait for more bytes
    /// before it is flushed as literal keys.
    pub escape_timeout: Duration,
    /// Paste bytes held while waiting for the closing marker. Past this,
    /// what has arrived so far is emitted as its own paste event.
    pub max_paste_bytes: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            escape_timeout: Duration::from_millis(50),
            max_paste_bytes: 1 << 20,
        }
    }
}

// ─── LoopConfig ──────────────────────────────────────────────────────────────

/// Event loop timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Longest the loop sleeps waiting for input before ticking the app.
    pub tick_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_micros(16_667), // 60 Hz
        }
    }
}

// ─── Config ──────────────────────────────────────────────────────────────────

/// All configuration in one place.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Config {
    pub render: RenderConfig,
    pub input: InputConfig,
    pub event_loop: LoopConfig,
}

impl Config {
    /// Defaults with `WEFT_*` environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(ENV_STRATEGY) {
            match StrategyKind::parse(&raw) {
                Some(kind) => self.render.strategy = kind,
                None => warn!("ignoring {ENV_STRATEGY}={raw:?}: expected full, diff or smart"),
            }
        }
        if let Some(raw) = lookup(ENV_COLOR_DEPTH) {
            match ColorDepth::parse(&raw) {
                Some(depth) => self.render.color_depth = depth,
                None => warn!("ignoring {ENV_COLOR_DEPTH}={raw:?}: expected 16, 256 or truecolor"),
            }
        }
        if let Some(raw) = lookup(ENV_ESCAPE_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.input.escape_timeout = Duration::from_millis(ms),
                Err(err) => warn!("ignoring {ENV_ESCAPE_TIMEOUT_MS}={raw:?}: {err}"),
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.render.strategy, StrategyKind::Smart);
        assert_eq!(c.render.full_redraw_threshold, 70.0);
        assert_eq!(c.render.full_redraw_interval, 60);
        assert!(c.render.partial_updates);
        assert!(c.render.synchronized_output);
        assert_eq!(c.render.color_depth, ColorDepth::TrueColor);
        assert_eq!(c.input.escape_timeout, Duration::from_millis(50));
    }

    #[test]
    fn overrides_apply() {
        let mut c = Config::default();
        c.apply_overrides(lookup(&[
            (ENV_STRATEGY, "diff"),
            (ENV_COLOR_DEPTH, "256"),
            (ENV_ESCAPE_TIMEOUT_MS, "25"),
        ]));
        assert_eq!(c.render.strategy, StrategyKind::Differential);
        assert_eq!(c.render.color_depth, ColorDepth::Ansi256);
        assert_eq!(c.input.escape_timeout, Duration::from_millis(25));
    }

    #[test_log::test]
    fn bad_overrides_are_ignored() {
        let mut c = Config::default();
        c.apply_overrides(lookup(&[
            (ENV_STRATEGY, "turbo"),
            (ENV_COLOR_DEPTH, "million"),
            (ENV_ESCAPE_TIMEOUT_MS, "-3"),
        ]));
        assert_eq!(c, Config::default());
    }

    #[test]
    fn missing_overrides_leave_defaults() {
        let mut c = Config::default();
        c.apply_overrides(|_| None);
        assert_eq!(c, Config::default());
    }
}
