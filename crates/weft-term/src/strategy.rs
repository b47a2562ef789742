// SPDX-License-Identifier: MIT
//
// Render strategies: full repaint, differential, or an adaptive mix.
//
// A closed set, matched exhaustively. Each variant answers two questions:
// "do you want to handle this frame?" (`should_use`) and "render it"
// (`render`). Full and Differential are fixed policies; Smart watches churn
// and frame count and picks one of the two per frame.
//
// Periodic full repaints bound drift: if some write ever went missing, the
// terminal is resynced within `full_redraw_interval` frames.

use std::fmt;

use log::debug;

use crate::buffer::ScreenBuffer;
use crate::config::RenderConfig;
use crate::diff::{DiffRenderer, DiffStats};
use crate::double_buffer::change_percentage;
use crate::error::Result;
use crate::instruction::RenderInstruction;

// ─── StrategyKind ────────────────────────────────────────────────────────────

/// Which strategy to run, as chosen in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    Full,
    Differential,
    #[default]
    Smart,
}

impl StrategyKind {
    /// Parse `full`, `diff` / `differential` or `smart` (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Some(Self::Full),
            "diff" | "differential" => Some(Self::Differential),
            "smart" => Some(Self::Smart),
            _ => None,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Full => "full",
            Self::Differential => "differential",
            Self::Smart => "smart",
        })
    }
}

// ─── StrategyContext ─────────────────────────────────────────────────────────

/// Everything a strategy may consider when deciding how to render a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyContext {
    /// Nothing is known about the terminal's screen (first frame, or after
    /// a failed write or a resize).
    pub first_render: bool,
    /// Share of rows that changed, 0–100.
    pub change_percentage: f64,
    /// Frames rendered since the last full repaint.
    pub frames_since_full: u32,
    /// Whether partial updates are worth anything on this transport.
    pub partial_updates: bool,
    /// Churn above which a full repaint wins.
    pub full_redraw_threshold: f64,
    /// Frames after which a full repaint is forced.
    pub full_redraw_interval: u32,
}

impl StrategyContext {
    /// A context carrying `config`'s thresholds.
    #[must_use]
    pub const fn new(
        config: &RenderConfig,
        first_render: bool,
        change_percentage: f64,
        frames_since_full: u32,
    ) -> Self {
        Self {
            first_render,
            change_percentage,
            frames_since_full,
            partial_updates: config.partial_updates,
            full_redraw_threshold: config.full_redraw_threshold,
            full_redraw_interval: config.full_redraw_interval,
        }
    }

    /// Whether a full repaint is warranted for `churn` percent change after
    /// `frames` partial frames.
    fn wants_full(&self, churn: f64, frames: u32) -> bool {
        self.first_render
            || churn > self.full_redraw_threshold
            || frames >= self.full_redraw_interval
    }
}

// ─── RenderOutput ────────────────────────────────────────────────────────────

/// How a frame was actually rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    Full,
    Differential,
}

/// The product of one strategy run.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub instruction: RenderInstruction,
    pub stats: DiffStats,
    pub kind: RenderKind,
}

// ─── RenderStrategy ──────────────────────────────────────────────────────────

/// A rendering policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStrategy {
    /// Repaint everything, every frame.
    Full,
    /// Diff every frame unless the context rules it out.
    Differential,
    /// Pick per frame from measured churn and a frame counter of its own.
    Smart { frames_since_full: u32 },
}

impl RenderStrategy {
    #[must_use]
    pub const fn from_kind(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::Full => Self::Full,
            StrategyKind::Differential => Self::Differential,
            StrategyKind::Smart => Self::Smart {
                frames_since_full: 0,
            },
        }
    }

    #[must_use]
    pub const fn kind(&self) -> StrategyKind {
        match self {
            Self::Full => StrategyKind::Full,
            Self::Differential => StrategyKind::Differential,
            Self::Smart { .. } => StrategyKind::Smart,
        }
    }

    /// Whether this strategy is the right one for `ctx`.
    ///
    /// Full claims the frames where a repaint is due; Differential the ones
    /// where diffing is sound; Smart handles anything.
    #[must_use]
    pub fn should_use(&self, ctx: &StrategyContext) -> bool {
        match self {
            Self::Full => ctx.wants_full(ctx.change_percentage, ctx.frames_since_full),
            Self::Differential => {
                ctx.partial_updates
                    && !ctx.first_render
                    && ctx.change_percentage <= ctx.full_redraw_threshold
            }
            Self::Smart { .. } => true,
        }
    }

    /// Render the frame taking `front` to `back`.
    ///
    /// # Errors
    ///
    /// [`Error::DimensionMismatch`](crate::Error::DimensionMismatch) if the
    /// buffers differ in size and a diff was attempted.
    pub fn render(
        &mut self,
        ctx: &StrategyContext,
        renderer: &DiffRenderer,
        front: &ScreenBuffer,
        back: &ScreenBuffer,
    ) -> Result<RenderOutput> {
        let full = match self {
            Self::Full => true,
            Self::Differential => !self.should_use(ctx),
            Self::Smart { frames_since_full } => {
                let churn = change_percentage(front, back);
                let full = !ctx.partial_updates || ctx.wants_full(churn, *frames_since_full);
                debug!(
                    "smart: churn={churn:.1}% frames_since_full={frames_since_full} -> {}",
                    if full { "full" } else { "diff" }
                );
                if full {
                    *frames_since_full = 0;
                } else {
                    *frames_since_full += 1;
                }
                full
            }
        };

        if full {
            let (instruction, stats) = renderer.full(back);
            Ok(RenderOutput {
                instruction,
                stats,
                kind: RenderKind::Full,
            })
        } else {
            let (instruction, stats) = renderer.diff(front, back)?;
            Ok(RenderOutput {
                instruction,
                stats,
                kind: RenderKind::Differential,
            })
        }
    }
}

impl Default for RenderStrategy {
    fn default() -> Self {
        Self::from_kind(StrategyKind::default())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use pretty_assertions::assert_eq;

    fn ctx(first: bool, pct: f64, frames: u32) -> StrategyContext {
        StrategyContext::new(&RenderConfig::default(), first, pct, frames)
    }

    fn pair(w: u16, h: u16) -> (ScreenBuffer, ScreenBuffer) {
        (ScreenBuffer::new(w, h).unwrap(), ScreenBuffer::new(w, h).unwrap())
    }

    #[test]
    fn parse_kinds() {
        assert_eq!(StrategyKind::parse("FULL"), Some(StrategyKind::Full));
        assert_eq!(StrategyKind::parse("diff"), Some(StrategyKind::Differential));
        assert_eq!(StrategyKind::parse(" smart "), Some(StrategyKind::Smart));
        assert_eq!(StrategyKind::parse("fast"), None);
        assert_eq!(StrategyKind::Differential.to_string(), "differential");
    }

    #[test]
    fn full_claims_first_churn_and_interval() {
        let full = RenderStrategy::Full;
        assert!(full.should_use(&ctx(true, 0.0, 0)));
        assert!(full.should_use(&ctx(false, 70.1, 0)));
        assert!(!full.should_use(&ctx(false, 70.0, 0)));
        assert!(full.should_use(&ctx(false, 0.0, 60)));
        assert!(!full.should_use(&ctx(false, 10.0, 59)));
    }

    #[test]
    fn differential_declines_when_unsound() {
        let diff = RenderStrategy::Differential;
        assert!(diff.should_use(&ctx(false, 10.0, 0)));
        assert!(!diff.should_use(&ctx(true, 10.0, 0)));
        assert!(!diff.should_use(&ctx(false, 90.0, 0)));
        let mut no_partial = ctx(false, 10.0, 0);
        no_partial.partial_updates = false;
        assert!(!diff.should_use(&no_partial));
    }

    #[test]
    fn smart_always_applies() {
        let smart = RenderStrategy::default();
        assert_eq!(smart.kind(), StrategyKind::Smart);
        assert!(smart.should_use(&ctx(true, 100.0, 1000)));
    }

    #[test]
    fn full_strategy_always_repaints() {
        let (front, back) = pair(4, 2);
        let out = RenderStrategy::Full
            .render(&ctx(false, 0.0, 0), &DiffRenderer::default(), &front, &back)
            .unwrap();
        assert_eq!(out.kind, RenderKind::Full);
        assert_eq!(out.stats.changed_cells, 8);
    }

    #[test]
    fn differential_defers_to_full_on_first_render() {
        let (front, back) = pair(4, 2);
        let r = DiffRenderer::default();
        let mut s = RenderStrategy::Differential;
        assert_eq!(s.render(&ctx(true, 0.0, 0), &r, &front, &back).unwrap().kind, RenderKind::Full);
        assert_eq!(
            s.render(&ctx(false, 0.0, 0), &r, &front, &back).unwrap().kind,
            RenderKind::Differential
        );
    }

    #[test_log::test]
    fn smart_measures_churn_itself() {
        let (front, mut back) = pair(10, 4);
        let r = DiffRenderer::default();
        let mut s = RenderStrategy::default();
        // Context claims no churn; the buffers say otherwise.
        for y in 0..3 {
            back.set(0, y, Cell::new('#'));
        }
        let out = s.render(&ctx(false, 0.0, 0), &r, &front, &back).unwrap();
        assert_eq!(out.kind, RenderKind::Full);

        let (front, mut back) = pair(10, 4);
        back.set(0, 0, Cell::new('#'));
        let out = s.render(&ctx(false, 0.0, 0), &r, &front, &back).unwrap();
        assert_eq!(out.kind, RenderKind::Differential);
        assert_eq!(s, RenderStrategy::Smart { frames_since_full: 1 });
    }

    #[test]
    fn smart_resyncs_periodically() {
        let (front, back) = pair(4, 4);
        let r = DiffRenderer::default();
        let mut s = RenderStrategy::default();
        let c = ctx(false, 0.0, 0);
        let kinds: Vec<RenderKind> = (0..62)
            .map(|_| s.render(&c, &r, &front, &back).unwrap().kind)
            .collect();
        assert!(kinds[..60].iter().all(|k| *k == RenderKind::Differential));
        assert_eq!(kinds[60], RenderKind::Full);
        assert_eq!(kinds[61], RenderKind::Differential);
    }
}
