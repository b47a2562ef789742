// SPDX-License-Identifier: MIT
//
// Renderer: drives one frame from back buffer to terminal.
//
//   1. Build a strategy context (first render? churn? frames since full?).
//   2. Let the configured strategy produce a render instruction.
//   3. Optionally wrap it in synchronized output.
//   4. Encode into the OutputBuffer and hand it to the writer in one write.
//   5. Swap the double buffer.
//
// If the write fails, the swap is skipped: the front buffer no longer
// describes the screen with any confidence, so the next frame is forced to
// a full repaint. The error goes back to the caller; nothing is retried.

use std::io::Write;

use log::{debug, warn};

use crate::config::RenderConfig;
use crate::diff::{DiffRenderer, DiffStats};
use crate::double_buffer::{DoubleBuffer, SwapStats};
use crate::error::Result;
use crate::instruction::Control;
use crate::output::OutputBuffer;
use crate::strategy::{RenderKind, RenderStrategy, StrategyContext};

/// What one [`Renderer::render_frame`] call did.
#[derive(Debug, Clone, Copy)]
pub struct FrameReport {
    pub kind: RenderKind,
    pub stats: DiffStats,
    pub swap: SwapStats,
    /// Bytes handed to the writer, synchronization markers included.
    pub bytes_written: usize,
}

/// Frame driver: owns the strategy, the encoder and the output buffer.
pub struct Renderer {
    config: RenderConfig,
    strategy: RenderStrategy,
    diff: DiffRenderer,
    output: OutputBuffer,
    first_render: bool,
    frames_since_full: u32,
}

impl Renderer {
    #[must_use]
    pub fn new(config: RenderConfig) -> Self {
        Self {
            strategy: RenderStrategy::from_kind(config.strategy),
            diff: DiffRenderer::new(config.color_depth),
            output: OutputBuffer::new(),
            first_render: true,
            frames_since_full: 0,
            config,
        }
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &RenderConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub const fn strategy(&self) -> RenderStrategy {
        self.strategy
    }

    /// Switch strategies. Takes effect on the next frame.
    pub const fn set_strategy(&mut self, strategy: RenderStrategy) {
        self.config.strategy = strategy.kind();
        self.strategy = strategy;
    }

    /// Forget what the terminal shows; the next frame repaints in full.
    /// Call after a resize or anything else that scribbled on the screen.
    pub const fn invalidate(&mut self) {
        self.first_render = true;
    }

    /// Render the back buffer of `buffers` to `out`, then swap.
    ///
    /// After a failed write the back buffer still holds the failed frame,
    /// so calling again retries it as a full repaint. A caller that paints
    /// the next frame from scratch instead must clear the back buffer
    /// first, or the old cells show through.
    ///
    /// # Errors
    ///
    /// [`Error::Io`](crate::Error::Io) if writing fails (no swap happens and
    /// the next frame repaints in full), or
    /// [`Error::DimensionMismatch`](crate::Error::DimensionMismatch) from the
    /// diff.
    pub fn render_frame(
        &mut self,
        buffers: &mut DoubleBuffer,
        out: &mut impl Write,
    ) -> Result<FrameReport> {
        let ctx = StrategyContext::new(
            &self.config,
            self.first_render,
            buffers.change_percentage(),
            self.frames_since_full,
        );
        let (front, back) = buffers.pair();
        let mut rendered = self.strategy.render(&ctx, &self.diff, front, back)?;

        if self.config.synchronized_output && !rendered.instruction.is_empty() {
            rendered.instruction.wrap(Control::BeginSync, Control::EndSync);
        }

        self.output.clear();
        rendered.instruction.write_to(&mut self.output)?;
        let bytes_written = self.output.len();
        if let Err(err) = self.output.flush_to(out) {
            warn!("frame write failed after {bytes_written} bytes queued: {err}");
            self.output.clear();
            self.first_render = true;
            return Err(err.into());
        }

        match rendered.kind {
            RenderKind::Full => self.frames_since_full = 0,
            RenderKind::Differential => self.frames_since_full += 1,
        }
        self.first_render = false;
        let swap = buffers.swap();

        let stats = rendered.stats;
        debug!(
            "frame #{}: {:?} changed={}/{} runs={} styles={} moves={} bytes={} in {:?}",
            swap.count,
            rendered.kind,
            stats.changed_cells,
            stats.total_cells,
            stats.runs,
            stats.style_changes,
            stats.cursor_moves,
            bytes_written,
            stats.elapsed,
        );

        Ok(FrameReport {
            kind: rendered.kind,
            stats,
            swap,
            bytes_written,
        })
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
