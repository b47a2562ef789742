// SPDX-License-Identifier: MIT
//
// DoubleBuffer: the front/back pair behind every frame.
//
// The front buffer mirrors what the terminal currently shows. The back
// buffer is where the next frame gets drawn. Rendering diffs back against
// front, ships the difference, then `swap()` exchanges the roles and clears
// the new back buffer for the next frame.
//
// Both buffers live in one array and a single index says which one is the
// front. Swapping flips the index; no cells move. Handing out `&mut` to the
// back buffer through `back_mut()` means no drawing borrow can outlive a
// swap: the borrow checker rejects it.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use log::trace;

use crate::buffer::ScreenBuffer;
use crate::error::Result;

/// How many recent swap intervals feed the running average.
const INTERVAL_WINDOW: usize = 10;

// ─── SwapStats ───────────────────────────────────────────────────────────────

/// Bookkeeping returned by every [`DoubleBuffer::swap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapStats {
    /// Swaps performed so far, this one included.
    pub count: u64,
    /// When this swap happened.
    pub last_swap: Option<Instant>,
    /// Mean of the last ten swap-to-swap intervals; `None` before the
    /// second swap.
    pub average_interval: Option<Duration>,
}

// ─── DoubleBuffer ────────────────────────────────────────────────────────────

/// Two equally sized [`ScreenBuffer`]s tagged front and back.
pub struct DoubleBuffer {
    buffers: [ScreenBuffer; 2],
    front: usize,
    swap_count: u64,
    last_swap: Option<Instant>,
    intervals: VecDeque<Duration>,
}

impl DoubleBuffer {
    /// Two untouched `width × height` buffers.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimensions`](crate::Error::InvalidDimensions) if
    /// either dimension is zero.
    pub fn new(width: u16, height: u16) -> Result<Self> {
        Ok(Self {
            buffers: [ScreenBuffer::new(width, height)?, ScreenBuffer::new(width, height)?],
            front: 0,
            swap_count: 0,
            last_swap: None,
            intervals: VecDeque::with_capacity(INTERVAL_WINDOW),
        })
    }

    /// What the terminal shows.
    #[inline]
    #[must_use]
    pub fn front(&self) -> &ScreenBuffer {
        &self.buffers[self.front]
    }

    /// The frame being drawn.
    #[inline]
    #[must_use]
    pub fn back(&self) -> &ScreenBuffer {
        &self.buffers[1 - self.front]
    }

    #[inline]
    pub fn back_mut(&mut self) -> &mut ScreenBuffer {
        &mut self.buffers[1 - self.front]
    }

    /// Both buffers at once: `(front, back)`.
    #[inline]
    #[must_use]
    pub fn pair(&self) -> (&ScreenBuffer, &ScreenBuffer) {
        (self.front(), self.back())
    }

    /// `(width, height)` shared by both buffers.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> (u16, u16) {
        self.buffers[0].size()
    }

    #[inline]
    #[must_use]
    pub const fn swap_count(&self) -> u64 {
        self.swap_count
    }

    /// Make the back buffer the front, then clear the new back buffer and
    /// reset its change tracking.
    pub fn swap(&mut self) -> SwapStats {
        self.front = 1 - self.front;
        let back = self.back_mut();
        back.clear();
        back.reset_dirty();

        let now = Instant::now();
        if let Some(prev) = self.last_swap {
            if self.intervals.len() == INTERVAL_WINDOW {
                self.intervals.pop_front();
            }
            self.intervals.push_back(now.duration_since(prev));
        }
        self.last_swap = Some(now);
        self.swap_count += 1;

        let stats = self.stats();
        trace!(
            "swap #{}: front={} avg_interval={:?}",
            stats.count, self.front, stats.average_interval
        );
        stats
    }

    /// Current swap bookkeeping without swapping.
    #[must_use]
    pub fn stats(&self) -> SwapStats {
        let average_interval = if self.intervals.is_empty() {
            None
        } else {
            let total: Duration = self.intervals.iter().sum();
            // Window length is at most INTERVAL_WINDOW.
            #[allow(clippy::cast_possible_truncation)]
            Some(total / self.intervals.len() as u32)
        };
        SwapStats {
            count: self.swap_count,
            last_swap: self.last_swap,
            average_interval,
        }
    }

    /// Resize both buffers in lockstep, keeping overlapping content.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimensions`](crate::Error::InvalidDimensions) if
    /// either dimension is zero; neither buffer changes.
    pub fn resize(&mut self, width: u16, height: u16) -> Result<()> {
        // The first call validates, so the second cannot fail halfway.
        self.buffers[0].resize(width, height, true)?;
        self.buffers[1].resize(width, height, true)
    }

    /// Seed the back buffer with the front buffer's content.
    ///
    /// Used to recover when the back buffer's content is lost or to draw
    /// incrementally on top of the last frame.
    pub fn sync_back_to_front(&mut self) {
        let (a, b) = self.buffers.split_at_mut(1);
        let (front, back) = if self.front == 0 {
            (&a[0], &mut b[0])
        } else {
            (&b[0], &mut a[0])
        };
        back.clone_from(front);
    }

    /// Share of rows that differ between back and front, 0–100.
    #[must_use]
    pub fn change_percentage(&self) -> f64 {
        change_percentage(self.front(), self.back())
    }
}

/// Share of rows whose contents differ between `front` and `back`, as a
/// percentage. A row counts whole even if one cell changed, so this
/// overestimates churn on sparse updates; it only has to be cheap enough
/// to decide between a full repaint and a diff. Mismatched sizes count as
/// 100.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn change_percentage(front: &ScreenBuffer, back: &ScreenBuffer) -> f64 {
    if front.size() != back.size() {
        return 100.0;
    }
    let height = front.height();
    let changed = (0..height).filter(|&y| front.row(y) != back.row(y)).count();
    changed as f64 * 100.0 / f64::from(height)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_pair_is_untouched_and_equal_sized() {
        let db = DoubleBuffer::new(8, 3).unwrap();
        assert_eq!(db.size(), (8, 3));
        assert_eq!(db.front().size(), db.back().size());
        assert_eq!(db.front().occupied(), 0);
        assert_eq!(db.swap_count(), 0);
        assert!(DoubleBuffer::new(0, 3).is_err());
    }

    #[test_log::test]
    fn swap_moves_back_to_front_and_clears_back() {
        let mut db = DoubleBuffer::new(5, 1).unwrap();
        db.back_mut().set(0, 0, Cell::new('X'));
        let stats = db.swap();

        assert_eq!(stats.count, 1);
        assert!(stats.last_swap.is_some());
        assert_eq!(stats.average_interval, None);
        assert_eq!(db.front().get(0, 0).map(|c| c.symbol.as_str()), Some("X"));
        assert!(db.back().get(0, 0).is_none());
        assert_eq!(db.back().occupied(), 0);
        assert!(db.back().dirty_region().is_none());
    }

    #[test]
    fn average_interval_appears_after_second_swap() {
        let mut db = DoubleBuffer::new(2, 2).unwrap();
        db.swap();
        let stats = db.swap();
        assert_eq!(stats.count, 2);
        assert!(stats.average_interval.is_some());
    }

    #[test]
    fn interval_window_is_bounded() {
        let mut db = DoubleBuffer::new(2, 2).unwrap();
        for _ in 0..25 {
            db.swap();
        }
        assert_eq!(db.intervals.len(), INTERVAL_WINDOW);
        assert_eq!(db.stats().count, 25);
    }

    #[test]
    fn resize_keeps_both_in_lockstep() {
        let mut db = DoubleBuffer::new(4, 4).unwrap();
        db.back_mut().set(1, 1, Cell::new('b'));
        db.swap();
        db.back_mut().set(2, 2, Cell::new('c'));
        db.resize(10, 6).unwrap();

        assert_eq!(db.front().size(), (10, 6));
        assert_eq!(db.back().size(), (10, 6));
        assert!(db.front().get(1, 1).is_some());
        assert!(db.back().get(2, 2).is_some());
        assert!(db.resize(0, 0).is_err());
        assert_eq!(db.size(), (10, 6));
    }

    #[test]
    fn sync_back_to_front_copies_content() {
        let mut db = DoubleBuffer::new(3, 3).unwrap();
        db.back_mut().set(0, 2, Cell::new('s'));
        db.swap();
        assert!(db.back().get(0, 2).is_none());
        db.sync_back_to_front();
        assert_eq!(db.back().get(0, 2), db.front().get(0, 2));
        assert_eq!(db.change_percentage(), 0.0);
    }

    #[test]
    fn change_percentage_counts_rows() {
        let mut db = DoubleBuffer::new(10, 4).unwrap();
        assert_eq!(db.change_percentage(), 0.0);
        db.back_mut().set(0, 0, Cell::new('a'));
        db.back_mut().set(9, 0, Cell::new('b'));
        db.back_mut().set(5, 2, Cell::new('c'));
        assert_eq!(db.change_percentage(), 50.0);
    }

    #[test]
    fn mismatched_sizes_are_full_churn() {
        let a = ScreenBuffer::new(2, 2).unwrap();
        let b = ScreenBuffer::new(3, 2).unwrap();
        assert_eq!(change_percentage(&a, &b), 100.0);
    }
}
