// SPDX-License-Identifier: MIT
//
// ScreenBuffer: the 2D cell grid that every frame is drawn into.
//
// Design:
//
//   - Flat `Vec<Option<Cell>>`, row-major, `index = y * width + x`. A row is
//     contiguous, so the renderer's left-to-right scan is a linear walk and
//     whole-row equality is one slice compare.
//
//   - `None` means untouched. It is *not* the same as an explicit space:
//     writing a space into an untouched slot is a change (it grows the dirty
//     region and the occupied count) even though the screen looks the same.
//     Callers rely on this, so it stays.
//
//   - Change tracking is one bounding rectangle kept as four integers, plus a
//     running count of occupied slots. Both update in O(1) per write.
//
// Memory: 200×50 = 10,000 slots × 28 bytes ≈ 280 KB per buffer.

use crate::cell::Cell;
use crate::error::{Error, Result};

// ─── Rect ────────────────────────────────────────────────────────────────────

/// A rectangle in cell coordinates.
///
/// Origin is signed so callers can describe regions that start off-screen
/// (scrolled content); intersecting with the buffer bounds clips them.
///
/// ```
/// use weft_term::buffer::Rect;
///
/// let r = Rect::new(10, 5, 80, 24);
/// assert!(r.contains(10, 5));
/// assert!(r.contains(89, 28));
/// assert!(!r.contains(90, 5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// Left edge (may be negative).
    pub x: i32,
    /// Top edge (may be negative).
    pub y: i32,
    /// Width in columns.
    pub width: u16,
    /// Height in rows.
    pub height: u16,
}

impl Rect {
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }

    /// Right edge, exclusive.
    #[inline]
    #[must_use]
    pub const fn right(self) -> i32 {
        self.x + self.width as i32
    }

    /// Bottom edge, exclusive.
    #[inline]
    #[must_use]
    pub const fn bottom(self) -> i32 {
        self.y + self.height as i32
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of cells covered.
    #[inline]
    #[must_use]
    pub const fn area(self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Overlap of two rectangles; an empty rect (at the later origin) when
    /// they do not meet.
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 > x1 && y2 > y1 {
            // Both spans are bounded by an input's u16 extent.
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            Self::new(x1, y1, (x2 - x1) as u16, (y2 - y1) as u16)
        } else {
            Self::new(x1, y1, 0, 0)
        }
    }

    /// Shrink by `n` cells on every side.
    #[must_use]
    pub fn inset(self, n: u16) -> Self {
        Self::new(
            self.x + i32::from(n),
            self.y + i32::from(n),
            self.width.saturating_sub(n.saturating_mul(2)),
            self.height.saturating_sub(n.saturating_mul(2)),
        )
    }
}

// ─── DirtyRegion ─────────────────────────────────────────────────────────────

/// Bounding box of every coordinate changed since the last tracking reset.
///
/// `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRegion {
    pub left: u16,
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
}

impl DirtyRegion {
    const fn point(x: u16, y: u16) -> Self {
        Self {
            left: x,
            top: y,
            right: x + 1,
            bottom: y + 1,
        }
    }

    const fn full(width: u16, height: u16) -> Self {
        Self {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        }
    }

    fn include(&mut self, x: u16, y: u16) {
        self.left = self.left.min(x);
        self.top = self.top.min(y);
        self.right = self.right.max(x + 1);
        self.bottom = self.bottom.max(y + 1);
    }

    #[must_use]
    pub const fn width(&self) -> u16 {
        self.right - self.left
    }

    #[must_use]
    pub const fn height(&self) -> u16 {
        self.bottom - self.top
    }

    #[must_use]
    pub const fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

// ─── CellChange ──────────────────────────────────────────────────────────────

/// One differing slot reported by [`ScreenBuffer::compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellChange {
    pub x: u16,
    pub y: u16,
    /// Slot content in `self`.
    pub old: Option<Cell>,
    /// Slot content in the other buffer.
    pub new: Option<Cell>,
}

// ─── ScreenBuffer ────────────────────────────────────────────────────────────

/// A `width × height` grid of optional cells with change tracking.
///
/// ```
/// use weft_term::buffer::ScreenBuffer;
/// use weft_term::cell::Cell;
///
/// let mut buf = ScreenBuffer::new(80, 24)?;
/// assert!(buf.set(5, 3, Cell::new('X')));
/// assert_eq!(buf.get(5, 3).map(|c| c.symbol.as_str()), Some("X"));
/// assert!(buf.get(6, 3).is_none());
/// # Ok::<(), weft_term::Error>(())
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ScreenBuffer {
    width: u16,
    height: u16,
    cells: Vec<Option<Cell>>,
    dirty: Option<DirtyRegion>,
    occupied: usize,
}

impl ScreenBuffer {
    /// An untouched buffer.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimensions`] if either dimension is zero.
    pub fn new(width: u16, height: u16) -> Result<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            cells: vec![None; usize::from(width) * usize::from(height)],
            dirty: None,
            occupied: 0,
        })
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// `(width, height)`.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Total slot count.
    #[inline]
    #[must_use]
    pub fn area(&self) -> usize {
        self.cells.len()
    }

    /// The full extent as a [`Rect`].
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub const fn in_bounds(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    #[inline]
    const fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// The cell at `(x, y)`; `None` when untouched or out of bounds.
    #[inline]
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if self.in_bounds(x, y) {
            self.cells[self.index(x, y)].as_ref()
        } else {
            None
        }
    }

    /// One row of slots, or `None` past the last row.
    #[inline]
    #[must_use]
    pub fn row(&self, y: u16) -> Option<&[Option<Cell>]> {
        if y < self.height {
            let start = self.index(0, y);
            Some(&self.cells[start..start + usize::from(self.width)])
        } else {
            None
        }
    }

    /// Every slot, row-major.
    #[inline]
    #[must_use]
    pub fn slots(&self) -> &[Option<Cell>] {
        &self.cells
    }

    /// Number of occupied (`Some`) slots.
    #[inline]
    #[must_use]
    pub const fn occupied(&self) -> usize {
        self.occupied
    }

    /// Bounding box of changes since the last [`reset_dirty`](Self::reset_dirty).
    #[inline]
    #[must_use]
    pub const fn dirty_region(&self) -> Option<DirtyRegion> {
        self.dirty
    }

    /// Forget accumulated changes.
    #[inline]
    pub const fn reset_dirty(&mut self) {
        self.dirty = None;
    }

    // ─── Mutation ────────────────────────────────────────────────────────

    /// Store `cell` at `(x, y)`.
    ///
    /// Returns `false`, touching neither the dirty region nor the occupied
    /// count, when the position is out of bounds or the slot already holds
    /// a structurally equal cell.
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) -> bool {
        self.replace(x, y, Some(cell))
    }

    /// Make `(x, y)` untouched again. Same return contract as [`set`](Self::set).
    pub fn clear_cell(&mut self, x: u16, y: u16) -> bool {
        self.replace(x, y, None)
    }

    fn replace(&mut self, x: u16, y: u16, value: Option<Cell>) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        let idx = self.index(x, y);
        let slot = &mut self.cells[idx];
        if *slot == value {
            return false;
        }
        match (slot.is_some(), value.is_some()) {
            (false, true) => self.occupied += 1,
            (true, false) => self.occupied -= 1,
            _ => {}
        }
        *slot = value;
        self.mark(x, y);
        true
    }

    fn mark(&mut self, x: u16, y: u16) {
        match &mut self.dirty {
            Some(region) => region.include(x, y),
            None => self.dirty = Some(DirtyRegion::point(x, y)),
        }
    }

    /// Make every slot untouched.
    ///
    /// The dirty region becomes the full extent. An already-empty buffer
    /// skips the sweep.
    pub fn clear(&mut self) {
        if self.occupied > 0 {
            self.cells.fill(None);
            self.occupied = 0;
        }
        self.dirty = Some(DirtyRegion::full(self.width, self.height));
    }

    /// Store `cell` in every in-bounds slot of `rect`. Returns how many
    /// slots changed.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn fill(&mut self, rect: Rect, cell: Cell) -> usize {
        let area = rect.intersect(self.bounds());
        if area.is_empty() {
            return 0;
        }
        // Intersection with bounds at the origin keeps these in u16 range.
        let (x1, y1) = (area.x as u16, area.y as u16);
        let (x2, y2) = (area.right() as u16, area.bottom() as u16);
        let mut changed = 0;
        for y in y1..y2 {
            for x in x1..x2 {
                if self.set(x, y, cell) {
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Change dimensions.
    ///
    /// With `preserve`, the overlapping top-left sub-rectangle keeps its
    /// content and new area is untouched; without it everything is
    /// discarded. Either way the dirty region becomes the full new extent.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimensions`] if either dimension is zero; the buffer
    /// is left as it was.
    pub fn resize(&mut self, width: u16, height: u16, preserve: bool) -> Result<()> {
        check_dimensions(width, height)?;
        let mut cells = vec![None; usize::from(width) * usize::from(height)];
        let mut occupied = 0;
        if preserve {
            let keep_w = usize::from(self.width.min(width));
            let keep_h = self.height.min(height);
            for y in 0..keep_h {
                let src = self.index(0, y);
                let dst = usize::from(y) * usize::from(width);
                let row = &self.cells[src..src + keep_w];
                occupied += row.iter().filter(|c| c.is_some()).count();
                cells[dst..dst + keep_w].copy_from_slice(row);
            }
        }
        self.width = width;
        self.height = height;
        self.cells = cells;
        self.occupied = occupied;
        self.dirty = Some(DirtyRegion::full(width, height));
        Ok(())
    }

    /// Become a copy of `other`'s content. The dirty region becomes the
    /// full extent.
    ///
    /// # Errors
    ///
    /// [`Error::DimensionMismatch`] when sizes differ.
    pub fn copy_from(&mut self, other: &Self) -> Result<()> {
        self.check_same_size(other)?;
        self.cells.copy_from_slice(&other.cells);
        self.occupied = other.occupied;
        self.dirty = Some(DirtyRegion::full(self.width, self.height));
        Ok(())
    }

    /// Every slot where `self` and `other` differ, row-major.
    ///
    /// # Errors
    ///
    /// [`Error::DimensionMismatch`] when sizes differ.
    #[allow(clippy::cast_possible_truncation)]
    pub fn compare(&self, other: &Self) -> Result<Vec<CellChange>> {
        self.check_same_size(other)?;
        let width = usize::from(self.width);
        Ok(self
            .cells
            .iter()
            .zip(&other.cells)
            .enumerate()
            .filter(|(_, (old, new))| old != new)
            // Quotient and remainder are bounded by height and width.
            .map(|(i, (old, new))| CellChange {
                x: (i % width) as u16,
                y: (i / width) as u16,
                old: *old,
                new: *new,
            })
            .collect())
    }

    fn check_same_size(&self, other: &Self) -> Result<()> {
        if self.size() == other.size() {
            Ok(())
        } else {
            Err(Error::DimensionMismatch {
                expected: self.size(),
                actual: other.size(),
            })
        }
    }
}

impl std::fmt::Debug for ScreenBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ScreenBuffer({}x{}, occupied={})",
            self.width, self.height, self.occupied
        )
    }
}

const fn check_dimensions(width: u16, height: u16) -> Result<()> {
    if width == 0 || height == 0 {
        Err(Error::InvalidDimensions { width, height })
    } else {
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
