// SPDX-License-Identifier: MIT
//
// RenderContext: stateful drawing on top of one ScreenBuffer.
//
// The context holds a pen (fg, bg, styles), a cursor, a clip stack and a
// save stack, and borrows the buffer mutably for its whole lifetime. All
// drawing goes through the pen and is clipped against the top of the clip
// stack; nothing here ever writes outside the buffer.
//
// Coordinates passed in are signed so callers can lay things out partly
// off-screen; whatever lands outside the buffer or the clip is skipped. The
// cursor itself always stays inside the buffer.
//
// Text goes in grapheme by grapheme. A wide glyph takes its column plus a
// continuation slot; if both halves cannot be shown (right edge of the row,
// or the clip cuts between them) the visible half becomes a space. Writing
// over either half of an existing wide glyph breaks it and blanks the
// other half, so the buffer never holds a head without its continuation.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::buffer::{Rect, ScreenBuffer};
use crate::cell::{Cell, Grapheme, Styles};
use crate::color::Color;

/// Display width of `text` in columns.
#[must_use]
pub fn text_width(text: &str) -> usize {
    text.graphemes(true).map(grapheme_columns).sum()
}

/// Columns one grapheme occupies once stored in a cell (1 or 2).
fn grapheme_columns(g: &str) -> usize {
    g.width().clamp(1, 2)
}

/// Saved pen, cursor and clip stack.
#[derive(Debug, Clone)]
struct Snapshot {
    fg: Color,
    bg: Color,
    styles: Styles,
    cursor: (u16, u16),
    clips: Vec<Rect>,
}

/// A pen, a cursor and a clip stack over one [`ScreenBuffer`].
///
/// ```
/// use weft_term::buffer::ScreenBuffer;
/// use weft_term::color::Color;
/// use weft_term::context::RenderContext;
///
/// let mut buf = ScreenBuffer::new(20, 2)?;
/// let mut ctx = RenderContext::new(&mut buf);
/// ctx.set_fg(Color::GREEN);
/// ctx.draw_text("ok");
/// assert_eq!(ctx.cursor(), (2, 0));
/// drop(ctx);
/// assert_eq!(buf.get(1, 0).map(|c| c.fg), Some(Color::GREEN));
/// # Ok::<(), weft_term::Error>(())
/// ```
pub struct RenderContext<'a> {
    buffer: &'a mut ScreenBuffer,
    fg: Color,
    bg: Color,
    styles: Styles,
    cursor: (u16, u16),
    clips: Vec<Rect>,
    saved: Vec<Snapshot>,
}

impl<'a> RenderContext<'a> {
    /// A context with a default pen, the cursor at the origin and no clip.
    pub fn new(buffer: &'a mut ScreenBuffer) -> Self {
        Self {
            buffer,
            fg: Color::Default,
            bg: Color::Default,
            styles: Styles::empty(),
            cursor: (0, 0),
            clips: Vec::new(),
            saved: Vec::new(),
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn buffer(&self) -> &ScreenBuffer {
        self.buffer
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u16 {
        self.buffer.width()
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u16 {
        self.buffer.height()
    }

    #[inline]
    #[must_use]
    pub const fn fg(&self) -> Color {
        self.fg
    }

    #[inline]
    #[must_use]
    pub const fn bg(&self) -> Color {
        self.bg
    }

    #[inline]
    #[must_use]
    pub const fn styles(&self) -> Styles {
        self.styles
    }

    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> (u16, u16) {
        self.cursor
    }

    // ─── Pen ─────────────────────────────────────────────────────────────

    pub const fn set_fg(&mut self, fg: Color) {
        self.fg = fg;
    }

    pub const fn set_bg(&mut self, bg: Color) {
        self.bg = bg;
    }

    pub const fn set_styles(&mut self, styles: Styles) {
        self.styles = styles;
    }

    pub fn add_styles(&mut self, styles: Styles) {
        self.styles |= styles;
    }

    pub fn remove_styles(&mut self, styles: Styles) {
        self.styles -= styles;
    }

    /// Default colors, no styles.
    pub const fn reset_style(&mut self) {
        self.fg = Color::Default;
        self.bg = Color::Default;
        self.styles = Styles::empty();
    }

    /// A cell for `symbol` in the current pen.
    fn pen_cell(&self, symbol: Grapheme) -> Cell {
        Cell {
            fg: self.fg,
            bg: self.bg,
            styles: self.styles,
            ..Cell::from_grapheme(symbol)
        }
    }

    // ─── Cursor ──────────────────────────────────────────────────────────

    /// Move the cursor, clamping into the buffer.
    pub fn move_to(&mut self, x: i32, y: i32) {
        self.cursor = (
            clamp_to(x, self.buffer.width()),
            clamp_to(y, self.buffer.height()),
        );
    }

    /// Move the cursor relative to where it is, clamping into the buffer.
    pub fn move_by(&mut self, dx: i32, dy: i32) {
        let (x, y) = self.cursor;
        self.move_to(i32::from(x) + dx, i32::from(y) + dy);
    }

    // ─── Clipping ────────────────────────────────────────────────────────

    /// The area drawing is currently confined to.
    #[must_use]
    pub fn clip(&self) -> Rect {
        self.clips
            .last()
            .copied()
            .unwrap_or_else(|| self.buffer.bounds())
    }

    /// Narrow the clip to its intersection with `rect`. Disjoint rects give
    /// an empty clip, which hides everything until popped.
    pub fn push_clip(&mut self, rect: Rect) {
        let next = self.clip().intersect(rect);
        self.clips.push(next);
    }

    /// Undo the last [`push_clip`](Self::push_clip).
    pub fn pop_clip(&mut self) -> Option<Rect> {
        self.clips.pop()
    }

    /// Whether `(x, y)` is inside the current clip. Says nothing about
    /// buffer bounds beyond that.
    #[must_use]
    pub fn is_in_clip(&self, x: i32, y: i32) -> bool {
        self.clip().contains(x, y)
    }

    /// Whether a write at `(x, y)` would land: inside the clip and the buffer.
    fn visible(&self, x: i32, y: i32) -> Option<(u16, u16)> {
        if !self.is_in_clip(x, y) {
            return None;
        }
        let (x, y) = (u16::try_from(x).ok()?, u16::try_from(y).ok()?);
        self.buffer.in_bounds(x, y).then_some((x, y))
    }

    // ─── Save / restore ──────────────────────────────────────────────────

    /// Push the pen, cursor and clip stack.
    pub fn save(&mut self) {
        self.saved.push(Snapshot {
            fg: self.fg,
            bg: self.bg,
            styles: self.styles,
            cursor: self.cursor,
            clips: self.clips.clone(),
        });
    }

    /// Pop the last [`save`](Self::save). No-op when nothing is saved.
    pub fn restore(&mut self) {
        if let Some(s) = self.saved.pop() {
            self.fg = s.fg;
            self.bg = s.bg;
            self.styles = s.styles;
            self.cursor = s.cursor;
            self.clips = s.clips;
        }
    }

    // ─── Cells ───────────────────────────────────────────────────────────

    /// Store `cell` at `(x, y)` if visible, breaking any wide glyph it
    /// overlaps. Returns whether it was stored.
    fn put(&mut self, x: i32, y: i32, cell: Cell) -> bool {
        let Some((x, y)) = self.visible(x, y) else {
            return false;
        };
        self.break_wide_at(x, y);
        self.buffer.set(x, y, cell);
        true
    }

    /// If `(x, y)` holds half of a wide glyph, blank the other half.
    fn break_wide_at(&mut self, x: u16, y: u16) {
        let Some(here) = self.buffer.get(x, y).copied() else {
            return;
        };
        if here.is_continuation() && x > 0 {
            if let Some(head) = self.buffer.get(x - 1, y).copied() {
                if head.is_wide() {
                    self.buffer.set(x - 1, y, blank_like(&head));
                }
            }
        }
        if here.is_wide() {
            if let Some(next) = self.buffer.get(x + 1, y).copied() {
                if next.is_continuation() {
                    self.buffer.set(x + 1, y, blank_like(&next));
                }
            }
        }
    }

    /// Draw one grapheme with its left edge at `(x, y)`. Returns the
    /// columns it advances.
    fn put_grapheme(&mut self, x: i32, y: i32, g: &str) -> i32 {
        let symbol = Grapheme::new(g);
        let cell = self.pen_cell(symbol);
        if !cell.is_wide() {
            self.put(x, y, cell);
            return 1;
        }

        let fits_row = x + 1 < i32::from(self.buffer.width());
        let head = self.visible(x, y).is_some();
        let tail = self.visible(x + 1, y).is_some();
        if !fits_row {
            // A wide glyph at the last column cannot be shown; a space
            // keeps the column painted.
            self.put(x, y, self.pen_cell(Grapheme::SPACE));
            return 1;
        }
        match (head, tail) {
            (true, true) => {
                self.put(x, y, cell);
                self.put(x + 1, y, Cell::continuation(self.fg, self.bg, self.styles));
            }
            (true, false) => {
                self.put(x, y, self.pen_cell(Grapheme::SPACE));
            }
            (false, true) => {
                self.put(x + 1, y, self.pen_cell(Grapheme::SPACE));
            }
            (false, false) => {}
        }
        2
    }

    /// Draw `text` starting at `(x, y)`; returns the column just past it.
    fn put_text(&mut self, x: i32, y: i32, text: &str) -> i32 {
        let mut col = x;
        let width = i32::from(self.buffer.width());
        for g in text.graphemes(true) {
            if col >= width {
                // Nothing further on this row can land; keep counting.
                #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
                let rest = grapheme_columns(g) as i32;
                col += rest;
                continue;
            }
            col += self.put_grapheme(col, y, g);
        }
        col
    }

    // ─── Drawing ─────────────────────────────────────────────────────────

    /// Draw `ch` at the cursor and advance past it.
    pub fn draw_char(&mut self, ch: char) {
        let (x, y) = self.cursor;
        let mut buf = [0; 4];
        let end = self.put_text(i32::from(x), i32::from(y), ch.encode_utf8(&mut buf));
        self.move_to(end, i32::from(y));
    }

    /// Draw `ch` at `(x, y)`. The cursor does not move.
    pub fn draw_char_at(&mut self, x: i32, y: i32, ch: char) {
        let mut buf = [0; 4];
        self.put_text(x, y, ch.encode_utf8(&mut buf));
    }

    /// Draw `text` at the cursor and leave the cursor just past it.
    pub fn draw_text(&mut self, text: &str) {
        let (x, y) = self.cursor;
        let end = self.put_text(i32::from(x), i32::from(y), text);
        self.move_to(end, i32::from(y));
    }

    /// Draw `text` at `(x, y)`. The cursor does not move. Returns the
    /// column just past the text.
    pub fn draw_text_at(&mut self, x: i32, y: i32, text: &str) -> i32 {
        self.put_text(x, y, text)
    }

    /// Fill `rect` with `ch` in the current pen.
    pub fn fill_rect(&mut self, rect: Rect, ch: char) {
        let area = rect.intersect(self.clip());
        let mut buf = [0; 4];
        let s = ch.encode_utf8(&mut buf);
        let step = i32::try_from(grapheme_columns(s)).unwrap_or(1);
        for y in area.y..area.bottom() {
            let mut x = area.x;
            while x < area.right() {
                self.put_grapheme(x, y, s);
                x += step;
            }
        }
    }

    /// Make every visible slot of `rect` untouched again.
    pub fn clear_rect(&mut self, rect: Rect) {
        let area = rect.intersect(self.clip());
        for y in area.y..area.bottom() {
            for x in area.x..area.right() {
                if let Some((x, y)) = self.visible(x, y) {
                    self.break_wide_at(x, y);
                    self.buffer.clear_cell(x, y);
                }
            }
        }
    }
}

/// A space carrying `cell`'s colors and styles.
const fn blank_like(cell: &Cell) -> Cell {
    Cell {
        fg: cell.fg,
        bg: cell.bg,
        styles: cell.styles,
        ..Cell::BLANK
    }
}

/// Clamp a signed coordinate into `0..len`.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn clamp_to(v: i32, len: u16) -> u16 {
    v.clamp(0, i32::from(len) - 1) as u16
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn buf(w: u16, h: u16) -> ScreenBuffer {
        ScreenBuffer::new(w, h).unwrap()
    }

    fn sym(b: &ScreenBuffer, x: u16, y: u16) -> Option<&str> {
        b.get(x, y).map(|c| c.symbol.as_str())
    }

    fn row_text(b: &ScreenBuffer, y: u16) -> String {
        (0..b.width())
            .map(|x| b.get(x, y).map_or(".", |c| if c.is_continuation() { "" } else { c.symbol.as_str() }))
            .collect()
    }

    // ── Pen ─────────────────────────────────────────────────────────────

    #[test]
    fn pen_setters_only_touch_state() {
        let mut b = buf(4, 1);
        let mut ctx = RenderContext::new(&mut b);
        ctx.set_fg(Color::RED);
        ctx.set_bg(Color::BLUE);
        ctx.set_styles(Styles::BOLD);
        ctx.add_styles(Styles::ITALIC | Styles::UNDERLINE);
        ctx.remove_styles(Styles::UNDERLINE);
        assert_eq!(ctx.styles(), Styles::BOLD | Styles::ITALIC);
        assert_eq!(ctx.buffer().occupied(), 0);

        ctx.draw_char('x');
        ctx.reset_style();
        assert_eq!((ctx.fg(), ctx.bg(), ctx.styles()), (Color::Default, Color::Default, Styles::empty()));
        drop(ctx);
        let c = b.get(0, 0).unwrap();
        assert_eq!((c.fg, c.bg, c.styles), (Color::RED, Color::BLUE, Styles::BOLD | Styles::ITALIC));
    }

    // ── Cursor ──────────────────────────────────────────────────────────

    #[test]
    fn move_to_and_move_by_clamp() {
        let mut b = buf(10, 5);
        let mut ctx = RenderContext::new(&mut b);
        ctx.move_to(3, 2);
        assert_eq!(ctx.cursor(), (3, 2));
        ctx.move_to(-4, 99);
        assert_eq!(ctx.cursor(), (0, 4));
        ctx.move_by(100, -100);
        assert_eq!(ctx.cursor(), (9, 0));
        ctx.move_by(-2, 1);
        assert_eq!(ctx.cursor(), (7, 1));
    }

    // ── Text ────────────────────────────────────────────────────────────

    #[test]
    fn draw_text_advances_cursor() {
        let mut b = buf(10, 2);
        let mut ctx = RenderContext::new(&mut b);
        ctx.move_to(1, 1);
        ctx.draw_text("abc");
        assert_eq!(ctx.cursor(), (4, 1));
        ctx.draw_char('d');
        assert_eq!(ctx.cursor(), (5, 1));
        drop(ctx);
        assert_eq!(row_text(&b, 1), ".abcd.....");
    }

    #[test]
    fn draw_at_leaves_cursor_alone() {
        let mut b = buf(10, 2);
        let mut ctx = RenderContext::new(&mut b);
        assert_eq!(ctx.draw_text_at(2, 0, "hey"), 5);
        ctx.draw_char_at(0, 1, 'q');
        assert_eq!(ctx.cursor(), (0, 0));
        drop(ctx);
        assert_eq!(sym(&b, 4, 0), Some("y"));
        assert_eq!(sym(&b, 0, 1), Some("q"));
    }

    #[test]
    fn wide_glyph_writes_continuation() {
        let mut b = buf(6, 1);
        let mut ctx = RenderContext::new(&mut b);
        ctx.draw_text("日本");
        assert_eq!(ctx.cursor(), (4, 0));
        drop(ctx);
        assert_eq!(sym(&b, 0, 0), Some("日"));
        assert!(b.get(1, 0).unwrap().is_continuation());
        assert_eq!(sym(&b, 2, 0), Some("本"));
        assert!(b.get(3, 0).unwrap().is_continuation());
    }

    #[test]
    fn wide_glyph_at_row_end_becomes_space() {
        let mut b = buf(5, 1);
        let mut ctx = RenderContext::new(&mut b);
        ctx.draw_text("abcd日");
        drop(ctx);
        assert_eq!(sym(&b, 4, 0), Some(" "));
        assert_eq!(b.get(4, 0).unwrap().width, 1);
    }

    #[test]
    fn text_past_the_edge_is_dropped() {
        let mut b = buf(4, 1);
        let mut ctx = RenderContext::new(&mut b);
        ctx.draw_text("abcdefgh");
        assert_eq!(ctx.cursor(), (3, 0));
        drop(ctx);
        assert_eq!(row_text(&b, 0), "abcd");
        assert_eq!(b.occupied(), 4);
    }

    #[test]
    fn negative_origin_is_clipped_not_shifted() {
        let mut b = buf(6, 1);
        let mut ctx = RenderContext::new(&mut b);
        assert_eq!(ctx.draw_text_at(-2, 0, "abcd"), 2);
        drop(ctx);
        assert_eq!(row_text(&b, 0), "cd....");
    }

    #[test]
    fn overwriting_half_a_wide_glyph_breaks_it() {
        let mut b = buf(6, 1);
        let mut ctx = RenderContext::new(&mut b);
        ctx.draw_text_at(0, 0, "日");
        ctx.draw_char_at(1, 0, 'x');
        ctx.draw_text_at(2, 0, "本");
        ctx.draw_char_at(2, 0, 'y');
        drop(ctx);
        assert_eq!(sym(&b, 0, 0), Some(" "));
        assert_eq!(sym(&b, 1, 0), Some("x"));
        assert_eq!(sym(&b, 2, 0), Some("y"));
        assert_eq!(sym(&b, 3, 0), Some(" "));
    }

    // ── Clipping ────────────────────────────────────────────────────────

    #[test]
    fn clipped_cells_are_skipped_but_cursor_advances() {
        let mut b = buf(10, 1);
        let mut ctx = RenderContext::new(&mut b);
        ctx.push_clip(Rect::new(2, 0, 3, 1));
        ctx.draw_text("abcdefg");
        assert_eq!(ctx.cursor(), (7, 0));
        drop(ctx);
        assert_eq!(row_text(&b, 0), "..cde.....");
    }

    #[test]
    fn clip_stack_intersects_and_pops() {
        let mut b = buf(20, 10);
        let mut ctx = RenderContext::new(&mut b);
        assert_eq!(ctx.clip(), Rect::new(0, 0, 20, 10));
        ctx.push_clip(Rect::new(2, 2, 10, 5));
        ctx.push_clip(Rect::new(8, 0, 10, 10));
        assert_eq!(ctx.clip(), Rect::new(8, 2, 4, 5));
        assert!(ctx.is_in_clip(8, 2));
        assert!(!ctx.is_in_clip(12, 2));
        ctx.pop_clip();
        assert_eq!(ctx.clip(), Rect::new(2, 2, 10, 5));
        ctx.pop_clip();
        assert_eq!(ctx.pop_clip(), None);
    }

    #[test]
    fn disjoint_clip_hides_everything() {
        let mut b = buf(10, 3);
        let mut ctx = RenderContext::new(&mut b);
        ctx.push_clip(Rect::new(0, 0, 3, 1));
        ctx.push_clip(Rect::new(5, 2, 3, 1));
        assert!(ctx.clip().is_empty());
        ctx.draw_text("hidden");
        ctx.fill_rect(Rect::new(0, 0, 10, 3), '#');
        assert_eq!(ctx.buffer().occupied(), 0);
    }

    #[test]
    fn wide_glyph_cut_by_clip_shows_space() {
        let mut b = buf(6, 1);
        let mut ctx = RenderContext::new(&mut b);
        ctx.push_clip(Rect::new(0, 0, 3, 1));
        ctx.draw_text("ab日");
        drop(ctx);
        assert_eq!(sym(&b, 2, 0), Some(" "));
        assert!(b.get(3, 0).is_none());
    }

    // ── Save / restore ──────────────────────────────────────────────────

    #[test]
    fn restore_brings_back_pen_cursor_and_clips() {
        let mut b = buf(10, 10);
        let mut ctx = RenderContext::new(&mut b);
        ctx.set_fg(Color::YELLOW);
        ctx.move_to(3, 3);
        ctx.push_clip(Rect::new(1, 1, 5, 5));
        ctx.save();

        ctx.set_fg(Color::RED);
        ctx.move_to(0, 0);
        ctx.push_clip(Rect::new(0, 0, 2, 2));
        ctx.pop_clip();
        ctx.pop_clip();
        ctx.restore();

        assert_eq!(ctx.fg(), Color::YELLOW);
        assert_eq!(ctx.cursor(), (3, 3));
        assert_eq!(ctx.clip(), Rect::new(1, 1, 5, 5));
    }

    #[test]
    fn restore_on_empty_stack_is_noop() {
        let mut b = buf(3, 3);
        let mut ctx = RenderContext::new(&mut b);
        ctx.set_bg(Color::CYAN);
        ctx.restore();
        assert_eq!(ctx.bg(), Color::CYAN);
    }

    // ── Rectangles ──────────────────────────────────────────────────────

    #[test]
    fn fill_and_clear_rect() {
        let mut b = buf(6, 4);
        let mut ctx = RenderContext::new(&mut b);
        ctx.set_bg(Color::BLUE);
        ctx.fill_rect(Rect::new(1, 1, 3, 2), ' ');
        assert_eq!(ctx.buffer().occupied(), 6);
        ctx.clear_rect(Rect::new(2, 1, 10, 1));
        drop(ctx);
        assert_eq!(b.occupied(), 4);
        assert_eq!(b.get(1, 1).map(|c| c.bg), Some(Color::BLUE));
        assert!(b.get(2, 1).is_none());
    }

    #[test]
    fn text_width_counts_columns() {
        assert_eq!(text_width("abc"), 3);
        assert_eq!(text_width("日本"), 4);
        assert_eq!(text_width("e\u{301}"), 1);
        assert_eq!(text_width(""), 0);
    }
}
