// SPDX-License-Identifier: MIT
//
// Drawing primitives built on RenderContext.
//
// Stateless helpers: every primitive draws with the context's current pen
// and honours its clip, and none of them moves the cursor. Boxes, grids and
// tables share one set of line-drawing glyph tables.

use unicode_segmentation::UnicodeSegmentation;

use crate::buffer::Rect;
use crate::context::{RenderContext, text_width};

// ─── Border glyphs ───────────────────────────────────────────────────────────

/// Line-drawing glyphs for one border style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderGlyphs {
    pub horizontal: char,
    pub vertical: char,
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    /// `├`: a vertical line with a branch to the right.
    pub tee_right: char,
    /// `┤`: a vertical line with a branch to the left.
    pub tee_left: char,
    /// `┬`
    pub tee_down: char,
    /// `┴`
    pub tee_up: char,
    pub cross: char,
}

const SINGLE: BorderGlyphs = BorderGlyphs {
    horizontal: '─',
    vertical: '│',
    top_left: '┌',
    top_right: '┐',
    bottom_left: '└',
    bottom_right: '┘',
    tee_right: '├',
    tee_left: '┤',
    tee_down: '┬',
    tee_up: '┴',
    cross: '┼',
};

const DOUBLE: BorderGlyphs = BorderGlyphs {
    horizontal: '═',
    vertical: '║',
    top_left: '╔',
    top_right: '╗',
    bottom_left: '╚',
    bottom_right: '╝',
    tee_right: '╠',
    tee_left: '╣',
    tee_down: '╦',
    tee_up: '╩',
    cross: '╬',
};

const ROUNDED: BorderGlyphs = BorderGlyphs {
    top_left: '╭',
    top_right: '╮',
    bottom_left: '╰',
    bottom_right: '╯',
    ..SINGLE
};

/// Box and line style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderStyle {
    #[default]
    Single,
    Double,
    Rounded,
}

impl BorderStyle {
    #[must_use]
    pub const fn glyphs(self) -> &'static BorderGlyphs {
        match self {
            Self::Single => &SINGLE,
            Self::Double => &DOUBLE,
            Self::Rounded => &ROUNDED,
        }
    }
}

// ─── Widget glyphs ───────────────────────────────────────────────────────────

const BAR_FILLED: char = '█';
const BAR_EMPTY: char = '░';
const SCROLL_TRACK: char = '│';
const SCROLL_THUMB: char = '█';

/// The longest prefix of `text` that fits in `cols` columns.
/// The part of segment `a`–`b` inside `rect` (Liang–Barsky), widened to
/// `i64`. Endpoints already inside come back unchanged.
#[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
fn clip_segment(rect: Rect, a: (i32, i32), b: (i32, i32)) -> Option<((i64, i64), (i64, i64))> {
    if rect.is_empty() {
        return None;
    }
    let (ax, ay) = (f64::from(a.0), f64::from(a.1));
    let (dx, dy) = (f64::from(b.0) - ax, f64::from(b.1) - ay);
    let (left, top) = (f64::from(rect.x), f64::from(rect.y));
    let (right, bottom) = (f64::from(rect.right() - 1), f64::from(rect.bottom() - 1));

    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [(-dx, ax - left), (dx, right - ax), (-dy, ay - top), (dy, bottom - ay)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    let at = |t: f64| ((ax + t * dx).round() as i64, (ay + t * dy).round() as i64);
    Some((at(t0), at(t1)))
}

fn truncate_to(text: &str, cols: usize) -> &str {
    let mut used = 0;
    for (idx, g) in text.grapheme_indices(true) {
        let w = text_width(g);
        if used + w > cols {
            return &text[..idx];
        }
        used += w;
    }
    text
}

// ─── Primitives ──────────────────────────────────────────────────────────────

impl RenderContext<'_> {
    /// Border around `rect`, with `title` set into the top edge.
    ///
    /// Rects narrower or shorter than two cells have no room for a border
    /// and are skipped. The title is cut to fit between the corners.
    pub fn draw_box(&mut self, rect: Rect, style: BorderStyle, title: Option<&str>) {
        if rect.width < 2 || rect.height < 2 {
            return;
        }
        let g = style.glyphs();
        let (left, top) = (rect.x, rect.y);
        let (right, bottom) = (rect.right() - 1, rect.bottom() - 1);

        for x in left + 1..right {
            self.draw_char_at(x, top, g.horizontal);
            self.draw_char_at(x, bottom, g.horizontal);
        }
        for y in top + 1..bottom {
            self.draw_char_at(left, y, g.vertical);
            self.draw_char_at(right, y, g.vertical);
        }
        self.draw_char_at(left, top, g.top_left);
        self.draw_char_at(right, top, g.top_right);
        self.draw_char_at(left, bottom, g.bottom_left);
        self.draw_char_at(right, bottom, g.bottom_right);

        if let Some(title) = title.filter(|t| !t.is_empty()) {
            let padded = format!(" {title} ");
            let room = usize::from(rect.width - 2);
            self.draw_text_at(left + 1, top, truncate_to(&padded, room));
        }
    }

    /// Straight line from `(x0, y0)` to `(x1, y1)` inclusive (Bresenham).
    ///
    /// The segment is cut to the clip first, so endpoints anywhere in the
    /// `i32` range cost only the visible cells.
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, ch: char) {
        let Some(((x0, y0), (x1, y1))) = clip_segment(self.clip(), (x0, y0), (x1, y1)) else {
            return;
        };
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let (mut x, mut y) = (x0, y0);
        let mut err = dx + dy;
        loop {
            if let (Ok(px), Ok(py)) = (i32::try_from(x), i32::try_from(y)) {
                self.draw_char_at(px, py, ch);
            }
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// `len` horizontal line glyphs rightwards from `(x, y)`.
    pub fn horizontal_separator(&mut self, x: i32, y: i32, len: u16, style: BorderStyle) {
        let h = style.glyphs().horizontal;
        for i in 0..i32::from(len) {
            self.draw_char_at(x + i, y, h);
        }
    }

    /// `len` vertical line glyphs downwards from `(x, y)`.
    pub fn vertical_separator(&mut self, x: i32, y: i32, len: u16, style: BorderStyle) {
        let v = style.glyphs().vertical;
        for i in 0..i32::from(len) {
            self.draw_char_at(x, y + i, v);
        }
    }

    /// Horizontal bar `width` columns wide, `fraction` (0.0–1.0) filled.
    ///
    /// With `show_percent` the last five columns hold a right-aligned
    /// `" NN%"` label and the bar shrinks to make room.
    pub fn progress_bar(&mut self, x: i32, y: i32, width: u16, fraction: f64, show_percent: bool) {
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        // Both products are bounded by `width` / 100.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = (fraction * 100.0).round() as u16;

        let label = show_percent.then(|| format!(" {percent:>3}%"));
        let label_cols = label.as_deref().map_or(0, text_width);
        let bar = width.saturating_sub(u16::try_from(label_cols).unwrap_or(u16::MAX));
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let filled = (fraction * f64::from(bar)).round() as u16;

        for i in 0..bar {
            let ch = if i < filled { BAR_FILLED } else { BAR_EMPTY };
            self.draw_char_at(x + i32::from(i), y, ch);
        }
        if let Some(label) = label {
            let room = usize::from(width - bar);
            self.draw_text_at(x + i32::from(bar), y, truncate_to(&label, room));
        }
    }

    /// Vertical scrollbar `height` rows tall at column `x`, for a view of
    /// `visible` lines scrolled `offset` lines into `total`.
    ///
    /// The thumb is proportional to `visible / total` (at least one row);
    /// when everything fits it fills the whole track.
    pub fn scrollbar(&mut self, x: i32, y: i32, height: u16, total: usize, visible: usize, offset: usize) {
        if height == 0 {
            return;
        }
        let track = usize::from(height);
        let (thumb_len, thumb_pos) = if total <= visible {
            (track, 0)
        } else {
            let len = (track * visible / total).clamp(1, track);
            let max_offset = total - visible;
            let pos = (track - len) * offset.min(max_offset) / max_offset;
            (len, pos)
        };

        for row in 0..track {
            let ch = if (thumb_pos..thumb_pos + thumb_len).contains(&row) {
                SCROLL_THUMB
            } else {
                SCROLL_TRACK
            };
            let row = i32::try_from(row).unwrap_or(i32::MAX);
            self.draw_char_at(x, y.saturating_add(row), ch);
        }
    }

    /// `[x] label` or `[ ] label`. Returns the column just past it.
    pub fn checkbox(&mut self, x: i32, y: i32, checked: bool, label: &str) -> i32 {
        let mark = if checked { "[x]" } else { "[ ]" };
        self.labelled(x, y, mark, label)
    }

    /// `(•) label` or `( ) label`. Returns the column just past it.
    pub fn radio(&mut self, x: i32, y: i32, selected: bool, label: &str) -> i32 {
        let mark = if selected { "(•)" } else { "( )" };
        self.labelled(x, y, mark, label)
    }

    fn labelled(&mut self, x: i32, y: i32, mark: &str, label: &str) -> i32 {
        if label.is_empty() {
            return self.draw_text_at(x, y, mark);
        }
        self.draw_text_at(x, y, &format!("{mark} {label}"))
    }

    /// Lines around and between cells of the given column widths and row
    /// heights, top-left corner at `(x, y)`. Returns the outer rect.
    ///
    /// Inner sizes exclude the lines, so a grid of `n` columns is
    /// `sum(widths) + n + 1` wide.
    pub fn draw_grid(
        &mut self,
        x: i32,
        y: i32,
        col_widths: &[u16],
        row_heights: &[u16],
        style: BorderStyle,
    ) -> Rect {
        let g = style.glyphs();
        let xs = line_offsets(x, col_widths);
        let ys = line_offsets(y, row_heights);
        let (last_col, last_row) = (xs.len() - 1, ys.len() - 1);

        for (j, &ly) in ys.iter().enumerate() {
            for pair in xs.windows(2) {
                for cx in pair[0] + 1..pair[1] {
                    self.draw_char_at(cx, ly, g.horizontal);
                }
            }
            for (i, &lx) in xs.iter().enumerate() {
                let glyph = match (j == 0, j == last_row, i == 0, i == last_col) {
                    (true, _, true, _) => g.top_left,
                    (true, _, _, true) => g.top_right,
                    (true, ..) => g.tee_down,
                    (_, true, true, _) => g.bottom_left,
                    (_, true, _, true) => g.bottom_right,
                    (_, true, ..) => g.tee_up,
                    (.., true, _) => g.tee_right,
                    (.., true) => g.tee_left,
                    _ => g.cross,
                };
                self.draw_char_at(lx, ly, glyph);
            }
        }
        for pair in ys.windows(2) {
            for cy in pair[0] + 1..pair[1] {
                for &lx in &xs {
                    self.draw_char_at(lx, cy, g.vertical);
                }
            }
        }

        let span = |v: &[i32]| u16::try_from(v[v.len() - 1] - v[0] + 1).unwrap_or(u16::MAX);
        Rect::new(x, y, span(&xs), span(&ys))
    }

    /// A bordered table: a header row, a separator, then one line per
    /// row. Column widths follow the widest entry (header included); cells
    /// missing from short rows stay empty. Returns the outer rect.
    pub fn draw_table<S: AsRef<str>>(
        &mut self,
        x: i32,
        y: i32,
        headers: &[S],
        rows: &[Vec<S>],
        style: BorderStyle,
    ) -> Rect {
        let widths: Vec<u16> = (0..headers.len())
            .map(|c| {
                let body = rows
                    .iter()
                    .filter_map(|r| r.get(c))
                    .map(|s| text_width(s.as_ref()));
                let widest = body.chain([text_width(headers[c].as_ref())]).max().unwrap_or(0);
                u16::try_from(widest).unwrap_or(u16::MAX)
            })
            .collect();
        if widths.is_empty() {
            return Rect::new(x, y, 0, 0);
        }

        let mut heights = vec![1];
        if !rows.is_empty() {
            heights.push(u16::try_from(rows.len()).unwrap_or(u16::MAX));
        }
        let outer = self.draw_grid(x, y, &widths, &heights, style);

        let xs = line_offsets(x, &widths);
        for (c, header) in headers.iter().enumerate() {
            self.draw_text_at(xs[c] + 1, y + 1, header.as_ref());
        }
        for (r, row) in (0..).zip(rows) {
            for (c, text) in row.iter().take(widths.len()).enumerate() {
                let room = usize::from(widths[c]);
                self.draw_text_at(xs[c] + 1, y + 3 + r, truncate_to(text.as_ref(), room));
            }
        }
        outer
    }
}

/// Positions of the lines bounding consecutive spans starting at `origin`.
fn line_offsets(origin: i32, spans: &[u16]) -> Vec<i32> {
    let mut at = origin;
    let mut out = Vec::with_capacity(spans.len() + 1);
    out.push(at);
    for &s in spans {
        at += i32::from(s) + 1;
        out.push(at);
    }
    out
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ScreenBuffer;
    use crate::color::Color;
    use pretty_assertions::assert_eq;

    fn lines(b: &ScreenBuffer) -> Vec<String> {
        (0..b.height())
            .map(|y| {
                (0..b.width())
                    .filter_map(|x| match b.get(x, y) {
                        Some(c) if c.is_continuation() => None,
                        Some(c) => Some(c.symbol.as_str().to_string()),
                        None => Some(".".to_string()),
                    })
                    .collect()
            })
            .collect()
    }

    fn canvas(w: u16, h: u16, paint: impl FnOnce(&mut RenderContext<'_>)) -> Vec<String> {
        let mut b = ScreenBuffer::new(w, h).unwrap();
        let mut ctx = RenderContext::new(&mut b);
        paint(&mut ctx);
        lines(&b)
    }

    // ── Boxes and lines ─────────────────────────────────────────────────

    #[test]
    fn single_box() {
        let out = canvas(6, 4, |c| c.draw_box(Rect::new(0, 0, 5, 3), BorderStyle::Single, None));
        assert_eq!(out, ["┌───┐.", "│...│.", "└───┘.", "......"]);
    }

    #[test]
    fn rounded_box_with_title() {
        let out = canvas(10, 3, |c| {
            c.draw_box(Rect::new(0, 0, 10, 3), BorderStyle::Rounded, Some("Log"));
        });
        assert_eq!(out[0], "╭ Log ───╮");
        assert_eq!(out[2], "╰────────╯");
    }

    #[test]
    fn long_title_is_cut_between_corners() {
        let out = canvas(8, 2, |c| {
            c.draw_box(Rect::new(0, 0, 8, 2), BorderStyle::Double, Some("Dashboard"));
        });
        assert_eq!(out, ["╔ Dashb╗", "╚══════╝"]);
    }

    #[test]
    fn degenerate_box_draws_nothing() {
        let out = canvas(3, 3, |c| c.draw_box(Rect::new(0, 0, 1, 3), BorderStyle::Single, None));
        assert_eq!(out, ["...", "...", "..."]);
    }

    #[test]
    fn box_respects_clip() {
        let out = canvas(5, 3, |c| {
            c.push_clip(Rect::new(0, 0, 2, 3));
            c.draw_box(Rect::new(0, 0, 5, 3), BorderStyle::Single, None);
        });
        assert_eq!(out, ["┌─...", "│....", "└─..."]);
    }

    #[test]
    fn bresenham_diagonal_and_shallow() {
        let out = canvas(4, 4, |c| c.draw_line(0, 0, 3, 3, '*'));
        assert_eq!(out, ["*...", ".*..", "..*.", "...*"]);

        let out = canvas(5, 2, |c| c.draw_line(4, 1, 0, 0, '#'));
        assert_eq!(out, ["###..", "...##"]);
    }

    #[test]
    fn lines_with_extreme_endpoints() {
        let out = canvas(4, 3, |c| c.draw_line(i32::MIN, 1, i32::MAX, 1, '-'));
        assert_eq!(out, ["....", "----", "...."]);

        let out = canvas(4, 4, |c| c.draw_line(i32::MIN, i32::MIN, i32::MAX, i32::MAX, '*'));
        assert_eq!(out, ["*...", ".*..", "..*.", "...*"]);

        let out = canvas(3, 2, |c| c.draw_line(i32::MAX, i32::MIN, i32::MAX, i32::MAX, '|'));
        assert_eq!(out, ["...", "..."]);
    }

    #[test]
    fn line_outside_the_clip_draws_nothing() {
        let out = canvas(4, 2, |c| {
            c.draw_line(-100, -5, -1, -5, '#');
            c.push_clip(Rect::new(0, 0, 2, 2));
            c.draw_line(3, 0, 3, 1, '#');
        });
        assert_eq!(out, ["....", "...."]);
    }

    #[test]
    fn single_point_line() {
        let out = canvas(2, 1, |c| c.draw_line(1, 0, 1, 0, 'o'));
        assert_eq!(out, [".o"]);
    }

    #[test]
    fn separators() {
        let out = canvas(4, 3, |c| {
            c.horizontal_separator(0, 0, 4, BorderStyle::Double);
            c.vertical_separator(3, 1, 2, BorderStyle::Single);
        });
        assert_eq!(out, ["════", "...│", "...│"]);
    }

    #[test]
    fn primitives_leave_cursor_and_use_pen() {
        let mut b = ScreenBuffer::new(6, 3).unwrap();
        let mut ctx = RenderContext::new(&mut b);
        ctx.move_to(2, 2);
        ctx.set_fg(Color::MAGENTA);
        ctx.draw_box(Rect::new(0, 0, 6, 3), BorderStyle::Single, Some("x"));
        assert_eq!(ctx.cursor(), (2, 2));
        drop(ctx);
        assert_eq!(b.get(5, 2).map(|c| c.fg), Some(Color::MAGENTA));
    }

    // ── Widgets ─────────────────────────────────────────────────────────

    #[test]
    fn progress_bar_fill_and_label() {
        let out = canvas(10, 2, |c| {
            c.progress_bar(0, 0, 10, 0.5, false);
            c.progress_bar(0, 1, 10, 0.4, true);
        });
        assert_eq!(out[0], "█████░░░░░");
        assert_eq!(out[1], "██░░░  40%");
    }

    #[test]
    fn progress_bar_clamps() {
        let out = canvas(4, 3, |c| {
            c.progress_bar(0, 0, 4, -1.0, false);
            c.progress_bar(0, 1, 4, 7.0, false);
            c.progress_bar(0, 2, 4, f64::NAN, false);
        });
        assert_eq!(out, ["░░░░", "████", "░░░░"]);
    }

    #[test]
    fn scrollbar_thumb_position() {
        let col = |out: Vec<String>| out.concat();
        // 100 lines, 10 visible, at the end: thumb of 1 row at the bottom.
        let out = canvas(1, 10, |c| c.scrollbar(0, 0, 10, 100, 10, 90));
        assert_eq!(col(out), "│││││││││█");
        // 20 lines, 10 visible, at the top: half-height thumb.
        let out = canvas(1, 4, |c| c.scrollbar(0, 0, 4, 20, 10, 0));
        assert_eq!(col(out), "██││");
        // Everything fits.
        let out = canvas(1, 3, |c| c.scrollbar(0, 0, 3, 2, 10, 5));
        assert_eq!(col(out), "███");
    }

    #[test]
    fn checkbox_and_radio() {
        let mut b = ScreenBuffer::new(12, 2).unwrap();
        let mut ctx = RenderContext::new(&mut b);
        assert_eq!(ctx.checkbox(0, 0, true, "wrap"), 8);
        assert_eq!(ctx.radio(0, 1, false, ""), 3);
        drop(ctx);
        assert_eq!(lines(&b), ["[x] wrap....", "( )........."]);
    }

    // ── Grids and tables ────────────────────────────────────────────────

    #[test]
    fn grid_junctions() {
        let mut b = ScreenBuffer::new(6, 5).unwrap();
        let mut ctx = RenderContext::new(&mut b);
        let outer = ctx.draw_grid(0, 0, &[1, 2], &[1, 1], BorderStyle::Single);
        assert_eq!(outer, Rect::new(0, 0, 6, 5));
        drop(ctx);
        assert_eq!(
            lines(&b),
            ["┌─┬──┐", "│.│..│", "├─┼──┤", "│.│..│", "└─┴──┘"]
        );
    }

    #[test]
    fn table_sizes_columns_from_content() {
        let mut b = ScreenBuffer::new(12, 6).unwrap();
        let mut ctx = RenderContext::new(&mut b);
        let rows = vec![vec!["a", "1"], vec!["bcd", "22"]];
        let outer = ctx.draw_table(0, 0, &["k", "val"], &rows, BorderStyle::Single);
        assert_eq!(outer, Rect::new(0, 0, 9, 6));
        drop(ctx);
        assert_eq!(
            lines(&b),
            [
                "┌───┬───┐...",
                "│k..│val│...",
                "├───┼───┤...",
                "│a..│1..│...",
                "│bcd│22.│...",
                "└───┴───┘...",
            ]
        );
    }

    #[test]
    fn header_only_table() {
        let out = canvas(5, 3, |c| {
            c.draw_table::<&str>(0, 0, &["id"], &[], BorderStyle::Single);
        });
        assert_eq!(out, ["┌──┐.", "│id│.", "└──┘."]);
    }
}
