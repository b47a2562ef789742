// SPDX-License-Identifier: MIT
//
// Differential renderer: turns "what the screen shows" and "what it should
// show" into the smallest instruction we know how to build.
//
// The scan is row-major over the front (shown) and back (wanted) buffers:
//
//   - Rows whose slices compare equal are skipped with one slice compare.
//   - Equal slots (both absent included) produce nothing.
//   - Changed slots are written through a `FrameWriter`, which tracks where
//     the terminal cursor is and what the pen looks like. A cursor move is
//     emitted only when the next write is not at the natural advance of the
//     previous one; a style change only when the pen actually differs, and
//     then with only the parameters that differ.
//   - Neighbouring changed cells that share a pen end up in one `Text`
//     fragment, so a changed row with three style runs costs three SGR
//     sequences and three text fragments, not one escape per cell.
//   - An absent target slot is drawn as a default-styled space.
//
// Wide glyphs: the continuation slot is never written itself. If only the
// continuation half changed, the head at x-1 is re-emitted, which repaints
// both columns.
//
// The first style emission of a frame starts from an unknown pen and leads
// with SGR 0; whatever the terminal had before does not leak in.

use std::time::{Duration, Instant};

use crate::ansi::Pen;
use crate::buffer::ScreenBuffer;
use crate::cell::Cell;
use crate::color::ColorDepth;
use crate::error::{Error, Result};
use crate::instruction::{Control, Fragment, RenderInstruction};

// ─── DiffStats ───────────────────────────────────────────────────────────────

/// What one render pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffStats {
    /// Slots in the frame.
    pub total_cells: usize,
    /// Slots that differed (or, for a full repaint, every slot).
    pub changed_cells: usize,
    /// Text fragments emitted.
    pub runs: usize,
    /// SGR sequences emitted.
    pub style_changes: usize,
    /// Cursor moves emitted.
    pub cursor_moves: usize,
    /// Total fragments in the instruction.
    pub fragments: usize,
    /// Encoded size of the instruction.
    pub bytes: usize,
    /// Time spent building the instruction.
    pub elapsed: Duration,
}

// ─── FrameWriter ─────────────────────────────────────────────────────────────

/// Builds an instruction cell by cell, tracking the terminal's cursor and pen.
struct FrameWriter {
    instruction: RenderInstruction,
    width: u16,
    depth: ColorDepth,
    pen: Option<Pen>,
    cursor: Option<(u16, u16)>,
    run: String,
    stats: DiffStats,
}

impl FrameWriter {
    fn new(width: u16, depth: ColorDepth) -> Self {
        Self {
            instruction: RenderInstruction::new(),
            width,
            depth,
            pen: None,
            cursor: None,
            run: String::new(),
            stats: DiffStats::default(),
        }
    }

    /// Emit a fixed control sequence. `pen` and `cursor` describe the
    /// terminal state after it.
    fn control(&mut self, control: Control, pen: Option<Pen>, cursor: Option<(u16, u16)>) {
        self.flush_run();
        self.instruction.push(Fragment::Control(control));
        self.pen = pen;
        self.cursor = cursor;
    }

    /// Draw `cell` with its left edge at `(x, y)`.
    fn put(&mut self, x: u16, y: u16, cell: &Cell) {
        if self.cursor != Some((x, y)) {
            self.flush_run();
            self.instruction.push(Fragment::MoveTo { x, y });
            self.stats.cursor_moves += 1;
        }

        let pen = Pen::new(
            cell.fg.downgrade(self.depth),
            cell.bg.downgrade(self.depth),
            cell.styles,
        );
        let params = pen.transition_from(self.pen.as_ref());
        if !params.is_empty() {
            self.flush_run();
            self.instruction.push(Fragment::Style(params));
            self.stats.style_changes += 1;
        }
        self.pen = Some(pen);

        self.run.push_str(cell.symbol.as_str());

        let next = x.saturating_add(u16::from(cell.width.max(1)));
        // At the right margin the terminal's wrap behaviour varies; force
        // an explicit move for whatever comes next.
        self.cursor = (next < self.width).then_some((next, y));
        self.instruction.set_cursor(next.min(self.width - 1), y);
    }

    fn flush_run(&mut self) {
        if !self.run.is_empty() {
            self.instruction
                .push(Fragment::Text(std::mem::take(&mut self.run)));
            self.stats.runs += 1;
        }
    }

    fn finish(mut self, total_cells: usize, started: Instant) -> (RenderInstruction, DiffStats) {
        self.flush_run();
        self.stats.total_cells = total_cells;
        self.stats.fragments = self.instruction.len();
        self.stats.bytes = self.instruction.encoded_len();
        self.stats.elapsed = started.elapsed();
        (self.instruction, self.stats)
    }
}

/// The head of a wide glyph whose continuation sits at `x`, if any.
fn wide_head(row: &[Option<Cell>], x: usize) -> Option<&Cell> {
    let head = row.get(x.checked_sub(1)?)?.as_ref()?;
    head.is_wide().then_some(head)
}

/// What an orphaned continuation slot (no wide head before it) shows.
const fn orphan_blank(cont: &Cell) -> Cell {
    Cell {
        fg: cont.fg,
        bg: cont.bg,
        styles: cont.styles,
        ..Cell::BLANK
    }
}

// ─── DiffRenderer ────────────────────────────────────────────────────────────

/// Builds render instructions from buffer pairs.
///
/// ```
/// use weft_term::buffer::ScreenBuffer;
/// use weft_term::cell::Cell;
/// use weft_term::diff::DiffRenderer;
///
/// let front = ScreenBuffer::new(80, 24)?;
/// let mut back = ScreenBuffer::new(80, 24)?;
/// back.set(10, 5, Cell::new('X'));
///
/// let (instruction, stats) = DiffRenderer::default().diff(&front, &back)?;
/// assert_eq!(stats.changed_cells, 1);
/// assert_eq!(instruction.to_bytes(), b"\x1b[6;11H\x1b[0mX");
/// # Ok::<(), weft_term::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffRenderer {
    depth: ColorDepth,
}

impl DiffRenderer {
    /// A renderer that downgrades colors to `depth`.
    #[must_use]
    pub const fn new(depth: ColorDepth) -> Self {
        Self { depth }
    }

    #[must_use]
    pub const fn depth(&self) -> ColorDepth {
        self.depth
    }

    pub const fn set_depth(&mut self, depth: ColorDepth) {
        self.depth = depth;
    }

    /// Instruction that turns a screen showing `front` into one showing
    /// `back`.
    ///
    /// # Errors
    ///
    /// [`Error::DimensionMismatch`] if the buffers differ in size.
    pub fn diff(
        &self,
        front: &ScreenBuffer,
        back: &ScreenBuffer,
    ) -> Result<(RenderInstruction, DiffStats)> {
        if front.size() != back.size() {
            return Err(Error::DimensionMismatch {
                expected: front.size(),
                actual: back.size(),
            });
        }
        let started = Instant::now();
        let (width, height) = back.size();
        let mut writer = FrameWriter::new(width, self.depth);

        for y in 0..height {
            let (Some(old), Some(new)) = (front.row(y), back.row(y)) else {
                continue;
            };
            if old == new {
                continue;
            }
            for (i, (was, want)) in old.iter().zip(new).enumerate() {
                if was == want {
                    continue;
                }
                writer.stats.changed_cells += 1;
                // Row index is below width, which is a u16.
                #[allow(clippy::cast_possible_truncation)]
                let x = i as u16;
                match want {
                    None => writer.put(x, y, &Cell::BLANK),
                    Some(cell) if cell.is_continuation() => match wide_head(new, i) {
                        Some(head) if old[i - 1].as_ref() == Some(head) => {
                            writer.put(x - 1, y, head);
                        }
                        // The changed head was written already and covered us.
                        Some(_) => {}
                        None => writer.put(x, y, &orphan_blank(cell)),
                    },
                    Some(cell) => writer.put(x, y, cell),
                }
            }
        }

        Ok(writer.finish(back.area(), started))
    }

    /// Instruction that repaints every slot of `back` from scratch: reset,
    /// home, then each row in order.
    #[must_use]
    pub fn full(&self, back: &ScreenBuffer) -> (RenderInstruction, DiffStats) {
        let started = Instant::now();
        let (width, height) = back.size();
        let mut writer = FrameWriter::new(width, self.depth);
        writer.control(Control::ResetStyle, Some(Pen::default()), None);
        writer.control(Control::Home, Some(Pen::default()), Some((0, 0)));

        for y in 0..height {
            let Some(row) = back.row(y) else { continue };
            for (i, slot) in row.iter().enumerate() {
                #[allow(clippy::cast_possible_truncation)]
                let x = i as u16;
                match slot {
                    None => writer.put(x, y, &Cell::BLANK),
                    Some(cell) if cell.is_continuation() => {
                        if wide_head(row, i).is_none() {
                            writer.put(x, y, &orphan_blank(cell));
                        }
                    }
                    Some(cell) => writer.put(x, y, cell),
                }
            }
        }
        writer.stats.changed_cells = back.area();
        writer.finish(back.area(), started)
    }
}

// ─── Screen model (tests) ────────────────────────────────────────────────────

/// A tiny terminal emulator that understands exactly what the renderer
/// emits. Tests apply instructions to it and compare the visible result.
#[cfg(test)]
pub(crate) mod screen_model {
    use unicode_segmentation::UnicodeSegmentation;

    use crate::ansi::Pen;
    use crate::buffer::ScreenBuffer;
    use crate::cell::{Cell, Grapheme, Styles};
    use crate::color::Color;

    pub struct ScreenModel {
        pub width: u16,
        pub height: u16,
        cells: Vec<Cell>,
        cursor: (u16, u16),
        pen: Pen,
    }

    fn extended_color(it: &mut impl Iterator<Item = u16>) -> Color {
        let mut byte = || it.next().expect("color component") as u8;
        match byte() {
            5 => Color::Indexed(byte()),
            2 => Color::Rgb(byte(), byte(), byte()),
            other => panic!("bad extended color {other}"),
        }
    }

    impl ScreenModel {
        pub fn new(width: u16, height: u16) -> Self {
            Self {
                width,
                height,
                cells: vec![Cell::BLANK; usize::from(width) * usize::from(height)],
                cursor: (0, 0),
                pen: Pen::default(),
            }
        }

        pub fn cell(&self, x: u16, y: u16) -> Cell {
            self.cells[usize::from(y) * usize::from(self.width) + usize::from(x)]
        }

        /// Whether the visible screen matches `buf`, absent slots shown as
        /// blanks. Returns the first mismatch.
        pub fn mismatch(&self, buf: &ScreenBuffer) -> Option<(u16, u16, Cell, Cell)> {
            for y in 0..self.height {
                for x in 0..self.width {
                    let want = buf.get(x, y).copied().unwrap_or(Cell::BLANK);
                    let got = self.cell(x, y);
                    if want != got {
                        return Some((x, y, want, got));
                    }
                }
            }
            None
        }

        pub fn apply(&mut self, bytes: &[u8]) {
            let text = std::str::from_utf8(bytes).expect("renderer emits UTF-8");
            let mut rest = text;
            while !rest.is_empty() {
                if let Some(seq) = rest.strip_prefix("\x1b[") {
                    let end = seq
                        .find(|c: char| c.is_ascii_alphabetic())
                        .expect("terminated CSI");
                    let (params, final_byte) = (&seq[..end], &seq[end..=end]);
                    self.csi(params, final_byte);
                    rest = &seq[end + 1..];
                } else {
                    let end = rest.find('\x1b').unwrap_or(rest.len());
                    for g in rest[..end].graphemes(true) {
                        self.print(g);
                    }
                    rest = &rest[end..];
                }
            }
        }

        fn csi(&mut self, params: &str, final_byte: &str) {
            if params.starts_with('?') {
                return; // private modes do not touch the grid
            }
            let nums: Vec<u16> = params
                .split(';')
                .filter(|p| !p.is_empty())
                .map(|p| p.parse().expect("numeric param"))
                .collect();
            match final_byte {
                "H" => {
                    let row = nums.first().copied().unwrap_or(1);
                    let col = nums.get(1).copied().unwrap_or(1);
                    self.cursor = (col - 1, row - 1);
                }
                "J" => self.cells.fill(Cell::BLANK),
                "m" => self.sgr(&nums),
                other => panic!("unexpected CSI final {other:?}"),
            }
        }

        fn sgr(&mut self, nums: &[u16]) {
            let mut it = nums.iter().copied();
            while let Some(n) = it.next() {
                match n {
                    0 => self.pen = Pen::default(),
                    1 => self.pen.styles |= Styles::BOLD,
                    2 => self.pen.styles |= Styles::DIM,
                    3 => self.pen.styles |= Styles::ITALIC,
                    4 => self.pen.styles |= Styles::UNDERLINE,
                    5 => self.pen.styles |= Styles::BLINK,
                    7 => self.pen.styles |= Styles::REVERSE,
                    8 => self.pen.styles |= Styles::HIDDEN,
                    9 => self.pen.styles |= Styles::STRIKETHROUGH,
                    22 => self.pen.styles -= Styles::BOLD | Styles::DIM,
                    23 => self.pen.styles -= Styles::ITALIC,
                    24 => self.pen.styles -= Styles::UNDERLINE,
                    25 => self.pen.styles -= Styles::BLINK,
                    27 => self.pen.styles -= Styles::REVERSE,
                    28 => self.pen.styles -= Styles::HIDDEN,
                    29 => self.pen.styles -= Styles::STRIKETHROUGH,
                    30..=37 => self.pen.fg = Color::Named((n - 30) as u8),
                    38 => self.pen.fg = extended_color(&mut it),
                    39 => self.pen.fg = Color::Default,
                    40..=47 => self.pen.bg = Color::Named((n - 40) as u8),
                    48 => self.pen.bg = extended_color(&mut it),
                    49 => self.pen.bg = Color::Default,
                    90..=97 => self.pen.fg = Color::Named((n - 90 + 8) as u8),
                    100..=107 => self.pen.bg = Color::Named((n - 100 + 8) as u8),
                    other => panic!("unexpected SGR {other}"),
                }
            }
        }

        fn print(&mut self, g: &str) {
            let (x, y) = self.cursor;
            assert!(x < self.width && y < self.height, "print outside screen at {x},{y}");
            let mut cell = Cell::from_grapheme(Grapheme::new(g));
            cell.fg = self.pen.fg;
            cell.bg = self.pen.bg;
            cell.styles = self.pen.styles;
            let idx = usize::from(y) * usize::from(self.width) + usize::from(x);
            self.cells[idx] = cell;
            if cell.is_wide() && x + 1 < self.width {
                self.cells[idx + 1] = Cell::continuation(cell.fg, cell.bg, cell.styles);
            }
            self.cursor.0 = x + u16::from(cell.width);
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
