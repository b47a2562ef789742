// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`, plus the
// SGR parameter builders the differential renderer uses to compute minimal
// style transitions. No state here: the renderer tracks the pen, this module
// only knows the byte-level encoding.
//
// `cursor_to` takes terminal coordinates (1-based, column first) and writes
// them verbatim. Callers working in cell coordinates add one.

use std::io::{self, Write};

use crate::cell::Styles;
use crate::color::Color;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor with CUP. `col` and `row` are 1-based.
#[inline]
pub fn cursor_to(w: &mut impl Write, col: u16, row: u16) -> io::Result<()> {
    write!(w, "\x1b[{row};{col}H")
}

/// Move the cursor to the top-left corner.
#[inline]
pub fn cursor_home(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[H")
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2).
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Reset all SGR attributes (SGR 0).
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

// ─── SGR ─────────────────────────────────────────────────────────────────────

/// Write one SGR sequence carrying `params`. An empty list writes nothing.
pub fn sgr(w: &mut impl Write, params: &[u16]) -> io::Result<()> {
    let Some((first, rest)) = params.split_first() else {
        return Ok(());
    };
    write!(w, "\x1b[{first}")?;
    for p in rest {
        write!(w, ";{p}")?;
    }
    w.write_all(b"m")
}

/// Append the foreground parameters for `color`.
///
/// Named 0–7 → 30–37, named 8–15 → 90–97, indexed → `38;5;n`,
/// RGB → `38;2;r;g;b`, default → 39.
pub fn push_fg_params(params: &mut Vec<u16>, color: Color) {
    push_color_params(params, color, 30, 90, 38, 39);
}

/// Append the background parameters for `color` (40–47, 100–107, `48;…`, 49).
pub fn push_bg_params(params: &mut Vec<u16>, color: Color) {
    push_color_params(params, color, 40, 100, 48, 49);
}

fn push_color_params(
    params: &mut Vec<u16>,
    color: Color,
    base: u16,
    bright_base: u16,
    extended: u16,
    default: u16,
) {
    match color {
        Color::Default => params.push(default),
        Color::Named(n) if n < 8 => params.push(base + u16::from(n)),
        Color::Named(n) if n < 16 => params.push(bright_base + u16::from(n - 8)),
        // Out-of-range names fall back to the palette entry of the same index.
        Color::Named(n) | Color::Indexed(n) => {
            params.extend_from_slice(&[extended, 5, u16::from(n)]);
        }
        Color::Rgb(r, g, b) => {
            params.extend_from_slice(&[extended, 2, u16::from(r), u16::from(g), u16::from(b)]);
        }
    }
}

/// (style bit, on code, off code). BOLD and DIM share off code 22.
const STYLE_CODES: [(Styles, u16, u16); 8] = [
    (Styles::BOLD, 1, 22),
    (Styles::DIM, 2, 22),
    (Styles::ITALIC, 3, 23),
    (Styles::UNDERLINE, 4, 24),
    (Styles::BLINK, 5, 25),
    (Styles::REVERSE, 7, 27),
    (Styles::HIDDEN, 8, 28),
    (Styles::STRIKETHROUGH, 9, 29),
];

/// Append the "on" code of every style in `styles`, in SGR order.
pub fn push_style_params(params: &mut Vec<u16>, styles: Styles) {
    for (flag, on, _) in STYLE_CODES {
        if styles.contains(flag) {
            params.push(on);
        }
    }
}

// ─── Pen ─────────────────────────────────────────────────────────────────────

/// The terminal's current drawing attributes: what the next printed
/// character will look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pen {
    pub fg: Color,
    pub bg: Color,
    pub styles: Styles,
}

impl Pen {
    #[inline]
    #[must_use]
    pub const fn new(fg: Color, bg: Color, styles: Styles) -> Self {
        Self { fg, bg, styles }
    }

    /// Parameters that turn a terminal in state `from` into `self`.
    ///
    /// `None` means the terminal state is unknown: the list then leads with
    /// a full reset and sets everything that is not a default. Otherwise it
    /// carries only what differs, and is empty when nothing does.
    #[must_use]
    pub fn transition_from(&self, from: Option<&Self>) -> Vec<u16> {
        let mut params = Vec::new();
        let Some(prev) = from else {
            params.push(0);
            push_style_params(&mut params, self.styles);
            if !self.fg.is_default() {
                push_fg_params(&mut params, self.fg);
            }
            if !self.bg.is_default() {
                push_bg_params(&mut params, self.bg);
            }
            return params;
        };

        let removed = prev.styles - self.styles;
        let mut added = self.styles - prev.styles;
        let intensity = Styles::BOLD | Styles::DIM;
        if removed.intersects(intensity) {
            // SGR 22 clears both; bring back whichever survives.
            params.push(22);
            added |= self.styles & intensity;
        }
        for (flag, _, off) in STYLE_CODES {
            if removed.contains(flag) && !intensity.contains(flag) {
                params.push(off);
            }
        }
        push_style_params(&mut params, added);
        if prev.fg != self.fg {
            push_fg_params(&mut params, self.fg);
        }
        if prev.bg != self.bg {
            push_bg_params(&mut params, self.bg);
        }
        params
    }
}

/// Write the sequence that sets the foreground to `color`.
pub fn fg(w: &mut impl Write, color: Color) -> io::Result<()> {
    let mut params = Vec::with_capacity(5);
    push_fg_params(&mut params, color);
    sgr(w, &params)
}

/// Write the sequence that sets the background to `color`.
pub fn bg(w: &mut impl Write, color: Color) -> io::Result<()> {
    let mut params = Vec::with_capacity(5);
    push_bg_params(&mut params, color);
    sgr(w, &params)
}

// ─── Synchronized Output ─────────────────────────────────────────────────────

/// Begin synchronized output (DEC 2026): the terminal holds the frame until
/// [`end_sync`].
#[inline]
pub fn begin_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026h")
}

#[inline]
pub fn end_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026l")
}

// ─── Alternate Screen ────────────────────────────────────────────────────────

#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

// ─── Mouse ───────────────────────────────────────────────────────────────────

/// Enable press/release (1000) and drag (1002) tracking with SGR encoding
/// (1006).
pub fn enable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1000h\x1b[?1002h\x1b[?1006h")
}

/// Disable everything [`enable_mouse`] turned on, in reverse order.
pub fn disable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1006l\x1b[?1002l\x1b[?1000l")
}

// ─── Bracketed Paste ─────────────────────────────────────────────────────────

/// Enable bracketed paste (DEC 2004): pasted text arrives between
/// `ESC[200~` and `ESC[201~`.
#[inline]
pub fn enable_bracketed_paste(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2004h")
}

#[inline]
pub fn disable_bracketed_paste(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2004l")
}

// ─── Focus Reporting ─────────────────────────────────────────────────────────

/// Enable focus reporting (DEC 1004): `ESC[I` on gain, `ESC[O` on loss.
#[inline]
pub fn enable_focus_reporting(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1004h")
}

#[inline]
pub fn disable_focus_reporting(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1004l")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
