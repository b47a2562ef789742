// SPDX-License-Identifier: MIT
//
// Cell: the atomic unit of screen content.
//
// One cell per character position: a grapheme, two colors, a style set and
// a display width. The whole rendering pipeline exists to produce grids of
// these, diff them, and ship the difference to the terminal.
//
// Graphemes are stored inline (no heap) so a Cell stays `Copy` and the diff
// loop compares plain bytes. Clusters longer than the inline capacity are
// cut at the last whole scalar that fits; in practice that only bites
// exotic ZWJ emoji sequences.
//
// Wide glyphs (CJK, most emoji) take two columns. The first slot holds the
// glyph with `width = 2`; the second holds a continuation placeholder with
// an empty grapheme and `width = 0`. The renderer never writes the
// placeholder itself: the terminal already advanced past it.

use std::fmt;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::color::Color;

// ─── Styles ──────────────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Text styles, one bit per SGR attribute.
    ///
    /// ```
    /// use weft_term::cell::Styles;
    ///
    /// let s = Styles::BOLD | Styles::UNDERLINE;
    /// assert!(s.contains(Styles::BOLD));
    /// assert!(!s.contains(Styles::ITALIC));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Styles: u8 {
        /// SGR 1.
        const BOLD          = 1 << 0;
        /// SGR 2.
        const DIM           = 1 << 1;
        /// SGR 3.
        const ITALIC        = 1 << 2;
        /// SGR 4.
        const UNDERLINE     = 1 << 3;
        /// SGR 5.
        const BLINK         = 1 << 4;
        /// SGR 7.
        const REVERSE       = 1 << 5;
        /// SGR 8.
        const HIDDEN        = 1 << 6;
        /// SGR 9.
        const STRIKETHROUGH = 1 << 7;
    }
}

// ─── Grapheme ────────────────────────────────────────────────────────────────

/// Inline byte capacity of a [`Grapheme`].
pub const GRAPHEME_CAPACITY: usize = 14;

/// One extended grapheme cluster, stored inline as UTF-8.
///
/// The empty grapheme marks a wide-glyph continuation slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Grapheme {
    len: u8,
    bytes: [u8; GRAPHEME_CAPACITY],
}

impl Grapheme {
    /// The continuation marker.
    pub const EMPTY: Self = Self {
        len: 0,
        bytes: [0; GRAPHEME_CAPACITY],
    };

    /// A single space.
    pub const SPACE: Self = {
        let mut bytes = [0; GRAPHEME_CAPACITY];
        bytes[0] = b' ';
        Self { len: 1, bytes }
    };

    /// U+FFFD, stored in place of control characters. Cell text is written
    /// to the terminal verbatim, so C0, DEL and C1 never get in.
    pub const REPLACEMENT: Self = {
        let mut bytes = [0; GRAPHEME_CAPACITY];
        bytes[0] = 0xEF;
        bytes[1] = 0xBF;
        bytes[2] = 0xBD;
        Self { len: 3, bytes }
    };

    /// Store a single scalar value.
    #[must_use]
    pub fn from_char(ch: char) -> Self {
        if ch.is_control() {
            return Self::REPLACEMENT;
        }
        let mut bytes = [0; GRAPHEME_CAPACITY];
        let len = ch.encode_utf8(&mut bytes).len();
        #[allow(clippy::cast_possible_truncation)] // at most 4 bytes
        let len = len as u8;
        Self { len, bytes }
    }

    /// Store the first grapheme cluster of `s`.
    ///
    /// Returns [`Grapheme::EMPTY`] for an empty string and
    /// [`Grapheme::REPLACEMENT`] for a cluster holding a control character.
    /// A cluster that does not fit is cut at the last whole scalar that does.
    #[must_use]
    pub fn new(s: &str) -> Self {
        let Some(cluster) = s.graphemes(true).next() else {
            return Self::EMPTY;
        };
        if cluster.chars().any(char::is_control) {
            return Self::REPLACEMENT;
        }
        let mut end = 0;
        for (idx, ch) in cluster.char_indices() {
            let next = idx + ch.len_utf8();
            if next > GRAPHEME_CAPACITY {
                break;
            }
            end = next;
        }
        let mut bytes = [0; GRAPHEME_CAPACITY];
        bytes[..end].copy_from_slice(&cluster.as_bytes()[..end]);
        #[allow(clippy::cast_possible_truncation)] // end <= GRAPHEME_CAPACITY
        let len = end as u8;
        Self { len, bytes }
    }

    /// The cluster as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..usize::from(self.len)]).unwrap_or_default()
    }

    /// Whether this is the continuation marker.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Display width in columns (0, 1 or 2).
    #[must_use]
    pub fn width(&self) -> usize {
        self.as_str().width().min(2)
    }
}

impl Default for Grapheme {
    fn default() -> Self {
        Self::SPACE
    }
}

impl fmt::Debug for Grapheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl From<char> for Grapheme {
    fn from(ch: char) -> Self {
        Self::from_char(ch)
    }
}

impl From<&str> for Grapheme {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// The content of one character position.
///
/// Equality is structural over every field. Two cells that look the same
/// on screen but differ in, say, a hidden style bit are different cells.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    /// The glyph. Empty for a continuation slot.
    pub symbol: Grapheme,
    /// Foreground color.
    pub fg: Color,
    /// Background color.
    pub bg: Color,
    /// Text styles.
    pub styles: Styles,
    /// Display width: 1, 2 for a wide glyph, 0 for its continuation slot.
    pub width: u8,
}

impl Cell {
    /// A default-styled space, which is what an untouched slot looks like on screen.
    pub const BLANK: Self = Self {
        symbol: Grapheme::SPACE,
        fg: Color::Default,
        bg: Color::Default,
        styles: Styles::empty(),
        width: 1,
    };

    /// A default-styled cell holding `ch`.
    #[must_use]
    pub fn new(ch: char) -> Self {
        Self::from_grapheme(Grapheme::from_char(ch))
    }

    /// A default-styled cell holding the first grapheme of `s`.
    #[must_use]
    pub fn from_text(s: &str) -> Self {
        Self::from_grapheme(Grapheme::new(s))
    }

    /// A default-styled cell for an already-segmented grapheme.
    ///
    /// Width is derived from the grapheme; zero-width clusters count as 1
    /// so every non-continuation cell occupies its slot.
    #[must_use]
    pub fn from_grapheme(symbol: Grapheme) -> Self {
        #[allow(clippy::cast_possible_truncation)] // clamped to 1..=2
        let width = symbol.width().clamp(1, 2) as u8;
        Self {
            symbol,
            width,
            ..Self::BLANK
        }
    }

    /// A continuation placeholder for the second column of a wide glyph.
    ///
    /// Carries the owner's colors and styles so the slot compares equal
    /// across frames whenever its owner does.
    #[must_use]
    pub const fn continuation(fg: Color, bg: Color, styles: Styles) -> Self {
        Self {
            symbol: Grapheme::EMPTY,
            fg,
            bg,
            styles,
            width: 0,
        }
    }

    /// Whether this is a continuation placeholder.
    #[inline]
    #[must_use]
    pub const fn is_continuation(&self) -> bool {
        self.symbol.is_empty()
    }

    /// Whether this cell is a wide (two-column) glyph.
    #[inline]
    #[must_use]
    pub const fn is_wide(&self) -> bool {
        self.width == 2
    }

    /// Same colors and styles, regardless of glyph.
    #[inline]
    #[must_use]
    pub fn same_style(&self, other: &Self) -> bool {
        self.fg == other.fg && self.bg == other.bg && self.styles == other.styles
    }

    #[inline]
    #[must_use]
    pub const fn with_fg(self, fg: Color) -> Self {
        Self { fg, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_bg(self, bg: Color) -> Self {
        Self { bg, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_styles(self, styles: Styles) -> Self {
        Self { styles, ..self }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::BLANK
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_continuation() {
            return write!(f, "Cell(continuation)");
        }
        write!(f, "Cell({:?}", self.symbol)?;
        if !self.fg.is_default() {
            write!(f, ", fg={:?}", self.fg)?;
        }
        if !self.bg.is_default() {
            write!(f, ", bg={:?}", self.bg)?;
        }
        if !self.styles.is_empty() {
            write!(f, ", {:?}", self.styles)?;
        }
        if self.width == 2 {
            write!(f, ", wide")?;
        }
        write!(f, ")")
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_is_default_space() {
        let cell = Cell::default();
        assert_eq!(cell, Cell::BLANK);
        assert_eq!(cell.symbol.as_str(), " ");
        assert_eq!(cell.width, 1);
        assert!(cell.styles.is_empty());
    }

    #[test]
    fn control_characters_are_replaced() {
        for ch in ['\x1b', '\r', '\n', '\x07', '\x7f', '\u{9b}'] {
            assert_eq!(Grapheme::from_char(ch), Grapheme::REPLACEMENT, "{ch:?}");
        }
        assert_eq!(Grapheme::new("\r\n"), Grapheme::REPLACEMENT);
        assert_eq!(Grapheme::new("\x1b[31m"), Grapheme::REPLACEMENT);
        assert_eq!(Grapheme::REPLACEMENT.as_str(), "\u{fffd}");
        assert_eq!(Grapheme::REPLACEMENT.width(), 1);
        assert_eq!(Cell::new('\t').symbol, Grapheme::REPLACEMENT);
        assert_eq!(Grapheme::new("é").as_str(), "é");
    }

    #[test]
    fn cell_is_copy_and_small() {
        let a = Cell::new('x');
        let b = a;
        assert_eq!(a, b);
        assert!(std::mem::size_of::<Cell>() <= 32);
    }

    #[test]
    fn narrow_and_wide_widths() {
        assert_eq!(Cell::new('a').width, 1);
        assert_eq!(Cell::new('日').width, 2);
        assert!(Cell::new('日').is_wide());
        assert_eq!(Cell::from_text("🔥").width, 2);
    }

    #[test]
    fn zero_width_cluster_still_occupies_one_column() {
        assert_eq!(Cell::new('\u{200B}').width, 1);
    }

    #[test]
    fn grapheme_keeps_combining_marks_together() {
        let g = Grapheme::new("e\u{301}x");
        assert_eq!(g.as_str(), "e\u{301}");
        assert_eq!(g.width(), 1);
    }

    #[test]
    fn grapheme_of_empty_string_is_empty() {
        assert!(Grapheme::new("").is_empty());
        assert_eq!(Grapheme::default().as_str(), " ");
    }

    #[test]
    fn oversized_cluster_is_cut_at_scalar_boundary() {
        // Family emoji: 7 scalars, 25 bytes.
        let family = "👨\u{200D}👩\u{200D}👧\u{200D}👦";
        let g = Grapheme::new(family);
        assert!(g.as_str().len() <= GRAPHEME_CAPACITY);
        assert!(family.starts_with(g.as_str()));
        assert!(!g.is_empty());
    }

    #[test]
    fn continuation_carries_owner_style() {
        let cont = Cell::continuation(Color::RED, Color::BLUE, Styles::BOLD);
        assert!(cont.is_continuation());
        assert_eq!(cont.width, 0);
        assert_eq!(cont.fg, Color::RED);
        assert_eq!(cont.bg, Color::BLUE);
        assert!(cont.styles.contains(Styles::BOLD));
    }

    #[test]
    fn equality_is_structural() {
        let a = Cell::new('A').with_fg(Color::RED);
        assert_eq!(a, Cell::new('A').with_fg(Color::RED));
        assert_ne!(a, Cell::new('A').with_fg(Color::Named(2)));
        assert_ne!(a, Cell::new('A').with_fg(Color::RED).with_styles(Styles::HIDDEN));
        assert_ne!(a, Cell::new('B').with_fg(Color::RED));
    }

    #[test]
    fn same_style_ignores_glyph() {
        let a = Cell::new('A').with_bg(Color::Indexed(236));
        let b = Cell::new('B').with_bg(Color::Indexed(236));
        assert!(a.same_style(&b));
        assert!(!a.same_style(&b.with_styles(Styles::ITALIC)));
    }

    #[test]
    fn all_styles_fit_in_one_byte() {
        assert_eq!(Styles::all().bits(), 0xFF);
    }

    #[test]
    fn debug_format() {
        let cell = Cell::new('A').with_fg(Color::Rgb(255, 0, 0)).with_styles(Styles::BOLD);
        let dbg = format!("{cell:?}");
        assert!(dbg.starts_with("Cell(\"A\""));
        assert!(dbg.contains("fg=#ff0000"));
        assert!(dbg.contains("BOLD"));
        assert_eq!(
            format!("{:?}", Cell::continuation(Color::Default, Color::Default, Styles::empty())),
            "Cell(continuation)"
        );
    }
}
