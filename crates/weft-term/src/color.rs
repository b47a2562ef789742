// SPDX-License-Identifier: MIT
//
// Color: the four ways a terminal cell can be colored.
//
// The theme system upstream produces these; this crate only stores,
// compares and encodes them. Comparison is structural: `Named(1)` and
// `Indexed(1)` render the same on most terminals but are different values,
// and the diff treats them as different.
//
// Capability negotiation happens elsewhere. When the caller tells us the
// terminal only speaks 256 or 16 colors, `downgrade` maps true-color values
// onto the nearest palette entry at encode time. Cells keep their original
// color so a later upgrade costs nothing.

use std::fmt;

// ─── Color ───────────────────────────────────────────────────────────────────

/// A terminal color.
///
/// ```
/// use weft_term::color::Color;
///
/// assert_eq!(Color::named(9), Some(Color::BRIGHT_RED));
/// assert_eq!(Color::named(16), None);
/// assert_eq!(Color::hex("#ff8000"), Some(Color::Rgb(255, 128, 0)));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// The terminal's own default (SGR 39 / 49).
    #[default]
    Default,
    /// One of the 16 named colors, `0..=15`. `8..=15` are the bright variants.
    Named(u8),
    /// An entry of the 256-color palette.
    Indexed(u8),
    /// 24-bit true color.
    Rgb(u8, u8, u8),
}

impl Color {
    pub const BLACK: Self = Self::Named(0);
    pub const RED: Self = Self::Named(1);
    pub const GREEN: Self = Self::Named(2);
    pub const YELLOW: Self = Self::Named(3);
    pub const BLUE: Self = Self::Named(4);
    pub const MAGENTA: Self = Self::Named(5);
    pub const CYAN: Self = Self::Named(6);
    pub const WHITE: Self = Self::Named(7);
    pub const BRIGHT_BLACK: Self = Self::Named(8);
    pub const BRIGHT_RED: Self = Self::Named(9);
    pub const BRIGHT_GREEN: Self = Self::Named(10);
    pub const BRIGHT_YELLOW: Self = Self::Named(11);
    pub const BRIGHT_BLUE: Self = Self::Named(12);
    pub const BRIGHT_MAGENTA: Self = Self::Named(13);
    pub const BRIGHT_CYAN: Self = Self::Named(14);
    pub const BRIGHT_WHITE: Self = Self::Named(15);

    /// A named color, or `None` outside `0..=15`.
    #[inline]
    #[must_use]
    pub const fn named(n: u8) -> Option<Self> {
        if n < 16 { Some(Self::Named(n)) } else { None }
    }

    /// Parse `#rrggbb` or `#rgb` (the leading `#` is optional).
    #[must_use]
    pub fn hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix('#').unwrap_or(s);
        if !s.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(s.get(range)?, 16).ok();
        match s.len() {
            6 => Some(Self::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            3 => {
                let (r, g, b) = (channel(0..1)?, channel(1..2)?, channel(2..3)?);
                Some(Self::Rgb(r * 17, g * 17, b * 17))
            }
            _ => None,
        }
    }

    /// Whether this is the terminal default.
    #[inline]
    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Default)
    }

    /// Approximate RGB value, using the xterm palette for indexed colors.
    ///
    /// `None` for [`Color::Default`]: only the terminal knows what that is.
    #[must_use]
    pub fn to_rgb(self) -> Option<(u8, u8, u8)> {
        match self {
            Self::Default => None,
            Self::Named(n) => Some(palette::indexed_to_rgb(n & 0x0F)),
            Self::Indexed(n) => Some(palette::indexed_to_rgb(n)),
            Self::Rgb(r, g, b) => Some((r, g, b)),
        }
    }

    /// Map this color into what a terminal of the given depth can show.
    ///
    /// Named colors pass through every depth. Palette colors above 15 fold
    /// to the nearest named color on 16-color terminals.
    #[must_use]
    pub fn downgrade(self, depth: ColorDepth) -> Self {
        match (self, depth) {
            (Self::Default | Self::Named(_), _) | (_, ColorDepth::TrueColor) => self,
            (Self::Indexed(_), ColorDepth::Ansi256) => self,
            (Self::Rgb(r, g, b), ColorDepth::Ansi256) => {
                Self::Indexed(palette::nearest(r, g, b, 0..=255))
            }
            (Self::Indexed(n), ColorDepth::Ansi16) if n < 16 => Self::Named(n),
            (Self::Indexed(n), ColorDepth::Ansi16) => {
                let (r, g, b) = palette::indexed_to_rgb(n);
                Self::Named(palette::nearest(r, g, b, 0..=15))
            }
            (Self::Rgb(r, g, b), ColorDepth::Ansi16) => {
                Self::Named(palette::nearest(r, g, b, 0..=15))
            }
        }
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Named(n) => write!(f, "named({n})"),
            Self::Indexed(n) => write!(f, "indexed({n})"),
            Self::Rgb(r, g, b) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ─── ColorDepth ──────────────────────────────────────────────────────────────

/// How many colors the attached terminal can display.
///
/// Supplied by whoever detects terminal capabilities; the encoder uses it
/// to downgrade colors the terminal would otherwise misrender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorDepth {
    /// The 16 named colors only.
    Ansi16,
    /// The xterm 256-color palette.
    Ansi256,
    /// 24-bit RGB.
    #[default]
    TrueColor,
}

impl ColorDepth {
    /// Parse `16`, `256`, `truecolor` / `24bit` (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "16" | "ansi16" => Some(Self::Ansi16),
            "256" | "ansi256" => Some(Self::Ansi256),
            "truecolor" | "24bit" | "rgb" => Some(Self::TrueColor),
            _ => None,
        }
    }
}

// ─── Palette ─────────────────────────────────────────────────────────────────

/// xterm palette lookup and nearest-color search.
pub mod palette {
    use std::ops::RangeInclusive;

    /// The 16 named colors as xterm renders them by default.
    pub const NAMED_RGB: [(u8, u8, u8); 16] = [
        (0, 0, 0),
        (128, 0, 0),
        (0, 128, 0),
        (128, 128, 0),
        (0, 0, 128),
        (128, 0, 128),
        (0, 128, 128),
        (192, 192, 192),
        (128, 128, 128),
        (255, 0, 0),
        (0, 255, 0),
        (255, 255, 0),
        (0, 0, 255),
        (255, 0, 255),
        (0, 255, 255),
        (255, 255, 255),
    ];

    /// RGB value of a 256-color palette index.
    #[must_use]
    pub fn indexed_to_rgb(idx: u8) -> (u8, u8, u8) {
        match idx {
            0..=15 => NAMED_RGB[usize::from(idx)],
            16..=231 => {
                let i = idx - 16;
                let level = |v: u8| if v == 0 { 0 } else { 55 + 40 * v };
                (level(i / 36), level((i % 36) / 6), level(i % 6))
            }
            232..=255 => {
                let v = 8 + 10 * (idx - 232);
                (v, v, v)
            }
        }
    }

    /// Nearest palette index within `range` by weighted ("redmean") RGB distance.
    #[must_use]
    pub fn nearest(r: u8, g: u8, b: u8, range: RangeInclusive<u8>) -> u8 {
        let mut best = *range.start();
        let mut best_dist = u32::MAX;
        for idx in range {
            let (pr, pg, pb) = indexed_to_rgb(idx);
            let dist = redmean(r, g, b, pr, pg, pb);
            if dist < best_dist {
                best_dist = dist;
                best = idx;
            }
            if dist == 0 {
                break;
            }
        }
        best
    }

    #[allow(clippy::cast_sign_loss)]
    fn redmean(r1: u8, g1: u8, b1: u8, r2: u8, g2: u8, b2: u8) -> u32 {
        let rmean = (i32::from(r1) + i32::from(r2)) / 2;
        let dr = i32::from(r1) - i32::from(r2);
        let dg = i32::from(g1) - i32::from(g2);
        let db = i32::from(b1) - i32::from(b2);
        (((512 + rmean) * dr * dr) / 256 + 4 * dg * dg + ((767 - rmean) * db * db) / 256) as u32
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
