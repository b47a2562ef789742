// SPDX-License-Identifier: MIT
//
// RenderInstruction: the only thing that ever reaches the output stream.
//
// Renderers do not write bytes. They build an ordered list of fragments
// (cursor moves, style changes, text runs, control sequences) and the
// instruction encodes them. Keeping the two apart means the diff can be
// inspected and measured in tests without parsing escape sequences back.

use std::io::{self, Write};

use crate::ansi;

/// Fixed control sequences a frame may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    ClearScreen,
    Home,
    ResetStyle,
    HideCursor,
    ShowCursor,
    BeginSync,
    EndSync,
}

/// One step of a render instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Move the cursor to a cell position (0-based).
    MoveTo { x: u16, y: u16 },
    /// One SGR sequence with these parameters.
    Style(Vec<u16>),
    /// Printable text, written at the cursor.
    Text(String),
    Control(Control),
}

impl Fragment {
    /// Encode this fragment.
    ///
    /// # Errors
    ///
    /// Whatever `w` reports.
    pub fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        match self {
            Self::MoveTo { x, y } => ansi::cursor_to(w, x.saturating_add(1), y.saturating_add(1)),
            Self::Style(params) => ansi::sgr(w, params),
            Self::Text(text) => w.write_all(text.as_bytes()),
            Self::Control(c) => match c {
                Control::ClearScreen => ansi::clear_screen(w),
                Control::Home => ansi::cursor_home(w),
                Control::ResetStyle => ansi::reset(w),
                Control::HideCursor => ansi::cursor_hide(w),
                Control::ShowCursor => ansi::cursor_show(w),
                Control::BeginSync => ansi::begin_sync(w),
                Control::EndSync => ansi::end_sync(w),
            },
        }
    }
}

/// An ordered fragment list plus the cursor position it leaves behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderInstruction {
    fragments: Vec<Fragment>,
    cursor: Option<(u16, u16)>,
}

impl RenderInstruction {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fragments: Vec::new(),
            cursor: None,
        }
    }

    #[inline]
    pub fn push(&mut self, fragment: Fragment) {
        self.fragments.push(fragment);
    }

    #[inline]
    #[must_use]
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Cell position of the cursor after the instruction is applied, if it
    /// moved at all.
    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> Option<(u16, u16)> {
        self.cursor
    }

    #[inline]
    pub const fn set_cursor(&mut self, x: u16, y: u16) {
        self.cursor = Some((x, y));
    }

    /// Wrap the whole instruction between `before` and `after`.
    pub fn wrap(&mut self, before: Control, after: Control) {
        self.fragments.insert(0, Fragment::Control(before));
        self.fragments.push(Fragment::Control(after));
    }

    /// Encode every fragment in order.
    ///
    /// # Errors
    ///
    /// Whatever `w` reports.
    pub fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        self.fragments.iter().try_for_each(|f| f.write_to(w))
    }

    /// Number of bytes [`write_to`](Self::write_to) would produce.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let mut counter = ByteCounter(0);
        let _ = self.write_to(&mut counter);
        counter.0
    }

    /// The encoded bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut out);
        out
    }
}

struct ByteCounter(usize);

impl Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
