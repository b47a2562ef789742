// SPDX-License-Identifier: MIT
//
// Terminal input parser.
//
// Turns raw input bytes into key, mouse, focus and paste events. Covers the
// protocols `terminal.rs` enables:
//
// - Cursor, navigation and function keys in their CSI and SS3 forms, with
//   the xterm `1;{mod}` / `{n};{mod}~` modifier variants
// - SGR mouse (`ESC [ < code ; x ; y M|m`)
// - Focus reporting (`ESC [ I` / `ESC [ O`)
// - Bracketed paste (everything between `ESC [ 200~` and `ESC [ 201~`)
// - Meta+key as ESC followed by a character
// - UTF-8 text and single-byte control keys
//
// # Design
//
// A byte-level state machine with one deadline. Sequences can span reads,
// so unparsed bytes stay in a pending buffer. When the buffer could still
// grow into a known sequence (a lone ESC, `ESC [`, half an SGR report, a
// split UTF-8 character) the parser arms a deadline and stops. More bytes
// cancel it; if it passes first, [`Parser::poll_timeout`] flushes the
// buffer as literal keys. That silence is what tells the Escape key apart
// from the start of an arrow key.
//
// Nothing here returns an error. Bytes that match nothing degrade to
// literal key events.

use std::fmt;
use std::sync::LazyLock;
use std::time::Instant;

use log::{trace, warn};

use crate::config::InputConfig;

const ESC: u8 = 0x1b;

/// Bracketed paste opening marker.
const PASTE_START: &[u8] = b"\x1b[200~";
/// Bracketed paste closing marker.
const PASTE_END: &[u8] = b"\x1b[201~";
/// SGR mouse report introducer.
const SGR_MOUSE: &[u8] = b"\x1b[<";

// ─── Event Types ─────────────────────────────────────────────────────────────

/// A parsed terminal input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Focus(FocusEvent),
    /// Bracketed paste content, verbatim.
    Paste(String),
}

/// A key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// The raw bytes that produced this key (lossy UTF-8).
    pub sequence: String,
    /// The key, when the bytes decode to one. `None` for invalid bytes.
    pub name: Option<KeyName>,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    /// For escape sequences: the sequence without ESC and modifier
    /// parameter (`[A`, `OP`, `[3~`). `None` for plain characters.
    pub code: Option<String>,
}

impl KeyEvent {
    /// Whether this is `name` with no modifiers.
    #[must_use]
    pub fn is(&self, name: KeyName) -> bool {
        self.name == Some(name) && !self.ctrl && !self.meta
    }

    /// Whether this is Ctrl + `ch`.
    #[must_use]
    pub fn is_ctrl(&self, ch: char) -> bool {
        self.ctrl && self.name == Some(KeyName::Char(ch))
    }
}

/// Key identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyName {
    /// A character key. ASCII letters are lowercase; `shift` records case.
    Char(char),
    Space,
    Enter,
    Tab,
    Backspace,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    /// Keypad 5 with num lock off.
    Clear,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Char(ch) => return write!(f, "{ch}"),
            Self::Space => "space",
            Self::Enter => "enter",
            Self::Tab => "tab",
            Self::Backspace => "backspace",
            Self::Escape => "escape",
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Home => "home",
            Self::End => "end",
            Self::PageUp => "pageup",
            Self::PageDown => "pagedown",
            Self::Insert => "insert",
            Self::Delete => "delete",
            Self::Clear => "clear",
            Self::F1 => "f1",
            Self::F2 => "f2",
            Self::F3 => "f3",
            Self::F4 => "f4",
            Self::F5 => "f5",
            Self::F6 => "f6",
            Self::F7 => "f7",
            Self::F8 => "f8",
            Self::F9 => "f9",
            Self::F10 => "f10",
            Self::F11 => "f11",
            Self::F12 => "f12",
        };
        f.write_str(name)
    }
}

/// What a mouse report describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseKind {
    Down,
    Up,
    /// Motion, with or without a button held.
    Move,
    Wheel,
}

/// An SGR mouse report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MouseEvent {
    pub kind: MouseKind,
    /// 0 left, 1 middle, 2 right, 3 none (plain motion). For wheel
    /// events 0 is up and 1 is down.
    pub button: u8,
    /// Column as reported, 1-based.
    pub x: u16,
    /// Row as reported, 1-based.
    pub y: u16,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub sequence: String,
}

/// Terminal window focus change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusEvent {
    pub focused: bool,
}

// ─── Completion table ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Mods {
    shift: bool,
    meta: bool,
    ctrl: bool,
}

impl Mods {
    const SHIFT: Self = Self {
        shift: true,
        meta: false,
        ctrl: false,
    };

    /// xterm modifier parameter: `1 + bitmask` of shift(1) alt(2) ctrl(4)
    /// meta(8). Alt and meta both count as meta.
    const fn from_param(param: u8) -> Self {
        let bits = param.saturating_sub(1);
        Self {
            shift: bits & 1 != 0,
            meta: bits & (2 | 8) != 0,
            ctrl: bits & 4 != 0,
        }
    }
}

/// One fixed key sequence.
struct Entry {
    seq: Vec<u8>,
    name: KeyName,
    code: String,
    mods: Mods,
}

impl Entry {
    fn key(&self) -> KeyEvent {
        KeyEvent {
            sequence: String::from_utf8_lossy(&self.seq).into_owned(),
            name: Some(self.name),
            ctrl: self.mods.ctrl,
            meta: self.mods.meta,
            shift: self.mods.shift,
            code: Some(self.code.clone()),
        }
    }
}

/// Keys sent as `ESC [ {letter}`, `ESC O {letter}` and `ESC [ 1 ; {mod} {letter}`.
const LETTER_KEYS: [(char, KeyName); 11] = [
    ('A', KeyName::Up),
    ('B', KeyName::Down),
    ('C', KeyName::Right),
    ('D', KeyName::Left),
    ('E', KeyName::Clear),
    ('F', KeyName::End),
    ('H', KeyName::Home),
    ('P', KeyName::F1),
    ('Q', KeyName::F2),
    ('R', KeyName::F3),
    ('S', KeyName::F4),
];

/// Keys sent as `ESC [ {n} ~` and `ESC [ {n} ; {mod} ~`.
const TILDE_KEYS: [(u8, KeyName); 20] = [
    (1, KeyName::Home),
    (2, KeyName::Insert),
    (3, KeyName::Delete),
    (4, KeyName::End),
    (5, KeyName::PageUp),
    (6, KeyName::PageDown),
    (7, KeyName::Home),
    (8, KeyName::End),
    (11, KeyName::F1),
    (12, KeyName::F2),
    (13, KeyName::F3),
    (14, KeyName::F4),
    (15, KeyName::F5),
    (17, KeyName::F6),
    (18, KeyName::F7),
    (19, KeyName::F8),
    (20, KeyName::F9),
    (21, KeyName::F10),
    (23, KeyName::F11),
    (24, KeyName::F12),
];

static TABLE: LazyLock<Vec<Entry>> = LazyLock::new(build_table);

fn build_table() -> Vec<Entry> {
    let mut table = Vec::with_capacity(LETTER_KEYS.len() * 9 + TILDE_KEYS.len() * 8 + 1);
    let mut add = |seq: String, name, code: String, mods| {
        table.push(Entry {
            seq: seq.into_bytes(),
            name,
            code,
            mods,
        });
    };

    for (l, name) in LETTER_KEYS {
        add(format!("\x1b[{l}"), name, format!("[{l}"), Mods::default());
        add(format!("\x1bO{l}"), name, format!("O{l}"), Mods::default());
        for m in 2..=8 {
            add(format!("\x1b[1;{m}{l}"), name, format!("[{l}"), Mods::from_param(m));
        }
    }
    for (n, name) in TILDE_KEYS {
        add(format!("\x1b[{n}~"), name, format!("[{n}~"), Mods::default());
        for m in 2..=8 {
            add(format!("\x1b[{n};{m}~"), name, format!("[{n}~"), Mods::from_param(m));
        }
    }
    add("\x1b[Z".to_owned(), KeyName::Tab, "[Z".to_owned(), Mods::SHIFT);
    table
}

/// Whether `buf` could still grow into some known sequence.
fn is_strict_prefix(buf: &[u8]) -> bool {
    let extends = |seq: &[u8]| seq.len() > buf.len() && seq.starts_with(buf);
    extends(PASTE_START) || extends(SGR_MOUSE) || TABLE.iter().any(|e| extends(&e.seq))
}

// ─── Parser ──────────────────────────────────────────────────────────────────

/// Terminal input parser.
///
/// Feed bytes with [`feed`](Parser::feed); poll [`poll_timeout`](Parser::poll_timeout)
/// once [`deadline`](Parser::deadline) has passed.
///
/// ```
/// use std::time::{Duration, Instant};
/// use weft_term::input::{Event, KeyName, Parser};
///
/// let mut parser = Parser::default();
/// let t0 = Instant::now();
/// assert!(parser.feed(b"\x1b", t0).is_empty());
/// let events = parser.poll_timeout(t0 + Duration::from_millis(100));
/// assert!(matches!(&events[..], [Event::Key(k)] if k.name == Some(KeyName::Escape)));
/// ```
#[derive(Debug)]
pub struct Parser {
    config: InputConfig,
    buf: Vec<u8>,
    /// Inside a bracketed paste; bytes wait for the closing marker.
    in_paste: bool,
    /// Paste bytes already searched for the closing marker.
    paste_scanned: usize,
    deadline: Option<Instant>,
}

/// What the front of the pending buffer amounts to.
enum Step {
    Emit(Event, usize),
    EnterPaste(usize),
    /// Could still become a longer sequence.
    Wait,
}

impl Parser {
    #[must_use]
    pub fn new(config: InputConfig) -> Self {
        Self {
            config,
            buf: Vec::with_capacity(64),
            in_paste: false,
            paste_scanned: 0,
            deadline: None,
        }
    }

    /// Append `bytes` (received at `now`) and return every event they
    /// complete.
    ///
    /// Bytes left pending by an earlier call whose deadline has already
    /// passed are flushed first, so a late arrival never joins them. Any
    /// remaining deadline is then cancelled; if the buffer ends in
    /// something that may still be arriving, a new one is armed at
    /// `now + escape_timeout`. A paste in progress waits for its closing
    /// marker without a deadline, emitting a partial paste event whenever
    /// it outgrows `max_paste_bytes`.
    pub fn feed(&mut self, bytes: &[u8], now: Instant) -> Vec<Event> {
        let mut events = self.poll_timeout(now);
        self.buf.extend_from_slice(bytes);
        self.deadline = None;

        let mut pos = 0;
        while pos < self.buf.len() {
            let rest = &self.buf[pos..];

            if self.in_paste {
                let from = self.paste_scanned.min(rest.len());
                if let Some(end) = find_subsequence(&rest[from..], PASTE_END).map(|i| from + i) {
                    trace!("paste: {end} bytes");
                    events.push(Event::Paste(String::from_utf8_lossy(&rest[..end]).into_owned()));
                    pos += end + PASTE_END.len();
                    self.in_paste = false;
                    self.paste_scanned = 0;
                    continue;
                }
                // The tail may hold the start of the closing marker.
                let keep = PASTE_END.len() - 1;
                if rest.len() > self.config.max_paste_bytes.max(keep + 1) {
                    let cut = utf8_boundary(rest, rest.len() - keep);
                    warn!("paste exceeds {} bytes; emitting {cut} bytes early", self.config.max_paste_bytes);
                    events.push(Event::Paste(String::from_utf8_lossy(&rest[..cut]).into_owned()));
                    pos += cut;
                    self.paste_scanned = 0;
                    continue;
                }
                self.paste_scanned = rest.len().saturating_sub(keep);
                break;
            }

            match next_step(rest) {
                Step::Emit(event, len) => {
                    trace!("input: {event:?}");
                    events.push(event);
                    pos += len;
                }
                Step::EnterPaste(len) => {
                    self.in_paste = true;
                    self.paste_scanned = 0;
                    pos += len;
                }
                Step::Wait => {
                    self.deadline = Some(now + self.config.escape_timeout);
                    break;
                }
            }
        }

        self.buf.drain(..pos);
        events
    }

    /// When pending bytes will be flushed, if anything is pending.
    #[inline]
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Flush pending bytes as literal keys if the deadline has passed.
    pub fn poll_timeout(&mut self, now: Instant) -> Vec<Event> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                trace!("escape timeout: flushing {} bytes", self.buf.len());
                self.flush()
            }
            _ => Vec::new(),
        }
    }

    /// Emit everything pending now: ambiguous bytes as literal keys, an
    /// unterminated paste as a paste event.
    pub fn flush(&mut self) -> Vec<Event> {
        self.deadline = None;
        let events = if self.in_paste {
            self.in_paste = false;
            self.paste_scanned = 0;
            vec![Event::Paste(String::from_utf8_lossy(&self.buf).into_owned())]
        } else {
            literal(&self.buf)
        };
        self.buf.clear();
        events
    }

    /// Discard pending bytes and any paste in progress, without emitting.
    pub fn reset(&mut self) {
        if !self.buf.is_empty() {
            trace!("input reset: discarding {} bytes", self.buf.len());
        }
        self.buf.clear();
        self.in_paste = false;
        self.paste_scanned = 0;
        self.deadline = None;
    }

    /// Are there unconsumed bytes waiting for more input?
    #[inline]
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Inside a bracketed paste?
    #[inline]
    #[must_use]
    pub const fn is_pasting(&self) -> bool {
        self.in_paste
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(InputConfig::default())
    }
}

// ─── Stateless Matching ──────────────────────────────────────────────────────
//
// Everything below reads a slice starting at the front of the pending
// buffer and reports what it found and how long it was.

fn next_step(buf: &[u8]) -> Step {
    if buf[0] == ESC {
        return escape_step(buf);
    }
    match decode_char(buf) {
        Decoded::Char(ch, len) => Step::Emit(Event::Key(char_key(ch, &buf[..len], false)), len),
        Decoded::Incomplete => Step::Wait,
        Decoded::Invalid => Step::Emit(Event::Key(invalid_key()), 1),
    }
}

fn escape_step(buf: &[u8]) -> Step {
    if buf.starts_with(PASTE_START) {
        return Step::EnterPaste(PASTE_START.len());
    }
    match sgr_mouse(buf) {
        Matched::Full(event, len) => return Step::Emit(Event::Mouse(event), len),
        Matched::Partial => return Step::Wait,
        Matched::No => {}
    }
    if let Some(focused) = focus(buf) {
        return Step::Emit(Event::Focus(FocusEvent { focused }), 3);
    }
    if let Some(entry) = TABLE.iter().find(|e| buf.starts_with(&e.seq)) {
        return Step::Emit(Event::Key(entry.key()), entry.seq.len());
    }
    if is_strict_prefix(buf) {
        return Step::Wait;
    }
    match meta_char(buf) {
        Matched::Full(key, len) => Step::Emit(Event::Key(key), len),
        Matched::Partial => Step::Wait,
        // Not a sequence we know: the ESC stands alone, the rest is text.
        Matched::No => Step::Emit(Event::Key(char_key('\x1b', &buf[..1], false)), 1),
    }
}

enum Matched<T> {
    Full(T, usize),
    Partial,
    No,
}

fn focus(buf: &[u8]) -> Option<bool> {
    match buf.get(..3)? {
        b"\x1b[I" => Some(true),
        b"\x1b[O" => Some(false),
        _ => None,
    }
}

/// `ESC [ < code ; x ; y M` (press or motion) / `... m` (release).
fn sgr_mouse(buf: &[u8]) -> Matched<MouseEvent> {
    if !buf.starts_with(SGR_MOUSE) {
        return Matched::No;
    }
    let body = &buf[SGR_MOUSE.len()..];
    let Some(end) = body.iter().position(|b| !(b.is_ascii_digit() || *b == b';')) else {
        return Matched::Partial;
    };
    let release = match body[end] {
        b'M' => false,
        b'm' => true,
        _ => return Matched::No,
    };

    let mut fields = body[..end].split(|b| *b == b';').map(parse_number);
    let (Some(Some(code)), Some(Some(x)), Some(Some(y)), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Matched::No;
    };

    let kind = if code & 64 != 0 {
        MouseKind::Wheel
    } else if code & 32 != 0 {
        MouseKind::Move
    } else if release {
        MouseKind::Up
    } else {
        MouseKind::Down
    };
    let len = SGR_MOUSE.len() + end + 1;
    #[allow(clippy::cast_possible_truncation)] // masked to 2 bits
    let button = (code & 0b11) as u8;
    let event = MouseEvent {
        kind,
        button,
        x,
        y,
        shift: code & 4 != 0,
        meta: code & 8 != 0,
        ctrl: code & 16 != 0,
        sequence: String::from_utf8_lossy(&buf[..len]).into_owned(),
    };
    Matched::Full(event, len)
}

/// ESC followed by one character: that character with meta held.
///
/// `[` and `O` are left alone; after ESC they introduce sequences, and a
/// lone `ESC [` that never completes reads better as two literal keys.
fn meta_char(buf: &[u8]) -> Matched<KeyEvent> {
    let Some(&next) = buf.get(1) else {
        return Matched::Partial;
    };
    if matches!(next, ESC | b'[' | b'O') {
        return Matched::No;
    }
    match decode_char(&buf[1..]) {
        Decoded::Char(ch, len) => Matched::Full(char_key(ch, &buf[..=len], true), len + 1),
        Decoded::Incomplete => Matched::Partial,
        Decoded::Invalid => Matched::No,
    }
}

fn parse_number(field: &[u8]) -> Option<u16> {
    std::str::from_utf8(field).ok()?.parse().ok()
}

// ── Characters ───────────────────────────────────────────────────────────────

enum Decoded {
    Char(char, usize),
    /// A valid UTF-8 lead whose continuation bytes have not all arrived.
    Incomplete,
    Invalid,
}

fn decode_char(buf: &[u8]) -> Decoded {
    let len = utf8_char_len(buf[0]);
    if len == 0 {
        return Decoded::Invalid;
    }
    if buf.len() < len {
        return if buf[1..].iter().all(|b| b & 0xC0 == 0x80) {
            Decoded::Incomplete
        } else {
            Decoded::Invalid
        };
    }
    std::str::from_utf8(&buf[..len])
        .ok()
        .and_then(|s| s.chars().next())
        .map_or(Decoded::Invalid, |ch| Decoded::Char(ch, len))
}

/// Expected byte length of a UTF-8 character from its lead byte; 0 for
/// bytes that cannot start one.
const fn utf8_char_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}

/// The key for one decoded character.
///
/// Control bytes map to their conventional keys: CR and LF to Enter, HT
/// to Tab, BS and DEL to Backspace, NUL to Ctrl+Space, and the rest of
/// 0x01–0x1F to Ctrl + the matching letter or punctuation.
fn char_key(ch: char, raw: &[u8], meta: bool) -> KeyEvent {
    let (name, ctrl, shift) = match ch {
        '\r' | '\n' => (KeyName::Enter, false, false),
        '\t' => (KeyName::Tab, false, false),
        '\x08' | '\x7f' => (KeyName::Backspace, false, false),
        '\x1b' => (KeyName::Escape, false, false),
        '\0' => (KeyName::Space, true, false),
        ' ' => (KeyName::Space, false, false),
        '\x01'..='\x1a' => (KeyName::Char(control_letter(ch, b'a' - 1)), true, false),
        '\x1c'..='\x1f' => (KeyName::Char(control_letter(ch, b'@')), true, false),
        'A'..='Z' => (KeyName::Char(ch.to_ascii_lowercase()), false, true),
        _ => (KeyName::Char(ch), false, false),
    };
    KeyEvent {
        sequence: String::from_utf8_lossy(raw).into_owned(),
        name: Some(name),
        ctrl,
        meta,
        shift,
        code: None,
    }
}

/// `ch` (a C0 control) shifted up by `offset` into printable ASCII.
fn control_letter(ch: char, offset: u8) -> char {
    u8::try_from(ch).map_or(ch, |b| char::from(b + offset))
}

fn invalid_key() -> KeyEvent {
    KeyEvent {
        sequence: char::REPLACEMENT_CHARACTER.to_string(),
        name: None,
        ctrl: false,
        meta: false,
        shift: false,
        code: None,
    }
}

/// Every byte of `buf` as its own literal key (characters kept whole).
fn literal(buf: &[u8]) -> Vec<Event> {
    let mut events = Vec::new();
    let mut pos = 0;
    while pos < buf.len() {
        let rest = &buf[pos..];
        let (key, len) = match decode_char(rest) {
            Decoded::Char(ch, len) => (char_key(ch, &rest[..len], false), len),
            Decoded::Incomplete | Decoded::Invalid => (invalid_key(), 1),
        };
        events.push(Event::Key(key));
        pos += len;
    }
    events
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Back `at` off to the start of a UTF-8 character, unless that would
/// leave nothing before it.
fn utf8_boundary(buf: &[u8], at: usize) -> usize {
    let mut cut = at;
    while cut > 0 && at - cut < 3 && buf.get(cut).is_some_and(|&b| b & 0xC0 == 0x80) {
        cut -= 1;
    }
    if cut == 0 { at } else { cut }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
