// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Terminal session: raw input plus the modes weft switches on.
//
// A `Session` is a guard. `Session::start` puts stdin in raw mode, enables
// each requested `Mode` in order and clears the screen; `end` (or Drop)
// disables them in reverse and restores the saved termios. The exact bytes
// that undo the session are computed up front from the mode list, so the
// normal exit path and the panic hook write the same thing.
//
// The panic hook only uses `try_lock` and raw `write(2)` on fd 1: a panic
// while stdout or a session lock is held must not deadlock the restore.
//
// Terminal size is not queried here. The caller knows how to query it and
// hands the event loop a closure.

use std::io::{self, Write};
use std::sync::{Mutex, Once};

use log::debug;

use crate::ansi;

/// Whether stdin is a terminal.
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

// ─── Modes ───────────────────────────────────────────────────────────────────

/// A terminal mode a session turns on and later back off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Alternate screen (1049).
    AltScreen,
    /// Cursor hidden (25).
    HiddenCursor,
    /// Button and drag reporting in SGR encoding (1000, 1002, 1006).
    Mouse,
    /// Bracketed paste (2004).
    BracketedPaste,
    /// Focus in/out reports (1004).
    FocusReporting,
}

impl Mode {
    /// Everything the event loop uses, in the order it is enabled.
    pub const ALL: [Self; 5] = [
        Self::AltScreen,
        Self::HiddenCursor,
        Self::Mouse,
        Self::BracketedPaste,
        Self::FocusReporting,
    ];

    /// Write the sequence that turns this mode on.
    ///
    /// # Errors
    ///
    /// Whatever `w` reports.
    pub fn enable(self, w: &mut impl Write) -> io::Result<()> {
        match self {
            Self::AltScreen => ansi::enter_alt_screen(w),
            Self::HiddenCursor => ansi::cursor_hide(w),
            Self::Mouse => ansi::enable_mouse(w),
            Self::BracketedPaste => ansi::enable_bracketed_paste(w),
            Self::FocusReporting => ansi::enable_focus_reporting(w),
        }
    }

    /// Write the sequence that turns this mode off.
    ///
    /// # Errors
    ///
    /// Whatever `w` reports.
    pub fn disable(self, w: &mut impl Write) -> io::Result<()> {
        match self {
            Self::AltScreen => ansi::exit_alt_screen(w),
            Self::HiddenCursor => ansi::cursor_show(w),
            Self::Mouse => ansi::disable_mouse(w),
            Self::BracketedPaste => ansi::disable_bracketed_paste(w),
            Self::FocusReporting => ansi::disable_focus_reporting(w),
        }
    }
}

/// Bytes that enable `modes` in order, then clear the screen.
#[must_use]
pub fn enter_sequence(modes: &[Mode]) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    for mode in modes {
        // Writing into a Vec cannot fail.
        let _ = mode.enable(&mut out);
    }
    let _ = ansi::clear_screen(&mut out);
    out
}

/// Bytes that undo a session over `modes`: close any frame left open
/// mid-sync, reset the pen, then disable the modes in reverse. When the
/// alternate screen is among them it is left last, so the shell reappears
/// clean.
#[must_use]
pub fn restore_sequence(modes: &[Mode]) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    let _ = ansi::end_sync(&mut out);
    let _ = ansi::reset(&mut out);
    for mode in modes.iter().rev() {
        let _ = mode.disable(&mut out);
    }
    out
}

// ─── Panic Restore ───────────────────────────────────────────────────────────

/// What the panic hook writes to fd 1; empty outside a session.
static PANIC_RESTORE: Mutex<Vec<u8>> = Mutex::new(Vec::new());

/// The termios to put back after a panic.
#[cfg(unix)]
static SAVED_TERMIOS: Mutex<Option<libc::termios>> = Mutex::new(None);

static PANIC_HOOK: Once = Once::new();

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            restore_after_panic();
            previous(info);
        }));
    });
}

fn restore_after_panic() {
    if let Ok(bytes) = PANIC_RESTORE.try_lock() {
        write_stdout_raw(&bytes);
    }
    #[cfg(unix)]
    if let Ok(saved) = SAVED_TERMIOS.try_lock() {
        if let Some(termios) = saved.as_ref() {
            unsafe {
                libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, termios);
            }
        }
    }
}

#[cfg(unix)]
fn write_stdout_raw(bytes: &[u8]) {
    if bytes.is_empty() {
        return;
    }
    unsafe {
        libc::write(libc::STDOUT_FILENO, bytes.as_ptr().cast::<libc::c_void>(), bytes.len());
    }
}

#[cfg(not(unix))]
fn write_stdout_raw(bytes: &[u8]) {
    let mut stdout = io::stdout();
    let _ = stdout.write_all(bytes);
    let _ = stdout.flush();
}

fn set_panic_restore(bytes: Vec<u8>) {
    if let Ok(mut slot) = PANIC_RESTORE.lock() {
        *slot = bytes;
    }
}

// ─── Raw Mode ────────────────────────────────────────────────────────────────

/// Stdin switched to raw mode; holds the settings to go back to.
#[cfg(unix)]
struct RawMode {
    saved: libc::termios,
}

#[cfg(unix)]
impl RawMode {
    /// `None` when stdin is not a terminal (tests, pipes).
    fn enable() -> io::Result<Option<Self>> {
        if !is_tty() {
            return Ok(None);
        }
        let saved = unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(libc::STDIN_FILENO, &raw mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }
            termios
        };
        let mut termios = saved;
        unsafe {
            libc::cfmakeraw(&raw mut termios);
            if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw const termios) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        if let Ok(mut slot) = SAVED_TERMIOS.lock() {
            *slot = Some(saved);
        }
        Ok(Some(Self { saved }))
    }

    fn disable(&self) -> io::Result<()> {
        let rc = unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw const self.saved) };
        if let Ok(mut slot) = SAVED_TERMIOS.lock() {
            *slot = None;
        }
        if rc == 0 { Ok(()) } else { Err(io::Error::last_os_error()) }
    }
}

#[cfg(not(unix))]
struct RawMode;

#[cfg(not(unix))]
impl RawMode {
    #[allow(clippy::unnecessary_wraps)]
    const fn enable() -> io::Result<Option<Self>> {
        Ok(None)
    }

    #[allow(clippy::unnecessary_wraps)]
    const fn disable(&self) -> io::Result<()> {
        Ok(())
    }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// A live terminal session. Dropping it restores the terminal.
///
/// ```no_run
/// use weft_term::terminal::{Mode, Session};
///
/// let session = Session::start(&Mode::ALL)?;
/// // ... frames, input ...
/// session.end()?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Session {
    modes: Vec<Mode>,
    restore: Vec<u8>,
    raw: Option<RawMode>,
    ended: bool,
}

impl Session {
    /// Raw mode on, `modes` enabled in order, screen cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if termios or the write to stdout fails. Raw mode
    /// is undone again if the write fails.
    pub fn start(modes: &[Mode]) -> io::Result<Self> {
        install_panic_hook();
        let raw = RawMode::enable()?;
        let mut session = Self {
            modes: modes.to_vec(),
            restore: restore_sequence(modes),
            raw,
            ended: false,
        };
        set_panic_restore(session.restore.clone());

        let stdout = io::stdout();
        let mut lock = stdout.lock();
        if let Err(err) = lock.write_all(&enter_sequence(modes)).and_then(|()| lock.flush()) {
            drop(lock);
            let _ = session.finish();
            return Err(err);
        }
        debug!("terminal session started: {modes:?} (tty={})", session.raw.is_some());
        Ok(session)
    }

    /// The modes this session enabled, in order.
    #[inline]
    #[must_use]
    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    /// Restore the terminal now and report any failure.
    ///
    /// # Errors
    ///
    /// Returns the first write or termios error; the remaining steps still
    /// run.
    pub fn end(mut self) -> io::Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> io::Result<()> {
        if self.ended {
            return Ok(());
        }
        self.ended = true;
        set_panic_restore(Vec::new());

        let stdout = io::stdout();
        let mut lock = stdout.lock();
        let written = lock.write_all(&self.restore).and_then(|()| lock.flush());
        drop(lock);
        let raw = self.raw.take().map_or(Ok(()), |raw| raw.disable());
        debug!("terminal session ended");
        written.and(raw)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(bytes: &[u8]) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// Private mode numbers in `s`, in order of appearance.
    fn private_modes(s: &str) -> Vec<u16> {
        s.split("\x1b[?")
            .skip(1)
            .filter_map(|part| part.split(['h', 'l']).next()?.parse().ok())
            .collect()
    }

    #[test]
    fn enter_and_restore_for_all_modes() {
        assert_eq!(
            text(&enter_sequence(&Mode::ALL)),
            "\x1b[?1049h\x1b[?25l\x1b[?1000h\x1b[?1002h\x1b[?1006h\x1b[?2004h\x1b[?1004h\x1b[2J"
        );
        assert_eq!(
            text(&restore_sequence(&Mode::ALL)),
            "\x1b[?2026l\x1b[0m\x1b[?1004l\x1b[?2004l\x1b[?1006l\x1b[?1002l\x1b[?1000l\x1b[?25h\x1b[?1049l"
        );
    }

    #[test]
    fn every_mode_is_undone_by_its_disable() {
        for mode in Mode::ALL {
            let mut on = Vec::new();
            let mut off = Vec::new();
            mode.enable(&mut on).unwrap();
            mode.disable(&mut off).unwrap();
            let mut enabled = private_modes(&text(&on));
            let mut disabled = private_modes(&text(&off));
            enabled.sort_unstable();
            disabled.sort_unstable();
            assert!(!enabled.is_empty(), "{mode:?}");
            assert_eq!(enabled, disabled, "{mode:?}");
        }
    }

    #[test]
    fn restore_covers_only_the_session_modes() {
        let s = text(&restore_sequence(&[Mode::BracketedPaste]));
        assert_eq!(s, "\x1b[?2026l\x1b[0m\x1b[?2004l");
        assert!(!s.contains("1049"));
    }

    #[test]
    fn session_lifecycle_arms_and_clears_the_panic_restore() {
        let session = Session::start(&Mode::ALL).unwrap();
        assert_eq!(session.modes(), Mode::ALL);
        assert_eq!(*PANIC_RESTORE.lock().unwrap(), restore_sequence(&Mode::ALL));
        session.end().unwrap();
        assert!(PANIC_RESTORE.lock().unwrap().is_empty());

        let dropped = Session::start(&[Mode::FocusReporting]).unwrap();
        drop(dropped);
        assert!(PANIC_RESTORE.lock().unwrap().is_empty());
    }
}
