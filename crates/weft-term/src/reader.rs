// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Event source: stdin bytes in, parsed events out.
//
// A dedicated thread reads stdin and sends byte chunks over a channel; the
// loop thread receives them and runs the parser. Parsing therefore happens
// between frames on the loop thread, never concurrently with a swap.
//
// `next_events` waits for bytes no longer than the caller allows and no
// longer than the parser's escape deadline, so a lone ESC resolves on time
// even when the caller is willing to sleep for a whole tick.
//
// Shutdown: the reader thread polls stdin with a short timeout and checks
// an `AtomicBool` between polls, so it never sits in a blocking `read()`
// when asked to stop.

#[cfg(unix)]
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::debug;

use crate::config::InputConfig;
use crate::input::{Event, Parser};

/// Byte chunk read from stdin. Keys are a few bytes, pastes can be
/// kilobytes.
const READ_BUF_SIZE: usize = 4096;

/// How often the reader thread checks the stop flag (milliseconds).
const POLL_TIMEOUT_MS: i32 = 50;

// ─── StdinReader ─────────────────────────────────────────────────────────────

/// Background stdin reader thread.
struct StdinReader {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl StdinReader {
    fn spawn() -> std::io::Result<(Self, Receiver<Vec<u8>>)> {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("weft-stdin".into())
            .spawn(move || reader_loop(&tx, &stop_flag))?;

        Ok((
            Self {
                handle: Some(handle),
                stop,
            },
            rx,
        ))
    }

    /// Signal the thread and wait for it. Idempotent.
    fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StdinReader {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Poll stdin, read what is there, send it. Exits on the stop flag, EOF,
/// a read error or a dropped receiver.
#[cfg(unix)]
fn reader_loop(tx: &mpsc::Sender<Vec<u8>>, stop: &AtomicBool) {
    use std::os::unix::io::AsRawFd;

    let fd = io::stdin().as_raw_fd();
    let mut buf = [0u8; READ_BUF_SIZE];

    while !stop.load(Ordering::Relaxed) {
        let ready = unsafe {
            let mut pfd = libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            };
            libc::poll(&raw mut pfd, 1, POLL_TIMEOUT_MS)
        };
        if ready <= 0 {
            continue;
        }

        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n <= 0 {
            break;
        }
        #[allow(clippy::cast_sign_loss)] // n > 0
        let chunk = buf[..n as usize].to_vec();
        if tx.send(chunk).is_err() {
            break;
        }
    }
}

/// Blocking fallback: stops at the next read after the flag is set.
#[cfg(not(unix))]
fn reader_loop(tx: &mpsc::Sender<Vec<u8>>, stop: &AtomicBool) {
    use std::io::Read;

    let mut buf = [0u8; READ_BUF_SIZE];
    while !stop.load(Ordering::Relaxed) {
        match std::io::stdin().lock().read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).is_err() {
                    break;
                }
            }
        }
    }
}

// ─── EventSource ─────────────────────────────────────────────────────────────

/// A byte channel plus the parser that turns it into events.
///
/// ```
/// use std::sync::mpsc;
/// use std::time::Duration;
/// use weft_term::config::InputConfig;
/// use weft_term::input::{Event, KeyName};
/// use weft_term::reader::EventSource;
///
/// let (tx, rx) = mpsc::channel();
/// let mut source = EventSource::from_receiver(rx, InputConfig::default());
/// tx.send(b"\x1b[B".to_vec()).unwrap();
/// let events = source.next_events(Duration::from_millis(100));
/// assert!(matches!(&events[..], [Event::Key(k)] if k.name == Some(KeyName::Down)));
/// ```
pub struct EventSource {
    parser: Parser,
    rx: Option<Receiver<Vec<u8>>>,
    reader: Option<StdinReader>,
}

impl EventSource {
    /// Attach to stdin through a background reader thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader thread cannot be spawned.
    pub fn start(config: InputConfig) -> std::io::Result<Self> {
        let (reader, rx) = StdinReader::spawn()?;
        debug!("input attached to stdin");
        Ok(Self {
            parser: Parser::new(config),
            rx: Some(rx),
            reader: Some(reader),
        })
    }

    /// Attach to any byte channel.
    #[must_use]
    pub fn from_receiver(rx: Receiver<Vec<u8>>, config: InputConfig) -> Self {
        Self {
            parser: Parser::new(config),
            rx: Some(rx),
            reader: None,
        }
    }

    /// Still attached to a live byte source?
    #[inline]
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.rx.is_some()
    }

    /// The parser, for inspecting pending state.
    #[inline]
    #[must_use]
    pub const fn parser(&self) -> &Parser {
        &self.parser
    }

    /// Wait up to `max_wait` (less if an escape deadline falls sooner) for
    /// input and return the events it completes.
    ///
    /// Chunks already queued behind the first are parsed in the same call.
    /// When the deadline passes with nothing new, pending bytes flush as
    /// literal keys. If the source has gone away, pending bytes flush and
    /// the source detaches. A detached source returns nothing at once.
    pub fn next_events(&mut self, max_wait: Duration) -> Vec<Event> {
        let Some(rx) = &self.rx else {
            return Vec::new();
        };

        let now = Instant::now();
        let wait = self
            .parser
            .deadline()
            .map_or(max_wait, |d| d.saturating_duration_since(now).min(max_wait));

        match rx.recv_timeout(wait) {
            Ok(bytes) => {
                let mut events = self.parser.feed(&bytes, Instant::now());
                while let Ok(more) = rx.try_recv() {
                    events.extend(self.parser.feed(&more, Instant::now()));
                }
                events
            }
            Err(RecvTimeoutError::Timeout) => self.parser.poll_timeout(Instant::now()),
            Err(RecvTimeoutError::Disconnected) => {
                debug!("input source closed");
                self.rx = None;
                self.parser.flush()
            }
        }
    }

    /// Detach from the source. Pending bytes are discarded, not flushed.
    pub fn stop(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            reader.stop();
        }
        if self.rx.take().is_some() {
            debug!("input detached");
        }
        self.parser.reset();
    }
}

impl Drop for EventSource {
    fn drop(&mut self) {
        self.stop();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::KeyName;
    use pretty_assertions::assert_eq;

    fn fast() -> InputConfig {
        InputConfig {
            escape_timeout: Duration::from_millis(5),
            ..InputConfig::default()
        }
    }

    fn key_names(events: &[Event]) -> Vec<Option<KeyName>> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Key(k) => Some(k.name),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn queued_chunks_parse_together() {
        let (tx, rx) = mpsc::channel();
        let mut source = EventSource::from_receiver(rx, fast());
        tx.send(b"\x1b".to_vec()).unwrap();
        tx.send(b"[A".to_vec()).unwrap();
        tx.send(b"q".to_vec()).unwrap();
        let events = source.next_events(Duration::from_millis(100));
        assert_eq!(key_names(&events), [Some(KeyName::Up), Some(KeyName::Char('q'))]);
    }

    #[test_log::test]
    fn lone_escape_resolves_within_one_call() {
        let (tx, rx) = mpsc::channel();
        let mut source = EventSource::from_receiver(rx, fast());
        tx.send(b"\x1b".to_vec()).unwrap();
        assert!(source.next_events(Duration::from_millis(100)).is_empty());
        assert!(source.parser().has_pending());

        // The deadline is 5 ms out; a 1 s allowance must not be used up.
        let started = Instant::now();
        let events = source.next_events(Duration::from_secs(1));
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(key_names(&events), [Some(KeyName::Escape)]);
        drop(tx);
    }

    #[test]
    fn escape_expires_while_the_caller_is_busy() {
        let (tx, rx) = mpsc::channel();
        let mut source = EventSource::from_receiver(rx, fast());
        tx.send(b"\x1b".to_vec()).unwrap();
        assert!(source.next_events(Duration::from_millis(100)).is_empty());

        // Rendering a slow frame: the deadline passes before we look again.
        thread::sleep(Duration::from_millis(30));
        tx.send(b"x".to_vec()).unwrap();
        let events = source.next_events(Duration::from_millis(100));
        assert_eq!(key_names(&events), [Some(KeyName::Escape), Some(KeyName::Char('x'))]);
    }

    #[test]
    fn idle_wait_returns_nothing() {
        let (_tx, rx) = mpsc::channel::<Vec<u8>>();
        let mut source = EventSource::from_receiver(rx, fast());
        assert!(source.next_events(Duration::from_millis(1)).is_empty());
        assert!(source.is_attached());
    }

    #[test_log::test]
    fn disconnect_flushes_and_detaches() {
        let (tx, rx) = mpsc::channel();
        let mut source = EventSource::from_receiver(rx, InputConfig::default());
        tx.send(b"\x1b[".to_vec()).unwrap();
        assert!(source.next_events(Duration::from_millis(10)).is_empty());
        drop(tx);
        let events = source.next_events(Duration::from_millis(10));
        assert_eq!(key_names(&events), [Some(KeyName::Escape), Some(KeyName::Char('['))]);
        assert!(!source.is_attached());
        assert!(source.next_events(Duration::from_millis(10)).is_empty());
    }

    #[test]
    fn stop_discards_pending() {
        let (tx, rx) = mpsc::channel();
        let mut source = EventSource::from_receiver(rx, InputConfig::default());
        tx.send(b"\x1b".to_vec()).unwrap();
        assert!(source.next_events(Duration::from_millis(10)).is_empty());
        source.stop();
        assert!(!source.parser().has_pending());
        assert!(!source.is_attached());
        tx.send(b"x".to_vec()).ok();
        assert!(source.next_events(Duration::from_millis(10)).is_empty());
    }

    #[test]
    fn stdin_reader_starts_and_stops() {
        let mut source = EventSource::start(InputConfig::default()).unwrap();
        assert!(source.is_attached());
        source.stop();
        source.stop();
        assert!(!source.is_attached());
    }
}
