// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Event loop: input in, frames out, one callback at a time.
//
// Each iteration waits for input no longer than the tick interval (and no
// longer than the parser's escape deadline), hands events to the app,
// applies a pending resize, ticks the app, and renders when something
// changed. Everything runs on one thread, so input handling, painting,
// diffing and the buffer swap never overlap: a frame is fully written
// before the next batch of input is parsed.
//
// Resize: a SIGWINCH handler sets an `AtomicBool`; the loop checks it each
// iteration and asks the caller's size query for the new dimensions. The
// core never queries the terminal size itself.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};

use crate::config::Config;
use crate::context::RenderContext;
use crate::double_buffer::DoubleBuffer;
use crate::error::Result;
use crate::input::Event;
use crate::reader::EventSource;
use crate::renderer::{FrameReport, Renderer};
use crate::terminal::{Mode, Session};

/// Size used when the size query has no answer.
pub const FALLBACK_SIZE: (u16, u16) = (80, 24);

// ─── SIGWINCH ────────────────────────────────────────────────────────────────

static SIGWINCH_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Route SIGWINCH to [`SIGWINCH_RECEIVED`]. Storing to an atomic is
/// async-signal-safe.
#[cfg(unix)]
fn install_sigwinch_handler() {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigwinch_handler as *const () as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&raw mut sa.sa_mask);
        libc::sigaction(libc::SIGWINCH, &raw const sa, std::ptr::null_mut());
    }
}

#[cfg(unix)]
extern "C" fn sigwinch_handler(_sig: libc::c_int) {
    SIGWINCH_RECEIVED.store(true, Ordering::Relaxed);
}

#[cfg(not(unix))]
fn install_sigwinch_handler() {}

// ─── App Trait ───────────────────────────────────────────────────────────────

/// What the app wants after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    Quit,
}

/// Application interface for the event loop.
///
/// Per iteration the loop calls [`on_event`](App::on_event) for each input
/// event, [`on_resize`](App::on_resize) if the size changed,
/// [`on_tick`](App::on_tick), then [`paint`](App::paint) and
/// [`on_frame`](App::on_frame) if anything asked for a repaint. Only
/// `paint` is required.
pub trait App {
    /// Return [`Action::Quit`] to leave the loop.
    fn on_event(&mut self, _event: &Event) -> Action {
        Action::Continue
    }

    /// The buffers already have the new size.
    fn on_resize(&mut self, _width: u16, _height: u16) {}

    /// Called every iteration. Return `true` to request a repaint.
    fn on_tick(&mut self) -> bool {
        false
    }

    /// Draw the whole UI. The back buffer starts out empty.
    fn paint(&mut self, ctx: &mut RenderContext<'_>);

    /// What the last frame cost.
    fn on_frame(&mut self, _report: &FrameReport) {}
}

// ─── EventLoop ───────────────────────────────────────────────────────────────

type SizeQuery = Box<dyn FnMut() -> Option<(u16, u16)>>;

/// Owns the buffers, the renderer and the output stream.
///
/// ```no_run
/// use weft_term::config::Config;
/// use weft_term::context::RenderContext;
/// use weft_term::event_loop::{Action, App, EventLoop};
/// use weft_term::input::Event;
///
/// struct Hello;
///
/// impl App for Hello {
///     fn on_event(&mut self, event: &Event) -> Action {
///         match event {
///             Event::Key(k) if k.sequence == "q" => Action::Quit,
///             _ => Action::Continue,
///         }
///     }
///
///     fn paint(&mut self, ctx: &mut RenderContext<'_>) {
///         ctx.draw_text("hello, press q");
///     }
/// }
///
/// let mut event_loop = EventLoop::new(Config::default(), std::io::stdout(), || Some((80, 24)))?;
/// event_loop.run(&mut Hello)?;
/// # Ok::<(), weft_term::Error>(())
/// ```
pub struct EventLoop<W: Write> {
    config: Config,
    renderer: Renderer,
    buffers: DoubleBuffer,
    out: W,
    size_query: SizeQuery,
}

impl<W: Write> EventLoop<W> {
    /// A loop writing frames to `out`, sized by `size_query` (falling back
    /// to 80×24).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimensions`](crate::Error::InvalidDimensions) if the
    /// query reports a zero dimension.
    pub fn new(
        config: Config,
        out: W,
        mut size_query: impl FnMut() -> Option<(u16, u16)> + 'static,
    ) -> Result<Self> {
        let (width, height) = size_query().unwrap_or(FALLBACK_SIZE);
        Ok(Self {
            renderer: Renderer::new(config.render),
            buffers: DoubleBuffer::new(width, height)?,
            config,
            out,
            size_query: Box::new(size_query),
        })
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> (u16, u16) {
        self.buffers.size()
    }

    #[inline]
    #[must_use]
    pub const fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    #[inline]
    pub const fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    /// Take over the terminal, run until the app quits or stdin closes,
    /// then restore the terminal (also on error).
    ///
    /// # Errors
    ///
    /// Terminal setup, reader spawn, or frame output failures.
    pub fn run(&mut self, app: &mut impl App) -> Result<()> {
        let session = Session::start(&Mode::ALL)?;
        install_sigwinch_handler();
        let mut source = EventSource::start(self.config.input)?;
        info!("event loop running at {}x{}", self.size().0, self.size().1);

        let result = self.run_with(app, &mut source);

        source.stop();
        session.end()?;
        result
    }

    /// The loop itself, over any event source.
    ///
    /// # Errors
    ///
    /// Frame output failures, or a resize to a zero dimension.
    pub fn run_with(&mut self, app: &mut impl App, source: &mut EventSource) -> Result<()> {
        let tick = self.config.event_loop.tick_interval;
        let mut dirty = true;

        loop {
            let events = source.next_events(tick);
            for event in &events {
                if app.on_event(event) == Action::Quit {
                    debug!("event loop: quit requested");
                    return Ok(());
                }
            }
            dirty |= !events.is_empty();

            if SIGWINCH_RECEIVED.swap(false, Ordering::Relaxed) {
                if let Some((width, height)) = (self.size_query)() {
                    dirty |= self.apply_size(app, width, height)?;
                }
            }

            dirty |= app.on_tick();

            if dirty {
                self.frame(app)?;
                dirty = false;
            }

            if !source.is_attached() {
                debug!("event loop: input closed");
                return Ok(());
            }
        }
    }

    /// Resize both buffers and force the next frame to repaint fully.
    /// Returns whether the size actually changed.
    fn apply_size(&mut self, app: &mut impl App, width: u16, height: u16) -> Result<bool> {
        if (width, height) == self.buffers.size() {
            return Ok(false);
        }
        debug!("resize to {width}x{height}");
        self.buffers.resize(width, height)?;
        self.renderer.invalidate();
        app.on_resize(width, height);
        Ok(true)
    }

    /// Paint into the back buffer and render it.
    ///
    /// A failed frame is cleared from the back buffer, so `paint` starts
    /// from an empty buffer again if the loop is resumed.
    fn frame(&mut self, app: &mut impl App) -> Result<FrameReport> {
        let mut ctx = RenderContext::new(self.buffers.back_mut());
        app.paint(&mut ctx);
        match self.renderer.render_frame(&mut self.buffers, &mut self.out) {
            Ok(report) => {
                app.on_frame(&report);
                Ok(report)
            }
            Err(err) => {
                self.buffers.back_mut().clear();
                Err(err)
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
