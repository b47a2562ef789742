// SPDX-License-Identifier: MIT
//
// weft: live demo for weft-term.
//
// Draws a dashboard of the drawing primitives on the left and a log of every
// input event on the right, so you can watch the parser and the renderer at
// work:
//
//   ┌ weft ────────────────────────────────────────────┐
//   │┌ widgets ───────────────┐┌ events ──────────────┐│
//   ││ progress, checkbox,    ││ key up               ││
//   ││ radios, frame stats    ││ mouse down b0 at 3,4 ▐│
//   │└────────────────────────┘└──────────────────────┘│
//   └ q quit · space toggle · tab select · ↑↓ scroll ──┘
//
// Usage: weft [--strategy full|diff|smart] [--log PATH]
//
// The terminal is in raw mode, so logs go to a file (weft.log by default).
// RUST_LOG picks the level; WEFT_* variables tune the renderer.

use std::collections::VecDeque;
use std::env;
use std::fs::File;
use std::io;

use anyhow::{Context, bail};
use log::info;

use weft_term::buffer::Rect;
use weft_term::color::Color;
use weft_term::config::Config;
use weft_term::context::RenderContext;
use weft_term::event_loop::{Action, App, EventLoop};
use weft_term::input::{Event, KeyEvent, KeyName, MouseKind};
use weft_term::primitives::BorderStyle;
use weft_term::renderer::FrameReport;
use weft_term::strategy::{RenderKind, StrategyKind};

/// Events kept in the log panel.
const LOG_CAPACITY: usize = 500;

const RADIO_LABELS: [&str; 3] = ["full", "diff", "smart"];

// ─── Dashboard ───────────────────────────────────────────────────────────────

struct Dashboard {
    events: VecDeque<String>,
    /// Lines scrolled back from the newest event.
    scroll: usize,
    progress: f64,
    checked: bool,
    selected: usize,
    focused: bool,
    size: (u16, u16),
    frames: u64,
    last_frame: Option<FrameReport>,
}

impl Dashboard {
    fn new(size: (u16, u16)) -> Self {
        Self {
            events: VecDeque::with_capacity(LOG_CAPACITY),
            scroll: 0,
            progress: 0.0,
            checked: true,
            selected: 2,
            focused: true,
            size,
            frames: 0,
            last_frame: None,
        }
    }

    fn push(&mut self, line: String) {
        if self.events.len() == LOG_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(line);
    }

    fn scroll_by(&mut self, delta: isize) {
        let max = self.events.len().saturating_sub(1);
        self.scroll = self.scroll.saturating_add_signed(delta).min(max);
    }

    fn on_key(&mut self, key: &KeyEvent) -> Action {
        if key.is_ctrl('c') || (key.name == Some(KeyName::Char('q')) && !key.ctrl && !key.meta) {
            return Action::Quit;
        }
        match key.name {
            Some(KeyName::Space) => self.checked = !self.checked,
            Some(KeyName::Tab) if key.shift => {
                self.selected = (self.selected + RADIO_LABELS.len() - 1) % RADIO_LABELS.len();
            }
            Some(KeyName::Tab) => self.selected = (self.selected + 1) % RADIO_LABELS.len(),
            Some(KeyName::Up) => self.scroll_by(1),
            Some(KeyName::Down) => self.scroll_by(-1),
            Some(KeyName::PageUp) => self.scroll_by(10),
            Some(KeyName::PageDown) => self.scroll_by(-10),
            Some(KeyName::End) => self.scroll = 0,
            _ => {}
        }
        Action::Continue
    }

    fn paint_widgets(&self, ctx: &mut RenderContext<'_>, area: Rect) {
        ctx.draw_box(area, BorderStyle::Single, Some("widgets"));
        let inner = area.inset(1);
        if inner.is_empty() {
            return;
        }
        ctx.push_clip(inner);
        let (x, mut y) = (inner.x + 1, inner.y);

        ctx.set_fg(Color::GREEN);
        ctx.progress_bar(x, y, inner.width.saturating_sub(2), self.progress, true);
        ctx.reset_style();
        y += 2;

        ctx.checkbox(x, y, self.checked, "synchronized output");
        y += 1;
        let mut rx = x;
        for (i, label) in RADIO_LABELS.iter().enumerate() {
            rx = ctx.radio(rx, y, i == self.selected, label) + 2;
        }
        y += 2;

        let focus = if self.focused { "focused" } else { "unfocused" };
        let (w, h) = self.size;
        let mut rows = vec![
            vec!["size".to_owned(), format!("{w}x{h}")],
            vec!["window".to_owned(), focus.to_owned()],
            vec!["frames".to_owned(), self.frames.to_string()],
        ];
        if let Some(report) = &self.last_frame {
            let kind = match report.kind {
                RenderKind::Full => "full",
                RenderKind::Differential => "diff",
            };
            rows.push(vec!["last frame".to_owned(), kind.to_owned()]);
            rows.push(vec![
                "changed".to_owned(),
                format!("{}/{}", report.stats.changed_cells, report.stats.total_cells),
            ]);
            rows.push(vec!["bytes".to_owned(), report.bytes_written.to_string()]);
        }
        let headers = ["stat", "value"].map(str::to_owned);
        let table = ctx.draw_table(x, y, &headers, &rows, BorderStyle::Rounded);
        y = table.bottom() + 1;

        ctx.set_fg(Color::BRIGHT_BLACK);
        let span = i32::from(inner.width.saturating_sub(3));
        ctx.draw_line(x, y, x + span, y + 3, '·');
        ctx.reset_style();
        ctx.pop_clip();
    }

    fn paint_events(&self, ctx: &mut RenderContext<'_>, area: Rect) {
        ctx.draw_box(area, BorderStyle::Single, Some("events"));
        let inner = area.inset(1);
        if inner.is_empty() {
            return;
        }
        let visible = usize::from(inner.height);
        let total = self.events.len();
        let end = total.saturating_sub(self.scroll);
        let start = end.saturating_sub(visible);

        ctx.push_clip(Rect::new(inner.x, inner.y, inner.width.saturating_sub(1), inner.height));
        for (row, line) in (inner.y..).zip(self.events.range(start..end)) {
            ctx.draw_text_at(inner.x + 1, row, line);
        }
        ctx.pop_clip();

        ctx.set_fg(Color::CYAN);
        ctx.scrollbar(inner.right() - 1, inner.y, inner.height, total, visible, start);
        ctx.reset_style();
    }
}

fn describe(event: &Event) -> String {
    match event {
        Event::Key(k) => {
            let mut mods = String::new();
            for (on, tag) in [(k.ctrl, "ctrl+"), (k.meta, "meta+"), (k.shift, "shift+")] {
                if on {
                    mods.push_str(tag);
                }
            }
            let name = k.name.map_or_else(|| "?".to_owned(), |n| n.to_string());
            format!("key {mods}{name} {:?}", k.sequence)
        }
        Event::Mouse(m) => {
            let kind = match m.kind {
                MouseKind::Down => "down",
                MouseKind::Up => "up",
                MouseKind::Move => "move",
                MouseKind::Wheel => "wheel",
            };
            format!("mouse {kind} b{} at {},{}", m.button, m.x, m.y)
        }
        Event::Focus(f) => format!("focus {}", if f.focused { "in" } else { "out" }),
        Event::Paste(text) => format!("paste {} chars", text.chars().count()),
    }
}

impl App for Dashboard {
    fn on_event(&mut self, event: &Event) -> Action {
        self.push(describe(event));
        match event {
            Event::Key(k) => self.on_key(k),
            Event::Mouse(m) if m.kind == MouseKind::Wheel => {
                self.scroll_by(if m.button == 0 { 1 } else { -1 });
                Action::Continue
            }
            Event::Focus(f) => {
                self.focused = f.focused;
                Action::Continue
            }
            _ => Action::Continue,
        }
    }

    fn on_resize(&mut self, width: u16, height: u16) {
        self.size = (width, height);
        self.push(format!("resize {width}x{height}"));
    }

    fn on_tick(&mut self) -> bool {
        self.progress += 0.002;
        if self.progress > 1.0 {
            self.progress = 0.0;
        }
        true
    }

    fn paint(&mut self, ctx: &mut RenderContext<'_>) {
        let (w, h) = (ctx.width(), ctx.height());
        let screen = Rect::new(0, 0, w, h);
        ctx.draw_box(screen, BorderStyle::Rounded, Some("weft"));
        ctx.draw_text_at(2, i32::from(h) - 1, " q quit · space toggle · tab select · ↑↓ scroll ");

        let inner = screen.inset(1);
        let left_w = inner.width / 2;
        let left = Rect::new(inner.x, inner.y, left_w, inner.height);
        let right = Rect::new(inner.x + i32::from(left_w), inner.y, inner.width - left_w, inner.height);
        self.paint_widgets(ctx, left);
        self.paint_events(ctx, right);
    }

    fn on_frame(&mut self, report: &FrameReport) {
        self.frames += 1;
        self.last_frame = Some(*report);
    }
}

// ─── Terminal size ───────────────────────────────────────────────────────────

#[cfg(unix)]
#[allow(unsafe_code)]
fn terminal_size() -> Option<(u16, u16)> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &raw mut ws) };
    (rc == 0 && ws.ws_col > 0 && ws.ws_row > 0).then_some((ws.ws_col, ws.ws_row))
}

#[cfg(not(unix))]
const fn terminal_size() -> Option<(u16, u16)> {
    None
}

// ─── Entry point ─────────────────────────────────────────────────────────────

struct Args {
    strategy: Option<StrategyKind>,
    log_path: String,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut parsed = Args {
        strategy: None,
        log_path: "weft.log".to_owned(),
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--strategy" => {
                let raw = args.next().context("--strategy needs a value")?;
                let kind = StrategyKind::parse(&raw)
                    .with_context(|| format!("unknown strategy {raw:?} (full, diff, smart)"))?;
                parsed.strategy = Some(kind);
            }
            "--log" => parsed.log_path = args.next().context("--log needs a path")?,
            other => bail!("unexpected argument {other:?}"),
        }
    }
    Ok(parsed)
}

fn main() -> anyhow::Result<()> {
    let args = parse_args(env::args().skip(1))?;

    let log_file = File::create(&args.log_path)
        .with_context(|| format!("cannot open log file {}", args.log_path))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    let mut config = Config::from_env();
    if let Some(kind) = args.strategy {
        config.render.strategy = kind;
    }
    info!("starting weft demo, strategy {}", config.render.strategy);

    let mut event_loop =
        EventLoop::new(config, io::stdout(), terminal_size).context("failed to set up the screen")?;
    let mut dashboard = Dashboard::new(event_loop.size());
    event_loop.run(&mut dashboard).context("event loop failed")?;

    info!("weft demo exited after {} frames", dashboard.frames);
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
