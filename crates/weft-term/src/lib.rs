// SPDX-License-Identifier: MIT
//
// weft-term: rendering and terminal I/O core for weft.
//
// Two jobs. Drawing calls land in a back buffer of styled cells; each frame
// the renderer diffs it against the front buffer (what the terminal shows)
// and emits the fewest escape sequences that make the screen match, then the
// pair swaps. In the other direction, raw input bytes become key, mouse,
// focus and paste events, with a short deadline deciding whether a lone ESC
// is the Escape key or the start of a longer sequence.
//
// No terminfo, no external TUI framework. Everything goes out as plain
// ANSI/VT100 sequences over one byte stream.

pub mod ansi;
pub mod buffer;
pub mod cell;
pub mod color;
pub mod config;
pub mod context;
pub mod diff;
pub mod double_buffer;
pub mod error;
pub mod event_loop;
pub mod input;
pub mod instruction;
pub mod output;
pub mod primitives;
pub mod reader;
pub mod renderer;
pub mod strategy;
pub mod terminal;

pub use error::{Error, Result};
