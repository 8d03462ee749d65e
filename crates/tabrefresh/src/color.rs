//! CLI color helpers.
//!
//! Every helper respects `NO_COLOR`, `FORCE_COLOR` and TTY detection through
//! owo-colors' `if_supports_color()`. `--no-color` flips an in-process flag
//! that skips styling entirely.

use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::OwoColorize;
use owo_colors::Stream::{self, Stderr, Stdout};

static NO_COLOR_FLAG: AtomicBool = AtomicBool::new(false);

/// Called once from main.rs when `--no-color` is passed.
pub fn set_no_color() {
    NO_COLOR_FLAG.store(true, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rgb {
    r: u8,
    g: u8,
    b: u8,
}

impl Rgb {
    const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
        }
    }
}

const TAB: Rgb = Rgb::from_hex(0x6FA8DC); // tab ids, accents
const RUNNING: Rgb = Rgb::from_hex(0x7BAE6A); // active sessions, success
const PAUSED: Rgb = Rgb::from_hex(0xD9A54A); // skipped ticks, warnings
const FAILED: Rgb = Rgb::from_hex(0xC8675A); // errors
const DIM: Rgb = Rgb::from_hex(0x6B7280); // secondary info

fn paint(text: &str, stream: Stream, rgb: Rgb) -> String {
    if NO_COLOR_FLAG.load(Ordering::Relaxed) {
        return text.to_string();
    }
    text.if_supports_color(stream, |t| t.truecolor(rgb.r, rgb.g, rgb.b))
        .to_string()
}

pub fn tab(text: &str) -> String {
    paint(text, Stdout, TAB)
}

pub fn running(text: &str) -> String {
    paint(text, Stdout, RUNNING)
}

pub fn paused(text: &str) -> String {
    paint(text, Stdout, PAUSED)
}

pub fn failed(text: &str) -> String {
    paint(text, Stdout, FAILED)
}

pub fn muted(text: &str) -> String {
    paint(text, Stdout, DIM)
}

pub fn bold(text: &str) -> String {
    if NO_COLOR_FLAG.load(Ordering::Relaxed) {
        return text.to_string();
    }
    text.if_supports_color(Stdout, |t| t.bold()).to_string()
}

/// Color a session state label (`active`/`inactive`).
pub fn state(active: bool) -> String {
    if active {
        running("active")
    } else {
        muted("inactive")
    }
}

/// Color a check verdict: refresh, or skip.
pub fn verdict(should_refresh: bool) -> String {
    if should_refresh {
        running("refresh")
    } else {
        paused("skip")
    }
}

// stderr variants

pub fn error(text: &str) -> String {
    paint(text, Stderr, FAILED)
}

pub fn warning(text: &str) -> String {
    paint(text, Stderr, PAUSED)
}

pub fn hint(text: &str) -> String {
    paint(text, Stderr, DIM)
}
