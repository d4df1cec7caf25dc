//! Operator input.
//!
//! Keys map to `InputEvent`s that travel over a channel to the cycle driver.
//! The stdin reader accepts one token per line; the window display forwards
//! its own key presses through the same channel.

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Nudge {
    Up,
    Down,
    Left,
    Right,
    Clockwise,
    CounterClockwise,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    ToggleTracking,
    TakeOff,
    Land,
    Nudge(Nudge),
}

/// Map a key token to its event. Case-insensitive; unknown tokens map to
/// `None`.
pub fn parse_key(token: &str) -> Option<InputEvent> {
    let event = match token.trim().to_ascii_lowercase().as_str() {
        "t" => InputEvent::ToggleTracking,
        "u" => InputEvent::TakeOff,
        "d" => InputEvent::Land,
        "up" => InputEvent::Nudge(Nudge::Up),
        "down" => InputEvent::Nudge(Nudge::Down),
        "left" => InputEvent::Nudge(Nudge::Left),
        "right" => InputEvent::Nudge(Nudge::Right),
        "q" => InputEvent::Nudge(Nudge::Clockwise),
        "e" => InputEvent::Nudge(Nudge::CounterClockwise),
        _ => return None,
    };
    Some(event)
}

/// Forward every recognised line of `reader` until EOF or until the receiver
/// goes away.
pub fn forward_keys<R: Read>(reader: R, events: &Sender<InputEvent>) -> Result<u64> {
    let mut forwarded = 0u64;
    for line in BufReader::new(reader).lines() {
        let line = line.context("failed to read key input")?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_key(&line) {
            Some(event) => {
                if events.send(event).is_err() {
                    break;
                }
                forwarded += 1;
            }
            None => log::warn!("unknown key '{}'", line.trim()),
        }
    }
    Ok(forwarded)
}

/// Read keys from stdin on a background thread.
pub fn spawn_stdin_reader(events: Sender<InputEvent>) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin-keys".to_string())
        .spawn(move || {
            log::info!("keys: t toggle, u take off, d land, up/down/left/right/q/e nudge");
            match forward_keys(std::io::stdin(), &events) {
                Ok(n) => log::debug!("stdin closed after {} key events", n),
                Err(e) => log::warn!("stdin reader: {:#}", e),
            }
        })
        .context("spawn stdin reader")
}

/// Raise the shared stop flag. Returns true when a stop was already pending,
/// i.e. the operator asked twice.
pub fn request_stop(flag: &AtomicBool) -> bool {
    flag.swap(true, Ordering::SeqCst)
}
