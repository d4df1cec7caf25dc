use anyhow::{anyhow, Result};
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use super::{Display, Presented};
use crate::frame::Frame;
use crate::input::{InputEvent, Nudge};

/// On-screen display. Escape, closing the window or the optional stop flag
/// ends the session; other mapped keys are forwarded as input events.
pub struct WindowDisplay {
    window: Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
    keys: Sender<InputEvent>,
    stop: Option<Arc<AtomicBool>>,
}

impl WindowDisplay {
    pub fn new(title: &str, width: u32, height: u32, keys: Sender<InputEvent>) -> Result<Self> {
        let (width, height) = (width as usize, height as usize);
        let window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| anyhow!("failed to open window: {}", e))?;
        Ok(Self {
            window,
            buffer: vec![0; width * height],
            width,
            height,
            keys,
            stop: None,
        })
    }

    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    fn forward_keys(&self) {
        for key in self.window.get_keys_pressed(KeyRepeat::No) {
            if let Some(event) = key_event(key) {
                log::debug!("window key {:?} -> {:?}", key, event);
                let _ = self.keys.send(event);
            }
        }
    }
}

fn key_event(key: Key) -> Option<InputEvent> {
    let event = match key {
        Key::T => InputEvent::ToggleTracking,
        Key::U => InputEvent::TakeOff,
        Key::D => InputEvent::Land,
        Key::Up => InputEvent::Nudge(Nudge::Up),
        Key::Down => InputEvent::Nudge(Nudge::Down),
        Key::Left => InputEvent::Nudge(Nudge::Left),
        Key::Right => InputEvent::Nudge(Nudge::Right),
        Key::Q => InputEvent::Nudge(Nudge::Clockwise),
        Key::E => InputEvent::Nudge(Nudge::CounterClockwise),
        _ => return None,
    };
    Some(event)
}

impl Display for WindowDisplay {
    fn name(&self) -> &str {
        "window"
    }

    fn show(&mut self, frame: &Frame) -> Result<Presented> {
        if frame.width() as usize != self.width || frame.height() as usize != self.height {
            self.width = frame.width() as usize;
            self.height = frame.height() as usize;
            self.buffer = vec![0; self.width * self.height];
        }
        for (dst, px) in self.buffer.iter_mut().zip(frame.as_bgr().chunks_exact(3)) {
            let (b, g, r) = (px[0] as u32, px[1] as u32, px[2] as u32);
            *dst = (r << 16) | (g << 8) | b;
        }
        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .map_err(|e| anyhow!("window update failed: {}", e))?;

        let flagged = self
            .stop
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false);
        if flagged || !self.window.is_open() || self.window.is_key_down(Key::Escape) {
            return Ok(Presented::Stop);
        }
        self.forward_keys();
        Ok(Presented::Continue)
    }
}
