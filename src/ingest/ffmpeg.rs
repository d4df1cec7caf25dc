//! ffmpeg decoder subprocess.
//!
//! Compressed H.264 chunks are written to the child's stdin; the child writes
//! BGR24 frames scaled to the nominal frame size on stdout. The decoder never
//! touches disk and is killed when dropped, or earlier through a
//! `DecoderStop` handle.

use anyhow::{anyhow, Context, Result};
use std::io::{self, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};

use super::reader::RawFrameReader;
use crate::config::DecoderSettings;

/// Build the ffmpeg argument list for a `width`x`height` BGR24 pipe.
pub fn decoder_args(settings: &DecoderSettings, width: u32, height: u32) -> Vec<String> {
    let mut args = vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
    ];
    if let Some(hwaccel) = settings.hwaccel.as_deref() {
        args.push("-hwaccel".to_string());
        args.push(hwaccel.to_string());
    }
    for arg in ["-i", "pipe:0", "-pix_fmt", "bgr24", "-s"] {
        args.push(arg.to_string());
    }
    args.push(format!("{}x{}", width, height));
    for arg in ["-f", "rawvideo", "pipe:1"] {
        args.push(arg.to_string());
    }
    args
}

pub struct FfmpegDecoder {
    child: Arc<Mutex<Child>>,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    width: u32,
    height: u32,
}

impl FfmpegDecoder {
    /// Start the decoder process. Failure here is a setup error.
    pub fn spawn(settings: &DecoderSettings, width: u32, height: u32) -> Result<Self> {
        let args = decoder_args(settings, width, height);
        let mut child = Command::new(&settings.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to start decoder '{}'", settings.program))?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        if stdin.is_none() || stdout.is_none() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(anyhow!("failed to capture decoder stdio pipes"));
        }

        log::info!(
            "decoder started (pid: {}, program: {}, {}x{} bgr24)",
            child.id(),
            settings.program,
            width,
            height
        );

        Ok(Self {
            child: Arc::new(Mutex::new(child)),
            stdin,
            stdout,
            width,
            height,
        })
    }

    /// Writer half: compressed chunks go here. Can be taken once.
    pub fn take_input(&mut self) -> Result<DecoderInput> {
        let stdin = self
            .stdin
            .take()
            .ok_or_else(|| anyhow!("decoder input already taken"))?;
        Ok(DecoderInput {
            stdin,
            bytes_written: 0,
        })
    }

    /// Reader half: decoded frames come out here. Can be taken once.
    pub fn take_frames(&mut self) -> Result<RawFrameReader<ChildStdout>> {
        let stdout = self
            .stdout
            .take()
            .ok_or_else(|| anyhow!("decoder output already taken"))?;
        Ok(RawFrameReader::new(stdout, self.width, self.height).with_name("ffmpeg"))
    }

    /// Handle that kills the decoder from another thread.
    pub fn stop_handle(&self) -> DecoderStop {
        DecoderStop(self.child.clone())
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        // Closing stdin first lets ffmpeg flush; the kill covers a wedged child.
        self.stdin.take();
        let mut child = lock_child(&self.child);
        let _ = child.kill();
        let _ = child.wait();
    }
}

/// Kills a running decoder. A reader blocked on its output then sees end of
/// stream, so the tracking loop winds down through its normal exit.
#[derive(Clone)]
pub struct DecoderStop(Arc<Mutex<Child>>);

impl DecoderStop {
    pub fn stop(&self) {
        let mut child = lock_child(&self.0);
        match child.kill() {
            Ok(()) => log::info!("decoder (pid: {}) stopped", child.id()),
            Err(e) => log::debug!("decoder already gone: {}", e),
        }
    }
}

fn lock_child(child: &Mutex<Child>) -> MutexGuard<'_, Child> {
    child.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Write end of the decoder pipe.
pub struct DecoderInput {
    stdin: ChildStdin,
    bytes_written: u64,
}

impl DecoderInput {
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

impl Write for DecoderInput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.stdin.write(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdin.flush()
    }
}
