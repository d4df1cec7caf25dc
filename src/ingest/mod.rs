//! Frame ingestion sources.
//!
//! This module provides different sources for decoded frames:
//! - An ffmpeg subprocess fed compressed video chunks (drone or replay file)
//! - Any `Read` producing headerless BGR24 frames (`RawFrameReader`)
//! - Synthetic source (`stub://`, demo and tests)
//!
//! All sources produce `Frame` instances for the cycle driver. A source is
//! responsible for:
//! - Reading exactly one frame's worth of bytes per call
//! - Reporting a short read as stream exhaustion
//! - Reporting undecodable frames as malformed so the cycle can be skipped

pub mod ffmpeg;
pub mod reader;
pub mod synthetic;

pub use ffmpeg::{DecoderInput, DecoderStop, FfmpegDecoder};
pub use reader::RawFrameReader;
pub use synthetic::{SyntheticConfig, SyntheticSource};

use crate::frame::{Frame, FrameError};

/// A blocking producer of decoded frames.
pub trait FrameSource: Send {
    /// Source identifier for logs.
    fn name(&self) -> &str;

    /// Block until the next frame is available.
    fn next_frame(&mut self) -> Result<Frame, FrameError>;

    /// Number of frames produced so far.
    fn frames_read(&self) -> u64;
}
