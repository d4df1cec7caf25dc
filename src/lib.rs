//! Face Follower
//!
//! Keeps a small quadcopter pointed at, level with, and at a fixed distance
//! from the most recently detected face.
//!
//! # Architecture
//!
//! Per video frame the tracking loop runs:
//!
//! `FrameSource -> DetectorBackend -> TargetSelector -> TrackingState ->
//! Controller -> CommandSink`
//!
//! Operator input (toggle tracking, take off, land, nudges) arrives over a
//! channel and is applied between frames. The control law is a fixed-step
//! threshold controller: no PID, no smoothing, no prediction.
//!
//! # Module Structure
//!
//! - `frame`: BGR frame buffer and box drawing
//! - `ingest`: frame sources (ffmpeg decoder, raw readers, synthetic `stub://`)
//! - `detect`: face detector backends and SSD output parsing
//! - `tracking`: target selection, arming state machine, controller
//! - `drone`: command sink trait, Tello SDK transport, event dispatch
//! - `input`: operator key events
//! - `display`: frame presentation
//! - `session`: the cycle driver
//! - `config`: file and environment configuration

pub mod config;
pub mod detect;
pub mod display;
pub mod drone;
pub mod frame;
pub mod ingest;
pub mod input;
pub mod session;
pub mod tracking;

pub use config::{
    DecoderSettings, DetectorSettings, DroneSettings, FollowerConfig, FrameSettings,
    TrackingSettings,
};
pub use detect::{open_backend, Detection, DetectorBackend, RawDetection, StubBackend};
pub use display::{Display, HeadlessDisplay, Presented};
pub use drone::{CommandSink, DroneEvent, RecordingSink, SinkCommand, TelloSdk};
pub use frame::{Frame, FrameError};
pub use ingest::{FfmpegDecoder, FrameSource, RawFrameReader, SyntheticConfig, SyntheticSource};
pub use input::{InputEvent, Nudge};
pub use session::{CycleOutcome, Session, SessionStats};
pub use tracking::{Controller, Phase, SelectionMode, Steering, TargetSelector, TrackingState};
