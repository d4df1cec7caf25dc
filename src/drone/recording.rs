//! In-memory command sink for replays and tests.

use anyhow::{bail, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{clamp_rate, CommandSink, VideoBitrate};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkCommand {
    TakeOff,
    Land,
    Yaw(i8),
    Vertical(i8),
    Forward(i8),
    Lateral(i8),
    StartVideo,
    VideoBitrate(VideoBitrate),
    Exposure(i8),
}

/// Records every command in order. Can be told to fail deliveries, in which
/// case the command is still recorded but the call returns an error.
#[derive(Default)]
pub struct RecordingSink {
    commands: Mutex<Vec<SinkCommand>>,
    fail: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<SinkCommand> {
        match self.commands.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.commands.lock() {
            guard.clear();
        }
    }

    pub fn fail_deliveries(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn record(&self, command: SinkCommand) -> Result<()> {
        match self.commands.lock() {
            Ok(mut guard) => guard.push(command),
            Err(_) => bail!("recording sink lock poisoned"),
        }
        if self.fail.load(Ordering::SeqCst) {
            bail!("delivery of {:?} failed", command);
        }
        Ok(())
    }
}

impl CommandSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn take_off(&self) -> Result<()> {
        self.record(SinkCommand::TakeOff)
    }

    fn land(&self) -> Result<()> {
        self.record(SinkCommand::Land)
    }

    fn set_yaw_rate(&self, rate: i8) -> Result<()> {
        self.record(SinkCommand::Yaw(clamp_rate(rate)))
    }

    fn set_vertical_rate(&self, rate: i8) -> Result<()> {
        self.record(SinkCommand::Vertical(clamp_rate(rate)))
    }

    fn set_forward_rate(&self, rate: i8) -> Result<()> {
        self.record(SinkCommand::Forward(clamp_rate(rate)))
    }

    fn set_lateral_rate(&self, rate: i8) -> Result<()> {
        self.record(SinkCommand::Lateral(clamp_rate(rate)))
    }

    fn start_video(&self) -> Result<()> {
        self.record(SinkCommand::StartVideo)
    }

    fn set_video_bitrate(&self, bitrate: VideoBitrate) -> Result<()> {
        self.record(SinkCommand::VideoBitrate(bitrate))
    }

    fn set_exposure(&self, level: i8) -> Result<()> {
        self.record(SinkCommand::Exposure(level))
    }
}
