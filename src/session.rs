//! Cycle driver.
//!
//! One `Session` owns the tracking loop. Each cycle:
//!
//! 1. apply queued operator input
//! 2. pull one frame
//! 3. detect and select a target
//! 4. draw every qualifying box and show the frame
//! 5. stop if the display asked to
//! 6. when armed with a target: calibrate if pending, then steer
//!
//! The session always lands on exit, whether it stopped cleanly or failed.

use anyhow::{Context, Result};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::FrameSettings;
use crate::detect::{Detection, DetectorBackend};
use crate::display::{Display, Presented};
use crate::drone::{CommandSink, LatestTelemetry, NUDGE_RATE};
use crate::frame::{Frame, BOX_COLOUR, BOX_THICKNESS};
use crate::ingest::FrameSource;
use crate::input::{InputEvent, Nudge};
use crate::tracking::{Controller, Phase, Steering, TargetSelector, TrackingState};

const HEALTH_INTERVAL: Duration = Duration::from_secs(5);

/// What one cycle did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The frame was shown; steering ran if eligible.
    Continue,
    /// Malformed frame or detector failure. No command was issued.
    Skipped,
    /// The display asked to end the session.
    Stop,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub cycles: u64,
    pub skipped: u64,
    pub detections: u64,
    pub targets: u64,
    pub commands: u64,
    pub command_failures: u64,
}

pub struct Session {
    source: Box<dyn FrameSource>,
    detector: Box<dyn DetectorBackend>,
    selector: TargetSelector,
    controller: Controller,
    state: TrackingState,
    sink: Arc<dyn CommandSink>,
    display: Box<dyn Display>,
    input: Receiver<InputEvent>,
    input_open: bool,
    telemetry: Option<LatestTelemetry>,
    stats: SessionStats,
    last_health_log: Instant,
}

impl Session {
    pub fn new(
        frame: FrameSettings,
        source: Box<dyn FrameSource>,
        detector: Box<dyn DetectorBackend>,
        sink: Arc<dyn CommandSink>,
        display: Box<dyn Display>,
        input: Receiver<InputEvent>,
    ) -> Self {
        Self {
            source,
            detector,
            selector: TargetSelector::default(),
            controller: Controller::new(frame.width, frame.height),
            state: TrackingState::new(),
            sink,
            display,
            input,
            input_open: true,
            telemetry: None,
            stats: SessionStats::default(),
            last_health_log: Instant::now(),
        }
    }

    pub fn with_selector(mut self, selector: TargetSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_telemetry(mut self, telemetry: LatestTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn state(&self) -> &TrackingState {
        &self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Run cycles until the display stops or the stream fails, then land.
    pub fn run(&mut self) -> Result<()> {
        log::info!(
            "session started: source={} detector={} sink={} display={} selection={:?}",
            self.source.name(),
            self.detector.name(),
            self.sink.name(),
            self.display.name(),
            self.selector.mode()
        );

        let result = loop {
            match self.step() {
                Ok(CycleOutcome::Stop) => {
                    log::info!("stop requested");
                    break Ok(());
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("tracking loop ended: {:#}", e);
                    break Err(e);
                }
            }
        };

        log::info!("landing");
        let landed = self.sink.land();
        self.record_delivery("land", landed);
        log::info!(
            "session finished: cycles={} frames={} skipped={} commands={} failures={}",
            self.stats.cycles,
            self.source.frames_read(),
            self.stats.skipped,
            self.stats.commands,
            self.stats.command_failures
        );
        result
    }

    /// One cycle. Errors are fatal to the session.
    pub fn step(&mut self) -> Result<CycleOutcome> {
        self.drain_input();
        self.stats.cycles += 1;

        let mut frame = match self.source.next_frame() {
            Ok(frame) => frame,
            Err(e) if !e.is_fatal() => {
                log::warn!("skipping cycle: {}", e);
                self.stats.skipped += 1;
                return Ok(CycleOutcome::Skipped);
            }
            Err(e) => return Err(e).context(format!("frame source {}", self.source.name())),
        };

        let raw = match self.detector.detect(&frame) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("skipping cycle: detector failed: {:#}", e);
                self.stats.skipped += 1;
                return Ok(CycleOutcome::Skipped);
            }
        };
        let (width, height) = (frame.width(), frame.height());
        let detections: Vec<Detection> = raw
            .iter()
            .map(|r| Detection::from_normalized(r, width, height))
            .collect();
        let selection = self.selector.select(&detections);
        self.stats.detections += selection.qualifying.len() as u64;

        annotate(&mut frame, &selection.qualifying);
        if self.display.show(&frame)? == Presented::Stop {
            return Ok(CycleOutcome::Stop);
        }

        if let Some(target) = selection.target {
            self.stats.targets += 1;
            if self.state.is_armed() {
                if let Some(reference) = self.state.calibrate(&target) {
                    log::info!("calibrated: reference distance {:.2}", reference);
                }
                let steering =
                    self.controller
                        .steer(&target, width, height, self.state.reference_distance());
                log::debug!(
                    "steer yaw={} vertical={} forward={}",
                    steering.yaw,
                    steering.vertical,
                    steering.forward
                );
                self.apply_steering(steering);
            }
        }

        self.maybe_log_health();
        Ok(CycleOutcome::Continue)
    }

    fn drain_input(&mut self) {
        while self.input_open {
            match self.input.try_recv() {
                Ok(event) => self.apply_input(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::debug!("input channel closed");
                    self.input_open = false;
                }
            }
        }
    }

    fn apply_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::ToggleTracking => {
                let phase = self.state.toggle();
                self.apply_steering(Steering::STOP);
                match phase {
                    Phase::Calibrating => {
                        log::info!("tracking armed; calibrating on next target")
                    }
                    _ => log::info!("tracking disarmed"),
                }
            }
            InputEvent::TakeOff => {
                log::info!("take off");
                let result = self.sink.take_off();
                self.record_delivery("take off", result);
            }
            InputEvent::Land => {
                log::info!("land");
                let result = self.sink.land();
                self.record_delivery("land", result);
            }
            InputEvent::Nudge(nudge) => {
                log::info!("nudge {:?}", nudge);
                let result = match nudge {
                    Nudge::Up => self.sink.set_vertical_rate(NUDGE_RATE),
                    Nudge::Down => self.sink.set_vertical_rate(-NUDGE_RATE),
                    Nudge::Left => self.sink.set_lateral_rate(-NUDGE_RATE),
                    Nudge::Right => self.sink.set_lateral_rate(NUDGE_RATE),
                    Nudge::Clockwise => self.sink.set_yaw_rate(NUDGE_RATE),
                    Nudge::CounterClockwise => self.sink.set_yaw_rate(-NUDGE_RATE),
                };
                self.record_delivery("nudge", result);
            }
        }
    }

    /// Issue all three axes. Zero is sent too, so a stopped axis is held.
    fn apply_steering(&mut self, steering: Steering) {
        let yaw = self.sink.set_yaw_rate(steering.yaw);
        self.record_delivery("yaw", yaw);
        let vertical = self.sink.set_vertical_rate(steering.vertical);
        self.record_delivery("vertical", vertical);
        let forward = self.sink.set_forward_rate(steering.forward);
        self.record_delivery("forward", forward);
    }

    fn record_delivery(&mut self, what: &str, result: Result<()>) {
        self.stats.commands += 1;
        if let Err(e) = result {
            self.stats.command_failures += 1;
            log::warn!("{} command not delivered: {:#}", what, e);
        }
    }

    fn maybe_log_health(&mut self) {
        if self.last_health_log.elapsed() < HEALTH_INTERVAL {
            return;
        }
        let battery = self
            .telemetry
            .as_ref()
            .and_then(LatestTelemetry::get)
            .map(|t| format!("{}%", t.battery_percent))
            .unwrap_or_else(|| "n/a".to_string());
        log::info!(
            "health phase={:?} frames={} detections={} commands={} failures={} battery={}",
            self.state.phase(),
            self.source.frames_read(),
            self.stats.detections,
            self.stats.commands,
            self.stats.command_failures,
            battery
        );
        self.last_health_log = Instant::now();
    }
}

fn annotate(frame: &mut Frame, boxes: &[Detection]) {
    for b in boxes {
        frame.draw_rectangle(
            b.left as i32,
            b.top as i32,
            b.right as i32,
            b.bottom as i32,
            BOX_COLOUR,
            BOX_THICKNESS,
        );
    }
}
