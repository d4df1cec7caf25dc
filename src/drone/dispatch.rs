//! Drone event dispatcher.
//!
//! Runs on its own thread and drains `DroneEvent`s:
//! - `Connected`: start video, auto bitrate, neutral exposure, keep-alive
//! - `FlightData`: published to `LatestTelemetry`
//! - `VideoChunk`: written to the decoder input
//!
//! The loop ends when every event sender has dropped.

use anyhow::{Context, Result};
use std::io::Write;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::keepalive::KeepAlive;
use super::telemetry::FlightData;
use super::{CommandSink, DroneEvent, VideoBitrate};

/// Most recent telemetry, shared with the tracking loop for health logs.
#[derive(Clone, Default)]
pub struct LatestTelemetry(Arc<Mutex<Option<FlightData>>>);

impl LatestTelemetry {
    pub fn get(&self) -> Option<FlightData> {
        match self.0.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set(&self, data: FlightData) {
        match self.0.lock() {
            Ok(mut guard) => *guard = Some(data),
            Err(poisoned) => *poisoned.into_inner() = Some(data),
        }
    }
}

pub struct Dispatcher {
    sink: Arc<dyn CommandSink>,
    video: Option<Box<dyn Write + Send>>,
    keepalive_interval: Duration,
    bitrate: VideoBitrate,
    telemetry: LatestTelemetry,
    keepalive: Option<KeepAlive>,
    video_bytes: u64,
}

impl Dispatcher {
    pub fn new(
        sink: Arc<dyn CommandSink>,
        video: Option<Box<dyn Write + Send>>,
        keepalive_interval: Duration,
        telemetry: LatestTelemetry,
    ) -> Self {
        Self {
            sink,
            video,
            keepalive_interval,
            bitrate: VideoBitrate::Auto,
            telemetry,
            keepalive: None,
            video_bytes: 0,
        }
    }

    /// Bitrate requested once the link is up.
    pub fn with_bitrate(mut self, bitrate: VideoBitrate) -> Self {
        self.bitrate = bitrate;
        self
    }

    pub fn video_bytes(&self) -> u64 {
        self.video_bytes
    }

    pub fn keepalive_running(&self) -> bool {
        self.keepalive
            .as_ref()
            .map(KeepAlive::is_running)
            .unwrap_or(false)
    }

    pub fn handle(&mut self, event: DroneEvent) {
        match event {
            DroneEvent::Connected => self.on_connected(),
            DroneEvent::FlightData(data) => {
                log::trace!("telemetry: battery {}%", data.battery_percent);
                self.telemetry.set(data);
            }
            DroneEvent::VideoChunk(chunk) => self.on_video(&chunk),
        }
    }

    /// Drain events until every sender is gone, then stop the keep-alive.
    pub fn run(&mut self, events: Receiver<DroneEvent>) -> Result<()> {
        for event in events {
            self.handle(event);
        }
        if let Some(mut keepalive) = self.keepalive.take() {
            keepalive.stop()?;
        }
        log::info!(
            "dispatcher stopped after forwarding {} video bytes",
            self.video_bytes
        );
        Ok(())
    }

    pub fn spawn(mut self, events: Receiver<DroneEvent>) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("drone-dispatch".to_string())
            .spawn(move || {
                if let Err(e) = self.run(events) {
                    log::warn!("dispatcher: {:#}", e);
                }
            })
            .context("spawn dispatcher thread")
    }

    fn on_connected(&mut self) {
        log::info!("drone link up; starting video");
        if let Err(e) = self.sink.start_video() {
            log::warn!("start video failed: {:#}", e);
        }
        if let Err(e) = self.sink.set_video_bitrate(self.bitrate) {
            log::warn!("set bitrate failed: {:#}", e);
        }
        if let Err(e) = self.sink.set_exposure(0) {
            log::warn!("set exposure failed: {:#}", e);
        }
        if self.keepalive.is_some() {
            return;
        }
        let sink = self.sink.clone();
        match KeepAlive::start(self.keepalive_interval, move || {
            if let Err(e) = sink.start_video() {
                log::debug!("keep-alive start video failed: {:#}", e);
            }
        }) {
            Ok(keepalive) => self.keepalive = Some(keepalive),
            Err(e) => log::warn!("keep-alive not started: {:#}", e),
        }
    }

    fn on_video(&mut self, chunk: &[u8]) {
        let Some(video) = self.video.as_mut() else {
            return;
        };
        match video.write_all(chunk) {
            Ok(()) => self.video_bytes += chunk.len() as u64,
            Err(e) => log::warn!("video write failed: {}", e),
        }
    }
}
