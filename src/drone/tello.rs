//! Tello SDK text transport.
//!
//! Three UDP channels:
//! - commands to `drone_addr` (default 192.168.10.1:8889), replies on the same
//!   socket; the first `ok` to `command` means the link is up
//! - state broadcast on `state_port` (8890), parsed into `FlightData`
//! - H.264 video on `video_port` (11111), forwarded as raw chunks
//!
//! Movement goes out as `rc <lateral> <forward> <vertical> <yaw>`. The sink
//! remembers the last value of each stick so per-axis setters stay independent.

use anyhow::{anyhow, Context, Result};
use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::telemetry::FlightData;
use super::{clamp_rate, CommandSink, DroneEvent, VideoBitrate};
use crate::config::DroneSettings;

const RECV_TIMEOUT: Duration = Duration::from_millis(200);
const VIDEO_DATAGRAM_MAX: usize = 2048;

/// Last commanded stick positions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sticks {
    pub lateral: i8,
    pub forward: i8,
    pub vertical: i8,
    pub yaw: i8,
}

impl Sticks {
    pub fn rc_command(&self) -> String {
        format!(
            "rc {} {} {} {}",
            self.lateral, self.forward, self.vertical, self.yaw
        )
    }
}

pub struct TelloSdk {
    socket: UdpSocket,
    drone_addr: SocketAddr,
    sticks: Mutex<Sticks>,
    shutdown: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TelloSdk {
    /// Bind the three channels, start the receivers and enter SDK mode.
    ///
    /// `Connected` is raised on `events` once the vehicle acknowledges.
    pub fn connect(settings: &DroneSettings, events: Sender<DroneEvent>) -> Result<Self> {
        let drone_addr = settings
            .addr
            .to_socket_addrs()
            .with_context(|| format!("invalid drone address '{}'", settings.addr))?
            .next()
            .ok_or_else(|| anyhow!("drone address '{}' did not resolve", settings.addr))?;

        let socket = UdpSocket::bind(("0.0.0.0", 0)).context("bind command socket")?;
        socket
            .connect(drone_addr)
            .with_context(|| format!("connect command socket to {}", drone_addr))?;
        let state_socket = UdpSocket::bind(("0.0.0.0", settings.state_port))
            .with_context(|| format!("bind state port {}", settings.state_port))?;
        let video_socket = UdpSocket::bind(("0.0.0.0", settings.video_port))
            .with_context(|| format!("bind video port {}", settings.video_port))?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let mut workers = Vec::with_capacity(3);

        let reply_socket = socket.try_clone().context("clone command socket")?;
        let reply_events = events.clone();
        let mut acknowledged = false;
        workers.push(spawn_receiver(
            "tello-replies",
            reply_socket,
            256,
            shutdown.clone(),
            move |datagram| {
                let reply = String::from_utf8_lossy(datagram);
                let reply = reply.trim();
                if reply.eq_ignore_ascii_case("ok") {
                    if !acknowledged {
                        acknowledged = true;
                        log::info!("drone connected");
                        return reply_events.send(DroneEvent::Connected).is_ok();
                    }
                } else if reply.starts_with("error") {
                    log::warn!("drone rejected command: {}", reply);
                } else {
                    log::debug!("drone reply: {}", reply);
                }
                true
            },
        )?);

        let state_events = events.clone();
        workers.push(spawn_receiver(
            "tello-state",
            state_socket,
            512,
            shutdown.clone(),
            move |datagram| match FlightData::parse(&String::from_utf8_lossy(datagram)) {
                Ok(data) => state_events.send(DroneEvent::FlightData(data)).is_ok(),
                Err(e) => {
                    log::debug!("ignoring state datagram: {}", e);
                    true
                }
            },
        )?);

        workers.push(spawn_receiver(
            "tello-video",
            video_socket,
            VIDEO_DATAGRAM_MAX,
            shutdown.clone(),
            move |datagram| events.send(DroneEvent::VideoChunk(datagram.to_vec())).is_ok(),
        )?);

        let sdk = Self {
            socket,
            drone_addr,
            sticks: Mutex::new(Sticks::default()),
            shutdown,
            workers: Mutex::new(workers),
        };
        sdk.send("command")?;
        log::info!("TelloSdk: connecting to {}", sdk.drone_addr);
        Ok(sdk)
    }

    /// Stop the receivers and wait for them. Their event senders drop with
    /// them, which ends the dispatcher.
    pub fn shutdown(&self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        let workers = {
            let mut guard = self
                .workers
                .lock()
                .map_err(|_| anyhow!("tello worker lock poisoned"))?;
            std::mem::take(&mut *guard)
        };
        for worker in workers {
            worker
                .join()
                .map_err(|_| anyhow!("tello receiver thread panicked"))?;
        }
        Ok(())
    }

    fn send(&self, command: &str) -> Result<()> {
        self.socket
            .send(command.as_bytes())
            .with_context(|| format!("send '{}' to {}", command, self.drone_addr))?;
        log::trace!("-> {}", command);
        Ok(())
    }

    fn move_stick(&self, update: impl FnOnce(&mut Sticks)) -> Result<()> {
        let line = {
            let mut sticks = self
                .sticks
                .lock()
                .map_err(|_| anyhow!("stick state lock poisoned"))?;
            update(&mut sticks);
            sticks.rc_command()
        };
        self.send(&line)
    }
}

impl CommandSink for TelloSdk {
    fn name(&self) -> &'static str {
        "tello"
    }

    fn take_off(&self) -> Result<()> {
        self.send("takeoff")
    }

    fn land(&self) -> Result<()> {
        self.send("land")
    }

    fn set_yaw_rate(&self, rate: i8) -> Result<()> {
        self.move_stick(|s| s.yaw = clamp_rate(rate))
    }

    fn set_vertical_rate(&self, rate: i8) -> Result<()> {
        self.move_stick(|s| s.vertical = clamp_rate(rate))
    }

    fn set_forward_rate(&self, rate: i8) -> Result<()> {
        self.move_stick(|s| s.forward = clamp_rate(rate))
    }

    fn set_lateral_rate(&self, rate: i8) -> Result<()> {
        self.move_stick(|s| s.lateral = clamp_rate(rate))
    }

    fn start_video(&self) -> Result<()> {
        self.send("streamon")
    }

    fn set_video_bitrate(&self, bitrate: VideoBitrate) -> Result<()> {
        self.send(&format!("setbitrate {}", bitrate.code()))
    }

    fn set_exposure(&self, level: i8) -> Result<()> {
        // The SDK text protocol has no exposure command.
        log::debug!("exposure {} requested; not supported over SDK", level);
        Ok(())
    }
}

impl Drop for TelloSdk {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::warn!("tello shutdown failed: {}", e);
        }
    }
}

/// Run `on_datagram` for every datagram until shutdown or until it returns
/// `false`.
fn spawn_receiver<F>(
    name: &str,
    socket: UdpSocket,
    buf_len: usize,
    shutdown: Arc<AtomicBool>,
    mut on_datagram: F,
) -> Result<JoinHandle<()>>
where
    F: FnMut(&[u8]) -> bool + Send + 'static,
{
    socket
        .set_read_timeout(Some(RECV_TIMEOUT))
        .context("set receiver timeout")?;
    let thread_name = name.to_string();
    thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            let mut buf = vec![0u8; buf_len];
            while !shutdown.load(Ordering::SeqCst) {
                match socket.recv(&mut buf) {
                    Ok(n) => {
                        if !on_datagram(&buf[..n]) {
                            break;
                        }
                    }
                    Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                    Err(e) => {
                        log::warn!("{}: receive failed: {}", thread_name, e);
                        thread::sleep(RECV_TIMEOUT);
                    }
                }
            }
            log::debug!("{} stopped", thread_name);
        })
        .with_context(|| format!("spawn {} thread", name))
}
