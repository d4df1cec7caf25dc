//! Vehicle transport.
//!
//! `CommandSink` is the seam between the tracking loop and whatever flies:
//! the Tello SDK over UDP in the field, a `RecordingSink` in replays and
//! tests. Commands are fire-and-forget; a failed delivery is the caller's to
//! log, and the next cycle's command supersedes it.
//!
//! Out-of-band notifications (link up, telemetry, video) arrive as
//! `DroneEvent`s on one channel and are handled by the dispatcher thread.

pub mod dispatch;
pub mod keepalive;
pub mod recording;
pub mod telemetry;
pub mod tello;

use anyhow::Result;
use serde::Deserialize;

pub use dispatch::{Dispatcher, LatestTelemetry};
pub use keepalive::KeepAlive;
pub use recording::{RecordingSink, SinkCommand};
pub use telemetry::FlightData;
pub use tello::TelloSdk;

/// Rate used by manual nudges.
pub const NUDGE_RATE: i8 = 5;

/// Largest magnitude any axis accepts.
pub const MAX_RATE: i8 = 100;

/// Clamp a signed rate into `[-MAX_RATE, MAX_RATE]`.
pub fn clamp_rate(rate: i8) -> i8 {
    rate.clamp(-MAX_RATE, MAX_RATE)
}

/// Video encoder bitrate. Config files give it as the `setbitrate` code,
/// 0 for auto or 1-5 Mbps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum VideoBitrate {
    #[default]
    Auto,
    Mbps1,
    Mbps2,
    Mbps3,
    Mbps4,
    Mbps5,
}

impl VideoBitrate {
    /// Wire value used by `setbitrate`.
    pub fn code(self) -> u8 {
        match self {
            VideoBitrate::Auto => 0,
            VideoBitrate::Mbps1 => 1,
            VideoBitrate::Mbps2 => 2,
            VideoBitrate::Mbps3 => 3,
            VideoBitrate::Mbps4 => 4,
            VideoBitrate::Mbps5 => 5,
        }
    }
}

impl TryFrom<u8> for VideoBitrate {
    type Error = String;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        match code {
            0 => Ok(VideoBitrate::Auto),
            1 => Ok(VideoBitrate::Mbps1),
            2 => Ok(VideoBitrate::Mbps2),
            3 => Ok(VideoBitrate::Mbps3),
            4 => Ok(VideoBitrate::Mbps4),
            5 => Ok(VideoBitrate::Mbps5),
            other => Err(format!("video bitrate code must be 0-5, got {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_are_clamped_to_percent_range() {
        assert_eq!(clamp_rate(127), 100);
        assert_eq!(clamp_rate(-128), -100);
        assert_eq!(clamp_rate(-50), -50);
    }

    #[test]
    fn bitrate_codes_follow_setbitrate() {
        assert_eq!(VideoBitrate::Auto.code(), 0);
        for code in 0..=5u8 {
            assert_eq!(VideoBitrate::try_from(code).unwrap().code(), code);
        }
        assert!(VideoBitrate::try_from(6).is_err());
    }
}
