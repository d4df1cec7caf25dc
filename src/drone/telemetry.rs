//! Flight telemetry.
//!
//! The vehicle broadcasts one state datagram per tick as `key:value;` pairs,
//! e.g. `pitch:0;roll:0;yaw:-12;...;bat:87;baro:13.42;time:0;\r\n`.

use anyhow::{anyhow, Result};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlightData {
    pub pitch: i32,
    pub roll: i32,
    pub yaw: i32,
    /// Speeds in dm/s.
    pub speed_x: i32,
    pub speed_y: i32,
    pub speed_z: i32,
    /// Temperatures in degrees C.
    pub temp_low: i32,
    pub temp_high: i32,
    /// Time-of-flight distance in cm.
    pub tof_cm: i32,
    /// Height in cm.
    pub height_cm: i32,
    pub battery_percent: u8,
    /// Barometer altitude in metres.
    pub baro_m: f32,
    /// Motor-on time in seconds.
    pub flight_time_s: u32,
    pub accel_x: f32,
    pub accel_y: f32,
    pub accel_z: f32,
}

impl FlightData {
    /// Parse one state datagram. Unknown keys are ignored; a datagram with no
    /// recognised keys is an error.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut data = FlightData::default();
        let mut recognised = 0usize;

        for field in raw.trim().split(';') {
            let Some((key, value)) = field.split_once(':') else {
                continue;
            };
            let value = value.trim();
            let matched = match key.trim() {
                "pitch" => parse_into(value, &mut data.pitch)?,
                "roll" => parse_into(value, &mut data.roll)?,
                "yaw" => parse_into(value, &mut data.yaw)?,
                "vgx" => parse_into(value, &mut data.speed_x)?,
                "vgy" => parse_into(value, &mut data.speed_y)?,
                "vgz" => parse_into(value, &mut data.speed_z)?,
                "templ" => parse_into(value, &mut data.temp_low)?,
                "temph" => parse_into(value, &mut data.temp_high)?,
                "tof" => parse_into(value, &mut data.tof_cm)?,
                "h" => parse_into(value, &mut data.height_cm)?,
                "bat" => parse_into(value, &mut data.battery_percent)?,
                "baro" => parse_into(value, &mut data.baro_m)?,
                "time" => parse_into(value, &mut data.flight_time_s)?,
                "agx" => parse_into(value, &mut data.accel_x)?,
                "agy" => parse_into(value, &mut data.accel_y)?,
                "agz" => parse_into(value, &mut data.accel_z)?,
                _ => false,
            };
            if matched {
                recognised += 1;
            }
        }

        if recognised == 0 {
            return Err(anyhow!("state datagram carried no telemetry fields"));
        }
        Ok(data)
    }
}

fn parse_into<T: std::str::FromStr>(value: &str, slot: &mut T) -> Result<bool> {
    *slot = value
        .parse()
        .map_err(|_| anyhow!("invalid telemetry value '{}'", value))?;
    Ok(true)
}
