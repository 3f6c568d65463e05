//! Per-family decoders for the generic status and energy payloads.
//!
//! Every family answers the same status query; only the byte layout of
//! the reply differs.

use strum_macros::Display;

use crate::error::BroadlinkError;

fn require(payload: &[u8], len: usize) -> Result<(), BroadlinkError> {
    if payload.len() < len {
        return Err(BroadlinkError::ShortPacket {
            expected: len,
            actual: payload.len(),
        });
    }
    Ok(())
}

/// SP2/SP3 smart plug state, packed into status byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlugState {
    pub power: bool,
    pub nightlight: bool,
}

impl PlugState {
    /// Level byte for the power-state command: 0..=3.
    pub fn level(self) -> u8 {
        match (self.power, self.nightlight) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        }
    }
}

/// Decode the SP2/SP3 status reply.
pub fn plug_state(payload: &[u8]) -> Result<PlugState, BroadlinkError> {
    require(payload, 1)?;
    let level = payload[0];
    Ok(PlugState {
        power: level == 1 || level == 3,
        nightlight: level == 2 || level == 3,
    })
}

/// Decode the SP2/SP3S energy reply into watts.
pub fn sp2_energy(payload: &[u8]) -> Result<f64, BroadlinkError> {
    require(payload, 4)?;
    let whole = u16::from_le_bytes([payload[2], payload[3]]);
    Ok(f64::from(whole) + f64::from(payload[1]) / 100.0)
}

/// Per-socket power mask of the MP1 strip; bit n-1 is socket n.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mp1State(pub u8);

impl Mp1State {
    pub fn socket(self, socket: u8) -> Result<bool, BroadlinkError> {
        if !(1..=4).contains(&socket) {
            return Err(BroadlinkError::InvalidSocket(socket));
        }
        Ok(self.0 & (1 << (socket - 1)) != 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AirQuality {
    Excellent,
    Good,
    Normal,
    Bad,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LightLevel {
    Dark,
    Dim,
    Normal,
    Bright,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum NoiseLevel {
    Quiet,
    Normal,
    Noisy,
    Unknown,
}

/// One sensor sweep of the A1 environment monitor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct A1Reading {
    pub temperature: f64,
    pub humidity: f64,
    pub light: LightLevel,
    pub air_quality: AirQuality,
    pub noise: NoiseLevel,
}

/// Decode the A1 status reply.
pub fn a1_reading(payload: &[u8]) -> Result<A1Reading, BroadlinkError> {
    require(payload, 9)?;
    Ok(A1Reading {
        temperature: f64::from(payload[0]) + f64::from(payload[1]) / 10.0,
        humidity: f64::from(payload[2]) + f64::from(payload[3]) / 10.0,
        light: match payload[4] {
            0 => LightLevel::Dark,
            1 => LightLevel::Dim,
            2 => LightLevel::Normal,
            3 => LightLevel::Bright,
            _ => LightLevel::Unknown,
        },
        air_quality: match payload[6] {
            0 => AirQuality::Excellent,
            1 => AirQuality::Good,
            2 => AirQuality::Normal,
            3 => AirQuality::Bad,
            _ => AirQuality::Unknown,
        },
        noise: match payload[8] {
            0 => NoiseLevel::Quiet,
            1 => NoiseLevel::Normal,
            2 => NoiseLevel::Noisy,
            _ => NoiseLevel::Unknown,
        },
    })
}

/// RM4 pro onboard temperature and humidity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempHumidity {
    pub temperature: f64,
    pub humidity: f64,
}

/// Decode the RM4 pro temperature/humidity probe reply.
pub fn rm4_temp_humidity(payload: &[u8]) -> Result<TempHumidity, BroadlinkError> {
    require(payload, 6)?;
    Ok(TempHumidity {
        temperature: f64::from(payload[2]) + f64::from(payload[3]) / 10.0,
        humidity: f64::from(payload[4]) + f64::from(payload[5]) / 10.0,
    })
}
