//! Fixed-layout command packet framing.
//!
//! Every command travels in a 0x38-byte header followed by the encrypted,
//! zero-padded payload. Two checksums protect it: one over the padded
//! cleartext payload, one over the finished packet.

use std::net::Ipv4Addr;

use bytes::Bytes;
use num_enum::{FromPrimitive, IntoPrimitive};

use crate::constants::*;
use crate::crypto;
use crate::error::BroadlinkError;

/// Command codes carried at header offset 0x26.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum CommandCode {
    Discover = 0x06,
    Auth = 0x65,
    Sp1Power = 0x66,
    Command = 0x6a,

    #[num_enum(catch_all)]
    Unknown(u8),
}

/// Everything the header needs besides the payload itself.
#[derive(Debug, Clone, Copy)]
pub struct PacketMeta {
    pub command: CommandCode,
    pub device_type: u16,
    pub counter: u16,
    pub mac: [u8; 6],
    pub device_id: [u8; 4],
}

/// 16-bit running sum seeded at 0xbeaf, masked after each addition.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(CHECKSUM_SEED, |sum, &b| sum.wrapping_add(u16::from(b)))
}

/// Zero-pad to the next multiple of 16. An already aligned payload still
/// gains a full block; an empty payload stays empty.
pub fn pad_payload(payload: &[u8]) -> Vec<u8> {
    if payload.is_empty() {
        return Vec::new();
    }
    let mut padded = vec![0u8; (payload.len() / 16 + 1) * 16];
    padded[..payload.len()].copy_from_slice(payload);
    padded
}

/// Frame and encrypt one command packet.
pub fn build_packet(meta: &PacketMeta, key: &[u8; 16], iv: &[u8; 16], payload: &[u8]) -> Vec<u8> {
    let padded = pad_payload(payload);
    let payload_sum = checksum(&padded);
    let ciphertext = crypto::encrypt(key, iv, &padded);

    let mut packet = vec![0u8; HEADER_SIZE + ciphertext.len()];
    packet[..PACKET_MAGIC.len()].copy_from_slice(&PACKET_MAGIC);
    packet[OFF_DEVICE_TYPE..OFF_DEVICE_TYPE + 2].copy_from_slice(&meta.device_type.to_le_bytes());
    packet[OFF_COMMAND] = meta.command.into();
    packet[OFF_COUNTER..OFF_COUNTER + 2].copy_from_slice(&meta.counter.to_le_bytes());
    // MAC goes out in reversed byte order, mac[5] first.
    for (i, &b) in meta.mac.iter().rev().enumerate() {
        packet[OFF_MAC + i] = b;
    }
    packet[OFF_DEVICE_ID..OFF_DEVICE_ID + 4].copy_from_slice(&meta.device_id);
    packet[OFF_PAYLOAD_CHECKSUM..OFF_PAYLOAD_CHECKSUM + 2]
        .copy_from_slice(&payload_sum.to_le_bytes());
    packet[HEADER_SIZE..].copy_from_slice(&ciphertext);

    let packet_sum = checksum(&packet);
    packet[OFF_PACKET_CHECKSUM..OFF_PACKET_CHECKSUM + 2].copy_from_slice(&packet_sum.to_le_bytes());
    packet
}

/// A parsed device reply.
///
/// When `error_code` is non-zero the body is not decrypted and both
/// `command_echo` and `payload` stay empty.
#[derive(Debug, Clone, Default)]
pub struct Reply {
    pub error_code: u16,
    pub command_echo: [u8; 4],
    /// Decrypted payload with trailing zero padding retained.
    pub payload: Bytes,
}

impl Reply {
    /// Payload of a zero-status reply, or the device status as an error.
    pub fn into_payload(self) -> Result<Bytes, BroadlinkError> {
        if self.error_code != 0 {
            return Err(BroadlinkError::ErrorCode {
                code: self.error_code,
            });
        }
        Ok(self.payload)
    }
}

/// Parse and decrypt one reply datagram.
pub fn parse_reply(datagram: &[u8], key: &[u8; 16], iv: &[u8; 16]) -> Result<Reply, BroadlinkError> {
    if datagram.len() < HEADER_SIZE {
        return Err(BroadlinkError::ShortPacket {
            expected: HEADER_SIZE,
            actual: datagram.len(),
        });
    }
    let error_code = u16::from_le_bytes([datagram[OFF_ERROR_CODE], datagram[OFF_ERROR_CODE + 1]]);
    if error_code != 0 {
        return Ok(Reply {
            error_code,
            ..Reply::default()
        });
    }

    let clear = crypto::decrypt(key, iv, &datagram[HEADER_SIZE..])?;
    if clear.len() < 4 {
        return Err(BroadlinkError::ShortPacket {
            expected: 4,
            actual: clear.len(),
        });
    }
    let mut command_echo = [0u8; 4];
    command_echo.copy_from_slice(&clear[..4]);
    let payload = Bytes::from(clear).slice(4..);
    Ok(Reply {
        error_code: 0,
        command_echo,
        payload,
    })
}

/// Date/time and addressing fields embedded in a discovery packet.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryFields {
    /// Hours east of UTC, without daylight saving.
    pub timezone_hours: i32,
    pub year: u16,
    pub minute: u8,
    pub hour: u8,
    /// ISO weekday, Monday = 1 .. Sunday = 7.
    pub weekday: u8,
    pub day: u8,
    pub month: u8,
    pub local_ip: Ipv4Addr,
    pub port: u16,
}

/// Build the header-only discovery probe.
pub fn build_discovery_packet(fields: &DiscoveryFields) -> [u8; DISCOVERY_PACKET_SIZE] {
    let mut packet = [0u8; DISCOVERY_PACKET_SIZE];
    if fields.timezone_hours < 0 {
        packet[0x08] = (0xff + fields.timezone_hours - 1) as u8;
        packet[0x09] = 0xff;
        packet[0x0a] = 0xff;
        packet[0x0b] = 0xff;
    } else {
        packet[0x08] = fields.timezone_hours as u8;
    }
    packet[0x0c..0x0e].copy_from_slice(&fields.year.to_le_bytes());
    packet[0x0e] = fields.minute;
    packet[0x0f] = fields.hour;
    packet[0x10] = (fields.year % 100) as u8;
    packet[0x11] = fields.weekday;
    packet[0x12] = fields.day;
    packet[0x13] = fields.month;
    packet[0x18..0x1c].copy_from_slice(&fields.local_ip.octets());
    packet[0x1c..0x1e].copy_from_slice(&fields.port.to_le_bytes());
    packet[OFF_COMMAND] = CommandCode::Discover.into();

    let sum = checksum(&packet);
    packet[OFF_PACKET_CHECKSUM..OFF_PACKET_CHECKSUM + 2].copy_from_slice(&sum.to_le_bytes());
    packet
}
