// Protocol constants for Broadlink LAN devices

use std::time::Duration;

/// Fixed preamble at the start of every command packet.
pub const PACKET_MAGIC: [u8; 8] = [0x5a, 0xa5, 0xaa, 0x55, 0x5a, 0xa5, 0xaa, 0x55];

/// Size of the command packet header; ciphertext starts right after.
pub const HEADER_SIZE: usize = 0x38;

/// Discovery packets are header-only, no encrypted body.
pub const DISCOVERY_PACKET_SIZE: usize = 0x30;

/// Whole-packet checksum (little-endian u16).
pub const OFF_PACKET_CHECKSUM: usize = 0x20;

/// Device status code in replies (little-endian u16).
pub const OFF_ERROR_CODE: usize = 0x22;

/// Device type code (little-endian u16).
pub const OFF_DEVICE_TYPE: usize = 0x24;

/// Command code (single byte).
pub const OFF_COMMAND: usize = 0x26;

/// Rolling packet counter (little-endian u16).
pub const OFF_COUNTER: usize = 0x28;

/// Device MAC, stored in reversed byte order (mac[5] first).
pub const OFF_MAC: usize = 0x2a;

/// Device id assigned during authentication.
pub const OFF_DEVICE_ID: usize = 0x30;

/// Checksum of the padded, unencrypted payload (little-endian u16).
pub const OFF_PAYLOAD_CHECKSUM: usize = 0x34;

/// Device type code in discovery replies (little-endian u16).
pub const OFF_DISCOVERY_DEVICE_TYPE: usize = 0x34;

/// MAC in discovery replies, as transmitted by the device.
pub const OFF_DISCOVERY_MAC: usize = 0x3a;

/// Seed for both the payload and the whole-packet checksum.
pub const CHECKSUM_SEED: u16 = 0xbeaf;

/// Well-known key in effect until `authenticate` derives the real one.
pub const DEFAULT_KEY: [u8; 16] = [
    0x09, 0x76, 0x28, 0x34, 0x3f, 0xe9, 0x9e, 0x23, 0x76, 0x5c, 0x15, 0x13, 0xac, 0xcf, 0x8b, 0x02,
];

/// Initialization vector, fixed for the lifetime of the engine.
pub const DEFAULT_IV: [u8; 16] = [
    0x56, 0x2e, 0x17, 0x99, 0x6d, 0x09, 0x3d, 0x28, 0xdd, 0xb3, 0xba, 0x69, 0x5a, 0x2e, 0x6f, 0x58,
];

/// UDP port the devices listen on.
pub const DEVICE_PORT: u16 = 80;

/// Source port advertised in the discovery payload.
pub const DISCOVERY_SOURCE_PORT: u16 = 44488;

/// Per-attempt receive timeout for command packets.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(20);

/// Number of send attempts before a command is reported failed.
pub const SEND_ATTEMPTS: u32 = 2;

/// Delay before the single send retry.
pub const SEND_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Cadence of "is the device done yet" polling.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Poll attempts before a capture is given up.
pub const POLL_ATTEMPTS: u32 = 8;

/// Frequency-check rounds for the RM-plus RF dialect.
pub const RF_FREQUENCY_ROUNDS_RM_PLUS: u32 = 3;

/// Frequency-check rounds for the RM4-pro RF dialect.
pub const RF_FREQUENCY_ROUNDS_RM4_PRO: u32 = 10;

/// Capture-check rounds for the RM4-pro RF dialect.
pub const RF_CAPTURE_ROUNDS: u32 = 10;
