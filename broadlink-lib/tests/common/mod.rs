//! Shared fixtures for the integration suites.

// Shared across multiple test files; not every item is used in each one.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;

use broadlink_lib::constants::{DEFAULT_IV, DEFAULT_KEY, HEADER_SIZE};
use broadlink_lib::crypto;
use broadlink_lib::error::BroadlinkError;
use broadlink_lib::session::{Session, SessionOptions};
use broadlink_lib::transport::{Datagram, Wire};

pub const TEST_MAC: [u8; 6] = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff];

/// Decode hex string to bytes for testing
pub fn hex_to_bytes(hex_data: &str) -> Vec<u8> {
    hex::decode(hex_data).expect("Failed to decode hex")
}

/// Assemble a device reply datagram: header with the status code, and an
/// encrypted echo + payload body when the status is zero.
pub fn fake_reply(
    key: &[u8; 16],
    iv: &[u8; 16],
    error_code: u16,
    echo: [u8; 4],
    payload: &[u8],
) -> Vec<u8> {
    let mut datagram = vec![0u8; HEADER_SIZE];
    datagram[0x22..0x24].copy_from_slice(&error_code.to_le_bytes());
    if error_code == 0 {
        let mut clear = Vec::with_capacity(4 + payload.len());
        clear.extend_from_slice(&echo);
        clear.extend_from_slice(payload);
        clear.resize(clear.len().div_ceil(16) * 16, 0);
        datagram.extend_from_slice(&crypto::encrypt(key, iv, &clear));
    }
    datagram
}

/// Reply with the default key, zero status and a zeroed command echo.
pub fn ok_reply(payload: &[u8]) -> ScriptedEvent {
    ScriptedEvent::Reply(fake_reply(&DEFAULT_KEY, &DEFAULT_IV, 0, [0; 4], payload))
}

/// Header-only reply carrying a "not ready yet" status code.
pub fn busy_reply() -> ScriptedEvent {
    ScriptedEvent::Reply(fake_reply(&DEFAULT_KEY, &DEFAULT_IV, 0xfff9, [0; 4], &[]))
}

/// Decrypt the payload region of a packet the session sent.
pub fn sent_payload(packet: &[u8], key: &[u8; 16]) -> Vec<u8> {
    crypto::decrypt(key, &DEFAULT_IV, &packet[HEADER_SIZE..]).expect("sent payload decrypts")
}

#[derive(Debug)]
pub enum ScriptedEvent {
    Reply(Vec<u8>),
    /// Transport-level failure for this exchange.
    Fail,
}

/// Mock transport driven by a fixed script of events.
#[derive(Debug, Default)]
pub struct ScriptedWire {
    pub script: VecDeque<ScriptedEvent>,
    pub sent: Vec<Vec<u8>>,
    pub closed: bool,
}

impl ScriptedWire {
    pub fn new(script: impl IntoIterator<Item = ScriptedEvent>) -> Self {
        Self {
            script: script.into_iter().collect(),
            sent: Vec::new(),
            closed: false,
        }
    }
}

impl Wire for ScriptedWire {
    async fn exchange(
        &mut self,
        packet: &[u8],
        target: SocketAddr,
        _wait: Duration,
    ) -> Result<Datagram, BroadlinkError> {
        self.sent.push(packet.to_vec());
        match self.script.pop_front() {
            Some(ScriptedEvent::Reply(data)) => Ok(Datagram {
                data: Bytes::from(data),
                source: target,
            }),
            Some(ScriptedEvent::Fail) => Err(BroadlinkError::Io(io::Error::from(
                io::ErrorKind::TimedOut,
            ))),
            None => Err(BroadlinkError::Io(io::Error::from(
                io::ErrorKind::UnexpectedEof,
            ))),
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Session over a scripted wire with a fixed test identity.
pub fn scripted_session(script: impl IntoIterator<Item = ScriptedEvent>) -> Session<ScriptedWire> {
    Session::with_wire(
        ScriptedWire::new(script),
        SessionOptions {
            counter: 0x0033,
            device_type: 0x649b,
            mac: TEST_MAC,
            ip_address: Some("192.168.1.99".parse().expect("test address")),
            ..SessionOptions::default()
        },
    )
}
