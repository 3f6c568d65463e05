//! One logical, stateful connection to one physical device.
//!
//! The session owns the rolling counter, the negotiated key/id and the
//! transport handle. All verbs take `&mut self`: one request in flight
//! per session, by construction.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use tracing::{debug, warn};

use crate::constants::*;
use crate::error::BroadlinkError;
use crate::family::{LearnDialect, RfDialect, SendDialect};
use crate::packet::{self, CommandCode, DiscoveryFields, PacketMeta, Reply};
use crate::poller;
use crate::status::{self, TempHumidity};
use crate::transport::{Datagram, UdpWire, Wire};

/// Options for (re)configuring a session.
///
/// Missing id/key fall back to the well-known defaults until
/// `authenticate` derives the real ones.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Seed for the rolling packet counter, e.g. a random 16-bit value.
    pub counter: u16,
    pub device_type: u16,
    pub mac: [u8; 6],
    pub ip_address: Option<IpAddr>,
    pub id: Option<[u8; 4]>,
    pub key: Option<[u8; 16]>,
}

/// Key and id handed out by the device during authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthResult {
    pub id: [u8; 4],
    pub key: [u8; 16],
}

/// A device that answered the discovery probe.
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    pub device_type: u16,
    /// MAC exactly as it appears on the wire; reverse for display.
    pub mac: [u8; 6],
    pub address: IpAddr,
}

pub struct Session<W: Wire = UdpWire> {
    wire: W,
    counter: u16,
    device_type: u16,
    mac: [u8; 6],
    device_id: [u8; 4],
    key: [u8; 16],
    iv: [u8; 16],
    ip_address: IpAddr,
}

impl Session<UdpWire> {
    /// Create a session backed by a real UDP socket.
    pub fn new(options: SessionOptions) -> Self {
        Self::with_wire(UdpWire::new(), options)
    }
}

impl<W: Wire> Session<W> {
    /// Create a session over an arbitrary transport.
    pub fn with_wire(wire: W, options: SessionOptions) -> Self {
        let mut session = Self {
            wire,
            counter: 0,
            device_type: 0,
            mac: [0; 6],
            device_id: [0; 4],
            key: DEFAULT_KEY,
            iv: DEFAULT_IV,
            ip_address: IpAddr::V4(Ipv4Addr::BROADCAST),
        };
        session.configure(options);
        session
    }

    /// Reset the session identity from `options`.
    pub fn configure(&mut self, options: SessionOptions) {
        self.counter = options.counter;
        self.device_type = options.device_type;
        self.mac = options.mac;
        self.ip_address = options
            .ip_address
            .unwrap_or(IpAddr::V4(Ipv4Addr::BROADCAST));
        self.device_id = options.id.unwrap_or([0; 4]);
        self.key = options.key.unwrap_or(DEFAULT_KEY);
        self.iv = DEFAULT_IV;
    }

    pub fn set_ip_address(&mut self, address: IpAddr) {
        self.ip_address = address;
        debug!(%address, "ip address updated");
    }

    pub fn counter(&self) -> u16 {
        self.counter
    }

    pub fn device_id(&self) -> [u8; 4] {
        self.device_id
    }

    pub fn key(&self) -> [u8; 16] {
        self.key
    }

    pub fn iv(&self) -> [u8; 16] {
        self.iv
    }

    /// Access the underlying transport.
    pub fn wire(&self) -> &W {
        &self.wire
    }

    /// Release the transport. Safe to call on every teardown path.
    pub fn destroy(&mut self) {
        self.wire.close();
    }

    /// Frame, encrypt and send one command; a silent device gets a
    /// single retry after a fixed delay.
    pub async fn send_packet(
        &mut self,
        command: CommandCode,
        payload: &[u8],
    ) -> Result<Reply, BroadlinkError> {
        self.counter = self.counter.wrapping_add(1);
        let meta = PacketMeta {
            command,
            device_type: self.device_type,
            counter: self.counter,
            mac: self.mac,
            device_id: self.device_id,
        };
        let packet = packet::build_packet(&meta, &self.key, &self.iv, payload);
        debug!(?command, payload = %hex::encode(payload), "send packet");

        let target = SocketAddr::new(self.ip_address, DEVICE_PORT);
        let mut attempt = 1;
        loop {
            match self.wire.exchange(&packet, target, SEND_TIMEOUT).await {
                Ok(datagram) => {
                    let reply = packet::parse_reply(&datagram.data, &self.key, &self.iv)?;
                    if reply.error_code != 0 {
                        debug!(code = reply.error_code, "device reported non-zero status");
                    }
                    return Ok(reply);
                }
                Err(err) if attempt < SEND_ATTEMPTS => {
                    warn!(attempt, error = %err, "send attempt failed, retrying");
                    tokio::time::sleep(SEND_RETRY_DELAY).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Exchange the fixed identification payload for the device-assigned
    /// key and id. The IV stays fixed even after re-authentication.
    pub async fn authenticate(&mut self) -> Result<AuthResult, BroadlinkError> {
        let mut payload = [0u8; 0x50];
        payload[0x04..0x13].fill(0x31);
        payload[0x1e] = 0x01;
        payload[0x2d] = 0x01;
        payload[0x30..0x37].copy_from_slice(b"Test  1");

        let reply = self.send_packet(CommandCode::Auth, &payload).await?;
        if reply.error_code != 0 || reply.payload.is_empty() {
            return Err(BroadlinkError::AuthFailed);
        }
        if reply.payload.len() < 16 {
            return Err(BroadlinkError::KeyLength {
                len: reply.payload.len(),
            });
        }
        let mut key = [0u8; 16];
        key.copy_from_slice(&reply.payload[..16]);
        self.key = key;
        self.device_id = reply.command_echo;
        debug!(
            id = %hex::encode(self.device_id),
            key = %hex::encode(self.key),
            "authenticated"
        );
        Ok(AuthResult {
            id: self.device_id,
            key: self.key,
        })
    }

    /// Probe for a device. With no `device_ip` the probe is broadcast and
    /// the first responder wins.
    pub async fn discover(
        &mut self,
        wait: Duration,
        local_ip: Ipv4Addr,
        device_ip: Option<IpAddr>,
    ) -> Result<DiscoveredDevice, BroadlinkError> {
        let now = Local::now();
        let fields = DiscoveryFields {
            timezone_hours: standard_offset_hours(&now),
            year: now.year() as u16,
            minute: now.minute() as u8,
            hour: now.hour() as u8,
            weekday: now.weekday().number_from_monday() as u8,
            day: now.day() as u8,
            month: now.month() as u8,
            local_ip,
            port: DISCOVERY_SOURCE_PORT,
        };
        let packet = packet::build_discovery_packet(&fields);

        let target = device_ip.unwrap_or(IpAddr::V4(Ipv4Addr::BROADCAST));
        debug!(%target, "sending discovery probe");
        let datagram = self
            .wire
            .exchange(&packet, SocketAddr::new(target, DEVICE_PORT), wait)
            .await?;
        parse_discovery_reply(&datagram)
    }

    /// Generic status query; each family interprets the payload its own
    /// way (see the `status` module).
    pub async fn read_status(&mut self) -> Result<Bytes, BroadlinkError> {
        let mut payload = [0u8; 16];
        payload[0] = 0x01;
        self.send_packet(CommandCode::Command, &payload)
            .await?
            .into_payload()
    }

    /// Replay a previously learned command. The device does not
    /// acknowledge; delivery is fire-and-forget.
    pub async fn send_ir_rf_data(
        &mut self,
        dialect: SendDialect,
        data: &[u8],
    ) -> Result<(), BroadlinkError> {
        let prefix = dialect.prefix();
        let mut payload = Vec::with_capacity(prefix.len() + data.len());
        payload.extend_from_slice(prefix);
        payload.extend_from_slice(data);
        self.send_packet(CommandCode::Command, &payload).await?;
        Ok(())
    }

    /// Put the device in learning mode; the user then presses a button
    /// on the remote to sample.
    pub async fn enter_learning(&mut self, dialect: LearnDialect) -> Result<(), BroadlinkError> {
        let mut payload = [0u8; 16];
        let prefix = dialect.enter_prefix();
        payload[..prefix.len()].copy_from_slice(prefix);
        debug!(?dialect, "entering learning mode");
        self.send_packet(CommandCode::Command, &payload).await?;
        Ok(())
    }

    /// Poll for the waveform sampled in learning mode.
    pub async fn check_captured_data(
        &mut self,
        dialect: LearnDialect,
    ) -> Result<Bytes, BroadlinkError> {
        let mut probe = [0u8; 16];
        let prefix = dialect.probe_prefix();
        probe[..prefix.len()].copy_from_slice(prefix);

        let data = self
            .poll_command(&probe)
            .await
            .map_err(|err| map_exhausted(err, BroadlinkError::LearningTimedOut))?;
        let strip = dialect.strip();
        if data.len() < strip {
            return Err(BroadlinkError::ShortPacket {
                expected: strip,
                actual: data.len(),
            });
        }
        Ok(data.slice(strip..))
    }

    /// Start an RF frequency sweep.
    pub async fn enter_rf_sweep(&mut self, dialect: RfDialect) -> Result<(), BroadlinkError> {
        let mut payload = [0u8; 16];
        let prefix = dialect.sweep_prefix();
        payload[..prefix.len()].copy_from_slice(prefix);
        debug!(?dialect, "entering RF sweep");
        self.send_packet(CommandCode::Command, &payload).await?;
        Ok(())
    }

    /// Poll until the device reports a locked carrier frequency.
    ///
    /// The RM4 dialect reports the frequency bytes, which must be echoed
    /// back when capturing; the RM-plus dialect reports none.
    pub async fn check_rf_frequency(
        &mut self,
        dialect: RfDialect,
    ) -> Result<Option<[u8; 4]>, BroadlinkError> {
        match dialect {
            RfDialect::RmPlus => {
                let mut probe = [0u8; 16];
                probe[0] = 0x1a;
                let mut rounds = RF_FREQUENCY_ROUNDS_RM_PLUS;
                loop {
                    let payload = self
                        .poll_command(&probe)
                        .await
                        .map_err(|err| map_exhausted(err, BroadlinkError::NoKeyDetected))?;
                    if payload.first() == Some(&1) {
                        return Ok(None);
                    }
                    rounds -= 1;
                    if rounds == 0 {
                        return Err(BroadlinkError::NoKeyDetected);
                    }
                }
            }
            RfDialect::Rm4Pro => {
                let mut probe = [0u8; 16];
                probe[..3].copy_from_slice(&[0x04, 0x00, 0x1a]);
                let mut rounds = RF_FREQUENCY_ROUNDS_RM4_PRO;
                loop {
                    let payload = self
                        .poll_command(&probe)
                        .await
                        .map_err(|err| map_exhausted(err, BroadlinkError::NoKeyDetected))?;
                    if payload.len() >= 7 {
                        let locked = payload[2] == 1;
                        let frequency = [payload[3], payload[4], payload[5], payload[6]];
                        let mhz = f64::from(u32::from_le_bytes(frequency)) / 1000.0;
                        debug!(mhz, locked, "sweep frequency");
                        if locked {
                            return Ok(Some(frequency));
                        }
                    }
                    rounds -= 1;
                    if rounds == 0 {
                        return Err(BroadlinkError::NoKeyDetected);
                    }
                }
            }
        }
    }

    /// Poll for RF data captured after the frequency was identified.
    pub async fn check_rf_data(
        &mut self,
        dialect: RfDialect,
        frequency: Option<[u8; 4]>,
    ) -> Result<Bytes, BroadlinkError> {
        match dialect {
            RfDialect::RmPlus => {
                let mut probe = [0u8; 16];
                probe[0] = 0x1b;
                self.poll_command(&probe)
                    .await
                    .map_err(|err| map_exhausted(err, BroadlinkError::NoRfData))
            }
            RfDialect::Rm4Pro => {
                // Echo the identified frequency back, then poll for data.
                let mut select = [0u8; 10];
                select[..3].copy_from_slice(&[0x04, 0x00, 0x1b]);
                if let Some(frequency) = frequency {
                    select[6..10].copy_from_slice(&frequency);
                }
                let mut probe = [0u8; 10];
                probe[..3].copy_from_slice(&[0x04, 0x00, 0x04]);

                let mut rounds = RF_CAPTURE_ROUNDS;
                loop {
                    self.poll_command(&select)
                        .await
                        .map_err(|err| map_exhausted(err, BroadlinkError::NoRfData))?;
                    let payload = self
                        .poll_command(&probe)
                        .await
                        .map_err(|err| map_exhausted(err, BroadlinkError::NoRfData))?;
                    if payload.iter().take(4).any(|&b| b != 0) {
                        if payload.len() < 2 {
                            return Err(BroadlinkError::ShortPacket {
                                expected: 2,
                                actual: payload.len(),
                            });
                        }
                        return Ok(payload.slice(2..));
                    }
                    rounds -= 1;
                    if rounds == 0 {
                        return Err(BroadlinkError::NoRfData);
                    }
                }
            }
        }
    }

    /// Leave sweep mode. Best-effort on every learning abort path.
    pub async fn cancel_rf_sweep(&mut self, dialect: RfDialect) -> Result<(), BroadlinkError> {
        let mut payload = [0u8; 16];
        let prefix = dialect.cancel_prefix();
        payload[..prefix.len()].copy_from_slice(prefix);
        debug!(?dialect, "cancelling RF sweep");
        self.send_packet(CommandCode::Command, &payload).await?;
        Ok(())
    }

    /// Set the SP2/SP3 combined power+nightlight level (0..=3).
    pub async fn set_power_state(&mut self, level: u8) -> Result<(), BroadlinkError> {
        let mut payload = [0u8; 16];
        payload[0] = 0x02;
        payload[4] = level;
        self.send_packet(CommandCode::Command, &payload).await?;
        Ok(())
    }

    /// Raw SP2/SP3S energy reply; decode with [`status::sp2_energy`].
    pub async fn sp2_get_energy(&mut self) -> Result<Bytes, BroadlinkError> {
        let payload = [0x08, 0x00, 0xfe, 0x01, 0x05, 0x01, 0x00, 0x00, 0x00, 0x2d];
        self.send_packet(CommandCode::Command, &payload)
            .await?
            .into_payload()
    }

    /// Socket bitmask of the MP1 power strip.
    pub async fn mp1_check_power(&mut self) -> Result<status::Mp1State, BroadlinkError> {
        let mut payload = [0u8; 16];
        payload[0x00] = 0x0a;
        payload[0x02] = 0xa5;
        payload[0x03] = 0xa5;
        payload[0x04] = 0x5a;
        payload[0x05] = 0x5a;
        payload[0x06] = 0xae;
        payload[0x07] = 0xc0;
        payload[0x08] = 0x01;

        let data = self
            .send_packet(CommandCode::Command, &payload)
            .await?
            .into_payload()?;
        let mask = data.get(0x0a).copied().ok_or(BroadlinkError::ShortPacket {
            expected: 0x0b,
            actual: data.len(),
        })?;
        Ok(status::Mp1State(mask))
    }

    /// Switch one socket (1..=4) of the MP1 power strip.
    pub async fn mp1_set_power_state(
        &mut self,
        socket: u8,
        on: bool,
    ) -> Result<(), BroadlinkError> {
        if !(1..=4).contains(&socket) {
            return Err(BroadlinkError::InvalidSocket(socket));
        }
        let mask = 0x01u8 << (socket - 1);

        let mut payload = [0u8; 16];
        payload[0x00] = 0x0d;
        payload[0x02] = 0xa5;
        payload[0x03] = 0xa5;
        payload[0x04] = 0x5a;
        payload[0x05] = 0x5a;
        payload[0x06] = 0xb2 + if on { mask << 1 } else { mask };
        payload[0x07] = 0xc0;
        payload[0x08] = 0x02;
        payload[0x0a] = 0x03;
        payload[0x0d] = mask;
        payload[0x0e] = if on { mask } else { 0 };

        let reply = self.send_packet(CommandCode::Command, &payload).await?;
        if reply.error_code != 0 {
            return Err(BroadlinkError::ErrorCode {
                code: reply.error_code,
            });
        }
        Ok(())
    }

    /// SP1 power switch. The device never acknowledges; failures are
    /// logged and swallowed.
    pub async fn sp1_set_power_state(&mut self, on: bool) {
        let payload = [if on { 0x01 } else { 0x00 }, 0x04, 0x04, 0x04];
        if let Err(err) = self.send_packet(CommandCode::Sp1Power, &payload).await {
            warn!(error = %err, "sp1 power command failed");
        }
    }

    /// Drive a Dooya curtain motor; returns the reported position byte.
    pub async fn dooya_set_state(&mut self, cmd1: u8, cmd2: u8) -> Result<u8, BroadlinkError> {
        let mut payload = [0u8; 16];
        payload[0] = 0x09;
        payload[2] = 0xbb;
        payload[3] = cmd1;
        payload[4] = cmd2;
        payload[9] = 0xfa;
        payload[10] = 0x44;

        let data = self
            .send_packet(CommandCode::Command, &payload)
            .await?
            .into_payload()?;
        data.first().copied().ok_or(BroadlinkError::InvalidResponse)
    }

    /// RM4 pro onboard temperature and humidity.
    pub async fn check_temp_humidity(&mut self) -> Result<TempHumidity, BroadlinkError> {
        let mut probe = [0u8; 16];
        probe[2] = 0x24;
        let payload = self.poll_command(&probe).await?;
        status::rm4_temp_humidity(&payload)
    }

    /// One polling pass: resend `probe` until the device reports data.
    async fn poll_command(&mut self, probe: &[u8]) -> Result<Bytes, BroadlinkError> {
        poller::poll_until(POLL_INTERVAL, POLL_ATTEMPTS, async || {
            self.send_packet(CommandCode::Command, probe).await
        })
        .await
    }
}

fn map_exhausted(err: BroadlinkError, domain: BroadlinkError) -> BroadlinkError {
    match err {
        BroadlinkError::Exhausted { .. } => domain,
        other => other,
    }
}

/// Offset from UTC in whole hours, taken at January 1st so daylight
/// saving never skews it.
fn standard_offset_hours(now: &DateTime<Local>) -> i32 {
    Local
        .with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0)
        .earliest()
        .map(|jan| jan.offset().local_minus_utc() / 3600)
        .unwrap_or(0)
}

fn parse_discovery_reply(datagram: &Datagram) -> Result<DiscoveredDevice, BroadlinkError> {
    let data = &datagram.data;
    if data.len() < OFF_DISCOVERY_MAC + 6 {
        return Err(BroadlinkError::ShortPacket {
            expected: OFF_DISCOVERY_MAC + 6,
            actual: data.len(),
        });
    }
    let device_type = u16::from_le_bytes([
        data[OFF_DISCOVERY_DEVICE_TYPE],
        data[OFF_DISCOVERY_DEVICE_TYPE + 1],
    ]);
    let mut mac = [0u8; 6];
    mac.copy_from_slice(&data[OFF_DISCOVERY_MAC..OFF_DISCOVERY_MAC + 6]);
    debug!(device_type, source = %datagram.source, "discovery reply");
    Ok(DiscoveredDevice {
        device_type,
        mac,
        address: datagram.source.ip(),
    })
}
