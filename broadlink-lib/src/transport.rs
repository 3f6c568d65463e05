//! One-datagram-at-a-time UDP exchange with a device.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::debug;

use crate::error::BroadlinkError;

/// Largest datagram we ever expect back from a device.
const RECV_BUFFER_SIZE: usize = 2048;

/// A received datagram and where it came from.
#[derive(Debug, Clone)]
pub struct Datagram {
    pub data: Bytes,
    pub source: SocketAddr,
}

/// Datagram exchange seam: one request, one reply.
///
/// The engine never pipelines; `&mut self` keeps a session's verbs
/// strictly serialized.
#[allow(async_fn_in_trait)]
pub trait Wire {
    async fn exchange(
        &mut self,
        packet: &[u8],
        target: SocketAddr,
        wait: Duration,
    ) -> Result<Datagram, BroadlinkError>;

    /// Release the underlying socket.
    fn close(&mut self);
}

/// The real transport: a lazily-bound UDP socket kept for the lifetime
/// of the session.
#[derive(Debug, Default)]
pub struct UdpWire {
    socket: Option<UdpSocket>,
}

impl UdpWire {
    pub fn new() -> Self {
        Self { socket: None }
    }
}

impl Wire for UdpWire {
    async fn exchange(
        &mut self,
        packet: &[u8],
        target: SocketAddr,
        wait: Duration,
    ) -> Result<Datagram, BroadlinkError> {
        if self.socket.is_none() {
            let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
            socket.set_broadcast(true)?;
            debug!(local = %socket.local_addr()?, "bound UDP socket");
            self.socket = Some(socket);
        }
        let Some(socket) = &self.socket else {
            return Err(io::Error::from(io::ErrorKind::NotConnected).into());
        };

        socket.send_to(packet, target).await?;
        debug!(%target, len = packet.len(), "sent datagram");

        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        match timeout(wait, socket.recv_from(&mut buf)).await {
            Ok(Ok((len, source))) => {
                buf.truncate(len);
                debug!(%source, len, "received datagram");
                Ok(Datagram {
                    data: Bytes::from(buf),
                    source,
                })
            }
            Ok(Err(err)) => {
                self.close();
                Err(err.into())
            }
            Err(elapsed) => {
                // The device never answered; drop the socket so the next
                // attempt starts clean.
                self.close();
                Err(elapsed.into())
            }
        }
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!("closed UDP socket");
        }
    }
}
