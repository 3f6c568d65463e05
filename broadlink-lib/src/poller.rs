//! Bounded-attempt polling for slow device-side operations.

use std::ops::AsyncFnMut;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::sleep;
use tracing::debug;

use crate::error::BroadlinkError;
use crate::packet::Reply;

/// Run `probe` every `interval` until it returns a zero-status reply,
/// for at most `attempts` tries.
///
/// Only protocol-level "not ready yet" statuses are retried; transport
/// failures abort immediately.
pub async fn poll_until<F>(
    interval: Duration,
    attempts: u32,
    mut probe: F,
) -> Result<Bytes, BroadlinkError>
where
    F: AsyncFnMut() -> Result<Reply, BroadlinkError>,
{
    let mut remaining = attempts;
    loop {
        sleep(interval).await;
        let reply = probe().await?;
        if reply.error_code == 0 {
            return Ok(reply.payload);
        }
        remaining = remaining.saturating_sub(1);
        debug!(code = reply.error_code, remaining, "device not ready");
        if remaining == 0 {
            return Err(BroadlinkError::Exhausted { attempts });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn not_ready() -> Reply {
        Reply {
            error_code: 0xfff9,
            ..Reply::default()
        }
    }

    fn ready(payload: &'static [u8]) -> Reply {
        Reply {
            error_code: 0,
            command_echo: [0; 4],
            payload: Bytes::from_static(payload),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_on_first_zero_status() {
        let mut calls = 0u32;
        let result = poll_until(Duration::from_secs(2), 8, async || {
            calls += 1;
            if calls < 3 {
                Ok(not_ready())
            } else {
                Ok(ready(b"waveform"))
            }
        })
        .await
        .unwrap();
        assert_eq!(result.as_ref(), b"waveform");
        assert_eq!(calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_attempts() {
        let mut calls = 0u32;
        let err = poll_until(Duration::from_secs(2), 8, async || {
            calls += 1;
            Ok(not_ready())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, BroadlinkError::Exhausted { attempts: 8 }));
        assert_eq!(calls, 8);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_error_aborts_immediately() {
        let mut calls = 0u32;
        let err = poll_until(Duration::from_secs(2), 8, async || {
            calls += 1;
            Err(BroadlinkError::Io(io::Error::from(
                io::ErrorKind::ConnectionRefused,
            )))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, BroadlinkError::Io(_)));
        assert_eq!(calls, 1);
    }
}
