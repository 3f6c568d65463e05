//! Multi-step learning sequences.
//!
//! Capture is long-running: the device waits for the user to press
//! remote buttons while the engine polls. The token lets the host abort
//! between cycles; an RF sweep is always cancelled on the way out, error
//! paths included.

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::BroadlinkError;
use crate::family::{LearnDialect, RfDialect, SendDialect};
use crate::session::Session;
use crate::store::CommandStore;
use crate::transport::Wire;

/// Put the device in IR learning mode and wait for a captured waveform.
pub async fn learn_ir<W: Wire>(
    session: &mut Session<W>,
    dialect: LearnDialect,
    token: &CancellationToken,
) -> Result<Bytes, BroadlinkError> {
    session.enter_learning(dialect).await?;
    tokio::select! {
        _ = token.cancelled() => Err(BroadlinkError::Cancelled),
        data = session.check_captured_data(dialect) => data,
    }
}

/// Full RF learning sequence: sweep, frequency lock, capture.
///
/// The user long-presses a remote button until the frequency locks, then
/// presses repeatedly while the device captures the data.
pub async fn learn_rf<W: Wire>(
    session: &mut Session<W>,
    dialect: RfDialect,
    token: &CancellationToken,
) -> Result<Bytes, BroadlinkError> {
    session.enter_rf_sweep(dialect).await?;
    let result = rf_capture(session, dialect, token).await;
    // Leave sweep mode even when the capture failed or was cancelled.
    if let Err(err) = session.cancel_rf_sweep(dialect).await {
        warn!(error = %err, "failed to cancel RF sweep");
    }
    result
}

async fn rf_capture<W: Wire>(
    session: &mut Session<W>,
    dialect: RfDialect,
    token: &CancellationToken,
) -> Result<Bytes, BroadlinkError> {
    let frequency = tokio::select! {
        _ = token.cancelled() => return Err(BroadlinkError::Cancelled),
        frequency = session.check_rf_frequency(dialect) => frequency?,
    };
    debug!(frequency = ?frequency, "carrier frequency identified");
    tokio::select! {
        _ = token.cancelled() => Err(BroadlinkError::Cancelled),
        data = session.check_rf_data(dialect, frequency) => data,
    }
}

/// Learn an IR command and persist it under the next free `cmd<N>` name.
pub async fn learn_ir_to_store<W: Wire>(
    session: &mut Session<W>,
    dialect: LearnDialect,
    store: &mut CommandStore,
    token: &CancellationToken,
) -> Result<String, BroadlinkError> {
    let data = learn_ir(session, dialect, token).await?;
    let name = store.next_name("cmd");
    store.add(&name, data.to_vec())?;
    debug!(name = %name, len = data.len(), "stored learned IR command");
    Ok(name)
}

/// Learn an RF command and persist it under the next free `rf-cmd<N>`
/// name.
pub async fn learn_rf_to_store<W: Wire>(
    session: &mut Session<W>,
    dialect: RfDialect,
    store: &mut CommandStore,
    token: &CancellationToken,
) -> Result<String, BroadlinkError> {
    let data = learn_rf(session, dialect, token).await?;
    let name = store.next_name("rf-cmd");
    store.add(&name, data.to_vec())?;
    debug!(name = %name, len = data.len(), "stored learned RF command");
    Ok(name)
}

/// Send a stored command by name.
pub async fn send_stored<W: Wire>(
    session: &mut Session<W>,
    dialect: SendDialect,
    store: &CommandStore,
    name: &str,
) -> Result<(), BroadlinkError> {
    let data = store
        .get(name)
        .ok_or_else(|| BroadlinkError::UnknownCommand(name.to_string()))?;
    session.send_ir_rf_data(dialect, data).await
}
