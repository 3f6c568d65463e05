//! Tests for the RF sweep state machine and learning orchestration.

mod common;

use std::env;
use std::path::PathBuf;

use common::*;
use tokio_util::sync::CancellationToken;

use broadlink_lib::constants::DEFAULT_KEY;
use broadlink_lib::error::BroadlinkError;
use broadlink_lib::family::{LearnDialect, RfDialect};
use broadlink_lib::learn;
use broadlink_lib::store::CommandStore;

/// Zero-status frequency reply for the RM4-pro dialect.
fn frequency_reply(locked: bool, khz: u32) -> ScriptedEvent {
    let mut payload = [0u8; 16];
    payload[2] = if locked { 1 } else { 0 };
    payload[3..7].copy_from_slice(&khz.to_le_bytes());
    ok_reply(&payload)
}

fn store_dir(test: &str) -> PathBuf {
    env::temp_dir().join(format!("broadlink-learn-{}-{}", std::process::id(), test))
}

#[tokio::test(start_paused = true)]
async fn frequency_check_resolves_on_nth_probe() {
    // Two "not ready" probes, then a locked frequency on the third.
    let mut session = scripted_session([
        busy_reply(),
        busy_reply(),
        frequency_reply(true, 433_920),
    ]);

    let frequency = session
        .check_rf_frequency(RfDialect::Rm4Pro)
        .await
        .unwrap();
    assert_eq!(frequency, Some(433_920u32.to_le_bytes()));
    assert_eq!(session.wire().sent.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn frequency_check_fails_when_never_locked() {
    // The device answers every probe but never reports a lock.
    let replies = (0..10).map(|_| frequency_reply(false, 0));
    let mut session = scripted_session(replies);

    let err = session
        .check_rf_frequency(RfDialect::Rm4Pro)
        .await
        .unwrap_err();
    assert!(matches!(err, BroadlinkError::NoKeyDetected));
    assert_eq!(session.wire().sent.len(), 10);
}

#[tokio::test(start_paused = true)]
async fn frequency_check_maps_poll_exhaustion() {
    // Eight "not ready" statuses exhaust one polling pass.
    let replies = (0..8).map(|_| busy_reply());
    let mut session = scripted_session(replies);

    let err = session
        .check_rf_frequency(RfDialect::Rm4Pro)
        .await
        .unwrap_err();
    assert!(matches!(err, BroadlinkError::NoKeyDetected));
}

#[tokio::test(start_paused = true)]
async fn rm_plus_frequency_check_reports_no_bytes() {
    let mut payload = [0u8; 16];
    payload[0] = 1;
    let mut session = scripted_session([ok_reply(&payload)]);

    let frequency = session
        .check_rf_frequency(RfDialect::RmPlus)
        .await
        .unwrap();
    assert_eq!(frequency, None);
}

#[tokio::test(start_paused = true)]
async fn rf_capture_returns_data_after_frequency_echo() {
    let mut captured = [0u8; 16];
    captured[..2].copy_from_slice(&[0x04, 0x00]);
    captured[2..10].copy_from_slice(b"rf-burst");

    let mut session = scripted_session([
        ok_reply(&[0u8; 16]), // frequency select acknowledged
        ok_reply(&captured),  // capture probe reports data
    ]);

    let data = session
        .check_rf_data(RfDialect::Rm4Pro, Some([0xc8, 0x9e, 0x06, 0x00]))
        .await
        .unwrap();
    assert_eq!(&data[..8], b"rf-burst");

    // The select payload echoes the frequency bytes at offset 6.
    let select = sent_payload(&session.wire().sent[0], &DEFAULT_KEY);
    assert_eq!(&select[..3], &[0x04, 0x00, 0x1b]);
    assert_eq!(&select[6..10], &[0xc8, 0x9e, 0x06, 0x00]);
}

#[tokio::test(start_paused = true)]
async fn rf_capture_gives_up_on_all_zero_data() {
    // Every round acknowledges the select but reports no data.
    let replies = (0..20).map(|_| ok_reply(&[0u8; 16]));
    let mut session = scripted_session(replies);

    let err = session
        .check_rf_data(RfDialect::Rm4Pro, Some([0, 0, 0, 0]))
        .await
        .unwrap_err();
    assert!(matches!(err, BroadlinkError::NoRfData));
}

#[tokio::test(start_paused = true)]
async fn learn_rf_runs_the_full_sequence() {
    let mut captured = [0u8; 16];
    captured[..2].copy_from_slice(&[0x04, 0x00]);
    captured[2..10].copy_from_slice(b"rf-burst");

    let mut session = scripted_session([
        ok_reply(&[]),                   // enter sweep
        frequency_reply(true, 433_920),  // frequency locked
        ok_reply(&[0u8; 16]),            // frequency select acknowledged
        ok_reply(&captured),             // capture probe reports data
        ok_reply(&[]),                   // cancel sweep
    ]);

    let token = CancellationToken::new();
    let data = learn::learn_rf(&mut session, RfDialect::Rm4Pro, &token)
        .await
        .unwrap();
    assert_eq!(&data[..8], b"rf-burst");

    // The sweep is closed on the way out.
    let sent = &session.wire().sent;
    assert_eq!(sent.len(), 5);
    let cancel = sent_payload(&sent[4], &DEFAULT_KEY);
    assert_eq!(&cancel[..3], &[0x04, 0x00, 0x1e]);
}

#[tokio::test(start_paused = true)]
async fn cancelled_learn_still_leaves_sweep_mode() {
    let mut session = scripted_session([
        ok_reply(&[]), // enter sweep
        ok_reply(&[]), // cancel sweep
    ]);

    let token = CancellationToken::new();
    token.cancel();
    let err = learn::learn_rf(&mut session, RfDialect::Rm4Pro, &token)
        .await
        .unwrap_err();
    assert!(matches!(err, BroadlinkError::Cancelled));

    let sent = &session.wire().sent;
    assert_eq!(sent.len(), 2);
    let cancel = sent_payload(&sent[1], &DEFAULT_KEY);
    assert_eq!(&cancel[..3], &[0x04, 0x00, 0x1e]);
}

#[tokio::test(start_paused = true)]
async fn learn_ir_to_store_persists_under_next_name() {
    let mut session = scripted_session([
        ok_reply(&[]),       // enter learning
        ok_reply(b"pulses"), // captured waveform
    ]);
    let dir = store_dir("learn-ir");
    let mut store = CommandStore::open(&dir, &TEST_MAC).unwrap();
    store.delete_all().unwrap();

    let token = CancellationToken::new();
    let name = learn::learn_ir_to_store(&mut session, LearnDialect::Classic, &mut store, &token)
        .await
        .unwrap();
    assert_eq!(name, "cmd1");

    let stored = store.get("cmd1").unwrap();
    assert_eq!(&stored[..6], b"pulses");
}

#[tokio::test(start_paused = true)]
async fn learning_timeout_is_surfaced_as_domain_error() {
    let replies = (0..8).map(|_| busy_reply());
    let mut session = scripted_session(replies);

    let err = session
        .check_captured_data(LearnDialect::Classic)
        .await
        .unwrap_err();
    assert!(matches!(err, BroadlinkError::LearningTimedOut));
}

#[tokio::test(start_paused = true)]
async fn send_stored_rejects_unknown_names() {
    let dir = store_dir("send-missing");
    let store = CommandStore::open(&dir, &TEST_MAC).unwrap();
    let mut session = scripted_session([]);

    let err = learn::send_stored(
        &mut session,
        broadlink_lib::family::SendDialect::Classic,
        &store,
        "missing",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BroadlinkError::UnknownCommand(_)));
    assert!(session.wire().sent.is_empty());
}
