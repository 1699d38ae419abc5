//! Keepalive timer behaviour
//!
//! Time is paused; ticks are driven by `pulse()` directly or by the
//! background timer with a short interval.

use anidb_test_utils::TestConnection;
use anidb_test_utils::builders::{login_accepted, pong};
use anidb_udp_core::{AniDbSettings, ConnectionEvent, UdpConfig};
use std::time::Duration;
use tokio::time::advance;

async fn logged_in() -> TestConnection {
    let connection = TestConnection::initialized().await;
    connection
        .network
        .push_reply(login_accepted("abc123", "img.example"));
    connection.network.set_default_reply(pong());
    assert!(connection.handler.login().await);
    connection
}

fn pings(connection: &TestConnection) -> usize {
    connection
        .network
        .sent_commands()
        .iter()
        .filter(|command| command.as_str() == "PING")
        .count()
}

#[tokio::test(start_paused = true)]
async fn test_ping_after_idle_period() {
    let connection = logged_in().await;

    advance(Duration::from_secs(44)).await;
    connection.handler.pulse().await;
    assert_eq!(pings(&connection), 0);

    advance(Duration::from_secs(1)).await;
    connection.handler.pulse().await;
    assert_eq!(pings(&connection), 1);

    // Just pinged, nothing to do
    connection.handler.pulse().await;
    assert_eq!(pings(&connection), 1);
    assert!(connection.handler.is_logged_on());
}

#[tokio::test(start_paused = true)]
async fn test_no_ping_when_logged_out() {
    let connection = TestConnection::initialized().await;
    connection.network.set_default_reply(pong());

    advance(Duration::from_secs(120)).await;
    connection.handler.pulse().await;

    assert_eq!(connection.network.send_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_locked_transport_skips_tick() {
    let connection = logged_in().await;
    let sends_before = connection.network.send_count();

    advance(Duration::from_secs(700)).await;
    connection.network.set_locked(true);
    for _ in 0..3 {
        connection.handler.pulse().await;
    }

    assert_eq!(connection.network.send_count(), sends_before);
    assert!(connection.handler.is_logged_on());

    // Timestamps were left alone, so the ping is still due once unlocked
    connection.network.set_locked(false);
    connection.handler.pulse().await;
    assert_eq!(pings(&connection), 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_ping_while_banned() {
    let connection = logged_in().await;
    connection.handler.mark_banned();

    advance(Duration::from_secs(60)).await;
    connection.handler.pulse().await;

    assert_eq!(pings(&connection), 0);
}

#[tokio::test(start_paused = true)]
async fn test_force_logout_after_long_inactivity() {
    let connection = logged_in().await;

    advance(Duration::from_secs(601)).await;
    connection.handler.pulse().await;

    assert!(!connection.handler.is_logged_on());
    assert_eq!(connection.handler.session_id(), None);
    let sent = connection.network.sent_commands();
    assert_eq!(sent.last().map(String::as_str), Some("LOGOUT s=abc123"));
}

#[tokio::test(start_paused = true)]
async fn test_pings_do_not_count_as_activity_for_logout() {
    let connection = logged_in().await;

    // Keep pinging every 45s; the session is still dropped after 600s
    for _ in 0..14 {
        advance(Duration::from_secs(45)).await;
        connection.handler.pulse().await;
    }
    assert!(!connection.handler.is_logged_on());
    assert!(pings(&connection) >= 13);
}

#[tokio::test(start_paused = true)]
async fn test_ban_pause_clears_after_window() {
    let connection = logged_in().await;
    let mut events = connection.handler.subscribe();
    connection
        .handler
        .execute("FILE fid=1", true, false)
        .await
        .unwrap();

    connection.handler.extend_ban_timer(30, "client is too fast");
    assert!(connection.handler.is_banned());

    advance(Duration::from_secs(29)).await;
    connection.handler.pulse().await;
    assert!(connection.handler.is_banned());

    advance(Duration::from_secs(1)).await;
    connection.handler.pulse().await;
    assert!(!connection.handler.is_banned());
    assert!(connection.handler.status().pause.is_none());

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    assert_eq!(
        received,
        vec![
            ConnectionEvent::BanPaused {
                seconds: 30,
                reason: "client is too fast".to_string()
            },
            ConnectionEvent::BanCleared,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_ban_pause_is_not_cleared_by_commands() {
    let connection = logged_in().await;
    connection.handler.extend_ban_timer(30, "slow down");

    advance(Duration::from_secs(60)).await;
    assert!(connection.handler.is_banned());
    assert!(
        connection
            .handler
            .execute("FILE fid=1", true, false)
            .await
            .is_err()
    );

    connection.handler.pulse().await;
    assert!(!connection.handler.is_banned());
}

#[tokio::test(start_paused = true)]
async fn test_lapsed_ban_is_cleared_by_tick() {
    let connection = logged_in().await;
    connection.handler.mark_banned();
    let mut events = connection.handler.subscribe();

    advance(Duration::from_secs(90 * 60)).await;
    assert!(!connection.handler.is_banned());
    connection.handler.pulse().await;
    assert_eq!(events.try_recv().unwrap(), ConnectionEvent::BanCleared);
}

#[tokio::test(start_paused = true)]
async fn test_background_timer_pings_and_stops_on_close() {
    let config = UdpConfig {
        pulse_interval_secs: 5,
        ..UdpConfig::test()
    };
    let connection = TestConnection::with_config(
        config,
        AniDbSettings::with_credentials("testuser", "testpass"),
    );
    assert!(connection.handler.init().await.unwrap());
    connection
        .network
        .push_reply(login_accepted("abc123", "img.example"));
    connection.network.set_default_reply(pong());
    assert!(connection.handler.login().await);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(pings(&connection), 1);

    connection.handler.close_connections().await;
    let sends = connection.network.send_count();
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(connection.network.send_count(), sends);
}
