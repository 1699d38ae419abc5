//! Init, close, reconnection and forced logout

use anidb_test_utils::TestConnection;
use anidb_test_utils::builders::{login_accepted, pong};
use anidb_udp_core::{AniDbSettings, ConnectionPhase, Error, SettingsProvider, ValidationError};

#[tokio::test]
async fn test_init_opens_transport_and_marks_alive() {
    let connection = TestConnection::new();

    assert!(connection.handler.init().await.unwrap());

    assert!(connection.handler.is_alive());
    assert!(connection.handler.is_network_available());
    assert!(!connection.handler.is_logged_on());
    assert_eq!(connection.network.connections_created(), 1);
    assert_eq!(connection.handler.status().phase, ConnectionPhase::LoggedOut);

    let endpoint = connection.network.last_endpoint().unwrap();
    assert_eq!(endpoint.server_address, "api.anidb.net");
    assert_eq!(endpoint.server_port, 9000);
    assert_eq!(endpoint.client_port, 4556);
}

#[tokio::test]
async fn test_init_without_credentials_does_nothing() {
    let connection = TestConnection::with_settings(AniDbSettings::default());

    assert!(!connection.handler.init().await.unwrap());
    assert_eq!(connection.network.connections_created(), 0);
    assert!(!connection.handler.is_alive());
}

#[tokio::test]
async fn test_init_rejects_invalid_ports() {
    let connection = TestConnection::with_settings(AniDbSettings {
        client_port: 0,
        ..AniDbSettings::with_credentials("testuser", "testpass")
    });

    let err = connection.handler.init().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::InvalidConfiguration { .. })
    ));
    assert_eq!(connection.network.connections_created(), 0);
}

#[tokio::test]
async fn test_unreachable_network_is_recorded() {
    let connection = TestConnection::new();
    connection.network.set_unreachable(true);

    assert!(connection.handler.init().await.unwrap());
    assert!(!connection.handler.is_network_available());
    assert!(connection.handler.is_alive());
}

#[tokio::test]
async fn test_reinit_disposes_previous_transport() {
    let connection = TestConnection::initialized().await;
    connection
        .network
        .push_reply(login_accepted("abc123", "img.example"));
    assert!(connection.handler.login().await);

    assert!(connection.handler.init().await.unwrap());

    assert_eq!(connection.network.connections_created(), 2);
    assert_eq!(connection.network.disposed_count(), 1);
    assert!(!connection.handler.is_logged_on());
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let connection = TestConnection::initialized().await;

    connection.handler.close_connections().await;
    connection.handler.close_connections().await;

    assert_eq!(connection.network.disposed_count(), 1);
    assert!(!connection.handler.is_alive());
    assert!(!connection.handler.is_network_available());
    assert_eq!(
        connection.handler.status().phase,
        ConnectionPhase::Disconnected
    );

    // Safe to come back after a close
    assert!(connection.handler.init().await.unwrap());
    assert!(connection.handler.is_alive());
}

#[tokio::test]
async fn test_init_with_stores_endpoint_and_credentials() {
    let connection = TestConnection::with_settings(AniDbSettings::default());

    let initialized = connection
        .handler
        .init_with("someone", "hunter2", "127.0.0.1", 9001, 4557)
        .await
        .unwrap();
    assert!(initialized);

    let endpoint = connection.network.last_endpoint().unwrap();
    assert_eq!(endpoint.server_address, "127.0.0.1");
    assert_eq!(endpoint.server_port, 9001);
    assert_eq!(endpoint.client_port, 4557);

    let stored = connection.settings.load();
    assert_eq!(stored.username, "someone");
    assert_eq!(stored.password.expose_secret(), "hunter2");
}

#[tokio::test]
async fn test_init_with_bad_port_fails() {
    let connection = TestConnection::with_settings(AniDbSettings::default());

    let result = connection
        .handler
        .init_with("someone", "hunter2", "127.0.0.1", 0, 4557)
        .await;
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[tokio::test]
async fn test_force_logout_sends_logout() {
    let connection = TestConnection::initialized().await;
    connection
        .network
        .push_reply(login_accepted("abc123", "img.example"));
    connection.network.set_default_reply(pong());
    assert!(connection.handler.login().await);

    connection.handler.force_logout().await;

    assert!(!connection.handler.is_logged_on());
    assert_eq!(connection.handler.session_id(), None);
    assert_eq!(
        connection.network.sent_commands().last().map(String::as_str),
        Some("LOGOUT s=abc123")
    );
}

#[tokio::test]
async fn test_force_logout_when_logged_out_is_noop() {
    let connection = TestConnection::initialized().await;

    connection.handler.force_logout().await;

    assert_eq!(connection.network.send_count(), 0);
}

#[tokio::test]
async fn test_force_logout_while_banned_stays_silent() {
    let connection = TestConnection::initialized().await;
    connection
        .network
        .push_reply(login_accepted("abc123", "img.example"));
    assert!(connection.handler.login().await);
    connection.handler.mark_banned();

    connection.handler.force_logout().await;

    assert!(!connection.handler.is_logged_on());
    assert_eq!(connection.network.send_count(), 1);
}

#[tokio::test]
async fn test_force_logout_ignores_transport_errors() {
    let connection = TestConnection::initialized().await;
    connection
        .network
        .push_reply(login_accepted("abc123", "img.example"));
    assert!(connection.handler.login().await);

    // No reply scripted: the LOGOUT send fails
    connection.handler.force_logout().await;

    assert!(!connection.handler.is_logged_on());
    assert_eq!(connection.network.send_count(), 2);
}

#[tokio::test]
async fn test_force_reconnection_rebuilds_transport() {
    let connection = TestConnection::initialized().await;
    connection
        .network
        .push_reply(login_accepted("abc123", "img.example"));
    connection.network.set_default_reply(pong());
    assert!(connection.handler.login().await);

    connection.handler.force_reconnection().await;

    assert_eq!(
        connection.network.sent_commands().last().map(String::as_str),
        Some("LOGOUT s=abc123")
    );
    assert_eq!(connection.network.connections_created(), 2);
    assert_eq!(connection.network.disposed_count(), 1);
    assert!(connection.handler.is_alive());
    assert!(!connection.handler.is_logged_on());
    assert_eq!(connection.handler.status().phase, ConnectionPhase::LoggedOut);
}

#[tokio::test]
async fn test_force_reconnection_survives_failed_reinit() {
    let connection = TestConnection::initialized().await;
    let mut settings = connection.settings.load();
    settings.server_address = String::new();
    connection.settings.save(&settings).unwrap();

    connection.handler.force_reconnection().await;

    assert_eq!(connection.network.disposed_count(), 1);
    assert!(!connection.handler.is_alive());
    assert_eq!(
        connection.handler.status().phase,
        ConnectionPhase::Disconnected
    );
}
