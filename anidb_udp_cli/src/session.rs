//! One-shot sessions against the AniDB UDP API
//!
//! Each subcommand opens a handler from the loaded configuration, does its
//! work and logs out again before the process exits.

use crate::config::AppConfig;
use anidb_udp_core::{
    ConnectionEvent, ConnectionStatus, MemorySettingsProvider, UdpConnectionHandler,
};
use anyhow::{Context, Result, bail};
use colored::Colorize;
use std::sync::Arc;
use tokio::sync::broadcast::Receiver;

/// A connected handler plus the event stream it publishes
pub struct Session {
    pub handler: UdpConnectionHandler,
    events: Receiver<ConnectionEvent>,
}

impl Session {
    /// Build a handler over the configured account without touching the network
    pub fn new(config: &AppConfig) -> Self {
        let settings = Arc::new(MemorySettingsProvider::new(config.account.to_settings()));
        let handler = UdpConnectionHandler::new(config.udp.clone(), settings);
        let events = handler.subscribe();
        Self { handler, events }
    }

    /// Open the transport, failing when no credentials are configured
    pub async fn open(config: &AppConfig) -> Result<Self> {
        if !config.account.has_credentials() {
            bail!(
                "No AniDB credentials configured. Set [account] username and password \
                 in the config file or ANIDB_UDP_ACCOUNT__USERNAME / ANIDB_UDP_ACCOUNT__PASSWORD"
            );
        }

        let session = Self::new(config);
        session
            .handler
            .init()
            .await
            .context("Failed to open UDP connection")?;
        Ok(session)
    }

    /// Log out, close the socket and report what happened along the way
    pub async fn finish(mut self) -> Vec<ConnectionEvent> {
        self.handler.force_logout().await;
        self.handler.close_connections().await;
        self.drain_events()
    }

    fn drain_events(&mut self) -> Vec<ConnectionEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}

/// Log in, send one command and print the reply
pub async fn send(config: &AppConfig, command: &str, use_unicode: bool) -> Result<String> {
    let session = Session::open(config).await?;
    let result = session
        .handler
        .execute(command, use_unicode, false)
        .await
        .with_context(|| format!("Command failed: {}", command_name(command)));
    print_events(&session.finish().await);
    result
}

/// Log in and send a PING
pub async fn ping(config: &AppConfig) -> Result<String> {
    let session = Session::open(config).await?;
    let result = session
        .handler
        .execute("PING", false, true)
        .await
        .context("PING failed");
    print_events(&session.finish().await);
    result
}

/// Check a username and password without keeping the session
pub async fn test_login(config: &AppConfig, username: &str, password: &str) -> Result<bool> {
    let session = Session::new(config);
    let account = &config.account;
    session
        .handler
        .init_with(
            username,
            password,
            &account.server_address,
            account.server_port,
            account.client_port,
        )
        .await
        .context("Failed to open UDP connection")?;

    let accepted = session.handler.test_login(username, password).await;
    print_events(&session.finish().await);
    Ok(accepted)
}

/// Snapshot of a freshly opened, logged-out handler
pub async fn status(config: &AppConfig) -> Result<ConnectionStatus> {
    let session = Session::new(config);
    if config.account.has_credentials() {
        session
            .handler
            .init()
            .await
            .context("Failed to open UDP connection")?;
    }
    let status = session.handler.status();
    session.handler.close_connections().await;
    Ok(status)
}

pub fn render_status(status: &ConnectionStatus) -> String {
    let mut lines = vec![
        format!("Phase:           {}", status.phase),
        format!("Logged on:       {}", status.logged_on),
        format!("Invalid session: {}", status.invalid_session),
        format!("Network:         {}", status.network_available),
        format!("Image server:    {}", status.image_server_url),
    ];
    if let Some(expires) = status.ban_expires {
        lines.push(format!("Banned until:    {expires}"));
    }
    if let Some(pause) = &status.pause {
        lines.push(format!(
            "Paused:          {}s ({})",
            pause.seconds, pause.reason
        ));
    }
    lines.join("\n")
}

fn print_events(events: &[ConnectionEvent]) {
    for event in events {
        match event {
            ConnectionEvent::LoginFailed => {
                eprintln!("{} login was rejected", "warning:".yellow());
            }
            ConnectionEvent::Banned { expires } => {
                eprintln!("{} banned until {expires}", "warning:".red());
            }
            ConnectionEvent::BanPaused { seconds, reason } => {
                eprintln!("{} paused for {seconds}s: {reason}", "warning:".yellow());
            }
            other => log::debug!("Connection event: {other:?}"),
        }
    }
}

/// First word of a command, for messages that must not echo parameters
fn command_name(command: &str) -> &str {
    command.split_whitespace().next().unwrap_or(command)
}
