//! Stateful AniDB UDP connection handler
//!
//! [`UdpConnectionHandler`] owns the transport, the keepalive timer and the
//! session/ban state. Callers hand it command text and get reply text back;
//! parsing replies into typed responses is the caller's business.
//!
//! All flag transitions happen under one state lock that is never held
//! across an await point. The transport sits in its own slot so it can be
//! swapped by a reconnection; operations already holding the old transport
//! fail against it once it is disposed.

mod ban;
mod login;
mod pulse;
mod state;

pub use ban::{BanPause, BanTimer, BanType};
pub use login::MAX_LOGIN_ATTEMPTS;
pub use state::{ConnectionPhase, ConnectionStatus};

use crate::config::UdpConfig;
use crate::error::{Error, Result};
use crate::events::{ConnectionEvent, EventBus};
use crate::protocol::codec::{Codec, TextEncoding, mask_credentials};
use crate::protocol::messages::{AniDBCommand, LogoutCommand};
use crate::protocol::transport::{
    Endpoint, SocketHandler, TransportFactory, UdpTransportFactory,
};
use crate::rate_limit::{IntervalRateLimiter, RateLimiter};
use crate::security::SecureString;
use crate::settings::SettingsProvider;
use chrono::{DateTime, Utc};
use log::{debug, error, info, trace, warn};
use pulse::PulseHandle;
use state::ConnectionState;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::broadcast;

/// Connection handler for the AniDB UDP API
///
/// Cheap to clone; clones share the same connection.
#[derive(Clone)]
pub struct UdpConnectionHandler {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    this: Weak<Inner>,
    config: UdpConfig,
    settings: Arc<dyn SettingsProvider>,
    transport_factory: Arc<dyn TransportFactory>,
    rate_limiter: Arc<dyn RateLimiter>,
    codec: Codec,
    state: Mutex<ConnectionState>,
    transport: Mutex<Option<Arc<dyn SocketHandler>>>,
    pulse: Mutex<Option<PulseHandle>>,
    pulse_running: AtomicBool,
    lifecycle: tokio::sync::Mutex<()>,
    login_lock: tokio::sync::Mutex<()>,
    events: EventBus,
}

impl UdpConnectionHandler {
    /// Create a handler over the real UDP transport
    pub fn new(config: UdpConfig, settings: Arc<dyn SettingsProvider>) -> Self {
        let rate_limiter = Arc::new(IntervalRateLimiter::new(config.min_request_interval()));
        Self::with_collaborators(config, settings, Arc::new(UdpTransportFactory), rate_limiter)
    }

    /// Create a handler with explicit transport factory and rate limiter
    pub fn with_collaborators(
        config: UdpConfig,
        settings: Arc<dyn SettingsProvider>,
        transport_factory: Arc<dyn TransportFactory>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        let ban = BanTimer::new(BanType::Udp, config.ban_reset_length());
        let state = ConnectionState::new(config.image_domain.clone(), ban);

        let inner = Arc::new_cyclic(|this| Inner {
            this: this.clone(),
            config,
            settings,
            transport_factory,
            rate_limiter,
            codec: Codec::new(),
            state: Mutex::new(state),
            transport: Mutex::new(None),
            pulse: Mutex::new(None),
            pulse_running: AtomicBool::new(false),
            lifecycle: tokio::sync::Mutex::new(()),
            login_lock: tokio::sync::Mutex::new(()),
            events: EventBus::new(),
        });

        Self { inner }
    }

    /// Open the transport with the stored settings and start the keepalive timer
    ///
    /// Returns `Ok(false)` without touching the network when no credentials
    /// are stored.
    pub async fn init(&self) -> Result<bool> {
        if !self.inner.settings.load().has_credentials() {
            warn!("AniDB credentials are not set, not initializing UDP connection");
            return Ok(false);
        }

        let _lifecycle = self.inner.lifecycle.lock().await;
        self.inner.init_internal().await?;
        Ok(true)
    }

    /// Store server location and credentials, then initialize
    pub async fn init_with(
        &self,
        username: &str,
        password: &str,
        server_address: &str,
        server_port: u16,
        client_port: u16,
    ) -> Result<bool> {
        let mut settings = self.inner.settings.load();
        settings.server_address = server_address.to_string();
        settings.server_port = server_port;
        settings.client_port = client_port;
        self.inner.settings.save(&settings)?;

        if !self.set_credentials(username, password) {
            return Ok(false);
        }

        let _lifecycle = self.inner.lifecycle.lock().await;
        self.inner.init_internal().await?;
        Ok(true)
    }

    /// Stop the keepalive timer and dispose the transport
    pub async fn close_connections(&self) {
        let _lifecycle = self.inner.lifecycle.lock().await;
        self.inner.close_internal().await;
    }

    /// Send a command, logging in first if needed
    ///
    /// Fails fast with [`Error::Disposed`], [`Error::Banned`] or
    /// [`Error::NotLoggedIn`] before any network I/O when the connection is
    /// torn down, banned or has an invalid session.
    pub async fn execute(&self, command: &str, use_unicode: bool, is_ping: bool) -> Result<String> {
        self.inner.execute(command, use_unicode, is_ping).await
    }

    /// Send a command without the ban and session checks
    pub async fn execute_directly(
        &self,
        command: &str,
        use_unicode: bool,
        is_ping: bool,
    ) -> Result<String> {
        self.inner.execute_directly(command, use_unicode, is_ping).await
    }

    /// Log in with the stored credentials, at most two cycles
    pub async fn login(&self) -> bool {
        self.inner.login().await
    }

    /// Verify credentials by logging in and straight back out
    pub async fn test_login(&self, username: &str, password: &str) -> bool {
        self.inner.test_login(username, password).await
    }

    /// Drop the session, telling the server unless banned
    pub async fn force_logout(&self) {
        self.inner.force_logout().await;
    }

    /// Log out, close and re-initialize; each step runs even if an earlier one failed
    pub async fn force_reconnection(&self) {
        self.inner.force_reconnection().await;
    }

    /// Store new credentials
    ///
    /// Rejects empty values. Accepted credentials clear the invalid-session
    /// flag so the next command may log in again.
    pub fn set_credentials(&self, username: &str, password: &str) -> bool {
        self.inner.set_credentials(username, password)
    }

    /// Run one keepalive tick now
    pub async fn pulse(&self) {
        self.inner.pulse().await;
    }

    /// Record a server-requested pause; counts as banned until a tick clears it
    pub fn extend_ban_timer(&self, seconds: u64, reason: &str) {
        self.inner.extend_ban_timer(seconds, reason);
    }

    /// Mark the client banned, as when a reply carries a ban code
    pub fn mark_banned(&self) -> DateTime<Utc> {
        self.inner.mark_banned()
    }

    /// Clear ban and pause
    pub fn reset_ban_timer(&self) {
        self.inner.reset_ban_timer();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.inner.events.subscribe()
    }

    pub fn session_id(&self) -> Option<String> {
        self.inner.lock_state().session.clone()
    }

    pub fn is_logged_on(&self) -> bool {
        self.inner.lock_state().logged_on
    }

    pub fn is_invalid_session(&self) -> bool {
        self.inner.lock_state().invalid_session
    }

    pub fn is_banned(&self) -> bool {
        self.inner.lock_state().ban.is_banned()
    }

    pub fn is_network_available(&self) -> bool {
        self.inner.lock_state().network_available
    }

    pub fn is_alive(&self) -> bool {
        self.inner.lock_state().alive
    }

    /// Base URL for AniDB images on the CDN reported at login
    pub fn image_server_url(&self) -> String {
        self.inner.lock_state().image_server_url()
    }

    pub fn status(&self) -> ConnectionStatus {
        let has_transport = self.inner.current_transport().is_some();
        ConnectionStatus::capture(&self.inner.lock_state(), has_transport)
    }

    pub fn config(&self) -> &UdpConfig {
        &self.inner.config
    }
}

impl Inner {
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transport_slot(&self) -> MutexGuard<'_, Option<Arc<dyn SocketHandler>>> {
        self.transport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn current_transport(&self) -> Option<Arc<dyn SocketHandler>> {
        self.transport_slot().clone()
    }

    fn banned_error(&self) -> Option<Error> {
        let state = self.lock_state();
        state.ban.is_banned().then(|| Error::Banned {
            ban_type: state.ban.ban_type(),
            expires: state.ban.expires_at(),
        })
    }

    pub(crate) fn set_invalid_session(&self, invalid: bool) {
        let changed = {
            let mut state = self.lock_state();
            let changed = state.invalid_session != invalid;
            state.invalid_session = invalid;
            changed
        };
        if changed {
            self.events.emit(ConnectionEvent::InvalidSessionChanged(invalid));
        }
    }

    async fn init_internal(&self) -> Result<()> {
        let previous = self.transport_slot().take();
        if let Some(previous) = previous {
            previous.dispose().await;
        }

        let settings = self.settings.load();
        settings.validate_endpoint()?;
        let endpoint = Endpoint {
            server_address: settings.server_address,
            server_port: settings.server_port,
            client_port: settings.client_port,
            request_timeout: self.config.request_timeout(),
        };

        debug!(
            "Creating AniDB UDP transport for {}:{} (local port {})",
            endpoint.server_address, endpoint.server_port, endpoint.client_port
        );
        let transport = self.transport_factory.create(&endpoint);
        *self.transport_slot() = Some(Arc::clone(&transport));
        self.lock_state().log_out();

        let reachable = transport.try_connect().await;
        if !reachable {
            warn!("AniDB UDP server is not reachable");
        }
        self.lock_state().network_available = reachable;

        info!("Starting AniDB UDP ping timer...");
        self.start_pulse();
        self.lock_state().alive = true;
        Ok(())
    }

    async fn close_internal(&self) {
        {
            let mut state = self.lock_state();
            state.network_available = false;
            state.alive = false;
        }
        self.stop_pulse();

        let transport = self.transport_slot().take();
        if let Some(transport) = transport {
            info!("AniDB UDP socket disposing...");
            transport.dispose().await;
        }
    }

    pub(crate) async fn force_reconnection(&self) {
        self.force_logout().await;

        let _lifecycle = self.lifecycle.lock().await;
        self.close_internal().await;
        if let Err(e) = self.init_internal().await {
            error!("Failed to reinitialize AniDB UDP socket: {e}");
        }
    }

    pub(crate) async fn execute(
        &self,
        command: &str,
        use_unicode: bool,
        is_ping: bool,
    ) -> Result<String> {
        if self.current_transport().is_none() {
            return Err(Error::Disposed);
        }
        if let Some(banned) = self.banned_error() {
            return Err(banned);
        }
        // A forced re-login already failed; do not retry silently
        if self.lock_state().invalid_session {
            return Err(Error::NotLoggedIn);
        }

        if !self.login().await {
            return Err(self.banned_error().unwrap_or(Error::NotLoggedIn));
        }

        self.execute_directly(command, use_unicode, is_ping).await
    }

    pub(crate) async fn execute_directly(
        &self,
        command: &str,
        use_unicode: bool,
        is_ping: bool,
    ) -> Result<String> {
        let encoding = TextEncoding::for_request(use_unicode);
        let transport = self.current_transport().ok_or(Error::Disposed)?;

        self.rate_limiter.ensure_rate().await;

        trace!(
            "AniDB UDP call ({encoding}): {}",
            mask_credentials(command)
        );
        let payload = self.codec.encode(command, encoding)?;

        self.lock_state().stamp(is_ping);
        let reply = transport.send(&payload).await;
        self.lock_state().stamp(is_ping);
        let reply = reply?;

        // Banned and silently dropped look the same from here; assume banned
        if reply.iter().all(|byte| *byte == 0) {
            warn!("AniDB replied with only zero bytes, assuming the client is banned");
            let expires = self.mark_banned();
            return Err(Error::Banned {
                ban_type: BanType::Udp,
                expires,
            });
        }

        let decoded = match transport.reply_encoding() {
            Some(encoding) => self.codec.decode_with(&reply, encoding)?,
            None => self.codec.decode(&reply)?,
        };
        trace!("AniDB UDP reply: {}", mask_credentials(&decoded));
        Ok(decoded)
    }

    pub(crate) async fn force_logout(&self) {
        let session = {
            let mut state = self.lock_state();
            if !state.logged_on {
                return;
            }
            if state.ban.is_banned() {
                state.log_out();
                return;
            }
            state.session.clone()
        };

        trace!("Logging out of AniDB");
        if let Some(session) = session {
            let command = LogoutCommand::new(session).encode();
            if let Err(e) = self.execute_directly(&command, true, false).await {
                debug!("Ignoring logout failure: {e}");
            }
        }

        self.lock_state().log_out();
    }

    fn set_credentials(&self, username: &str, password: &str) -> bool {
        if username.is_empty() || password.is_empty() {
            return false;
        }

        let mut settings = self.settings.load();
        settings.username = username.to_string();
        settings.password = SecureString::new(password);
        if let Err(e) = self.settings.save(&settings) {
            error!("Failed to save AniDB credentials: {e}");
            return false;
        }

        self.set_invalid_session(false);
        true
    }

    pub(crate) fn mark_banned(&self) -> DateTime<Utc> {
        let expires = self.lock_state().ban.set_banned();
        warn!("AniDB UDP ban in effect until {expires}");
        self.events.emit(ConnectionEvent::Banned { expires });
        expires
    }

    fn extend_ban_timer(&self, seconds: u64, reason: &str) {
        let expires = self.lock_state().ban.extend(seconds, reason);
        info!("AniDB asked for a {seconds}s pause ({reason}); ban expires at {expires}");
        self.events.emit(ConnectionEvent::BanPaused {
            seconds,
            reason: reason.to_string(),
        });
    }

    pub(crate) fn reset_ban_timer(&self) {
        let cleared = self.lock_state().ban.reset();
        if cleared {
            info!("AniDB UDP ban cleared");
            self.events.emit(ConnectionEvent::BanCleared);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{AniDbSettings, MemorySettingsProvider};

    fn handler(settings: AniDbSettings) -> UdpConnectionHandler {
        UdpConnectionHandler::new(
            UdpConfig::test(),
            Arc::new(MemorySettingsProvider::new(settings)),
        )
    }

    #[tokio::test]
    async fn test_init_without_credentials() {
        let handler = handler(AniDbSettings::default());
        assert!(!handler.init().await.unwrap());
        assert!(!handler.is_alive());
        assert_eq!(handler.status().phase, ConnectionPhase::Disconnected);
    }

    #[tokio::test]
    async fn test_init_rejects_bad_endpoint() {
        let handler = handler(AniDbSettings {
            server_port: 0,
            ..AniDbSettings::with_credentials("user", "pass")
        });
        let err = handler.init().await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(!handler.is_alive());
    }

    #[tokio::test]
    async fn test_execute_before_init_is_disposed() {
        let handler = handler(AniDbSettings::with_credentials("user", "pass"));
        let err = handler.execute("PING", false, true).await.unwrap_err();
        assert!(matches!(err, Error::Disposed));
    }

    #[test]
    fn test_set_credentials_rejects_empty() {
        let handler = handler(AniDbSettings::default());
        assert!(!handler.set_credentials("", "pass"));
        assert!(!handler.set_credentials("user", ""));
        assert!(handler.set_credentials("user", "pass"));
    }

    #[test]
    fn test_default_image_server_url() {
        let handler = handler(AniDbSettings::default());
        assert_eq!(
            handler.image_server_url(),
            "https://cdn.anidb.net/images/main"
        );
    }

    #[test]
    fn test_ban_timer_events() {
        let handler = handler(AniDbSettings::default());
        let mut events = handler.subscribe();

        handler.extend_ban_timer(120, "too many requests");
        assert!(handler.is_banned());
        assert_eq!(
            events.try_recv().unwrap(),
            ConnectionEvent::BanPaused {
                seconds: 120,
                reason: "too many requests".to_string()
            }
        );

        handler.reset_ban_timer();
        assert!(!handler.is_banned());
        assert_eq!(events.try_recv().unwrap(), ConnectionEvent::BanCleared);
    }
}
