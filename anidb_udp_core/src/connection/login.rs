//! Login with encoding and reconnection fallbacks
//!
//! One login cycle walks a short, fixed plan of AUTH attempts:
//!
//! 1. `Standard`: ASCII request.
//! 2. `UnicodeAfterUnexpectedReply`: the server answered in an encoding we
//!    did not ask for, which happens after an unclean shutdown left the old
//!    session's encoding in place. Retry asking for UTF-16.
//! 3. `UnicodeAfterReconnect`: the first attempt timed out. Rebuild the
//!    transport, then retry asking for UTF-16.
//!
//! Only one of the two fallbacks can follow the standard attempt, so a cycle
//! sends at most [`MAX_LOGIN_ATTEMPTS`] AUTH commands. `login()` runs at most
//! two cycles.

use super::Inner;
use crate::error::{Error, Result};
use crate::events::ConnectionEvent;
use crate::protocol::error::ResponseCode;
use crate::protocol::messages::{AniDBCommand, AuthCommand, AuthResponse};
use log::{debug, error, trace};

/// Upper bound on AUTH sends in one login cycle
pub const MAX_LOGIN_ATTEMPTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginStep {
    Standard,
    UnicodeAfterUnexpectedReply,
    UnicodeAfterReconnect,
}

impl LoginStep {
    fn use_unicode(self) -> bool {
        !matches!(self, LoginStep::Standard)
    }

    /// Step to take after `error`, if any
    fn after(self, error: &Error) -> Option<LoginStep> {
        match (self, error) {
            (LoginStep::Standard, Error::Protocol(e)) if e.is_unexpected_response() => {
                Some(LoginStep::UnicodeAfterUnexpectedReply)
            }
            (LoginStep::Standard, Error::Protocol(e)) if e.is_timeout() => {
                Some(LoginStep::UnicodeAfterReconnect)
            }
            _ => None,
        }
    }
}

/// How one login cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginOutcome {
    Accepted,
    /// Empty credentials or LOGIN FAILED; worth telling the user
    Rejected,
    /// An all-zero reply marked the client banned
    Banned,
    /// Transport failure or an unexpected reply code
    Failed,
}

impl Inner {
    /// Log in with the stored credentials
    ///
    /// A failed cycle is followed by a logout and exactly one more cycle,
    /// unless the first one ended in a ban.
    pub(crate) async fn login(&self) -> bool {
        let settings = self.settings.load();
        let password = settings.password.expose_secret();

        let first = self.login_cycle(&settings.username, &password).await;
        if first == LoginOutcome::Accepted {
            return true;
        }
        if first == LoginOutcome::Banned || self.lock_state().ban.is_banned() {
            debug!("AniDB login stopped, client is banned");
            return false;
        }

        trace!("Failed to login to AniDB. Issuing a logout and retrying");
        self.force_logout().await;
        let second = self.login_cycle(&settings.username, &password).await;
        if second == LoginOutcome::Accepted {
            return true;
        }

        if first == LoginOutcome::Rejected || second == LoginOutcome::Rejected {
            self.events.emit(ConnectionEvent::LoginFailed);
        }
        false
    }

    pub(crate) async fn test_login(&self, username: &str, password: &str) -> bool {
        if username.is_empty() || password.is_empty() {
            return false;
        }

        match self.login_cycle(username, password).await {
            LoginOutcome::Accepted => {
                self.force_logout().await;
                true
            }
            LoginOutcome::Rejected => {
                self.events.emit(ConnectionEvent::LoginFailed);
                false
            }
            LoginOutcome::Banned | LoginOutcome::Failed => false,
        }
    }

    async fn login_cycle(&self, username: &str, password: &str) -> LoginOutcome {
        if username.is_empty() || password.is_empty() {
            debug!("AniDB credentials are empty, not logging in");
            return LoginOutcome::Rejected;
        }

        let _login = self.login_lock.lock().await;
        if self.lock_state().logged_on {
            return LoginOutcome::Accepted;
        }

        trace!("Logging in to AniDB");
        let reply = self.login_with_fallbacks(username, password).await;
        self.apply_login_reply(reply)
    }

    async fn login_with_fallbacks(&self, username: &str, password: &str) -> Result<AuthResponse> {
        let mut step = LoginStep::Standard;
        let mut last_error = Error::NotLoggedIn;

        for _ in 0..MAX_LOGIN_ATTEMPTS {
            if step == LoginStep::UnicodeAfterReconnect {
                self.force_reconnection().await;
            }

            match self.send_auth(username, password, step.use_unicode()).await {
                Ok(reply) => return Ok(reply),
                Err(e) => match step.after(&e) {
                    Some(next) => {
                        trace!("AniDB login attempt failed ({e}), retrying as {next:?}");
                        step = next;
                        last_error = e;
                    }
                    None => {
                        error!("Unable to login to AniDB: {e}");
                        return Err(e);
                    }
                },
            }
        }

        Err(last_error)
    }

    async fn send_auth(
        &self,
        username: &str,
        password: &str,
        use_unicode: bool,
    ) -> Result<AuthResponse> {
        let command = AuthCommand::new(
            username,
            password,
            self.config.client_name.as_str(),
            self.config.client_version.as_str(),
        )
        .with_unicode(use_unicode);

        let reply = self
            .execute_directly(&command.encode(), use_unicode, false)
            .await?;
        Ok(AuthResponse::parse(&reply)?)
    }

    fn apply_login_reply(&self, reply: Result<AuthResponse>) -> LoginOutcome {
        match reply {
            Ok(AuthResponse {
                code,
                session: Some(session),
                image_server,
                ..
            }) if code.is_login_accepted() => {
                debug!("Logged in to AniDB ({code})");
                self.record_login(Some((session, image_server)));
                LoginOutcome::Accepted
            }
            // A ban is not a verdict on the credentials
            Err(Error::Banned { .. }) => LoginOutcome::Banned,
            Ok(AuthResponse { code, .. }) if code == ResponseCode::LOGIN_FAILED => {
                error!("AniDB login failed: invalid credentials");
                self.record_login(None);
                LoginOutcome::Rejected
            }
            Ok(AuthResponse { code, .. }) => {
                error!("AniDB login failed: {code}");
                self.record_login(None);
                LoginOutcome::Failed
            }
            Err(_) => {
                self.record_login(None);
                LoginOutcome::Failed
            }
        }
    }

    /// Apply a login result to session and invalid-session flag in one step
    fn record_login(&self, login: Option<(String, Option<String>)>) {
        let invalid = login.is_none();
        let changed = {
            let mut state = self.lock_state();
            let changed = state.invalid_session != invalid;
            match login {
                Some((session, image_server)) => state.log_in(session, image_server),
                None => state.log_out(),
            }
            state.invalid_session = invalid;
            changed
        };
        if changed {
            self.events.emit(ConnectionEvent::InvalidSessionChanged(invalid));
        }
    }
}
