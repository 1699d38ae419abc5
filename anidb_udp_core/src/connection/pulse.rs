//! Keepalive timer
//!
//! Every pulse interval the timer task runs one tick: lift a ban whose pause
//! window has passed, PING an idle session, and drop a session that has seen
//! no real traffic for the force-logout period. Ticks are awaited inline, so
//! one timer never overlaps itself; `pulse_running` additionally keeps a
//! manual `pulse()` from overlapping the timer.

use super::Inner;
use super::state::idle_since;
use crate::protocol::messages::{AniDBCommand, PingCommand};
use futures::FutureExt;
use log::{debug, error, trace, warn};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::{MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// Stops the timer task when signalled or dropped
pub(crate) struct PulseHandle {
    stop: oneshot::Sender<()>,
}

impl Inner {
    fn pulse_slot(&self) -> MutexGuard<'_, Option<PulseHandle>> {
        self.pulse.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a fresh timer, stopping any previous one
    pub(crate) fn start_pulse(&self) {
        let weak = self.this.clone();
        let period = self.config.pulse_interval();
        let (stop, mut stopped) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {
                        let Some(inner) = weak.upgrade() else { break };
                        inner.pulse().await;
                    }
                }
            }
            trace!("AniDB UDP pulse timer stopped");
        });

        let previous = self.pulse_slot().replace(PulseHandle { stop });
        if let Some(previous) = previous {
            let _ = previous.stop.send(());
        }
    }

    /// Signal the timer to stop; a tick already running finishes
    pub(crate) fn stop_pulse(&self) {
        let handle = self.pulse_slot().take();
        if let Some(handle) = handle {
            let _ = handle.stop.send(());
        }
    }

    pub(crate) async fn pulse(&self) {
        if self.pulse_running.swap(true, Ordering::AcqRel) {
            trace!("Previous AniDB UDP pulse still running, skipping");
            return;
        }

        let outcome = AssertUnwindSafe(self.pulse_tick()).catch_unwind().await;
        self.pulse_running.store(false, Ordering::Release);

        if let Err(panic) = outcome {
            error!("AniDB UDP pulse failed: {}", panic_message(panic.as_ref()));
        }
    }

    async fn pulse_tick(&self) {
        let (lift_ban, logged_on) = {
            let state = self.lock_state();
            let idle = idle_since(state.last_message(), Instant::now());
            (
                state.ban.pause_elapsed(idle) || state.ban.has_lapsed(),
                state.logged_on,
            )
        };
        if lift_ban {
            self.reset_ban_timer();
        }

        if !logged_on {
            return;
        }

        // Don't ping while AniDB is taking a long time to respond
        let Some(transport) = self.current_transport() else {
            return;
        };
        if transport.is_locked() {
            trace!("AniDB UDP transport busy, skipping pulse");
            return;
        }

        let (ping_due, logout_due) = {
            let state = self.lock_state();
            let now = Instant::now();
            let frequency = self.config.ping_frequency();
            let ping_due = idle_since(state.last_message(), now) >= frequency
                && idle_since(state.last_ping, now) >= frequency
                && !state.ban.is_banned()
                && state.ban.pause().is_none();
            let logout_due =
                idle_since(state.last_non_ping, now) > self.config.force_logout_period();
            (ping_due, logout_due)
        };

        if ping_due {
            trace!("Sending AniDB keepalive ping");
            if let Err(e) = self.execute(&PingCommand::new().encode(), false, true).await {
                warn!("AniDB keepalive ping failed: {e}");
            }
        }

        if logout_due {
            debug!(
                "No AniDB commands for {:?}, logging out",
                self.config.force_logout_period()
            );
            self.force_logout().await;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
