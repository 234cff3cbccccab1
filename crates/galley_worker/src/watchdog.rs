//! Timeout Watchdog
//!
//! Single-shot deadline: `Armed -> Fired | Disarmed`. Armed as soon as the
//! worker starts. Once fired or disarmed it never changes again.

use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep_until, Instant, Sleep};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    Armed,
    Fired,
    Disarmed,
}

#[derive(Debug)]
pub struct Watchdog {
    timeout: Duration,
    deadline: Instant,
    sleep: Pin<Box<Sleep>>,
    state: WatchdogState,
}

impl Watchdog {
    pub fn arm(timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        debug!(timeout_ms = timeout.as_millis() as u64, "Watchdog armed");
        Self {
            timeout,
            deadline,
            sleep: Box::pin(sleep_until(deadline)),
            state: WatchdogState::Armed,
        }
    }

    pub fn state(&self) -> WatchdogState {
        self.state
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Resolves once the deadline passes while armed. Never resolves for a
    /// disarmed watchdog, so it can sit in a `select!` unconditionally.
    pub async fn expired(&mut self) {
        match self.state {
            WatchdogState::Armed => {
                self.sleep.as_mut().await;
                self.state = WatchdogState::Fired;
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Watchdog fired"
                );
            }
            WatchdogState::Fired => {}
            WatchdogState::Disarmed => std::future::pending::<()>().await,
        }
    }

    /// Stand down. No effect once fired.
    pub fn disarm(&mut self) {
        if self.state == WatchdogState::Armed {
            self.state = WatchdogState::Disarmed;
            debug!("Watchdog disarmed");
        }
    }
}
