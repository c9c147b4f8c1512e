//! Periodic host registration.
//!
//! The [`Registrar`] owns the only store connection and drives the
//! sample-then-upsert cycle until it is cancelled. Its lifecycle is the
//! [`LoopState`] machine; every change of state goes through [`transition`]:
//!
//! ```text
//! Disconnected --Connected--------> Connected --CycleSucceeded--> Connected (sleep interval)
//! Disconnected --ConnectFailed----> Terminated (fatal)
//! Connected    --TransportFailed--> Reconnecting
//! Connected    --UnexpectedFailed-> Connected (sleep unexpected_delay)
//! Reconnecting --Connected--------> Connected (no sleep)
//! Reconnecting --ConnectFailed----> Reconnecting (sleep backoff)
//! any          --Cancelled--------> Terminated
//! ```

use crate::config::RegistrationConfig;
use crate::snapshot::{HostProbe, SnapshotBuilder};
use crate::store::{Connector, Store, StoreError};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Where the loop is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Disconnected,
    Connected,
    Reconnecting,
    Terminated,
}

/// Outcome of one step of work, fed into [`transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEvent {
    Connected,
    ConnectFailed,
    CycleSucceeded,
    TransportFailed,
    UnexpectedFailed,
    Cancelled,
}

/// What the loop does after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Proceed immediately.
    Continue,
    /// Sleep before the next step.
    Pause(Duration),
    /// Stop with a startup failure.
    Abort,
    /// Stop cleanly.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub next: LoopState,
    pub directive: Directive,
}

/// Loop pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationPolicy {
    /// Pause after a successful cycle.
    pub interval: Duration,
    /// Pause between failed reconnect attempts.
    pub reconnect_backoff: Duration,
    /// Pause after an unclassified failure.
    pub unexpected_delay: Duration,
}

/// Pause after an unclassified cycle failure.
pub const UNEXPECTED_ERROR_DELAY: Duration = Duration::from_secs(1);

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self::from_config(&RegistrationConfig::default())
    }
}

impl RegistrationPolicy {
    pub fn from_config(cfg: &RegistrationConfig) -> Self {
        Self {
            interval: cfg.interval(),
            reconnect_backoff: cfg.reconnect_backoff(),
            unexpected_delay: UNEXPECTED_ERROR_DELAY,
        }
    }
}

/// Computes the next state and what to do before acting in it.
pub fn transition(state: LoopState, event: LoopEvent, policy: &RegistrationPolicy) -> Step {
    use Directive::*;
    use LoopState::*;

    let (next, directive) = match (state, event) {
        (Terminated, _) | (_, LoopEvent::Cancelled) => (Terminated, Stop),
        (Disconnected, LoopEvent::Connected) => (Connected, Continue),
        (Disconnected, LoopEvent::ConnectFailed) => (Terminated, Abort),
        (Connected, LoopEvent::CycleSucceeded) => (Connected, Pause(policy.interval)),
        (Connected, LoopEvent::TransportFailed) => (Reconnecting, Continue),
        (Connected, LoopEvent::UnexpectedFailed) => (Connected, Pause(policy.unexpected_delay)),
        (Reconnecting, LoopEvent::Connected) => (Connected, Continue),
        (Reconnecting, LoopEvent::ConnectFailed) => (Reconnecting, Pause(policy.reconnect_backoff)),
        (state, event) => {
            warn!("Ignoring {:?} while {:?}", event, state);
            (state, Continue)
        }
    };
    Step { next, directive }
}

/// Counters kept over the lifetime of a loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationStats {
    pub successful_cycles: u64,
    pub transport_failures: u64,
    pub unexpected_failures: u64,
    pub reconnect_attempts: u64,
    pub reconnects: u64,
    /// Number of "successfully registered" notices emitted.
    pub announcements: u64,
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Initial connection to the store failed: {0}")]
    Startup(#[source] StoreError),
}

/// Owns the connection and drives registration cycles.
pub struct Registrar<C: Connector, P> {
    connector: C,
    builder: SnapshotBuilder<P>,
    policy: RegistrationPolicy,
    state: LoopState,
    conn: Option<C::Conn>,
    /// Whether the current connection has logged its registration notice.
    announced: bool,
    stats: RegistrationStats,
}

impl<C, P> Registrar<C, P>
where
    C: Connector,
    P: HostProbe,
{
    pub fn new(connector: C, builder: SnapshotBuilder<P>, policy: RegistrationPolicy) -> Self {
        Self {
            connector,
            builder,
            policy,
            state: LoopState::Disconnected,
            conn: None,
            announced: false,
            stats: RegistrationStats::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> RegistrationStats {
        self.stats
    }

    /// Runs until `shutdown` resolves or the initial connection fails.
    ///
    /// Cancellation closes the connection and returns the final counters.
    #[instrument(skip_all, fields(ip = %self.builder.identity().ip))]
    pub async fn run<F>(mut self, shutdown: F) -> Result<RegistrationStats, RegistrationError>
    where
        F: Future<Output = ()>,
    {
        info!(
            "Starting registration every {:?} (reconnect backoff {:?})",
            self.policy.interval, self.policy.reconnect_backoff
        );

        tokio::pin!(shutdown);
        let outcome = tokio::select! {
            biased;
            _ = &mut shutdown => None,
            result = self.drive() => Some(result),
        };

        match outcome {
            Some(Err(e)) => {
                error!("{}", e);
                Err(e)
            }
            Some(Ok(())) | None => {
                self.terminate().await;
                Ok(self.stats)
            }
        }
    }

    async fn drive(&mut self) -> Result<(), RegistrationError> {
        loop {
            let step = match self.state {
                LoopState::Disconnected | LoopState::Reconnecting => {
                    let startup = self.state == LoopState::Disconnected;
                    match self.connect().await {
                        Ok(()) => {
                            let step = self.apply(LoopEvent::Connected);
                            if startup {
                                self.builder.prime().await;
                            }
                            step
                        }
                        Err(e) => {
                            let step = self.apply(LoopEvent::ConnectFailed);
                            if step.directive == Directive::Abort {
                                return Err(RegistrationError::Startup(e));
                            }
                            warn!(
                                "Reconnect failed, retrying in {:?}: {}",
                                self.policy.reconnect_backoff, e
                            );
                            step
                        }
                    }
                }
                LoopState::Connected => {
                    let event = self.cycle().await;
                    self.apply(event)
                }
                LoopState::Terminated => return Ok(()),
            };

            match step.directive {
                Directive::Pause(delay) => tokio::time::sleep(delay).await,
                Directive::Stop => return Ok(()),
                Directive::Continue | Directive::Abort => {}
            }
        }
    }

    async fn connect(&mut self) -> Result<(), StoreError> {
        if self.state == LoopState::Reconnecting {
            self.stats.reconnect_attempts += 1;
        }
        let conn = self.connector.connect().await?;
        self.conn = Some(conn);
        self.announced = false;
        Ok(())
    }

    /// Builds one snapshot and upserts it.
    async fn cycle(&mut self) -> LoopEvent {
        let snapshot = self.builder.build().await;
        debug!(?snapshot, "Built snapshot");

        let Some(conn) = self.conn.as_mut() else {
            return LoopEvent::TransportFailed;
        };

        match conn.upsert(&snapshot).await {
            Ok(()) => {
                self.stats.successful_cycles += 1;
                if !self.announced {
                    info!(
                        "Successfully registered {} ({}) with the store",
                        snapshot.ip, snapshot.hostname
                    );
                    self.announced = true;
                    self.stats.announcements += 1;
                }
                LoopEvent::CycleSucceeded
            }
            Err(e) if e.is_transport() => {
                warn!("Lost store connection, reconnecting: {}", e);
                self.stats.transport_failures += 1;
                // A failed connection is never reused.
                self.conn = None;
                LoopEvent::TransportFailed
            }
            Err(e) => {
                error!("Registration cycle failed: {}", e);
                self.stats.unexpected_failures += 1;
                LoopEvent::UnexpectedFailed
            }
        }
    }

    fn apply(&mut self, event: LoopEvent) -> Step {
        let step = transition(self.state, event, &self.policy);
        if step.next != self.state {
            debug!("Registration state {:?} -> {:?} on {:?}", self.state, step.next, event);
        }
        if self.state == LoopState::Reconnecting && step.next == LoopState::Connected {
            self.stats.reconnects += 1;
            info!("Reconnected to the store");
        }
        self.state = step.next;
        step
    }

    async fn terminate(&mut self) {
        self.apply(LoopEvent::Cancelled);
        if let Some(conn) = self.conn.take() {
            conn.close().await;
        }
        info!(
            cycles = self.stats.successful_cycles,
            transport_failures = self.stats.transport_failures,
            unexpected_failures = self.stats.unexpected_failures,
            reconnects = self.stats.reconnects,
            "Registration stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RegistrationPolicy {
        RegistrationPolicy::default()
    }

    #[test]
    fn test_startup_connect() {
        let step = transition(LoopState::Disconnected, LoopEvent::Connected, &policy());
        assert_eq!(step.next, LoopState::Connected);
        assert_eq!(step.directive, Directive::Continue);
    }

    #[test]
    fn test_startup_failure_is_fatal() {
        let step = transition(LoopState::Disconnected, LoopEvent::ConnectFailed, &policy());
        assert_eq!(step.next, LoopState::Terminated);
        assert_eq!(step.directive, Directive::Abort);
    }

    #[test]
    fn test_success_sleeps_interval() {
        let step = transition(LoopState::Connected, LoopEvent::CycleSucceeded, &policy());
        assert_eq!(step.next, LoopState::Connected);
        assert_eq!(step.directive, Directive::Pause(Duration::from_secs(1)));
    }

    #[test]
    fn test_transport_failure_reconnects_immediately() {
        let step = transition(LoopState::Connected, LoopEvent::TransportFailed, &policy());
        assert_eq!(step.next, LoopState::Reconnecting);
        assert_eq!(step.directive, Directive::Continue);
    }

    #[test]
    fn test_unexpected_failure_keeps_connection() {
        let step = transition(LoopState::Connected, LoopEvent::UnexpectedFailed, &policy());
        assert_eq!(step.next, LoopState::Connected);
        assert_eq!(step.directive, Directive::Pause(Duration::from_secs(1)));
    }

    #[test]
    fn test_reconnect_success_does_not_sleep() {
        let step = transition(LoopState::Reconnecting, LoopEvent::Connected, &policy());
        assert_eq!(step.next, LoopState::Connected);
        assert_eq!(step.directive, Directive::Continue);
    }

    #[test]
    fn test_reconnect_failure_backs_off_and_never_escalates() {
        let mut state = LoopState::Reconnecting;
        for _ in 0..100 {
            let step = transition(state, LoopEvent::ConnectFailed, &policy());
            assert_eq!(step.next, LoopState::Reconnecting);
            assert_eq!(step.directive, Directive::Pause(Duration::from_secs(5)));
            state = step.next;
        }
    }

    #[test]
    fn test_cancel_from_any_state() {
        for state in [
            LoopState::Disconnected,
            LoopState::Connected,
            LoopState::Reconnecting,
            LoopState::Terminated,
        ] {
            let step = transition(state, LoopEvent::Cancelled, &policy());
            assert_eq!(step.next, LoopState::Terminated);
            assert_eq!(step.directive, Directive::Stop);
        }
    }

    #[test]
    fn test_terminated_is_absorbing() {
        let step = transition(LoopState::Terminated, LoopEvent::Connected, &policy());
        assert_eq!(step.next, LoopState::Terminated);
    }

    #[test]
    fn test_custom_policy() {
        let custom = RegistrationPolicy {
            interval: Duration::from_secs(10),
            reconnect_backoff: Duration::from_secs(30),
            unexpected_delay: Duration::from_millis(250),
        };
        assert_eq!(
            transition(LoopState::Reconnecting, LoopEvent::ConnectFailed, &custom).directive,
            Directive::Pause(Duration::from_secs(30))
        );
    }
}
