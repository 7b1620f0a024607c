//! Top-level session: the active transport, the bus monitor and the periodic
//! bus poll.
//!
//! Requests and polls both go through `&mut Session`; when the session sits
//! behind a `tokio::sync::Mutex` (see [`spawn_bus_poller`]) a request always
//! finishes before the next poll or request starts, and swapping the
//! transport cannot race with either.

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::Mutex as TokioMutex;
use tokio::task::JoinHandle;

use crate::error::MonitorError;
use crate::executor::{execute, ExecOptions, ExecOutcome};
use crate::monitor::SharedBusMonitor;
use crate::request::Request;
use crate::transport::Transport;

pub struct Session {
    transport: Option<Box<dyn Transport>>,
    monitor: SharedBusMonitor,
    pub options: ExecOptions,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::with_monitor(SharedBusMonitor::new())
    }

    #[must_use]
    pub fn with_monitor(monitor: SharedBusMonitor) -> Self {
        Self {
            transport: None,
            monitor,
            options: ExecOptions::default(),
        }
    }

    #[must_use]
    pub const fn with_hex_display(mut self, hex_display: bool) -> Self {
        self.options.hex_display = hex_display;
        self
    }

    #[must_use]
    pub const fn monitor(&self) -> &SharedBusMonitor {
        &self.monitor
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.transport.is_some()
    }

    #[must_use]
    pub fn transport_name(&self) -> Option<&str> {
        self.transport.as_deref().map(|t| t.name())
    }

    /// Make `transport` the active link. The monitor is attached before the
    /// transport becomes reachable; the previous transport is detached and dropped.
    pub fn activate(&mut self, mut transport: Box<dyn Transport>) {
        transport.attach_monitor(self.monitor.sink());
        log::info!("transport {} active", transport.name());
        if let Some(mut old) = self.transport.replace(transport) {
            old.detach_monitor();
            log::info!("transport {} replaced", old.name());
        }
    }

    /// Drop the active transport, if any.
    pub fn deactivate(&mut self) {
        if let Some(mut old) = self.transport.take() {
            old.detach_monitor();
            log::info!("transport {} inactive", old.name());
        }
    }

    /// Header preview of `request`; needs no transport.
    #[must_use]
    pub fn preview(&self, request: &Request) -> Vec<u8> {
        request.preview()
    }

    /// Validate and execute `request` on the active transport.
    pub fn send(&mut self, request: &Request) -> Result<ExecOutcome, MonitorError> {
        request.validate()?;
        let options = self.options;
        let transport = self.transport.as_deref_mut().ok_or(MonitorError::NoTransport)?;
        Ok(execute(transport, request, options)?)
    }

    /// One non-blocking poll of the active transport. Failures are logged and
    /// dropped; polling never changes the session state.
    pub fn poll(&mut self) {
        if let Some(transport) = self.transport.as_deref_mut() {
            if let Err(e) = transport.poll() {
                log::trace!("[{}] poll: {}", transport.name(), e);
            }
        }
    }
}

/// Shortest period the bus poller runs at; a zero period is raised to this.
pub const MIN_POLL_PERIOD: Duration = Duration::from_millis(1);

/// Poll the session's transport every `period` so frames driven by other bus
/// participants reach the monitor. The task ends once the session is dropped.
pub fn spawn_bus_poller(session: Weak<TokioMutex<Session>>, period: Duration) -> JoinHandle<()> {
    // tokio intervals reject a zero period
    let period = period.max(MIN_POLL_PERIOD);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(session) = session.upgrade() else {
                log::debug!("session dropped, bus poller exiting");
                break;
            };
            session.lock().await.poll();
        }
    })
}
