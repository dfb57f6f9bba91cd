use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};
use uplink_logging::targets::T_LINK;

use crate::cancel::{cancel_sleep, is_cancelled, CancelFlag};
use crate::error::{ErrorKind, LinkError, Result};
use crate::monitor::InterfaceMonitor;
use crate::ops::LinkOps;

/// Delay between two ticks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickError {
    pub interface: String,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Interface that held the slot at the end of the tick.
    pub active: Option<String>,
    pub errors: Vec<TickError>,
}

/// Owns the monitors in priority order and hands the single slot to the first
/// active one on every tick.
#[derive(Debug)]
pub struct Arbiter {
    monitors: Vec<InterfaceMonitor>,
    poll_interval: Duration,
}

impl Arbiter {
    pub fn new<I, S>(names: I, ops: Arc<dyn LinkOps>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut monitors = Vec::new();
        for name in names {
            let name = name.into();
            if !seen.insert(name.clone()) {
                return Err(LinkError::DuplicateInterface { name });
            }
            monitors.push(InterfaceMonitor::new(name, Arc::clone(&ops)));
        }

        if monitors.is_empty() {
            return Err(LinkError::NoInterfaces);
        }

        Ok(Self {
            monitors,
            poll_interval: POLL_INTERVAL,
        })
    }

    pub fn monitors(&self) -> &[InterfaceMonitor] {
        &self.monitors
    }

    pub fn interface_names(&self) -> Vec<String> {
        self.monitors.iter().map(|m| m.name().to_string()).collect()
    }

    /// One evaluation pass over every monitor, highest priority first.
    ///
    /// Errors are scoped to the monitor that raised them: they end that
    /// monitor's turn and are recorded, the rest of the list still runs.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        let mut slot_available = true;

        for monitor in self.monitors.iter_mut() {
            let step = if slot_available {
                claim_or_release(monitor)
            } else {
                monitor.bring_down().map(|_| false)
            };

            match step {
                Ok(true) => {
                    slot_available = false;
                    report.active = Some(monitor.name().to_string());
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(target: T_LINK, "{}: {}", monitor.name(), err);
                    // A client that survived the failed turn keeps the slot.
                    if slot_available && holds_live_client(monitor) {
                        slot_available = false;
                        report.active = Some(monitor.name().to_string());
                    }
                    report.errors.push(TickError {
                        interface: monitor.name().to_string(),
                        kind: err.kind(),
                        message: err.to_string(),
                    });
                }
            }
        }

        report
    }

    /// Tick until `cancel` is raised, then stop every client.
    pub fn run(&mut self, cancel: &CancelFlag) {
        self.run_with(cancel, |_| {});
    }

    /// Like [`Arbiter::run`], but hands every tick report to `observe`.
    pub fn run_with<F>(&mut self, cancel: &CancelFlag, mut observe: F)
    where
        F: FnMut(&TickReport),
    {
        info!(
            target: T_LINK,
            "Arbitrating {} interface(s): {}",
            self.monitors.len(),
            self.interface_names().join(", ")
        );

        let mut last: Option<TickReport> = None;
        let mut ticks: u64 = 0;
        while !is_cancelled(cancel) {
            let report = self.tick();
            ticks += 1;
            log_transition(last.as_ref(), &report);
            observe(&report);
            last = Some(report);

            if !cancel_sleep(cancel, self.poll_interval) {
                break;
            }
        }

        debug!(target: T_LINK, "Arbiter stopping after {} ticks", ticks);
        self.shutdown();
    }

    /// Terminate every running client. Failures are logged and skipped.
    pub fn shutdown(&mut self) {
        for monitor in self.monitors.iter_mut() {
            if let Err(err) = monitor.shutdown() {
                warn!(target: T_LINK, "{}: shutdown failed: {}", monitor.name(), err);
            }
        }
    }
}

/// Returns whether `monitor` took the slot.
fn claim_or_release(monitor: &mut InterfaceMonitor) -> Result<bool> {
    if monitor.is_active()? {
        monitor.bring_up()?;
        Ok(true)
    } else {
        monitor.bring_down()?;
        Ok(false)
    }
}

/// Unknown client state counts as live so a second client is never started.
fn holds_live_client(monitor: &mut InterfaceMonitor) -> bool {
    monitor.client_alive().unwrap_or_else(|err| {
        warn!(target: T_LINK, "{}: {}", monitor.name(), err);
        true
    })
}

fn log_transition(previous: Option<&TickReport>, current: &TickReport) {
    let previous_active = previous.and_then(|r| r.active.as_deref());
    if previous.is_some() && previous_active == current.active.as_deref() {
        return;
    }
    match current.active.as_deref() {
        Some(iface) => info!(target: T_LINK, "Active interface: {}", iface),
        None => info!(target: T_LINK, "No active interface"),
    }
}
