//! Per-interface state machine.
//!
//! An [`InterfaceMonitor`] owns at most one configuration client for its
//! interface. The arbiter drives it with `bring_up` / `bring_down`; both are
//! idempotent so they can be issued on every tick.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uplink_logging::targets::{T_DHCP, T_LINK};

use crate::error::Result;
use crate::ops::{ClientExit, ClientProcess, LinkOps, FLUSH_ORDER};
use crate::status::parse_link_report;

pub enum ClientState {
    Idle,
    Running(Box<dyn ClientProcess>),
}

impl fmt::Debug for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientState::Idle => f.write_str("Idle"),
            ClientState::Running(client) => write!(f, "Running(pid {})", client.pid()),
        }
    }
}

/// Result of polling the client handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPoll {
    Idle,
    Running { pid: u32 },
    /// The client exited on its own; the handle has been cleared.
    Exited { pid: u32, exit: ClientExit },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpOutcome {
    AlreadyRunning { pid: u32 },
    Launched { pid: u32, flushed: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownOutcome {
    /// A live client was terminated.
    Stopped { pid: u32, flushed: usize },
    /// The client had already exited on its own.
    Reaped { pid: u32, flushed: usize },
    Idle { flushed: usize },
}

pub struct InterfaceMonitor {
    name: String,
    last_ssid: String,
    client: ClientState,
    ops: Arc<dyn LinkOps>,
}

impl fmt::Debug for InterfaceMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceMonitor")
            .field("name", &self.name)
            .field("last_ssid", &self.last_ssid)
            .field("client", &self.client)
            .finish()
    }
}

impl InterfaceMonitor {
    pub fn new(name: impl Into<String>, ops: Arc<dyn LinkOps>) -> Self {
        Self {
            name: name.into(),
            last_ssid: String::new(),
            client: ClientState::Idle,
            ops,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last wireless identity seen; empty until one is reported.
    pub fn last_ssid(&self) -> &str {
        &self.last_ssid
    }

    pub fn client_state(&self) -> &ClientState {
        &self.client
    }

    /// Pid of the client handle, without checking whether it is still alive.
    pub fn client_pid(&self) -> Option<u32> {
        match &self.client {
            ClientState::Idle => None,
            ClientState::Running(client) => Some(client.pid()),
        }
    }

    /// Whether the link is usable right now.
    ///
    /// A change of wireless identity reads as inactive for this call so that a
    /// roam goes through a full down/up cycle.
    #[tracing::instrument(target = "link", level = "trace", skip(self), fields(iface = %self.name))]
    pub fn is_active(&mut self) -> Result<bool> {
        let text = self.ops.link_status(&self.name)?;
        let report = parse_link_report(&text);

        if let Some(ssid) = report.ssid {
            if ssid != self.last_ssid {
                info!(
                    target: T_LINK,
                    "{}: ssid changed '{}' -> '{}', treating link as down",
                    self.name,
                    self.last_ssid,
                    ssid
                );
                self.last_ssid = ssid;
                return Ok(false);
            }
        }

        Ok(report.up)
    }

    /// Check the client handle, clearing it if the process has exited.
    pub fn poll_client(&mut self) -> Result<ClientPoll> {
        let ClientState::Running(client) = &mut self.client else {
            return Ok(ClientPoll::Idle);
        };

        let pid = client.pid();
        match client.try_wait()? {
            None => Ok(ClientPoll::Running { pid }),
            Some(exit) => {
                warn!(
                    target: T_DHCP,
                    "{}: configuration client {} exited on its own ({})",
                    self.name,
                    pid,
                    exit
                );
                self.client = ClientState::Idle;
                Ok(ClientPoll::Exited { pid, exit })
            }
        }
    }

    pub fn client_alive(&mut self) -> Result<bool> {
        Ok(matches!(self.poll_client()?, ClientPoll::Running { .. }))
    }

    /// Make sure a configuration client is running on this interface.
    pub fn bring_up(&mut self) -> Result<UpOutcome> {
        if let ClientPoll::Running { pid } = self.poll_client()? {
            return Ok(UpOutcome::AlreadyRunning { pid });
        }

        let flushed = self.flush_addresses()?;
        let client = self.ops.spawn_client(&self.name)?;
        let pid = client.pid();
        self.client = ClientState::Running(client);

        info!(
            target: T_DHCP,
            "{}: configuration client started (pid {}, {} stale addresses removed)",
            self.name,
            pid,
            flushed
        );
        Ok(UpOutcome::Launched { pid, flushed })
    }

    /// Make sure no client runs and no address is left on this interface.
    pub fn bring_down(&mut self) -> Result<DownOutcome> {
        let previous = match self.poll_client()? {
            ClientPoll::Running { pid } => {
                self.stop_client()?;
                Some((pid, true))
            }
            ClientPoll::Exited { pid, .. } => Some((pid, false)),
            ClientPoll::Idle => None,
        };

        let flushed = self.flush_addresses()?;
        let outcome = match previous {
            Some((pid, true)) => DownOutcome::Stopped { pid, flushed },
            Some((pid, false)) => DownOutcome::Reaped { pid, flushed },
            None => DownOutcome::Idle { flushed },
        };

        match outcome {
            DownOutcome::Idle { flushed: 0 } => {}
            _ => info!(target: T_LINK, "{}: brought down ({:?})", self.name, outcome),
        }
        Ok(outcome)
    }

    /// Remove every configured address, IPv6 first.
    pub fn flush_addresses(&self) -> Result<usize> {
        let mut removed = 0;
        for family in FLUSH_ORDER {
            let addresses = self.ops.list_addresses(&self.name, family)?;
            for address in addresses {
                self.ops.delete_address(&self.name, family, &address)?;
                debug!(
                    target: T_LINK,
                    "{}: removed {} {}", self.name, family, address
                );
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Terminate a running client, leaving addresses in place.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.client_alive()? {
            self.stop_client()?;
        }
        Ok(())
    }

    fn stop_client(&mut self) -> Result<()> {
        if let ClientState::Running(client) = &mut self.client {
            let pid = client.pid();
            client.terminate()?;
            info!(
                target: T_DHCP,
                "{}: configuration client {} stopped", self.name, pid
            );
        }
        self.client = ClientState::Idle;
        Ok(())
    }
}
