use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{LinkError, Result};
use crate::status::parse_addresses;
use uplink_logging::targets::T_DHCP;

pub const DEFAULT_INSPECTOR: &str = "ifconfig";
pub const DEFAULT_CLIENT: &str = "dhcpcd";
pub const DEFAULT_CLIENT_ARGS: [&str; 2] = ["-d", "-B"];
pub const DEFAULT_TERMINATE_GRACE: Duration = Duration::from_secs(3);

const TERMINATE_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    Inet6,
    Inet,
}

/// Order in which address families are flushed.
pub const FLUSH_ORDER: [AddressFamily; 2] = [AddressFamily::Inet6, AddressFamily::Inet];

impl AddressFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressFamily::Inet6 => "inet6",
            AddressFamily::Inet => "inet",
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a configuration client ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientExit {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl From<ExitStatus> for ClientExit {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            signal: status.signal(),
        }
    }
}

impl fmt::Display for ClientExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {}", code),
            (None, Some(signal)) => write!(f, "signal {}", signal),
            (None, None) => f.write_str("unknown status"),
        }
    }
}

/// Handle to a running address-configuration client.
pub trait ClientProcess: Send {
    fn pid(&self) -> u32;

    /// Non-blocking exit check. `Ok(None)` while the process is still running.
    fn try_wait(&mut self) -> Result<Option<ClientExit>>;

    /// Ask the process to stop and make sure it is gone afterwards.
    fn terminate(&mut self) -> Result<()>;
}

/// External collaborators of an interface monitor.
pub trait LinkOps: Send + Sync {
    /// Raw status text for `interface`.
    fn link_status(&self, interface: &str) -> Result<String>;

    fn list_addresses(&self, interface: &str, family: AddressFamily) -> Result<Vec<String>>;

    fn delete_address(&self, interface: &str, family: AddressFamily, address: &str) -> Result<()>;

    /// Start a configuration client bound to `interface`. Does not wait for an
    /// address to be acquired.
    fn spawn_client(&self, interface: &str) -> Result<Box<dyn ClientProcess>>;
}

#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub inspector: PathBuf,
    pub client: PathBuf,
    pub client_args: Vec<String>,
    /// Directory receiving `dhcp-<iface>.log`; client output is discarded when unset.
    pub client_log_dir: Option<PathBuf>,
    pub terminate_grace: Duration,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            inspector: PathBuf::from(DEFAULT_INSPECTOR),
            client: PathBuf::from(DEFAULT_CLIENT),
            client_args: DEFAULT_CLIENT_ARGS.iter().map(|s| s.to_string()).collect(),
            client_log_dir: None,
            terminate_grace: DEFAULT_TERMINATE_GRACE,
        }
    }
}

/// `LinkOps` backed by the inspector and client binaries.
pub struct CommandLinkOps {
    tools: ToolConfig,
}

impl CommandLinkOps {
    pub fn new(tools: ToolConfig) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &ToolConfig {
        &self.tools
    }

    fn inspect(&self, interface: &str) -> Result<String> {
        let output = Command::new(&self.tools.inspector)
            .arg(interface)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                LinkError::inspector(
                    interface,
                    format!("failed to run {}: {}", self.tools.inspector.display(), e),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LinkError::inspector(
                interface,
                format!(
                    "{} exited with {}: {}",
                    self.tools.inspector.display(),
                    ClientExit::from(output.status),
                    stderr.trim()
                ),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn client_output(&self, interface: &str) -> (Stdio, Stdio) {
        let Some(dir) = self.tools.client_log_dir.as_ref() else {
            return (Stdio::null(), Stdio::null());
        };

        let path = dir.join(format!("dhcp-{}.log", interface));
        let file = OpenOptions::new().create(true).append(true).open(&path);
        match file.and_then(|f| f.try_clone().map(|dup| (f, dup))) {
            Ok((out, err)) => (Stdio::from(out), Stdio::from(err)),
            Err(err) => {
                warn!(
                    target: T_DHCP,
                    "Client output for {} discarded ({}): {}",
                    interface,
                    path.display(),
                    err
                );
                (Stdio::null(), Stdio::null())
            }
        }
    }
}

impl LinkOps for CommandLinkOps {
    fn link_status(&self, interface: &str) -> Result<String> {
        self.inspect(interface)
    }

    fn list_addresses(&self, interface: &str, family: AddressFamily) -> Result<Vec<String>> {
        let text = self.inspect(interface)?;
        Ok(parse_addresses(&text, family))
    }

    fn delete_address(&self, interface: &str, family: AddressFamily, address: &str) -> Result<()> {
        let to_err = |reason: String| LinkError::AddressDelete {
            interface: interface.to_string(),
            family: family.to_string(),
            address: address.to_string(),
            reason,
        };

        let output = Command::new(&self.tools.inspector)
            .args([interface, family.as_str(), address, "delete"])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| to_err(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(to_err(format!(
                "{}: {}",
                ClientExit::from(output.status),
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn spawn_client(&self, interface: &str) -> Result<Box<dyn ClientProcess>> {
        let (stdout, stderr) = self.client_output(interface);
        let child = Command::new(&self.tools.client)
            .args(&self.tools.client_args)
            .arg(interface)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|e| LinkError::ClientSpawn {
                interface: interface.to_string(),
                reason: format!("{}: {}", self.tools.client.display(), e),
            })?;

        debug!(
            target: T_DHCP,
            "Spawned {} for {} (pid {})",
            self.tools.client.display(),
            interface,
            child.id()
        );

        Ok(Box::new(ChildClient {
            interface: interface.to_string(),
            child,
            grace: self.tools.terminate_grace,
        }))
    }
}

/// A configuration client running as a child of this process.
pub struct ChildClient {
    interface: String,
    child: Child,
    grace: Duration,
}

impl ChildClient {
    fn signal_err(&self, err: io::Error) -> LinkError {
        LinkError::ClientSignal {
            interface: self.interface.clone(),
            pid: self.child.id(),
            reason: err.to_string(),
        }
    }

    fn wait_err(&self, err: io::Error) -> LinkError {
        LinkError::ClientWait {
            interface: self.interface.clone(),
            pid: self.child.id(),
            reason: err.to_string(),
        }
    }
}

impl ClientProcess for ChildClient {
    fn pid(&self) -> u32 {
        self.child.id()
    }

    fn try_wait(&mut self) -> Result<Option<ClientExit>> {
        match self.child.try_wait() {
            Ok(status) => Ok(status.map(ClientExit::from)),
            Err(err) => Err(self.wait_err(err)),
        }
    }

    fn terminate(&mut self) -> Result<()> {
        let pid = self.child.id();
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            // ESRCH: already gone, only the reap below is left to do.
            if err.raw_os_error() != Some(libc::ESRCH) {
                return Err(self.signal_err(err));
            }
        }

        let deadline = Instant::now() + self.grace;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    debug!(
                        target: T_DHCP,
                        "Client {} on {} stopped ({})",
                        pid,
                        self.interface,
                        ClientExit::from(status)
                    );
                    return Ok(());
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(TERMINATE_POLL),
                Ok(None) => break,
                Err(err) => return Err(self.wait_err(err)),
            }
        }

        warn!(
            target: T_DHCP,
            "Client {} on {} ignored SIGTERM for {:?}, killing",
            pid,
            self.interface,
            self.grace
        );
        if let Err(err) = self.child.kill() {
            return Err(self.signal_err(err));
        }
        self.child.wait().map_err(|e| self.wait_err(e))?;
        Ok(())
    }
}
