use serde::Serialize;
use thiserror::Error;

/// Error type for every interaction with the link inspector and the
/// configuration client.
///
/// Messages carry the interface name so a tick-level `warn!` is enough to
/// locate the failing uplink without extra context.
#[derive(Error, Debug)]
pub enum LinkError {
    // Inspector errors
    #[error("Link inspector failed for '{interface}': {reason}")]
    Inspector { interface: String, reason: String },

    #[error("Failed to delete {family} address {address} from '{interface}': {reason}")]
    AddressDelete {
        interface: String,
        family: String,
        address: String,
        reason: String,
    },

    // Configuration client errors
    #[error("Failed to launch configuration client on '{interface}': {reason}")]
    ClientSpawn { interface: String, reason: String },

    #[error("Failed to signal configuration client {pid} on '{interface}': {reason}")]
    ClientSignal {
        interface: String,
        pid: u32,
        reason: String,
    },

    #[error("Failed to poll configuration client {pid} on '{interface}': {reason}")]
    ClientWait {
        interface: String,
        pid: u32,
        reason: String,
    },

    // Setup errors
    #[error("At least one interface name is required")]
    NoInterfaces,

    #[error("Interface '{name}' listed more than once")]
    DuplicateInterface { name: String },
}

/// Coarse classification used by the arbiter when recording tick errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Inspector,
    Process,
    Setup,
}

impl LinkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LinkError::Inspector { .. } | LinkError::AddressDelete { .. } => ErrorKind::Inspector,
            LinkError::ClientSpawn { .. }
            | LinkError::ClientSignal { .. }
            | LinkError::ClientWait { .. } => ErrorKind::Process,
            LinkError::NoInterfaces | LinkError::DuplicateInterface { .. } => ErrorKind::Setup,
        }
    }

    pub fn inspector(interface: &str, reason: impl Into<String>) -> Self {
        LinkError::Inspector {
            interface: interface.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
