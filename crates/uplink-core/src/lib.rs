#![deny(unsafe_op_in_unsafe_fn)]
//! Link monitoring and single-active-interface arbitration.
//!
//! Each [`InterfaceMonitor`] tracks one interface and its configuration
//! client; the [`Arbiter`] polls them in priority order and lets only the
//! first active interface keep a client running.

pub mod arbiter;
pub mod cancel;
pub mod error;
pub mod monitor;
pub mod ops;
pub mod status;

pub use arbiter::{Arbiter, TickError, TickReport, POLL_INTERVAL};
pub use cancel::CancelFlag;
pub use error::{ErrorKind, LinkError, Result};
pub use monitor::{ClientPoll, ClientState, DownOutcome, InterfaceMonitor, UpOutcome};
pub use ops::{
    AddressFamily, ClientExit, ClientProcess, CommandLinkOps, LinkOps, ToolConfig, FLUSH_ORDER,
};
pub use status::{parse_addresses, parse_link_report, LinkReport, UP_MARKERS};
