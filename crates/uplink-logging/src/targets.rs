//! Tracing targets routed to their own log files.

/// Link state and arbitration decisions.
pub const T_LINK: &str = "link";
/// Configuration client lifecycle.
pub const T_DHCP: &str = "dhcp";

pub const SUBSYSTEM_TARGETS: [&str; 2] = [T_LINK, T_DHCP];
