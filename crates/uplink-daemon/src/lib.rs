#![deny(unsafe_op_in_unsafe_fn)]
pub mod cli;
pub mod config;
pub mod status;
pub mod systemd;
pub mod worker;
