//! I/O configuration : located variables bound to physical pins.
//!
//! Shared between the HAL and the scan runtime. Both read the same
//! `plc.toml` at startup; bindings are immutable afterwards.

pub mod config;
pub mod kind;
pub mod pin_map;
