//! # PLC Scan Runtime Library
//!
//! Deterministic scan-cycle engine between physical I/O and the memory
//! image of a compiled logic program. Every poll period it samples inputs,
//! steps the program, emits outputs, advances a software clock and
//! publishes telemetry, in that order and to completion.
//!
//! ## Module Structure
//!
//! - [`clock`] - Software clock advanced once per scan
//! - [`image`] - Process image arena and typed variable handles
//! - [`binding`] - Point-to-variable binding table
//! - [`analog`] - Analog output deduplication and waveform translation
//! - [`engine`] - Logic engine interface
//! - [`telemetry`] - Telemetry sinks
//! - [`cycle`] - Scan cycle scheduler and RT setup
//! - [`config`] - Configuration loading and coverage validation
//! - [`programs`] - Built-in demo programs
//!
//! ## Example
//!
//! ```rust
//! use std::path::Path;
//! use plc_hal::SimulationDriver;
//! use plc_runtime::config::load_config_from_str;
//! use plc_runtime::cycle::ScanCycle;
//! use plc_runtime::programs::{Loopback, variables_of};
//!
//! let loaded = load_config_from_str(
//!     "[shared]\nservice_name = \"demo\"\n",
//!     Path::new("."),
//! )
//! .unwrap();
//! let program = Loopback::new(variables_of(&loaded.bindings));
//! let mut cycle = ScanCycle::from_config(&loaded, SimulationDriver::new(), program).unwrap();
//! cycle.scan_once().unwrap();
//! assert_eq!(cycle.tick(), 1);
//! ```

pub mod analog;
pub mod binding;
pub mod clock;
pub mod config;
pub mod cycle;
pub mod engine;
pub mod image;
pub mod programs;
pub mod telemetry;
