//! # PLC HAL Library
//!
//! Hardware Abstraction Layer with pluggable driver architecture.
//!
//! The scan runtime talks to physical points only through the traits in
//! [`driver`]: digital read/write, raw analog sampling, and the
//! [`WaveformOutput`] capability used by analog outputs.
//!
//! # Module Structure
//!
//! - [`driver`] - `IoDriver` / `WaveformOutput` traits, `HalError`, `PointId`
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Driver implementations
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                    plc_runtime                            │
//! │   ScanCycle ──► IoDriver (trait) ◄── DriverRegistry       │
//! └───────────────────────┬───────────────────────────────────┘
//!                         │
//!                         ▼
//!               ┌──────────────────┐
//!               │ SimulationDriver │  (or a hardware driver)
//!               └──────────────────┘
//! ```

pub mod driver;
pub mod driver_registry;
pub mod drivers;

// Re-export key types for convenience
pub use crate::driver::{DriverFactory, HalError, IoDriver, PointId, WaveformOutput};
pub use crate::driver_registry::DriverRegistry;
pub use crate::drivers::simulation::SimulationDriver;
