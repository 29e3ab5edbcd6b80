//! HAL driver traits and error types.
//!
//! This module defines:
//! - `WaveformOutput` - periodic-waveform / static-level capability of an output
//! - `IoDriver` - interface for pluggable I/O drivers
//! - `HalError` - error types for HAL operations
//! - `PointId` - handle of a claimed physical point
//! - `DriverFactory` - factory function type

use core::fmt;

use plc_common::config::PlcConfig;
use plc_common::io::kind::IoKind;
use thiserror::Error;

/// Error types for HAL operations.
///
/// Only raised while claiming and setting up points; cycle-time reads and
/// writes are best-effort and never fail at this layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Pin name not known to the driver
    #[error("Unknown pin: {0}")]
    UnknownPin(String),

    /// Point already configured for another kind
    #[error("Pin {pin} already set up as {existing}, cannot set up as {requested}")]
    ModeConflict {
        pin: String,
        existing: IoKind,
        requested: IoKind,
    },

    /// Handle does not belong to this driver
    #[error("Invalid point handle: {0}")]
    InvalidPoint(PointId),

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),
}

/// Handle of a physical point claimed from a driver.
///
/// Handles are borrowed references: the runtime never releases the point
/// behind one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId(pub u16);

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn() -> Box<dyn IoDriver>;

/// Waveform capability of an output point.
///
/// Fire-and-forget hardware commands. Levels are electrical levels.
pub trait WaveformOutput {
    /// Drive the point to a static level.
    fn set_static_level(&mut self, point: PointId, high: bool);

    /// Start a periodic waveform: `on_us` high, `off_us` low, shifted by
    /// `phase_us`.
    fn start_periodic(&mut self, point: PointId, on_us: u32, off_us: u32, phase_us: u32);

    /// Stop any periodic waveform on the point.
    fn stop_periodic(&mut self, point: PointId);
}

/// Trait defining the interface for I/O drivers.
///
/// # Lifecycle
///
/// 1. `init()` - once, before any point is claimed
/// 2. `claim()` - once per binding, resolves a pin name to a handle
/// 3. `setup()` - once per binding, in binding-table order
/// 4. `digital_read()` / `digital_write()` / `analog_read()` and the
///    [`WaveformOutput`] commands - every scan
/// 5. `shutdown()` - when the runtime stops
///
/// # Timing Contracts
///
/// | Operation | RT Constraint |
/// |-----------|---------------|
/// | `init()`, `claim()`, `setup()` | None (pre-scan) |
/// | reads, writes, waveform commands | must return promptly |
/// | `shutdown()` | None (post-scan) |
pub trait IoDriver: WaveformOutput {
    /// Returns the driver's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Returns the driver's semantic version.
    fn version(&self) -> &'static str;

    /// Initialize the driver from the runtime configuration.
    fn init(&mut self, _config: &PlcConfig) -> Result<(), HalError> {
        Ok(())
    }

    /// Resolve a pin name to a point handle.
    ///
    /// Claiming the same pin twice returns the same handle.
    fn claim(&mut self, pin: &str) -> Result<PointId, HalError>;

    /// Configure a claimed point for the given I/O kind.
    fn setup(&mut self, point: PointId, kind: IoKind) -> Result<(), HalError>;

    /// Read the electrical level of a digital point.
    fn digital_read(&mut self, point: PointId) -> bool;

    /// Write the electrical level of a digital point.
    fn digital_write(&mut self, point: PointId, level: bool);

    /// Read the raw ADC sample of an analog point.
    fn analog_read(&mut self, point: PointId) -> u16;

    /// Graceful shutdown of the driver.
    fn shutdown(&mut self) -> Result<(), HalError> {
        Ok(())
    }
}

impl<W: WaveformOutput + ?Sized> WaveformOutput for Box<W> {
    fn set_static_level(&mut self, point: PointId, high: bool) {
        (**self).set_static_level(point, high);
    }

    fn start_periodic(&mut self, point: PointId, on_us: u32, off_us: u32, phase_us: u32) {
        (**self).start_periodic(point, on_us, off_us, phase_us);
    }

    fn stop_periodic(&mut self, point: PointId) {
        (**self).stop_periodic(point);
    }
}

impl<D: IoDriver + ?Sized> IoDriver for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn version(&self) -> &'static str {
        (**self).version()
    }

    fn init(&mut self, config: &PlcConfig) -> Result<(), HalError> {
        (**self).init(config)
    }

    fn claim(&mut self, pin: &str) -> Result<PointId, HalError> {
        (**self).claim(pin)
    }

    fn setup(&mut self, point: PointId, kind: IoKind) -> Result<(), HalError> {
        (**self).setup(point, kind)
    }

    fn digital_read(&mut self, point: PointId) -> bool {
        (**self).digital_read(point)
    }

    fn digital_write(&mut self, point: PointId, level: bool) {
        (**self).digital_write(point, level);
    }

    fn analog_read(&mut self, point: PointId) -> u16 {
        (**self).analog_read(point)
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        (**self).shutdown()
    }
}
