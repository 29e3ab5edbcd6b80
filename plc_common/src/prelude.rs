//! Prelude module for common re-exports.
//!
//! ```rust
//! use plc_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, PlcConfig, ScanConfig, SharedConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{MAX_BINDINGS, PWM_FREQUENCY_HZ};

// ─── IEC types ──────────────────────────────────────────────────────
pub use crate::iec::{ElementaryType, IecType, IecValue};
pub use crate::located::{LocatedAddress, LocatedVariable};

// ─── I/O ────────────────────────────────────────────────────────────
pub use crate::io::config::{BindingConfig, SimulationConfig, SinkConfig};
pub use crate::io::kind::IoKind;
pub use crate::io::pin_map::Platform;
