//! I/O binding, telemetry sink and simulation configuration structs.
//!
//! Deserialized from `plc.toml` at startup. Each `[[bindings]]` entry ties
//! one located variable to one physical pin; the binding kind follows from
//! the variable's address prefix.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::located::LocatedAddress;

// ─── BindingConfig ──────────────────────────────────────────────────

/// A single variable-to-pin binding from `plc.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Located variable (`%IX0.0` or `__IX0_0`).
    pub variable: LocatedAddress,

    /// Physical pin identifier as understood by the driver (`"D4"`, `"GPIO5"`).
    pub pin: String,

    /// Invert the logical level of the point. Default: false.
    #[serde(default)]
    pub inverted: bool,

    /// Name of the telemetry sink receiving this variable every scan.
    #[serde(default)]
    pub sink: Option<String>,

    /// Human-readable display name.
    #[serde(default)]
    pub name: Option<String>,
}

// ─── SinkConfig ─────────────────────────────────────────────────────

/// Telemetry sink definition, keyed by name under `[sinks]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Publish through the tracing subscriber.
    Log,
    /// Append one JSON object per value to a file.
    JsonLines { path: PathBuf },
}

// ─── SimulationConfig ───────────────────────────────────────────────

/// Initial input levels for the simulation driver, keyed by pin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub digital_inputs: BTreeMap<String, bool>,

    #[serde(default)]
    pub analog_inputs: BTreeMap<String, u16>,
}
