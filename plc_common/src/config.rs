//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! and the top-level [`PlcConfig`] read by the scan runtime.
//!
//! # Usage
//!
//! ```rust,no_run
//! use plc_common::config::{ConfigLoader, ConfigError, PlcConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = PlcConfig::load(Path::new("plc.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{DEFAULT_ADC_RESOLUTION, DEFAULT_TICK_TIME_NS, MAX_BINDINGS, NANOS_PER_SEC};
use crate::io::config::{BindingConfig, SimulationConfig, SinkConfig};
use crate::io::kind::IoKind;
use crate::io::pin_map::Platform;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields shared across applications.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "plc-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.to_path_buf())
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── Scan configuration ─────────────────────────────────────────────

/// `[plc]` table: scan timing and target description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Common tick time [ns]. Drives both the clock increment and the
    /// poll period.
    #[serde(default = "default_tick_time_ns")]
    pub tick_time_ns: u64,

    /// Target platform, selects the default pin map.
    #[serde(default)]
    pub platform: Platform,

    /// ADC resolution [bits]; inverted analog inputs subtract `1 << bits`.
    #[serde(default = "default_adc_resolution")]
    pub adc_resolution: u8,

    /// Optional generated `LOCATED_VARIABLES.h` listing the variables the
    /// program uses.
    #[serde(default)]
    pub located_variables: Option<PathBuf>,
}

fn default_tick_time_ns() -> u64 {
    DEFAULT_TICK_TIME_NS
}

fn default_adc_resolution() -> u8 {
    DEFAULT_ADC_RESOLUTION
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tick_time_ns: DEFAULT_TICK_TIME_NS,
            platform: Platform::default(),
            adc_resolution: DEFAULT_ADC_RESOLUTION,
            located_variables: None,
        }
    }
}

impl ScanConfig {
    /// Poll period [µs] derived from the tick time.
    pub fn poll_period_us(&self) -> u64 {
        self.tick_time_ns / 1000
    }

    /// Validate timing and ADC parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_time_ns < 1000 || self.tick_time_ns >= NANOS_PER_SEC as u64 {
            return Err(ConfigError::ValidationError(format!(
                "tick_time_ns must be in [1000, 1000000000), got {}",
                self.tick_time_ns
            )));
        }
        if self.adc_resolution > 16 {
            return Err(ConfigError::ValidationError(format!(
                "adc_resolution must be <= 16 bits, got {}",
                self.adc_resolution
            )));
        }
        Ok(())
    }
}

/// Complete `plc.toml` contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlcConfig {
    pub shared: SharedConfig,

    #[serde(default)]
    pub plc: ScanConfig,

    /// Named telemetry sinks.
    #[serde(default)]
    pub sinks: BTreeMap<String, SinkConfig>,

    /// Explicit bindings; `None` selects the platform default pin map.
    #[serde(default)]
    pub bindings: Option<Vec<BindingConfig>>,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl PlcConfig {
    /// Parse from TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Bindings in effect: explicit ones, or the platform defaults.
    pub fn effective_bindings(&self) -> Vec<BindingConfig> {
        match &self.bindings {
            Some(bindings) => bindings.clone(),
            None => self.plc.platform.default_bindings(),
        }
    }

    /// Validate everything that does not depend on the loaded program.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` is empty
    /// - the tick time or ADC resolution is out of range
    /// - more than `MAX_BINDINGS` bindings are configured
    /// - a binding names a variable that cannot map onto a pin
    /// - a binding references an undefined sink
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.plc.validate()?;

        let bindings = self.effective_bindings();
        if bindings.len() > MAX_BINDINGS {
            return Err(ConfigError::ValidationError(format!(
                "{} bindings configured, at most {MAX_BINDINGS} allowed",
                bindings.len()
            )));
        }

        for binding in &bindings {
            if IoKind::of(&binding.variable).is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "variable {} cannot be bound to a pin (expected %IX, %QX, %IW or %QW)",
                    binding.variable
                )));
            }
            if binding.pin.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "variable {} has an empty pin",
                    binding.variable
                )));
            }
            if let Some(sink) = &binding.sink {
                if !self.sinks.contains_key(sink) {
                    return Err(ConfigError::ValidationError(format!(
                        "variable {} references undefined sink '{sink}'",
                        binding.variable
                    )));
                }
            }
        }
        Ok(())
    }
}
