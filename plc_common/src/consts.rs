//! System-wide constants for the PLC workspace.
//!
//! Single source of truth for numeric limits and defaults.
//! Imported by all crates.

/// Maximum number of configured I/O bindings (per binding table group).
pub const MAX_BINDINGS: usize = 32;

/// Carrier frequency of the analog output waveform [Hz].
pub const PWM_FREQUENCY_HZ: f32 = 1000.0;

/// Default common tick time [ns] (20 ms scan).
pub const DEFAULT_TICK_TIME_NS: u64 = 20_000_000;

/// Default ADC resolution [bits].
pub const DEFAULT_ADC_RESOLUTION: u8 = 10;

/// Nanoseconds per second.
pub const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/plc/plc.toml";
