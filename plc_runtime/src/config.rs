//! Runtime configuration loading and program-dependent validation.
//!
//! Loads `plc.toml` through [`ConfigLoader`], runs the static validation in
//! [`PlcConfig::validate`], reads the optional located-variables header and
//! checks that every bindable variable the program uses has a pin.

use std::path::{Path, PathBuf};

use plc_common::config::{ConfigError, ConfigLoader, PlcConfig};
use plc_common::iec::ElementaryType;
use plc_common::io::config::BindingConfig;
use plc_common::io::kind::IoKind;
use plc_common::located::{LocatedAddress, LocatedError, LocatedVariable, parse_located_variables};
use thiserror::Error;
use tracing::{debug, info};

// ─── Error Type ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RuntimeConfigError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot read located variables from {path}: {source}")]
    Header {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid located variables: {0}")]
    Located(#[from] LocatedError),

    #[error("Pin has not been configured for PLC variable {0}")]
    UnboundVariable(LocatedAddress),
}

// ─── Loaded Config Bundle ───────────────────────────────────────────

/// Validated configuration, ready for the scan cycle.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub plc: PlcConfig,
    /// Bindings in effect (explicit or platform default).
    pub bindings: Vec<BindingConfig>,
    /// Variables from the located-variables header, when configured.
    pub located: Option<Vec<LocatedVariable>>,
    /// Directory relative file paths in the configuration resolve against.
    pub base_dir: PathBuf,
}

impl LoadedConfig {
    /// Validate a parsed configuration.
    ///
    /// A relative header path is resolved against `base_dir`.
    pub fn new(plc: PlcConfig, base_dir: &Path) -> Result<Self, RuntimeConfigError> {
        plc.validate()?;

        let located = match &plc.plc.located_variables {
            Some(path) => Some(load_located_variables(&resolve_path(base_dir, path))?),
            None => None,
        };

        let bindings = plc.effective_bindings();
        if plc.bindings.is_none() {
            info!(
                "No explicit bindings, using {} default pin map ({} bindings)",
                plc.plc.platform,
                bindings.len()
            );
        }

        Ok(Self {
            plc,
            bindings,
            located,
            base_dir: base_dir.to_path_buf(),
        })
    }

    /// Tick time [ns]. Validated to be below one second.
    pub fn tick_time_ns(&self) -> u64 {
        self.plc.plc.tick_time_ns
    }

    pub fn adc_resolution(&self) -> u8 {
        self.plc.plc.adc_resolution
    }

    /// Every bindable variable in `used` must have a configured binding.
    pub fn check_coverage(&self, used: &[LocatedVariable]) -> Result<(), RuntimeConfigError> {
        check_coverage(&self.bindings, used)
    }

    /// Log the scan parameters.
    pub fn dump_config(&self) {
        let scan = &self.plc.plc;
        info!(
            "PLC '{}': platform={}, tick_time={}ns, poll_period={}us, adc_resolution={} bits",
            self.plc.shared.service_name,
            scan.platform,
            scan.tick_time_ns,
            scan.poll_period_us(),
            scan.adc_resolution
        );
        if let Some(vars) = &self.located {
            info!("Located variables: {} declared", vars.len());
        }
    }
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate `plc.toml`.
pub fn load_config(path: &Path) -> Result<LoadedConfig, RuntimeConfigError> {
    let plc = PlcConfig::load(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    LoadedConfig::new(plc, base_dir)
}

/// Load from a TOML string; relative paths resolve against `base_dir`.
pub fn load_config_from_str(toml_str: &str, base_dir: &Path) -> Result<LoadedConfig, RuntimeConfigError> {
    let plc = PlcConfig::from_toml(toml_str)?;
    LoadedConfig::new(plc, base_dir)
}

/// `path` as is when absolute, else joined onto `base_dir`.
pub fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base_dir.join(path)
    } else {
        path.to_path_buf()
    }
}

/// Read a generated `LOCATED_VARIABLES.h`.
///
/// 16-bit analog points declared `INT` are held as `UINT` cells, the raw
/// width of the analog drivers.
pub fn load_located_variables(path: &Path) -> Result<Vec<LocatedVariable>, RuntimeConfigError> {
    let src = std::fs::read_to_string(path).map_err(|source| RuntimeConfigError::Header {
        path: path.to_path_buf(),
        source,
    })?;
    let mut vars = parse_located_variables(&src)?;
    for var in &mut vars {
        let analog = IoKind::of(&var.address).is_some_and(IoKind::is_analog);
        if analog && var.ty == ElementaryType::Int {
            debug!("{} declared INT, held as UINT", var.address);
            var.ty = ElementaryType::Uint;
        }
    }
    info!("Loaded {} located variables from {}", vars.len(), path.display());
    Ok(vars)
}

/// Coverage check against an explicit binding list.
pub fn check_coverage(
    bindings: &[BindingConfig],
    used: &[LocatedVariable],
) -> Result<(), RuntimeConfigError> {
    for var in used {
        if IoKind::of(&var.address).is_none() {
            continue;
        }
        if !bindings.iter().any(|b| b.variable == var.address) {
            return Err(RuntimeConfigError::UnboundVariable(var.address.clone()));
        }
    }
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────
