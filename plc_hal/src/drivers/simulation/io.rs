//! Simulated pin bank.
//!
//! The `PinBank` keeps one `SimPin` per pin name:
//! - input levels and ADC samples injected by tests or configuration
//! - the current drive state of outputs (static level or periodic waveform)
//! - setup history and command counters for inspection

use std::collections::HashMap;

use plc_common::io::kind::IoKind;
use tracing::trace;

use crate::driver::PointId;

/// Drive state of a simulated output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinDrive {
    /// Never driven, or waveform stopped without a new level.
    #[default]
    Released,
    /// Static electrical level.
    Static(bool),
    /// Periodic waveform.
    Periodic { on_us: u32, off_us: u32, phase_us: u32 },
}

impl PinDrive {
    /// Average electrical level in `[0.0, 1.0]`.
    pub fn duty(&self) -> f64 {
        match *self {
            Self::Released | Self::Static(false) => 0.0,
            Self::Static(true) => 1.0,
            Self::Periodic { on_us, off_us, .. } => {
                let period = on_us as f64 + off_us as f64;
                if period == 0.0 { 0.0 } else { on_us as f64 / period }
            }
        }
    }
}

/// One simulated pin.
#[derive(Debug, Clone, Default)]
pub struct SimPin {
    pub name: String,
    /// Kind the pin was last set up as.
    pub kind: Option<IoKind>,
    /// Number of `setup()` calls.
    pub setup_count: u32,
    /// Injected digital input level.
    pub input_level: bool,
    /// Injected ADC sample.
    pub analog_sample: u16,
    /// Output drive state.
    pub drive: PinDrive,
}

/// Name-indexed collection of simulated pins.
#[derive(Debug, Default)]
pub struct PinBank {
    pins: Vec<SimPin>,
    index: HashMap<String, PointId>,
    /// `(point, kind)` in the order setups happened.
    setup_log: Vec<(PointId, IoKind)>,
    digital_writes: u64,
    waveform_commands: u64,
}

impl PinBank {
    /// Return the handle for `name`, creating the pin on first use.
    pub fn get_or_create(&mut self, name: &str) -> PointId {
        if let Some(id) = self.index.get(name) {
            return *id;
        }
        let id = PointId(self.pins.len() as u16);
        self.pins.push(SimPin {
            name: name.to_string(),
            ..SimPin::default()
        });
        self.index.insert(name.to_string(), id);
        trace!("sim pin {} created as {}", name, id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<PointId> {
        self.index.get(name).copied()
    }

    pub fn pin(&self, id: PointId) -> Option<&SimPin> {
        self.pins.get(id.0 as usize)
    }

    pub fn pin_mut(&mut self, id: PointId) -> Option<&mut SimPin> {
        self.pins.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn record_setup(&mut self, id: PointId, kind: IoKind) {
        self.setup_log.push((id, kind));
    }

    pub fn setup_log(&self) -> &[(PointId, IoKind)] {
        &self.setup_log
    }

    /// Apply a digital write; returns `false` for unknown handles.
    pub fn write_level(&mut self, id: PointId, level: bool) -> bool {
        self.digital_writes += 1;
        match self.pin_mut(id) {
            Some(pin) => {
                pin.drive = PinDrive::Static(level);
                true
            }
            None => false,
        }
    }

    /// Apply a waveform command; returns `false` for unknown handles.
    pub fn apply_drive(&mut self, id: PointId, drive: PinDrive) -> bool {
        self.waveform_commands += 1;
        match self.pin_mut(id) {
            Some(pin) => {
                pin.drive = drive;
                true
            }
            None => false,
        }
    }

    pub fn digital_writes(&self) -> u64 {
        self.digital_writes
    }

    pub fn waveform_commands(&self) -> u64 {
        self.waveform_commands
    }
}
