//! Simulation driver implementation.
//!
//! The `SimulationDriver` implements `IoDriver` and `WaveformOutput` over an
//! in-memory pin bank, so scan cycles can run and be inspected without
//! physical hardware. Any pin name is accepted.

use plc_common::config::PlcConfig;
use plc_common::io::kind::IoKind;
use tracing::{debug, info, trace};

use super::io::{PinBank, PinDrive, SimPin};
use crate::driver::{HalError, IoDriver, PointId, WaveformOutput};

/// Simulation driver implementing the IoDriver trait.
pub struct SimulationDriver {
    /// Driver name
    name: &'static str,
    /// Driver version
    version: &'static str,
    /// Simulated pins
    bank: PinBank,
}

impl SimulationDriver {
    /// Create a new simulation driver instance.
    pub fn new() -> Self {
        Self {
            name: "simulation",
            version: env!("CARGO_PKG_VERSION"),
            bank: PinBank::default(),
        }
    }

    /// Inject a digital input level.
    pub fn set_digital_input(&mut self, pin: &str, level: bool) {
        let id = self.bank.get_or_create(pin);
        if let Some(p) = self.bank.pin_mut(id) {
            p.input_level = level;
        }
    }

    /// Inject a raw ADC sample.
    pub fn set_analog_input(&mut self, pin: &str, sample: u16) {
        let id = self.bank.get_or_create(pin);
        if let Some(p) = self.bank.pin_mut(id) {
            p.analog_sample = sample;
        }
    }

    /// Snapshot of a pin by name.
    pub fn pin(&self, pin: &str) -> Option<&SimPin> {
        self.bank.lookup(pin).and_then(|id| self.bank.pin(id))
    }

    /// Current drive state of a pin.
    pub fn drive(&self, pin: &str) -> Option<PinDrive> {
        self.pin(pin).map(|p| p.drive)
    }

    /// Static electrical level of an output, `None` if not statically driven.
    pub fn output_level(&self, pin: &str) -> Option<bool> {
        match self.drive(pin)? {
            PinDrive::Static(level) => Some(level),
            _ => None,
        }
    }

    /// Setup history as `(pin name, kind)` pairs.
    pub fn setup_history(&self) -> Vec<(String, IoKind)> {
        self.bank
            .setup_log()
            .iter()
            .filter_map(|(id, kind)| self.bank.pin(*id).map(|p| (p.name.clone(), *kind)))
            .collect()
    }

    /// Total digital writes issued.
    pub fn digital_writes(&self) -> u64 {
        self.bank.digital_writes()
    }

    /// Total waveform commands (static level, start, stop) issued.
    pub fn waveform_commands(&self) -> u64 {
        self.bank.waveform_commands()
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl WaveformOutput for SimulationDriver {
    fn set_static_level(&mut self, point: PointId, high: bool) {
        if !self.bank.apply_drive(point, PinDrive::Static(high)) {
            trace!("set_static_level on unknown point {}", point);
        }
    }

    fn start_periodic(&mut self, point: PointId, on_us: u32, off_us: u32, phase_us: u32) {
        let drive = PinDrive::Periodic {
            on_us,
            off_us,
            phase_us,
        };
        if !self.bank.apply_drive(point, drive) {
            trace!("start_periodic on unknown point {}", point);
        }
    }

    fn stop_periodic(&mut self, point: PointId) {
        let running = matches!(
            self.bank.pin(point).map(|p| p.drive),
            Some(PinDrive::Periodic { .. })
        );
        // Stopping an idle pin still counts as a command, as on hardware.
        let drive = if running {
            PinDrive::Released
        } else {
            self.bank.pin(point).map(|p| p.drive).unwrap_or_default()
        };
        self.bank.apply_drive(point, drive);
    }
}

impl IoDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn init(&mut self, config: &PlcConfig) -> Result<(), HalError> {
        let sim = &config.simulation;
        for (pin, level) in &sim.digital_inputs {
            self.set_digital_input(pin, *level);
        }
        for (pin, sample) in &sim.analog_inputs {
            self.set_analog_input(pin, *sample);
        }
        info!(
            "Simulation driver initialized: {} preset DI, {} preset AI",
            sim.digital_inputs.len(),
            sim.analog_inputs.len()
        );
        Ok(())
    }

    fn claim(&mut self, pin: &str) -> Result<PointId, HalError> {
        let pin = pin.trim();
        if pin.is_empty() {
            return Err(HalError::UnknownPin(String::new()));
        }
        Ok(self.bank.get_or_create(pin))
    }

    fn setup(&mut self, point: PointId, kind: IoKind) -> Result<(), HalError> {
        let pin = self
            .bank
            .pin_mut(point)
            .ok_or(HalError::InvalidPoint(point))?;

        if let Some(existing) = pin.kind {
            if existing != kind {
                return Err(HalError::ModeConflict {
                    pin: pin.name.clone(),
                    existing,
                    requested: kind,
                });
            }
        }
        pin.kind = Some(kind);
        pin.setup_count += 1;
        debug!("sim pin {} set up as {} ({})", pin.name, kind, point);

        self.bank.record_setup(point, kind);
        Ok(())
    }

    fn digital_read(&mut self, point: PointId) -> bool {
        self.bank.pin(point).is_some_and(|p| p.input_level)
    }

    fn digital_write(&mut self, point: PointId, level: bool) {
        if !self.bank.write_level(point, level) {
            trace!("digital_write on unknown point {}", point);
        }
    }

    fn analog_read(&mut self, point: PointId) -> u16 {
        self.bank.pin(point).map_or(0, |p| p.analog_sample)
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        for idx in 0..self.bank.len() {
            let id = PointId(idx as u16);
            if let Some(pin) = self.bank.pin_mut(id) {
                if matches!(pin.kind, Some(IoKind::Do | IoKind::Ao)) {
                    pin.drive = PinDrive::Released;
                }
            }
        }
        info!("Simulation driver shut down, {} pins released", self.bank.len());
        Ok(())
    }
}
