//! I/O binding table.
//!
//! Four insertion-ordered tables, one per I/O kind. Each binding ties a
//! physical point to a process image cell and optionally to a telemetry
//! sink. The table is filled before setup and frozen by [`BindingTable::setup_all`].

use heapless::Vec as FixedVec;
use plc_common::consts::MAX_BINDINGS;
use plc_common::iec::IecType;
use plc_common::io::kind::IoKind;
use plc_common::located::LocatedAddress;
use plc_hal::driver::{HalError, IoDriver, PointId};
use thiserror::Error;
use tracing::{debug, info};

use crate::analog::Deduplicator;
use crate::image::Var;
use crate::telemetry::SinkId;

/// Binding table errors. Startup only.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("{kind} binding table is full ({MAX_BINDINGS} entries)")]
    TableFull { kind: IoKind },

    #[error("binding table is frozen after setup")]
    Frozen,

    #[error("setup of {address} on pin {pin} failed: {source}")]
    Setup {
        address: LocatedAddress,
        pin: String,
        #[source]
        source: HalError,
    },
}

/// One point-to-variable association.
#[derive(Debug, Clone)]
pub struct Binding<T> {
    /// Located variable mirrored by the point.
    pub address: LocatedAddress,
    /// Pin name, as configured.
    pub pin: String,
    /// Display name, as configured.
    pub name: Option<String>,
    pub point: PointId,
    pub variable: Var<T>,
    pub sink: Option<SinkId>,
    /// Inverted logical level.
    pub inverted: bool,
}

impl<T: IecType> Binding<T> {
    pub fn new(address: LocatedAddress, pin: &str, point: PointId, variable: Var<T>) -> Self {
        Self {
            address,
            pin: pin.to_string(),
            name: None,
            point,
            variable,
            sink: None,
            inverted: false,
        }
    }

    pub fn with_sink(mut self, sink: Option<SinkId>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }
}

/// Analog output binding with its change detector.
#[derive(Debug, Clone)]
pub struct AnalogOutput {
    pub binding: Binding<u16>,
    pub dedup: Deduplicator<u16>,
}

type Table<T> = FixedVec<T, MAX_BINDINGS>;

/// All bindings, grouped DI → DO → AI → AO.
#[derive(Debug, Default)]
pub struct BindingTable {
    digital_inputs: Table<Binding<bool>>,
    digital_outputs: Table<Binding<bool>>,
    analog_inputs: Table<Binding<u16>>,
    analog_outputs: Table<AnalogOutput>,
    /// Points set up so far, counted in table order.
    set_up: usize,
    frozen: bool,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_open(&self) -> Result<(), BindingError> {
        if self.frozen {
            Err(BindingError::Frozen)
        } else {
            Ok(())
        }
    }

    pub fn register_digital_input(&mut self, binding: Binding<bool>) -> Result<(), BindingError> {
        self.check_open()?;
        self.digital_inputs
            .push(binding)
            .map_err(|_| BindingError::TableFull { kind: IoKind::Di })
    }

    pub fn register_digital_output(&mut self, binding: Binding<bool>) -> Result<(), BindingError> {
        self.check_open()?;
        self.digital_outputs
            .push(binding)
            .map_err(|_| BindingError::TableFull { kind: IoKind::Do })
    }

    pub fn register_analog_input(&mut self, binding: Binding<u16>) -> Result<(), BindingError> {
        self.check_open()?;
        self.analog_inputs
            .push(binding)
            .map_err(|_| BindingError::TableFull { kind: IoKind::Ai })
    }

    pub fn register_analog_output(&mut self, binding: Binding<u16>) -> Result<(), BindingError> {
        self.check_open()?;
        let entry = AnalogOutput {
            binding,
            dedup: Deduplicator::new(),
        };
        self.analog_outputs
            .push(entry)
            .map_err(|_| BindingError::TableFull { kind: IoKind::Ao })
    }

    /// Set up every registered point once, in table order, then freeze.
    ///
    /// Calling it again on a frozen table does nothing. After a failure, a
    /// new call resumes at the failing point: points already set up are
    /// never set up twice.
    pub fn setup_all<D: IoDriver + ?Sized>(&mut self, driver: &mut D) -> Result<(), BindingError> {
        if self.frozen {
            return Ok(());
        }

        fn setup_group<'a, T: 'a, D: IoDriver + ?Sized>(
            driver: &mut D,
            kind: IoKind,
            group: impl Iterator<Item = &'a Binding<T>>,
            position: &mut usize,
            set_up: &mut usize,
        ) -> Result<(), BindingError> {
            for b in group {
                if *position < *set_up {
                    *position += 1;
                    continue;
                }
                driver
                    .setup(b.point, kind)
                    .map_err(|source| BindingError::Setup {
                        address: b.address.clone(),
                        pin: b.pin.clone(),
                        source,
                    })?;
                *position += 1;
                *set_up += 1;
                debug!("{} bound to pin {} as {}", b.address, b.pin, kind);
            }
            Ok(())
        }

        let mut position = 0;
        let set_up = &mut self.set_up;
        setup_group(&mut *driver, IoKind::Di, self.digital_inputs.iter(), &mut position, set_up)?;
        setup_group(&mut *driver, IoKind::Do, self.digital_outputs.iter(), &mut position, set_up)?;
        setup_group(&mut *driver, IoKind::Ai, self.analog_inputs.iter(), &mut position, set_up)?;
        setup_group(
            &mut *driver,
            IoKind::Ao,
            self.analog_outputs.iter().map(|a| &a.binding),
            &mut position,
            set_up,
        )?;

        self.frozen = true;
        Ok(())
    }

    /// Log every binding.
    pub fn dump_config(&self) {
        info!(
            "Bindings: {} DI, {} DO, {} AI, {} AO",
            self.digital_inputs.len(),
            self.digital_outputs.len(),
            self.analog_inputs.len(),
            self.analog_outputs.len()
        );

        fn dump<T>(kind: IoKind, b: &Binding<T>) {
            let polarity = if b.inverted { "inverted" } else { "normal" };
            let name = b.name.as_deref().map(|n| format!(" '{n}'")).unwrap_or_default();
            match b.sink {
                Some(sink) => info!(
                    "  {kind} {}{name} -> pin {} ({polarity}), telemetry {sink}",
                    b.address, b.pin
                ),
                None => info!("  {kind} {}{name} -> pin {} ({polarity})", b.address, b.pin),
            }
        }

        self.digital_inputs.iter().for_each(|b| dump(IoKind::Di, b));
        self.digital_outputs.iter().for_each(|b| dump(IoKind::Do, b));
        self.analog_inputs.iter().for_each(|b| dump(IoKind::Ai, b));
        self.analog_outputs
            .iter()
            .for_each(|a| dump(IoKind::Ao, &a.binding));
    }

    pub fn digital_inputs(&self) -> &[Binding<bool>] {
        &self.digital_inputs
    }

    pub fn digital_outputs(&self) -> &[Binding<bool>] {
        &self.digital_outputs
    }

    pub fn analog_inputs(&self) -> &[Binding<u16>] {
        &self.analog_inputs
    }

    pub fn analog_outputs(&self) -> &[AnalogOutput] {
        &self.analog_outputs
    }

    /// Analog outputs with mutable change detectors.
    pub fn analog_outputs_mut(&mut self) -> &mut [AnalogOutput] {
        &mut self.analog_outputs
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Total number of bindings.
    pub fn len(&self) -> usize {
        self.digital_inputs.len()
            + self.digital_outputs.len()
            + self.analog_inputs.len()
            + self.analog_outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ProcessImage;
    use plc_common::located::LocatedVariable;
    use plc_hal::SimulationDriver;

    fn addr(s: &str) -> LocatedAddress {
        s.parse().unwrap()
    }

    #[test]
    fn setup_runs_grouped_and_once() {
        let vars: Vec<_> = ["%QW0", "%IX0.0", "%IW0", "%QX0.0"]
            .iter()
            .map(|a| LocatedVariable::new(addr(a)))
            .collect();
        let image = ProcessImage::from_located(&vars);
        let mut driver = SimulationDriver::new();
        let mut table = BindingTable::new();

        // Registration order deliberately differs from group order.
        let p = driver.claim("D8").unwrap();
        let v = image.lookup::<u16>(&addr("%QW0")).unwrap();
        table.register_analog_output(Binding::new(addr("%QW0"), "D8", p, v)).unwrap();
        let p = driver.claim("A0").unwrap();
        let v = image.lookup::<u16>(&addr("%IW0")).unwrap();
        table.register_analog_input(Binding::new(addr("%IW0"), "A0", p, v)).unwrap();
        let p = driver.claim("D0").unwrap();
        let v = image.lookup::<bool>(&addr("%QX0.0")).unwrap();
        table.register_digital_output(Binding::new(addr("%QX0.0"), "D0", p, v)).unwrap();
        let p = driver.claim("D4").unwrap();
        let v = image.lookup::<bool>(&addr("%IX0.0")).unwrap();
        table.register_digital_input(Binding::new(addr("%IX0.0"), "D4", p, v)).unwrap();

        table.setup_all(&mut driver).unwrap();
        table.setup_all(&mut driver).unwrap();
        table.dump_config();

        let history = driver.setup_history();
        let pins: Vec<&str> = history.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(pins, vec!["D4", "D0", "A0", "D8"]);
        assert!(table.is_frozen());
        assert_eq!(table.len(), 4);

        let extra = Binding::new(addr("%IX0.0"), "D4", PointId(0), image.lookup(&addr("%IX0.0")).unwrap());
        assert!(matches!(
            table.register_digital_input(extra),
            Err(BindingError::Frozen)
        ));
    }

    #[test]
    fn retry_after_failed_setup_skips_points_already_set_up() {
        let mut image = ProcessImage::new();
        let x = image.alloc(false);
        let y = image.alloc(false);
        let z = image.alloc(0u16);
        let mut driver = SimulationDriver::new();
        let d1 = driver.claim("D1").unwrap();
        let a0 = driver.claim("A0").unwrap();
        let mut table = BindingTable::new();
        table.register_digital_input(Binding::new(addr("%IX0.0"), "D1", d1, x)).unwrap();
        table.register_digital_output(Binding::new(addr("%QX0.0"), "D1", d1, y)).unwrap();
        table.register_analog_input(Binding::new(addr("%IW0"), "A0", a0, z)).unwrap();

        assert!(table.setup_all(&mut driver).is_err());
        assert!(table.setup_all(&mut driver).is_err());
        assert_eq!(driver.pin("D1").unwrap().setup_count, 1);
        assert_eq!(driver.pin("A0").unwrap().setup_count, 0);
        assert_eq!(driver.setup_history(), vec![("D1".to_string(), IoKind::Di)]);
        assert!(!table.is_frozen());
    }

    #[test]
    fn display_name_is_optional() {
        let mut image = ProcessImage::new();
        let v = image.alloc(false);
        let b = Binding::new(addr("%IX0.0"), "D4", PointId(0), v);
        assert_eq!(b.name, None);
        let b = b.with_name(Some("start button".to_string()));
        assert_eq!(b.name.as_deref(), Some("start button"));
    }

    #[test]
    fn same_point_twice_is_two_bindings() {
        let mut image = ProcessImage::new();
        let a = image.alloc(false);
        let b = image.alloc(false);
        let mut table = BindingTable::new();
        table.register_digital_input(Binding::new(addr("%IX0.0"), "D4", PointId(0), a)).unwrap();
        table.register_digital_input(Binding::new(addr("%IX0.1"), "D4", PointId(0), b)).unwrap();
        assert_eq!(table.digital_inputs().len(), 2);
    }

    #[test]
    fn table_full() {
        let mut image = ProcessImage::new();
        let mut table = BindingTable::new();
        for i in 0..MAX_BINDINGS {
            let v = image.alloc(false);
            let b = Binding::new(addr(&format!("%QX0.{i}")), "D0", PointId(0), v);
            table.register_digital_output(b).unwrap();
        }
        let v = image.alloc(false);
        let err = table
            .register_digital_output(Binding::new(addr("%QX1.0"), "D0", PointId(0), v))
            .unwrap_err();
        assert!(matches!(err, BindingError::TableFull { kind: IoKind::Do }));
    }

    #[test]
    fn failing_setup_names_the_binding() {
        let mut image = ProcessImage::new();
        let x = image.alloc(false);
        let y = image.alloc(false);
        let mut driver = SimulationDriver::new();
        let p = driver.claim("D1").unwrap();
        let mut table = BindingTable::new();
        table.register_digital_input(Binding::new(addr("%IX0.0"), "D1", p, x)).unwrap();
        table.register_digital_output(Binding::new(addr("%QX0.0"), "D1", p, y)).unwrap();

        let err = table.setup_all(&mut driver).unwrap_err();
        match err {
            BindingError::Setup { address, pin, source } => {
                assert_eq!(address, addr("%QX0.0"));
                assert_eq!(pin, "D1");
                assert!(matches!(source, HalError::ModeConflict { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!table.is_frozen());
    }
}
