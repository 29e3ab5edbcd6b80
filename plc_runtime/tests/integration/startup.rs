//! Integration test: startup sequence.
//!
//! Validates: config loading → coverage validation → program
//! initialization before point setup → setup order DI → DO → AI → AO,
//! exactly once, also when setup fails.

use std::path::Path;

use plc_common::io::kind::IoKind;
use plc_hal::{DriverRegistry, HalError, IoDriver, SimulationDriver};
use plc_runtime::binding::BindingError;
use plc_runtime::config::{RuntimeConfigError, load_config, load_config_from_str};
use plc_runtime::cycle::{CycleError, ScanCycle};
use plc_runtime::engine::LogicEngine;
use plc_runtime::programs;

use super::{NOT_GATE_TOML, NotGate, addr};

const MINIMAL_TOML: &str = r#"
[shared]
service_name = "itest"
"#;

#[test]
fn initialize_precedes_setup_and_both_run_once() {
    let loaded = load_config_from_str(NOT_GATE_TOML, Path::new(".")).unwrap();
    let mut cycle = ScanCycle::from_config(&loaded, SimulationDriver::new(), NotGate::default()).unwrap();
    assert!(cycle.driver().setup_history().is_empty());
    assert!(cycle.engine().calls.is_empty());

    cycle.start().unwrap();
    cycle.start().unwrap();
    cycle.scan_once().unwrap();

    assert_eq!(cycle.engine().calls, vec!["initialize", "step 0"]);
    let history = cycle.driver().setup_history();
    assert_eq!(
        history,
        vec![
            ("D4".to_string(), IoKind::Di),
            ("D0".to_string(), IoKind::Do),
            ("A0".to_string(), IoKind::Ai),
            ("D8".to_string(), IoKind::Ao),
        ]
    );
    for pin in ["D4", "D0", "A0", "D8"] {
        assert_eq!(cycle.driver().pin(pin).unwrap().setup_count, 1);
    }
}

#[test]
fn unbound_program_variable_is_rejected() {
    let toml = NOT_GATE_TOML.replace(
        "[[bindings]]\nvariable = \"%QW0\"\npin = \"D8\"\n",
        "",
    );
    let loaded = load_config_from_str(&toml, Path::new(".")).unwrap();
    let result = ScanCycle::from_config(&loaded, SimulationDriver::new(), NotGate::default());

    match result {
        Err(CycleError::Config(RuntimeConfigError::UnboundVariable(a))) => {
            assert_eq!(a, addr("%QW0"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected UnboundVariable"),
    }
}

#[test]
fn default_pin_map_skips_unused_bindings() {
    let loaded = load_config_from_str(MINIMAL_TOML, Path::new(".")).unwrap();
    assert_eq!(loaded.bindings.len(), 10);

    let mut cycle = ScanCycle::from_config(&loaded, SimulationDriver::new(), NotGate::default()).unwrap();
    cycle.start().unwrap();
    assert_eq!(cycle.table().len(), 4);
    assert_eq!(cycle.driver().setup_history().len(), 4);
    assert!(cycle.driver().pin("D5").is_none());
}

#[test]
fn conflicting_pin_modes_abort_startup() {
    let toml = NOT_GATE_TOML.replace("pin = \"D0\"", "pin = \"D4\"");
    let loaded = load_config_from_str(&toml, Path::new(".")).unwrap();
    let mut cycle = ScanCycle::from_config(&loaded, SimulationDriver::new(), NotGate::default()).unwrap();

    match cycle.start() {
        Err(CycleError::Binding(BindingError::Setup { address, source, .. })) => {
            assert_eq!(address, addr("%QX0.0"));
            assert!(matches!(source, HalError::ModeConflict { .. }));
        }
        other => panic!("expected setup failure, got {other:?}"),
    }
    assert!(!cycle.is_started());
}

#[test]
fn failed_startup_is_final() {
    let toml = NOT_GATE_TOML.replace("pin = \"D0\"", "pin = \"D4\"");
    let loaded = load_config_from_str(&toml, Path::new(".")).unwrap();
    let mut cycle = ScanCycle::from_config(&loaded, SimulationDriver::new(), NotGate::default()).unwrap();

    assert!(matches!(
        cycle.start(),
        Err(CycleError::Binding(BindingError::Setup { .. }))
    ));
    assert!(matches!(cycle.scan_once(), Err(CycleError::StartupFailed)));
    assert!(matches!(cycle.start(), Err(CycleError::StartupFailed)));

    assert_eq!(cycle.engine().calls, vec!["initialize"]);
    assert_eq!(cycle.driver().pin("D4").unwrap().setup_count, 1);
    assert_eq!(
        cycle.driver().setup_history(),
        vec![("D4".to_string(), IoKind::Di)]
    );
    assert_eq!(cycle.tick(), 0);
    assert!(!cycle.is_started());
}

#[test]
fn simulation_inputs_come_from_config() {
    let toml = format!("{NOT_GATE_TOML}\n[simulation]\ndigital_inputs = {{ D4 = true }}\n");
    let loaded = load_config_from_str(&toml, Path::new(".")).unwrap();
    let mut cycle = ScanCycle::from_config(&loaded, SimulationDriver::new(), NotGate::default()).unwrap();
    cycle.scan_once().unwrap();
    assert_eq!(cycle.driver().output_level("D0"), Some(false));
}

#[test]
fn boxed_driver_and_program_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plc.toml");
    std::fs::write(&path, MINIMAL_TOML).unwrap();
    let loaded = load_config(&path).unwrap();

    let driver = DriverRegistry::with_builtin_drivers()
        .create_driver("simulation")
        .unwrap();
    let program = programs::create_program("loopback", programs::variables_of(&loaded.bindings)).unwrap();
    assert_eq!(program.name(), "loopback");

    let mut cycle = ScanCycle::from_config(&loaded, driver, program).unwrap();
    for _ in 0..3 {
        cycle.scan_once().unwrap();
    }
    assert_eq!(cycle.tick(), 3);
    assert_eq!(cycle.table().len(), 10);
    assert_eq!(cycle.driver().name(), "simulation");
    cycle.shutdown().unwrap();
}
