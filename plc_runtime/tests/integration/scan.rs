//! Integration test: scan body semantics.
//!
//! Validates: `Y = NOT X` end to end, polarity handling, input capture
//! idempotence, analog output deduplication, clock and tick progression.

use std::path::Path;

use plc_hal::SimulationDriver;
use plc_hal::drivers::simulation::PinDrive;
use plc_runtime::config::load_config_from_str;
use plc_runtime::cycle::ScanCycle;

use super::{NOT_GATE_TOML, NotGate, addr};

fn not_gate_cycle(toml: &str) -> ScanCycle<SimulationDriver, NotGate> {
    let loaded = load_config_from_str(toml, Path::new(".")).expect("config");
    ScanCycle::from_config(&loaded, SimulationDriver::new(), NotGate::default()).expect("cycle")
}

fn inverted(toml: &str, pin: &str) -> String {
    toml.replace(
        &format!("pin = \"{pin}\"\n"),
        &format!("pin = \"{pin}\"\ninverted = true\n"),
    )
}

#[test]
fn output_is_negated_input() {
    let mut cycle = not_gate_cycle(NOT_GATE_TOML);

    cycle.driver_mut().set_digital_input("D4", true);
    cycle.scan_once().unwrap();
    assert_eq!(cycle.driver().output_level("D0"), Some(false));

    cycle.driver_mut().set_digital_input("D4", false);
    cycle.scan_once().unwrap();
    assert_eq!(cycle.driver().output_level("D0"), Some(true));
}

#[test]
fn inverted_digital_points_flip_both_ways() {
    let toml = inverted(&inverted(NOT_GATE_TOML, "D4"), "D0");
    let mut cycle = not_gate_cycle(&toml);

    // High pin reads as FALSE, Y = TRUE, written inverted as low.
    cycle.driver_mut().set_digital_input("D4", true);
    cycle.scan_once().unwrap();
    let x = cycle.image().lookup::<bool>(&addr("%IX0.0")).unwrap();
    assert!(!cycle.image().get(x));
    assert_eq!(cycle.driver().output_level("D0"), Some(false));

    cycle.driver_mut().set_digital_input("D4", false);
    cycle.scan_once().unwrap();
    assert_eq!(cycle.driver().output_level("D0"), Some(true));
}

#[test]
fn input_capture_is_idempotent() {
    let mut cycle = not_gate_cycle(NOT_GATE_TOML);
    cycle.start().unwrap();
    cycle.driver_mut().set_digital_input("D4", true);
    cycle.driver_mut().set_analog_input("A0", 333);

    cycle.capture_inputs();
    let first: Vec<_> = cycle.image().located().map(|(a, v)| (a.clone(), v)).collect();
    cycle.capture_inputs();
    let second: Vec<_> = cycle.image().located().map(|(a, v)| (a.clone(), v)).collect();
    assert_eq!(first, second);

    let ain = cycle.image().lookup::<u16>(&addr("%IW0")).unwrap();
    assert_eq!(cycle.image().get(ain), 333);
}

#[test]
fn inverted_analog_input_subtracts_full_scale() {
    let toml = inverted(NOT_GATE_TOML, "A0");
    let mut cycle = not_gate_cycle(&toml);
    cycle.driver_mut().set_analog_input("A0", 100);
    cycle.scan_once().unwrap();

    let ain = cycle.image().lookup::<u16>(&addr("%IW0")).unwrap();
    assert_eq!(cycle.image().get(ain), 100u16.wrapping_sub(1 << 10));
}

#[test]
fn analog_output_emits_only_on_change() {
    let mut cycle = not_gate_cycle(NOT_GATE_TOML);

    // First scan always emits, even for zero: stop + static low.
    cycle.scan_once().unwrap();
    assert_eq!(cycle.driver().drive("D8"), Some(PinDrive::Static(false)));
    assert_eq!(cycle.driver().waveform_commands(), 2);

    for _ in 0..5 {
        cycle.scan_once().unwrap();
    }
    assert_eq!(cycle.driver().waveform_commands(), 2);

    cycle.driver_mut().set_analog_input("A0", u16::MAX / 2);
    cycle.scan_once().unwrap();
    assert_eq!(
        cycle.driver().drive("D8"),
        Some(PinDrive::Periodic {
            on_us: 500,
            off_us: 500,
            phase_us: 0
        })
    );
    assert_eq!(cycle.driver().waveform_commands(), 3);

    cycle.driver_mut().set_analog_input("A0", u16::MAX);
    cycle.scan_once().unwrap();
    assert_eq!(cycle.driver().drive("D8"), Some(PinDrive::Static(true)));
    assert_eq!(cycle.driver().waveform_commands(), 5);
}

#[test]
fn inverted_analog_output_drives_complement() {
    let toml = inverted(NOT_GATE_TOML, "D8");
    let mut cycle = not_gate_cycle(&toml);
    let raw = (0.3 * f32::from(u16::MAX)).round() as u16;
    cycle.driver_mut().set_analog_input("A0", raw);
    cycle.scan_once().unwrap();

    let drive = cycle.driver().drive("D8").unwrap();
    assert_eq!(
        drive,
        PinDrive::Periodic {
            on_us: 700,
            off_us: 300,
            phase_us: 0
        }
    );
}

#[test]
fn inputs_are_never_written_back() {
    let mut cycle = not_gate_cycle(NOT_GATE_TOML);
    cycle.driver_mut().set_digital_input("D4", true);
    for _ in 0..3 {
        cycle.scan_once().unwrap();
    }

    assert_eq!(cycle.driver().drive("D4"), Some(PinDrive::Released));
    assert_eq!(cycle.driver().drive("A0"), Some(PinDrive::Released));
    // One DO binding, one write per scan.
    assert_eq!(cycle.driver().digital_writes(), 3);
}

#[test]
fn tick_and_clock_advance_per_scan() {
    let mut cycle = not_gate_cycle(NOT_GATE_TOML);
    for _ in 0..50 {
        cycle.scan_once().unwrap();
    }

    assert_eq!(cycle.tick(), 50);
    assert_eq!(cycle.clock().seconds(), 1);
    assert_eq!(cycle.clock().nanoseconds(), 0);

    let calls = &cycle.engine().calls;
    assert_eq!(calls.len(), 51);
    assert_eq!(calls[1], "step 0");
    assert_eq!(calls[50], "step 49");
}
