//! Integration test: telemetry publication.
//!
//! Validates: publication order DI → DO → AI → AO regardless of
//! registration order, post-logic values, JSON lines output from config,
//! display names and sink paths relative to the config file.

use std::path::Path;

use plc_common::iec::IecValue;
use plc_hal::{IoDriver, SimulationDriver};
use plc_runtime::binding::{Binding, BindingTable};
use plc_runtime::config::{load_config, load_config_from_str};
use plc_runtime::cycle::{ScanCycle, ScanSettings};
use plc_runtime::engine::LogicEngine;
use plc_runtime::image::ProcessImage;
use plc_runtime::telemetry::{MemorySink, TelemetryHub};

use super::{NOT_GATE_TOML, NotGate, addr};

#[test]
fn publication_follows_group_order() {
    let engine = NotGate::default();
    let image = ProcessImage::from_located(&engine.located_variables());
    let mut driver = SimulationDriver::new();
    driver.set_digital_input("D4", false);
    driver.set_analog_input("A0", 42);

    let sink = MemorySink::new();
    let log = sink.log();
    let mut hub = TelemetryHub::new();
    let mem = Some(hub.add("mem", Box::new(sink)).unwrap());

    // Registered in reverse group order.
    let mut table = BindingTable::new();
    let qw = addr("%QW0");
    let p = driver.claim("D8").unwrap();
    table
        .register_analog_output(Binding::new(qw.clone(), "D8", p, image.lookup(&qw).unwrap()).with_sink(mem))
        .unwrap();
    let iw = addr("%IW0");
    let p = driver.claim("A0").unwrap();
    table
        .register_analog_input(Binding::new(iw.clone(), "A0", p, image.lookup(&iw).unwrap()).with_sink(mem))
        .unwrap();
    let qx = addr("%QX0.0");
    let p = driver.claim("D0").unwrap();
    table
        .register_digital_output(Binding::new(qx.clone(), "D0", p, image.lookup(&qx).unwrap()).with_sink(mem))
        .unwrap();
    let ix = addr("%IX0.0");
    let p = driver.claim("D4").unwrap();
    table
        .register_digital_input(Binding::new(ix.clone(), "D4", p, image.lookup(&ix).unwrap()).with_sink(mem))
        .unwrap();

    let mut cycle = ScanCycle::new(driver, engine, image, table, hub, ScanSettings::default());
    cycle.scan_once().unwrap();

    let samples = log.borrow();
    let published: Vec<(String, IecValue)> = samples
        .iter()
        .map(|s| (s.address.to_string(), s.value))
        .collect();
    assert_eq!(
        published,
        vec![
            ("%IX0.0".to_string(), IecValue::Bool(false)),
            ("%QX0.0".to_string(), IecValue::Bool(true)),
            ("%IW0".to_string(), IecValue::Uint(42)),
            ("%QW0".to_string(), IecValue::Uint(42)),
        ]
    );
}

#[test]
fn bindings_without_sink_are_not_published() {
    let engine = NotGate::default();
    let image = ProcessImage::from_located(&engine.located_variables());
    let mut driver = SimulationDriver::new();
    let sink = MemorySink::new();
    let log = sink.log();
    let mut hub = TelemetryHub::new();
    let mem = hub.add("mem", Box::new(sink)).unwrap();

    let mut table = BindingTable::new();
    let ix = addr("%IX0.0");
    let p = driver.claim("D4").unwrap();
    table
        .register_digital_input(Binding::new(ix.clone(), "D4", p, image.lookup(&ix).unwrap()))
        .unwrap();
    let qx = addr("%QX0.0");
    let p = driver.claim("D0").unwrap();
    table
        .register_digital_output(Binding::new(qx.clone(), "D0", p, image.lookup(&qx).unwrap()).with_sink(Some(mem)))
        .unwrap();

    let mut cycle = ScanCycle::new(driver, engine, image, table, hub, ScanSettings::default());
    for _ in 0..4 {
        cycle.scan_once().unwrap();
    }
    let samples = log.borrow();
    assert_eq!(samples.len(), 4);
    assert!(samples.iter().all(|s| s.address == qx));
}

#[test]
fn json_lines_sink_configured_from_toml() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("telemetry.jsonl");
    let toml = NOT_GATE_TOML
        .replace(
            "pin = \"D4\"\n",
            "pin = \"D4\"\nsink = \"file\"\n",
        )
        .replace("[plc]", &format!("[sinks.file]\nkind = \"json_lines\"\npath = {:?}\n\n[plc]", out.display().to_string()));
    let loaded = load_config_from_str(&toml, Path::new(".")).unwrap();

    let mut driver = SimulationDriver::new();
    driver.set_digital_input("D4", true);
    let mut cycle = ScanCycle::from_config(&loaded, driver, NotGate::default()).unwrap();
    cycle.scan_once().unwrap();
    cycle.scan_once().unwrap();
    cycle.shutdown().unwrap();

    let content = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], r#"{"variable":"%IX0.0","value":true}"#);
}

#[test]
fn display_name_and_relative_sink_path_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let toml = NOT_GATE_TOML
        .replace(
            "pin = \"D4\"\n",
            "pin = \"D4\"\nname = \"start button\"\nsink = \"file\"\n",
        )
        .replace(
            "[plc]",
            "[sinks.file]\nkind = \"json_lines\"\npath = \"telemetry.jsonl\"\n\n[plc]",
        );
    let path = dir.path().join("plc.toml");
    std::fs::write(&path, toml).unwrap();
    let loaded = load_config(&path).unwrap();

    let mut driver = SimulationDriver::new();
    driver.set_digital_input("D4", true);
    let mut cycle = ScanCycle::from_config(&loaded, driver, NotGate::default()).unwrap();
    assert_eq!(
        cycle.table().digital_inputs()[0].name.as_deref(),
        Some("start button")
    );
    cycle.scan_once().unwrap();
    cycle.shutdown().unwrap();

    let content = std::fs::read_to_string(dir.path().join("telemetry.jsonl")).unwrap();
    assert_eq!(
        content,
        "{\"variable\":\"%IX0.0\",\"name\":\"start button\",\"value\":true}\n"
    );
}
