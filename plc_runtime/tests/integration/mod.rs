//! Integration test modules and shared fixtures.

mod scan;
mod startup;
mod telemetry;

use plc_common::located::{LocatedAddress, LocatedVariable};
use plc_runtime::clock::SoftClock;
use plc_runtime::engine::LogicEngine;
use plc_runtime::image::{ProcessImage, Var};

pub fn addr(s: &str) -> LocatedAddress {
    s.parse().expect("valid address")
}

/// `%QX0.0 := NOT %IX0.0`, `%QW0 := %IW0`.
///
/// Records the order of lifecycle calls in `calls`.
#[derive(Default)]
pub struct NotGate {
    x: Option<Var<bool>>,
    y: Option<Var<bool>>,
    ain: Option<Var<u16>>,
    aout: Option<Var<u16>>,
    pub calls: Vec<String>,
}

impl LogicEngine for NotGate {
    fn name(&self) -> &str {
        "not_gate"
    }

    fn located_variables(&self) -> Vec<LocatedVariable> {
        ["%IX0.0", "%QX0.0", "%IW0", "%QW0"]
            .iter()
            .map(|a| LocatedVariable::new(addr(a)))
            .collect()
    }

    fn initialize(&mut self, image: &mut ProcessImage) {
        self.x = image.lookup(&addr("%IX0.0")).ok();
        self.y = image.lookup(&addr("%QX0.0")).ok();
        self.ain = image.lookup(&addr("%IW0")).ok();
        self.aout = image.lookup(&addr("%QW0")).ok();
        self.calls.push("initialize".to_string());
    }

    fn step(&mut self, tick: u32, image: &mut ProcessImage, _clock: &SoftClock) {
        if let (Some(x), Some(y)) = (self.x, self.y) {
            image.set(y, !image.get(x));
        }
        if let (Some(i), Some(o)) = (self.ain, self.aout) {
            image.set(o, image.get(i));
        }
        self.calls.push(format!("step {tick}"));
    }
}

/// Config binding the `NotGate` variables to the ESP8266 pins.
pub const NOT_GATE_TOML: &str = r#"
[shared]
service_name = "itest"

[plc]
tick_time_ns = 20000000

[[bindings]]
variable = "%IX0.0"
pin = "D4"

[[bindings]]
variable = "%QX0.0"
pin = "D0"

[[bindings]]
variable = "%IW0"
pin = "A0"

[[bindings]]
variable = "%QW0"
pin = "D8"
"#;
