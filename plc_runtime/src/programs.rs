//! Built-in demo programs.
//!
//! Stand-ins for a compiled program, used to exercise a configuration
//! against the simulation driver:
//!
//! - `loopback` copies every `%IXa.b` to `%QXa.b` and every `%IWn` to `%QWn`
//! - `blink` toggles `%QX0.0` each second of the software clock and ramps
//!   `%QW0` every scan

use plc_common::io::config::BindingConfig;
use plc_common::io::kind::IoKind;
use plc_common::located::{LocatedAddress, LocatedVariable, Location, Size};
use tracing::debug;

use crate::clock::SoftClock;
use crate::engine::LogicEngine;
use crate::image::{ProcessImage, Var};

/// Names accepted by [`create_program`].
pub const PROGRAM_NAMES: [&str; 2] = ["loopback", "blink"];

/// Instantiate a demo program.
///
/// `vars` is the variable set the program operates on; programs with a
/// fixed variable set ignore it.
pub fn create_program(name: &str, vars: Vec<LocatedVariable>) -> Option<Box<dyn LogicEngine>> {
    match name {
        "loopback" => Some(Box::new(Loopback::new(vars))),
        "blink" => Some(Box::new(Blink::new())),
        _ => None,
    }
}

/// Variables of a binding list, deduplicated, in binding order.
pub fn variables_of(bindings: &[BindingConfig]) -> Vec<LocatedVariable> {
    let mut vars: Vec<LocatedVariable> = Vec::with_capacity(bindings.len());
    for b in bindings {
        if !vars.iter().any(|v| v.address == b.variable) {
            vars.push(LocatedVariable::new(b.variable.clone()));
        }
    }
    vars
}

// ─── Loopback ───────────────────────────────────────────────────────

/// Mirrors inputs onto the outputs with the same indices.
#[derive(Debug, Default)]
pub struct Loopback {
    vars: Vec<LocatedVariable>,
    digital: Vec<(Var<bool>, Var<bool>)>,
    analog: Vec<(Var<u16>, Var<u16>)>,
}

impl Loopback {
    pub fn new(vars: Vec<LocatedVariable>) -> Self {
        Self {
            vars,
            ..Self::default()
        }
    }

    /// Number of input/output pairs wired after initialization.
    pub fn pair_count(&self) -> usize {
        self.digital.len() + self.analog.len()
    }
}

fn output_of(input: &LocatedAddress) -> LocatedAddress {
    LocatedAddress {
        location: Location::Output,
        ..input.clone()
    }
}

impl LogicEngine for Loopback {
    fn name(&self) -> &str {
        "loopback"
    }

    fn located_variables(&self) -> Vec<LocatedVariable> {
        self.vars.clone()
    }

    fn initialize(&mut self, image: &mut ProcessImage) {
        self.digital.clear();
        self.analog.clear();

        for var in &self.vars {
            let input = &var.address;
            let output = output_of(input);
            match IoKind::of(input) {
                Some(IoKind::Di) => match (image.lookup(input), image.lookup(&output)) {
                    (Ok(i), Ok(o)) => self.digital.push((i, o)),
                    _ => debug!("loopback: no output for {input}"),
                },
                Some(IoKind::Ai) => match (image.lookup(input), image.lookup(&output)) {
                    (Ok(i), Ok(o)) => self.analog.push((i, o)),
                    _ => debug!("loopback: no output for {input}"),
                },
                _ => {}
            }
        }
    }

    fn step(&mut self, _tick: u32, image: &mut ProcessImage, _clock: &SoftClock) {
        for &(i, o) in &self.digital {
            image.set(o, image.get(i));
        }
        for &(i, o) in &self.analog {
            image.set(o, image.get(i));
        }
    }
}

// ─── Blink ──────────────────────────────────────────────────────────

/// `%QW0` increment per scan.
const RAMP_STEP: u16 = 1024;

/// Square wave on `%QX0.0`, sawtooth on `%QW0`.
#[derive(Debug, Default)]
pub struct Blink {
    lamp: Option<Var<bool>>,
    ramp: Option<Var<u16>>,
}

impl Blink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lamp_address() -> LocatedAddress {
        LocatedAddress::new(Location::Output, Size::Bit, &[0, 0])
    }

    fn ramp_address() -> LocatedAddress {
        LocatedAddress::new(Location::Output, Size::Word, &[0])
    }
}

impl LogicEngine for Blink {
    fn name(&self) -> &str {
        "blink"
    }

    fn located_variables(&self) -> Vec<LocatedVariable> {
        vec![
            LocatedVariable::new(Self::lamp_address()),
            LocatedVariable::new(Self::ramp_address()),
        ]
    }

    fn initialize(&mut self, image: &mut ProcessImage) {
        self.lamp = image.lookup(&Self::lamp_address()).ok();
        self.ramp = image.lookup(&Self::ramp_address()).ok();
    }

    fn step(&mut self, _tick: u32, image: &mut ProcessImage, clock: &SoftClock) {
        if let Some(lamp) = self.lamp {
            image.set(lamp, clock.seconds() % 2 == 1);
        }
        if let Some(ramp) = self.ramp {
            image.set(ramp, image.get(ramp).wrapping_add(RAMP_STEP));
        }
    }
}
