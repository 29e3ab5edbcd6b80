//! Simulation driver module.
//!
//! Software simulation driver for development and testing without physical
//! hardware.

mod driver;
mod io;

pub use driver::SimulationDriver;
pub use io::{PinDrive, SimPin};

use crate::driver::IoDriver;

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Box<dyn IoDriver> {
    Box::new(SimulationDriver::new())
}
