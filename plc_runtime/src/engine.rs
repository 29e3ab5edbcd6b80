//! Interface to the external logic engine.
//!
//! A compiled program is opaque to the runtime. It declares the located
//! variables it uses, initializes once, and is stepped once per scan with
//! the tick counter and the software clock.
//!
//! `step` must return: the scan cycle has no way to interrupt it, and a
//! program that never returns stalls every following scan.

use plc_common::located::LocatedVariable;

use crate::clock::SoftClock;
use crate::image::ProcessImage;

/// Compiled logic program.
pub trait LogicEngine {
    /// Program name, for logging.
    fn name(&self) -> &str;

    /// Located variables the program reads or writes.
    fn located_variables(&self) -> Vec<LocatedVariable>;

    /// One-time initialization, before any point is set up.
    ///
    /// Programs resolve their variable handles here.
    fn initialize(&mut self, image: &mut ProcessImage);

    /// Execute one scan's worth of logic.
    fn step(&mut self, tick: u32, image: &mut ProcessImage, clock: &SoftClock);
}

impl<E: LogicEngine + ?Sized> LogicEngine for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn located_variables(&self) -> Vec<LocatedVariable> {
        (**self).located_variables()
    }

    fn initialize(&mut self, image: &mut ProcessImage) {
        (**self).initialize(image);
    }

    fn step(&mut self, tick: u32, image: &mut ProcessImage, clock: &SoftClock) {
        (**self).step(tick, image, clock);
    }
}
