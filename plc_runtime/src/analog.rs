//! Analog output deduplication and waveform translation.
//!
//! An analog output value is a 16-bit cell. When it changes, the value is
//! scaled to a level in `[0.0, 1.0]`, optionally inverted, and turned into
//! a waveform plan at the fixed carrier frequency:
//!
//! | on time | off time | Plan |
//! |---------|----------|------|
//! | 0 | period | static low |
//! | period | 0 | static high |
//! | otherwise | period - on | periodic, phase 0 |
//!
//! Levels are electrical: polarity is folded into the level before planning.

use plc_common::consts::PWM_FREQUENCY_HZ;
use plc_hal::driver::{PointId, WaveformOutput};

// ─── Deduplicator ───────────────────────────────────────────────────

/// Change detector for one output.
///
/// First call always reports a change; afterwards only values that differ
/// from the last recorded one do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deduplicator<T> {
    previous: Option<T>,
}

impl<T: Copy + PartialEq> Deduplicator<T> {
    pub const fn new() -> Self {
        Self { previous: None }
    }

    /// `true` if `value` must be emitted; records it in that case.
    #[inline]
    pub fn next(&mut self, value: T) -> bool {
        if self.previous == Some(value) {
            return false;
        }
        self.previous = Some(value);
        true
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }

    pub fn previous_value(&self) -> Option<T> {
        self.previous
    }
}

// ─── Waveform plan ──────────────────────────────────────────────────

/// How an output point must be driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveformPlan {
    /// Constant electrical level.
    Static { high: bool },
    /// Square wave, `on_us` high then `off_us` low.
    Periodic { on_us: u32, off_us: u32 },
}

impl WaveformPlan {
    /// Plan for `level` at `frequency_hz`. Levels outside `[0, 1]` saturate.
    pub fn for_level(level: f32, frequency_hz: f32) -> Self {
        let level = level.clamp(0.0, 1.0);
        let period_us = (1_000_000.0 / frequency_hz).round();
        let on_us = (period_us * level).round() as u32;
        let off_us = (period_us as u32).saturating_sub(on_us);

        if on_us == 0 {
            Self::Static { high: false }
        } else if off_us == 0 {
            Self::Static { high: true }
        } else {
            Self::Periodic { on_us, off_us }
        }
    }

    /// Issue the hardware commands for this plan.
    pub fn apply<W: WaveformOutput + ?Sized>(&self, out: &mut W, point: PointId) {
        match *self {
            Self::Static { high } => {
                out.stop_periodic(point);
                out.set_static_level(point, high);
            }
            Self::Periodic { on_us, off_us } => out.start_periodic(point, on_us, off_us, 0),
        }
    }
}

/// Level of a raw 16-bit value, `1 - level` when inverted.
#[inline]
pub fn level_from_raw(value: u16, inverted: bool) -> f32 {
    let level = f32::from(value) / f32::from(u16::MAX);
    if inverted { 1.0 - level } else { level }
}

/// Translate `value` and drive `point` at the standard carrier.
pub fn drive_analog_output<W: WaveformOutput + ?Sized>(
    out: &mut W,
    point: PointId,
    value: u16,
    inverted: bool,
) -> WaveformPlan {
    let plan = WaveformPlan::for_level(level_from_raw(value, inverted), PWM_FREQUENCY_HZ);
    plan.apply(out, point);
    plan
}
