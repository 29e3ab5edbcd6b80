//! Deterministic scan cycle: inputs → logic → outputs → clock → telemetry.
//!
//! ## Startup
//! 1. `engine.initialize()` resolves the program's variable handles.
//! 2. `BindingTable::setup_all()` sets up every point, DI → DO → AI → AO.
//!
//! Startup runs once, either explicitly through [`ScanCycle::start`] or
//! lazily on the first scan.
//!
//! ## Scan body
//! 1. Input capture: DI levels and AI samples into the process image.
//! 2. Logic step with the current tick, then the tick increments.
//! 3. Output emission: DO levels, AO values through the deduplicator.
//! 4. Clock advance by the tick time.
//! 5. Telemetry for every binding with a sink.
//!
//! ## Pacing
//! Simulation mode sleeps for the remainder of each poll period. With the
//! `rt` feature the loop sleeps to absolute deadlines on `CLOCK_MONOTONIC`.
//! Overruns are counted, never fatal.

use std::sync::atomic::{AtomicBool, Ordering};

use plc_common::consts::{DEFAULT_ADC_RESOLUTION, DEFAULT_TICK_TIME_NS, NANOS_PER_SEC};
use plc_common::iec::IecType;
use plc_common::io::kind::IoKind;
use plc_hal::driver::{HalError, IoDriver};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analog::drive_analog_output;
use crate::binding::{Binding, BindingError, BindingTable};
use crate::clock::SoftClock;
use crate::config::{LoadedConfig, RuntimeConfigError};
use crate::engine::LogicEngine;
use crate::image::{ImageError, ProcessImage};
use crate::telemetry::{TelemetryError, TelemetryHub};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Cycles that took longer than the poll period.
    pub overruns: u64,
    /// Maximum wake-up latency [ns].
    pub max_latency_ns: i64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(duration_ns);
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Startup and loop errors. Scans themselves never fail.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("RT setup error: {0}")]
    RtSetup(String),

    #[error(transparent)]
    Config(#[from] RuntimeConfigError),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error("HAL error: {0}")]
    Hal(#[from] HalError),

    #[error("process image: {0}")]
    Image(#[from] ImageError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error("invalid scan settings: {0}")]
    InvalidSettings(String),

    #[error("startup failed earlier, scan cycle cannot run")]
    StartupFailed,
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Lock all current and future memory pages.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Pin the current thread to a CPU core.
#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

/// SCHED_FIFO with the given priority.
#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` is a valid sched_param for the duration of the call.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Memory locking, CPU affinity and real-time scheduling.
///
/// All no-ops without the `rt` feature.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Scan Settings ──────────────────────────────────────────────────

/// Timing and conversion parameters of a scan cycle.
///
/// Invariant: `1000 <= tick_time_ns < 1 s` and `adc_resolution <= 16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    tick_time_ns: u32,
    adc_resolution: u8,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            tick_time_ns: DEFAULT_TICK_TIME_NS as u32,
            adc_resolution: DEFAULT_ADC_RESOLUTION,
        }
    }
}

impl ScanSettings {
    /// Validated settings.
    ///
    /// # Errors
    /// `CycleError::InvalidSettings` if the tick time is outside
    /// `[1 µs, 1 s)` or the ADC resolution exceeds 16 bits.
    pub fn new(tick_time_ns: u64, adc_resolution: u8) -> Result<Self, CycleError> {
        if !(1000..u64::from(NANOS_PER_SEC)).contains(&tick_time_ns) {
            return Err(CycleError::InvalidSettings(format!(
                "tick_time_ns must be in [1000, 1000000000), got {tick_time_ns}"
            )));
        }
        if adc_resolution > 16 {
            return Err(CycleError::InvalidSettings(format!(
                "adc_resolution must be <= 16 bits, got {adc_resolution}"
            )));
        }
        Ok(Self {
            tick_time_ns: tick_time_ns as u32,
            adc_resolution,
        })
    }

    /// Clock increment per scan and poll period [ns].
    #[inline]
    pub fn tick_time_ns(&self) -> u32 {
        self.tick_time_ns
    }

    /// ADC resolution [bits].
    pub fn adc_resolution(&self) -> u8 {
        self.adc_resolution
    }

    /// Poll period [µs].
    pub fn poll_period_us(&self) -> u64 {
        u64::from(self.tick_time_ns) / 1000
    }

    /// Full-scale offset subtracted from inverted analog samples.
    #[inline]
    fn adc_full_scale(&self) -> u16 {
        1u32.checked_shl(u32::from(self.adc_resolution))
            .map_or(0, |v| v as u16)
    }
}

// ─── Scan Cycle ─────────────────────────────────────────────────────

/// Startup progress. `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Startup {
    Pending,
    Ready,
    Failed,
}

/// The scan-cycle scheduler.
///
/// Owns the driver, the program, the process image, the binding table and
/// the telemetry sinks. Every phase takes `&mut self`, so phases never
/// overlap.
pub struct ScanCycle<D: IoDriver, E: LogicEngine> {
    driver: D,
    engine: E,
    image: ProcessImage,
    table: BindingTable,
    telemetry: TelemetryHub,
    settings: ScanSettings,
    clock: SoftClock,
    tick: u32,
    startup: Startup,
    stats: CycleStats,
}

impl<D: IoDriver, E: LogicEngine> ScanCycle<D, E> {
    /// Assemble a scan cycle from prepared parts.
    pub fn new(
        driver: D,
        engine: E,
        image: ProcessImage,
        table: BindingTable,
        telemetry: TelemetryHub,
        settings: ScanSettings,
    ) -> Self {
        Self {
            driver,
            engine,
            image,
            table,
            telemetry,
            settings,
            clock: SoftClock::new(),
            tick: 0,
            startup: Startup::Pending,
            stats: CycleStats::new(),
        }
    }

    /// Build a scan cycle from a loaded configuration.
    ///
    /// Initializes the driver, allocates the process image from the
    /// program's variables, checks binding coverage, claims pins and fills
    /// the binding table. Bindings for variables the program does not use
    /// are skipped.
    pub fn from_config(loaded: &LoadedConfig, mut driver: D, engine: E) -> Result<Self, CycleError> {
        driver.init(&loaded.plc)?;

        let used = engine.located_variables();
        loaded.check_coverage(&used)?;
        let image = ProcessImage::from_located(&used);
        let telemetry = TelemetryHub::from_config(&loaded.plc.sinks, &loaded.base_dir)?;

        let mut table = BindingTable::new();
        for cfg in &loaded.bindings {
            if !image.contains(&cfg.variable) {
                debug!("{} not used by {}, binding skipped", cfg.variable, engine.name());
                continue;
            }
            let Some(kind) = IoKind::of(&cfg.variable) else {
                continue;
            };
            let point = driver.claim(&cfg.pin)?;
            let sink = cfg
                .sink
                .as_deref()
                .map(|name| telemetry.resolve(name))
                .transpose()?;

            match kind {
                IoKind::Di => table.register_digital_input(
                    Binding::new(cfg.variable.clone(), &cfg.pin, point, image.lookup(&cfg.variable)?)
                        .with_sink(sink)
                        .with_inverted(cfg.inverted)
                        .with_name(cfg.name.clone()),
                )?,
                IoKind::Do => table.register_digital_output(
                    Binding::new(cfg.variable.clone(), &cfg.pin, point, image.lookup(&cfg.variable)?)
                        .with_sink(sink)
                        .with_inverted(cfg.inverted)
                        .with_name(cfg.name.clone()),
                )?,
                IoKind::Ai => table.register_analog_input(
                    Binding::new(cfg.variable.clone(), &cfg.pin, point, image.lookup(&cfg.variable)?)
                        .with_sink(sink)
                        .with_inverted(cfg.inverted)
                        .with_name(cfg.name.clone()),
                )?,
                IoKind::Ao => table.register_analog_output(
                    Binding::new(cfg.variable.clone(), &cfg.pin, point, image.lookup(&cfg.variable)?)
                        .with_sink(sink)
                        .with_inverted(cfg.inverted)
                        .with_name(cfg.name.clone()),
                )?,
            }
        }

        let settings = ScanSettings::new(loaded.tick_time_ns(), loaded.adc_resolution())?;
        Ok(Self::new(driver, engine, image, table, telemetry, settings))
    }

    /// Initialize the program and set up every point. Runs once.
    ///
    /// A failed startup is final: later calls, and every scan, return
    /// `CycleError::StartupFailed` without touching the program or the
    /// driver again.
    pub fn start(&mut self) -> Result<(), CycleError> {
        match self.startup {
            Startup::Ready => return Ok(()),
            Startup::Failed => return Err(CycleError::StartupFailed),
            Startup::Pending => {}
        }
        info!(
            "Starting program '{}' on driver {} v{}",
            self.engine.name(),
            self.driver.name(),
            self.driver.version()
        );
        self.engine.initialize(&mut self.image);
        if let Err(e) = self.table.setup_all(&mut self.driver) {
            self.startup = Startup::Failed;
            return Err(e.into());
        }
        self.startup = Startup::Ready;

        info!(
            "Scan cycle ready: tick_time={}ns, poll_period={}us, {} bindings",
            self.settings.tick_time_ns(),
            self.settings.poll_period_us(),
            self.table.len()
        );
        self.table.dump_config();
        Ok(())
    }

    /// Run one complete scan.
    pub fn scan_once(&mut self) -> Result<(), CycleError> {
        if self.startup != Startup::Ready {
            self.start()?;
        }
        self.capture_inputs();
        self.run_logic();
        self.emit_outputs();
        self.clock.advance(self.settings.tick_time_ns());
        self.publish_telemetry();
        Ok(())
    }

    /// Sample every input point into the process image.
    pub fn capture_inputs(&mut self) {
        for b in self.table.digital_inputs() {
            let level = self.driver.digital_read(b.point) ^ b.inverted;
            self.image.set(b.variable, level);
        }

        let full_scale = self.settings.adc_full_scale();
        for b in self.table.analog_inputs() {
            let mut sample = self.driver.analog_read(b.point);
            if b.inverted {
                sample = sample.wrapping_sub(full_scale);
            }
            self.image.set(b.variable, sample);
        }
    }

    fn run_logic(&mut self) {
        self.engine.step(self.tick, &mut self.image, &self.clock);
        self.tick = self.tick.wrapping_add(1);
    }

    fn emit_outputs(&mut self) {
        for b in self.table.digital_outputs() {
            let level = self.image.get(b.variable) ^ b.inverted;
            self.driver.digital_write(b.point, level);
        }

        for ao in self.table.analog_outputs_mut() {
            let value = self.image.get(ao.binding.variable);
            if ao.dedup.next(value) {
                let plan = drive_analog_output(&mut self.driver, ao.binding.point, value, ao.binding.inverted);
                debug!("{} = {} -> {:?}", ao.binding.address, value, plan);
            }
        }
    }

    fn publish_telemetry(&mut self) {
        for b in self.table.digital_inputs().iter().chain(self.table.digital_outputs()) {
            if let Some(sink) = b.sink {
                self.telemetry.publish(sink, &b.address, b.name.as_deref(), self.image.get(b.variable).into_value());
            }
        }
        let analog_outputs = self.table.analog_outputs().iter().map(|a| &a.binding);
        for b in self.table.analog_inputs().iter().chain(analog_outputs) {
            if let Some(sink) = b.sink {
                self.telemetry.publish(sink, &b.address, b.name.as_deref(), self.image.get(b.variable).into_value());
            }
        }
    }

    /// Run paced scans until `running` clears or `max_cycles` scans are done.
    pub fn run(&mut self, running: &AtomicBool, max_cycles: Option<u64>) -> Result<(), CycleError> {
        self.start()?;

        #[cfg(feature = "rt")]
        {
            self.run_rt_loop(running, max_cycles)
        }

        #[cfg(not(feature = "rt"))]
        {
            self.run_sim_loop(running, max_cycles)
        }
    }

    fn keep_running(&self, running: &AtomicBool, max_cycles: Option<u64>) -> bool {
        running.load(Ordering::SeqCst) && max_cycles.is_none_or(|max| self.stats.cycle_count < max)
    }

    fn record_cycle(&mut self, duration_ns: i64, latency_ns: i64) {
        self.stats.record(duration_ns, latency_ns);
        if duration_ns > i64::from(self.settings.tick_time_ns()) {
            self.stats.overruns += 1;
            debug!(
                "Scan {} overran: {}ns > {}ns",
                self.stats.cycle_count, duration_ns, self.settings.tick_time_ns()
            );
        }
    }

    /// Simulation loop using `std::thread::sleep`.
    #[cfg(not(feature = "rt"))]
    fn run_sim_loop(&mut self, running: &AtomicBool, max_cycles: Option<u64>) -> Result<(), CycleError> {
        use std::time::{Duration, Instant};

        let period = Duration::from_nanos(u64::from(self.settings.tick_time_ns()));

        while self.keep_running(running, max_cycles) {
            let cycle_start = Instant::now();
            self.scan_once()?;
            let elapsed = cycle_start.elapsed();
            self.record_cycle(elapsed.as_nanos() as i64, 0);

            if let Some(remaining) = period.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
        self.log_stats();
        Ok(())
    }

    /// RT loop using `clock_nanosleep(TIMER_ABSTIME)`.
    #[cfg(feature = "rt")]
    fn run_rt_loop(&mut self, running: &AtomicBool, max_cycles: Option<u64>) -> Result<(), CycleError> {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let now = || clock_gettime(clock).map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")));
        let period_ns = i64::from(self.settings.tick_time_ns());
        let mut next_wake = now()?;

        while self.keep_running(running, max_cycles) {
            let cycle_start = now()?;
            let latency_ns = timespec_diff_ns(&cycle_start, &next_wake).abs();

            self.scan_once()?;

            let cycle_end = now()?;
            self.record_cycle(timespec_diff_ns(&cycle_end, &cycle_start), latency_ns);

            next_wake = timespec_add_ns(next_wake, period_ns);
            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
        self.log_stats();
        Ok(())
    }

    fn log_stats(&self) {
        let s = &self.stats;
        if s.cycle_count == 0 {
            return;
        }
        info!(
            "Scans: {} (min {}ns, avg {}ns, max {}ns), overruns: {}",
            s.cycle_count,
            s.min_cycle_ns,
            s.avg_cycle_ns(),
            s.max_cycle_ns,
            s.overruns
        );
        if s.overruns > 0 {
            warn!("{} of {} scans exceeded the tick time", s.overruns, s.cycle_count);
        }
    }

    /// Flush telemetry and shut the driver down.
    pub fn shutdown(&mut self) -> Result<(), CycleError> {
        self.telemetry.flush_all()?;
        self.driver.shutdown()?;
        Ok(())
    }

    // ─── Accessors ──────────────────────────────────────────────────

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable driver access, e.g. to inject simulated inputs between scans.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn image(&self) -> &ProcessImage {
        &self.image
    }

    pub fn table(&self) -> &BindingTable {
        &self.table
    }

    pub fn telemetry_mut(&mut self) -> &mut TelemetryHub {
        &mut self.telemetry
    }

    pub fn clock(&self) -> &SoftClock {
        &self.clock
    }

    /// Tick passed to the next logic step.
    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn settings(&self) -> ScanSettings {
        self.settings
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn is_started(&self) -> bool {
        self.startup == Startup::Ready
    }
}

// ─── Time Helpers ───────────────────────────────────────────────────

/// Add nanoseconds to a TimeSpec.
#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let mut secs = ts.tv_sec();
    let mut nanos = ts.tv_nsec() + ns;
    while nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    TimeSpec::new(secs, nanos)
}

/// Difference `a - b` [ns].
#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

// ─── Tests ──────────────────────────────────────────────────────────
