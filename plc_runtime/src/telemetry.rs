//! Telemetry sinks fed by the scan cycle.
//!
//! Every binding may name a sink. After the clock advance, the scan cycle
//! publishes each such binding's address, display name and value to its
//! sink. Sinks are owned by the [`TelemetryHub`]; bindings hold [`SinkId`]
//! handles only.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use plc_common::iec::IecValue;
use plc_common::io::config::SinkConfig;
use plc_common::located::LocatedAddress;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::resolve_path;

/// Telemetry setup errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("telemetry sink '{0}' is defined twice")]
    DuplicateSink(String),

    #[error("telemetry sink '{0}' is not defined")]
    UnknownSink(String),

    #[error("cannot open telemetry file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("telemetry I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for published variable values.
///
/// Publishing happens inside the scan and never fails; sinks deal with
/// their own transport errors.
pub trait TelemetrySink {
    /// `name` is the binding's display name, when configured.
    fn publish(&mut self, address: &LocatedAddress, name: Option<&str>, value: IecValue);

    /// Push buffered data out. Called on shutdown.
    fn flush(&mut self) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// Handle of a sink registered in a [`TelemetryHub`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u16);

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink#{}", self.0)
    }
}

// ─── Hub ────────────────────────────────────────────────────────────

/// Named sink registry.
#[derive(Default)]
pub struct TelemetryHub {
    sinks: Vec<(String, Box<dyn TelemetrySink>)>,
}

impl TelemetryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the sinks defined under `[sinks]`.
    ///
    /// Relative file paths resolve against `base_dir`, the directory of the
    /// configuration file.
    pub fn from_config(
        sinks: &BTreeMap<String, SinkConfig>,
        base_dir: &Path,
    ) -> Result<Self, TelemetryError> {
        let mut hub = Self::new();
        for (name, cfg) in sinks {
            let sink: Box<dyn TelemetrySink> = match cfg {
                SinkConfig::Log => Box::new(LogSink::new(name)),
                SinkConfig::JsonLines { path } => {
                    Box::new(JsonLinesSink::create(&resolve_path(base_dir, path))?)
                }
            };
            hub.add(name, sink)?;
        }
        info!("Telemetry: {} sink(s) configured", hub.len());
        Ok(hub)
    }

    /// Register a sink under a unique name.
    pub fn add(
        &mut self,
        name: &str,
        sink: Box<dyn TelemetrySink>,
    ) -> Result<SinkId, TelemetryError> {
        if self.id(name).is_some() {
            return Err(TelemetryError::DuplicateSink(name.to_string()));
        }
        self.sinks.push((name.to_string(), sink));
        Ok(SinkId((self.sinks.len() - 1) as u16))
    }

    pub fn id(&self, name: &str) -> Option<SinkId> {
        self.sinks
            .iter()
            .position(|(n, _)| n == name)
            .map(|i| SinkId(i as u16))
    }

    /// Resolve a sink name, failing if it is unknown.
    pub fn resolve(&self, name: &str) -> Result<SinkId, TelemetryError> {
        self.id(name)
            .ok_or_else(|| TelemetryError::UnknownSink(name.to_string()))
    }

    pub fn name(&self, id: SinkId) -> Option<&str> {
        self.sinks.get(id.0 as usize).map(|(n, _)| n.as_str())
    }

    #[inline]
    pub fn publish(
        &mut self,
        id: SinkId,
        address: &LocatedAddress,
        name: Option<&str>,
        value: IecValue,
    ) {
        if let Some((_, sink)) = self.sinks.get_mut(id.0 as usize) {
            sink.publish(address, name, value);
        }
    }

    /// Flush every sink, returning the first error.
    pub fn flush_all(&mut self) -> Result<(), TelemetryError> {
        let mut first_err = None;
        for (name, sink) in &mut self.sinks {
            if let Err(e) = sink.flush() {
                warn!("Telemetry sink '{name}' flush failed: {e}");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

// ─── Sinks ──────────────────────────────────────────────────────────

/// Publishes through `tracing`.
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl TelemetrySink for LogSink {
    fn publish(&mut self, address: &LocatedAddress, name: Option<&str>, value: IecValue) {
        match name {
            Some(name) => info!(sink = %self.name, variable = %address, display_name = name, %value, "telemetry"),
            None => info!(sink = %self.name, variable = %address, %value, "telemetry"),
        }
    }
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    variable: &'a LocatedAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    value: IecValue,
}

/// Writes one JSON object per published value.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    failures: u64,
}

impl JsonLinesSink<BufWriter<std::fs::File>> {
    /// Append to `path`, creating it if needed.
    pub fn create(path: &Path) -> Result<Self, TelemetryError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| TelemetryError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            failures: 0,
        }
    }

    /// Records that could not be written.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TelemetrySink for JsonLinesSink<W> {
    fn publish(&mut self, address: &LocatedAddress, name: Option<&str>, value: IecValue) {
        let record = JsonRecord {
            variable: address,
            name,
            value,
        };
        let result = serde_json::to_writer(&mut self.writer, &record)
            .map_err(std::io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"));
        if let Err(e) = result {
            // Log only the first failure of a run.
            if self.failures == 0 {
                warn!("JSON telemetry write failed for {address}: {e}");
            }
            self.failures += 1;
        }
    }

    fn flush(&mut self) -> Result<(), TelemetryError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// One published value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub address: LocatedAddress,
    pub name: Option<String>,
    pub value: IecValue,
}

/// Shared record of published samples.
pub type SampleLog = Rc<RefCell<Vec<Sample>>>;

/// Keeps every sample in memory.
#[derive(Default)]
pub struct MemorySink {
    log: SampleLog,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that stays readable after the sink moves into a hub.
    pub fn log(&self) -> SampleLog {
        Rc::clone(&self.log)
    }
}

impl TelemetrySink for MemorySink {
    fn publish(&mut self, address: &LocatedAddress, name: Option<&str>, value: IecValue) {
        self.log.borrow_mut().push(Sample {
            address: address.clone(),
            name: name.map(str::to_string),
            value,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn addr(s: &str) -> LocatedAddress {
        s.parse().unwrap()
    }

    #[test]
    fn hub_assigns_ids_and_rejects_duplicates() {
        let mut hub = TelemetryHub::new();
        let a = hub.add("a", Box::new(MemorySink::new())).unwrap();
        let b = hub.add("b", Box::new(MemorySink::new())).unwrap();
        assert_ne!(a, b);
        assert_eq!(hub.id("b"), Some(b));
        assert_eq!(hub.name(a), Some("a"));
        assert!(matches!(
            hub.add("a", Box::new(MemorySink::new())),
            Err(TelemetryError::DuplicateSink(_))
        ));
        assert!(matches!(hub.resolve("c"), Err(TelemetryError::UnknownSink(_))));
    }

    #[test]
    fn memory_sink_records_in_order() {
        let sink = MemorySink::new();
        let log = sink.log();
        let mut hub = TelemetryHub::new();
        let id = hub.add("mem", Box::new(sink)).unwrap();

        hub.publish(id, &addr("%IX0.0"), Some("start"), IecValue::Bool(true));
        hub.publish(id, &addr("%IW0"), None, IecValue::Uint(512));

        let samples = log.borrow();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].address, addr("%IX0.0"));
        assert_eq!(samples[0].name.as_deref(), Some("start"));
        assert_eq!(samples[1].name, None);
        assert_eq!(samples[1].value, IecValue::Uint(512));
    }

    #[test]
    fn json_lines_format() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.publish(&addr("%IX0.0"), None, IecValue::Bool(true));
        sink.publish(&addr("%QW0"), Some("valve"), IecValue::Uint(100));
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            out,
            "{\"variable\":\"%IX0.0\",\"value\":true}\n\
             {\"variable\":\"%QW0\",\"name\":\"valve\",\"value\":100}\n"
        );
    }

    #[test]
    fn hub_from_config_opens_json_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("telemetry.jsonl");
        let mut sinks = BTreeMap::new();
        sinks.insert("console".to_string(), SinkConfig::Log);
        sinks.insert(
            "file".to_string(),
            SinkConfig::JsonLines { path: path.clone() },
        );

        let mut hub = TelemetryHub::from_config(&sinks, Path::new("/nonexistent")).unwrap();
        assert_eq!(hub.len(), 2);
        let file = hub.resolve("file").unwrap();
        hub.publish(file, &addr("%QX0.1"), None, IecValue::Bool(false));
        hub.flush_all().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"variable\":\"%QX0.1\",\"value\":false}\n");
    }

    #[test]
    fn relative_json_path_resolves_against_base_dir() {
        let dir = tempdir().unwrap();
        let mut sinks = BTreeMap::new();
        sinks.insert(
            "file".to_string(),
            SinkConfig::JsonLines {
                path: PathBuf::from("telemetry.jsonl"),
            },
        );

        let mut hub = TelemetryHub::from_config(&sinks, dir.path()).unwrap();
        let file = hub.resolve("file").unwrap();
        hub.publish(file, &addr("%IX0.0"), None, IecValue::Bool(true));
        hub.flush_all().unwrap();

        let content = std::fs::read_to_string(dir.path().join("telemetry.jsonl")).unwrap();
        assert_eq!(content, "{\"variable\":\"%IX0.0\",\"value\":true}\n");
    }

    #[test]
    fn unopenable_json_path_fails() {
        let dir = tempdir().unwrap();
        let mut sinks = BTreeMap::new();
        sinks.insert(
            "file".to_string(),
            SinkConfig::JsonLines {
                path: dir.path().join("missing").join("t.jsonl"),
            },
        );
        assert!(matches!(
            TelemetryHub::from_config(&sinks, Path::new(".")),
            Err(TelemetryError::Open { .. })
        ));
    }
}
