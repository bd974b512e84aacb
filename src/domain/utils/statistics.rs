use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use std::sync::{Mutex, mpsc};
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;

/// Each event consists of a set of key-value-pairs describing one step of a conflict episode.
/// This enum specifies all allowed key values and thus the column in the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatParameter {
    /// Seconds since the collector was started.
    Time,

    /// Description why this entry was made
    LogDescription,

    // Candidate
    AssignmentId,
    VehicleId,
    DriverId,
    WindowStart,
    WindowEnd,

    // Episode
    /// Number of colliding assignments
    ConflictCount,

    /// Number of suggestions offered
    SuggestionCount,

    /// Decision taken by the user ("apply", "keep", "dismiss")
    Decision,

    /// EpisodeState after the step
    EpisodeState,

    Flagged,
}

impl StatParameter {
    /// Column order of the CSV output.
    pub const ALL: [StatParameter; 12] = [
        StatParameter::Time,
        StatParameter::LogDescription,
        StatParameter::AssignmentId,
        StatParameter::VehicleId,
        StatParameter::DriverId,
        StatParameter::WindowStart,
        StatParameter::WindowEnd,
        StatParameter::ConflictCount,
        StatParameter::SuggestionCount,
        StatParameter::Decision,
        StatParameter::EpisodeState,
        StatParameter::Flagged,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            StatParameter::Time => "Time",
            StatParameter::LogDescription => "LogDescription",
            StatParameter::AssignmentId => "AssignmentId",
            StatParameter::VehicleId => "VehicleId",
            StatParameter::DriverId => "DriverId",
            StatParameter::WindowStart => "WindowStart",
            StatParameter::WindowEnd => "WindowEnd",
            StatParameter::ConflictCount => "ConflictCount",
            StatParameter::SuggestionCount => "SuggestionCount",
            StatParameter::Decision => "Decision",
            StatParameter::EpisodeState => "EpisodeState",
            StatParameter::Flagged => "Flagged",
        }
    }

    pub fn headers() -> Vec<&'static str> {
        Self::ALL.iter().map(StatParameter::header).collect()
    }
}

/// store values in their native format, only format them when writing to the CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Integer(i64),
    Text(String),
    Bool(bool),
}

impl StatValue {
    fn render(&self) -> String {
        match self {
            StatValue::Integer(i) => i.to_string(),
            StatValue::Text(t) => t.clone(),
            StatValue::Bool(b) => b.to_string(),
        }
    }
}

impl From<i64> for StatValue {
    fn from(v: i64) -> Self {
        StatValue::Integer(v)
    }
}

impl From<usize> for StatValue {
    fn from(v: usize) -> Self {
        StatValue::Integer(v as i64)
    }
}

impl From<String> for StatValue {
    fn from(v: String) -> Self {
        StatValue::Text(v)
    }
}

impl From<&str> for StatValue {
    fn from(v: &str) -> Self {
        StatValue::Text(v.to_string())
    }
}

impl From<bool> for StatValue {
    fn from(v: bool) -> Self {
        StatValue::Bool(v)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatisticEvent {
    data: HashMap<StatParameter, StatValue>,
}

impl StatisticEvent {
    pub fn new() -> Self {
        Self { data: HashMap::new() }
    }

    pub fn set<V: Into<StatValue>>(&mut self, param: StatParameter, value: V) -> &mut Self {
        self.data.insert(param, value.into());
        self
    }

    pub fn get(&self, param: StatParameter) -> Option<&StatValue> {
        self.data.get(&param)
    }

    fn to_row(&self) -> Vec<String> {
        StatParameter::ALL.iter().map(|p| self.data.get(p).map(StatValue::render).unwrap_or_else(|| "NA".to_string())).collect()
    }
}

/// Messages sent from the workflow to the writer thread.
enum StatsMessage {
    Log(StatisticEvent),
    Flush,
    Shutdown,
}

/// Handle used by listeners to record episode events.
///
/// Rows are written by a background thread so recording never blocks the workflow.
#[derive(Debug)]
pub struct StatsCollector {
    sender: mpsc::Sender<StatsMessage>,
    start_time: u64,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl StatsCollector {
    /// Starts the writer thread. Writes to `filename`, or stdout if `None`.
    pub fn init(filename: Option<String>) -> Result<Self> {
        let writer: Box<dyn Write + Send> = match filename {
            Some(f) => Box::new(File::create(f)?),
            None => Box::new(io::stdout()),
        };

        let mut csv_wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);
        csv_wtr.write_record(StatParameter::headers())?;

        let (tx, rx) = mpsc::channel();
        let start_time = Self::now_in_s();

        let worker = thread::spawn(move || {
            Self::worker_loop(rx, csv_wtr);
        });

        Ok(StatsCollector { sender: tx, start_time, worker: Mutex::new(Some(worker)) })
    }

    fn now_in_s() -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
    }

    fn worker_loop(rx: mpsc::Receiver<StatsMessage>, mut csv_wtr: csv::Writer<Box<dyn Write + Send>>) {
        for msg in rx {
            match msg {
                StatsMessage::Log(event) => {
                    if let Err(e) = csv_wtr.write_record(event.to_row()) {
                        log::error!("Stats Error: Failed to write record: {}", e);
                    }
                }
                StatsMessage::Flush => {
                    if let Err(e) = csv_wtr.flush() {
                        log::error!("Stats Error: Failed to flush: {}", e);
                    }
                }
                StatsMessage::Shutdown => break,
            }
        }

        if let Err(e) = csv_wtr.flush() {
            log::error!("Stats Error: Failed to flush on shutdown: {}", e);
        }
    }

    /// Queues an event. Non-blocking; a missing `Time` is filled in.
    pub fn add_event(&self, mut event: StatisticEvent) {
        if event.get(StatParameter::Time).is_none() {
            let relative = Self::now_in_s().saturating_sub(self.start_time);
            event.set(StatParameter::Time, relative as i64);
        }

        if self.sender.send(StatsMessage::Log(event)).is_err() {
            log::warn!("Statistics event dropped, writer thread is gone.");
        }
    }

    pub fn flush(&self) {
        let _ = self.sender.send(StatsMessage::Flush);
    }

    /// Flushes pending rows and waits for the writer thread to finish.
    pub fn shutdown(&self) {
        let _ = self.sender.send(StatsMessage::Shutdown);

        let handle = self.worker.lock().ok().and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("Stats Error: writer thread panicked.");
            }
        }
    }
}
