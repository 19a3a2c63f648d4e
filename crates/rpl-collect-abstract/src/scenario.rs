use crate::config::CollectorConfigOverride;
use crate::event::{SerialEvent, SimTime};
use serde::Deserialize;
use std::path::PathBuf;

/// A recorded serial trace, replayed in place of a live simulation.
#[derive(Deserialize, Debug, Clone)]
pub struct ReplayTrace {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: CollectorConfigOverride,
    #[serde(default)]
    pub instrumentation: InstrumentationScript,
    #[serde(default)]
    pub events: Vec<TraceEvent>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub time: SimTime,
    pub mote: u32,
    pub message: String,
}

impl From<&TraceEvent> for SerialEvent {
    fn from(e: &TraceEvent) -> Self {
        SerialEvent::new(e.time, e.mote, e.message.clone())
    }
}

/// Canned answers for the instrumentation plugins during a replay.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct InstrumentationScript {
    /// Returned by every power tracker query
    #[serde(default)]
    pub power_report: String,
    /// Returned by every timeline query
    #[serde(default)]
    pub timeline_report: String,
    /// Image copied to every screenshot path; an empty file is written when unset.
    pub frame: Option<PathBuf>,
    /// Make the visualizer fail once this many screenshots have been taken.
    pub fail_after_samples: Option<u64>,
}
