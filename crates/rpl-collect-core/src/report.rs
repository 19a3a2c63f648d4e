use crate::collector::RunState;
use crate::sampler::SampleCounters;
use rpl_collect_abstract::LogStream;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Summary of a finished (or aborted) collection run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub state: RunState,
    pub events_received: u64,
    pub lines_written: BTreeMap<LogStream, u64>,
    pub counters: SampleCounters,
    pub screenshots: Vec<PathBuf>,
    /// Why the run ended early, if it did
    pub failure: Option<String>,
}

impl RunReport {
    pub fn samples_taken(&self) -> u64 {
        self.counters.index
    }

    pub fn total_lines(&self) -> u64 {
        self.lines_written.values().sum()
    }
}
