//! Post-processing of a finished run's data directory.
//!
//! Turns the raw power tracker reports into a per-mote CSV table and rebuilds
//! the routing DAG (mote -> preferred parent) from the topology log.

use crate::sinks::SinkTarget;
use rpl_collect_abstract::LogStream;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize DODAG")]
    Json(#[from] serde_json::Error),
}

/// Radio durations of one mote in one power tracker report, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerRow {
    pub mote_id: u32,
    pub monitored_time: f64,
    pub on_time: f64,
    pub tx_time: f64,
    pub rx_time: f64,
    pub int_time: f64,
}

const POWER_ITEMS: [&str; 5] = ["MONITORED", "ON", "TX", "RX", "INT"];

/// Parse a `<Platform>_<id> <ITEM> <microseconds> ...` line.
fn parse_power_line(line: &str) -> Option<(u32, usize, u64)> {
    let mut tokens = line.split_whitespace();
    let (platform, id) = tokens.next()?.rsplit_once('_')?;
    if platform.is_empty() || !platform.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    let item = tokens.next()?;
    let slot = POWER_ITEMS.iter().position(|i| *i == item)?;
    let value = tokens.next()?.parse().ok()?;
    Some((id.parse().ok()?, slot, value))
}

/// Build one row per mote entry in every report. The n-th MONITORED line is
/// paired with the n-th ON, TX, RX and INT line; trailing unmatched lines are
/// dropped.
pub fn parse_power_log(text: &str) -> Vec<PowerRow> {
    let mut columns: [Vec<(u32, u64)>; 5] = Default::default();
    for line in text.lines() {
        if let Some((mote_id, slot, value)) = parse_power_line(line) {
            columns[slot].push((mote_id, value));
        }
    }

    let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
    let seconds = |us: u64| us as f64 / 1_000_000.0;
    (0..rows)
        .map(|i| PowerRow {
            mote_id: columns[0][i].0,
            monitored_time: seconds(columns[0][i].1),
            on_time: seconds(columns[1][i].1),
            tx_time: seconds(columns[2][i].1),
            rx_time: seconds(columns[3][i].1),
            int_time: seconds(columns[4][i].1),
        })
        .collect()
}

pub fn power_rows_to_csv(rows: &[PowerRow]) -> String {
    let mut out = String::from("mote_id,monitored_time,on_time,tx_time,rx_time,int_time\n");
    for r in rows {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            r.mote_id, r.monitored_time, r.on_time, r.tx_time, r.rx_time, r.int_time
        ));
    }
    out
}

/// Preferred parent of every mote that announced one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dodag {
    pub parents: BTreeMap<u32, u32>,
}

/// Parse a `<time>\tID:<mote>\t#L <parent> <flag>` line.
fn parse_topology_line(line: &str) -> Option<(u32, u32, u32)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [time, id, "#L", parent, flag] = tokens.as_slice() else {
        return None;
    };
    time.parse::<u64>().ok()?;
    let mote = id.strip_prefix("ID:")?.parse().ok()?;
    Some((mote, parent.parse().ok()?, flag.parse().ok()?))
}

/// Later announcements replace earlier ones; lines with flag 0 are ignored.
pub fn parse_topology_log(text: &str) -> Dodag {
    let mut dodag = Dodag::default();
    for line in text.lines() {
        match parse_topology_line(line) {
            Some((_, _, 0)) => continue,
            Some((mote, parent, _)) => {
                dodag.parents.insert(mote, parent);
            }
            None => debug!("Skipping topology line {:?}", line),
        }
    }
    dodag
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub power_rows: usize,
    pub dodag_edges: usize,
    pub power_csv: PathBuf,
    pub dodag_json: PathBuf,
}

fn read(path: PathBuf) -> Result<String, AnalysisError> {
    fs::read_to_string(&path).map_err(|source| AnalysisError::Read { path, source })
}

fn write(path: &Path, contents: &[u8]) -> Result<(), AnalysisError> {
    fs::write(path, contents).map_err(|source| AnalysisError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Read the logs in `data_dir` and write `powertracker.csv` and `dodag.json`
/// into `out_dir`.
pub fn analyze(data_dir: &Path, out_dir: &Path) -> Result<AnalysisSummary, AnalysisError> {
    let power = parse_power_log(&read(data_dir.join(SinkTarget::Power.file_name()))?);
    let dodag = parse_topology_log(&read(data_dir.join(LogStream::Topology.file_name()))?);

    fs::create_dir_all(out_dir).map_err(|source| AnalysisError::Write {
        path: out_dir.to_path_buf(),
        source,
    })?;
    let power_csv = out_dir.join("powertracker.csv");
    write(&power_csv, power_rows_to_csv(&power).as_bytes())?;
    let dodag_json = out_dir.join("dodag.json");
    write(&dodag_json, &serde_json::to_vec_pretty(&dodag)?)?;

    info!(
        "Parsed {} power rows and {} DODAG edges",
        power.len(),
        dodag.parents.len()
    );
    Ok(AnalysisSummary {
        power_rows: power.len(),
        dodag_edges: dodag.parents.len(),
        power_csv,
        dodag_json,
    })
}
