use serde::{Deserialize, Serialize};
use std::fmt;

/// Simulated time in microseconds, as reported by the simulation engine.
pub type SimTime = u64;

/// Message prefixes that route an event away from the plain serial log
pub mod markers {
    /// DAG / topology change reported by a mote.
    pub const TOPOLOGY: &str = "#L ";
    /// Routing protocol control traffic.
    pub const ROUTING: &str = "RPL: ";
}

/// One line of serial output printed by a simulated mote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialEvent {
    /// Simulated time at which the line was printed
    pub time: SimTime,
    /// Mote that printed the line
    pub mote_id: u32,
    pub message: String,
}

impl SerialEvent {
    pub fn new(time: SimTime, mote_id: u32, message: impl Into<String>) -> Self {
        Self {
            time,
            mote_id,
            message: message.into(),
        }
    }

    /// Render the event as a log line: `<time>\tID:<id>\t<message>\n`.
    pub fn to_log_line(&self) -> String {
        format!("{}\tID:{}\t{}\n", self.time, self.mote_id, self.message)
    }
}

/// Log destinations an event can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStream {
    Serial,
    Routing,
    Topology,
}

impl LogStream {
    pub const ALL: [LogStream; 3] = [LogStream::Serial, LogStream::Routing, LogStream::Topology];

    /// File name of the log backing this stream inside the data directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            LogStream::Serial => "serial.log",
            LogStream::Routing => "rpl.log",
            LogStream::Topology => "edges.log",
        }
    }
}

impl fmt::Display for LogStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogStream::Serial => "serial",
            LogStream::Routing => "routing",
            LogStream::Topology => "topology",
        };
        f.write_str(name)
    }
}
