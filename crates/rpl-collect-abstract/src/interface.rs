use crate::event::{SerialEvent, SimTime};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Which instrumentation plugin a snapshot was requested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Visualizer,
    Timeline,
    PowerTracker,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::Visualizer => "visualizer",
            Provider::Timeline => "timeline",
            Provider::PowerTracker => "power tracker",
        };
        f.write_str(name)
    }
}

/// A snapshot or screenshot request that the provider could not satisfy.
#[derive(Debug, Error)]
#[error("{provider} failed: {reason}")]
pub struct ProviderFailure {
    pub provider: Provider,
    pub reason: String,
}

impl ProviderFailure {
    pub fn new(provider: Provider, reason: impl Into<String>) -> Self {
        Self {
            provider,
            reason: reason.into(),
        }
    }
}

/// Captures an image of the network view.
pub trait Visualizer {
    /// Write a screenshot of the current view to `path`, with the viewport
    /// origin at (`x`, `y`).
    fn take_screenshot(&mut self, path: &Path, x: i32, y: i32) -> Result<(), ProviderFailure>;
}

/// Summarises the radio/event timeline of every mote.
pub trait TimelineStatistics {
    /// Pre-formatted report, written verbatim to the timeline log.
    fn extract_statistics(&mut self) -> Result<String, ProviderFailure>;
}

/// Reports per-mote radio on/tx/rx/interfered durations.
pub trait PowerTracker {
    /// Pre-formatted report, written verbatim to the power log.
    fn radio_statistics(&mut self) -> Result<String, ProviderFailure>;
}

/// What the host hands back when the collector asks for the next event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSignal {
    Event(SerialEvent),
    /// The run timeout fired; no further events will be delivered.
    Timeout,
}

/// The simulation engine as seen by the collector.
///
/// Both methods are cooperative suspension points: the host advances simulated
/// time and services other scripted activity before returning.
pub trait SimulationHost {
    /// Block until the next serial event is printed, or the run times out.
    fn next_signal(&mut self) -> HostSignal;

    /// Hand control back to the host between the event write and sampling.
    fn yield_now(&mut self) {}

    /// Current simulated time.
    fn now(&self) -> SimTime;
}
