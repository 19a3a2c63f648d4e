use rpl_collect_abstract::{
    PowerTracker, ProviderFailure, SimTime, TimelineStatistics, Visualizer,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

/// The instrumentation plugins polled on every sample, injected by the host.
pub struct Instruments {
    pub visualizer: Box<dyn Visualizer>,
    pub timeline: Box<dyn TimelineStatistics>,
    pub power: Box<dyn PowerTracker>,
}

/// Sampling cadence state. Both counters only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleCounters {
    /// A sample is due once simulated time passes this mark
    pub threshold: SimTime,
    /// Index of the next screenshot
    pub index: u64,
    pub period: SimTime,
}

impl SampleCounters {
    pub fn new(period: SimTime) -> Self {
        Self {
            threshold: 0,
            index: 0,
            period,
        }
    }

    pub fn is_due(&self, now: SimTime) -> bool {
        now > self.threshold
    }

    fn advance(&mut self) {
        self.threshold = self.threshold.saturating_add(self.period);
        self.index += 1;
    }
}

/// Everything gathered by one sample, ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleAction {
    pub index: u64,
    pub time: SimTime,
    pub power_report: String,
    pub timeline_report: String,
    /// Where the screenshot was saved
    pub screenshot: PathBuf,
}

/// Screenshot name for a sample index: at least three digits, zero padded.
/// Indices past 999 simply grow the field.
pub fn screenshot_file_name(index: u64) -> String {
    format!("network_{index:03}.png")
}

pub struct SampleScheduler {
    counters: SampleCounters,
    screenshot_dir: PathBuf,
    origin: (i32, i32),
}

impl SampleScheduler {
    pub fn new(period: SimTime, screenshot_dir: impl Into<PathBuf>, origin: (i32, i32)) -> Self {
        Self {
            counters: SampleCounters::new(period),
            screenshot_dir: screenshot_dir.into(),
            origin,
        }
    }

    pub fn counters(&self) -> SampleCounters {
        self.counters
    }

    /// Poll the instruments if a sample is due at `now`.
    ///
    /// At most one sample is taken per call, so a long quiet gap is caught up
    /// one period per event. Counters only advance when every provider
    /// answered.
    pub fn maybe_sample(
        &mut self,
        now: SimTime,
        instruments: &mut Instruments,
    ) -> Result<Option<SampleAction>, ProviderFailure> {
        if !self.counters.is_due(now) {
            return Ok(None);
        }

        let index = self.counters.index;
        debug!(
            "Sample {} due at {} (threshold {})",
            index, now, self.counters.threshold
        );

        let power_report = instruments.power.radio_statistics()?;
        let timeline_report = instruments.timeline.extract_statistics()?;
        let screenshot = self.screenshot_dir.join(screenshot_file_name(index));
        let (x, y) = self.origin;
        instruments.visualizer.take_screenshot(&screenshot, x, y)?;

        self.counters.advance();
        Ok(Some(SampleAction {
            index,
            time: now,
            power_report,
            timeline_report,
            screenshot,
        }))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Instruments;
    use rpl_collect_abstract::{
        PowerTracker, Provider, ProviderFailure, TimelineStatistics, Visualizer,
    };
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    /// Records screenshot paths instead of capturing anything.
    #[derive(Clone, Default)]
    pub struct FakeVisualizer {
        pub shots: Rc<RefCell<Vec<PathBuf>>>,
        pub fail: bool,
    }

    impl Visualizer for FakeVisualizer {
        fn take_screenshot(&mut self, path: &Path, _x: i32, _y: i32) -> Result<(), ProviderFailure> {
            if self.fail {
                return Err(ProviderFailure::new(Provider::Visualizer, "no display"));
            }
            self.shots.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    pub struct FixedReport(pub &'static str);

    impl TimelineStatistics for FixedReport {
        fn extract_statistics(&mut self) -> Result<String, ProviderFailure> {
            Ok(self.0.to_string())
        }
    }

    impl PowerTracker for FixedReport {
        fn radio_statistics(&mut self) -> Result<String, ProviderFailure> {
            Ok(self.0.to_string())
        }
    }

    pub fn fake_instruments(visualizer: FakeVisualizer) -> Instruments {
        Instruments {
            visualizer: Box::new(visualizer),
            timeline: Box::new(FixedReport("timeline\n")),
            power: Box::new(FixedReport("power\n")),
        }
    }
}
