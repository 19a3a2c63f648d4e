use crate::classifier::classify;
use crate::error::CollectError;
use crate::report::RunReport;
use crate::sampler::{Instruments, SampleScheduler};
use crate::sinks::{DurableWrite, LogSinks, SinkTarget};
use rpl_collect_abstract::{
    CollectorConfig, HostSignal, LogStream, SerialEvent, SimTime, SimulationHost,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    CompletedOnTimeout,
    TerminatedOnError,
}

/// Drives one collection run: logs every serial event to its stream and polls
/// the instruments on the sampling cadence.
///
/// The sinks are closed exactly once, on whichever terminal path is taken
/// first. After that every [`Collector::step`] is refused.
pub struct Collector<W: DurableWrite = File> {
    sinks: LogSinks<W>,
    scheduler: SampleScheduler,
    instruments: Instruments,
    state: RunState,

    events_received: u64,
    lines_written: BTreeMap<LogStream, u64>,
    screenshots: Vec<PathBuf>,
    failure: Option<String>,
}

impl Collector<File> {
    /// Validate `config` and open the log files in its data directory.
    pub fn open(config: &CollectorConfig, instruments: Instruments) -> Result<Self, CollectError> {
        config.validate()?;
        let sinks = LogSinks::open(&config.data_dir)?;
        Ok(Self::with_sinks(config, sinks, instruments))
    }
}

impl<W: DurableWrite> Collector<W> {
    pub fn with_sinks(config: &CollectorConfig, sinks: LogSinks<W>, instruments: Instruments) -> Self {
        Self {
            sinks,
            scheduler: SampleScheduler::new(
                config.sampling_period,
                config.data_dir.clone(),
                config.screenshot_origin,
            ),
            instruments,
            state: RunState::Running,
            events_received: 0,
            lines_written: LogStream::ALL.iter().map(|s| (*s, 0)).collect(),
            screenshots: Vec::new(),
            failure: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Pull events from `host` until it signals the timeout or an iteration
    /// fails. The sinks are closed before this returns, on either path.
    pub fn run<H: SimulationHost + ?Sized>(mut self, host: &mut H) -> RunReport {
        info!("Starting script...");
        while self.state == RunState::Running {
            match host.next_signal() {
                HostSignal::Timeout => {
                    info!("Timeout reached at {}", host.now());
                    self.complete_on_timeout();
                }
                HostSignal::Event(event) => {
                    let result = self.record(&event).and_then(|()| {
                        host.yield_now();
                        self.sample(host.now())
                    });
                    // the error was logged and recorded by settle
                    let _ = self.settle(result);
                }
            }
        }
        info!("Done.");
        self.report()
    }

    /// Handle a single event without a host: log it, then sample at the
    /// event's own timestamp.
    pub fn step(&mut self, event: &SerialEvent) -> Result<(), CollectError> {
        if self.state != RunState::Running {
            return Err(CollectError::NotRunning(self.state));
        }
        let result = self
            .record(event)
            .and_then(|()| self.sample(event.time));
        self.settle(result)
    }

    /// The host's timeout fired: close everything and mark the run successful.
    /// If the final flush fails the run is reported as terminated instead.
    pub fn complete_on_timeout(&mut self) {
        if self.state != RunState::Running {
            return;
        }
        match self.sinks.close_all() {
            Ok(()) => self.state = RunState::CompletedOnTimeout,
            Err(err) => {
                warn!("Closing log files after timeout failed: {}", err);
                self.failure = Some(CollectError::from(err).to_string());
                self.state = RunState::TerminatedOnError;
            }
        }
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            state: self.state,
            events_received: self.events_received,
            lines_written: self.lines_written.clone(),
            counters: self.scheduler.counters(),
            screenshots: self.screenshots.clone(),
            failure: self.failure.clone(),
        }
    }

    fn record(&mut self, event: &SerialEvent) -> Result<(), CollectError> {
        self.events_received += 1;
        let stream = classify(&event.message);
        self.sinks
            .write(SinkTarget::Stream(stream), &event.to_log_line())?;
        *self.lines_written.entry(stream).or_default() += 1;
        Ok(())
    }

    fn sample(&mut self, now: SimTime) -> Result<(), CollectError> {
        let Some(action) = self.scheduler.maybe_sample(now, &mut self.instruments)? else {
            return Ok(());
        };
        // the screenshot is on disk now, whatever happens to the reports
        self.screenshots.push(action.screenshot.clone());
        debug!(
            "Sample {} taken at {}: {}",
            action.index,
            action.time,
            action.screenshot.display()
        );
        self.sinks.write(SinkTarget::Power, &action.power_report)?;
        self.sinks
            .write(SinkTarget::Timeline, &action.timeline_report)?;
        Ok(())
    }

    /// The first failure ends the run; the sinks are closed right away.
    fn settle(&mut self, result: Result<(), CollectError>) -> Result<(), CollectError> {
        if let Err(err) = &result {
            error!("Collection aborted: {}", err);
            self.failure = Some(err.to_string());
            self.state = RunState::TerminatedOnError;
            if let Err(close_err) = self.sinks.close_all() {
                warn!("Closing log files after failure also failed: {}", close_err);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IoFailure;
    use crate::sampler::testing::{FakeVisualizer, fake_instruments};
    use crate::sinks::testing::{MemorySink, Owned, memory_sinks, sinks_over};
    use std::path::Path;

    fn config(period: SimTime) -> CollectorConfig {
        CollectorConfig {
            data_dir: PathBuf::from("data"),
            sampling_period: period,
            ..Default::default()
        }
    }

    fn collector(
        failing_serial: bool,
    ) -> (Collector<Owned>, [MemorySink; 5], FakeVisualizer) {
        let (sinks, mem) = memory_sinks(failing_serial);
        let visualizer = FakeVisualizer::default();
        let collector = Collector::with_sinks(
            &config(60),
            sinks,
            fake_instruments(visualizer.clone()),
        );
        (collector, mem, visualizer)
    }

    #[test]
    fn topology_event_is_logged_and_sampled() {
        let (mut collector, mem, visualizer) = collector(false);
        collector
            .step(&SerialEvent::new(5, 2, "#L node joined"))
            .unwrap();

        assert_eq!(mem[2].contents(), "5\tID:2\t#L node joined\n");
        assert_eq!(mem[0].contents(), "");
        assert_eq!(mem[3].contents(), "power\n");
        assert_eq!(mem[4].contents(), "timeline\n");
        assert_eq!(
            *visualizer.shots.borrow(),
            vec![Path::new("data").join("network_000.png")]
        );
        let counters = collector.report().counters;
        assert_eq!(counters.threshold, 60);
        assert_eq!(counters.index, 1);
    }

    #[test]
    fn routing_event_triggers_second_sample() {
        let (mut collector, mem, visualizer) = collector(false);
        collector
            .step(&SerialEvent::new(5, 2, "#L node joined"))
            .unwrap();
        collector
            .step(&SerialEvent::new(70, 1, "RPL: DAO sent"))
            .unwrap();

        assert_eq!(mem[1].contents(), "70\tID:1\tRPL: DAO sent\n");
        assert_eq!(
            visualizer.shots.borrow().last().cloned(),
            Some(Path::new("data").join("network_001.png"))
        );
        assert_eq!(collector.report().counters.threshold, 120);
        assert_eq!(mem[3].contents(), "power\npower\n");
    }

    #[test]
    fn serial_write_failure_terminates_and_closes_once() {
        let (mut collector, mem, visualizer) = collector(true);
        let err = collector
            .step(&SerialEvent::new(5, 3, "hello"))
            .unwrap_err();
        assert!(matches!(err, CollectError::Io(IoFailure::Write { .. })));
        assert_eq!(collector.state(), RunState::TerminatedOnError);
        assert!(visualizer.shots.borrow().is_empty());
        for sink in &mem {
            assert_eq!(sink.drops(), 1);
        }

        let writes_before = mem.iter().map(|s| s.writes()).sum::<usize>();
        assert!(matches!(
            collector.step(&SerialEvent::new(6, 3, "again")),
            Err(CollectError::NotRunning(RunState::TerminatedOnError))
        ));
        collector.complete_on_timeout();
        assert_eq!(collector.state(), RunState::TerminatedOnError);
        assert_eq!(mem.iter().map(|s| s.writes()).sum::<usize>(), writes_before);
        for sink in &mem {
            assert_eq!(sink.drops(), 1);
        }
    }

    #[test]
    fn provider_failure_terminates() {
        let (sinks, mem) = memory_sinks(false);
        let visualizer = FakeVisualizer {
            fail: true,
            ..Default::default()
        };
        let mut collector =
            Collector::with_sinks(&config(60), sinks, fake_instruments(visualizer));
        let err = collector.step(&SerialEvent::new(5, 1, "boot")).unwrap_err();
        assert!(matches!(err, CollectError::Provider(_)));
        let report = collector.report();
        assert_eq!(report.state, RunState::TerminatedOnError);
        assert!(report.failure.unwrap().contains("visualizer"));
        // the event itself made it to disk before sampling failed
        assert_eq!(mem[0].contents(), "5\tID:1\tboot\n");
        assert_eq!(report.counters.index, 0);
    }

    #[test]
    fn failed_report_write_still_lists_screenshot() {
        let mem = [
            MemorySink::default(),
            MemorySink::default(),
            MemorySink::default(),
            MemorySink::default(),
            MemorySink::failing(),
        ];
        let (sinks, mem) = sinks_over(mem);
        let visualizer = FakeVisualizer::default();
        let mut collector =
            Collector::with_sinks(&config(60), sinks, fake_instruments(visualizer.clone()));

        let err = collector.step(&SerialEvent::new(5, 1, "x")).unwrap_err();
        assert!(matches!(
            err,
            CollectError::Io(IoFailure::Write {
                target: SinkTarget::Timeline,
                ..
            })
        ));
        let report = collector.report();
        assert_eq!(report.state, RunState::TerminatedOnError);
        assert_eq!(report.samples_taken(), 1);
        assert_eq!(report.screenshots, *visualizer.shots.borrow());
        assert_eq!(
            report.screenshots,
            vec![Path::new("data").join("network_000.png")]
        );
        assert_eq!(mem[3].contents(), "power\n");
    }

    #[test]
    fn flush_failure_on_timeout_reports_error() {
        let (mut collector, mem, _) = collector(false);
        collector.step(&SerialEvent::new(0, 1, "boot")).unwrap();
        mem[4].fail_flush();

        collector.complete_on_timeout();

        let report = collector.report();
        assert_eq!(report.state, RunState::TerminatedOnError);
        assert!(report.failure.unwrap().contains("timeline"));
        for sink in &mem {
            assert_eq!(sink.drops(), 1);
        }
    }

    #[test]
    fn close_failure_after_write_error_keeps_original_cause() {
        let (mut collector, mem, _) = collector(true);
        mem[3].fail_flush();

        let err = collector.step(&SerialEvent::new(5, 1, "hello")).unwrap_err();
        assert!(matches!(err, CollectError::Io(IoFailure::Write { .. })));

        let report = collector.report();
        assert_eq!(report.state, RunState::TerminatedOnError);
        let failure = report.failure.unwrap();
        assert!(failure.contains("failed to write serial log"));
        assert!(!failure.contains("power"));
        for sink in &mem {
            assert_eq!(sink.drops(), 1);
        }
    }

    #[test]
    fn timeout_closes_sinks() {
        let (mut collector, mem, _) = collector(false);
        collector.step(&SerialEvent::new(0, 1, "boot")).unwrap();
        collector.complete_on_timeout();
        assert_eq!(collector.state(), RunState::CompletedOnTimeout);
        for sink in &mem {
            assert_eq!(sink.drops(), 1);
        }
        collector.complete_on_timeout();
        for sink in &mem {
            assert_eq!(sink.drops(), 1);
        }
    }

    #[test]
    fn line_counts_match_events() {
        let (mut collector, _mem, _) = collector(false);
        let messages = ["#L 1 1", "RPL: DIO", "hello", "RPL: DAO", "plain", "#L 2 0"];
        for (i, message) in messages.iter().enumerate() {
            collector
                .step(&SerialEvent::new(i as SimTime * 10, 1, *message))
                .unwrap();
        }
        let report = collector.report();
        assert_eq!(report.events_received, messages.len() as u64);
        assert_eq!(report.total_lines(), messages.len() as u64);
        assert_eq!(report.lines_written[&LogStream::Topology], 2);
        assert_eq!(report.lines_written[&LogStream::Routing], 2);
        assert_eq!(report.lines_written[&LogStream::Serial], 2);
    }

    struct ScriptedHost {
        events: Vec<SerialEvent>,
        now: SimTime,
        yields: usize,
    }

    impl SimulationHost for ScriptedHost {
        fn next_signal(&mut self) -> HostSignal {
            if self.events.is_empty() {
                return HostSignal::Timeout;
            }
            let event = self.events.remove(0);
            self.now = event.time;
            HostSignal::Event(event)
        }

        fn yield_now(&mut self) {
            self.yields += 1;
        }

        fn now(&self) -> SimTime {
            self.now
        }
    }

    #[test]
    fn run_ends_on_timeout_with_everything_closed() {
        let (collector, mem, visualizer) = collector(false);
        let mut host = ScriptedHost {
            events: vec![
                SerialEvent::new(5, 2, "#L node joined"),
                SerialEvent::new(30, 1, "hello"),
                SerialEvent::new(70, 1, "RPL: DAO sent"),
            ],
            now: 0,
            yields: 0,
        };
        let report = collector.run(&mut host);

        assert_eq!(report.state, RunState::CompletedOnTimeout);
        assert_eq!(host.yields, 3);
        assert_eq!(report.samples_taken(), 2);
        assert_eq!(visualizer.shots.borrow().len(), 2);
        assert_eq!(report.screenshots.len(), 2);
        assert!(report.failure.is_none());
        for sink in &mem {
            assert_eq!(sink.drops(), 1);
        }
    }

    #[test]
    fn run_stops_at_first_failure() {
        let (collector, mem, _) = collector(true);
        let mut host = ScriptedHost {
            events: vec![
                SerialEvent::new(5, 1, "hello"),
                SerialEvent::new(6, 1, "RPL: never seen"),
            ],
            now: 0,
            yields: 0,
        };
        let report = collector.run(&mut host);
        assert_eq!(report.state, RunState::TerminatedOnError);
        assert_eq!(report.events_received, 1);
        assert_eq!(host.events.len(), 1);
        assert_eq!(host.yields, 0);
        assert_eq!(mem[1].writes(), 0);
    }
}
