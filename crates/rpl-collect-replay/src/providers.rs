use rpl_collect_abstract::{
    InstrumentationScript, PowerTracker, Provider, ProviderFailure, TimelineStatistics, Visualizer,
};
use rpl_collect_core::Instruments;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Answers every power or timeline query with the same canned report.
pub struct ScriptedReport {
    report: String,
}

impl ScriptedReport {
    pub fn new(report: impl Into<String>) -> Self {
        Self {
            report: report.into(),
        }
    }
}

impl PowerTracker for ScriptedReport {
    fn radio_statistics(&mut self) -> Result<String, ProviderFailure> {
        Ok(self.report.clone())
    }
}

impl TimelineStatistics for ScriptedReport {
    fn extract_statistics(&mut self) -> Result<String, ProviderFailure> {
        Ok(self.report.clone())
    }
}

/// "Captures" the network view by copying a prepared frame, or by writing an
/// empty placeholder when no frame was provided.
pub struct FrameVisualizer {
    frame: Option<PathBuf>,
    fail_after: Option<u64>,
    taken: u64,
}

impl FrameVisualizer {
    pub fn new(frame: Option<PathBuf>, fail_after: Option<u64>) -> Self {
        Self {
            frame,
            fail_after,
            taken: 0,
        }
    }
}

impl Visualizer for FrameVisualizer {
    fn take_screenshot(&mut self, path: &Path, x: i32, y: i32) -> Result<(), ProviderFailure> {
        if self.fail_after.is_some_and(|limit| self.taken >= limit) {
            return Err(ProviderFailure::new(
                Provider::Visualizer,
                format!("capture refused after {} screenshots", self.taken),
            ));
        }

        debug!("Capturing {} at ({}, {})", path.display(), x, y);
        let result = match &self.frame {
            Some(frame) => fs::copy(frame, path).map(|_| ()),
            None => fs::write(path, b""),
        };
        result.map_err(|err| {
            ProviderFailure::new(
                Provider::Visualizer,
                format!("cannot write {}: {}", path.display(), err),
            )
        })?;
        self.taken += 1;
        Ok(())
    }
}

pub fn scripted_instruments(script: &InstrumentationScript) -> Instruments {
    Instruments {
        visualizer: Box::new(FrameVisualizer::new(
            script.frame.clone(),
            script.fail_after_samples,
        )),
        timeline: Box::new(ScriptedReport::new(script.timeline_report.clone())),
        power: Box::new(ScriptedReport::new(script.power_report.clone())),
    }
}
