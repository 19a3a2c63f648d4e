use anyhow::{Context, Result};
use rpl_collect_abstract::{CollectorConfig, CollectorConfigOverride, ReplayTrace};
use rpl_collect_core::{Collector, RunReport};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::engine::ReplayHost;
use crate::providers::scripted_instruments;

/// Load a replay trace. A relative `frame` path is resolved against the
/// directory holding the trace file.
pub fn load_trace(path: &Path) -> Result<ReplayTrace> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read trace file {}", path.display()))?;
    let mut trace: ReplayTrace = toml::from_str(&content)
        .with_context(|| format!("Failed to parse trace file {}", path.display()))?;

    if let (Some(frame), Some(base)) = (&trace.instrumentation.frame, path.parent())
        && frame.is_relative()
    {
        trace.instrumentation.frame = Some(base.join(frame));
    }
    Ok(trace)
}

/// Replay `trace` through a fresh collector. Settings from `overrides` win over
/// the trace's own `[config]` table, which wins over the defaults.
pub fn run_trace(trace: &ReplayTrace, overrides: &CollectorConfigOverride) -> Result<RunReport> {
    let mut config = CollectorConfig::default();
    trace.config.apply_to(&mut config);
    overrides.apply_to(&mut config);

    info!("Running trace: {}", trace.name);
    if !trace.description.is_empty() {
        info!("Description: {}", trace.description);
    }
    info!(
        "{} events, timeout {} ms, sampling every {} us, data in {}",
        trace.events.len(),
        config.timeout_ms,
        config.sampling_period,
        config.data_dir.display()
    );

    let collector = Collector::open(&config, scripted_instruments(&trace.instrumentation))
        .context("Failed to start collector")?;
    let mut host = ReplayHost::from_trace(trace, config.timeout_us());
    let report = collector.run(&mut host);

    info!(
        "Replayed {} of {} events ({} left past timeout, {} yields)",
        host.delivered(),
        trace.events.len(),
        host.remaining_events(),
        host.yields()
    );
    Ok(report)
}
