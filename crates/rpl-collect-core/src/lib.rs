pub mod analysis;
pub mod classifier;
pub mod collector;
pub mod error;
pub mod report;
pub mod sampler;
pub mod sinks;

pub use classifier::classify;
pub use collector::{Collector, RunState};
pub use error::{CollectError, IoFailure};
pub use report::RunReport;
pub use sampler::{Instruments, SampleAction, SampleCounters, SampleScheduler, screenshot_file_name};
pub use sinks::{DurableWrite, LogSinks, SinkTarget};
