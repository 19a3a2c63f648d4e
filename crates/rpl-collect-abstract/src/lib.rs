pub mod config;
pub mod event;
pub mod interface;
pub mod scenario;

pub use interface::{
    HostSignal, PowerTracker, Provider, ProviderFailure, SimulationHost, TimelineStatistics,
    Visualizer,
};
pub use event::{LogStream, SerialEvent, SimTime};
// Re-export the prefix markers so hosts can build classified messages
pub use event::markers;

pub use config::{CollectorConfig, CollectorConfigOverride, ConfigError};
pub use scenario::{InstrumentationScript, ReplayTrace, TraceEvent};
