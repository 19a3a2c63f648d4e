pub mod engine;
pub mod providers;
pub mod runner;

pub use engine::ReplayHost;
pub use providers::{FrameVisualizer, ScriptedReport, scripted_instruments};
pub use runner::{load_trace, run_trace};
