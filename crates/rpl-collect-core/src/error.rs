use crate::collector::RunState;
use crate::sinks::SinkTarget;
use rpl_collect_abstract::{ConfigError, ProviderFailure};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to create, write, flush or close one of the log files.
#[derive(Debug, Error)]
pub enum IoFailure {
    #[error("failed to create data directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open {target} log at {}", path.display())]
    Open {
        target: SinkTarget,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {target} log")]
    Write {
        target: SinkTarget,
        #[source]
        source: io::Error,
    },

    #[error("failed to flush {target} log on close")]
    Close {
        target: SinkTarget,
        #[source]
        source: io::Error,
    },

    #[error("{target} log used after the sinks were closed")]
    Closed { target: SinkTarget },
}

/// Anything that ends a collection run early.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Io(#[from] IoFailure),

    #[error(transparent)]
    Provider(#[from] ProviderFailure),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("collector is no longer running ({0:?})")]
    NotRunning(RunState),
}
