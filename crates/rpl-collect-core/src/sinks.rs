use crate::error::IoFailure;
use rpl_collect_abstract::LogStream;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info};

/// One of the five files owned by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkTarget {
    Stream(LogStream),
    Power,
    Timeline,
}

impl SinkTarget {
    pub const ALL: [SinkTarget; 5] = [
        SinkTarget::Stream(LogStream::Serial),
        SinkTarget::Stream(LogStream::Routing),
        SinkTarget::Stream(LogStream::Topology),
        SinkTarget::Power,
        SinkTarget::Timeline,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            SinkTarget::Stream(stream) => stream.file_name(),
            SinkTarget::Power => "powertracker.log",
            SinkTarget::Timeline => "timeline.log",
        }
    }
}

impl fmt::Display for SinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkTarget::Stream(stream) => write!(f, "{stream}"),
            SinkTarget::Power => f.write_str("power"),
            SinkTarget::Timeline => f.write_str("timeline"),
        }
    }
}

/// A writer that can push buffered data all the way to storage.
pub trait DurableWrite: Write {
    /// Called after every flush; the host may be killed at any moment.
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl DurableWrite for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

struct Handles<W> {
    serial: W,
    routing: W,
    topology: W,
    power: W,
    timeline: W,
}

impl<W> Handles<W> {
    fn get_mut(&mut self, target: SinkTarget) -> &mut W {
        match target {
            SinkTarget::Stream(LogStream::Serial) => &mut self.serial,
            SinkTarget::Stream(LogStream::Routing) => &mut self.routing,
            SinkTarget::Stream(LogStream::Topology) => &mut self.topology,
            SinkTarget::Power => &mut self.power,
            SinkTarget::Timeline => &mut self.timeline,
        }
    }

    fn into_vec(self) -> Vec<(SinkTarget, W)> {
        SinkTarget::ALL
            .into_iter()
            .zip([
                self.serial,
                self.routing,
                self.topology,
                self.power,
                self.timeline,
            ])
            .collect()
    }
}

/// The log files of one run. Every write is flushed and synced before it
/// returns; once [`LogSinks::close_all`] has run, the handles are gone.
pub struct LogSinks<W: DurableWrite = File> {
    handles: Option<Handles<W>>,
}

impl LogSinks<File> {
    /// Create (or truncate) all five log files inside `dir`.
    pub fn open(dir: &Path) -> Result<Self, IoFailure> {
        info!("Opening log file writers in {}...", dir.display());
        fs::create_dir_all(dir).map_err(|source| IoFailure::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let create = |target: SinkTarget| {
            let path = dir.join(target.file_name());
            debug!("Creating {} log at {}", target, path.display());
            File::create(&path).map_err(|source| IoFailure::Open {
                target,
                path,
                source,
            })
        };

        Ok(Self::from_writers(
            create(SinkTarget::Stream(LogStream::Serial))?,
            create(SinkTarget::Stream(LogStream::Routing))?,
            create(SinkTarget::Stream(LogStream::Topology))?,
            create(SinkTarget::Power)?,
            create(SinkTarget::Timeline)?,
        ))
    }
}

impl<W: DurableWrite> LogSinks<W> {
    pub fn from_writers(serial: W, routing: W, topology: W, power: W, timeline: W) -> Self {
        Self {
            handles: Some(Handles {
                serial,
                routing,
                topology,
                power,
                timeline,
            }),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.handles.is_none()
    }

    /// Append `text` to `target` and force it to storage.
    pub fn write(&mut self, target: SinkTarget, text: &str) -> Result<(), IoFailure> {
        let handles = self
            .handles
            .as_mut()
            .ok_or(IoFailure::Closed { target })?;
        let writer = handles.get_mut(target);
        writer
            .write_all(text.as_bytes())
            .and_then(|()| writer.flush())
            .and_then(|()| writer.sync())
            .map_err(|source| IoFailure::Write { target, source })
    }

    /// Flush and release every handle. All handles are dropped even when one
    /// of them fails to flush; the first failure is returned. Calling this a
    /// second time does nothing.
    pub fn close_all(&mut self) -> Result<(), IoFailure> {
        let Some(handles) = self.handles.take() else {
            debug!("Log sinks already closed");
            return Ok(());
        };

        let mut first_error = None;
        for (target, mut writer) in handles.into_vec() {
            if let Err(source) = writer.flush().and_then(|()| writer.sync()) {
                first_error.get_or_insert(IoFailure::Close { target, source });
            }
        }
        info!("File writers closed");

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
