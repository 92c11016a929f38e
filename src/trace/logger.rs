use std::{
    fs::{File, OpenOptions},
    io::{self, LineWriter, Write},
    path::Path,
    sync::Mutex,
};

use tracing::warn;

use crate::trace::trace::TraceEvent;

/// Appends one JSON line per pipeline operation. A logger whose file
/// could not be opened stays silent.
pub struct TraceLogger {
    sink: Option<Mutex<LineWriter<File>>>,
}

impl TraceLogger {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Self {
                sink: Some(Mutex::new(LineWriter::new(file))),
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not open trace file, tracing disabled");
                Self::disabled()
            }
        }
    }

    /// `trace.path` from the config; no path means no trace.
    pub fn from_path(path: Option<&str>) -> Self {
        path.map_or_else(Self::disabled, Self::open)
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn log(&self, event: &TraceEvent) {
        let Some(sink) = &self.sink else {
            return;
        };
        // A panic mid-write leaves at worst one torn line
        let mut writer = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let written = serde_json::to_writer(&mut *writer, event)
            .map_err(io::Error::from)
            .and_then(|()| writer.write_all(b"\n"));
        if let Err(e) = written {
            warn!(operation = ?event.operation, error = %e, "dropping trace event");
        }
    }
}
