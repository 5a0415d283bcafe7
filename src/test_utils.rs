//! Test utilities shared by unit and integration tests.

use std::sync::Mutex;

use log::{Level, Log, Metadata, Record};

/// A log event captured by [`RecordingLogger`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
}

/// Logger keeping every record it receives, for assertions on diagnostics.
#[derive(Default)]
pub struct RecordingLogger {
    events: Mutex<Vec<LoggedEvent>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LoggedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Events whose message contains `needle`.
    pub fn matching(&self, needle: &str) -> Vec<LoggedEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.message.contains(needle))
            .collect()
    }
}

impl Log for RecordingLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut events) = self.events.lock() {
            events.push(LoggedEvent {
                level: record.level(),
                target: record.target().to_string(),
                message: record.args().to_string(),
            });
        }
    }

    fn flush(&self) {}
}
