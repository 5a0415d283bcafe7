use std::fmt::Debug;

use log::{Level, debug, log};

use crate::core::item::{ItemWriter, ItemWriterResult};

/// Logs every record it receives instead of storing it.
///
/// Records are logged at info level unless another level is set with
/// [`LoggerWriter::with_level`].
pub struct LoggerWriter {
    level: Level,
}

impl Default for LoggerWriter {
    fn default() -> Self {
        Self { level: Level::Info }
    }
}

impl LoggerWriter {
    pub fn with_level(level: Level) -> Self {
        Self { level }
    }

    pub fn level(&self) -> Level {
        self.level
    }
}

impl<T> ItemWriter<T> for LoggerWriter
where
    T: Debug,
{
    fn write(&self, items: &[T]) -> ItemWriterResult {
        debug!("Logging chunk of {} records", items.len());
        for item in items {
            log!(self.level, "Record: {:?}", item);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_any_debug_record() {
        let writer = LoggerWriter::with_level(Level::Debug);

        assert_eq!(writer.level(), Level::Debug);
        assert!(writer.write(&["a", "b"]).is_ok());
        assert_eq!(LoggerWriter::default().level(), Level::Info);
    }
}
