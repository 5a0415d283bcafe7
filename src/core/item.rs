use crate::error::BatchError;

/// Represents the result of writing items.
pub type ItemWriterResult = Result<(), BatchError>;

/// A trait for writing records produced by a step.
///
/// Writers receive records chunk by chunk. `open` and `close` bracket a step
/// run, `flush` is called after every written chunk.
pub trait ItemWriter<W> {
    fn write(&self, items: &[W]) -> ItemWriterResult;

    fn flush(&self) -> ItemWriterResult {
        Ok(())
    }

    fn open(&self) -> ItemWriterResult {
        Ok(())
    }

    fn close(&self) -> ItemWriterResult {
        Ok(())
    }
}
