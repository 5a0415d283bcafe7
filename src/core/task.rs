use crate::BatchError;

use super::state::ProcessState;

/// A unit of work run by the host pipeline once per tick.
pub trait Task<I, O> {
    /// Runs one tick, reading the input from and writing the output to `state`.
    fn execute(&self, state: &mut ProcessState<I, O>) -> Result<(), BatchError>;
}

/// A task producing several outputs from the same step.
///
/// The host calls `execute` to obtain the current output and `next` to move
/// on; it stops iterating the step once `next` returns false.
pub trait IterableTask<I, O>: Task<I, O> {
    /// Moves to the next element.
    ///
    /// # Returns
    /// - `Ok(true)` if the task has a next element
    /// - `Ok(false)` if the task has terminated its iteration
    fn next(&self, state: &mut ProcessState<I, O>) -> Result<bool, BatchError>;
}

/// A stateless conversion of one value into another.
pub trait Transformer<I, O> {
    fn transform(&self, value: I) -> Result<O, BatchError>;

    /// Returns the unique code identifying the transformer.
    fn code(&self) -> &'static str;
}

/// Runs a [`Transformer`] as a task: the step input is transformed into the
/// step output.
pub struct TransformerTask<'a, I, O> {
    transformer: &'a dyn Transformer<I, O>,
}

impl<'a, I, O> TransformerTask<'a, I, O> {
    pub fn new(transformer: &'a dyn Transformer<I, O>) -> Self {
        Self { transformer }
    }
}

impl<I: Clone, O> Task<I, O> for TransformerTask<'_, I, O> {
    fn execute(&self, state: &mut ProcessState<I, O>) -> Result<(), BatchError> {
        let value = state.get_input().cloned().ok_or_else(|| {
            BatchError::UnexpectedInput(format!(
                "transformer {} expects an input",
                self.transformer.code()
            ))
        })?;
        let output = self.transformer.transform(value)?;
        state.set_output(output);
        Ok(())
    }
}
