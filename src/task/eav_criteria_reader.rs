use crate::{
    BatchError,
    core::{
        state::ProcessState,
        task::{IterableTask, Task},
    },
    eav::{Criteria, Data},
};

use super::{eav_reader::EavReaderTask, options::ResolvedReaderOptions};

/// Uses the step input as criteria to find EAV records.
///
/// Each input starts its own pass over the matching records. The reader is
/// always allowed to reset: once a pass is over, the next `execute` reopens
/// the query with the criteria currently in the input. The input is read
/// when the query is opened, a change in the middle of a pass has no effect
/// on that pass.
pub struct EavCriteriaReaderTask<'a> {
    reader: EavReaderTask<'a>,
}

impl<'a> EavCriteriaReaderTask<'a> {
    /// Wraps a reader; its static criteria and `allow_reset` are ignored.
    pub fn new(reader: EavReaderTask<'a>) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> &EavReaderTask<'a> {
        &self.reader
    }

    fn options(&self, criteria: Criteria) -> ResolvedReaderOptions {
        ResolvedReaderOptions {
            criteria,
            allow_reset: true,
            ..self.reader.options().clone()
        }
    }
}

impl Task<Criteria, Data> for EavCriteriaReaderTask<'_> {
    fn execute(&self, state: &mut ProcessState<Criteria, Data>) -> Result<(), BatchError> {
        let criteria = state.get_input().cloned().ok_or_else(|| {
            BatchError::UnexpectedInput("Expecting criteria as input".to_string())
        })?;
        let options = self.options(criteria);
        self.reader.execute_with(state, &options)
    }
}

impl IterableTask<Criteria, Data> for EavCriteriaReaderTask<'_> {
    fn next(&self, state: &mut ProcessState<Criteria, Data>) -> Result<bool, BatchError> {
        self.reader.next(state)
    }
}
