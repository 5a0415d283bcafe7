use std::time::{Duration, Instant};

use log::{debug, info, warn};
use uuid::Uuid;

use crate::BatchError;

use super::{build_name, item::ItemWriter, state::ProcessState, task::IterableTask};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The step has not been run yet.
    Starting,
    /// The task iterated to its end and every record was written.
    Success,
    /// The task failed during `execute` or `next`.
    TaskError,
    /// The writer rejected a chunk.
    WriteError,
}

/// Execution report of a step run.
#[derive(Debug)]
pub struct StepExecution {
    /// Unique identifier for this step execution
    pub id: Uuid,
    /// Human-readable name for the step
    pub name: String,
    pub status: StepStatus,
    pub start_time: Instant,
    pub end_time: Instant,
    pub duration: Duration,
    /// Number of records produced by the task
    pub read_count: usize,
    /// Number of ticks marked as skipped by the task
    pub skip_count: usize,
    /// Number of records accepted by the writer
    pub write_count: usize,
}

impl StepExecution {
    pub fn new(name: &str) -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            status: StepStatus::Starting,
            start_time: now,
            end_time: now,
            duration: Duration::default(),
            read_count: 0,
            skip_count: 0,
            write_count: 0,
        }
    }
}

/// Drives an [`IterableTask`] to the end of its iteration.
///
/// Every tick runs `execute` then `next` on the task, serially. Produced
/// records are buffered into chunks handed to the writer; skipped ticks are
/// counted and produce nothing.
pub struct IterableStep<'a, I, O> {
    name: String,
    task: &'a dyn IterableTask<I, O>,
    writer: &'a dyn ItemWriter<O>,
    chunk_size: usize,
}

impl<I, O> IterableStep<'_, I, O> {
    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Runs the step with an optional input for the task.
    ///
    /// # Returns
    /// - `Ok(StepExecution)` once the task reported the end of its iteration
    /// - `Err(BatchError)` with the first task or writer error
    pub fn run(&self, input: Option<I>) -> Result<StepExecution, BatchError> {
        let mut step_execution = StepExecution::new(&self.name);
        let start_time = Instant::now();

        info!(
            "Start of step: {}, id: {}",
            step_execution.name, step_execution.id
        );

        self.writer.open()?;

        let mut state = ProcessState::new();
        if let Some(input) = input {
            state.set_input(input);
        }

        let result = self.iterate(&mut state, &mut step_execution);

        if let Err(error) = self.writer.close() {
            warn!("Non-fatal error while closing writer: {}", error);
        }

        step_execution.start_time = start_time;
        step_execution.end_time = Instant::now();
        step_execution.duration = start_time.elapsed();

        info!(
            "End of step: {}, id: {}, read: {}, skipped: {}, written: {}",
            step_execution.name,
            step_execution.id,
            step_execution.read_count,
            step_execution.skip_count,
            step_execution.write_count
        );

        result.map(|()| step_execution)
    }

    fn iterate(
        &self,
        state: &mut ProcessState<I, O>,
        step_execution: &mut StepExecution,
    ) -> Result<(), BatchError> {
        let mut chunk = Vec::with_capacity(self.chunk_size);

        loop {
            state.reset();

            if let Err(error) = self.task.execute(state) {
                step_execution.status = StepStatus::TaskError;
                return Err(error);
            }

            if state.is_skipped() {
                step_execution.skip_count += 1;
            } else if let Some(output) = state.take_output() {
                step_execution.read_count += 1;
                chunk.push(output);
                if chunk.len() >= self.chunk_size {
                    self.write_chunk(&mut chunk, step_execution)?;
                }
            }

            match self.task.next(state) {
                Ok(true) => {}
                Ok(false) => break,
                Err(error) => {
                    step_execution.status = StepStatus::TaskError;
                    return Err(error);
                }
            }
        }

        self.write_chunk(&mut chunk, step_execution)?;
        step_execution.status = StepStatus::Success;
        Ok(())
    }

    fn write_chunk(
        &self,
        chunk: &mut Vec<O>,
        step_execution: &mut StepExecution,
    ) -> Result<(), BatchError> {
        if chunk.is_empty() {
            debug!("No items to write, skipping write call");
            return Ok(());
        }

        debug!("Writing chunk of {} items", chunk.len());
        let written = self
            .writer
            .write(chunk)
            .and_then(|()| self.writer.flush());

        if let Err(error) = written {
            step_execution.status = StepStatus::WriteError;
            return Err(error);
        }

        step_execution.write_count += chunk.len();
        chunk.clear();
        Ok(())
    }
}

pub struct IterableStepBuilder<'a, I, O> {
    /// Optional name for the step (generated randomly if not specified)
    name: Option<String>,
    task: Option<&'a dyn IterableTask<I, O>>,
    writer: Option<&'a dyn ItemWriter<O>>,
    chunk_size: usize,
}

impl<I, O> Default for IterableStepBuilder<'_, I, O> {
    fn default() -> Self {
        Self {
            name: None,
            task: None,
            writer: None,
            chunk_size: 10,
        }
    }
}

impl<'a, I, O> IterableStepBuilder<'a, I, O> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn task(mut self, task: &'a dyn IterableTask<I, O>) -> Self {
        self.task = Some(task);
        self
    }

    pub fn writer(mut self, writer: &'a dyn ItemWriter<O>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// # Panics
    /// Panics if the task or the writer has not been set.
    pub fn build(self) -> IterableStep<'a, I, O> {
        IterableStep {
            name: self.name.unwrap_or_else(build_name),
            task: self.task.expect("Task is required for building a step"),
            writer: self.writer.expect("Writer is required for building a step"),
            chunk_size: self.chunk_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use crate::core::{item::ItemWriterResult, task::Task};

    use super::*;

    /// Counts down from its input, skipping the tick where the counter is odd.
    struct Countdown {
        remaining: Cell<Option<u32>>,
    }

    impl Task<u32, u32> for Countdown {
        fn execute(&self, state: &mut ProcessState<u32, u32>) -> Result<(), BatchError> {
            let current = match self.remaining.get() {
                Some(current) => current,
                None => {
                    let start = *state.get_input().ok_or(BatchError::NoIteratorInitialized)?;
                    self.remaining.set(Some(start));
                    start
                }
            };
            if current % 2 == 1 {
                state.set_skipped(true);
            } else {
                state.set_output(current);
            }
            Ok(())
        }
    }

    impl IterableTask<u32, u32> for Countdown {
        fn next(&self, _state: &mut ProcessState<u32, u32>) -> Result<bool, BatchError> {
            match self.remaining.get() {
                Some(0) | None => Ok(false),
                Some(current) => {
                    self.remaining.set(Some(current - 1));
                    Ok(true)
                }
            }
        }
    }

    #[derive(Default)]
    struct VecWriter {
        chunks: RefCell<Vec<Vec<u32>>>,
        fail: bool,
    }

    impl ItemWriter<u32> for VecWriter {
        fn write(&self, items: &[u32]) -> ItemWriterResult {
            if self.fail {
                return Err(BatchError::ItemWriter("refused".to_string()));
            }
            self.chunks.borrow_mut().push(items.to_vec());
            Ok(())
        }
    }

    #[test]
    fn runs_task_to_the_end_in_chunks() -> Result<(), BatchError> {
        let task = Countdown {
            remaining: Cell::new(None),
        };
        let writer = VecWriter::default();
        let step = IterableStepBuilder::<u32, u32>::new()
            .name("countdown")
            .task(&task)
            .writer(&writer)
            .chunk_size(2)
            .build();

        let execution = step.run(Some(6))?;

        assert_eq!(execution.status, StepStatus::Success);
        assert_eq!(execution.name, "countdown");
        assert_eq!(execution.read_count, 4);
        assert_eq!(execution.skip_count, 3);
        assert_eq!(execution.write_count, 4);
        assert_eq!(*writer.chunks.borrow(), vec![vec![6, 4], vec![2, 0]]);
        Ok(())
    }

    #[test]
    fn task_error_aborts_the_step() {
        let task = Countdown {
            remaining: Cell::new(None),
        };
        let writer = VecWriter::default();
        let step = IterableStepBuilder::<u32, u32>::new().task(&task).writer(&writer).build();

        let result = step.run(None);

        assert!(matches!(result, Err(BatchError::NoIteratorInitialized)));
        assert_eq!(step.get_name().len(), 8);
        assert!(writer.chunks.borrow().is_empty());
    }

    #[test]
    fn writer_error_aborts_the_step() {
        let task = Countdown {
            remaining: Cell::new(None),
        };
        let writer = VecWriter {
            fail: true,
            ..VecWriter::default()
        };
        let step = IterableStepBuilder::<u32, u32>::new()
            .task(&task)
            .writer(&writer)
            .chunk_size(1)
            .build();

        assert!(matches!(step.run(Some(2)), Err(BatchError::ItemWriter(_))));
    }
}
