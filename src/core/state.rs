use serde_json::{Map, Value};

/// Ambient log metadata attached by the host to every diagnostic of a step.
pub type LogContext = Map<String, Value>;

/// The state of one pipeline step, handed to the task on every tick.
///
/// The host owns the state and passes it by mutable reference to each
/// `execute`/`next` call. `input` is the previous step's output, `output` is
/// what the task produced during the current tick and `skipped` tells the
/// host that no output was produced.
#[derive(Debug, Clone)]
pub struct ProcessState<I, O> {
    input: Option<I>,
    output: Option<O>,
    skipped: bool,
    log_context: LogContext,
}

impl<I, O> Default for ProcessState<I, O> {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            skipped: false,
            log_context: LogContext::new(),
        }
    }
}

impl<I, O> ProcessState<I, O> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(input: I) -> Self {
        Self {
            input: Some(input),
            ..Self::default()
        }
    }

    pub fn get_input(&self) -> Option<&I> {
        self.input.as_ref()
    }

    pub fn set_input(&mut self, input: I) {
        self.input = Some(input);
    }

    pub fn get_output(&self) -> Option<&O> {
        self.output.as_ref()
    }

    pub fn set_output(&mut self, output: O) {
        self.output = Some(output);
    }

    pub fn take_output(&mut self) -> Option<O> {
        self.output.take()
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    pub fn set_skipped(&mut self, skipped: bool) {
        self.skipped = skipped;
    }

    pub fn get_log_context(&self) -> &LogContext {
        &self.log_context
    }

    /// Adds an entry to the log context of every following diagnostic.
    pub fn add_log_context(&mut self, key: &str, value: Value) {
        self.log_context.insert(key.to_string(), value);
    }

    /// Clears the per-tick fields, keeping input and log context.
    pub fn reset(&mut self) {
        self.output = None;
        self.skipped = false;
    }
}
