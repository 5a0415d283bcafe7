//! # EAV Reader Task
//!
//! Iterates over a paged result set of EAV records, one record per tick.
//!
//! The reader opens its query lazily on the first `execute`, then keeps the
//! same cursor across ticks: `execute` exposes the current record as the
//! step output and `next` moves the cursor forward. The query is never
//! re-run while the cursor is open. Pages are fetched from the finder only
//! when the cursor moves past the buffered page.
//!
//! Once the iteration is over the reader is closed. Executing a closed
//! reader fails unless `allow_reset` is set, in which case the query is
//! opened again from scratch and the restart is logged.
//!
//! ## Example
//!
//! ```
//! use eav_batch_rs::{
//!     core::{state::ProcessState, task::{IterableTask, Task}},
//!     eav::{Attribute, Data, Family, memory::MemoryStore},
//!     task::eav_reader::EavReaderTaskBuilder,
//! };
//! use serde_json::json;
//!
//! # fn example() -> Result<(), eav_batch_rs::BatchError> {
//! let store = MemoryStore::new();
//! let family = store.register_family(Family::new("book").with_attribute(Attribute::new("title")));
//! store.insert(Data::new(&family).with("title", json!("Dune")));
//!
//! let reader = EavReaderTaskBuilder::new()
//!     .registry(&store)
//!     .finder(&store)
//!     .family("book")
//!     .build()?;
//!
//! let mut state: ProcessState<(), Data> = ProcessState::new();
//! reader.execute(&mut state)?;
//! assert_eq!(state.get_output().and_then(|d| d.get("title")), Some(&json!("Dune")));
//! assert!(!reader.next(&mut state)?);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use std::cell::{Cell, RefCell};

use log::{Level, Log, debug};

use crate::{
    BatchError,
    core::{
        state::ProcessState,
        task::{IterableTask, Task},
    },
    eav::{
        Criteria, Data, EavFinder, FamilyRef, FamilyRegistry, OrderBy,
        pager::{DEFAULT_MAX_PER_PAGE, PagedCursor, Pager},
    },
};

use super::{
    options::{EavReaderOptions, EmptyLogLevel, ResolvedReaderOptions, log_context, log_event},
    required,
};

/// Lifecycle of the reader's cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// No query opened yet, or restarted after being closed.
    Uninitialized,
    /// The cursor points at a record.
    Positioned,
    /// The query matched nothing.
    EmptyResult,
    /// The iteration is over.
    Closed,
}

pub struct EavReaderTask<'a> {
    finder: &'a dyn EavFinder,
    logger: &'a dyn Log,
    options: ResolvedReaderOptions,
    cursor: RefCell<Option<Pager<'a>>>,
    status: Cell<ReaderState>,
}

impl<'a> EavReaderTask<'a> {
    pub fn options(&self) -> &ResolvedReaderOptions {
        &self.options
    }

    pub fn reader_state(&self) -> ReaderState {
        self.status.get()
    }

    /// Runs one tick with the given options.
    pub(crate) fn execute_with<I>(
        &self,
        state: &mut ProcessState<I, Data>,
        options: &ResolvedReaderOptions,
    ) -> Result<(), BatchError> {
        if self.status.get() == ReaderState::Closed {
            if !options.allow_reset {
                return Err(BatchError::ReopenDenied);
            }
            self.cursor.borrow_mut().take();
            self.status.set(ReaderState::Uninitialized);
            log_event(
                self.logger,
                module_path!(),
                Level::Warn,
                "Reader was closed previously, restarting it",
                log_context(state, options),
            );
        }

        let mut cursor = self.cursor.borrow_mut();
        let mut init = false;
        if cursor.is_none() {
            *cursor = Some(self.open(state, options)?);
            init = true;
        }
        let pager = cursor.as_ref().ok_or(BatchError::NoIteratorInitialized)?;

        match pager.current() {
            Some(data) => {
                state.set_output(data.clone());
                self.status.set(ReaderState::Positioned);
            }
            None => {
                if init {
                    log_event(
                        self.logger,
                        module_path!(),
                        options.empty_log_level.level(),
                        "Empty resultset for query",
                        log_context(state, options),
                    );
                    self.status.set(ReaderState::EmptyResult);
                }
                state.set_skipped(true);
            }
        }
        Ok(())
    }

    fn open<I>(
        &self,
        state: &ProcessState<I, Data>,
        options: &ResolvedReaderOptions,
    ) -> Result<Pager<'a>, BatchError> {
        let query = options.query();
        query.validate()?;
        debug!("Opening reader on {}", query);

        let mut pager = Pager::new(self.finder, query, options.max_per_page)?;
        pager.set_current_page(options.first_page)?;
        pager.open()?;

        if options.log_count {
            let count = pager.count()?;
            log_event(
                self.logger,
                module_path!(),
                Level::Info,
                &format!("{} items found with current query", count),
                log_context(state, options),
            );
        }

        Ok(pager)
    }

    fn advance(&self) -> Result<bool, BatchError> {
        let mut cursor = self.cursor.borrow_mut();
        let pager = cursor.as_mut().ok_or(BatchError::NoIteratorInitialized)?;

        let valid = pager.advance()?;
        if valid {
            self.status.set(ReaderState::Positioned);
        } else {
            self.status.set(ReaderState::Closed);
        }
        Ok(valid)
    }
}

impl<I> Task<I, Data> for EavReaderTask<'_> {
    fn execute(&self, state: &mut ProcessState<I, Data>) -> Result<(), BatchError> {
        self.execute_with(state, &self.options)
    }
}

impl<I> IterableTask<I, Data> for EavReaderTask<'_> {
    fn next(&self, _state: &mut ProcessState<I, Data>) -> Result<bool, BatchError> {
        self.advance()
    }
}

/// Builder for [`EavReaderTask`].
///
/// The family is resolved once, in `build`, through the registry.
pub struct EavReaderTaskBuilder<'a> {
    registry: Option<&'a dyn FamilyRegistry>,
    finder: Option<&'a dyn EavFinder>,
    logger: Option<&'a dyn Log>,
    family: Option<FamilyRef>,
    criteria: Criteria,
    order_by: Vec<OrderBy>,
    max_per_page: usize,
    first_page: usize,
    allow_reset: bool,
    log_count: bool,
    empty_log_level: EmptyLogLevel,
}

impl Default for EavReaderTaskBuilder<'_> {
    fn default() -> Self {
        Self {
            registry: None,
            finder: None,
            logger: None,
            family: None,
            criteria: Criteria::default(),
            order_by: Vec::new(),
            max_per_page: DEFAULT_MAX_PER_PAGE,
            first_page: 1,
            allow_reset: false,
            log_count: false,
            empty_log_level: EmptyLogLevel::default(),
        }
    }
}

impl<'a> EavReaderTaskBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(mut self, registry: &'a dyn FamilyRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn finder(mut self, finder: &'a dyn EavFinder) -> Self {
        self.finder = Some(finder);
        self
    }

    /// Sets the logger receiving the reader diagnostics, the global logger by default.
    pub fn logger(mut self, logger: &'a dyn Log) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Applies options loaded from a pipeline definition.
    pub fn options(mut self, options: EavReaderOptions) -> Self {
        self.family = Some(options.family);
        self.criteria = options.criteria;
        self.order_by = options.order_by;
        self.max_per_page = options.max_per_page;
        self.first_page = options.first_page;
        self.allow_reset = options.allow_reset;
        self.log_count = options.log_count;
        self.empty_log_level = options.empty_log_level;
        self
    }

    pub fn family(mut self, family: impl Into<FamilyRef>) -> Self {
        self.family = Some(family.into());
        self
    }

    pub fn criteria(mut self, criteria: Criteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by.push(order_by);
        self
    }

    pub fn max_per_page(mut self, max_per_page: usize) -> Self {
        self.max_per_page = max_per_page;
        self
    }

    pub fn first_page(mut self, first_page: usize) -> Self {
        self.first_page = first_page;
        self
    }

    pub fn allow_reset(mut self, allow_reset: bool) -> Self {
        self.allow_reset = allow_reset;
        self
    }

    pub fn log_count(mut self, log_count: bool) -> Self {
        self.log_count = log_count;
        self
    }

    pub fn empty_log_level(mut self, empty_log_level: EmptyLogLevel) -> Self {
        self.empty_log_level = empty_log_level;
        self
    }

    /// Resolves the options and builds the reader.
    ///
    /// # Errors
    /// - `BatchError::InvalidOption` if the registry, the finder or the family is missing
    /// - `BatchError::MissingFamily` if the family code is unknown
    /// - `BatchError::MissingAttribute` if criteria or ordering use an undeclared attribute
    pub fn build(self) -> Result<EavReaderTask<'a>, BatchError> {
        let registry = self.registry.ok_or_else(|| required("registry"))?;
        let finder = self.finder.ok_or_else(|| required("finder"))?;
        let family = self.family.ok_or_else(|| required("family"))?;

        let options = ResolvedReaderOptions {
            family: family.resolve(registry)?,
            criteria: self.criteria,
            order_by: self.order_by,
            max_per_page: self.max_per_page,
            first_page: self.first_page,
            allow_reset: self.allow_reset,
            log_count: self.log_count,
            empty_log_level: self.empty_log_level,
        };

        options.query().validate()?;

        Ok(EavReaderTask {
            finder,
            logger: self.logger.unwrap_or_else(|| log::logger()),
            options,
            cursor: RefCell::new(None),
            status: Cell::new(ReaderState::Uninitialized),
        })
    }
}
