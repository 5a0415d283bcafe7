use thiserror::Error;

use crate::BatchError;

use super::{Data, EavFinder, Query};

/// Default number of records fetched per page.
pub const DEFAULT_MAX_PER_PAGE: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PagingError {
    #[error("Current page must be greater than or equal to 1, got {0}")]
    LessThanOneCurrentPage(usize),

    #[error("Page {page} is out of range, the result has {pages} page(s)")]
    OutOfRangeCurrentPage { page: usize, pages: usize },

    #[error("Max per page must be greater than or equal to 1")]
    InvalidMaxPerPage,
}

/// A countable, forward-only cursor over a result set.
///
/// `current` is `None` when the cursor is not positioned on an element,
/// either because the result set is empty or because it is exhausted.
pub trait PagedCursor<T> {
    fn current(&self) -> Option<&T>;

    /// Moves to the next element, returns false once the end is reached.
    fn advance(&mut self) -> Result<bool, BatchError>;

    /// Total number of elements, may trigger a count query.
    fn count(&mut self) -> Result<usize, BatchError>;
}

/// Lazily fetches the records of a query, one page at a time.
///
/// Only the current page is held in memory. The next page is requested from
/// the finder when the cursor moves past the last buffered record.
pub struct Pager<'a> {
    finder: &'a dyn EavFinder,
    query: Query,
    max_per_page: usize,
    current_page: usize,
    nb_results: Option<usize>,
    buffer: Vec<Data>,
    index: usize,
    opened: bool,
}

impl<'a> Pager<'a> {
    pub fn new(
        finder: &'a dyn EavFinder,
        query: Query,
        max_per_page: usize,
    ) -> Result<Self, BatchError> {
        if max_per_page == 0 {
            return Err(PagingError::InvalidMaxPerPage.into());
        }

        Ok(Self {
            finder,
            query,
            max_per_page,
            current_page: 1,
            nb_results: None,
            buffer: Vec::new(),
            index: 0,
            opened: false,
        })
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn max_per_page(&self) -> usize {
        self.max_per_page
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Sets the page the cursor starts from.
    ///
    /// Page 1 is always accepted, even for an empty result set. Any other
    /// page is checked against the page count, which requires a count query.
    pub fn set_current_page(&mut self, page: usize) -> Result<(), BatchError> {
        if page < 1 {
            return Err(PagingError::LessThanOneCurrentPage(page).into());
        }
        if page > 1 {
            let pages = self.nb_pages()?;
            if page > pages {
                return Err(PagingError::OutOfRangeCurrentPage { page, pages }.into());
            }
        }
        self.current_page = page;
        Ok(())
    }

    pub fn nb_pages(&mut self) -> Result<usize, BatchError> {
        let nb_results = self.count()?;
        Ok(nb_results.div_ceil(self.max_per_page).max(1))
    }

    /// Fetches the current page and positions the cursor on its first record.
    pub fn open(&mut self) -> Result<(), BatchError> {
        self.fetch_page(self.current_page)?;
        self.opened = true;
        Ok(())
    }

    fn fetch_page(&mut self, page: usize) -> Result<(), BatchError> {
        let offset = (page - 1) * self.max_per_page;
        log::debug!(
            "Fetching page {} ({} records from offset {}) for {}",
            page,
            self.max_per_page,
            offset,
            self.query
        );
        self.buffer = self.finder.fetch(&self.query, offset, self.max_per_page)?;
        self.current_page = page;
        self.index = 0;
        Ok(())
    }

    fn is_last_page(&self) -> bool {
        self.buffer.len() < self.max_per_page
    }
}

impl PagedCursor<Data> for Pager<'_> {
    fn current(&self) -> Option<&Data> {
        self.buffer.get(self.index)
    }

    fn advance(&mut self) -> Result<bool, BatchError> {
        if !self.opened {
            self.open()?;
            return Ok(self.current().is_some());
        }
        if self.index >= self.buffer.len() {
            return Ok(false);
        }
        if self.index + 1 < self.buffer.len() {
            self.index += 1;
            return Ok(true);
        }
        if self.is_last_page() {
            self.index = self.buffer.len();
            return Ok(false);
        }

        // The cursor stays on the current record until the next page is in.
        self.fetch_page(self.current_page + 1)?;
        Ok(!self.buffer.is_empty())
    }

    fn count(&mut self) -> Result<usize, BatchError> {
        match self.nb_results {
            Some(nb_results) => Ok(nb_results),
            None => {
                let nb_results = self.finder.count(&self.query)?;
                self.nb_results = Some(nb_results);
                Ok(nb_results)
            }
        }
    }
}
