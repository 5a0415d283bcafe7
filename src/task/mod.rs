//! # Tasks
//!
//! Pipeline tasks working on EAV records:
//!
//! - [`eav_reader::EavReaderTask`] iterates over the records matched by a static query
//! - [`eav_criteria_reader::EavCriteriaReaderTask`] iterates over the records matched by the
//!   criteria received as step input
//! - [`eav_update_single_value::EavUpdateSingleValueTask`] updates and flushes one value of
//!   the input record

use crate::BatchError;

pub mod eav_criteria_reader;
pub mod eav_reader;
pub mod eav_update_single_value;

/// Option types shared by the tasks.
pub mod options;

pub(crate) fn required(option: &str) -> BatchError {
    BatchError::InvalidOption {
        option: option.to_string(),
        message: "option is required".to_string(),
    }
}
