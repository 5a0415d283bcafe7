use thiserror::Error;

use crate::eav::pager::PagingError;

#[derive(Error, Debug)]
/// Batch error
pub enum BatchError {
    #[error("Reader was closed previously, stopping the process")]
    ReopenDenied,

    #[error("No iterator initialized")]
    NoIteratorInitialized,

    #[error("Missing family {code}")]
    MissingFamily { code: String },

    #[error("Family {family} has no attribute named {attribute}")]
    MissingAttribute { family: String, attribute: String },

    #[error("Invalid value for option '{option}': {message}")]
    InvalidOption { option: String, message: String },

    #[error("Unexpected input: {0}")]
    UnexpectedInput(String),

    #[error("Missing entity for family {family} and attribute {attribute} with value '{value}'")]
    MissingData {
        family: String,
        attribute: String,
        value: String,
    },

    #[error("Paging error: {0}")]
    Paging(#[from] PagingError),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("ItemWriter from: {0}")]
    ItemWriter(String),
}
