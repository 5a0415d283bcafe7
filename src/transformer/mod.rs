//! # Transformers
//!
//! Transformers resolving EAV records from scalar values, usable directly or
//! through [`crate::core::task::TransformerTask`].

pub mod eav_finder;
