//! Duplicate grouping.
//!
//! This module provides:
//! - [`ResultMap`], the fingerprint-to-files mapping a walk produces
//! - Views over it (flatten, predicate filtering, duplicate groups)
//! - Stock predicates for common filters

pub mod groups;

pub use groups::{has_extension, size_greater_than, FilePredicate, GroupSummary, ResultMap};
