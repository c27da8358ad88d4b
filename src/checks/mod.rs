//! The five condition checks.
//!
//! Each check is an independent predicate over a subset of
//! {URL, school name, college name, province, page facts} and returns a
//! [`crate::record::ConditionOutcome`] (the province check returns a ternary
//! verdict instead, since an ambiguous address is neither a pass nor a fail).
//! The orchestrator in [`crate::classifier`] owns the sequencing.

pub mod chinese;
pub mod college;
pub mod official;
pub mod province;
pub mod school;
