//! CRM views computed over loaded application and lead rows.
//!
//! Everything in this module is pure: the services load rows from the store,
//! and these functions turn them into tables, exports, and dashboard figures.

pub mod export;
pub mod kpi;
pub mod pivot;
pub mod query;

#[cfg(test)]
pub(crate) mod fixtures;
