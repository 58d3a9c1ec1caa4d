//! Dynamic SQL fragments.
//!
//! Both builders are pure: they only assemble a fragment and its bind values,
//! numbering `$1, $2, ...` placeholders so the caller never has to.
//!
//! # Example
//!
//! ```ignore
//! use jobly::sql::{build_filter_clause, build_set_clause};
//!
//! let set = build_set_clause(&payload, JOB_COLUMNS)?;
//! let sql = format!("UPDATE jobs SET {} WHERE id = ${}", set.set_clause, set.next_placeholder());
//!
//! let filter = build_filter_clause(JOB_FILTERS, &criteria);
//! let sql = format!("SELECT * FROM jobs{}", filter.to_where_sql());
//! ```

mod filter;
mod partial_update;


pub use filter::{FilterClause, FilterKind, FilterRule, build_filter_clause};
pub use partial_update::{SetClause, TranslationTable, build_set_clause, column_for};
