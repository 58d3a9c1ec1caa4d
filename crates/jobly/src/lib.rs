//! # jobly
//!
//! The data layer of a job board: companies, the jobs they post, and the
//! users who apply to them, stored in PostgreSQL.
//!
//! ## Features
//!
//! - **Partial updates**: [`sql::build_set_clause`] turns a sparse payload into a
//!   `SET` list with correctly numbered `$n` placeholders
//! - **Search filters**: [`sql::build_filter_clause`] turns optional criteria into a
//!   `WHERE (...)` group, evaluating a fixed list of [`sql::FilterRule`]s
//! - **Schema validation**: [`validate`] rejects unknown keys and mistyped
//!   values before anything reaches SQL
//! - **Transaction-friendly**: models accept anything implementing [`GenericClient`]
//! - **SQL tracing**: wrap a client in [`TracingClient`] to log every statement
//!
//! ## Example
//!
//! ```ignore
//! use jobly::{FilterCriteria, Job, UpdatePayload};
//!
//! let criteria = FilterCriteria::new().with("minSalary", 50_000).with("hasEquity", true);
//! let jobs = Job::find_all(&client, &criteria).await?;
//!
//! let patch = UpdatePayload::new().with("title", "Staff Engineer");
//! let job = Job::update(&client, jobs[0].id, &patch).await?;
//! ```

pub mod changeset;
pub mod client;
pub mod error;
pub mod models;
pub mod monitor;
pub mod query;
pub mod row;
pub mod sql;
pub mod validate;
pub mod value;

pub use changeset::{ValidationCode, ValidationError, ValidationErrors};
pub use client::GenericClient;
pub use error::{JoblyError, JoblyResult};
pub use models::{
    Company, CompanyDetail, CompanyJob, Job, NewCompany, NewJob, NewUser, User, UserDetail,
};
pub use monitor::TracingClient;
pub use query::{Query, query};
pub use row::{FromRow, RowExt};
pub use sql::{FilterClause, FilterRule, SetClause, build_filter_clause, build_set_clause};
pub use value::{FilterCriteria, SqlValue, UpdatePayload};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};

#[cfg(feature = "migrate")]
pub mod migrate;
