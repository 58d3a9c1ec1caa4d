//! Persistence operations for companies, jobs and users.
//!
//! Every operation takes any [`GenericClient`](crate::GenericClient), builds
//! its statement from a fixed base template plus the fragments produced by
//! [`crate::sql`], and maps missing rows to [`JoblyError::NotFound`](crate::JoblyError).

mod company;
mod job;
mod user;

pub use company::{COMPANY_COLUMNS, COMPANY_FILTERS, Company, CompanyDetail, CompanyJob, NewCompany};
pub use job::{JOB_COLUMNS, JOB_FILTERS, Job, NewJob};
pub use user::{NewUser, USER_COLUMNS, User, UserDetail};
