use crate::client::GenericClient;
use crate::error::{JoblyError, JoblyResult};
use crate::query::query;
use crate::row::{FromRow, RowExt};
use crate::sql::{FilterRule, TranslationTable, build_filter_clause, build_set_clause};
use crate::value::{FilterCriteria, SqlValue, UpdatePayload};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

pub const JOB_COLUMNS: &TranslationTable = &[("companyHandle", "company_handle")];

// Thresholds first, then substring matches, then flags.
pub const JOB_FILTERS: &[FilterRule] = &[
    FilterRule::at_least("minSalary", "salary"),
    FilterRule::contains("title", "title"),
    FilterRule::flag("hasEquity", "equity", "equity > 0"),
];

const JOB_FIELDS: &str = "id, title, salary, equity, company_handle";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i32,
    pub title: String,
    pub salary: Option<i32>,
    pub equity: Option<Decimal>,
    pub company_handle: String,
}

impl FromRow for Job {
    fn from_row(row: &Row) -> JoblyResult<Self> {
        Ok(Self {
            id: row.try_get_column("id")?,
            title: row.try_get_column("title")?,
            salary: row.try_get_column("salary")?,
            equity: row.try_get_column("equity")?,
            company_handle: row.try_get_column("company_handle")?,
        })
    }
}

/// Equity arrives as a numeric string (`"0.52"`) or a plain number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewJob {
    pub title: String,
    #[serde(default)]
    pub salary: Option<i32>,
    #[serde(default)]
    pub equity: SqlValue,
    pub company_handle: String,
}

impl Job {
    /// Insert a job for an existing company.
    pub async fn create(conn: &impl GenericClient, data: &NewJob) -> JoblyResult<Job> {
        query(format!(
            "INSERT INTO jobs (title, salary, equity, company_handle) \
             VALUES ($1, $2, $3, $4) RETURNING {JOB_FIELDS}"
        ))
        .tag("jobs.create")
        .bind(data.title.as_str())
        .bind(data.salary)
        .bind(data.equity.clone())
        .bind(data.company_handle.as_str())
        .fetch_one_as(conn)
        .await
        .map_err(|e| match e {
            JoblyError::ForeignKeyViolation(_) => {
                JoblyError::not_found(format!("No company: {}", data.company_handle))
            }
            other => other,
        })
    }

    /// All jobs matching `criteria`, ordered by title.
    ///
    /// Recognized filters:
    /// - `minSalary`: salary at least this amount
    /// - `title`: case-insensitive partial match
    /// - `hasEquity`: only jobs with non-zero equity, when exactly `true`
    pub async fn find_all(
        conn: &impl GenericClient,
        criteria: &FilterCriteria,
    ) -> JoblyResult<Vec<Job>> {
        let filter = build_filter_clause(JOB_FILTERS, criteria);
        query(format!(
            "SELECT {JOB_FIELDS} FROM jobs{} ORDER BY title",
            filter.to_where_sql()
        ))
        .tag("jobs.find_all")
        .bind_all(filter.into_values())
        .fetch_all_as(conn)
        .await
    }

    pub async fn get(conn: &impl GenericClient, id: i32) -> JoblyResult<Job> {
        query(format!("SELECT {JOB_FIELDS} FROM jobs WHERE id = $1"))
            .tag("jobs.get")
            .bind(id)
            .fetch_opt_as(conn)
            .await?
            .ok_or_else(|| JoblyError::not_found(format!("No job: {id}")))
    }

    /// Apply a partial update; only the fields present in `data` change.
    pub async fn update(conn: &impl GenericClient, id: i32, data: &UpdatePayload) -> JoblyResult<Job> {
        let set = build_set_clause(data, JOB_COLUMNS)?;
        let id_idx = set.next_placeholder();

        query(format!(
            "UPDATE jobs SET {} WHERE id = ${id_idx} RETURNING {JOB_FIELDS}",
            set.set_clause
        ))
        .tag("jobs.update")
        .bind_all(set.into_values())
        .bind(id)
        .fetch_opt_as(conn)
        .await?
        .ok_or_else(|| JoblyError::not_found(format!("No job: {id}")))
    }

    pub async fn remove(conn: &impl GenericClient, id: i32) -> JoblyResult<()> {
        query("DELETE FROM jobs WHERE id = $1 RETURNING id")
            .tag("jobs.remove")
            .bind(id)
            .fetch_opt(conn)
            .await?
            .map(|_| ())
            .ok_or_else(|| JoblyError::not_found(format!("No job: {id}")))
    }
}
