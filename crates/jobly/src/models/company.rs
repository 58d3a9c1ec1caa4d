use crate::client::GenericClient;
use crate::error::{JoblyError, JoblyResult};
use crate::query::query;
use crate::row::{FromRow, RowExt};
use crate::sql::{FilterRule, TranslationTable, build_filter_clause, build_set_clause};
use crate::value::{FilterCriteria, UpdatePayload};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

pub const COMPANY_COLUMNS: &TranslationTable =
    &[("numEmployees", "num_employees"), ("logoUrl", "logo_url")];

pub const COMPANY_FILTERS: &[FilterRule] = &[
    FilterRule::at_least("minEmployees", "num_employees"),
    FilterRule::at_most("maxEmployees", "num_employees"),
    FilterRule::contains("nameLike", "name"),
];

const COMPANY_FIELDS: &str = "handle, name, description, num_employees, logo_url";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub handle: String,
    pub name: String,
    pub description: String,
    pub num_employees: Option<i32>,
    pub logo_url: Option<String>,
}

impl FromRow for Company {
    fn from_row(row: &Row) -> JoblyResult<Self> {
        Ok(Self {
            handle: row.try_get_column("handle")?,
            name: row.try_get_column("name")?,
            description: row.try_get_column("description")?,
            num_employees: row.try_get_column("num_employees")?,
            logo_url: row.try_get_column("logo_url")?,
        })
    }
}

/// A job as listed under its company.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyJob {
    pub id: i32,
    pub title: String,
    pub salary: Option<i32>,
    pub equity: Option<Decimal>,
}

impl FromRow for CompanyJob {
    fn from_row(row: &Row) -> JoblyResult<Self> {
        Ok(Self {
            id: row.try_get_column("id")?,
            title: row.try_get_column("title")?,
            salary: row.try_get_column("salary")?,
            equity: row.try_get_column("equity")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyDetail {
    #[serde(flatten)]
    pub company: Company,
    pub jobs: Vec<CompanyJob>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCompany {
    pub handle: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub num_employees: Option<i32>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl Company {
    /// Insert a company.
    ///
    /// Returns [`JoblyError::BadInput`] if the handle is already taken.
    pub async fn create(conn: &impl GenericClient, data: &NewCompany) -> JoblyResult<Company> {
        let duplicate = query("SELECT handle FROM companies WHERE handle = $1")
            .tag("companies.create.check")
            .bind(data.handle.as_str())
            .fetch_opt(conn)
            .await?;
        let duplicate_err =
            || JoblyError::bad_input(format!("Duplicate company: {}", data.handle));
        if duplicate.is_some() {
            return Err(duplicate_err());
        }

        query(format!(
            "INSERT INTO companies (handle, name, description, num_employees, logo_url) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COMPANY_FIELDS}"
        ))
        .tag("companies.create")
        .bind(data.handle.as_str())
        .bind(data.name.as_str())
        .bind(data.description.as_str())
        .bind(data.num_employees)
        .bind(data.logo_url.as_deref())
        .fetch_one_as(conn)
        .await
        .map_err(|e| e.unique_as_bad_input(duplicate_err))
    }

    /// All companies matching `criteria`, ordered by name.
    ///
    /// Recognized filters: `minEmployees`, `maxEmployees`, `nameLike`.
    pub async fn find_all(
        conn: &impl GenericClient,
        criteria: &FilterCriteria,
    ) -> JoblyResult<Vec<Company>> {
        let bound = |key: &str| criteria.get(key).and_then(|v| v.as_f64());
        if let (Some(min), Some(max)) = (bound("minEmployees"), bound("maxEmployees")) {
            if min > max {
                return Err(JoblyError::bad_input(
                    "minEmployees cannot be greater than maxEmployees",
                ));
            }
        }

        let filter = build_filter_clause(COMPANY_FILTERS, criteria);
        query(format!(
            "SELECT {COMPANY_FIELDS} FROM companies{} ORDER BY name",
            filter.to_where_sql()
        ))
        .tag("companies.find_all")
        .bind_all(filter.into_values())
        .fetch_all_as(conn)
        .await
    }

    /// A company and its jobs.
    pub async fn get(conn: &impl GenericClient, handle: &str) -> JoblyResult<CompanyDetail> {
        let company: Company = query(format!(
            "SELECT {COMPANY_FIELDS} FROM companies WHERE handle = $1"
        ))
        .tag("companies.get")
        .bind(handle)
        .fetch_opt_as(conn)
        .await?
        .ok_or_else(|| JoblyError::not_found(format!("No company: {handle}")))?;

        let jobs = query(
            "SELECT id, title, salary, equity FROM jobs WHERE company_handle = $1 ORDER BY id",
        )
        .tag("companies.get.jobs")
        .bind(handle)
        .fetch_all_as(conn)
        .await?;

        Ok(CompanyDetail { company, jobs })
    }

    /// Apply a partial update; only the fields present in `data` change.
    pub async fn update(
        conn: &impl GenericClient,
        handle: &str,
        data: &UpdatePayload,
    ) -> JoblyResult<Company> {
        let set = build_set_clause(data, COMPANY_COLUMNS)?;
        let handle_idx = set.next_placeholder();

        query(format!(
            "UPDATE companies SET {} WHERE handle = ${handle_idx} RETURNING {COMPANY_FIELDS}",
            set.set_clause
        ))
        .tag("companies.update")
        .bind_all(set.into_values())
        .bind(handle)
        .fetch_opt_as(conn)
        .await?
        .ok_or_else(|| JoblyError::not_found(format!("No company: {handle}")))
    }

    /// Delete a company (and, by cascade, its jobs).
    pub async fn remove(conn: &impl GenericClient, handle: &str) -> JoblyResult<()> {
        query("DELETE FROM companies WHERE handle = $1 RETURNING handle")
            .tag("companies.remove")
            .bind(handle)
            .fetch_opt(conn)
            .await?
            .map(|_| ())
            .ok_or_else(|| JoblyError::not_found(format!("No company: {handle}")))
    }
}
