use crate::client::GenericClient;
use crate::error::{JoblyError, JoblyResult};
use crate::query::query;
use crate::row::{FromRow, RowExt};
use crate::sql::{TranslationTable, build_set_clause};
use crate::value::UpdatePayload;
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

pub const USER_COLUMNS: &TranslationTable = &[
    ("firstName", "first_name"),
    ("lastName", "last_name"),
    ("isAdmin", "is_admin"),
];

const USER_FIELDS: &str = "username, first_name, last_name, email, is_admin";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_admin: bool,
}

impl FromRow for User {
    fn from_row(row: &Row) -> JoblyResult<Self> {
        Ok(Self {
            username: row.try_get_column("username")?,
            first_name: row.try_get_column("first_name")?,
            last_name: row.try_get_column("last_name")?,
            email: row.try_get_column("email")?,
            is_admin: row.try_get_column("is_admin")?,
        })
    }
}

/// A user plus the ids of the jobs they applied to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    #[serde(rename = "jobsApplied")]
    pub jobs: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

fn no_user(username: &str) -> JoblyError {
    JoblyError::not_found(format!("No user: {username}"))
}

impl User {
    /// Register a user.
    ///
    /// Returns [`JoblyError::BadInput`] if the username is already taken.
    pub async fn register(conn: &impl GenericClient, data: &NewUser) -> JoblyResult<User> {
        let duplicate = query("SELECT username FROM users WHERE username = $1")
            .tag("users.register.check")
            .bind(data.username.as_str())
            .fetch_opt(conn)
            .await?;
        let duplicate_err =
            || JoblyError::bad_input(format!("Duplicate username: {}", data.username));
        if duplicate.is_some() {
            return Err(duplicate_err());
        }

        query(format!(
            "INSERT INTO users (username, first_name, last_name, email, is_admin) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_FIELDS}"
        ))
        .tag("users.register")
        .bind(data.username.as_str())
        .bind(data.first_name.as_str())
        .bind(data.last_name.as_str())
        .bind(data.email.as_str())
        .bind(data.is_admin)
        .fetch_one_as(conn)
        .await
        .map_err(|e| e.unique_as_bad_input(duplicate_err))
    }

    /// All users, ordered by username.
    pub async fn find_all(conn: &impl GenericClient) -> JoblyResult<Vec<User>> {
        query(format!("SELECT {USER_FIELDS} FROM users ORDER BY username"))
            .tag("users.find_all")
            .fetch_all_as(conn)
            .await
    }

    /// A user and the jobs they applied to.
    pub async fn get(conn: &impl GenericClient, username: &str) -> JoblyResult<UserDetail> {
        let user: User = query(format!("SELECT {USER_FIELDS} FROM users WHERE username = $1"))
            .tag("users.get")
            .bind(username)
            .fetch_opt_as(conn)
            .await?
            .ok_or_else(|| no_user(username))?;

        let rows = query("SELECT job_id FROM applications WHERE username = $1 ORDER BY job_id")
            .tag("users.get.applications")
            .bind(username)
            .fetch_all(conn)
            .await?;
        let jobs = rows
            .iter()
            .map(|row| row.try_get_column::<i32>("job_id"))
            .collect::<JoblyResult<Vec<_>>>()?;

        Ok(UserDetail { user, jobs })
    }

    /// Apply a partial update; only the fields present in `data` change.
    pub async fn update(
        conn: &impl GenericClient,
        username: &str,
        data: &UpdatePayload,
    ) -> JoblyResult<User> {
        let set = build_set_clause(data, USER_COLUMNS)?;
        let username_idx = set.next_placeholder();

        query(format!(
            "UPDATE users SET {} WHERE username = ${username_idx} RETURNING {USER_FIELDS}",
            set.set_clause
        ))
        .tag("users.update")
        .bind_all(set.into_values())
        .bind(username)
        .fetch_opt_as(conn)
        .await?
        .ok_or_else(|| no_user(username))
    }

    pub async fn remove(conn: &impl GenericClient, username: &str) -> JoblyResult<()> {
        query("DELETE FROM users WHERE username = $1 RETURNING username")
            .tag("users.remove")
            .bind(username)
            .fetch_opt(conn)
            .await?
            .map(|_| ())
            .ok_or_else(|| no_user(username))
    }

    /// Record that `username` applied to job `job_id`.
    ///
    /// Missing users or jobs are [`JoblyError::NotFound`]; applying twice is
    /// [`JoblyError::BadInput`].
    pub async fn apply_to_job(
        conn: &impl GenericClient,
        username: &str,
        job_id: i32,
    ) -> JoblyResult<()> {
        query("SELECT id FROM jobs WHERE id = $1")
            .tag("users.apply.job")
            .bind(job_id)
            .fetch_opt(conn)
            .await?
            .ok_or_else(|| JoblyError::not_found(format!("No job: {job_id}")))?;

        query("SELECT username FROM users WHERE username = $1")
            .tag("users.apply.user")
            .bind(username)
            .fetch_opt(conn)
            .await?
            .ok_or_else(|| no_user(username))?;

        // Must not fail on duplicates: that aborts the caller's transaction.
        let already_applied =
            || JoblyError::bad_input(format!("{username} already applied to job {job_id}"));
        query(
            "INSERT INTO applications (job_id, username) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING RETURNING job_id",
        )
        .tag("users.apply")
        .bind(job_id)
        .bind(username)
        .fetch_opt(conn)
        .await
        .map_err(|e| e.unique_as_bad_input(already_applied))?
        .map(|_| ())
        .ok_or_else(already_applied)
    }
}
