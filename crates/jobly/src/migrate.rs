//! Schema migrations via [`refinery`].
//!
//! The job-board tables ship with the crate as embedded SQL files
//! (`migrations/V{n}__{name}.sql`) and are applied in version order.
//!
//! ```ignore
//! let pool = jobly::create_pool(&database_url)?;
//! let report = jobly::migrate::run_pool(&pool).await?;
//! ```

use crate::error::JoblyResult;

pub use refinery::{Migration, Report};

mod embedded {
    refinery::embed_migrations!("./migrations");
}

/// The embedded migrations, in version order.
pub fn migrations() -> Vec<Migration> {
    let mut all = embedded::migrations::runner().get_migrations().to_vec();
    all.sort_by_key(|m| m.version());
    all
}

/// Apply all pending migrations on a single PostgreSQL connection.
pub async fn run(client: &mut tokio_postgres::Client) -> JoblyResult<Report> {
    let report = embedded::migrations::runner().run_async(client).await?;
    for m in report.applied_migrations() {
        tracing::info!(target: "jobly.migrate", version = m.version(), name = m.name(), "applied");
    }
    Ok(report)
}

/// Acquire a connection from a pool and run migrations on it.
#[cfg(feature = "pool")]
pub async fn run_pool(pool: &deadpool_postgres::Pool) -> JoblyResult<Report> {
    let mut client = pool.get().await?;
    run(&mut client).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_migrations_are_ordered() {
        let names: Vec<String> = migrations().iter().map(|m| m.name().to_string()).collect();
        assert_eq!(
            names,
            ["create_companies", "create_jobs", "create_users"]
        );
    }
}
