use crate::cli::ConnArgs;
use crate::config;
use anyhow::Context;

pub async fn run(conn: ConnArgs) -> anyhow::Result<()> {
    let settings = config::resolve(&conn)?;
    let pool = jobly::create_pool_with_config(&settings.url, 1)
        .context("failed to configure database pool")?;

    let report = jobly::migrate::run_pool(&pool)
        .await
        .context("failed to apply migrations")?;

    let applied = report.applied_migrations();
    if applied.is_empty() {
        println!("database is up to date");
    }
    for m in applied {
        println!("applied V{}__{}", m.version(), m.name());
    }
    Ok(())
}
