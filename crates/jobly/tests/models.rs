//! Model operations against a live database.
//!
//! Every test works inside a transaction that is rolled back when it is
//! dropped, so the database is left untouched. Tests are skipped when
//! `DATABASE_URL` is not set; point it at an empty scratch database.

use jobly::{
    Company, FilterCriteria, GenericClient, Job, JoblyError, JoblyResult, NewCompany, NewJob,
    NewUser, SqlValue, UpdatePayload, User,
};
use rust_decimal::Decimal;
use tokio::sync::OnceCell;

static MIGRATED: OnceCell<()> = OnceCell::const_new();

async fn try_connect() -> Option<tokio_postgres::Client> {
    dotenvy::dotenv().ok();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping");
            return None;
        }
    };
    let (mut client, connection) = tokio_postgres::connect(&database_url, tokio_postgres::NoTls)
        .await
        .expect("Failed to connect to DATABASE_URL with NoTls");
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("tokio-postgres connection error: {e}");
        }
    });

    let c = &mut client;
    MIGRATED
        .get_or_init(|| async move {
            jobly::migrate::run(c).await.expect("migrations failed");
        })
        .await;
    Some(client)
}

fn company(handle: &str, num_employees: i32) -> NewCompany {
    NewCompany {
        handle: handle.to_string(),
        name: handle.to_uppercase(),
        description: format!("Desc{handle}"),
        num_employees: Some(num_employees),
        logo_url: Some(format!("http://{handle}.img")),
    }
}

fn job(title: &str, salary: Option<i32>, equity: SqlValue, handle: &str) -> NewJob {
    NewJob {
        title: title.to_string(),
        salary,
        equity,
        company_handle: handle.to_string(),
    }
}

fn user(username: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        first_name: format!("{}F", username.to_uppercase()),
        last_name: format!("{}L", username.to_uppercase()),
        email: format!("{username}@user.com"),
        is_admin: false,
    }
}

/// Three companies, three jobs, two users; u1 applied to j1.
async fn seed(conn: &impl GenericClient) -> JoblyResult<Vec<i32>> {
    Company::create(conn, &company("c1", 1)).await?;
    Company::create(conn, &company("c2", 2)).await?;
    Company::create(conn, &company("c3", 3)).await?;

    let j1 = Job::create(conn, &job("j1", Some(70_000), "0.52".into(), "c3")).await?;
    let j2 = Job::create(conn, &job("j2", Some(80_000), "0".into(), "c2")).await?;
    let j3 = Job::create(conn, &job("j3", None, SqlValue::Null, "c1")).await?;

    User::register(conn, &user("u1")).await?;
    User::register(conn, &user("u2")).await?;
    User::apply_to_job(conn, "u1", j1.id).await?;

    Ok(vec![j1.id, j2.id, j3.id])
}

fn titles(jobs: &[Job]) -> Vec<&str> {
    jobs.iter().map(|j| j.title.as_str()).collect()
}

#[tokio::test]
async fn jobs_create_and_get() -> JoblyResult<()> {
    let Some(mut client) = try_connect().await else {
        return Ok(());
    };
    let tx = client.transaction().await?;
    let ids = seed(&tx).await?;

    let j1 = Job::get(&tx, ids[0]).await?;
    assert_eq!(j1.title, "j1");
    assert_eq!(j1.salary, Some(70_000));
    assert_eq!(j1.equity, Some("0.52".parse::<Decimal>().unwrap()));
    assert_eq!(j1.company_handle, "c3");

    let j3 = Job::get(&tx, ids[2]).await?;
    assert_eq!(j3.salary, None);
    assert_eq!(j3.equity, None);

    let err = Job::get(&tx, 0).await.unwrap_err();
    assert!(err.is_not_found());

    let err = Job::create(&tx, &job("orphan", None, SqlValue::Null, "nope"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
    Ok(())
}

#[tokio::test]
async fn jobs_find_all_applies_filters() -> JoblyResult<()> {
    let Some(mut client) = try_connect().await else {
        return Ok(());
    };
    let tx = client.transaction().await?;
    seed(&tx).await?;

    let all = Job::find_all(&tx, &FilterCriteria::new()).await?;
    assert_eq!(titles(&all), ["j1", "j2", "j3"]);

    let criteria = FilterCriteria::new().with("minSalary", 75_000);
    assert_eq!(titles(&Job::find_all(&tx, &criteria).await?), ["j2"]);

    let criteria = FilterCriteria::new().with("title", "J1");
    assert_eq!(titles(&Job::find_all(&tx, &criteria).await?), ["j1"]);

    let criteria = FilterCriteria::new()
        .with("title", "j")
        .with("minSalary", 2)
        .with("hasEquity", true);
    assert_eq!(titles(&Job::find_all(&tx, &criteria).await?), ["j1"]);

    // Only a literal `true` filters on equity.
    let criteria = FilterCriteria::new().with("hasEquity", "true");
    assert_eq!(Job::find_all(&tx, &criteria).await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn jobs_partial_update() -> JoblyResult<()> {
    let Some(mut client) = try_connect().await else {
        return Ok(());
    };
    let tx = client.transaction().await?;
    let ids = seed(&tx).await?;

    let patch = UpdatePayload::new().with("title", "Staff").with("equity", "0.1");
    let updated = Job::update(&tx, ids[1], &patch).await?;
    assert_eq!(updated.title, "Staff");
    assert_eq!(updated.salary, Some(80_000));
    assert_eq!(updated.equity, Some("0.1".parse::<Decimal>().unwrap()));

    let patch = UpdatePayload::new().with("salary", SqlValue::Null);
    assert_eq!(Job::update(&tx, ids[1], &patch).await?.salary, None);

    let err = Job::update(&tx, ids[1], &UpdatePayload::new()).await.unwrap_err();
    assert!(err.is_bad_input());

    let patch = UpdatePayload::new().with("title", "x");
    assert!(Job::update(&tx, 0, &patch).await.unwrap_err().is_not_found());

    Job::remove(&tx, ids[1]).await?;
    assert!(Job::remove(&tx, ids[1]).await.unwrap_err().is_not_found());
    Ok(())
}

#[tokio::test]
async fn companies_filter_and_detail() -> JoblyResult<()> {
    let Some(mut client) = try_connect().await else {
        return Ok(());
    };
    let tx = client.transaction().await?;
    seed(&tx).await?;

    let handles = |cs: Vec<Company>| cs.into_iter().map(|c| c.handle).collect::<Vec<_>>();

    let criteria = FilterCriteria::new()
        .with("minEmployees", 2)
        .with("maxEmployees", 3);
    assert_eq!(handles(Company::find_all(&tx, &criteria).await?), ["c2", "c3"]);

    let criteria = FilterCriteria::new().with("nameLike", "1");
    assert_eq!(handles(Company::find_all(&tx, &criteria).await?), ["c1"]);

    let criteria = FilterCriteria::new()
        .with("minEmployees", 3)
        .with("maxEmployees", 1);
    let err = Company::find_all(&tx, &criteria).await.unwrap_err();
    assert!(matches!(err, JoblyError::BadInput(_)));

    let detail = Company::get(&tx, "c3").await?;
    assert_eq!(detail.company.num_employees, Some(3));
    assert_eq!(detail.jobs.len(), 1);
    assert_eq!(detail.jobs[0].title, "j1");

    let err = Company::create(&tx, &company("c1", 9)).await.unwrap_err();
    assert!(err.is_bad_input());

    let patch = UpdatePayload::new()
        .with("numEmployees", 10)
        .with("logoUrl", SqlValue::Null);
    let updated = Company::update(&tx, "c1", &patch).await?;
    assert_eq!(updated.num_employees, Some(10));
    assert_eq!(updated.logo_url, None);

    Company::remove(&tx, "c3").await?;
    assert!(Company::get(&tx, "c3").await.unwrap_err().is_not_found());
    Ok(())
}

#[tokio::test]
async fn users_update_and_apply() -> JoblyResult<()> {
    let Some(mut client) = try_connect().await else {
        return Ok(());
    };
    let tx = client.transaction().await?;
    let ids = seed(&tx).await?;

    let patch = UpdatePayload::new()
        .with("firstName", "Hermione")
        .with("lastName", "Granger");
    let updated = User::update(&tx, "u1", &patch).await?;
    assert_eq!(updated.first_name, "Hermione");
    assert_eq!(updated.last_name, "Granger");
    assert_eq!(updated.email, "u1@user.com");

    let detail = User::get(&tx, "u1").await?;
    assert_eq!(detail.jobs, vec![ids[0]]);

    User::apply_to_job(&tx, "u1", ids[1]).await?;
    assert_eq!(User::get(&tx, "u1").await?.jobs, vec![ids[0], ids[1]]);

    let err = User::apply_to_job(&tx, "u1", ids[0]).await.unwrap_err();
    assert!(err.is_bad_input());
    assert_eq!(err.to_string(), format!("Bad request: u1 already applied to job {}", ids[0]));

    // The transaction stays usable after a duplicate application.
    assert_eq!(User::get(&tx, "u1").await?.jobs, vec![ids[0], ids[1]]);

    let err = User::apply_to_job(&tx, "u1", 0).await.unwrap_err();
    assert!(err.is_not_found());
    let err = User::apply_to_job(&tx, "nope", ids[0]).await.unwrap_err();
    assert!(err.is_not_found());

    let err = User::register(&tx, &user("u2")).await.unwrap_err();
    assert!(err.is_bad_input());

    User::remove(&tx, "u2").await?;
    let names: Vec<String> = User::find_all(&tx)
        .await?
        .into_iter()
        .map(|u| u.username)
        .collect();
    assert_eq!(names, ["u1"]);
    Ok(())
}
