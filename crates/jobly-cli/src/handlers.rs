use crate::cli::{Action, Resource};
use jobly::validate::{self, Schema};
use jobly::{
    Company, GenericClient, Job, JoblyError, JoblyResult, NewCompany, NewJob, NewUser,
    UpdatePayload, User,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Run one action and build its JSON response body.
pub async fn dispatch(
    conn: &impl GenericClient,
    resource: Resource,
    action: Action,
) -> JoblyResult<Value> {
    match resource {
        Resource::Companies => companies(conn, action).await,
        Resource::Jobs => jobs(conn, action).await,
        Resource::Users => users(conn, action).await,
    }
}

async fn companies(conn: &impl GenericClient, action: Action) -> JoblyResult<Value> {
    match action {
        Action::List(criteria) => {
            validate::COMPANY_FILTER.validate(criteria.iter())?;
            envelope("companies", Company::find_all(conn, &criteria).await?)
        }
        Action::Get(handle) => envelope("company", Company::get(conn, &handle).await?),
        Action::Create(body) => {
            let data: NewCompany = parse_body(&body, &validate::COMPANY_NEW)?;
            envelope("company", Company::create(conn, &data).await?)
        }
        Action::Update { key, body } => {
            let patch = parse_patch(&body, &validate::COMPANY_UPDATE)?;
            envelope("company", Company::update(conn, &key, &patch).await?)
        }
        Action::Delete(handle) => {
            Company::remove(conn, &handle).await?;
            envelope("deleted", handle)
        }
        Action::Apply { .. } => Err(unsupported("companies", "apply")),
    }
}

async fn jobs(conn: &impl GenericClient, action: Action) -> JoblyResult<Value> {
    match action {
        Action::List(criteria) => {
            validate::JOB_FILTER.validate(criteria.iter())?;
            envelope("jobs", Job::find_all(conn, &criteria).await?)
        }
        Action::Get(id) => envelope("job", Job::get(conn, parse_job_id(&id)?).await?),
        Action::Create(body) => {
            let data: NewJob = parse_body(&body, &validate::JOB_NEW)?;
            envelope("job", Job::create(conn, &data).await?)
        }
        Action::Update { key, body } => {
            let id = parse_job_id(&key)?;
            let patch = parse_patch(&body, &validate::JOB_UPDATE)?;
            envelope("job", Job::update(conn, id, &patch).await?)
        }
        Action::Delete(id) => {
            let id = parse_job_id(&id)?;
            Job::remove(conn, id).await?;
            envelope("deleted", id)
        }
        Action::Apply { .. } => Err(unsupported("jobs", "apply")),
    }
}

async fn users(conn: &impl GenericClient, action: Action) -> JoblyResult<Value> {
    match action {
        Action::List(_) => envelope("users", User::find_all(conn).await?),
        Action::Get(username) => envelope("user", User::get(conn, &username).await?),
        Action::Create(body) => {
            let data: NewUser = parse_body(&body, &validate::USER_NEW)?;
            envelope("user", User::register(conn, &data).await?)
        }
        Action::Update { key, body } => {
            let patch = parse_patch(&body, &validate::USER_UPDATE)?;
            envelope("user", User::update(conn, &key, &patch).await?)
        }
        Action::Delete(username) => {
            User::remove(conn, &username).await?;
            envelope("deleted", username)
        }
        Action::Apply { username, job_id } => {
            let job_id = parse_job_id(&job_id)?;
            User::apply_to_job(conn, &username, job_id).await?;
            envelope("applied", job_id)
        }
    }
}

/// `{"<key>": value}`
fn envelope(key: &str, value: impl Serialize) -> JoblyResult<Value> {
    let value = serde_json::to_value(value).map_err(|e| JoblyError::Other(e.to_string()))?;
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Ok(Value::Object(map))
}

/// Render a failure as `{"error": {"message", "status"}}`.
pub fn error_body(err: &JoblyError) -> Value {
    let message = match err {
        JoblyError::BadInput(m) | JoblyError::NotFound(m) => m.clone(),
        JoblyError::Validation(errs) => errs.to_string(),
        other => other.to_string(),
    };
    serde_json::json!({
        "error": {
            "message": message,
            "status": err.status_code(),
        }
    })
}

fn invalid_json(e: serde_json::Error) -> JoblyError {
    JoblyError::bad_input(format!("invalid JSON body: {e}"))
}

/// Parse a partial update body, keeping its key order.
fn parse_patch(body: &str, schema: &Schema) -> JoblyResult<UpdatePayload> {
    let patch: UpdatePayload = serde_json::from_str(body).map_err(invalid_json)?;
    schema.validate(patch.iter())?;
    Ok(patch)
}

/// Validate a create body against `schema`, then deserialize it.
fn parse_body<T: DeserializeOwned>(body: &str, schema: &Schema) -> JoblyResult<T> {
    parse_patch(body, schema)?;
    serde_json::from_str(body).map_err(invalid_json)
}

fn parse_job_id(raw: &str) -> JoblyResult<i32> {
    raw.trim()
        .parse()
        .map_err(|_| JoblyError::bad_input(format!("job id must be an integer: {raw}")))
}

fn unsupported(resource: &str, action: &str) -> JoblyError {
    JoblyError::bad_input(format!("`{action}` is not available for {resource}"))
}
