use jobly::{FilterCriteria, SqlValue};
use std::path::PathBuf;

pub const DEFAULT_CONFIG: &str = "jobly.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Companies,
    Jobs,
    Users,
    Migrate,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Resource(ResourceArgs),
    Migrate(ConnArgs),
}

/// Where to find the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnArgs {
    pub config: PathBuf,
    pub database: Option<String>,
}

impl Default for ConnArgs {
    fn default() -> Self {
        Self {
            config: PathBuf::from(DEFAULT_CONFIG),
            database: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Companies,
    Jobs,
    Users,
}

impl Resource {
    fn help_topic(self) -> HelpTopic {
        match self {
            Self::Companies => HelpTopic::Companies,
            Self::Jobs => HelpTopic::Jobs,
            Self::Users => HelpTopic::Users,
        }
    }

    fn filter_flags(self) -> &'static [FilterFlag] {
        match self {
            Self::Companies => COMPANY_FLAGS,
            Self::Jobs => JOB_FLAGS,
            Self::Users => &[],
        }
    }
}

/// What to do with a resource. Bodies stay raw JSON until the handler
/// validates them.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    List(FilterCriteria),
    Get(String),
    Create(String),
    Update { key: String, body: String },
    Delete(String),
    Apply { username: String, job_id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceArgs {
    pub conn: ConnArgs,
    pub resource: Resource,
    pub action: Action,
}

#[derive(Debug, Clone, Copy)]
enum FlagValue {
    /// Parsed as a number when possible; anything else is kept as text so
    /// validation can report it.
    Number,
    Text,
    /// Only the literal `true` is `true`.
    Bool,
}

impl FlagValue {
    fn coerce(self, raw: &str) -> SqlValue {
        match self {
            Self::Number => raw
                .parse::<i64>()
                .map(SqlValue::Int)
                .or_else(|_| raw.parse::<f64>().map(SqlValue::Float))
                .unwrap_or_else(|_| SqlValue::from(raw)),
            Self::Text => SqlValue::from(raw),
            Self::Bool => SqlValue::Bool(raw == "true"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FilterFlag {
    flag: &'static str,
    key: &'static str,
    value: FlagValue,
}

const COMPANY_FLAGS: &[FilterFlag] = &[
    FilterFlag {
        flag: "--min-employees",
        key: "minEmployees",
        value: FlagValue::Number,
    },
    FilterFlag {
        flag: "--max-employees",
        key: "maxEmployees",
        value: FlagValue::Number,
    },
    FilterFlag {
        flag: "--name-like",
        key: "nameLike",
        value: FlagValue::Text,
    },
];

const JOB_FLAGS: &[FilterFlag] = &[
    FilterFlag {
        flag: "--min-salary",
        key: "minSalary",
        value: FlagValue::Number,
    },
    FilterFlag {
        flag: "--title",
        key: "title",
        value: FlagValue::Text,
    },
    FilterFlag {
        flag: "--has-equity",
        key: "hasEquity",
        value: FlagValue::Bool,
    },
];

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1);
    let Some(first) = it.next() else {
        return Ok(Command::Help(HelpTopic::Root));
    };

    let it = it.map(|s| s.as_str());
    match first.as_str() {
        "-h" | "--help" => Ok(Command::Help(HelpTopic::Root)),
        "companies" => parse_resource(Resource::Companies, it),
        "jobs" => parse_resource(Resource::Jobs, it),
        "users" => parse_resource(Resource::Users, it),
        "migrate" => parse_migrate(it),
        _ => anyhow::bail!("unknown command: {first}"),
    }
}

/// Value of `--name value` or `--name=value`.
fn option_value<'a>(
    name: &str,
    inline: Option<&'a str>,
    it: &mut impl Iterator<Item = &'a str>,
) -> anyhow::Result<&'a str> {
    match inline {
        Some(v) => Ok(v),
        None => it
            .next()
            .ok_or_else(|| anyhow::anyhow!("{name} requires a value")),
    }
}

/// Handle `--config` / `--database`; returns false for any other option.
fn parse_conn_option<'a>(
    conn: &mut ConnArgs,
    name: &str,
    inline: Option<&'a str>,
    it: &mut impl Iterator<Item = &'a str>,
) -> anyhow::Result<bool> {
    match name {
        "--config" => conn.config = PathBuf::from(option_value(name, inline, it)?),
        "--database" => conn.database = Some(option_value(name, inline, it)?.to_string()),
        _ => return Ok(false),
    }
    Ok(true)
}

fn split_option(token: &str) -> (&str, Option<&str>) {
    match token.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (token, None),
    }
}

fn parse_resource<'a>(
    resource: Resource,
    mut it: impl Iterator<Item = &'a str>,
) -> anyhow::Result<Command> {
    let mut conn = ConnArgs::default();
    let mut criteria = FilterCriteria::new();
    let mut positionals: Vec<&str> = Vec::new();

    while let Some(token) = it.next() {
        if token == "-h" || token == "--help" {
            return Ok(Command::Help(resource.help_topic()));
        }
        if !token.starts_with("--") {
            positionals.push(token);
            continue;
        }

        let (name, inline) = split_option(token);
        if parse_conn_option(&mut conn, name, inline, &mut it)? {
            continue;
        }
        let Some(flag) = resource.filter_flags().iter().find(|f| f.flag == name) else {
            anyhow::bail!("unknown argument: {token}");
        };
        let raw = option_value(name, inline, &mut it)?;
        criteria.insert(flag.key, flag.value.coerce(raw));
    }

    if !criteria.is_empty() && positionals.first() != Some(&"list") {
        anyhow::bail!("filter options are only valid with `list`");
    }

    let action = match positionals.as_slice() {
        [] => return Ok(Command::Help(resource.help_topic())),
        ["list"] => Action::List(criteria),
        ["get", key] => Action::Get(key.to_string()),
        ["create", body] => Action::Create(body.to_string()),
        ["update", key, body] => Action::Update {
            key: key.to_string(),
            body: body.to_string(),
        },
        ["delete", key] => Action::Delete(key.to_string()),
        ["apply", username, job_id] if resource == Resource::Users => Action::Apply {
            username: username.to_string(),
            job_id: job_id.to_string(),
        },
        [name @ ("list" | "get" | "create" | "update" | "delete"), ..] => {
            anyhow::bail!("wrong number of arguments for `{name}`")
        }
        ["apply", ..] if resource == Resource::Users => {
            anyhow::bail!("wrong number of arguments for `apply`")
        }
        [other, ..] => anyhow::bail!("unknown subcommand: {other}"),
    };

    Ok(Command::Resource(ResourceArgs {
        conn,
        resource,
        action,
    }))
}

fn parse_migrate<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut conn = ConnArgs::default();

    while let Some(token) = it.next() {
        if token == "-h" || token == "--help" {
            return Ok(Command::Help(HelpTopic::Migrate));
        }
        let (name, inline) = split_option(token);
        if !parse_conn_option(&mut conn, name, inline, &mut it)? {
            anyhow::bail!("unknown argument: {token}");
        }
    }

    Ok(Command::Migrate(conn))
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
jobly - job board data tool

USAGE:
  jobly <COMMAND> [OPTIONS]

COMMANDS:
  companies             List, show and edit companies
  jobs                  List, show and edit jobs
  users                 List, show and edit users; record applications
  migrate               Create or upgrade the database tables

GLOBAL OPTIONS:
  --config <FILE>       Config file path (default: jobly.toml)
  --database <URL>      Database URL (overrides config and DATABASE_URL)
  -h, --help            Print help

Results are printed to stdout as JSON. Errors print
{{\"error\": {{\"message\", \"status\"}}}} and exit with status 1."
            );
        }
        HelpTopic::Companies => {
            println!(
                "\
USAGE:
  jobly companies list [--min-employees <N>] [--max-employees <N>] [--name-like <TEXT>]
  jobly companies get <handle>
  jobly companies create <json>
  jobly companies update <handle> <json>
  jobly companies delete <handle>

OPTIONS:
  --min-employees <N>   At least N employees
  --max-employees <N>   At most N employees
  --name-like <TEXT>    Case-insensitive name match
  -h, --help            Print help"
            );
        }
        HelpTopic::Jobs => {
            println!(
                "\
USAGE:
  jobly jobs list [--min-salary <N>] [--title <TEXT>] [--has-equity true]
  jobly jobs get <id>
  jobly jobs create <json>
  jobly jobs update <id> <json>
  jobly jobs delete <id>

OPTIONS:
  --min-salary <N>      Salary of at least N
  --title <TEXT>        Case-insensitive title match
  --has-equity <BOOL>   `true` keeps only jobs offering equity
  -h, --help            Print help"
            );
        }
        HelpTopic::Users => {
            println!(
                "\
USAGE:
  jobly users list
  jobly users get <username>
  jobly users create <json>
  jobly users update <username> <json>
  jobly users delete <username>
  jobly users apply <username> <job-id>

OPTIONS:
  -h, --help            Print help"
            );
        }
        HelpTopic::Migrate => {
            println!(
                "\
USAGE:
  jobly migrate [OPTIONS]

Applies the embedded migrations that have not run yet.

OPTIONS:
  --config <FILE>       Config file path (default: jobly.toml)
  --database <URL>      Database URL (overrides config)
  -h, --help            Print help"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("jobly")
            .chain(list.iter().copied())
            .map(str::to_string)
            .collect()
    }

    fn resource(list: &[&str]) -> ResourceArgs {
        match parse_args(&args(list)).unwrap() {
            Command::Resource(r) => r,
            other => panic!("expected a resource command, got {other:?}"),
        }
    }

    #[test]
    fn no_arguments_prints_help() {
        assert!(matches!(
            parse_args(&args(&[])).unwrap(),
            Command::Help(HelpTopic::Root)
        ));
        assert!(matches!(
            parse_args(&args(&["jobs"])).unwrap(),
            Command::Help(HelpTopic::Jobs)
        ));
    }

    #[test]
    fn job_filters_are_coerced() {
        let r = resource(&[
            "jobs",
            "list",
            "--min-salary",
            "5000",
            "--title=eng",
            "--has-equity",
            "true",
        ]);
        assert_eq!(r.resource, Resource::Jobs);
        let Action::List(criteria) = r.action else {
            panic!("expected list");
        };
        assert_eq!(criteria.get("minSalary"), Some(&SqlValue::Int(5000)));
        assert_eq!(criteria.get("title"), Some(&SqlValue::from("eng")));
        assert_eq!(criteria.get("hasEquity"), Some(&SqlValue::Bool(true)));
    }

    #[test]
    fn has_equity_is_true_only_for_the_literal() {
        let r = resource(&["jobs", "list", "--has-equity", "yes"]);
        let Action::List(criteria) = r.action else {
            panic!("expected list");
        };
        assert_eq!(criteria.get("hasEquity"), Some(&SqlValue::Bool(false)));
    }

    #[test]
    fn non_numeric_values_stay_text() {
        let r = resource(&["companies", "list", "--min-employees", "many"]);
        let Action::List(criteria) = r.action else {
            panic!("expected list");
        };
        assert_eq!(criteria.get("minEmployees"), Some(&SqlValue::from("many")));
    }

    #[test]
    fn connection_options() {
        let r = resource(&[
            "users",
            "get",
            "u1",
            "--config",
            "conf/jobly.toml",
            "--database=postgres://localhost/jobly",
        ]);
        assert_eq!(r.action, Action::Get("u1".to_string()));
        assert_eq!(r.conn.config, PathBuf::from("conf/jobly.toml"));
        assert_eq!(
            r.conn.database.as_deref(),
            Some("postgres://localhost/jobly")
        );

        let Command::Migrate(conn) = parse_args(&args(&["migrate"])).unwrap() else {
            panic!("expected migrate");
        };
        assert_eq!(conn, ConnArgs::default());
    }

    #[test]
    fn update_and_apply_positionals() {
        let r = resource(&["companies", "update", "c1", r#"{"name":"New"}"#]);
        assert_eq!(
            r.action,
            Action::Update {
                key: "c1".to_string(),
                body: r#"{"name":"New"}"#.to_string(),
            }
        );

        let r = resource(&["users", "apply", "u1", "7"]);
        assert_eq!(
            r.action,
            Action::Apply {
                username: "u1".to_string(),
                job_id: "7".to_string(),
            }
        );
    }

    #[test]
    fn rejects_misplaced_or_unknown_arguments() {
        assert!(parse_args(&args(&["jobs", "get", "1", "--title", "x"])).is_err());
        assert!(parse_args(&args(&["users", "list", "--title", "x"])).is_err());
        assert!(parse_args(&args(&["jobs", "apply", "u1", "1"])).is_err());
        assert!(parse_args(&args(&["jobs", "update", "1"])).is_err());
        assert!(parse_args(&args(&["jobs", "list", "--min-salary"])).is_err());
        assert!(parse_args(&args(&["applications"])).is_err());
    }
}
