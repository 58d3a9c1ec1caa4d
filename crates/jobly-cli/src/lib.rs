mod cli;
mod config;
mod handlers;
mod migrate_cmd;

use anyhow::Context;
use jobly::TracingClient;
use std::process::ExitCode;
use std::time::Duration;

pub async fn run(args: Vec<String>) -> anyhow::Result<ExitCode> {
    let cmd = cli::parse_args(&args)?;
    match cmd {
        cli::Command::Help(topic) => {
            cli::print_help(topic);
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Migrate(conn) => {
            migrate_cmd::run(conn).await?;
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Resource(args) => run_resource(args).await,
    }
}

async fn run_resource(args: cli::ResourceArgs) -> anyhow::Result<ExitCode> {
    let settings = config::resolve(&args.conn)?;
    let pool = jobly::create_pool_with_config(&settings.url, settings.max_connections)
        .context("failed to configure database pool")?;

    let outcome = match pool.get().await {
        Ok(client) => {
            let client = TracingClient::new(client).slow_threshold(Duration::from_millis(500));
            handlers::dispatch(&client, args.resource, args.action).await
        }
        Err(e) => Err(e.into()),
    };

    match outcome {
        Ok(body) => {
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::debug!(error = %err, "command failed");
            println!("{}", serde_json::to_string_pretty(&handlers::error_body(&err))?);
            Ok(ExitCode::FAILURE)
        }
    }
}
