use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use casquatch::database::split_statements;
use casquatch::{load_config, metrics, CassandraDriver, CassandraDriverBuilder};

#[derive(Parser, Debug)]
#[command(name = "cql-loader")]
#[command(about = "Apply CQL schema files and statements through the casquatch driver")]
struct Args {
    #[arg(short, long, default_value = "config/casquatch.yaml")]
    config: String,

    /// Print gathered Prometheus metrics when done
    #[arg(long, default_value = "false")]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute every `;`-separated statement of a CQL file in order
    Schema { file: String },
    /// Execute one statement verbatim
    Exec { cql: String },
    /// Check the cluster answers
    Health,
    /// Print the effective settings as JSON
    Settings,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "cql_loader={level},casquatch={level}",
                    level = config.observability.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Command::Settings = args.command {
        let mut shown = config.driver.clone();
        if shown.password.is_some() {
            shown.password = Some("********".to_string());
        }
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    let driver = CassandraDriverBuilder::from_settings(config.driver.clone())
        .connect()
        .await?;

    let outcome = run(&driver, &args.command).await;
    driver.close();

    if args.metrics && config.observability.metrics_enabled {
        print!("{}", metrics::gather_metrics());
    }
    outcome
}

async fn run(driver: &CassandraDriver, command: &Command) -> Result<()> {
    match command {
        Command::Schema { file } => {
            let script = fs::read_to_string(file)
                .with_context(|| format!("Failed to read schema file {}", file))?;
            let statements = split_statements(&script);
            info!("Applying {} statement(s) from {}", statements.len(), file);

            for (index, statement) in statements.iter().enumerate() {
                if let Err(e) = driver.execute(statement).await {
                    error!("Statement {} failed: {}", index + 1, e);
                    return Err(e).with_context(|| {
                        format!("Schema file {} stopped at statement {}", file, index + 1)
                    });
                }
            }
            info!("Schema applied");
        }
        Command::Exec { cql } => {
            driver.execute(cql).await?;
            info!("Statement executed");
        }
        Command::Health => {
            driver.health_check().await?;
            info!("Cluster is healthy");
        }
        Command::Settings => {}
    }
    Ok(())
}
