//! # askdb: ask a database a question
//!
//! Command-line front end for the `askdb` synthesis pipeline. SQL and query results
//! go to stdout; logs go to stderr.

mod config;

use anyhow::{Context, Result};
use askdb::providers::db::sqlite::SqliteProvider;
use askdb::providers::db::storage::{QueryExecutor, SchemaProvider};
use askdb::providers::dispatcher::ProviderDispatcher;
use askdb::{ProviderConfigUpdate, ProviderId, SchemaModel, SqlSynthesizer, SynthesisResult};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

// --- CLI Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a YAML configuration file (defaults to ./askdb.yml when present)
    #[arg(long, global = true)]
    config: Option<String>,
    /// SQLite database to introspect and query (overrides `db_url`)
    #[arg(long, global = true, env = "DB_URL")]
    db: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that the database answers
    Ping,
    /// Print the introspected schema as JSON
    Schema,
    /// Show the configured model and key presence for each provider
    Providers,
    /// Generate SQL for a natural-language question
    Ask(AskArgs),
}

#[derive(Parser, Debug)]
struct AskArgs {
    /// The question to translate into SQL
    question: String,
    /// Provider to use: openai or claude
    #[arg(long)]
    provider: Option<String>,
    /// Override the provider's model for this run
    #[arg(long)]
    model: Option<String>,
    /// Use a JSON schema snapshot instead of introspecting the database
    #[arg(long)]
    schema_file: Option<PathBuf>,
    /// Execute the generated SQL and print the rows
    #[arg(long)]
    execute: bool,
    /// Print the full synthesis result (SQL and validation report) as JSON
    #[arg(long)]
    json: bool,
}

// --- Main Application Entry ---

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = fmt::Subscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let app_config = config::get_config(cli.config.as_deref())?;
    let db_url = cli.db.clone().unwrap_or_else(|| app_config.db_url.clone());

    match cli.command {
        Commands::Ping => {
            let provider = SqliteProvider::new(&db_url).await?;
            provider
                .test_connection()
                .await
                .with_context(|| format!("Connection to '{db_url}' failed"))?;
            println!("ok");
        }
        Commands::Schema => {
            let provider = SqliteProvider::new(&db_url).await?;
            let schema = provider
                .fetch_schema()
                .await
                .context("Failed to get database schema")?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        Commands::Providers => {
            let store = app_config.build_store()?;
            println!("{}", serde_json::to_string_pretty(&store.summary())?);
        }
        Commands::Ask(args) => handle_ask(&app_config, &db_url, args).await?,
    }

    Ok(())
}

// --- Command Handlers ---

async fn handle_ask(app_config: &config::AppConfig, db_url: &str, args: AskArgs) -> Result<()> {
    let store = Arc::new(app_config.build_store()?);
    let provider: ProviderId = args
        .provider
        .as_deref()
        .unwrap_or(app_config.default_provider.as_str())
        .parse()?;
    let provider_id = provider.as_str();

    let dispatcher =
        ProviderDispatcher::new(Duration::from_secs(app_config.request_timeout_secs))?;
    let synthesizer =
        SqlSynthesizer::new(dispatcher, store).dialect(app_config.dialect.clone());

    if let Some(model) = args.model {
        if !synthesizer.update_provider_config(provider_id, &ProviderConfigUpdate::model_name(model)) {
            anyhow::bail!("Could not apply model override for provider '{provider_id}'");
        }
    }

    let needs_db = args.execute || args.schema_file.is_none();
    let db = if needs_db {
        Some(SqliteProvider::new(db_url).await?)
    } else {
        None
    };

    let result: SynthesisResult = match (&args.schema_file, &db) {
        (Some(path), _) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read schema file '{}'", path.display()))?;
            let schema: SchemaModel = serde_json::from_str(&content)
                .with_context(|| format!("Invalid schema file '{}'", path.display()))?;
            synthesizer
                .synthesize(&args.question, &schema, provider_id)
                .await
        }
        (None, Some(db)) => {
            synthesizer
                .synthesize_from(&args.question, db, provider_id)
                .await
        }
        (None, None) => anyhow::bail!("No schema source: pass --schema-file or --db"),
    }
    .context("SQL generation failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.sql);
        for issue in &result.validation.issues {
            eprintln!("warning: {issue}");
        }
    }

    if args.execute {
        if let Some(db) = &db {
            if result.validation.has_issues {
                warn!("Executing SQL that failed reference validation.");
            }
            let rows = db
                .execute(&result.sql)
                .await
                .context("Query execution failed")?;
            info!("Rows returned: {}", rows.row_count);
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }

    Ok(())
}
