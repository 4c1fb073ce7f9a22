//! # stockquery: ask the inventory database in plain language
//!
//! This is the entry point for the `stockquery` command-line interface. It
//! loads the configuration, wires the SQLite database, the query cache and the
//! optional generative model into a `QueryEngine`, and runs one subcommand.

mod config;

use self::config::get_config;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use stockquery::{
    providers::{db::sqlite::SqliteProvider, factory::create_provider},
    AppConfig, QueryCache, QueryEngine, QueryEngineBuilder, TrainingItem,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

// --- CLI Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a YAML config file (defaults to ./config.yml when present)
    #[arg(long, global = true)]
    config: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a question and print the response as JSON
    Ask(AskArgs),
    /// Store training examples used as few-shot context
    Train(TrainArgs),
    /// Manage the persisted query cache
    Cache(CacheArgs),
    /// Show whether a model is attached, training state and cache size
    Status,
    /// Create the inventory tables in the configured database if missing
    Init,
}

#[derive(Parser, Debug)]
struct AskArgs {
    /// The question, e.g. "customers with pending credit"
    #[arg(required = true, num_args = 1..)]
    question: Vec<String>,
}

#[derive(Parser, Debug)]
struct TrainArgs {
    /// Kind of the item given with --content
    #[arg(long, value_enum, requires = "content")]
    kind: Option<TrainKind>,
    /// DDL, documentation text or the SQL of a question/SQL pair
    #[arg(long)]
    content: Option<String>,
    /// The question of a question/SQL pair
    #[arg(long)]
    question: Option<String>,
    /// A training directory with ddl/, documentation/ and question_sql_pairs/
    #[arg(long, conflicts_with_all = ["kind", "content", "question"])]
    dir: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TrainKind {
    Ddl,
    Documentation,
    QuestionSql,
}

#[derive(Parser, Debug)]
struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommands,
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// Remove every cached question
    Clear,
}

// --- Main Application Entry ---

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays machine readable.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = get_config(cli.config.as_deref())?;
    let db = open_database(&config).await?;

    match cli.command {
        Commands::Init => {
            db.initialize_inventory_schema().await?;
            println!("Inventory tables are ready in '{}'.", config.db_path);
        }
        Commands::Ask(args) => {
            let engine = build_engine(&config, db).await?;
            let response = engine.ask(&args.question.join(" ")).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.success {
                bail!(
                    "Query failed: {}",
                    response.error.unwrap_or_else(|| "unknown error".to_string())
                );
            }
        }
        Commands::Train(args) => {
            let engine = build_engine(&config, db).await?;
            handle_train(&engine, args).await?;
        }
        Commands::Cache(CacheArgs {
            command: CacheCommands::Clear,
        }) => {
            let cache = QueryCache::load(&config.cache_dir).await;
            let removed = cache.len().await;
            cache.clear().await?;
            println!("Cleared {removed} cached question(s).");
        }
        Commands::Status => {
            let engine = build_engine(&config, db).await?;
            println!("{}", serde_json::to_string_pretty(&engine.status().await)?);
        }
    }

    Ok(())
}

// --- Command Handlers ---

async fn open_database(config: &AppConfig) -> Result<SqliteProvider> {
    if let Some(parent) = Path::new(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let db = SqliteProvider::new(&config.db_path).await?;
    db.initialize_schema().await?;
    info!(path = %config.db_path, "Database is ready.");
    Ok(db)
}

async fn build_engine(config: &AppConfig, db: SqliteProvider) -> Result<QueryEngine> {
    let cache = QueryCache::load(&config.cache_dir).await;
    let mut builder = QueryEngineBuilder::new()
        .config(config)
        .storage(Box::new(db.clone()))
        .settings(Box::new(db.clone()))
        .examples(Box::new(db))
        .cache(cache);
    match create_provider(&config.generator) {
        Ok(provider) => builder = builder.ai_provider(provider),
        Err(e) => warn!("No generative model available, only templates will answer: {e}"),
    }
    Ok(builder.build().await?)
}

async fn handle_train(engine: &QueryEngine, args: TrainArgs) -> Result<()> {
    if let Some(dir) = args.dir {
        let count = engine.train_from_dir(&dir).await?;
        println!("Stored {count} training item(s) from '{}'.", dir.display());
        return Ok(());
    }

    let (Some(kind), Some(content)) = (args.kind, args.content) else {
        bail!("Provide either --dir or --kind with --content.");
    };
    let item = match kind {
        TrainKind::Ddl => TrainingItem::Ddl(content),
        TrainKind::Documentation => TrainingItem::Documentation(content),
        TrainKind::QuestionSql => {
            let Some(question) = args.question else {
                bail!("--question is required for question-sql items.");
            };
            TrainingItem::QuestionSql {
                question,
                sql: content,
            }
        }
    };
    let id = engine.train(item).await?;
    println!("Stored training item {id}.");
    Ok(())
}
