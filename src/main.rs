//! pgshift CLI.
//!
//! Entry point for the command-line tool.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tokio_postgres::{Client, NoTls};
use tokio_util::sync::CancellationToken;

use pgshift::config::Config;
use pgshift::diff::dsl::statements_to_diffs;
use pgshift::history;
use pgshift::inverse::inverse;
use pgshift::pipeline::{load_target_schema, Pipeline, Plan};
use pgshift::CatalogReader;

#[derive(Parser, Debug)]
#[command(name = "pgshift")]
#[command(about = "Declarative schema migration for PostgreSQL", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "pgshift.toml")]
    config: PathBuf,

    #[command(flatten)]
    conn: ConnArgs,

    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ConnArgs {
    /// Database connection URL (overrides the individual fields)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Database host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Database port
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Database name
    #[arg(short, long, global = true)]
    dbname: Option<String>,

    /// Database user name
    #[arg(short = 'U', long, global = true)]
    username: Option<String>,

    /// Database password
    #[arg(short = 'W', long, global = true)]
    password: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Diff the live schema against the schema file and emit migrations
    Diff {
        /// Target schema file (defaults to the configured path)
        #[arg(short = 'f', long)]
        schema: Option<PathBuf>,

        /// Print the diff and its inverse instead of writing files
        #[arg(long)]
        preview: bool,

        /// Migrations directory
        #[arg(short, long)]
        migrations: Option<PathBuf>,
    },

    /// Bring the database up to the schema file (dry-run without --apply)
    Sync {
        /// Target schema file (defaults to the configured path)
        #[arg(short = 'f', long)]
        schema: Option<PathBuf>,

        /// Execute the statements (default is dry-run)
        #[arg(long)]
        apply: bool,
    },

    /// Create an empty up/down migration pair
    New {
        /// Migrations directory
        #[arg(short, long)]
        migrations: Option<PathBuf>,
    },

    /// Apply pending migration files and record them
    Up {
        /// Migrations directory
        #[arg(short, long)]
        migrations: Option<PathBuf>,
    },

    /// Print the inverse of hand-written DDL statements
    Inverse {
        /// DDL input file ("-" reads stdin)
        #[arg(short = 'i', long, default_value = "-")]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    }

    let mut config = if cli.config.exists() {
        Config::from_file(&cli.config).context("failed to load configuration")?
    } else {
        Config::default()
    };
    merge_overrides(&mut config, &cli.conn);

    match cli.command {
        Command::New { migrations } => {
            let dir = migrations.unwrap_or_else(|| config.migrations.dir.clone());
            new_command(&dir)
        }
        Command::Diff {
            schema,
            preview,
            migrations,
        } => {
            config.validate_connection()?;
            let schema = schema.unwrap_or_else(|| config.migrations.schema.clone());
            let dir = migrations.unwrap_or_else(|| config.migrations.dir.clone());
            let client = connect(&config).await?;
            diff_command(&client, &schema, preview, &dir).await
        }
        Command::Sync { schema, apply } => {
            config.validate_connection()?;
            let schema = schema.unwrap_or_else(|| config.migrations.schema.clone());
            let client = connect(&config).await?;
            sync_command(&client, &schema, apply).await
        }
        Command::Up { migrations } => {
            config.validate_connection()?;
            let dir = migrations.unwrap_or_else(|| config.migrations.dir.clone());
            let client = connect(&config).await?;
            up_command(&client, &dir).await
        }
        Command::Inverse { input } => {
            config.validate_connection()?;
            let client = connect(&config).await?;
            inverse_command(&client, &input).await
        }
    }
}

fn merge_overrides(config: &mut Config, conn: &ConnArgs) {
    if let Some(url) = &conn.url {
        config.database.url = Some(url.clone());
    }
    if let Some(host) = &conn.host {
        config.database.host = host.clone();
    }
    if let Some(port) = conn.port {
        config.database.port = port;
    }
    if let Some(dbname) = &conn.dbname {
        config.database.dbname = Some(dbname.clone());
    }
    if let Some(username) = &conn.username {
        config.database.username = username.clone();
    }
    if let Some(password) = &conn.password {
        config.database.password = password.clone();
    }
}

async fn connect(config: &Config) -> Result<Client> {
    let conn_string = config.database.conn_string();
    let (client, connection) = tokio_postgres::connect(&conn_string, NoTls)
        .await
        .context("failed to connect to the database")?;

    // Drive the connection until the client is dropped.
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(error = %e, "connection error");
        }
    });

    Ok(client)
}

/// Read the schema file and plan against the live database. Ctrl-C cancels
/// the catalog dump between queries.
async fn plan_against(client: &Client, schema_path: &Path) -> Result<Plan> {
    let sql = fs::read_to_string(schema_path)
        .with_context(|| format!("failed to read schema file {}", schema_path.display()))?;
    let target = load_target_schema(&sql)?;

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_on_signal.cancel();
        }
    });

    let plan = Pipeline::with_cancellation(client, cancel)
        .plan(&target)
        .await?;
    Ok(plan)
}

async fn diff_command(
    client: &Client,
    schema: &Path,
    preview: bool,
    migrations: &Path,
) -> Result<()> {
    let plan = plan_against(client, schema).await?;

    if plan.is_empty() {
        println!("schema is up to date");
        return Ok(());
    }

    if preview {
        println!("diff between current and target state is...");
        for diff in &plan.diffs {
            println!("{};", diff.to_sql());
            println!("inverse:");
            println!("{};", plan.inverse_of(diff)?.to_sql());
        }
        return Ok(());
    }

    let mut ups = Vec::new();
    let mut downs = Vec::new();
    for diff in &plan.diffs {
        ups.push(format!("{};", diff.to_sql()));
        downs.push(format!("{};", plan.inverse_of(diff)?.to_sql()));
    }
    // The down script undoes the batch back-to-front.
    downs.reverse();

    fs::create_dir_all(migrations)
        .with_context(|| format!("failed to create {}", migrations.display()))?;
    let id = migration_id();
    let up_path = migrations.join(format!("{id}.up.sql"));
    let down_path = migrations.join(format!("{id}.down.sql"));
    fs::write(&up_path, ups.join("\n") + "\n")?;
    fs::write(&down_path, downs.join("\n") + "\n")?;

    println!("wrote {}", up_path.display());
    println!("wrote {}", down_path.display());
    Ok(())
}

async fn sync_command(client: &Client, schema: &Path, apply: bool) -> Result<()> {
    let plan = plan_against(client, schema).await?;

    if plan.is_empty() {
        println!("schema is up to date");
        return Ok(());
    }

    if apply {
        Pipeline::new(client).apply(&plan).await?;
        println!("applied {} change(s)", plan.diffs.len());
    } else {
        println!("dry-run mode (with --apply the queries below will be executed)");
        for diff in &plan.diffs {
            println!("{};", diff.to_sql());
        }
    }
    Ok(())
}

fn new_command(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let id = migration_id();
    let header = "-- created by pgshift\n";
    let up_path = dir.join(format!("{id}.up.sql"));
    let down_path = dir.join(format!("{id}.down.sql"));
    fs::write(&up_path, header)?;
    fs::write(&down_path, header)?;

    println!("created {}", up_path.display());
    println!("created {}", down_path.display());
    Ok(())
}

async fn up_command(client: &Client, dir: &Path) -> Result<()> {
    let current = history::check_current(client).await?;

    let mut pending = Vec::new();
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read migrations dir {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(id) = name.strip_suffix(".up.sql") else {
            continue;
        };
        if id > current.as_str() {
            pending.push((id.to_string(), entry.path()));
        }
    }
    pending.sort();

    if pending.is_empty() {
        let shown = if current.is_empty() { "none" } else { current.as_str() };
        println!("up to date (current: {})", shown);
        return Ok(());
    }

    for (id, path) in pending {
        let sql = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        println!("applying {}", path.display());
        client
            .batch_execute(&sql)
            .await
            .with_context(|| format!("migration {} failed", id))?;
        history::record(client, &id).await?;
    }

    Ok(())
}

async fn inverse_command(client: &Client, input: &Path) -> Result<()> {
    let sql = if input == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?
    } else {
        fs::read_to_string(input)
            .with_context(|| format!("failed to read {}", input.display()))?
    };

    let statements = pgshift::parser::parse_statements(&sql)?;
    let diffs = statements_to_diffs(&statements)?;
    let current = CatalogReader::new(client).dump().await?;

    for diff in &diffs {
        println!("{};", inverse(diff, &current)?.to_sql());
    }
    Ok(())
}

/// Lexicographically monotonic migration id (UTC, millisecond precision).
fn migration_id() -> String {
    Utc::now().format("%Y%m%d%H%M%S%3f").to_string()
}
