use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{ArgGroup, Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod api;
mod db;
mod error;
mod models;
mod palette;
mod rake;
mod report;
mod scope;
mod source;
mod stats;
mod summary;

use models::AccessScope;
use source::ConsultationSource;
use stats::AggregateOptions;
use summary::{Envelope, SummaryOptions};

#[derive(Parser)]
#[command(name = "klinik-summary")]
#[command(about = "Consultation analytics for Klinik Pemerintah Digital", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct Tuning {
    /// Count topic assignments system-wide for full-access callers
    #[arg(
        long,
        env = "KLINIK_TOPIC_STATS_GLOBAL",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    topic_stats_global: bool,
    /// Descriptions longer than this are skipped by keyword extraction
    #[arg(
        long,
        env = "KLINIK_MAX_TEXT_CHARS",
        default_value_t = summary::DEFAULT_MAX_TEXT_CHARS
    )]
    max_text_chars: usize,
    /// Count a keyword at most once per description
    #[arg(
        long,
        env = "KLINIK_DISTINCT_PHRASES",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    distinct_phrases: bool,
}

impl Tuning {
    fn options(self) -> SummaryOptions {
        SummaryOptions {
            aggregate: AggregateOptions {
                topic_stats_global: self.topic_stats_global,
            },
            max_text_chars: self.max_text_chars,
            distinct_phrases: self.distinct_phrases,
        }
    }
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("scope")
        .args(["user", "units"])
        .required(true)
        .multiple(false)
))]
struct ScopeArgs {
    /// Resolve the scope from a user's assigned units
    #[arg(long)]
    user: Option<Uuid>,
    /// Use these unit ids directly (1 grants full access)
    #[arg(long, value_delimiter = ',')]
    units: Option<Vec<i32>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import consultations from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print the summary JSON for a scope
    Summary {
        #[command(flatten)]
        scope: ScopeArgs,
        #[command(flatten)]
        tuning: Tuning,
        #[arg(long)]
        pretty: bool,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        scope: ScopeArgs,
        #[command(flatten)]
        tuning: Tuning,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Serve the summary over HTTP
    Serve {
        #[arg(long, env = "KLINIK_BIND", default_value = "0.0.0.0:8080")]
        bind: String,
        #[command(flatten)]
        tuning: Tuning,
    },
}

async fn resolve_scope(
    source: &dyn ConsultationSource,
    args: &ScopeArgs,
) -> anyhow::Result<AccessScope> {
    let unit_ids = match (&args.user, &args.units) {
        (Some(user_id), _) => source.unit_ids_for_user(*user_id).await?,
        (None, Some(units)) => units.clone(),
        (None, None) => anyhow::bail!("either --user or --units is required"),
    };
    Ok(AccessScope::from_unit_ids(unit_ids))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("klinik_summary=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} consultations from {}.", csv.display());
        }
        Commands::Summary {
            scope,
            tuning,
            pretty,
        } => {
            let source = db::PgSource::new(pool);
            let access = resolve_scope(&source, &scope).await?;
            let dataset = source.load_dataset().await?;
            let result = summary::summarize(&dataset, &access, Utc::now(), tuning.options());
            let envelope = Envelope::ok(result);
            let json = if pretty {
                serde_json::to_string_pretty(&envelope)?
            } else {
                serde_json::to_string(&envelope)?
            };
            println!("{json}");
        }
        Commands::Report { scope, tuning, out } => {
            let source = db::PgSource::new(pool);
            let access = resolve_scope(&source, &scope).await?;
            let dataset = source.load_dataset().await?;
            let now = Utc::now();
            let result = summary::summarize(&dataset, &access, now, tuning.options());
            std::fs::write(&out, report::build_report(&result, now))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Serve { bind, tuning } => {
            let state = Arc::new(api::AppState {
                source: Arc::new(db::PgSource::new(pool)),
                options: tuning.options(),
            });
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("failed to bind {bind}"))?;
            info!("Klinik summary API listening on {bind}");
            axum::serve(listener, api::router(state)).await?;
        }
    }

    Ok(())
}
