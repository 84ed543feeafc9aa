//! Run one enrichment pass for a legal entity from the command line.
//!
//! ```text
//! enrich --database-url postgresql:///registry 7f9c0e8e-...
//! ```

use clap::Parser;
use registry_enrichment::config::EnrichmentConfig;
use registry_enrichment::database::PgEnrichmentStore;
use registry_enrichment::registry::default_registries;
use registry_enrichment::EnrichmentService;
use sqlx::PgPool;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "enrich", about = "Cross-registry identifier enrichment")]
struct Args {
    /// Legal entity to enrich.
    legal_entity_id: Uuid,

    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Print the full summary as JSON instead of the overview text.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = EnrichmentConfig::from_env();

    let pool = PgPool::connect(&args.database_url).await?;
    let store = Arc::new(PgEnrichmentStore::new(pool));
    let registries = default_registries(&config)?;
    let service = EnrichmentService::new(store, registries, config);

    let summary = service.enrich(args.legal_entity_id).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", summary.overview());
    }
    Ok(())
}
