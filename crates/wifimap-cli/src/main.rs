use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wifimap_core::{AppConfig, LocationInput, LocationReplier};
use wifimap_db::MySqlHotspotStore;

#[derive(Debug, Parser)]
#[command(name = "wifimap-cli")]
#[command(about = "Free Wi-Fi map bot command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Run the location pipeline for a point and print the ranked spots and map URL
    Nearby {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Overrides MAX_WIFI_NUM
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check that the database answers
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Db { command }) => run_db(command).await,
        Some(Commands::Nearby { lat, lon, limit }) => run_nearby(lat, lon, limit).await,
        None => {
            println!("wifimap-cli: use --help to list commands");
            Ok(())
        }
    }
}

async fn run_db(command: DbCommands) -> anyhow::Result<()> {
    let config = wifimap_core::load_app_config()?;
    let pool = wifimap_db::connect_pool_from_config(&config).await?;

    match command {
        DbCommands::Migrate => {
            let applied = wifimap_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        DbCommands::Ping => {
            wifimap_db::health_check(&pool).await?;
            println!("database ok");
        }
    }
    Ok(())
}

async fn run_nearby(lat: f64, lon: f64, limit: Option<u32>) -> anyhow::Result<()> {
    let config = wifimap_core::load_app_config()?;
    let location = validated_location(lat, lon)?;
    let max_results = effective_limit(&config, limit)?;

    let pool = wifimap_db::connect_pool_from_config(&config).await?;
    let store = Arc::new(MySqlHotspotStore::new(pool, &config));
    let replier = LocationReplier::with_settings(
        store,
        max_results,
        &config.static_map_base_url,
        &config.static_map_api_key,
    );

    let (candidates, map, map_url) = replier.locate(location).await?;
    for candidate in &candidates {
        println!(
            "{:>2}  {:>6}m  {}  [{}]",
            candidate.rank,
            candidate.distance_meters,
            candidate.hotspot.name,
            candidate.hotspot.identifier
        );
    }
    if candidates.is_empty() {
        println!("no hotspots found");
    }
    println!("zoom: {}", map.zoom);
    println!("map:  {map_url}");
    Ok(())
}

fn validated_location(lat: f64, lon: f64) -> anyhow::Result<LocationInput> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        anyhow::bail!("coordinates out of range: lat={lat}, lon={lon}");
    }
    Ok(LocationInput::new(lat, lon))
}

fn effective_limit(config: &AppConfig, limit: Option<u32>) -> anyhow::Result<u32> {
    let limit = limit.unwrap_or(config.max_results);
    if !(1..=wifimap_core::config::MAX_CAROUSEL_COLUMNS).contains(&limit) {
        anyhow::bail!(
            "--limit must be between 1 and {}",
            wifimap_core::config::MAX_CAROUSEL_COLUMNS
        );
    }
    Ok(limit)
}
