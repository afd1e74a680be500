use std::path::PathBuf;

use clap::{Parser, Subcommand};

use medfinder_core::geo::GeoPoint;
use medfinder_core::search::{rank, SortMode};

#[derive(Debug, Parser)]
#[command(name = "medfinder-cli")]
#[command(about = "Medfinder operational command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upsert pharmacies and their catalogs from the seed fixtures file.
    Seed {
        /// Fixtures path; defaults to MEDFINDER_SEED_PATH.
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Run a catalog search from the terminal.
    Search {
        query: Option<String>,
        #[arg(long)]
        latitude: Option<f64>,
        #[arg(long)]
        longitude: Option<f64>,
        /// Only show entries from pharmacies that deliver.
        #[arg(long)]
        delivery: bool,
        /// price_asc or price_desc; defaults to nearest-first when
        /// coordinates are given.
        #[arg(long)]
        sort: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = medfinder_core::load_app_config()?;
    let pool_config = medfinder_db::PoolConfig::from_app_config(&config);
    let pool = medfinder_db::connect_pool(&config.database_url, pool_config).await?;

    match cli.command {
        Commands::Seed { path } => {
            medfinder_db::run_migrations(&pool).await?;
            let seed_path = path.unwrap_or(config.seed_path);
            let seed = medfinder_core::catalog::load_seed(&seed_path)?;
            let count = medfinder_db::seed_catalog(&pool, &seed.pharmacies).await?;
            println!("seeded {count} pharmacies from {}", seed_path.display());
        }
        Commands::Search {
            query,
            latitude,
            longitude,
            delivery,
            sort,
        } => {
            let observer = GeoPoint::from_parts(longitude, latitude)?;
            let sort = SortMode::resolve(sort.as_deref(), observer.is_some())?;

            let rows = medfinder_db::search_in_stock(&pool, query.as_deref()).await?;
            let ranked = rank(rows, observer, delivery, sort);

            if ranked.is_empty() {
                println!("no matches");
                return Ok(());
            }

            for entry in ranked {
                let row = &entry.item;
                let distance = entry
                    .distance_km
                    .map_or_else(|| "     ?".to_string(), |km| format!("{km:6.1}"));
                println!(
                    "{distance} km  {:>9}  {:<32} {} ({})",
                    row.unit_price, row.name, row.pharmacy_name, row.pharmacy_city
                );
            }
        }
    }

    Ok(())
}
