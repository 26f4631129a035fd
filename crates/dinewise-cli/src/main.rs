mod seed;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "dinewise-cli")]
#[command(about = "DineWise maintenance command line interface")]
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
    /// Seed the restaurant cache for the pre-seeded regions
    Seed {
        /// Region code to seed (MAN, BK, QN, BX, SI); all regions when omitted
        #[arg(long)]
        region: Option<String>,
        /// Maximum results to fetch per region
        #[arg(long, default_value_t = 100)]
        limit: u32,
        /// Fetch and count without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("dinewise-cli: run with --help for available commands");
        return Ok(());
    };

    let config = dinewise_core::load_app_config()?;
    let pool_config = dinewise_db::PoolConfig::from_app_config(&config);
    let pool = dinewise_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            dinewise_db::ping(&pool).await?;
            println!("database ok");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = dinewise_db::run_migrations(&pool).await?;
            println!("applied {applied} migrations");
        }
        Commands::Seed {
            region,
            limit,
            dry_run,
        } => {
            let regions = seed::resolve_regions(region.as_deref())?;
            let stats = seed::run_seed(&pool, &config, &regions, limit, dry_run).await?;
            seed::print_summary(&stats, dry_run);
        }
    }

    Ok(())
}
