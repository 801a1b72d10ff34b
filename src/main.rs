use anyhow::Result;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use songplay_warehouse::{render_script, Config, Pipeline};
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "warehouse-etl")]
#[command(about = "ETL for the song-play analytics warehouse")]
struct CliArgs {
    /// Path to the TOML configuration file (source locations, role ARN).
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drop and recreate all warehouse tables.
    CreateTables {
        /// Path to the SQLite warehouse database file.
        db: PathBuf,
    },
    /// Bulk-load raw JSON into the staging tables.
    Load {
        db: PathBuf,
    },
    /// Populate the fact and dimension tables from staging.
    Transform {
        db: PathBuf,
    },
    /// Full cycle: drop, create, load, transform.
    Run {
        db: PathBuf,
    },
    /// Print the Redshift-dialect SQL script to stdout.
    Render,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let cli_args = CliArgs::parse();
    info!(
        "warehouse-etl {}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );

    let config = Config::load(&cli_args.config)?;

    match cli_args.command {
        Command::CreateTables { db } => {
            let mut conn = Connection::open(&db)?;
            let pipeline = Pipeline::new(&mut conn, &config);
            pipeline.drop_tables()?;
            pipeline.create_tables()?;
            info!("Warehouse schema created at {:?}", db);
        }
        Command::Load { db } => {
            let mut conn = Connection::open(&db)?;
            Pipeline::new(&mut conn, &config).load_staging()?;
        }
        Command::Transform { db } => {
            let mut conn = Connection::open(&db)?;
            Pipeline::new(&mut conn, &config).transform()?;
            info!("Transforms completed");
        }
        Command::Run { db } => {
            let mut conn = Connection::open(&db)?;
            Pipeline::new(&mut conn, &config).run()?;
        }
        Command::Render => {
            print!("{}", render_script(&config));
        }
    }

    Ok(())
}
