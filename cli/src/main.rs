mod commands;
mod config;
mod server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{
    cmd_campus, cmd_categories, cmd_favorites, cmd_list, cmd_random, cmd_refresh, cmd_show,
    cmd_sync, cmd_toggle, reload_logger,
};
use crate::config::Config;
use crate::server::HttpGateway;
use shadal_core::legacy::LegacyBookmarks;
use shadal_core::manager::StoreManager;
use shadal_core::notify::Notifier;
use shadal_core::reconcile::Reconciler;
use shadal_core::store::EntityStore;

#[derive(Parser)]
#[command(
    name = "shadal",
    version,
    about = "Browse the shadal restaurant directory from a local cache"
)]
struct Cli {
    /// Server base URL (overrides SHADAL_SERVER_URL)
    #[arg(long, global = true, value_name = "URL")]
    server: Option<String>,
    /// Campus to use for this command only (overrides the selected campus)
    #[arg(long, global = true)]
    campus: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List categories with the number of cached restaurants
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List cached restaurants in a category (flyers first, then by name)
    List {
        /// Category name, e.g. 치킨
        category: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List favorite restaurants, grouped by category
    Favorites {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a restaurant with its menu and flyers
    Show {
        /// Server ID of the restaurant
        server_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pick a random cached restaurant
    Random {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add or remove a restaurant from favorites
    Toggle {
        /// Row ID of the restaurant (the # column of `list`)
        row_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reconcile the cache against the server listing (default: all categories)
    Sync {
        /// Category to sync
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch the full record of one restaurant from the server
    Refresh {
        /// Server ID of the restaurant
        server_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or select the campus whose directory is cached
    Campus {
        /// Campus to select
        name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shadal=info,shadal_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if cli.server.is_some() {
        config.server_url = cli.server;
    }
    if cli.campus.is_some() {
        config.campus_override = cli.campus;
    }

    let legacy = Arc::new(LegacyBookmarks::load(&config.legacy_bookmarks_path())?);
    let (notifier, mut ui) = Notifier::new();
    notifier.set_restaurant_list(Some(reload_logger("restaurant list")));
    notifier.set_favorites(Some(reload_logger("favorites")));
    let manager = StoreManager::new(&config.data_dir, legacy, notifier);

    let result = match cli.command {
        Commands::Campus { name, json } => {
            cmd_campus(&config, &manager, name.as_deref(), json)
        }
        Commands::Categories { json } => cmd_categories(&*open_store(&config, &manager)?, json),
        Commands::List { category, json } => {
            cmd_list(&*open_store(&config, &manager)?, &category, json)
        }
        Commands::Favorites { json } => cmd_favorites(&*open_store(&config, &manager)?, json),
        Commands::Show { server_id, json } => {
            cmd_show(&*open_store(&config, &manager)?, server_id, json)
        }
        Commands::Random { json } => cmd_random(&*open_store(&config, &manager)?, json),
        Commands::Toggle { row_id, json } => {
            cmd_toggle(&*open_store(&config, &manager)?, row_id, json)
        }
        Commands::Sync { category, json } => {
            let reconciler = build_reconciler(&config, open_store(&config, &manager)?)?;
            cmd_sync(&reconciler, category.as_deref(), json).await
        }
        Commands::Refresh { server_id, json } => {
            let reconciler = build_reconciler(&config, open_store(&config, &manager)?)?;
            cmd_refresh(&reconciler, server_id, json).await
        }
    };

    let reloads = ui.drain();
    tracing::debug!(count = reloads.len(), "applied view reloads");
    result
}

fn open_store(config: &Config, manager: &StoreManager) -> Result<Arc<EntityStore>> {
    let campus = config
        .selected_campus()?
        .context("No campus selected. Run `shadal campus <name>` first")?;
    manager.switch_to(&campus)
}

fn build_reconciler(config: &Config, store: Arc<EntityStore>) -> Result<Reconciler> {
    let gateway = HttpGateway::new(config.server_url()?)?;
    Ok(Reconciler::new(
        store,
        Arc::new(gateway),
        tokio::runtime::Handle::current(),
    ))
}
