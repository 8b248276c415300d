use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use magpie::app::AppContext;
use magpie::cli::{commands, Cli, Commands};
use magpie::config::{Config, ConfigOverrides};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Scrape {
            url,
            headed,
            sort,
            download_images,
            db,
            reports_dir,
        } => {
            let overrides = ConfigOverrides {
                headless: headed.then_some(false),
                sort_by: sort,
                download_images: download_images.then_some(true),
                db_path: db,
                reports_dir,
            };
            overrides.apply(&mut config);

            let ctx = AppContext::new(config)?;
            commands::scrape(&ctx, &url).await?;
        }
        Commands::List { reviews } => {
            let ctx = AppContext::new(config)?;
            match reviews {
                Some(company) => commands::list_reviews(&ctx, &company)?,
                None => commands::list_companies(&ctx)?,
            }
        }
        Commands::Export { company, out } => {
            let ctx = AppContext::new(config)?;
            commands::export_reviews(&ctx, &company, out.as_deref())?;
        }
    }

    Ok(())
}
