pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::scraper::SortOrder;

#[derive(Parser)]
#[command(name = "magpie")]
#[command(about = "A review scraper for map listing pages", long_about = None)]
pub struct Cli {
    /// Path to an alternate config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scrape every review from a listing page
    Scrape {
        /// URL of the listing page
        url: String,

        /// Run the browser with a visible window
        #[arg(long)]
        headed: bool,

        /// Review ordering requested from the listing page
        #[arg(short, long, value_enum)]
        sort: Option<SortOrder>,

        /// Download review photos and author avatars
        #[arg(long)]
        download_images: bool,

        /// Database file to write to
        #[arg(long)]
        db: Option<PathBuf>,

        /// Directory for the JSON report
        #[arg(long)]
        reports_dir: Option<PathBuf>,
    },
    /// List scraped companies, or one company's reviews
    List {
        /// Show this company's stored reviews instead of the company table
        #[arg(long)]
        reviews: Option<String>,
    },
    /// Export a company's stored reviews as JSON
    Export {
        /// Company name as shown by `list`
        company: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}
