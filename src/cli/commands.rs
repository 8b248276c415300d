use std::path::Path;
use std::time::Duration;

use crate::app::{AppContext, MagpieError, Result};
use crate::jobs::JobStatus;
use crate::store::Store;

const POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Submit a scrape job and follow it to the end, echoing every progress
/// change as it happens.
pub async fn scrape(ctx: &AppContext, url: &str) -> Result<()> {
    let id = ctx.jobs.submit(url).await?;
    println!("Job {} started for {}", id, url);

    let mut last: Option<(u8, String)> = None;
    let outcome = loop {
        let snap = ctx.jobs.snapshot(id).await?;

        let line = (snap.percentage, snap.message.clone());
        if !snap.message.is_empty() && last.as_ref() != Some(&line) {
            println!("[{:>3}%] {}", snap.percentage, snap.message);
            last = Some(line);
        }

        if snap.status.is_terminal() {
            break snap;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    };

    match outcome.status {
        JobStatus::Complete => {
            println!();
            if let Some(name) = &outcome.company_name {
                println!("Company: {}", name);
            }
            println!(
                "Captured {} reviews ({} new)",
                outcome.review_count, outcome.new_reviews
            );
            if let Some(path) = &outcome.report_path {
                println!("Report: {}", path.display());
            }
            Ok(())
        }
        _ => Err(MagpieError::Other(outcome.message)),
    }
}

pub fn list_companies(ctx: &AppContext) -> Result<()> {
    let companies = ctx.store.get_all_companies()?;

    if companies.is_empty() {
        println!("No companies scraped yet");
        return Ok(());
    }

    for company in companies {
        let count = ctx.store.review_count(company.id)?;
        println!(
            "{} ({} reviews)\n  {}\n  last scraped {}",
            company.name,
            count,
            company.url,
            company.last_scraped_at.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

pub fn list_reviews(ctx: &AppContext, company_name: &str) -> Result<()> {
    let company = ctx
        .store
        .get_company_by_name(company_name)?
        .ok_or_else(|| MagpieError::CompanyNotFound(company_name.to_string()))?;

    let reviews = ctx.store.get_reviews_by_company(company.id)?;

    if reviews.is_empty() {
        println!("No reviews stored for {}", company.name);
        return Ok(());
    }

    for review in reviews {
        let date = review.published_at.get(..10).unwrap_or("          ");
        let label = review.prediction.as_deref().unwrap_or("-");

        println!(
            "{} {}/5 {} [{}]",
            date,
            review.rating,
            review.display_author(),
            label
        );
        if !review.text.is_empty() {
            println!("    {}", review.excerpt(100));
        }
    }

    Ok(())
}

pub fn export_reviews(ctx: &AppContext, company_name: &str, out: Option<&Path>) -> Result<()> {
    let company = ctx
        .store
        .get_company_by_name(company_name)?
        .ok_or_else(|| MagpieError::CompanyNotFound(company_name.to_string()))?;

    let reviews = ctx.store.get_reviews_by_company(company.id)?;
    let json = serde_json::to_string_pretty(&reviews)?;

    match out {
        Some(path) => {
            std::fs::write(path, &json)?;
            println!("Exported {} reviews to {}", reviews.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
