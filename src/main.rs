mod analysis;
mod config;
mod db;
mod error;
mod export;
mod leads;
mod listing;
mod parser;
mod pipeline;
mod probe;
mod record;
mod scraper;
mod throttle;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use config::{ListingMode, Settings};
use listing::{ApiListing, ListingView, SitemapListing};
use pipeline::CrawlOptions;
use probe::HttpClient;
use scraper::SpiderSource;

#[derive(Parser)]
#[command(name = "yc_directory", about = "YC company directory crawler and lead finder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the listing, fetch every detail page, export the table
    Crawl {
        /// Listing pages to scan before stopping
        #[arg(long)]
        max_pages: Option<usize>,
        /// CSV output path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Concurrent detail fetches (1 = sequential)
        #[arg(short, long)]
        concurrency: Option<usize>,
        /// Also write the table to this SQLite file
        #[arg(long)]
        db: Option<PathBuf>,
        /// Read identifiers from the sitemap instead of the JSON API
        #[arg(long)]
        sitemap: bool,
    },
    /// Probe one website for tech stack, blog and customers
    Probe { url: String },
    /// Summarize an exported table: statuses, batches, locations, tags, team sizes
    Analyze {
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Select leads from an exported table, probe their sites, rank them
    Leads {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Number of top leads to probe
        #[arg(short = 'n', long)]
        sample_size: Option<usize>,
    },
    /// Companies overview table from a SQLite export
    Overview {
        #[arg(long, default_value = "yc_companies.sqlite")]
        db: PathBuf,
        /// Filter by status (Active, Public, Acquired, Inactive)
        #[arg(short, long)]
        status: Option<String>,
        /// Filter by batch (e.g. "Winter 2024")
        #[arg(short, long)]
        batch: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load().context("loading settings")?;

    let result = match cli.command {
        Commands::Crawl {
            max_pages,
            output,
            concurrency,
            db: db_path,
            sitemap,
        } => {
            let output = output.unwrap_or_else(|| PathBuf::from(&settings.output_csv));
            let db_path = db_path.or_else(|| settings.output_db.as_ref().map(PathBuf::from));
            let opts = CrawlOptions {
                max_pages: max_pages.unwrap_or(settings.max_pages),
                concurrency: concurrency.unwrap_or(settings.concurrency).max(1),
            };
            let mode = if sitemap { ListingMode::Sitemap } else { settings.listing_mode };

            let client = reqwest::Client::new();
            let mut view: Box<dyn ListingView> = match mode {
                ListingMode::Api => Box::new(ApiListing::new(client, &settings.listing_url, settings.page_size)?),
                ListingMode::Sitemap => Box::new(SitemapListing::new(client, &settings.sitemap_url)),
            };
            let source = Arc::new(SpiderSource::new(settings.spider_api_key(), &settings.detail_base_url)?);
            let throttle = throttle::for_delay(Duration::from_millis(settings.request_delay_ms));

            info!(
                "Crawling ({:?} listing, {} page cap, concurrency {})",
                mode, opts.max_pages, opts.concurrency
            );
            let report = pipeline::crawl(view.as_mut(), source, throttle, opts).await?;

            export::export_csv(&output, &report.records)?;
            println!(
                "Exported {} companies to {} ({} listed, {} detail pages ok, {} failed)",
                report.records.len(),
                output.display(),
                report.listed,
                report.fetched,
                report.failed
            );

            if let Some(path) = db_path {
                let conn = db::connect(&path)?;
                let n = db::export_sqlite(&conn, &report.records)?;
                println!("Wrote {} rows to {}", n, path.display());
            }
            Ok(())
        }
        Commands::Probe { url } => {
            let client = HttpClient::new(Duration::from_secs(settings.probe_timeout_secs))?;
            let site = probe::probe_site(&client, &url).await;
            let or_none = |v: &[String]| if v.is_empty() { "None found".to_string() } else { v.join(", ") };
            println!("Website:   {}", url);
            println!("Tech:      {}", or_none(&site.tech_stack));
            println!("Blog:      {}", site.blog_url.as_deref().unwrap_or("Not found"));
            println!("Customers: {}", or_none(&site.customers));
            Ok(())
        }
        Commands::Analyze { input } => {
            let input = input.unwrap_or_else(|| PathBuf::from(&settings.leads_input));
            let companies = leads::load_companies(&input)?;
            print!("{}", analysis::summarize(&companies));
            Ok(())
        }
        Commands::Leads {
            input,
            output,
            sample_size,
        } => {
            let input = input.unwrap_or_else(|| PathBuf::from(&settings.leads_input));
            let output = output.unwrap_or_else(|| PathBuf::from(&settings.leads_output));
            let sample_size = sample_size.unwrap_or(settings.sample_size);

            let companies = leads::load_companies(&input)?;
            let selected = leads::select_leads(&companies);
            println!(
                "{} of {} companies pass the lead filters; probing top {}",
                selected.len(),
                companies.len(),
                sample_size.min(selected.len())
            );
            if let Some((first, last)) = leads::batch_span(&selected) {
                println!("Batch years: {}-{}", first, last);
            }

            let sweet = leads::sweet_spot(&selected);
            println!("\nSweet spot (team 10-100): {} companies", sweet.len());
            for l in sweet.iter().take(10) {
                let c = &l.company;
                println!(
                    "  {:<24} | {:<12} | {:>5} | {}",
                    truncate(&c.company_name, 24),
                    truncate(&c.batch, 12),
                    c.team_size.map(|n| n.to_string()).unwrap_or_default(),
                    truncate(&c.description, 60)
                );
            }

            let sample: Vec<_> = selected.into_iter().take(sample_size).collect();
            let client = HttpClient::new(Duration::from_secs(settings.probe_timeout_secs))?;
            let throttle = throttle::for_delay(Duration::from_millis(settings.request_delay_ms));
            let validated = leads::validate_leads(&client, sample, throttle.as_ref()).await;

            println!(
                "\n{:>3} | {:<24} | {:<12} | {:>5} | {:>8} | {:<24}",
                "#", "Company", "Batch", "Team", "Priority", "Tech"
            );
            println!("{}", "-".repeat(92));
            for (i, v) in validated.iter().take(10).enumerate() {
                let c = &v.lead.company;
                let team = c.team_size.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
                println!(
                    "{:>3} | {:<24} | {:<12} | {:>5} | {:>8} | {:<24}",
                    i + 1,
                    truncate(&c.company_name, 24),
                    truncate(&c.batch, 12),
                    team,
                    v.priority_score,
                    truncate(&v.probe.tech_stack.join(", "), 24)
                );
            }

            println!("\nTiers:");
            for t in leads::Tier::ALL {
                let n = validated.iter().filter(|v| v.tier == Some(t)).count();
                println!("  {}: {}", t.label(), n);
            }

            println!("\nTech Stack Distribution:");
            for (tech, n) in leads::tech_distribution(&validated) {
                println!("  {:<12} {}", tech, n);
            }

            let with_blog = validated.iter().filter(|v| v.probe.blog_url.is_some()).count();
            let pct = if validated.is_empty() { 0.0 } else { with_blog as f64 * 100.0 / validated.len() as f64 };
            println!("\nBlog presence: {}/{} ({:.1}%)", with_blog, validated.len(), pct);

            leads::export_leads(&output, &validated)?;
            println!("Exported {} validated leads to {}", validated.len(), output.display());
            Ok(())
        }
        Commands::Overview {
            db: db_path,
            status,
            batch,
            limit,
        } => {
            let conn = db::connect(&db_path)?;
            let rows = db::fetch_overview(&conn, status.as_deref(), batch.as_deref(), limit)?;
            if rows.is_empty() {
                println!("No companies found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<24} | {:<12} | {:<8} | {:>5} | {:<20} | {:<16}",
                "#", "Company", "Batch", "Status", "Size", "Location", "Partner"
            );
            println!("{}", "-".repeat(100));

            for (i, r) in rows.iter().enumerate() {
                let size = r.team_size.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
                println!(
                    "{:>3} | {:<24} | {:<12} | {:<8} | {:>5} | {:<20} | {:<16}",
                    i + 1,
                    truncate(&r.name, 24),
                    truncate(&r.batch, 12),
                    r.status,
                    size,
                    truncate(&r.location, 20),
                    truncate(&r.primary_partner, 16)
                );
            }

            let with_tags: Vec<_> = rows.iter().filter(|r| r.tags != "[]").collect();
            if !with_tags.is_empty() {
                println!("\n--- Tags ---");
                for r in &with_tags {
                    println!("  {}: {}", truncate(&r.slug, 24), r.tags);
                }
            }

            println!("\n{} companies | slug: /companies/<slug>", rows.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
