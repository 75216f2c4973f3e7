// src/cli.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::ScoutConfig;
use crate::export::write_csv;
use crate::linkedin::{
    DatePosted, JobRecord, RequestStatus, SearchCriteria, SearchOutcome, SearchStatus,
};
use crate::JobFeed;

#[derive(Parser)]
#[command(name = "jobfeed")]
#[command(about = "Rate-limited LinkedIn job feed and decision maker lookup")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// YAML overrides (defaults to $JOBFEED_CONFIG or ./jobfeed.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a single search for one city
    Search {
        #[arg(long)]
        keywords: String,
        #[arg(long, default_value = "Melbourne")]
        city: String,
        #[arg(long, default_value = "past-24-hours")]
        date_posted: DatePosted,
        /// Write the kept records to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Sweep cities × role keywords (configured defaults when omitted)
    Sweep {
        #[arg(long = "city")]
        cities: Vec<String>,
        #[arg(long = "term")]
        terms: Vec<String>,
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Look up one posting by its LinkedIn URL
    Details { url: String },
    /// Submit a decision maker search and poll until it finishes
    DecisionMakers {
        #[arg(long = "company-id")]
        company_ids: Vec<u64>,
        #[arg(long = "title")]
        titles: Vec<String>,
        #[arg(long = "geo-code")]
        geo_codes: Vec<u64>,
        /// Give up after this many seconds
        #[arg(long, default_value_t = 60)]
        max_wait: u64,
        /// Seconds between status checks
        #[arg(long, default_value_t = 5)]
        interval: u64,
    },
    /// Start the HTTP API
    Serve {
        #[arg(long, env = "ROCKET_PORT", default_value_t = 8000)]
        port: u16,
    },
}

pub async fn handle_command(cli: Cli) -> Result<()> {
    let config = ScoutConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Serve { port } => crate::start_web_server(config, port).await,

        Command::Search {
            keywords,
            city,
            date_posted,
            csv,
        } => {
            let feed = JobFeed::new(config)?;
            let criteria = SearchCriteria::for_city(&keywords, &city, &feed.config().geo)?
                .with_date_posted(date_posted)
                .with_industries(feed.config().search.industries.clone());

            let outcome = feed.jobs().search(&criteria).await;
            report_outcome(&outcome, csv)
        }

        Command::Sweep { cities, terms, csv } => {
            let feed = JobFeed::new(config)?;

            let outcome = if cities.is_empty() && terms.is_empty() {
                feed.daily_sweep().await?
            } else {
                let cities = if cities.is_empty() {
                    feed.sweep_cities()
                } else {
                    cities
                };
                let terms = if terms.is_empty() {
                    feed.config().search.role_keywords.clone()
                } else {
                    terms
                };
                let date_posted = DatePosted::covering(feed.config().search.window_hours);
                feed.jobs()
                    .search_all(cities.as_slice(), terms.as_slice(), date_posted)
                    .await?
            };

            report_outcome(&outcome, csv)
        }

        Command::Details { url } => {
            let feed = JobFeed::new(config)?;
            match feed.jobs().get_job_details(&url).await? {
                Some(record) => {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                }
                None => println!("Job not found: {}", url),
            }
            Ok(())
        }

        Command::DecisionMakers {
            company_ids,
            titles,
            geo_codes,
            max_wait,
            interval,
        } => {
            let feed = JobFeed::new(config)?;
            let client = feed.decision_makers();

            let request_id = client.submit(&company_ids, &titles, &geo_codes).await?;
            info!(request_id = %request_id, "Waiting for decision maker search");

            let deadline = tokio::time::Instant::now() + Duration::from_secs(max_wait);
            loop {
                match client.poll(&request_id).await? {
                    RequestStatus::Complete => break,
                    RequestStatus::Failed => {
                        anyhow::bail!("Decision maker search {} failed", request_id)
                    }
                    status => {
                        if tokio::time::Instant::now() >= deadline {
                            anyhow::bail!(
                                "Decision maker search {} still {} after {}s",
                                request_id,
                                status,
                                max_wait
                            );
                        }
                        tokio::time::sleep(Duration::from_secs(interval)).await;
                    }
                }
            }

            let people = client.fetch(&request_id).await?;
            println!("{}", serde_json::to_string_pretty(&people)?);
            Ok(())
        }
    }
}

fn report_outcome(outcome: &SearchOutcome, csv: Option<PathBuf>) -> Result<()> {
    match outcome.status {
        SearchStatus::Complete => info!("Search complete: {} jobs", outcome.records.len()),
        SearchStatus::Partial => warn!(
            "Search partially failed ({} errors): {} jobs",
            outcome.errors.len(),
            outcome.records.len()
        ),
        SearchStatus::Unavailable => {
            warn!("Job API unavailable - set RAPIDAPI_KEY to search");
            return Ok(());
        }
        SearchStatus::Failed => {
            for e in &outcome.errors {
                error!("{}", e);
            }
            anyhow::bail!("Job search failed");
        }
    }

    for record in &outcome.records {
        println!("{}", format_record(record));
    }

    if let Some(path) = csv {
        write_csv(&path, &outcome.records)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    Ok(())
}

fn format_record(record: &JobRecord) -> String {
    format!(
        "{:>6.1}h  {} | {} | {} | {}",
        record.posted_recency_hours, record.title, record.company, record.location, record.url
    )
}
