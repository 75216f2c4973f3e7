// src/export.rs
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::linkedin::JobRecord;

/// Flat CSV row; requirement tags are joined with "; ".
#[derive(Debug, Serialize)]
struct JobRow<'a> {
    title: &'a str,
    company: &'a str,
    company_id: &'a str,
    location: &'a str,
    url: &'a str,
    posted_recency_hours: f64,
    posted_time: &'a str,
    scraped_at: String,
    job_type: &'a str,
    salary: &'a str,
    company_url: &'a str,
    requirements: String,
}

impl<'a> From<&'a JobRecord> for JobRow<'a> {
    fn from(record: &'a JobRecord) -> Self {
        Self {
            title: &record.title,
            company: &record.company,
            company_id: &record.company_id,
            location: &record.location,
            url: &record.url,
            posted_recency_hours: record.posted_recency_hours,
            posted_time: &record.posted_time,
            scraped_at: record.scraped_at.to_rfc3339(),
            job_type: record.job_type.as_deref().unwrap_or(""),
            salary: record.salary.as_deref().unwrap_or(""),
            company_url: record.company_url.as_deref().unwrap_or(""),
            requirements: record
                .requirements
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

pub fn write_csv_to<W: Write>(writer: W, records: &[JobRecord]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(JobRow::from(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write a batch to `path`, replacing any existing file.
pub fn write_csv(path: &Path, records: &[JobRecord]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_csv_to(file, records)?;
    info!("Exported {} jobs to {}", records.len(), path.display());
    Ok(())
}
