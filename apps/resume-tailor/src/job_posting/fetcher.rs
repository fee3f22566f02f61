//! Job Posting Fetcher: Greenhouse boards API when the URL points there, HTML scrape otherwise.

use std::time::Duration;

use reqwest::{Client, Url};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::job_posting::{JobPosting, PostingSource};

const USER_AGENT: &str = "Mozilla/5.0";
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const GREENHOUSE_API: &str = "https://boards-api.greenhouse.io/v1/boards";

/// Elements whose class marks them as part of the job description.
const DESCRIPTION_SELECTOR: &str =
    "div.description, div.job-description, div.content, div.section";

#[derive(Debug, Deserialize)]
struct GreenhouseJob {
    #[serde(default)]
    title: String,
    /// HTML, usually entity-escaped
    #[serde(default)]
    content: String,
}

pub struct JobPostingFetcher {
    client: Client,
}

impl JobPostingFetcher {
    pub fn new() -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| AppError::Fetch(format!("could not create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> Result<JobPosting, AppError> {
        let parsed = Url::parse(url)
            .map_err(|e| AppError::Fetch(format!("invalid job posting URL '{url}': {e}")))?;

        match greenhouse_api_url(&parsed)? {
            Some(api_url) => {
                info!("Fetching Greenhouse posting via {api_url}");
                let body = self.get(&api_url).await?;
                let (title, description) = parse_greenhouse(&body)?;
                Ok(JobPosting {
                    title,
                    description,
                    source: PostingSource::Greenhouse,
                })
            }
            None => {
                info!("Scraping job posting from {url}");
                let body = self.get(url).await?;
                let (title, description) = scrape_posting(&body)?;
                Ok(JobPosting {
                    title,
                    description,
                    source: PostingSource::Html,
                })
            }
        }
    }

    async fn get(&self, url: &str) -> Result<String, AppError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Fetch(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Fetch(format!("{url} returned {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Fetch(format!("could not read response from {url}: {e}")))?;
        debug!("Fetched {} bytes from {url}", body.len());
        Ok(body)
    }
}

/// API URL for a Greenhouse posting, `None` for any other host.
///
/// The path must hold `.../{company}/jobs/{id}`.
fn greenhouse_api_url(url: &Url) -> Result<Option<String>, AppError> {
    let is_greenhouse = url
        .host_str()
        .is_some_and(|host| host == "greenhouse.io" || host.ends_with(".greenhouse.io"));
    if !is_greenhouse {
        return Ok(None);
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let jobs = segments
        .iter()
        .position(|s| *s == "jobs")
        .ok_or_else(|| AppError::Fetch("Invalid Greenhouse URL: 'jobs' not found in path.".into()))?;

    match (jobs.checked_sub(1).map(|i| segments[i]), segments.get(jobs + 1)) {
        (Some(company), Some(job_id)) => {
            Ok(Some(format!("{GREENHOUSE_API}/{company}/jobs/{job_id}")))
        }
        _ => Err(AppError::Fetch("Invalid Greenhouse URL format.".into())),
    }
}

fn parse_greenhouse(body: &str) -> Result<(String, String), AppError> {
    let job: GreenhouseJob = serde_json::from_str(body)
        .map_err(|e| AppError::Fetch(format!("unexpected Greenhouse API response: {e}")))?;

    let title = job.title.trim().to_string();
    let description = content_to_text(&job.content);
    if title.is_empty() || description.is_empty() {
        return Err(AppError::Fetch(
            "Job title or description not found in Greenhouse API response.".into(),
        ));
    }
    Ok((title, description))
}

/// Greenhouse `content` to plain text, unescaping first when the HTML arrives entity-encoded.
fn content_to_text(content: &str) -> String {
    let markup = if content.contains("&lt;") {
        Html::parse_fragment(content)
            .root_element()
            .text()
            .collect::<String>()
    } else {
        content.to_string()
    };
    element_lines(Html::parse_fragment(&markup).root_element())
}

fn scrape_posting(html: &str) -> Result<(String, String), AppError> {
    let document = Html::parse_document(html);

    let h1 = selector("h1")?;
    let h2 = selector("h2")?;
    let heading = document
        .select(&h1)
        .next()
        .or_else(|| document.select(&h2).next())
        .ok_or_else(|| AppError::Fetch("Job title not found on the page.".into()))?;
    let title = heading
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if title.is_empty() {
        return Err(AppError::Fetch("Job title not found on the page.".into()));
    }

    let description_selector = selector(DESCRIPTION_SELECTOR)?;
    let blocks: Vec<String> = document
        .select(&description_selector)
        .map(element_lines)
        .collect();

    let description = if blocks.is_empty() {
        debug!("No description container found, using full page text");
        element_lines(document.root_element())
    } else {
        blocks.join("\n").trim().to_string()
    };

    if description.is_empty() {
        return Err(AppError::Fetch("Job description not found on the page.".into()));
    }
    Ok((title, description))
}

/// Text nodes of an element, trimmed, blanks dropped, one per line.
fn element_lines(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid CSS selector '{css}': {e:?}")))
}
