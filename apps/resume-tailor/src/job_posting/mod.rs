//! Job posting ingestion: fetch a posting by URL and distill its key requirements.

pub mod fetcher;
pub mod prompts;
pub mod requirements;

pub use fetcher::JobPostingFetcher;
pub use requirements::extract_requirements;

/// Where a posting's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingSource {
    /// Greenhouse boards API
    Greenhouse,
    /// Generic HTML scrape
    Html,
}

/// A fetched job posting as plain text.
#[derive(Debug, Clone, PartialEq)]
pub struct JobPosting {
    pub title: String,
    pub description: String,
    pub source: PostingSource,
}
