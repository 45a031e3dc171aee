//! arXiv API Client
//!
//! Queries the public arXiv API (`export.arxiv.org/api/query`) and parses the
//! Atom feed it returns into [`Paper`] records.
//!
//! ## Paging
//!
//! arXiv serves at most a slice of results per call. Larger requests are
//! fetched page by page (`start` / `max_results`), pausing between calls as
//! the API terms of use ask. Paging stops once enough papers are collected,
//! a page comes back empty, or `opensearch:totalResults` is reached.

use std::time::Duration;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ArxivConfig;

/// Errors that can occur while talking to arXiv
#[derive(Debug, Error)]
pub enum ArxivError {
    #[error("arXiv request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("arXiv returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse arXiv feed: {0}")]
    Parse(String),

    #[error("arXiv rejected the query: {0}")]
    Api(String),
}

/// Sort field understood by the arXiv API (`sortBy`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortCriterion {
    Relevance,
    LastUpdatedDate,
    #[default]
    SubmittedDate,
}

impl SortCriterion {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortCriterion::Relevance => "relevance",
            SortCriterion::LastUpdatedDate => "lastUpdatedDate",
            SortCriterion::SubmittedDate => "submittedDate",
        }
    }
}

/// Sort direction understood by the arXiv API (`sortOrder`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ascending",
            SortOrder::Descending => "descending",
        }
    }
}

/// A search against the arXiv API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArxivSearch {
    /// arXiv `search_query` expression, e.g. `ti:transformer AND cat:cs.CL`
    pub query: Option<String>,
    /// Restrict results to these arXiv ids
    pub id_list: Vec<String>,
    pub sort_by: SortCriterion,
    pub sort_order: SortOrder,
    /// Total number of papers to collect across all pages
    pub max_results: usize,
}

impl Default for ArxivSearch {
    fn default() -> Self {
        Self {
            query: None,
            id_list: Vec::new(),
            sort_by: SortCriterion::default(),
            sort_order: SortOrder::default(),
            max_results: 10,
        }
    }
}

impl ArxivSearch {
    fn query_pairs(&self, start: usize, page_size: usize) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(query) = &self.query {
            pairs.push(("search_query", query.clone()));
        }
        if !self.id_list.is_empty() {
            pairs.push(("id_list", self.id_list.join(",")));
        }
        pairs.push(("start", start.to_string()));
        pairs.push(("max_results", page_size.to_string()));
        pairs.push(("sortBy", self.sort_by.as_str().to_string()));
        pairs.push(("sortOrder", self.sort_order.as_str().to_string()));
        pairs
    }
}

/// A link attached to a paper (abstract page, PDF, DOI resolver)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperLink {
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Metadata for a single arXiv paper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    /// Full entry URL, e.g. `http://arxiv.org/abs/2101.00001v1`
    pub entry_id: String,
    /// Short id, e.g. `2101.00001v1`
    pub arxiv_id: String,
    pub title: String,
    pub authors: Vec<String>,
    /// Abstract
    pub summary: String,
    pub published: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_category: Option<String>,
    pub categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    pub links: Vec<PaperLink>,
}

/// Everything a search produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub search_query: Option<String>,
    pub id_list: Vec<String>,
    /// Total hits reported by arXiv, which may exceed `papers.len()`
    pub total_results: Option<usize>,
    pub papers: Vec<Paper>,
}

/// arXiv API client
pub struct ArxivClient {
    http: Client,
    base_url: String,
    page_size: usize,
    page_delay: Duration,
}

impl ArxivClient {
    /// Client for the public arXiv endpoint with default settings
    pub fn new() -> Result<Self, ArxivError> {
        Self::from_config(&ArxivConfig::default())
    }

    pub fn from_config(config: &ArxivConfig) -> Result<Self, ArxivError> {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            http: builder.build()?,
            base_url: config.base_url.clone(),
            page_size: config.page_size.max(1),
            page_delay: Duration::from_millis(config.page_delay_ms),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// Run a search, following pages until `max_results` papers are collected
    pub async fn search(&self, search: &ArxivSearch) -> Result<SearchResults, ArxivError> {
        info!(
            query = ?search.query,
            ids = search.id_list.len(),
            max_results = search.max_results,
            "Searching arXiv"
        );

        let mut papers: Vec<Paper> = Vec::new();
        let mut total_results = None;
        let mut start = 0;

        while papers.len() < search.max_results {
            if start > 0 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            let size = self.page_size.min(search.max_results - papers.len());
            let page = self.fetch_page(search, start, size).await?;

            if total_results.is_none() {
                total_results = page.total_results;
            }

            let received = page.papers.len();
            debug!(start, requested = size, received, "Fetched arXiv page");

            papers.extend(page.papers);
            start += received;

            let exhausted = total_results.map_or(false, |total| start >= total);
            if received == 0 || exhausted {
                break;
            }
        }

        papers.truncate(search.max_results);
        info!(count = papers.len(), total = ?total_results, "arXiv search completed");

        Ok(SearchResults {
            search_query: search.query.clone(),
            id_list: search.id_list.clone(),
            total_results,
            papers,
        })
    }

    async fn fetch_page(
        &self,
        search: &ArxivSearch,
        start: usize,
        size: usize,
    ) -> Result<FeedPage, ArxivError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&search.query_pairs(start, size))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Rejected queries (e.g. a malformed id_list) carry an Atom error entry
            if let Err(ArxivError::Api(message)) = parse_feed(&body) {
                return Err(ArxivError::Api(message));
            }
            return Err(ArxivError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        parse_feed(&body)
    }
}

/// One page of an Atom feed
#[derive(Debug, Default)]
struct FeedPage {
    total_results: Option<usize>,
    papers: Vec<Paper>,
}

#[derive(Debug, Default)]
struct PaperBuilder {
    entry_id: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    authors: Vec<String>,
    published: Option<String>,
    updated: Option<String>,
    primary_category: Option<String>,
    categories: Vec<String>,
    comment: Option<String>,
    journal_ref: Option<String>,
    doi: Option<String>,
    links: Vec<PaperLink>,
}

impl PaperBuilder {
    fn apply_attributes(&mut self, element: &str, start: &BytesStart<'_>) -> Result<(), ArxivError> {
        match element {
            "link" => {
                if let Some(href) = attribute(start, "href")? {
                    self.links.push(PaperLink {
                        href,
                        rel: attribute(start, "rel")?,
                        title: attribute(start, "title")?,
                        content_type: attribute(start, "type")?,
                    });
                }
            }
            "primary_category" => self.primary_category = attribute(start, "term")?,
            "category" => {
                if let Some(term) = attribute(start, "term")? {
                    self.categories.push(term);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn apply_text(&mut self, element: &str, parent: Option<&str>, text: String) {
        match (element, parent) {
            ("id", Some("entry")) => self.entry_id = Some(text),
            ("title", Some("entry")) => self.title = Some(collapse_whitespace(&text)),
            ("summary", Some("entry")) => self.summary = Some(text),
            ("published", Some("entry")) => self.published = Some(text),
            ("updated", Some("entry")) => self.updated = Some(text),
            ("name", Some("author")) => self.authors.push(text),
            ("comment", Some("entry")) => self.comment = Some(text),
            ("journal_ref", Some("entry")) => self.journal_ref = Some(text),
            ("doi", Some("entry")) => self.doi = Some(text),
            _ => {}
        }
    }

    fn build(self) -> Result<Paper, ArxivError> {
        let entry_id = self
            .entry_id
            .ok_or_else(|| ArxivError::Parse("entry without <id>".to_string()))?;

        // arXiv reports bad queries as a feed with a single error entry
        if entry_id.contains("/api/errors") {
            return Err(ArxivError::Api(self.summary.unwrap_or(entry_id)));
        }

        let arxiv_id = entry_id
            .rsplit_once("/abs/")
            .map(|(_, id)| id)
            .unwrap_or(&entry_id)
            .to_string();

        let pdf_url = self
            .links
            .iter()
            .find(|link| link.title.as_deref() == Some("pdf"))
            .map(|link| link.href.clone());

        Ok(Paper {
            published: parse_timestamp("published", self.published)?,
            updated: parse_timestamp("updated", self.updated)?,
            title: self.title.unwrap_or_default(),
            summary: self.summary.unwrap_or_default(),
            authors: self.authors,
            primary_category: self.primary_category,
            categories: self.categories,
            comment: self.comment,
            journal_ref: self.journal_ref,
            doi: self.doi,
            pdf_url,
            links: self.links,
            entry_id,
            arxiv_id,
        })
    }
}

fn parse_feed(xml: &str) -> Result<FeedPage, ArxivError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut page = FeedPage::default();
    let mut entry: Option<PaperBuilder> = None;
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event().map_err(|e| ArxivError::Parse(e.to_string()))? {
            Event::Start(start) => {
                let name = local_name(start.local_name().as_ref());
                if name == "entry" {
                    entry = Some(PaperBuilder::default());
                } else if let Some(builder) = entry.as_mut() {
                    builder.apply_attributes(&name, &start)?;
                }
                path.push(name);
                text.clear();
            }
            Event::Empty(start) => {
                if let Some(builder) = entry.as_mut() {
                    let name = local_name(start.local_name().as_ref());
                    builder.apply_attributes(&name, &start)?;
                }
            }
            Event::Text(content) => {
                let unescaped = content
                    .unescape()
                    .map_err(|e| ArxivError::Parse(e.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::CData(content) => {
                text.push_str(&String::from_utf8_lossy(&content.into_inner()));
            }
            Event::End(_) => {
                let name = path.pop().unwrap_or_default();
                let value = std::mem::take(&mut text).trim().to_string();

                if name == "entry" {
                    if let Some(builder) = entry.take() {
                        page.papers.push(builder.build()?);
                    }
                } else if let Some(builder) = entry.as_mut() {
                    builder.apply_text(&name, path.last().map(String::as_str), value);
                } else if name == "totalResults" {
                    page.total_results = value.parse().ok();
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(page)
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn attribute(start: &BytesStart<'_>, key: &str) -> Result<Option<String>, ArxivError> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ArxivError::Parse(e.to_string()))?;
        if attr.key.local_name().as_ref() == key.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|e| ArxivError::Parse(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn parse_timestamp(field: &str, value: Option<String>) -> Result<DateTime<Utc>, ArxivError> {
    let value = value.ok_or_else(|| ArxivError::Parse(format!("entry without <{}>", field)))?;
    DateTime::parse_from_rfc3339(&value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| ArxivError::Parse(format!("invalid {} timestamp '{}': {}", field, value, e)))
}

/// Titles come back hard-wrapped; fold runs of whitespace into single spaces
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
