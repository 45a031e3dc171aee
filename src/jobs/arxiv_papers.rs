//! arXiv Papers Job
//!
//! Source key `arxiv.papers`. Validates the caller's parameters, translates
//! them into an arXiv API search and returns the matching paper metadata.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use validator::{Validate, ValidationError};

use super::{parse_params, JobHandler};
use crate::models::QueryRequest;
use crate::search::{ArxivClient, ArxivError, ArxivSearch, SortCriterion, SortOrder};
use crate::types::JobError;

pub const SOURCE: &str = "arxiv.papers";

pub const MAX_RESULTS_LIMIT: i64 = 30_000;

/// Format of `since_date` / `until_date`, e.g. `202401311830`
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

/// Lower bound used when only `until_date` is given. arXiv opened in 1991.
const EARLIEST_SUBMISSION: &str = "199101010000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum SortBy {
    #[serde(rename = "submittedDate")]
    #[default]
    SubmittedDate,
    #[serde(rename = "lastUpdatedDate")]
    LastUpdatedDate,
    #[serde(rename = "relevance")]
    Relevance,
}

impl From<SortBy> for SortCriterion {
    fn from(sort_by: SortBy) -> Self {
        match sort_by {
            SortBy::SubmittedDate => SortCriterion::SubmittedDate,
            SortBy::LastUpdatedDate => SortCriterion::LastUpdatedDate,
            SortBy::Relevance => SortCriterion::Relevance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl From<SortDirection> for SortOrder {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Ascending => SortOrder::Ascending,
            SortDirection::Descending => SortOrder::Descending,
        }
    }
}

/// arXiv ids, either comma separated (`"2401.00001,2401.00002"`) or as an array
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdList {
    Joined(String),
    Many(Vec<String>),
}

impl IdList {
    pub fn ids(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            IdList::Joined(joined) => joined.split(',').collect(),
            IdList::Many(ids) => ids.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Parameters accepted by `arxiv.papers`
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_search_window"))]
pub struct ArxivParams {
    /// arXiv search expression, e.g. `ti:"graph neural" AND cat:cs.LG`
    #[serde(default)]
    pub query: Option<String>,
    #[serde(rename = "sortBy", default)]
    pub sort_by: SortBy,
    #[serde(rename = "sortOrder", default)]
    pub sort_order: SortDirection,
    #[serde(default = "default_max_results")]
    #[validate(range(min = 1, max = 30000, message = "must be between 1 and 30000"))]
    pub max_results: i64,
    /// Earliest submission time, `YYYYMMDDHHMM` (UTC)
    #[serde(default)]
    pub since_date: Option<String>,
    /// Latest submission time, `YYYYMMDDHHMM` (UTC)
    #[serde(default)]
    pub until_date: Option<String>,
    #[serde(default)]
    pub id_list: Option<IdList>,
}

fn default_max_results() -> i64 {
    10
}

fn validate_search_window(params: &ArxivParams) -> Result<(), ValidationError> {
    let since = parse_bound("since_date", params.since_date.as_deref())?;
    let until = parse_bound("until_date", params.until_date.as_deref())?;

    match (since, until) {
        (Some(since), Some(until)) if since > until => {
            return Err(ValidationError::new("date_range")
                .with_message("since_date must not be later than until_date".into()));
        }
        // The open upper bound becomes "now" in the search query
        (Some(since), None) if since > Utc::now().naive_utc() => {
            return Err(ValidationError::new("date_range").with_message(
                "since_date must not be in the future when until_date is omitted".into(),
            ));
        }
        _ => {}
    }

    let has_query = params
        .query
        .as_deref()
        .map_or(false, |q| !q.trim().is_empty());
    let has_ids = params
        .id_list
        .as_ref()
        .map_or(false, |ids| !ids.ids().is_empty());

    if !has_query && !has_ids && since.is_none() && until.is_none() {
        return Err(ValidationError::new("empty_search").with_message(
            "one of query, id_list, since_date or until_date must be provided".into(),
        ));
    }

    Ok(())
}

fn parse_bound(field: &'static str, value: Option<&str>) -> Result<Option<NaiveDateTime>, ValidationError> {
    let Some(value) = value else {
        return Ok(None);
    };

    let valid_shape = value.len() == 12 && value.bytes().all(|b| b.is_ascii_digit());
    match NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT) {
        Ok(parsed) if valid_shape => Ok(Some(parsed)),
        _ => Err(ValidationError::new("timestamp").with_message(
            format!("{} must be a YYYYMMDDHHMM timestamp, got '{}'", field, value).into(),
        )),
    }
}

impl ArxivParams {
    /// The arXiv `search_query`: free text AND-ed with a submission date window
    pub fn search_query(&self, now: DateTime<Utc>) -> Option<String> {
        let text = self
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty());

        let window = if self.since_date.is_some() || self.until_date.is_some() {
            let since = self.since_date.as_deref().unwrap_or(EARLIEST_SUBMISSION);
            let until = self
                .until_date
                .clone()
                .unwrap_or_else(|| now.format(TIMESTAMP_FORMAT).to_string());
            Some(format!("submittedDate:[{} TO {}]", since, until))
        } else {
            None
        };

        match (text, window) {
            (Some(text), Some(window)) => Some(format!("({}) AND {}", text, window)),
            (Some(text), None) => Some(text.to_string()),
            (None, Some(window)) => Some(window),
            (None, None) => None,
        }
    }

    pub fn to_search(&self, now: DateTime<Utc>) -> ArxivSearch {
        ArxivSearch {
            query: self.search_query(now),
            id_list: self.id_list.as_ref().map(IdList::ids).unwrap_or_default(),
            sort_by: self.sort_by.into(),
            sort_order: self.sort_order.into(),
            // validated to 1..=30000
            max_results: self.max_results.clamp(1, MAX_RESULTS_LIMIT) as usize,
        }
    }
}

impl From<ArxivError> for JobError {
    fn from(err: ArxivError) -> Self {
        JobError::UpstreamFailure(err.to_string())
    }
}

pub struct ArxivPapersJob {
    client: ArxivClient,
}

impl ArxivPapersJob {
    pub fn new(client: ArxivClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl JobHandler for ArxivPapersJob {
    async fn execute(&self, request: &QueryRequest) -> Result<Value, JobError> {
        let params: ArxivParams = parse_params(SOURCE, &request.params)?;
        let search = params.to_search(Utc::now());

        info!(
            search_query = ?search.query,
            sort_by = search.sort_by.as_str(),
            sort_order = search.sort_order.as_str(),
            max_results = search.max_results,
            "Running arXiv papers job"
        );

        let results = self.client.search(&search).await?;

        serde_json::to_value(&results).map_err(|e| JobError::Internal(e.to_string()))
    }
}
