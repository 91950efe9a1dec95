//! # Search Module
//!
//! The synchronous half of the nhmmer sequence search.
//!
//! This module contains:
//! - Query validation (length limits)
//! - Job status values shared by the queue and the API
//! - `SearchHit`, one aligned target of a query
//! - Result ordering for the results endpoint
//! - The nhmmer output parser (`nhmmer`)
//!
//! Running nhmmer and tracking jobs is the app's business; everything
//! here is pure.

pub mod nhmmer;

pub use nhmmer::parse_nhmmer_output;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Shortest query accepted.
pub const MIN_LENGTH: usize = 10;

/// Longest query accepted.
pub const MAX_LENGTH: usize = 10_000;

// =============================================================================
// QUERY VALIDATION
// =============================================================================

/// Why a query was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryError {
    NoSequence,
    TooShort,
    TooLong,
}

impl QueryError {
    /// Machine-readable reason.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::NoSequence => "no_sequence",
            Self::TooShort => "too_short",
            Self::TooLong => "too_long",
        }
    }

    /// Message shown to users.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::NoSequence => "Please submit a sequence",
            Self::TooShort => "The sequence is too short",
            Self::TooLong => "The sequence is too long",
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::error::Error for QueryError {}

/// Check a submitted query against the length limits.
pub fn validate_query(query: &str) -> Result<(), QueryError> {
    let length = query.chars().count();
    if length == 0 {
        Err(QueryError::NoSequence)
    } else if length < MIN_LENGTH {
        Err(QueryError::TooShort)
    } else if length > MAX_LENGTH {
        Err(QueryError::TooLong)
    } else {
        Ok(())
    }
}

// =============================================================================
// JOB STATUS
// =============================================================================

/// Lifecycle of a search job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Started,
    Finished,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Whether the job can no longer change.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Started => "started",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

// =============================================================================
// HITS
// =============================================================================

/// One aligned target sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "id")]
    pub result_id: u64,
    pub rnacentral_id: String,
    pub description: String,
    pub bias: f64,
    pub target_length: u64,
    pub query_length: u64,
    /// Alignment block as printed by nhmmer.
    pub alignment: String,
    pub score: f64,
    pub e_value: f64,
    pub match_count: u64,
    pub gap_count: u64,
    pub alignment_length: u64,
    /// Residues of the query in the alignment.
    pub nts_count1: u64,
    /// Residues of the target in the alignment.
    pub nts_count2: u64,
    /// Percentages.
    pub identity: f64,
    pub query_coverage: f64,
    pub target_coverage: f64,
    pub gaps: f64,
}

// =============================================================================
// ORDERING
// =============================================================================

/// Sortable result columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    Identity,
    QueryCoverage,
    TargetCoverage,
    Gaps,
    EValue,
    ResultId,
}

impl FromStr for OrderField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identity" => Ok(Self::Identity),
            "query_coverage" => Ok(Self::QueryCoverage),
            "target_coverage" => Ok(Self::TargetCoverage),
            "gaps" => Ok(Self::Gaps),
            "e_value" => Ok(Self::EValue),
            "result_id" => Ok(Self::ResultId),
            other => Err(format!("unknown ordering field: {other}")),
        }
    }
}

impl OrderField {
    fn compare(self, a: &SearchHit, b: &SearchHit) -> Ordering {
        match self {
            Self::Identity => a.identity.total_cmp(&b.identity),
            Self::QueryCoverage => a.query_coverage.total_cmp(&b.query_coverage),
            Self::TargetCoverage => a.target_coverage.total_cmp(&b.target_coverage),
            Self::Gaps => a.gaps.total_cmp(&b.gaps),
            Self::EValue => a.e_value.total_cmp(&b.e_value),
            Self::ResultId => a.result_id.cmp(&b.result_id),
        }
    }
}

/// Ordering of search results: a list of fields, each ascending or
/// descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultOrdering {
    keys: Vec<(OrderField, bool)>,
}

impl Default for ResultOrdering {
    fn default() -> Self {
        Self {
            keys: vec![(OrderField::EValue, false), (OrderField::ResultId, false)],
        }
    }
}

impl ResultOrdering {
    /// Parse `field,-field` lists. Unknown fields are ignored; if nothing
    /// valid remains the default ordering applies.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let keys: Vec<(OrderField, bool)> = raw
            .unwrap_or("")
            .split(',')
            .filter_map(|term| {
                let term = term.trim();
                let (name, descending) = match term.strip_prefix('-') {
                    Some(name) => (name, true),
                    None => (term, false),
                };
                name.parse::<OrderField>().ok().map(|f| (f, descending))
            })
            .collect();
        if keys.is_empty() {
            Self::default()
        } else {
            Self { keys }
        }
    }

    /// Sort hits in place.
    pub fn sort(&self, hits: &mut [SearchHit]) {
        hits.sort_by(|a, b| {
            for (field, descending) in &self.keys {
                let ord = field.compare(a, b);
                let ord = if *descending { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }
}
