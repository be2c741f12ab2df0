//! Workout KPI aggregation and report-history reconciliation.
//!
//! The two core entry points are pure: [`summarize`] turns raw set rows into a
//! [`Report`], and [`normalize`] rebuilds a display-ready report from whatever
//! shape a stored document happens to have. Everything else in the crate is
//! the plumbing around them: the upstream [`RowSource`], the
//! [`store::ReportStore`] backends, configuration and retry.

use std::borrow::Cow;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub mod aggregate;
pub mod config;
pub mod http_client;
pub mod object_id;
pub mod reconcile;
pub mod reports;
pub mod retry;
pub mod store;
pub mod tolerant;
pub mod utils;

pub use aggregate::summarize;
pub use object_id::ObjectId;
pub use reconcile::{NormalizedReport, ReconcileError, normalize};

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    InvalidDate(String),
    #[error("{0}")]
    InvalidRange(String),
}

impl From<rusqlite::Error> for AnalyticsError {
    fn from(err: rusqlite::Error) -> Self {
        AnalyticsError::Storage(err.to_string())
    }
}

/// Opaque identifier carried by upstream rows. The workout service emits
/// numeric ids, but string ids are accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RowId {
    Int(i64),
    Str(String),
}

impl RowId {
    pub fn as_cow(&self) -> Cow<'_, str> {
        match self {
            RowId::Int(v) => Cow::Owned(v.to_string()),
            RowId::Str(s) => Cow::Borrowed(s),
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_cow())
    }
}

/// One flattened (workout, exercise, set) record from the workout service.
///
/// `reps`, `weight_kg` and `workout_date` are kept as raw JSON values because
/// producers disagree on their types; [`tolerant`] narrows them at use sites.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawRow {
    #[serde(default, deserialize_with = "deserialize_opt_row_id")]
    pub workout_id: Option<RowId>,
    #[serde(default, deserialize_with = "deserialize_opt_row_id")]
    pub exercise_id: Option<RowId>,
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub exercise_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_row_id")]
    pub set_id: Option<RowId>,
    #[serde(default)]
    pub reps: Option<serde_json::Value>,
    #[serde(default)]
    pub weight_kg: Option<serde_json::Value>,
    #[serde(default)]
    pub workout_date: Option<serde_json::Value>,
}

// Identifiers never fail a row: integral numbers stay numeric, anything else
// non-null is kept by its textual form.
fn deserialize_opt_row_id<'de, D>(deserializer: D) -> Result<Option<RowId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(RowId::Str(s)),
        Some(serde_json::Value::Number(n)) => match n.as_i64() {
            Some(i) => Some(RowId::Int(i)),
            None => Some(RowId::Str(n.to_string())),
        },
        Some(other) => Some(RowId::Str(other.to_string())),
    })
}

fn deserialize_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Summary {
    pub workouts: u64,
    pub exercises: u64,
    pub sets: u64,
    pub total_reps: i64,
    pub total_volume: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DayVolume {
    pub date: String,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExerciseVolume {
    pub exercise: String,
    pub volume: f64,
}

/// KPI summary for an inclusive `from..=to` range.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Report {
    pub from: String,
    pub to: String,
    pub summary: Summary,
    pub by_day: Vec<DayVolume>,
    pub by_exercise: Vec<ExerciseVolume>,
}

impl Report {
    pub fn empty(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            summary: Summary::default(),
            by_day: Vec::new(),
            by_exercise: Vec::new(),
        }
    }
}

/// Upstream provider of raw rows for an inclusive date range.
#[async_trait]
pub trait RowSource: Send + Sync + 'static {
    async fn fetch_rows(&self, from: &str, to: &str) -> Result<Vec<RawRow>, AnalyticsError>;
}
