//! Rebuilding display-ready reports from stored documents.
//!
//! Stored documents were written by several producers over time, so any field
//! may be missing, mis-typed or live under a different parent. Each output
//! field is resolved through an ordered list of [`Source`]s; the first source
//! that yields a value wins.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::ObjectId;
use crate::tolerant::{as_sequence, as_text};
use crate::utils::report_filename;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("stored document has no _id")]
    MissingId,
    #[error("stored document has an invalid _id: {0}")]
    InvalidId(String),
}

/// One candidate location for a field plus the transform that narrows it.
pub struct Source<T> {
    pub path: &'static [&'static str],
    pub transform: fn(&Value) -> Option<T>,
}

impl<T> Source<T> {
    pub fn resolve(&self, doc: &Value) -> Option<T> {
        lookup(doc, self.path).and_then(self.transform)
    }
}

fn lookup<'a>(doc: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(doc, |node, key| node.get(*key))
}

/// First source in `chain` that resolves against `doc`.
pub fn first_present<T>(doc: &Value, chain: &[Source<T>]) -> Option<T> {
    chain.iter().find_map(|source| source.resolve(doc))
}

fn text(v: &Value) -> Option<String> {
    as_text(Some(v)).map(str::to_owned)
}

// `{"$date": "..."}` is how extended-JSON exports spell timestamps.
fn timestamp_text(v: &Value) -> Option<String> {
    text(v).or_else(|| v.get("$date").and_then(text))
}

pub const RANGE_FROM: &[Source<String>] = &[
    Source {
        path: &["range", "from"],
        transform: text,
    },
    Source {
        path: &["result", "from"],
        transform: text,
    },
];

pub const RANGE_TO: &[Source<String>] = &[
    Source {
        path: &["range", "to"],
        transform: text,
    },
    Source {
        path: &["result", "to"],
        transform: text,
    },
];

pub const GENERATED_AT: &[Source<String>] = &[Source {
    path: &["meta", "generated_at"],
    transform: timestamp_text,
}];

pub const PDF_FILENAME: &[Source<String>] = &[Source {
    path: &["pdf", "filename"],
    transform: text,
}];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRange {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfDescriptor {
    pub filename: Option<String>,
    pub generated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportBody {
    pub from: Option<String>,
    pub to: Option<String>,
    pub summary: Option<Value>,
    pub by_day: Vec<Value>,
    pub by_exercise: Vec<Value>,
}

/// A stored report with every field resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedReport {
    pub id: String,
    pub generated_at: String,
    pub range: ReportRange,
    pub pdf: PdfDescriptor,
    pub result: ReportBody,
}

/// Extract the store id from a document. Accepts the plain hex string and the
/// extended-JSON `{"$oid": "..."}` form.
pub fn document_id(doc: &Value) -> Result<ObjectId, ReconcileError> {
    let raw = match doc.get("_id") {
        None | Some(Value::Null) => return Err(ReconcileError::MissingId),
        Some(Value::String(s)) => s.as_str(),
        Some(v) => match v.get("$oid").and_then(Value::as_str) {
            Some(s) => s,
            None => return Err(ReconcileError::InvalidId(v.to_string())),
        },
    };
    raw.parse()
        .map_err(|_| ReconcileError::InvalidId(raw.to_string()))
}

fn pdf_generated(doc: &Value) -> bool {
    match lookup(doc, &["pdf", "generated"]) {
        None => true,
        Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

fn body_sequence(doc: &Value, key: &'static str, field: &'static str) -> Vec<Value> {
    as_sequence(lookup(doc, &["result", key])).observe(field)
}

/// Rebuild a complete report from a stored document.
///
/// Only a missing or malformed `_id` is an error; every other gap is filled
/// from the fallback chains above.
pub fn normalize(doc: &Value) -> Result<NormalizedReport, ReconcileError> {
    let id = document_id(doc)?;

    let from = first_present(doc, RANGE_FROM);
    let to = first_present(doc, RANGE_TO);

    let generated_at = first_present(doc, GENERATED_AT)
        .unwrap_or_else(|| id.generation_time().to_rfc3339());

    let filename = first_present(doc, PDF_FILENAME).or_else(|| {
        (from.is_some() || to.is_some())
            .then(|| report_filename(from.as_deref(), to.as_deref()))
    });

    let result = ReportBody {
        from: lookup(doc, &["result", "from"]).and_then(text),
        to: lookup(doc, &["result", "to"]).and_then(text),
        summary: lookup(doc, &["result", "summary"])
            .filter(|v| !v.is_null())
            .cloned(),
        by_day: body_sequence(doc, "by_day", "result.by_day"),
        by_exercise: body_sequence(doc, "by_exercise", "result.by_exercise"),
    };

    Ok(NormalizedReport {
        id: id.to_hex(),
        generated_at,
        range: ReportRange { from, to },
        pdf: PdfDescriptor {
            filename,
            generated: pdf_generated(doc),
        },
        result,
    })
}
