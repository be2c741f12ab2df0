//! Report-history documents as written by the save path.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::utils::report_filename;

pub const DEFAULT_SOURCE: &str = "frontend-angular";
pub const DEFAULT_TRIGGER: &str = "user_click";

/// Payload accepted when a generated report is saved to history.
///
/// Everything is optional: older clients send only `result`, newer ones send
/// the range and the exported filename alongside it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ReportCreateRequest {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub generated_at: Option<String>,
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty())
}

fn result_text<'a>(result: Option<&'a Value>, key: &str) -> Option<&'a str> {
    result
        .and_then(|r| r.get(key))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Build the document stored for `request`, filling `meta`, `range` and `pdf`
/// so that later reads need as little reconciliation as possible.
pub fn prepare_for_insert(request: &ReportCreateRequest, now: DateTime<Utc>) -> Value {
    let result = request.result.as_ref();

    let from = non_empty(&request.from).or_else(|| result_text(result, "from"));
    let to = non_empty(&request.to).or_else(|| result_text(result, "to"));

    let filename = match non_empty(&request.filename) {
        Some(f) => Some(f.to_string()),
        None if from.is_some() && to.is_some() => Some(report_filename(from, to)),
        None => None,
    };

    let generated_at = non_empty(&request.generated_at)
        .map(str::to_owned)
        .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Micros, false));

    let mut doc = Map::new();
    doc.insert(
        "meta".into(),
        json!({
            "generated_at": generated_at,
            "source": non_empty(&request.source).unwrap_or(DEFAULT_SOURCE),
            "trigger": non_empty(&request.trigger).unwrap_or(DEFAULT_TRIGGER),
        }),
    );
    doc.insert("range".into(), json!({ "from": from, "to": to }));
    doc.insert(
        "pdf".into(),
        json!({ "filename": filename, "generated": true }),
    );
    if let Some(r) = result {
        doc.insert("result".into(), r.clone());
    }
    Value::Object(doc)
}
