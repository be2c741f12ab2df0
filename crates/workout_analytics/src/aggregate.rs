//! Row-level aggregation into range KPIs.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;

use crate::tolerant::{parse_reps, parse_weight};
use crate::{DayVolume, ExerciseVolume, RawRow, Report, RowId, Summary};

pub const UNKNOWN_EXERCISE: &str = "unknown_exercise";

/// Round to two decimals, ties to even.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round_ties_even() / 100.0
}

/// Day bucket key: the first ten characters of the workout date.
pub fn day_key(value: Option<&Value>) -> String {
    let text = match value {
        None | Some(Value::Null) => return String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    text.chars().take(10).collect()
}

pub fn exercise_label(name: Option<&str>, exercise_id: Option<&RowId>) -> String {
    match (name.filter(|n| !n.is_empty()), exercise_id) {
        (Some(n), _) => n.to_string(),
        (None, Some(id)) => format!("exercise_{id}"),
        (None, None) => UNKNOWN_EXERCISE.to_string(),
    }
}

/// Per-exercise running sums that remember first-encounter order, so the
/// descending sort can stay stable on ties.
#[derive(Default)]
struct ExerciseTotals {
    index: HashMap<String, usize>,
    totals: Vec<(String, f64)>,
}

impl ExerciseTotals {
    fn add(&mut self, label: String, volume: f64) {
        match self.index.get(&label) {
            Some(&i) => self.totals[i].1 += volume,
            None => {
                self.index.insert(label.clone(), self.totals.len());
                self.totals.push((label, volume));
            }
        }
    }

    fn into_sorted(mut self) -> Vec<ExerciseVolume> {
        self.totals.sort_by(|a, b| b.1.total_cmp(&a.1));
        self.totals
            .into_iter()
            .map(|(exercise, volume)| ExerciseVolume {
                exercise,
                volume: round2(volume),
            })
            .collect()
    }
}

/// Summarize `rows` for the inclusive range `from..=to`.
///
/// Never fails: malformed numeric fields degrade to zero and rows without a
/// `set_id` only count towards the distinct workout/exercise totals.
pub fn summarize(from: &str, to: &str, rows: &[RawRow]) -> Report {
    if rows.is_empty() {
        return Report::empty(from, to);
    }

    let mut workouts: HashSet<&RowId> = HashSet::new();
    let mut exercises: HashSet<&RowId> = HashSet::new();

    let mut sets = 0u64;
    let mut total_reps = 0i64;
    let mut total_volume = 0.0f64;

    let mut by_day: BTreeMap<String, f64> = BTreeMap::new();
    let mut by_exercise = ExerciseTotals::default();

    for row in rows {
        if let Some(id) = &row.workout_id {
            workouts.insert(id);
        }
        if let Some(id) = &row.exercise_id {
            exercises.insert(id);
        }

        if row.set_id.is_none() {
            continue;
        }

        let reps = parse_reps(row.reps.as_ref()).observe("reps");
        let weight = parse_weight(row.weight_kg.as_ref()).observe("weight_kg");
        let volume = reps as f64 * weight;

        sets = sets.saturating_add(1);
        total_reps = total_reps.saturating_add(reps);
        total_volume += volume;

        let day = day_key(row.workout_date.as_ref());
        if !day.is_empty() {
            *by_day.entry(day).or_insert(0.0) += volume;
        }

        by_exercise.add(
            exercise_label(row.exercise_name.as_deref(), row.exercise_id.as_ref()),
            volume,
        );
    }

    metrics::counter!("workout_analytics_rows_total").increment(rows.len() as u64);
    tracing::debug!(
        from,
        to,
        rows = rows.len(),
        sets,
        workouts = workouts.len(),
        "summarized rows"
    );

    Report {
        from: from.to_string(),
        to: to.to_string(),
        summary: Summary {
            workouts: workouts.len() as u64,
            exercises: exercises.len() as u64,
            sets,
            total_reps,
            total_volume: round2(total_volume),
        },
        by_day: by_day
            .into_iter()
            .map(|(date, volume)| DayVolume {
                date,
                volume: round2(volume),
            })
            .collect(),
        by_exercise: by_exercise.into_sorted(),
    }
}
