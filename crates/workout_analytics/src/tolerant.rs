//! Tolerant narrowing of loosely-typed input values.
//!
//! Every conversion here is total: bad input degrades to a documented default
//! instead of failing. The result keeps track of which path was taken so the
//! caller can count defaults without changing the default policy.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultReason {
    /// The value was absent or null.
    Missing,
    /// The value was present but could not be read as the target type.
    Malformed,
    /// The value parsed but falls outside the accepted domain (negative, non-finite).
    OutOfRange,
}

impl DefaultReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DefaultReason::Missing => "missing",
            DefaultReason::Malformed => "malformed",
            DefaultReason::OutOfRange => "out_of_range",
        }
    }
}

/// Outcome of a tolerant conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum Tolerant<T> {
    Parsed(T),
    Defaulted { value: T, reason: DefaultReason },
}

impl<T> Tolerant<T> {
    pub fn value(self) -> T {
        match self {
            Tolerant::Parsed(v) => v,
            Tolerant::Defaulted { value, .. } => value,
        }
    }

    pub fn default_reason(&self) -> Option<DefaultReason> {
        match self {
            Tolerant::Parsed(_) => None,
            Tolerant::Defaulted { reason, .. } => Some(*reason),
        }
    }

    pub fn is_defaulted(&self) -> bool {
        self.default_reason().is_some()
    }

    /// Record the default (if any) against `field` and unwrap the value.
    pub fn observe(self, field: &'static str) -> T {
        if let Some(reason) = self.default_reason() {
            record_default(field, reason);
        }
        self.value()
    }
}

pub fn record_default(field: &'static str, reason: DefaultReason) {
    tracing::trace!(field, reason = reason.as_str(), "defaulted value");
    metrics::counter!(
        "workout_analytics_defaults_total",
        "field" => field,
        "reason" => reason.as_str()
    )
    .increment(1);
}

/// Read a weight in kilograms. Numbers and numeric text are accepted;
/// anything else, including negative or non-finite values, becomes `0.0`.
pub fn parse_weight(value: Option<&Value>) -> Tolerant<f64> {
    let defaulted = |reason| Tolerant::Defaulted { value: 0.0, reason };
    let parsed = match value {
        None | Some(Value::Null) => return defaulted(DefaultReason::Missing),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => {
            return defaulted(DefaultReason::Missing);
        }
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match parsed {
        None => defaulted(DefaultReason::Malformed),
        Some(w) if !w.is_finite() || w < 0.0 => defaulted(DefaultReason::OutOfRange),
        Some(w) => Tolerant::Parsed(w),
    }
}

/// Read a repetition count. Integers, integral floats and integer text are
/// accepted; anything else becomes `0`.
pub fn parse_reps(value: Option<&Value>) -> Tolerant<i64> {
    let defaulted = |reason| Tolerant::Defaulted { value: 0, reason };
    let parsed = match value {
        None | Some(Value::Null) => return defaulted(DefaultReason::Missing),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    match parsed {
        None => defaulted(DefaultReason::Malformed),
        Some(r) if r < 0 => defaulted(DefaultReason::OutOfRange),
        Some(r) => Tolerant::Parsed(r),
    }
}

/// Narrow a value to an array, defaulting to an empty one.
pub fn as_sequence(value: Option<&Value>) -> Tolerant<Vec<Value>> {
    match value {
        None | Some(Value::Null) => Tolerant::Defaulted {
            value: Vec::new(),
            reason: DefaultReason::Missing,
        },
        Some(Value::Array(items)) => Tolerant::Parsed(items.clone()),
        Some(_) => Tolerant::Defaulted {
            value: Vec::new(),
            reason: DefaultReason::Malformed,
        },
    }
}

/// Narrow a value to a non-empty string. Empty strings count as missing.
pub fn as_text(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    }
}
