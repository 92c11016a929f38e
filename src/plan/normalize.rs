use serde_json::{Number, Value};

use crate::plan::plan_model::{
    FillPlanEntry, FillValue, OptionMatch, OptionMatchMode, TargetKey, UNKNOWN_TARGET,
};

/// Validate one untyped plan entry and coerce it into a typed record.
/// Returns `None` when the entry must be dropped.
pub fn normalize_entry(entry: &Value) -> Option<FillPlanEntry> {
    let obj = entry.as_object()?;

    let el_key = obj.get("elKey")?.as_str().filter(|k| !k.is_empty())?;

    let target_key = obj.get("targetKey")?.as_str()?;
    if target_key != UNKNOWN_TARGET && target_key.trim().is_empty() {
        return None;
    }

    Some(FillPlanEntry {
        el_key: el_key.to_string(),
        target_key: TargetKey::from(target_key.to_string()),
        value: normalize_value(obj.get("value")),
        option_match: normalize_option_match(obj.get("optionMatch")),
        confidence: clamp_confidence(obj.get("confidence")),
        reason: obj.get("reason").and_then(Value::as_str).map(str::to_string),
    })
}

/// Arrays keep their shape with each item stringified; a missing or null
/// value becomes the empty string; anything else is stringified.
pub fn normalize_value(value: Option<&Value>) -> FillValue {
    match value {
        Some(Value::Array(items)) => FillValue::List(items.iter().map(js_string).collect()),
        None | Some(Value::Null) => FillValue::Single(String::new()),
        Some(other) => FillValue::Single(js_string(other)),
    }
}

/// Coerce to a number and clamp into [0, 1]. Non-numeric input yields 0.
pub fn clamp_confidence(value: Option<&Value>) -> f64 {
    let n = value.map(js_number).unwrap_or(f64::NAN);
    if n.is_nan() {
        return 0.0;
    }
    n.clamp(0.0, 1.0)
}

/// An option match survives only with a recognized mode. `index` is kept
/// for index mode when it is an integer (a fractional position can never
/// address a choice); `expectText` whenever given.
pub fn normalize_option_match(value: Option<&Value>) -> Option<OptionMatch> {
    let obj = value?.as_object()?;

    let mode = match obj.get("mode")?.as_str()? {
        "exact" => OptionMatchMode::Exact,
        "contains" => OptionMatchMode::Contains,
        "index" => OptionMatchMode::Index,
        _ => return None,
    };

    let index = match mode {
        OptionMatchMode::Index => obj
            .get("index")
            .and_then(Value::as_f64)
            .filter(|i| i.is_finite() && i.fract() == 0.0)
            .map(|i| i as i64),
        _ => None,
    };

    let expect_text = match obj.get("expectText") {
        None | Some(Value::Null) => None,
        Some(text) => Some(js_string(text)),
    };

    Some(OptionMatch {
        mode,
        index,
        expect_text,
    })
}

// ============================================================================
// Loose coercions, matching how a JSON consumer in the browser stringifies
// and converts values
// ============================================================================

pub fn js_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_string(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn number_string(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

pub fn js_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_numeric(s),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Null => 0.0,
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [single] => parse_numeric(&js_string(single)),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

fn parse_numeric(text: &str) -> f64 {
    let t = text.trim();
    if let Some(n) = parse_radix_literal(t) {
        return n;
    }
    match t {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if t
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) =>
        {
            t.parse::<f64>().unwrap_or(f64::NAN)
        }
        _ => f64::NAN,
    }
}

/// `0x1A`, `0o17`, `0b101`. A sign in front of the prefix is not a
/// number, and neither is a bare prefix.
fn parse_radix_literal(t: &str) -> Option<f64> {
    let prefix = t.get(..2)?.to_ascii_lowercase();
    let radix = match prefix.as_str() {
        "0x" => 16,
        "0o" => 8,
        "0b" => 2,
        _ => return None,
    };
    let digits = &t[2..];
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Some(f64::NAN);
    }
    Some(
        digits
            .chars()
            .filter_map(|c| c.to_digit(radix))
            .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d)),
    )
}
