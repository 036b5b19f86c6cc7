//! Field access on untyped result rows.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{DataAccessError, Row};

/// Deserialize a row into a typed record.
pub fn decode<T: DeserializeOwned>(row: Row) -> Result<T, DataAccessError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| DataAccessError::Shape(e.to_string()))
}

/// Integer value of `key`, accepting numeric strings as MySQL sometimes
/// returns them for computed columns.
pub fn int_field(row: &Row, key: &str) -> Option<i64> {
    match row.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

pub fn text_field(row: &Row, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// First non-null value among `keys`, treating zero and empty strings as
/// missing the way loosely cased legacy columns require.
fn first_present<'a>(row: &'a Row, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| row.get(*k))
        .find(|v| !is_blank(v))
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Bool(b) => !b,
        _ => false,
    }
}

/// Maps a `sp_list_foods` row onto the lowercase shape that
/// `sp_list_foods_with_allergens` returns.
pub fn normalize_food(row: &Row) -> Row {
    const FIELDS: [(&str, &str); 6] = [
        ("foodid", "foodID"),
        ("name", "Name"),
        ("calories", "Calories"),
        ("proteins", "Proteins"),
        ("carbs", "Carbs"),
        ("fats", "Fats"),
    ];

    FIELDS
        .iter()
        .map(|&(lower, legacy)| {
            let value = first_present(row, &[lower, legacy])
                .cloned()
                .unwrap_or(Value::Null);
            (lower.to_string(), value)
        })
        .collect()
}
