//! Payload checksum
//!
//! A 32-bit rolling hash (`h = h * 31 + unit`, wrapping) over the UTF-16
//! code units of a canonical JSON rendering, printed as 8 hex digits.
//! Object keys are emitted in sorted order so the digest does not depend
//! on field order.

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, Budget, Category};

/// Render `value` as compact JSON with object keys sorted at every level
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Rolling hash of a string
pub fn hash_str(text: &str) -> String {
    let hash = text
        .encode_utf16()
        .fold(0u32, |h, unit| h.wrapping_mul(31).wrapping_add(u32::from(unit)));
    format!("{:08x}", hash)
}

/// Checksum of an arbitrary JSON value
pub fn checksum_value(value: &Value) -> String {
    hash_str(&canonical_json(value))
}

/// Checksum of the three collections of a backup, keyed
/// `accounts`/`categories`/`budgets`
pub fn checksum_collections(
    accounts: &[Account],
    categories: &[Category],
    budgets: &[Budget],
) -> LedgerResult<String> {
    let value = json!({
        "accounts": to_value(accounts)?,
        "categories": to_value(categories)?,
        "budgets": to_value(budgets)?,
    });
    Ok(checksum_value(&value))
}

/// Checksum over the collections of a raw, untyped payload.
///
/// Missing collections count as empty, matching how typed decoding treats
/// them.
pub fn checksum_raw_payload(payload: &Value) -> String {
    let collection = |key: &str| payload.get(key).cloned().unwrap_or_else(|| json!([]));
    let value = json!({
        "accounts": collection("accounts"),
        "categories": collection("categories"),
        "budgets": collection("budgets"),
    });
    checksum_value(&value)
}

fn to_value<T: Serialize>(rows: &[T]) -> LedgerResult<Value> {
    serde_json::to_value(rows)
        .map_err(|e| LedgerError::Export(format!("Failed to serialize records: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryKind, NewCategory};
    use chrono::Utc;

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(hash_str(""), "00000000");
        // "a" = 97
        assert_eq!(hash_str("a"), "00000061");
        // 97 * 31 + 98
        assert_eq!(hash_str("ab"), format!("{:08x}", 97 * 31 + 98));
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let a: Value = serde_json::from_str(r#"{"b":1,"a":{"y":2,"x":[1,2]}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a":{"x":[1,2],"y":2},"b":1}"#).unwrap();
        assert_eq!(checksum_value(&a), checksum_value(&b));
        assert_eq!(canonical_json(&a), r#"{"a":{"x":[1,2],"y":2},"b":1}"#);
    }

    #[test]
    fn test_array_order_matters() {
        let a = json!([1, 2]);
        let b = json!([2, 1]);
        assert_ne!(checksum_value(&a), checksum_value(&b));
    }

    #[test]
    fn test_single_character_change_detected() {
        let base = r#"{"description":"coffee beans"}"#;
        let original = hash_str(base);
        for (i, _) in base.char_indices() {
            let mut changed: Vec<char> = base.chars().collect();
            changed[i] = if changed[i] == 'x' { 'y' } else { 'x' };
            let changed: String = changed.into_iter().collect();
            assert_ne!(hash_str(&changed), original, "change at {} undetected", i);
        }
    }

    #[test]
    fn test_typed_and_raw_checksums_agree() {
        let category = Category::from_new(
            1,
            NewCategory::new("Food", EntryKind::Expense, "$"),
            Utc::now(),
        );
        let typed = checksum_collections(&[], std::slice::from_ref(&category), &[]).unwrap();

        let text = serde_json::to_string(&json!({
            "metadata": {},
            "categories": [category],
        }))
        .unwrap();
        let raw: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(checksum_raw_payload(&raw), typed);
    }
}
