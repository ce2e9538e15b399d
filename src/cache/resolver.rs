//! Cache key resolution from filter arguments and rows.

use serde_json::Value;

use crate::cache::CacheConfig;
use crate::db::Row;
use crate::error::CacheError;
use crate::query::FilterArg;

/// Finds the key field's value among `args` and renders it as a cache key.
///
/// Field maps are searched first, in order; pairs only if no map supplies
/// the field. Raw fragments are never inspected. A field bound to an
/// operator condition or to `null` does not count as supplying a value.
pub fn resolve_cache_key(
    config: Option<&CacheConfig>,
    args: &[FilterArg],
) -> Result<String, CacheError> {
    let key_field = key_field(config)?;

    let from_maps = args.iter().find_map(|arg| match arg {
        FilterArg::Fields(map) => map
            .get(key_field)
            .and_then(|v| v.as_value())
            .and_then(canonical_key),
        _ => None,
    });

    from_maps
        .or_else(|| {
            args.iter().find_map(|arg| match arg {
                FilterArg::Pair(field, value) if field == key_field => canonical_key(value),
                _ => None,
            })
        })
        .ok_or_else(|| CacheError::KeyNotFound(key_field.to_string()))
}

/// Cache key of a result row.
pub fn key_from_row(config: Option<&CacheConfig>, row: &Row) -> Result<String, CacheError> {
    let key_field = key_field(config)?;
    row.get(key_field)
        .and_then(canonical_key)
        .ok_or_else(|| CacheError::KeyNotFound(key_field.to_string()))
}

/// Textual form of a key value: strings as-is, numbers and booleans as
/// printed, composites as JSON. `null` has no key.
pub fn canonical_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

fn key_field(config: Option<&CacheConfig>) -> Result<&str, CacheError> {
    let config = config
        .filter(|c| c.enabled)
        .ok_or(CacheError::CacheDisabled)?;
    if config.key_field.is_empty() {
        return Err(CacheError::KeyFieldUndefined);
    }
    Ok(&config.key_field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Condition, FieldMap};
    use serde_json::json;
    use std::time::Duration;

    fn config() -> CacheConfig {
        CacheConfig::new("id", Duration::from_secs(5))
    }

    #[test]
    fn test_resolves_from_map() {
        let args: Vec<FilterArg> = vec![FieldMap::new().eq("id", 1).eq("name", "x").into()];
        assert_eq!(resolve_cache_key(Some(&config()), &args).unwrap(), "1");
    }

    #[test]
    fn test_resolves_from_pairs() {
        let args = [FilterArg::pair("name", "x"), FilterArg::pair("id", "abc")];
        assert_eq!(resolve_cache_key(Some(&config()), &args).unwrap(), "abc");
    }

    #[test]
    fn test_maps_win_over_earlier_pairs() {
        let args: Vec<FilterArg> = vec![
            FilterArg::pair("id", 1),
            FieldMap::new().eq("id", 2).into(),
        ];
        assert_eq!(resolve_cache_key(Some(&config()), &args).unwrap(), "2");
    }

    #[test]
    fn test_first_map_wins() {
        let args: Vec<FilterArg> = vec![
            FieldMap::new().eq("name", "x").into(),
            FieldMap::new().eq("id", 7).into(),
            FieldMap::new().eq("id", 8).into(),
        ];
        assert_eq!(resolve_cache_key(Some(&config()), &args).unwrap(), "7");
    }

    #[test]
    fn test_conditions_raw_and_null_do_not_resolve() {
        let args: Vec<FilterArg> = vec![
            FieldMap::new().cond("id", Condition::gt(1)).into(),
            FilterArg::raw("id = $1", vec![json!(3)]),
            FilterArg::pair("id", Value::Null),
        ];
        assert!(matches!(
            resolve_cache_key(Some(&config()), &args),
            Err(CacheError::KeyNotFound(field)) if field == "id"
        ));
    }

    #[test]
    fn test_disabled_and_undefined() {
        let args = [FilterArg::pair("id", 1)];
        assert!(matches!(
            resolve_cache_key(None, &args),
            Err(CacheError::CacheDisabled)
        ));
        assert!(matches!(
            resolve_cache_key(Some(&CacheConfig::disabled()), &args),
            Err(CacheError::CacheDisabled)
        ));
        let no_field = CacheConfig::new("", Duration::from_secs(1));
        assert!(matches!(
            resolve_cache_key(Some(&no_field), &args),
            Err(CacheError::KeyFieldUndefined)
        ));
    }

    #[test]
    fn test_key_from_row() {
        let mut row = Row::new();
        row.insert("id".into(), json!(42));
        assert_eq!(key_from_row(Some(&config()), &row).unwrap(), "42");

        row.insert("id".into(), Value::Null);
        assert!(key_from_row(Some(&config()), &row).is_err());
    }

    #[test]
    fn test_canonical_key_forms() {
        assert_eq!(canonical_key(&json!("a b")).as_deref(), Some("a b"));
        assert_eq!(canonical_key(&json!(1.5)).as_deref(), Some("1.5"));
        assert_eq!(canonical_key(&json!(false)).as_deref(), Some("false"));
        assert_eq!(canonical_key(&json!([1, 2])).as_deref(), Some("[1,2]"));
        assert_eq!(canonical_key(&Value::Null), None);
    }
}
