//! Filter arguments accepted by table reads and writes.
//!
//! Callers describe row filters either as a map of fields, as flat
//! field/value pairs, or as a raw SQL fragment. All three render into one
//! AND-joined WHERE clause sharing a single placeholder counter.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::db::Row;
use crate::query::column::param_cast;
use crate::query::params::renumber_placeholders;
use crate::query::{quote_identifier, Column, Condition, Placeholders};

// == Filter Value ==
/// Right-hand side of a field filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Plain equality
    Value(Value),
    Condition(Condition),
}

impl FilterValue {
    /// The equality value, if this is not an operator condition.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FilterValue::Value(value) => Some(value),
            FilterValue::Condition(_) => None,
        }
    }
}

impl From<Condition> for FilterValue {
    fn from(condition: Condition) -> Self {
        FilterValue::Condition(condition)
    }
}

impl From<Value> for FilterValue {
    fn from(value: Value) -> Self {
        FilterValue::Value(value)
    }
}

// == Field Map ==
/// Field name to filter value, rendered in field-name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap(BTreeMap<String, FilterValue>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality filter.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0
            .insert(field.into(), FilterValue::Value(value.into()));
        self
    }

    /// Adds an operator filter.
    pub fn cond(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.0
            .insert(field.into(), FilterValue::Condition(condition));
        self
    }

    pub fn get(&self, field: &str) -> Option<&FilterValue> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterValue)> {
        self.0.iter()
    }
}

impl From<&Row> for FieldMap {
    fn from(row: &Row) -> Self {
        Self(
            row.iter()
                .map(|(k, v)| (k.clone(), FilterValue::Value(v.clone())))
                .collect(),
        )
    }
}

// == Filter Argument ==
/// One filter argument; a call takes a slice of these.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterArg {
    /// Several fields at once
    Fields(FieldMap),
    /// A single `field = value` pair
    Pair(String, Value),
    /// Trusted SQL fragment numbered `$1..$k` against its own params
    Raw { sql: String, params: Vec<Value> },
}

impl FilterArg {
    pub fn fields(map: FieldMap) -> Self {
        FilterArg::Fields(map)
    }

    pub fn pair(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterArg::Pair(field.into(), value.into())
    }

    pub fn raw(sql: impl Into<String>, params: Vec<Value>) -> Self {
        FilterArg::Raw {
            sql: sql.into(),
            params,
        }
    }
}

impl From<FieldMap> for FilterArg {
    fn from(map: FieldMap) -> Self {
        FilterArg::Fields(map)
    }
}

/// Expands flat `field, value, field, value, ...` arguments into pairs.
///
/// A trailing field without a value is ignored, as are entries in field
/// position that are not strings.
pub fn pairs_from_flat(flat: &[Value]) -> Vec<FilterArg> {
    flat.chunks_exact(2)
        .filter_map(|chunk| match &chunk[0] {
            Value::String(field) => Some(FilterArg::Pair(field.clone(), chunk[1].clone())),
            _ => None,
        })
        .collect()
}

// == Where Clause ==
/// Builds ` WHERE a AND b ...` plus its params, or an empty string when there
/// is nothing to filter on.
pub fn build_where_clause(args: &[FilterArg], placeholders: &mut Placeholders) -> (String, Vec<Value>) {
    build_typed_where_clause(args, &[], placeholders)
}

/// Like [`build_where_clause`]; field and pair values on declared `columns`
/// get the column's parameter cast.
pub fn build_typed_where_clause(
    args: &[FilterArg],
    columns: &[Column],
    placeholders: &mut Placeholders,
) -> (String, Vec<Value>) {
    let mut fragments = Vec::new();
    let mut params = Vec::new();

    for arg in args {
        match arg {
            FilterArg::Fields(map) => {
                for (field, value) in map.iter() {
                    let column = quote_identifier(field);
                    let cast = param_cast(columns, field);
                    let (sql, values) = match value {
                        FilterValue::Value(v) => {
                            Condition::Eq(v.clone()).to_typed_sql(&column, cast, placeholders)
                        }
                        FilterValue::Condition(c) => c.to_typed_sql(&column, cast, placeholders),
                    };
                    fragments.push(sql);
                    params.extend(values);
                }
            }
            FilterArg::Pair(field, value) => {
                let (sql, values) = Condition::Eq(value.clone()).to_typed_sql(
                    &quote_identifier(field),
                    param_cast(columns, field),
                    placeholders,
                );
                fragments.push(sql);
                params.extend(values);
            }
            FilterArg::Raw { sql, params: raw } => {
                if sql.trim().is_empty() {
                    continue;
                }
                let offset = placeholders.peek() - 1;
                fragments.push(format!("({})", renumber_placeholders(sql, offset)));
                placeholders.advance(raw.len());
                params.extend(raw.iter().cloned());
            }
        }
    }

    if fragments.is_empty() {
        return (String::new(), params);
    }
    (format!(" WHERE {}", fragments.join(" AND ")), params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::DataType;
    use serde_json::json;

    #[test]
    fn test_no_filters_no_where() {
        let mut p = Placeholders::new();
        let (sql, params) = build_where_clause(&[], &mut p);
        assert_eq!(sql, "");
        assert!(params.is_empty());
    }

    #[test]
    fn test_field_map_is_quoted_and_parameterized() {
        let mut p = Placeholders::new();
        let filters: Vec<FilterArg> = vec![FieldMap::new()
            .eq("name", "John")
            .eq("email", "john@example.com")
            .into()];
        let (sql, params) = build_where_clause(&filters, &mut p);
        assert_eq!(sql, " WHERE \"email\" = $1 AND \"name\" = $2");
        assert_eq!(params, vec![json!("john@example.com"), json!("John")]);
    }

    #[test]
    fn test_conditions_and_pairs_share_counter() {
        let mut p = Placeholders::starting_at(2);
        let filters: [FilterArg; 2] = [
            FieldMap::new().cond("age", Condition::between(Some(20), Some(30))).into(),
            FilterArg::pair("id", 7),
        ];
        let (sql, params) = build_where_clause(&filters, &mut p);
        assert_eq!(sql, " WHERE \"age\" BETWEEN $2 AND $3 AND \"id\" = $4");
        assert_eq!(params, vec![json!(20), json!(30), json!(7)]);
        assert_eq!(p.peek(), 5);
    }

    #[test]
    fn test_raw_fragment_is_renumbered() {
        let mut p = Placeholders::new();
        let filters = [
            FilterArg::pair("active", true),
            FilterArg::raw("age > $1 OR age < $2", vec![json!(60), json!(18)]),
            FilterArg::pair("id", 3),
        ];
        let (sql, params) = build_where_clause(&filters, &mut p);
        assert_eq!(
            sql,
            " WHERE \"active\" = $1 AND (age > $2 OR age < $3) AND \"id\" = $4"
        );
        assert_eq!(params, vec![json!(true), json!(60), json!(18), json!(3)]);
    }

    #[test]
    fn test_declared_columns_cast_their_placeholders() {
        let columns = vec![
            Column::new("id", DataType::uuid()),
            Column::new("seen", DataType::timestamptz()),
            Column::new("name", DataType::text()),
        ];
        let mut p = Placeholders::new();
        let filters: [FilterArg; 3] = [
            FieldMap::new()
                .eq("name", "Al")
                .cond("seen", Condition::gte("2024-05-01T00:00:00Z"))
                .into(),
            FilterArg::pair("id", "0b6f3c9e-6a57-4c1e-9a53-1f4f5f0c7d11"),
            FilterArg::raw("note = $1", vec![json!("x")]),
        ];
        let (sql, params) = build_typed_where_clause(&filters, &columns, &mut p);
        assert_eq!(
            sql,
            " WHERE \"name\" = $1 AND \"seen\" >= $2::timestamptz AND \"id\" = $3::uuid AND (note = $4)"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_empty_in_inside_where() {
        let mut p = Placeholders::new();
        let empty: Vec<i64> = Vec::new();
        let filters: Vec<FilterArg> = vec![FieldMap::new().cond("id", Condition::is_in(empty)).into()];
        let (sql, params) = build_where_clause(&filters, &mut p);
        assert_eq!(sql, " WHERE 1=0");
        assert!(params.is_empty());
    }

    #[test]
    fn test_pairs_from_flat() {
        let pairs = pairs_from_flat(&[json!("id"), json!(5), json!("name"), json!("Al"), json!("dangling")]);
        assert_eq!(
            pairs,
            vec![FilterArg::pair("id", 5), FilterArg::pair("name", "Al")]
        );

        let skipped = pairs_from_flat(&[json!(1), json!(2)]);
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_field_map_from_row() {
        let mut row = Row::new();
        row.insert("id".to_string(), json!(1));
        let map = FieldMap::from(&row);
        assert_eq!(map.get("id"), Some(&FilterValue::Value(json!(1))));
        assert_eq!(map.len(), 1);
    }
}
