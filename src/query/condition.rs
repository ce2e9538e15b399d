//! Typed comparison operators rendered as parameterized SQL fragments.

use serde_json::Value;

use crate::query::Placeholders;

// == Condition ==
/// A comparison applied to one column inside a WHERE clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    Neq(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    /// Set membership; an empty set matches nothing
    In(Vec<Value>),
    /// Inclusive range with both bounds present
    Between(Value, Value),
    /// Case-insensitive pattern match
    Like(String),
    IsNull,
    IsNotNull,
    /// No constraint at all, produced by a range without bounds
    Unbounded,
}

impl Condition {
    pub fn eq(value: impl Into<Value>) -> Self {
        Condition::Eq(value.into())
    }

    pub fn neq(value: impl Into<Value>) -> Self {
        Condition::Neq(value.into())
    }

    pub fn gt(value: impl Into<Value>) -> Self {
        Condition::Gt(value.into())
    }

    pub fn gte(value: impl Into<Value>) -> Self {
        Condition::Gte(value.into())
    }

    pub fn lt(value: impl Into<Value>) -> Self {
        Condition::Lt(value.into())
    }

    pub fn lte(value: impl Into<Value>) -> Self {
        Condition::Lte(value.into())
    }

    pub fn is_in<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Condition::In(values.into_iter().map(Into::into).collect())
    }

    /// Inclusive range. A missing lower bound degrades to `lte(to)`, a missing
    /// upper bound to `gte(from)`, and no bounds at all to no constraint.
    pub fn between<F, T>(from: Option<F>, to: Option<T>) -> Self
    where
        F: Into<Value>,
        T: Into<Value>,
    {
        match (from.map(Into::into), to.map(Into::into)) {
            (Some(from), Some(to)) => Condition::Between(from, to),
            (None, Some(to)) => Condition::Lte(to),
            (Some(from), None) => Condition::Gte(from),
            (None, None) => Condition::Unbounded,
        }
    }

    pub fn like(pattern: impl Into<String>) -> Self {
        Condition::Like(pattern.into())
    }

    pub fn is_null() -> Self {
        Condition::IsNull
    }

    pub fn is_not_null() -> Self {
        Condition::IsNotNull
    }

    // == To SQL ==
    /// Renders the fragment for an already quoted column, consuming one
    /// placeholder per bound value.
    pub fn to_sql(&self, column: &str, placeholders: &mut Placeholders) -> (String, Vec<Value>) {
        self.to_typed_sql(column, None, placeholders)
    }

    /// Like [`Condition::to_sql`], casting each placeholder to `cast`.
    /// `ILIKE` patterns stay text.
    pub fn to_typed_sql(
        &self,
        column: &str,
        cast: Option<&str>,
        placeholders: &mut Placeholders,
    ) -> (String, Vec<Value>) {
        match self {
            Condition::Eq(v) => compare(column, "=", v, cast, placeholders),
            Condition::Neq(v) => compare(column, "!=", v, cast, placeholders),
            Condition::Gt(v) => compare(column, ">", v, cast, placeholders),
            Condition::Gte(v) => compare(column, ">=", v, cast, placeholders),
            Condition::Lt(v) => compare(column, "<", v, cast, placeholders),
            Condition::Lte(v) => compare(column, "<=", v, cast, placeholders),
            Condition::In(values) if values.is_empty() => ("1=0".to_string(), Vec::new()),
            Condition::In(values) => {
                let list: Vec<String> = values
                    .iter()
                    .map(|_| placeholders.next_typed(cast))
                    .collect();
                (format!("{} IN ({})", column, list.join(", ")), values.clone())
            }
            Condition::Between(from, to) => {
                let low = placeholders.next_typed(cast);
                let high = placeholders.next_typed(cast);
                (
                    format!("{} BETWEEN {} AND {}", column, low, high),
                    vec![from.clone(), to.clone()],
                )
            }
            Condition::Like(pattern) => {
                let p = placeholders.next_placeholder();
                (
                    format!("{} ILIKE {}", column, p),
                    vec![Value::String(pattern.clone())],
                )
            }
            Condition::IsNull => (format!("{} IS NULL", column), Vec::new()),
            Condition::IsNotNull => (format!("{} IS NOT NULL", column), Vec::new()),
            Condition::Unbounded => ("1=1".to_string(), Vec::new()),
        }
    }
}

fn compare(
    column: &str,
    op: &str,
    value: &Value,
    cast: Option<&str>,
    placeholders: &mut Placeholders,
) -> (String, Vec<Value>) {
    let p = placeholders.next_typed(cast);
    (format!("{} {} {}", column, op, p), vec![value.clone()])
}
