//! SQL statement assembly.
//!
//! Every builder returns a [`Statement`] whose placeholders are numbered
//! `$1..$n` in the order of its params. Identifiers are always quoted.
//! Values bound against declared columns of types that text does not coerce
//! into carry an explicit cast, e.g. `$1::uuid`.

use std::fmt;

use serde_json::Value;

use crate::db::Row;
use crate::error::{Result, TableError};
use crate::query::column::param_cast;
use crate::query::{build_typed_where_clause, quote_identifier, Column, FilterArg, Placeholders};

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    fn new(sql: String, params: Vec<Value>) -> Self {
        Self { sql, params }
    }

    fn bare(sql: String) -> Self {
        Self::new(sql, Vec::new())
    }
}

/// Sort direction for paginated reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => f.write_str("ASC"),
            SortOrder::Desc => f.write_str("DESC"),
        }
    }
}

// == Reads ==
pub fn select(
    table: &str,
    columns: &[Column],
    filters: &[FilterArg],
    limit: Option<u64>,
) -> Statement {
    let mut placeholders = Placeholders::new();
    let (where_clause, params) = build_typed_where_clause(filters, columns, &mut placeholders);
    let mut sql = format!("SELECT * FROM {}{}", quote_identifier(table), where_clause);
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    Statement::new(sql, params)
}

/// `order_by` must already be validated as an identifier.
pub fn select_page(
    table: &str,
    columns: &[Column],
    filters: &[FilterArg],
    order_by: &str,
    order: SortOrder,
    limit: u64,
    offset: u64,
) -> Statement {
    let mut placeholders = Placeholders::new();
    let (where_clause, params) = build_typed_where_clause(filters, columns, &mut placeholders);
    let sql = format!(
        "SELECT * FROM {}{} ORDER BY {} {} LIMIT {} OFFSET {}",
        quote_identifier(table),
        where_clause,
        quote_identifier(order_by),
        order,
        limit,
        offset
    );
    Statement::new(sql, params)
}

pub fn count(table: &str, columns: &[Column], filters: &[FilterArg]) -> Statement {
    let mut placeholders = Placeholders::new();
    let (where_clause, params) = build_typed_where_clause(filters, columns, &mut placeholders);
    let sql = format!(
        "SELECT COUNT(*) AS \"total\" FROM {}{}",
        quote_identifier(table),
        where_clause
    );
    Statement::new(sql, params)
}

// == Writes ==
/// Declared columns present in `data`, in declaration order.
fn present_columns<'a>(columns: &'a [Column], data: &Row) -> Vec<&'a str> {
    columns
        .iter()
        .map(|c| c.name.as_str())
        .filter(|name| data.contains_key(*name))
        .collect()
}

fn column_list(names: &[&str]) -> String {
    names
        .iter()
        .map(|n| quote_identifier(n))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn insert(table: &str, columns: &[Column], data: &Row) -> Result<Statement> {
    if data.is_empty() {
        return Err(TableError::EmptyData("insert"));
    }
    let names = present_columns(columns, data);
    if names.is_empty() {
        return Err(TableError::NoValidColumns("insert"));
    }

    let mut placeholders = Placeholders::new();
    let values: Vec<String> = names
        .iter()
        .map(|name| placeholders.next_typed(param_cast(columns, name)))
        .collect();
    let params = names.iter().map(|n| data[*n].clone()).collect();

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
        quote_identifier(table),
        column_list(&names),
        values.join(", ")
    );
    Ok(Statement::new(sql, params))
}

/// Column set comes from the first row; values missing in later rows bind
/// as NULL.
pub fn insert_many(table: &str, columns: &[Column], rows: &[Row]) -> Result<Statement> {
    let first = rows.first().ok_or(TableError::EmptyData("insert_many"))?;
    let names = present_columns(columns, first);
    if names.is_empty() {
        return Err(TableError::NoValidColumns("insert_many"));
    }

    let mut placeholders = Placeholders::new();
    let mut params = Vec::with_capacity(rows.len() * names.len());
    let mut tuples = Vec::with_capacity(rows.len());

    for row in rows {
        let slots: Vec<String> = names
            .iter()
            .map(|name| {
                params.push(row.get(*name).cloned().unwrap_or(Value::Null));
                placeholders.next_typed(param_cast(columns, name))
            })
            .collect();
        tuples.push(format!("({})", slots.join(", ")));
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES {} RETURNING *",
        quote_identifier(table),
        column_list(&names),
        tuples.join(", ")
    );
    Ok(Statement::new(sql, params))
}

pub fn update(
    table: &str,
    columns: &[Column],
    data: &Row,
    filters: &[FilterArg],
) -> Result<Statement> {
    if data.is_empty() {
        return Err(TableError::EmptyData("update"));
    }
    let names = present_columns(columns, data);
    if names.is_empty() {
        return Err(TableError::NoValidColumns("update"));
    }

    let mut placeholders = Placeholders::new();
    let mut params: Vec<Value> = Vec::new();
    let set_parts: Vec<String> = names
        .iter()
        .map(|name| {
            params.push(data[*name].clone());
            let slot = placeholders.next_typed(param_cast(columns, name));
            format!("{} = {}", quote_identifier(name), slot)
        })
        .collect();

    let (where_clause, where_params) = build_typed_where_clause(filters, columns, &mut placeholders);
    params.extend(where_params);

    let sql = format!(
        "UPDATE {} SET {}{} RETURNING *",
        quote_identifier(table),
        set_parts.join(", "),
        where_clause
    );
    Ok(Statement::new(sql, params))
}

pub fn delete(table: &str, columns: &[Column], filters: &[FilterArg]) -> Statement {
    let mut placeholders = Placeholders::new();
    let (where_clause, params) = build_typed_where_clause(filters, columns, &mut placeholders);
    let sql = format!(
        "DELETE FROM {}{} RETURNING *",
        quote_identifier(table),
        where_clause
    );
    Statement::new(sql, params)
}

// == Schema ==
pub fn create_table(table: &str, columns: &[Column]) -> Statement {
    let defs: Vec<String> = columns
        .iter()
        .map(|c| format!("{} {}", quote_identifier(&c.name), c.def))
        .collect();
    Statement::bare(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_identifier(table),
        defs.join(", ")
    ))
}

pub fn add_column(table: &str, column: &Column) -> Statement {
    Statement::bare(format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        quote_identifier(table),
        quote_identifier(&column.name),
        column.def
    ))
}

pub fn drop_column(table: &str, name: &str) -> Statement {
    Statement::bare(format!(
        "ALTER TABLE {} DROP COLUMN {}",
        quote_identifier(table),
        quote_identifier(name)
    ))
}

pub fn drop_table(table: &str) -> Statement {
    Statement::bare(format!("DROP TABLE IF EXISTS {}", quote_identifier(table)))
}

/// Lists the live column names of `table` in the current schema.
pub fn list_columns(table: &str) -> Statement {
    Statement::new(
        "SELECT column_name FROM information_schema.columns \
         WHERE table_name = $1 AND table_schema = current_schema() \
         ORDER BY ordinal_position"
            .to_string(),
        vec![Value::String(table.to_string())],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Condition, DataType, FieldMap};
    use serde_json::json;

    fn users_columns() -> Vec<Column> {
        vec![
            Column::new("id", DataType::serial().primary_key()),
            Column::new("name", DataType::varchar(100).not_null()),
            Column::new("age", DataType::integer()),
        ]
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("row literal must be an object"),
        }
    }

    #[test]
    fn test_select_with_limit() {
        let filters: Vec<FilterArg> = vec![FieldMap::new().eq("id", 1).into()];
        let stmt = select("users", &users_columns(), &filters, Some(1));
        assert_eq!(stmt.sql, "SELECT * FROM \"users\" WHERE \"id\" = $1 LIMIT 1");
        assert_eq!(stmt.params, vec![json!(1)]);

        let all = select("users", &users_columns(), &[], None);
        assert_eq!(all.sql, "SELECT * FROM \"users\"");
        assert!(all.params.is_empty());
    }

    #[test]
    fn test_select_page() {
        let filters = [FilterArg::pair("age", 30)];
        let stmt = select_page("users", &users_columns(), &filters, "name", SortOrder::Asc, 10, 20);
        assert_eq!(
            stmt.sql,
            "SELECT * FROM \"users\" WHERE \"age\" = $1 ORDER BY \"name\" ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(SortOrder::default(), SortOrder::Desc);
    }

    #[test]
    fn test_count() {
        let filters: Vec<FilterArg> =
            vec![FieldMap::new().cond("age", Condition::gte(18)).into()];
        let stmt = count("users", &users_columns(), &filters);
        assert_eq!(
            stmt.sql,
            "SELECT COUNT(*) AS \"total\" FROM \"users\" WHERE \"age\" >= $1"
        );
    }

    #[test]
    fn test_insert_ignores_unknown_columns() {
        let data = row(json!({"name": "Alice", "age": 25, "nickname": "al"}));
        let stmt = insert("users", &users_columns(), &data).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"users\" (\"name\", \"age\") VALUES ($1, $2) RETURNING *"
        );
        assert_eq!(stmt.params, vec![json!("Alice"), json!(25)]);
    }

    #[test]
    fn test_insert_rejects_empty_and_unknown() {
        let err = insert("users", &users_columns(), &Row::new()).unwrap_err();
        assert!(matches!(err, TableError::EmptyData(_)));

        let data = row(json!({"nickname": "al"}));
        let err = insert("users", &users_columns(), &data).unwrap_err();
        assert!(matches!(err, TableError::NoValidColumns(_)));
    }

    #[test]
    fn test_insert_many_binds_missing_as_null() {
        let rows = vec![
            row(json!({"name": "Alice", "age": 25})),
            row(json!({"name": "Bob"})),
        ];
        let stmt = insert_many("users", &users_columns(), &rows).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"users\" (\"name\", \"age\") VALUES ($1, $2), ($3, $4) RETURNING *"
        );
        assert_eq!(
            stmt.params,
            vec![json!("Alice"), json!(25), json!("Bob"), Value::Null]
        );

        let err = insert_many("users", &users_columns(), &[]).unwrap_err();
        assert!(matches!(err, TableError::EmptyData(_)));
    }

    #[test]
    fn test_update_continues_placeholder_numbering() {
        let data = row(json!({"age": 26}));
        let filters: Vec<FilterArg> = vec![FieldMap::new().eq("id", 1).into()];
        let stmt = update("users", &users_columns(), &data, &filters).unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE \"users\" SET \"age\" = $1 WHERE \"id\" = $2 RETURNING *"
        );
        assert_eq!(stmt.params, vec![json!(26), json!(1)]);
    }

    #[test]
    fn test_update_with_raw_filter() {
        let data = row(json!({"name": "Z", "age": 1}));
        let filters = [FilterArg::raw("age > $1", vec![json!(60)])];
        let stmt = update("users", &users_columns(), &data, &filters).unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE \"users\" SET \"name\" = $1, \"age\" = $2 WHERE (age > $3) RETURNING *"
        );
        assert_eq!(stmt.params, vec![json!("Z"), json!(1), json!(60)]);
    }

    #[test]
    fn test_delete() {
        let stmt = delete("users", &users_columns(), &[FilterArg::pair("id", 9)]);
        assert_eq!(stmt.sql, "DELETE FROM \"users\" WHERE \"id\" = $1 RETURNING *");
    }

    #[test]
    fn test_typed_columns_cast_in_every_clause() {
        let columns = vec![
            Column::new("id", DataType::uuid().primary_key()),
            Column::new("seen_at", DataType::timestamptz()),
            Column::new("note", DataType::text()),
        ];
        let id = "0b6f3c9e-6a57-4c1e-9a53-1f4f5f0c7d11";
        let data = row(json!({"id": id, "seen_at": "2024-05-01T10:00:00Z", "note": "hi"}));

        let stmt = insert("events", &columns, &data).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO \"events\" (\"id\", \"seen_at\", \"note\") \
             VALUES ($1::uuid, $2::timestamptz, $3) RETURNING *"
        );

        let many = insert_many("events", &columns, &[data.clone(), data]).unwrap();
        assert!(many.sql.ends_with(
            "VALUES ($1::uuid, $2::timestamptz, $3), ($4::uuid, $5::timestamptz, $6) RETURNING *"
        ));

        let touched = row(json!({"seen_at": "2024-05-02T10:00:00Z"}));
        let stmt = update("events", &columns, &touched, &[FilterArg::pair("id", id)]).unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE \"events\" SET \"seen_at\" = $1::timestamptz WHERE \"id\" = $2::uuid RETURNING *"
        );

        let stmt = select("events", &columns, &[FilterArg::pair("id", id)], Some(1));
        assert_eq!(stmt.sql, "SELECT * FROM \"events\" WHERE \"id\" = $1::uuid LIMIT 1");

        let stmt = delete("events", &columns, &[FilterArg::pair("id", id)]);
        assert_eq!(stmt.sql, "DELETE FROM \"events\" WHERE \"id\" = $1::uuid RETURNING *");
    }

    #[test]
    fn test_schema_statements() {
        let create = create_table("users", &users_columns());
        assert_eq!(
            create.sql,
            "CREATE TABLE IF NOT EXISTS \"users\" (\"id\" serial PRIMARY KEY, \
             \"name\" varchar(100) NOT NULL, \"age\" integer)"
        );

        let add = add_column("users", &Column::new("email", DataType::text().unique()));
        assert_eq!(add.sql, "ALTER TABLE \"users\" ADD COLUMN \"email\" text UNIQUE");

        assert_eq!(
            drop_column("users", "legacy").sql,
            "ALTER TABLE \"users\" DROP COLUMN \"legacy\""
        );
        assert_eq!(drop_table("users").sql, "DROP TABLE IF EXISTS \"users\"");

        let list = list_columns("users");
        assert!(list.sql.contains("table_schema = current_schema()"));
        assert_eq!(list.params, vec![json!("users")]);
    }
}
