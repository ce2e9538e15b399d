//! Column definitions and the fluent column type builder.

use std::fmt;

use serde_json::Value;

/// Types whose string defaults are literals and get single-quoted.
const QUOTED_DEFAULT_TYPES: &[&str] = &[
    "text",
    "varchar",
    "char",
    "json",
    "jsonb",
    "uuid",
    "date",
    "time",
    "timestamp",
    "timestamptz",
    "interval",
    "inet",
    "cidr",
    "macaddr",
];

/// Types Postgres will not assign from a text-typed parameter without an
/// explicit cast.
const CAST_PARAM_TYPES: &[&str] = &[
    "uuid",
    "date",
    "time",
    "timetz",
    "timestamp",
    "timestamptz",
    "interval",
    "inet",
    "cidr",
    "macaddr",
    "money",
    "numeric",
    "decimal",
];

// == Column Definition ==
/// Data type plus constraints of one column.
///
/// Built through [`DataType`] and refined with the chaining methods:
///
/// ```
/// use pgcrud::query::DataType;
///
/// let email = DataType::text().unique().not_null();
/// assert_eq!(email.to_string(), "text NOT NULL UNIQUE");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnDef {
    type_name: String,
    length: Option<u32>,
    precision: Option<u32>,
    scale: Option<u32>,
    not_null: bool,
    unique: bool,
    primary_key: bool,
    default: Option<String>,
    check: Option<String>,
}

impl ColumnDef {
    /// Column of an arbitrary type name.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    fn with_length(type_name: &str, length: u32) -> Self {
        Self {
            length: Some(length),
            ..Self::new(type_name)
        }
    }

    fn with_precision(type_name: &str, precision: u32, scale: u32) -> Self {
        Self {
            precision: Some(precision),
            scale: Some(scale),
            ..Self::new(type_name)
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Sets the DEFAULT expression.
    ///
    /// String values on textual and temporal types are quoted as literals
    /// unless they are `NULL`, `CURRENT_TIMESTAMP`, already quoted, or look
    /// like a function call. Other values use their JSON text.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        let rendered = match value.into() {
            Value::String(s) => {
                let upper = s.to_ascii_uppercase();
                let is_expression = s.starts_with('\'')
                    || upper == "NULL"
                    || upper == "CURRENT_TIMESTAMP"
                    || s.contains('(');
                if self.is_quoted_type() && !is_expression {
                    format!("'{}'", s.replace('\'', "''"))
                } else {
                    s
                }
            }
            other => other.to_string(),
        };
        self.default = Some(rendered);
        self
    }

    /// Adds a CHECK constraint expression.
    pub fn check(mut self, constraint: impl Into<String>) -> Self {
        self.check = Some(constraint.into());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Cast to apply to a parameter bound against this column, if any.
    ///
    /// Length, precision and scale are left off; the column applies them on
    /// assignment.
    pub fn param_cast(&self) -> Option<&str> {
        let name = self.type_name.as_str();
        CAST_PARAM_TYPES.contains(&name).then_some(name)
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    fn is_quoted_type(&self) -> bool {
        QUOTED_DEFAULT_TYPES.contains(&self.type_name.as_str())
    }
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let type_name = if self.type_name.is_empty() {
            "text"
        } else {
            self.type_name.as_str()
        };

        match (self.length, self.precision, self.scale) {
            (Some(length), _, _) => write!(f, "{}({})", type_name, length)?,
            (None, Some(p), Some(s)) => write!(f, "{}({},{})", type_name, p, s)?,
            (None, Some(p), None) => write!(f, "{}({})", type_name, p)?,
            _ => f.write_str(type_name)?,
        }

        if self.not_null {
            f.write_str(" NOT NULL")?;
        }
        if self.unique {
            f.write_str(" UNIQUE")?;
        }
        if self.primary_key {
            f.write_str(" PRIMARY KEY")?;
        }
        if let Some(default) = &self.default {
            write!(f, " DEFAULT {}", default)?;
        }
        if let Some(check) = &self.check {
            write!(f, " CHECK ({})", check)?;
        }
        Ok(())
    }
}

// == Column ==
/// A named column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub def: ColumnDef,
}

impl Column {
    pub fn new(name: impl Into<String>, def: ColumnDef) -> Self {
        Self {
            name: name.into(),
            def,
        }
    }
}

/// Parameter cast of the declared column `name`, if it is declared and
/// needs one.
pub fn param_cast<'a>(columns: &'a [Column], name: &str) -> Option<&'a str> {
    columns
        .iter()
        .find(|c| c.name == name)
        .and_then(|c| c.def.param_cast())
}

// == Data Type Factory ==
/// Factory for the PostgreSQL column types.
pub struct DataType;

impl DataType {
    pub fn varchar(length: u32) -> ColumnDef {
        ColumnDef::with_length("varchar", length)
    }

    pub fn char(length: u32) -> ColumnDef {
        ColumnDef::with_length("char", length)
    }

    pub fn text() -> ColumnDef {
        ColumnDef::new("text")
    }

    pub fn smallint() -> ColumnDef {
        ColumnDef::new("smallint")
    }

    pub fn integer() -> ColumnDef {
        ColumnDef::new("integer")
    }

    pub fn bigint() -> ColumnDef {
        ColumnDef::new("bigint")
    }

    /// Auto-incrementing integer.
    pub fn serial() -> ColumnDef {
        ColumnDef::new("serial")
    }

    pub fn bigserial() -> ColumnDef {
        ColumnDef::new("bigserial")
    }

    pub fn decimal(precision: u32, scale: u32) -> ColumnDef {
        ColumnDef::with_precision("decimal", precision, scale)
    }

    pub fn numeric(precision: u32, scale: u32) -> ColumnDef {
        ColumnDef::with_precision("numeric", precision, scale)
    }

    pub fn real() -> ColumnDef {
        ColumnDef::new("real")
    }

    pub fn double_precision() -> ColumnDef {
        ColumnDef::new("double precision")
    }

    pub fn money() -> ColumnDef {
        ColumnDef::new("money")
    }

    pub fn boolean() -> ColumnDef {
        ColumnDef::new("boolean")
    }

    pub fn timestamp() -> ColumnDef {
        ColumnDef::new("timestamp")
    }

    pub fn timestamptz() -> ColumnDef {
        ColumnDef::new("timestamptz")
    }

    pub fn date() -> ColumnDef {
        ColumnDef::new("date")
    }

    pub fn time() -> ColumnDef {
        ColumnDef::new("time")
    }

    pub fn timetz() -> ColumnDef {
        ColumnDef::new("timetz")
    }

    pub fn interval() -> ColumnDef {
        ColumnDef::new("interval")
    }

    pub fn json() -> ColumnDef {
        ColumnDef::new("json")
    }

    pub fn jsonb() -> ColumnDef {
        ColumnDef::new("jsonb")
    }

    pub fn uuid() -> ColumnDef {
        ColumnDef::new("uuid")
    }

    pub fn bytea() -> ColumnDef {
        ColumnDef::new("bytea")
    }

    /// Array of `base_type`, e.g. `array("text")` for `text[]`.
    pub fn array(base_type: &str) -> ColumnDef {
        ColumnDef::new(format!("{}[]", base_type))
    }

    pub fn inet() -> ColumnDef {
        ColumnDef::new("inet")
    }

    pub fn cidr() -> ColumnDef {
        ColumnDef::new("cidr")
    }

    pub fn macaddr() -> ColumnDef {
        ColumnDef::new("macaddr")
    }

    pub fn bit(length: u32) -> ColumnDef {
        ColumnDef::with_length("bit", length)
    }

    pub fn varbit(length: u32) -> ColumnDef {
        ColumnDef::with_length("varbit", length)
    }

    pub fn tsvector() -> ColumnDef {
        ColumnDef::new("tsvector")
    }

    pub fn tsquery() -> ColumnDef {
        ColumnDef::new("tsquery")
    }

    pub fn xml() -> ColumnDef {
        ColumnDef::new("xml")
    }

    pub fn int4range() -> ColumnDef {
        ColumnDef::new("int4range")
    }

    pub fn int8range() -> ColumnDef {
        ColumnDef::new("int8range")
    }

    pub fn numrange() -> ColumnDef {
        ColumnDef::new("numrange")
    }

    pub fn tsrange() -> ColumnDef {
        ColumnDef::new("tsrange")
    }

    pub fn tstzrange() -> ColumnDef {
        ColumnDef::new("tstzrange")
    }

    pub fn daterange() -> ColumnDef {
        ColumnDef::new("daterange")
    }

    /// User-defined type such as an ENUM or DOMAIN.
    pub fn custom(type_name: impl Into<String>) -> ColumnDef {
        ColumnDef::new(type_name)
    }
}
