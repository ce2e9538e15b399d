//! SQL assembly: identifiers, conditions, filters, column types and
//! statements.

pub mod column;
pub mod condition;
pub mod filter;
pub mod ident;
pub mod params;
pub mod statement;

pub use column::{Column, ColumnDef, DataType};
pub use condition::Condition;
pub use filter::{
    build_typed_where_clause, build_where_clause, pairs_from_flat, FieldMap, FilterArg,
    FilterValue,
};
pub use ident::{is_valid_identifier, quote_identifier, MAX_IDENTIFIER_LENGTH};
pub use params::Placeholders;
pub use statement::{SortOrder, Statement};
