//! SQL parsing layer.
//!
//! Wraps the `pg_query` crate (libpg_query bindings) and converts its
//! protobuf AST into the internal [`crate::ast`] model. Besides whole
//! statements, the catalog reader needs to parse two fragment shapes that
//! information_schema hands back as bare text: data types
//! (`character varying`) and default expressions
//! (`nextval('t_id_seq'::regclass)`).

pub mod pg_query;

use thiserror::Error;

pub use self::pg_query::{parse_data_type, parse_expr, parse_index_def, parse_statements};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("SQL parse error: {0}")]
    Sql(String),

    #[error("{input:?} did not parse as a data type")]
    NotADataType { input: String },

    #[error("{input:?} did not parse as an expression")]
    NotAnExpression { input: String },

    #[error("{input:?} did not parse as a CREATE INDEX statement")]
    NotAnIndex { input: String },
}
