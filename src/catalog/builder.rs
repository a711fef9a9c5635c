//! Test harness for building observed-schema state.
//!
//! The planner's interesting paths all take a `[TableDef]` that would
//! normally come from a live database. This builder constructs the same
//! state in memory so diff, inverse, and ordering logic can be exercised
//! without a connection.
//!
//! # Example
//!
//! ```rust
//! use pgshift::ast::Type;
//! use pgshift::catalog::builder::SchemaBuilder;
//!
//! let tables = SchemaBuilder::new()
//!     .table("orders", |t| {
//!         t.pk_column("id", Type::Int)
//!             .column("status", Type::Text, false)
//!             .fk("fk_customer", &["customer_id"], "customers", &["id"]);
//!     })
//!     .build();
//! ```

use crate::ast::{
    ColumnConstraint, ColumnConstraintSpec, ColumnDef, CreateIndex, Expr, ReferenceKeyExpr,
    Statement, TableConstraint, TableConstraintSpec, TableElement, Type,
};
use crate::catalog::TableDef;
use crate::parser::{self, ParseError};

/// Builder for a full observed schema (a list of [`TableDef`]s).
pub struct SchemaBuilder {
    tables: Vec<TableDef>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self { tables: Vec::new() }
    }

    /// Add a table. The closure receives a [`TableDefBuilder`] to
    /// configure columns, constraints, and indexes.
    pub fn table(mut self, name: &str, f: impl FnOnce(&mut TableDefBuilder)) -> Self {
        let mut builder = TableDefBuilder::new(name);
        f(&mut builder);
        self.tables.push(builder.build());
        self
    }

    pub fn build(self) -> Vec<TableDef> {
        self.tables
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a single [`TableDef`].
pub struct TableDefBuilder {
    def: TableDef,
}

impl TableDefBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            def: TableDef {
                name: name.to_string(),
                columns: Vec::new(),
                constraints: Vec::new(),
                indexes: Vec::new(),
            },
        }
    }

    /// Add a column with no default.
    pub fn column(&mut self, name: &str, data_type: Type, not_null: bool) -> &mut Self {
        let mut constraints = Vec::new();
        if not_null {
            constraints.push(ColumnConstraint::unnamed(ColumnConstraintSpec::NotNull));
        }
        self.def.columns.push(ColumnDef {
            name: name.to_string(),
            data_type,
            default: None,
            constraints,
        });
        self
    }

    /// Add a column with a default value.
    pub fn column_with_default(
        &mut self,
        name: &str,
        data_type: Type,
        not_null: bool,
        default: Expr,
    ) -> &mut Self {
        self.column(name, data_type, not_null);
        if let Some(col) = self.def.columns.last_mut() {
            col.default = Some(default);
        }
        self
    }

    /// Add a column carrying an inline PRIMARY KEY constraint, the shape
    /// the catalog reader reconstructs for single-column keys.
    pub fn pk_column(&mut self, name: &str, data_type: Type) -> &mut Self {
        self.def.columns.push(ColumnDef {
            name: name.to_string(),
            data_type,
            default: None,
            constraints: vec![ColumnConstraint::unnamed(ColumnConstraintSpec::Unique {
                is_primary: true,
            })],
        });
        self
    }

    /// Add a sequence-backed key column as the reader reconstructs it:
    /// type `serial`, no default, inline PRIMARY KEY.
    pub fn serial_column(&mut self, name: &str) -> &mut Self {
        self.pk_column(name, Type::Custom("serial".to_string()))
    }

    /// Add a table-level PRIMARY KEY constraint.
    pub fn pk(&mut self, columns: &[&str]) -> &mut Self {
        self.def.constraints.push(TableConstraint {
            name: None,
            spec: TableConstraintSpec::Unique {
                is_primary: true,
                columns: to_strings(columns),
            },
        });
        self
    }

    /// Add a named table-level UNIQUE constraint.
    pub fn unique(&mut self, name: &str, columns: &[&str]) -> &mut Self {
        self.def.constraints.push(TableConstraint {
            name: Some(name.to_string()),
            spec: TableConstraintSpec::Unique {
                is_primary: false,
                columns: to_strings(columns),
            },
        });
        self
    }

    /// Add a named, resolved foreign-key constraint.
    pub fn fk(
        &mut self,
        name: &str,
        columns: &[&str],
        ref_table: &str,
        ref_columns: &[&str],
    ) -> &mut Self {
        self.def.constraints.push(TableConstraint {
            name: Some(name.to_string()),
            spec: TableConstraintSpec::Referential {
                columns: to_strings(columns),
                key_expr: ReferenceKeyExpr {
                    table: ref_table.to_string(),
                    columns: to_strings(ref_columns),
                },
            },
        });
        self
    }

    /// Add an index on this table.
    pub fn index(&mut self, name: &str, columns: &[&str], unique: bool) -> &mut Self {
        self.def.indexes.push(CreateIndex {
            name: name.to_string(),
            table: self.def.name.clone(),
            columns: to_strings(columns),
            unique,
            method: Some("btree".to_string()),
        });
        self
    }

    pub fn build(self) -> TableDef {
        self.def
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Build `TableDef`s directly from CREATE TABLE source text.
///
/// Test shorthand for "the live database looks exactly like this DDL":
/// columns and table constraints are taken verbatim, no indexes are
/// synthesized, and nothing is resolved against a catalog.
pub fn tables_from_sql(sql: &str) -> Result<Vec<TableDef>, ParseError> {
    let statements = parser::parse_statements(sql)?;
    let mut tables = Vec::new();

    for stmt in statements {
        let Statement::CreateTable(ct) = stmt else {
            continue;
        };
        let mut columns = Vec::new();
        let mut constraints = Vec::new();
        for element in ct.elements {
            match element {
                TableElement::Column(c) => columns.push(c),
                TableElement::Constraint(c) => constraints.push(c),
            }
        }
        tables.push(TableDef {
            name: ct.name,
            columns,
            constraints,
            indexes: Vec::new(),
        });
    }

    Ok(tables)
}
