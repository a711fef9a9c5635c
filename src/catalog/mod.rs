//! Reconstructed table definitions.
//!
//! A [`TableDef`] is the shape of one live table rebuilt from catalog
//! introspection (see [`reader`]). Values are immutable snapshots: each
//! planning run dumps the catalog from scratch, and nothing survives
//! across runs.
//!
//! Table, column, and constraint names match case-insensitively; index
//! names match case-sensitively, mirroring how PostgreSQL stores them.

pub mod builder;
pub mod reader;

use crate::ast::{ColumnDef, CreateIndex, TableConstraint};

pub use reader::{CatalogReader, DumpError};

#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    pub name: String,
    /// Columns in catalog (`ordinal_position`) order.
    pub columns: Vec<ColumnDef>,
    /// Multi-column constraints. Single-column constraints live on the
    /// owning [`ColumnDef`].
    pub constraints: Vec<TableConstraint>,
    /// Indexes that are not implied by a unique or primary-key constraint.
    pub indexes: Vec<CreateIndex>,
}

impl TableDef {
    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn get_constraint(&self, name: &str) -> Option<&TableConstraint> {
        self.constraints.iter().find(|c| {
            c.name
                .as_ref()
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
    }

    /// Case-sensitive index lookup.
    pub fn get_index(&self, name: &str) -> Option<&CreateIndex> {
        self.indexes.iter().find(|i| i.name == name)
    }
}

/// Case-insensitive table lookup across a dumped schema.
pub fn get_table<'a>(tables: &'a [TableDef], name: &str) -> Option<&'a TableDef> {
    tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::builder::SchemaBuilder;
    use super::*;
    use crate::ast::Type;

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        let tables = SchemaBuilder::new()
            .table("test1", |t| {
                t.column("ID", Type::Int, false);
            })
            .build();

        let table = get_table(&tables, "Test1").expect("table lookup failed");
        assert!(table.get_column("id").is_some());
        assert!(table.get_column("iD").is_some());
        assert!(table.get_column("name").is_none());
    }

    #[test]
    fn test_constraint_lookup_is_case_insensitive() {
        let tables = SchemaBuilder::new()
            .table("orders", |t| {
                t.column("id", Type::Int, true)
                    .column("customer_id", Type::Int, true)
                    .fk("FK_Customer", &["customer_id"], "customers", &["id"]);
            })
            .build();

        let table = get_table(&tables, "orders").unwrap();
        assert!(table.get_constraint("fk_customer").is_some());
    }

    #[test]
    fn test_index_lookup_is_case_sensitive() {
        let tables = SchemaBuilder::new()
            .table("users", |t| {
                t.column("email", Type::Text, false)
                    .index("IDX_Email", &["email"], true);
            })
            .build();

        let table = get_table(&tables, "users").unwrap();
        assert!(table.get_index("IDX_Email").is_some());
        assert!(table.get_index("idx_email").is_none());
    }
}
