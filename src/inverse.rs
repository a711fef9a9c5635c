//! Inverse synthesis — the down-migration counterpart of a diff.
//!
//! For every diff `d` computed against an observed schema, `inverse(d)`
//! produces the diff that undoes it: applying `d` then its inverse leaves
//! the schema structurally unchanged. Re-creation payloads (dropped
//! columns, tables, constraints, indexes) are recovered from the observed
//! schema, which is the source of truth for what existed before.

use thiserror::Error;

use crate::ast::{
    AlterColumnOp, ColumnDef, CreateTable, Expr, TableElement, Type,
};
use crate::catalog::{self, TableDef};
use crate::diff::{edit_column, EditColumnKind, SchemaDiff};

#[derive(Debug, Error)]
pub enum InverseError {
    #[error("table {0} not found in the observed schema")]
    UnknownTable(String),

    #[error("column {table}.{column} not found in the observed schema")]
    UnknownColumn { table: String, column: String },

    #[error("constraint {constraint} on table {table} not found in the observed schema")]
    UnknownConstraint { table: String, constraint: String },

    #[error("index {0} not found in the observed schema")]
    UnknownIndex(String),

    #[error("column {table}.{column} has no default to restore")]
    MissingDefault { table: String, column: String },

    #[error("cannot invert an unnamed constraint on table {0}")]
    UnnamedConstraint(String),
}

/// Produce the semantic inverse of one diff against the observed schema.
pub fn inverse(diff: &SchemaDiff, current: &[TableDef]) -> Result<SchemaDiff, InverseError> {
    match diff {
        SchemaDiff::AddTable { table } => Ok(SchemaDiff::DropTable {
            table: table.name.clone(),
        }),

        SchemaDiff::DropTable { table } => {
            let observed = lookup_table(current, table)?;
            Ok(SchemaDiff::AddTable {
                table: CreateTable {
                    name: table.clone(),
                    elements: observed
                        .columns
                        .iter()
                        .cloned()
                        .map(TableElement::Column)
                        .collect(),
                },
            })
        }

        SchemaDiff::AddColumn { table, column } => Ok(SchemaDiff::DropColumn {
            table: table.clone(),
            column: column.name.clone(),
        }),

        SchemaDiff::DropColumn { table, column } => {
            let observed = lookup_column(current, table, column)?;
            Ok(SchemaDiff::AddColumn {
                table: table.clone(),
                column: refine(observed),
            })
        }

        SchemaDiff::EditColumn { kind, table, column, .. } => {
            inverse_edit(*kind, table, column, current)
        }

        SchemaDiff::AddTableConstraint { table, constraint } => {
            let name = constraint
                .name
                .clone()
                .ok_or_else(|| InverseError::UnnamedConstraint(table.clone()))?;
            Ok(SchemaDiff::DropTableConstraint {
                table: table.clone(),
                constraint: name,
            })
        }

        SchemaDiff::DropTableConstraint { table, constraint } => {
            let observed = lookup_table(current, table)?;
            let payload = observed.get_constraint(constraint).ok_or_else(|| {
                InverseError::UnknownConstraint {
                    table: table.clone(),
                    constraint: constraint.clone(),
                }
            })?;
            Ok(SchemaDiff::AddTableConstraint {
                table: table.clone(),
                constraint: payload.clone(),
            })
        }

        SchemaDiff::AddIndex { index } => Ok(SchemaDiff::RemoveIndex {
            index: index.name.clone(),
        }),

        SchemaDiff::RemoveIndex { index } => {
            let observed = current
                .iter()
                .find_map(|t| t.get_index(index))
                .ok_or_else(|| InverseError::UnknownIndex(index.clone()))?;
            Ok(SchemaDiff::AddIndex {
                index: observed.clone(),
            })
        }
    }
}

fn inverse_edit(
    kind: EditColumnKind,
    table: &str,
    column: &str,
    current: &[TableDef],
) -> Result<SchemaDiff, InverseError> {
    match kind {
        EditColumnKind::SetNotNull => Ok(edit_column(
            EditColumnKind::DropNotNull,
            table,
            column,
            AlterColumnOp::DropNotNull,
        )),
        EditColumnKind::DropNotNull => Ok(edit_column(
            EditColumnKind::SetNotNull,
            table,
            column,
            AlterColumnOp::SetNotNull,
        )),
        EditColumnKind::SetDefault => Ok(edit_column(
            EditColumnKind::DropDefault,
            table,
            column,
            AlterColumnOp::DropDefault,
        )),
        EditColumnKind::DropDefault => {
            let observed = lookup_column(current, table, column)?;
            let default = observed
                .default
                .clone()
                .ok_or_else(|| InverseError::MissingDefault {
                    table: table.to_string(),
                    column: column.to_string(),
                })?;
            Ok(edit_column(
                EditColumnKind::SetDefault,
                table,
                column,
                AlterColumnOp::SetDefault { default },
            ))
        }
        EditColumnKind::EditType => {
            let observed = lookup_column(current, table, column)?;
            Ok(edit_column(
                EditColumnKind::EditType,
                table,
                column,
                AlterColumnOp::SetType {
                    data_type: observed.data_type.clone(),
                },
            ))
        }
    }
}

fn lookup_table<'a>(current: &'a [TableDef], name: &str) -> Result<&'a TableDef, InverseError> {
    catalog::get_table(current, name).ok_or_else(|| InverseError::UnknownTable(name.to_string()))
}

fn lookup_column<'a>(
    current: &'a [TableDef],
    table: &str,
    column: &str,
) -> Result<&'a ColumnDef, InverseError> {
    lookup_table(current, table)?
        .get_column(column)
        .ok_or_else(|| InverseError::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
        })
}

/// Prepare a dropped column's stored form for re-creation. A plain `int`
/// whose default is a `nextval(...)` call re-adds as SERIAL with no
/// explicit default, so the restored column is sequence-backed again
/// instead of a bare integer.
fn refine(column: &ColumnDef) -> ColumnDef {
    if column.data_type == Type::Int
        && column.default.as_ref().is_some_and(Expr::is_sequence_call)
    {
        return ColumnDef {
            name: column.name.clone(),
            data_type: Type::Custom("SERIAL".to_string()),
            default: None,
            constraints: column.constraints.clone(),
        };
    }
    column.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Statement;
    use crate::catalog::builder::{tables_from_sql, SchemaBuilder};
    use crate::diff::dsl::statements_to_diffs;
    use crate::parser::parse_statements;

    fn diffs_of(sql: &str) -> Vec<SchemaDiff> {
        statements_to_diffs(&parse_statements(sql).expect("parse failed")).expect("dsl failed")
    }

    fn invert(dsl: &str, current: &str) -> SchemaDiff {
        let diffs = diffs_of(dsl);
        assert_eq!(diffs.len(), 1);
        inverse(&diffs[0], &tables_from_sql(current).unwrap()).expect("inverse failed")
    }

    #[test]
    fn test_add_table_inverts_to_drop() {
        let inv = invert(
            "create table test2(id int primary key);",
            "create table test1(id int primary key);",
        );
        assert_eq!(inv, SchemaDiff::DropTable { table: "test2".into() });
        assert_eq!(inv.to_sql(), "DROP TABLE IF EXISTS test2");
    }

    #[test]
    fn test_drop_table_inverts_to_add_with_observed_columns() {
        let inv = invert(
            "drop table test2;",
            "create table test1(id int primary key);
             create table test2(id int primary key);",
        );
        assert_eq!(inv.to_sql(), "CREATE TABLE test2 (id int PRIMARY KEY)");
    }

    #[test]
    fn test_add_column_inverts_to_drop_column() {
        let inv = invert(
            "ALTER TABLE test1 ADD COLUMN name varchar not null",
            "create table test1(id int primary key);",
        );
        assert_eq!(
            inv,
            SchemaDiff::DropColumn { table: "test1".into(), column: "name".into() }
        );
    }

    #[test]
    fn test_drop_column_inverts_to_add_with_observed_definition() {
        let inv = invert(
            "ALTER TABLE test1 DROP COLUMN name",
            "create table test1(id int primary key, name varchar not null);",
        );
        assert_eq!(
            inv.to_sql(),
            "ALTER TABLE test1 ADD COLUMN name varchar NOT NULL"
        );
    }

    #[test]
    fn test_dropped_serial_column_readds_as_serial() {
        // Observed as materialized: int + nextval default.
        let current = SchemaBuilder::new()
            .table("test1", |t| {
                t.column_with_default(
                    "id",
                    crate::ast::Type::Int,
                    true,
                    Expr::FunctionCall {
                        name: "nextval".into(),
                        args: vec!["'test1_id_seq'::regclass".into()],
                    },
                );
            })
            .build();

        let diffs = diffs_of("ALTER TABLE test1 DROP COLUMN id");
        let inv = inverse(&diffs[0], &current).unwrap();

        let SchemaDiff::AddColumn { column, .. } = &inv else {
            panic!("expected AddColumn, got {inv:?}");
        };
        assert_eq!(column.data_type, Type::Custom("SERIAL".into()));
        assert!(column.default.is_none());
        assert_eq!(inv.to_sql(), "ALTER TABLE test1 ADD COLUMN id SERIAL NOT NULL");
    }

    #[test]
    fn test_not_null_edits_invert_symmetrically() {
        let current = "create table test1(id int primary key, name varchar not null);";

        let inv = invert("ALTER TABLE test1 ALTER COLUMN name DROP NOT NULL", current);
        assert!(matches!(
            inv,
            SchemaDiff::EditColumn { kind: EditColumnKind::SetNotNull, .. }
        ));
        assert_eq!(
            inv.to_sql(),
            "ALTER TABLE test1 ALTER COLUMN name SET NOT NULL"
        );

        let inv = invert("ALTER TABLE test1 ALTER COLUMN name SET NOT NULL", current);
        assert!(matches!(
            inv,
            SchemaDiff::EditColumn { kind: EditColumnKind::DropNotNull, .. }
        ));
    }

    #[test]
    fn test_set_default_inverts_to_drop_default() {
        let inv = invert(
            "ALTER TABLE test1 ALTER COLUMN name SET DEFAULT 1",
            "create table test1(id int primary key, name varchar);",
        );
        assert!(matches!(
            inv,
            SchemaDiff::EditColumn { kind: EditColumnKind::DropDefault, .. }
        ));
        assert_eq!(inv.to_sql(), "ALTER TABLE test1 ALTER COLUMN name DROP DEFAULT");
    }

    #[test]
    fn test_drop_default_restores_observed_default() {
        let inv = invert(
            "ALTER TABLE test1 ALTER COLUMN id DROP DEFAULT",
            "create table test1(id int primary key default 1, name varchar);",
        );
        assert!(matches!(
            inv,
            SchemaDiff::EditColumn { kind: EditColumnKind::SetDefault, .. }
        ));
        assert_eq!(inv.to_sql(), "ALTER TABLE test1 ALTER COLUMN id SET DEFAULT 1");
    }

    #[test]
    fn test_edit_type_restores_observed_type() {
        let inv = invert(
            "ALTER TABLE test1 ALTER COLUMN name TYPE int",
            "create table test1(id int primary key, name varchar not null);",
        );
        assert!(matches!(
            inv,
            SchemaDiff::EditColumn { kind: EditColumnKind::EditType, .. }
        ));
        assert_eq!(inv.to_sql(), "ALTER TABLE test1 ALTER COLUMN name TYPE varchar");
    }

    #[test]
    fn test_constraint_diffs_invert_both_ways() {
        let current = "create table test3(id int primary key, t2_ref int,
                         constraint t2_ref foreign key (t2_ref) references test2(id));";

        let inv = invert(
            "ALTER TABLE test3 ADD CONSTRAINT other FOREIGN KEY (t2_ref) REFERENCES test2(id)",
            current,
        );
        assert_eq!(
            inv,
            SchemaDiff::DropTableConstraint { table: "test3".into(), constraint: "other".into() }
        );

        let inv = invert("ALTER TABLE test3 DROP CONSTRAINT t2_ref", current);
        assert_eq!(
            inv.to_sql(),
            "ALTER TABLE test3 ADD CONSTRAINT t2_ref FOREIGN KEY(t2_ref) REFERENCES test2(id)"
        );
    }

    #[test]
    fn test_index_diffs_invert_both_ways() {
        let current = SchemaBuilder::new()
            .table("users", |t| {
                t.pk_column("id", Type::Int)
                    .column("email", Type::Text, false)
                    .index("idx_users_email", &["email"], true);
            })
            .build();

        let diffs = diffs_of("CREATE UNIQUE INDEX idx_new ON users (id);");
        let inv = inverse(&diffs[0], &current).unwrap();
        assert_eq!(inv, SchemaDiff::RemoveIndex { index: "idx_new".into() });

        let diffs = diffs_of("DROP INDEX idx_users_email;");
        let inv = inverse(&diffs[0], &current).unwrap();
        assert_eq!(
            inv.to_sql(),
            "CREATE UNIQUE INDEX idx_users_email ON users USING btree (email)"
        );
    }

    #[test]
    fn test_missing_objects_are_errors() {
        let current = tables_from_sql("create table test1(id int primary key);").unwrap();

        let diffs = diffs_of("ALTER TABLE nope DROP COLUMN x");
        assert!(matches!(
            inverse(&diffs[0], &current),
            Err(InverseError::UnknownTable(_))
        ));

        let diffs = diffs_of("ALTER TABLE test1 DROP COLUMN nope");
        assert!(matches!(
            inverse(&diffs[0], &current),
            Err(InverseError::UnknownColumn { .. })
        ));

        let diffs = diffs_of("DROP INDEX nope;");
        assert!(matches!(
            inverse(&diffs[0], &current),
            Err(InverseError::UnknownIndex(_))
        ));
    }

    #[test]
    fn test_drop_default_without_observed_default_is_an_error() {
        let current = tables_from_sql("create table t(id int primary key);").unwrap();
        let diffs = diffs_of("ALTER TABLE t ALTER COLUMN id DROP DEFAULT");
        assert!(matches!(
            inverse(&diffs[0], &current),
            Err(InverseError::MissingDefault { .. })
        ));
    }

    #[test]
    fn test_apply_then_inverse_is_identity_for_defaults() {
        // SET DEFAULT then its inverse, and DROP DEFAULT then its inverse,
        // both restore the original column.
        let current = "create table t(id int primary key default 1);";

        let set = diffs_of("ALTER TABLE t ALTER COLUMN id SET DEFAULT 2");
        let undo_set = inverse(&set[0], &tables_from_sql(current).unwrap()).unwrap();
        assert_eq!(undo_set.to_sql(), "ALTER TABLE t ALTER COLUMN id DROP DEFAULT");

        let drop = diffs_of("ALTER TABLE t ALTER COLUMN id DROP DEFAULT");
        let undo_drop = inverse(&drop[0], &tables_from_sql(current).unwrap()).unwrap();
        assert_eq!(undo_drop.to_sql(), "ALTER TABLE t ALTER COLUMN id SET DEFAULT 1");
    }

    #[test]
    fn test_unnamed_constraint_cannot_be_inverted() {
        // An unnamed constraint cannot be dropped by name later.
        let stmts = parse_statements("ALTER TABLE t ADD UNIQUE (a, b)").unwrap();
        assert!(matches!(stmts[0], Statement::AlterTable(_)));
        let diffs = statements_to_diffs(&stmts).unwrap();
        assert!(matches!(
            inverse(&diffs[0], &[]),
            Err(InverseError::UnnamedConstraint(_))
        ));
    }
}
