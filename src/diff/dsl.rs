//! DDL-to-diff mapping.
//!
//! Some callers have already written their intent as explicit DDL. Mapping
//! each statement one-to-one onto a [`SchemaDiff`] lets the inverse engine
//! and the dependency graph treat hand-written migrations and computed
//! diffs uniformly.

use thiserror::Error;

use crate::ast::{AlterColumnOp, AlterTableAction, Statement};
use crate::diff::{EditColumnKind, SchemaDiff};

#[derive(Debug, Error)]
pub enum DslError {
    #[error("no diff mapping for statement: {0}")]
    Unsupported(String),
}

/// Map parsed DDL statements onto diff records, one statement per diff.
/// Statements outside the planner's vocabulary are a hard error.
pub fn statements_to_diffs(statements: &[Statement]) -> Result<Vec<SchemaDiff>, DslError> {
    statements.iter().map(statement_to_diff).collect()
}

fn statement_to_diff(statement: &Statement) -> Result<SchemaDiff, DslError> {
    match statement {
        Statement::CreateTable(table) => Ok(SchemaDiff::AddTable {
            table: table.clone(),
        }),
        Statement::DropTable(drop) => Ok(SchemaDiff::DropTable {
            table: drop.name.clone(),
        }),
        Statement::CreateIndex(index) => Ok(SchemaDiff::AddIndex {
            index: index.clone(),
        }),
        Statement::DropIndex(drop) => Ok(SchemaDiff::RemoveIndex {
            index: drop.name.clone(),
        }),
        Statement::AlterTable(alter) => match &alter.action {
            AlterTableAction::AddColumn { column } => Ok(SchemaDiff::AddColumn {
                table: alter.table.clone(),
                column: column.clone(),
            }),
            AlterTableAction::DropColumn { name } => Ok(SchemaDiff::DropColumn {
                table: alter.table.clone(),
                column: name.clone(),
            }),
            AlterTableAction::AddConstraint { constraint } => Ok(SchemaDiff::AddTableConstraint {
                table: alter.table.clone(),
                constraint: constraint.clone(),
            }),
            AlterTableAction::DropConstraint { name } => Ok(SchemaDiff::DropTableConstraint {
                table: alter.table.clone(),
                constraint: name.clone(),
            }),
            AlterTableAction::AlterColumn { column, op } => {
                let kind = match op {
                    AlterColumnOp::SetType { .. } => EditColumnKind::EditType,
                    AlterColumnOp::SetNotNull => EditColumnKind::SetNotNull,
                    AlterColumnOp::DropNotNull => EditColumnKind::DropNotNull,
                    AlterColumnOp::SetDefault { .. } => EditColumnKind::SetDefault,
                    AlterColumnOp::DropDefault => EditColumnKind::DropDefault,
                };
                Ok(SchemaDiff::EditColumn {
                    kind,
                    table: alter.table.clone(),
                    column: column.clone(),
                    alter: alter.clone(),
                })
            }
        },
        Statement::Ignored { raw_sql } => Err(DslError::Unsupported(raw_sql.trim().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_statements;

    fn dsl_to_diffs(sql: &str) -> Result<Vec<SchemaDiff>, DslError> {
        statements_to_diffs(&parse_statements(sql).expect("parse failed"))
    }

    #[test]
    fn test_create_table_maps_to_add_table() {
        let diffs = dsl_to_diffs("create table test1(id int primary key);").unwrap();
        assert_eq!(diffs.len(), 1);
        assert!(matches!(diffs[0], SchemaDiff::AddTable { .. }));
        assert_eq!(diffs[0].to_sql(), "CREATE TABLE test1 (id int PRIMARY KEY)");
    }

    #[test]
    fn test_drop_table_maps_to_drop_table() {
        let diffs = dsl_to_diffs("drop table test2;").unwrap();
        assert_eq!(diffs[0], SchemaDiff::DropTable { table: "test2".into() });
    }

    #[test]
    fn test_add_column() {
        let diffs = dsl_to_diffs("ALTER TABLE test1 ADD COLUMN name varchar not null").unwrap();
        assert!(matches!(diffs[0], SchemaDiff::AddColumn { .. }));
        assert_eq!(
            diffs[0].to_sql(),
            "ALTER TABLE test1 ADD COLUMN name varchar NOT NULL"
        );
    }

    #[test]
    fn test_drop_column() {
        let diffs = dsl_to_diffs("ALTER TABLE test1 DROP COLUMN name").unwrap();
        assert_eq!(
            diffs[0],
            SchemaDiff::DropColumn { table: "test1".into(), column: "name".into() }
        );
    }

    #[test]
    fn test_alter_column_kinds() {
        let cases = [
            ("ALTER TABLE t ALTER COLUMN name TYPE varchar", EditColumnKind::EditType),
            ("ALTER TABLE t ALTER COLUMN name SET NOT NULL", EditColumnKind::SetNotNull),
            ("ALTER TABLE t ALTER COLUMN name DROP NOT NULL", EditColumnKind::DropNotNull),
            ("ALTER TABLE t ALTER COLUMN id SET DEFAULT 1", EditColumnKind::SetDefault),
            ("ALTER TABLE t ALTER COLUMN id DROP DEFAULT", EditColumnKind::DropDefault),
        ];
        for (sql, expected) in cases {
            let diffs = dsl_to_diffs(sql).unwrap();
            let SchemaDiff::EditColumn { kind, .. } = &diffs[0] else {
                panic!("expected EditColumn from {sql:?}");
            };
            assert_eq!(*kind, expected, "for {sql:?}");
        }
    }

    #[test]
    fn test_constraint_statements() {
        let diffs = dsl_to_diffs(
            "ALTER TABLE test3 ADD CONSTRAINT t2_ref FOREIGN KEY (t2_ref) REFERENCES test2(id);
             ALTER TABLE test3 DROP CONSTRAINT t2_ref;",
        )
        .unwrap();
        assert_eq!(diffs.len(), 2);
        assert_eq!(
            diffs[0].to_sql(),
            "ALTER TABLE test3 ADD CONSTRAINT t2_ref FOREIGN KEY(t2_ref) REFERENCES test2(id)"
        );
        assert_eq!(diffs[1].to_sql(), "ALTER TABLE test3 DROP CONSTRAINT t2_ref");
    }

    #[test]
    fn test_index_statements() {
        let diffs = dsl_to_diffs(
            "CREATE UNIQUE INDEX idx_users_email ON users (email);
             DROP INDEX idx_old;",
        )
        .unwrap();
        assert!(matches!(diffs[0], SchemaDiff::AddIndex { .. }));
        assert_eq!(diffs[1], SchemaDiff::RemoveIndex { index: "idx_old".into() });
    }

    #[test]
    fn test_unsupported_statement_is_an_error() {
        let err = dsl_to_diffs("TRUNCATE TABLE test1;").unwrap_err();
        assert!(err.to_string().contains("no diff mapping"), "got {err}");
    }
}
