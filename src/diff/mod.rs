//! Structural diff between the desired schema and the observed one.
//!
//! [`diff`] computes the unordered set of atomic changes that carry a
//! database matching `current` to one matching `target`. Each change is a
//! [`SchemaDiff`] variant that renders its own DDL via [`SchemaDiff::to_sql`].
//!
//! Tables, columns, and constraint names compare case-insensitively.
//! Index names compare case-sensitively, mirroring PostgreSQL storage.

pub mod dsl;

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::ast::{
    AlterColumnOp, AlterTable, AlterTableAction, ColumnConstraintSpec, ColumnDef, CreateIndex,
    CreateTable, DropIndex, DropTable, TableConstraint, TableConstraintSpec, TableElement,
};
use crate::catalog::TableDef;

/// The desired state: CREATE TABLE and CREATE INDEX statements as the
/// user wrote them. Names keep their written case and are compared
/// case-insensitively against the observed schema.
#[derive(Debug, Clone, Default)]
pub struct TargetSchema {
    pub tables: Vec<CreateTable>,
    pub indexes: Vec<CreateIndex>,
}

/// One atomic schema change.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaDiff {
    AddTable {
        table: CreateTable,
    },
    DropTable {
        table: String,
    },
    AddColumn {
        table: String,
        column: ColumnDef,
    },
    DropColumn {
        table: String,
        column: String,
    },
    EditColumn {
        kind: EditColumnKind,
        table: String,
        column: String,
        /// The ALTER TABLE statement carried verbatim into `to_sql`.
        alter: AlterTable,
    },
    AddTableConstraint {
        table: String,
        constraint: TableConstraint,
    },
    DropTableConstraint {
        table: String,
        constraint: String,
    },
    AddIndex {
        index: CreateIndex,
    },
    RemoveIndex {
        index: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditColumnKind {
    EditType,
    SetNotNull,
    DropNotNull,
    SetDefault,
    DropDefault,
}

impl SchemaDiff {
    pub fn to_sql(&self) -> String {
        match self {
            SchemaDiff::AddTable { table } => table.to_string(),
            SchemaDiff::DropTable { table } => DropTable {
                name: table.clone(),
                if_exists: true,
            }
            .to_string(),
            SchemaDiff::AddColumn { table, column } => AlterTable {
                table: table.clone(),
                action: AlterTableAction::AddColumn {
                    column: column.clone(),
                },
            }
            .to_string(),
            SchemaDiff::DropColumn { table, column } => AlterTable {
                table: table.clone(),
                action: AlterTableAction::DropColumn {
                    name: column.clone(),
                },
            }
            .to_string(),
            SchemaDiff::EditColumn { alter, .. } => alter.to_string(),
            SchemaDiff::AddTableConstraint { table, constraint } => AlterTable {
                table: table.clone(),
                action: AlterTableAction::AddConstraint {
                    constraint: constraint.clone(),
                },
            }
            .to_string(),
            SchemaDiff::DropTableConstraint { table, constraint } => AlterTable {
                table: table.clone(),
                action: AlterTableAction::DropConstraint {
                    name: constraint.clone(),
                },
            }
            .to_string(),
            SchemaDiff::AddIndex { index } => index.to_string(),
            SchemaDiff::RemoveIndex { index } => DropIndex {
                name: index.clone(),
            }
            .to_string(),
        }
    }
}

impl fmt::Display for SchemaDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sql())
    }
}

/// Compute the unordered change set between `target` and `current`.
pub fn diff(target: &TargetSchema, current: &[TableDef]) -> Vec<SchemaDiff> {
    let mut diffs = Vec::new();

    let current_by_name: HashMap<String, &TableDef> =
        current.iter().map(|t| (lower(&t.name), t)).collect();
    let target_names: HashSet<String> =
        target.tables.iter().map(|t| lower(&t.name)).collect();

    for table in &target.tables {
        match current_by_name.get(&lower(&table.name)) {
            Some(observed) => table_diff(&mut diffs, table, observed),
            None => diffs.push(SchemaDiff::AddTable {
                table: table.clone(),
            }),
        }
    }

    for observed in current {
        if target_names.contains(&lower(&observed.name)) {
            continue;
        }
        diffs.push(SchemaDiff::DropTable {
            table: observed.name.clone(),
        });
        // The table is going away, but its named constraints are dropped
        // explicitly as well; this tolerates running against a database
        // someone already half-migrated by hand.
        for constraint in &observed.constraints {
            if let Some(name) = &constraint.name {
                diffs.push(SchemaDiff::DropTableConstraint {
                    table: observed.name.clone(),
                    constraint: name.clone(),
                });
            }
        }
    }

    index_diff(&mut diffs, target, current);

    diffs
}

fn table_diff(diffs: &mut Vec<SchemaDiff>, target: &CreateTable, current: &TableDef) {
    let mut seen: HashSet<String> = HashSet::new();

    for element in &target.elements {
        match element {
            TableElement::Column(column) => {
                seen.insert(lower(&column.name));
                match current.get_column(&column.name) {
                    Some(observed) => column_diff(diffs, &target.name, column, observed),
                    None => diffs.push(SchemaDiff::AddColumn {
                        table: target.name.clone(),
                        column: column.clone(),
                    }),
                }
            }
            TableElement::Constraint(constraint) => {
                if matches!(constraint.spec, TableConstraintSpec::Check { .. }) {
                    tracing::warn!(table = %target.name, "CHECK table constraints are not diffed");
                    continue;
                }
                let present = constraint
                    .name
                    .as_ref()
                    .is_some_and(|n| current.get_constraint(n).is_some());
                if !present {
                    diffs.push(SchemaDiff::AddTableConstraint {
                        table: target.name.clone(),
                        constraint: constraint.clone(),
                    });
                }
            }
        }
    }

    for column in &current.columns {
        if !seen.contains(&lower(&column.name)) {
            diffs.push(SchemaDiff::DropColumn {
                table: target.name.clone(),
                column: column.name.clone(),
            });
        }
    }
}

/// Emit the per-column sub-diffs: type, nullability, default. Each becomes
/// an independent [`SchemaDiff::EditColumn`]; their relative order within
/// one column is not significant.
fn column_diff(diffs: &mut Vec<SchemaDiff>, table: &str, target: &ColumnDef, current: &ColumnDef) {
    if !target.data_type.equivalent(&current.data_type) {
        diffs.push(edit_column(
            EditColumnKind::EditType,
            table,
            &target.name,
            AlterColumnOp::SetType {
                data_type: target.data_type.clone(),
            },
        ));
    }

    let target_not_null = has_not_null(target);
    let current_not_null = has_not_null(current);
    if target_not_null && !current_not_null {
        diffs.push(edit_column(
            EditColumnKind::SetNotNull,
            table,
            &target.name,
            AlterColumnOp::SetNotNull,
        ));
    } else if !target_not_null && current_not_null {
        diffs.push(edit_column(
            EditColumnKind::DropNotNull,
            table,
            &target.name,
            AlterColumnOp::DropNotNull,
        ));
    }

    match (&target.default, &current.default) {
        (Some(default), None) => diffs.push(edit_column(
            EditColumnKind::SetDefault,
            table,
            &target.name,
            AlterColumnOp::SetDefault {
                default: default.clone(),
            },
        )),
        (None, Some(_)) => diffs.push(edit_column(
            EditColumnKind::DropDefault,
            table,
            &target.name,
            AlterColumnOp::DropDefault,
        )),
        _ => {}
    }
}

pub(crate) fn edit_column(
    kind: EditColumnKind,
    table: &str,
    column: &str,
    op: AlterColumnOp,
) -> SchemaDiff {
    SchemaDiff::EditColumn {
        kind,
        table: table.to_string(),
        column: column.to_string(),
        alter: AlterTable {
            table: table.to_string(),
            action: AlterTableAction::AlterColumn {
                column: column.to_string(),
                op,
            },
        },
    }
}

fn index_diff(diffs: &mut Vec<SchemaDiff>, target: &TargetSchema, current: &[TableDef]) {
    let current_names: HashSet<&str> = current
        .iter()
        .flat_map(|t| t.indexes.iter())
        .map(|i| i.name.as_str())
        .collect();
    let target_names: HashSet<&str> = target.indexes.iter().map(|i| i.name.as_str()).collect();

    for index in &target.indexes {
        if !current_names.contains(index.name.as_str()) {
            diffs.push(SchemaDiff::AddIndex {
                index: index.clone(),
            });
        }
    }

    for index in current.iter().flat_map(|t| t.indexes.iter()) {
        if !target_names.contains(index.name.as_str()) {
            diffs.push(SchemaDiff::RemoveIndex {
                index: index.name.clone(),
            });
        }
    }
}

/// NOT NULL detection for diffing purposes. A unique or primary-key column
/// constraint counts as NOT NULL here, so reconstructed keys do not
/// ping-pong nullability against a desired `primary key` column.
fn has_not_null(def: &ColumnDef) -> bool {
    def.constraints.iter().any(|c| {
        matches!(
            c.spec,
            ColumnConstraintSpec::NotNull | ColumnConstraintSpec::Unique { .. }
        )
    })
}

fn lower(s: &str) -> String {
    s.to_ascii_lowercase()
}
