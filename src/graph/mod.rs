//! Dependency graph over diff batches.
//!
//! Foreign-key references across a batch constrain emission order:
//! a diff that references a table must run after every diff that creates
//! or mutates that table. [`build_graph`] collects those edges and
//! [`toposort::resolve`] turns them into an executable order.

pub mod toposort;

use std::collections::HashMap;

use crate::ast::{ColumnConstraintSpec, ColumnDef, TableConstraintSpec, TableElement};
use crate::diff::SchemaDiff;
use crate::graph::toposort::{Graph, Node};

/// One diff plus the serialized SQL of every diff that must precede it.
/// The diff's own SQL string is its node symbol.
#[derive(Debug)]
pub struct DiffNode {
    pub diff: SchemaDiff,
    deps: Vec<String>,
}

impl Node for DiffNode {
    fn symbol(&self) -> String {
        self.diff.to_sql()
    }

    fn deps(&self) -> Vec<String> {
        self.deps.clone()
    }
}

/// Build the dependency graph for a diff batch.
///
/// A table name maps to *all* diffs that create or mutate that table, so a
/// diff referencing table `t` ends up behind `AddTable(t)` and every
/// earlier `AddColumn(t, ...)` — one scheduling point per table instead of
/// fine-grained intra-table ordering.
pub fn build_graph(diffs: Vec<SchemaDiff>) -> Graph<DiffNode> {
    // Lowercased table name → SQL of the diffs that build that table.
    let mut tables: HashMap<String, Vec<String>> = HashMap::new();
    // Per diff: lowercased names of the tables it references.
    let mut referenced: Vec<Vec<String>> = Vec::with_capacity(diffs.len());

    for diff in &diffs {
        let mut refs = Vec::new();
        match diff {
            SchemaDiff::AddTable { table } => {
                for element in &table.elements {
                    match element {
                        TableElement::Column(column) => {
                            refs.extend(column_references(column));
                        }
                        TableElement::Constraint(constraint) => {
                            if let TableConstraintSpec::Referential { key_expr, .. } =
                                &constraint.spec
                            {
                                refs.push(lower(&key_expr.table));
                            }
                        }
                    }
                }
                tables
                    .entry(lower(&table.name))
                    .or_default()
                    .push(diff.to_sql());
            }
            SchemaDiff::AddColumn { table, column } => {
                refs.extend(column_references(column));
                tables.entry(lower(table)).or_default().push(diff.to_sql());
            }
            SchemaDiff::AddTableConstraint { table, constraint } => {
                if let TableConstraintSpec::Referential { key_expr, .. } = &constraint.spec {
                    refs.push(lower(&key_expr.table));
                }
                tables.entry(lower(table)).or_default().push(diff.to_sql());
            }
            SchemaDiff::AddIndex { index } => {
                refs.push(lower(&index.table));
            }
            _ => {}
        }
        referenced.push(refs);
    }

    let nodes = diffs
        .into_iter()
        .zip(referenced)
        .map(|(diff, refs)| {
            let symbol = diff.to_sql();
            let mut deps = Vec::new();
            for table in refs {
                let Some(specs) = tables.get(&table) else {
                    // Referenced table is not part of this batch; it either
                    // already exists or the DDL will fail on its own terms.
                    continue;
                };
                deps.extend(specs.iter().filter(|s| **s != symbol).cloned());
            }
            DiffNode { diff, deps }
        })
        .collect();

    Graph { nodes }
}

fn column_references(column: &ColumnDef) -> Vec<String> {
    column
        .constraints
        .iter()
        .filter_map(|c| match &c.spec {
            ColumnConstraintSpec::References { table, .. } => Some(lower(table)),
            _ => None,
        })
        .collect()
}

fn lower(s: &str) -> String {
    s.to_ascii_lowercase()
}
