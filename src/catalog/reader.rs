//! Catalog introspection — rebuilds [`TableDef`]s from a live database.
//!
//! The reader queries information_schema and pg_indexes over a single
//! connection and reassembles AST-level table definitions in two phases:
//! collect every table (recording constraint locations in a key map),
//! then back-patch foreign-key targets and attach indexes. Dump order is
//! `table_name` order, so output is stable across runs.

use std::collections::HashMap;

use thiserror::Error;
use tokio_postgres::Client;
use tokio_util::sync::CancellationToken;

use crate::ast::{
    ColumnConstraint, ColumnConstraintSpec, ColumnDef, CreateIndex, Expr, TableConstraint,
    TableConstraintSpec, Type,
};
use crate::catalog::TableDef;
use crate::history;
use crate::parser::{self, ParseError};

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("database error: {0}")]
    Db(#[from] tokio_postgres::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("constraint {0} has no key-map entry; dumped schema is inconsistent")]
    UnresolvedReference(String),

    #[error("unsupported constraint type {kind} on table {table}")]
    UnknownConstraint { table: String, kind: String },

    #[error("catalog dump cancelled")]
    Cancelled,
}

/// Where a constraint's columns live. Recorded for every observed
/// (constraint, column) row and used to resolve foreign-key targets.
#[derive(Debug)]
struct KeyTarget {
    table: String,
    column: String,
}

/// Lowercased constraint name → observed targets.
type Keymap = HashMap<String, Vec<KeyTarget>>;

/// One row of the joined table-constraints view.
struct ConstraintRow {
    column_name: String,
    constraint_name: String,
    constraint_type: String,
    table_name: String,
    unique_constraint_name: Option<String>,
}

pub struct CatalogReader<'a> {
    client: &'a Client,
    cancel: CancellationToken,
}

impl<'a> CatalogReader<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self {
            client,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(client: &'a Client, cancel: CancellationToken) -> Self {
        Self { client, cancel }
    }

    /// Reconstruct every table in the `public` schema.
    pub async fn dump(&self) -> Result<Vec<TableDef>, DumpError> {
        let names = self.table_names().await?;

        let mut keymap: Keymap = HashMap::new();
        // FK constraint name → the PK/UNIQUE constraint it references.
        let mut fk_targets: HashMap<String, String> = HashMap::new();
        let mut tables = Vec::with_capacity(names.len());

        for name in &names {
            self.ensure_live()?;

            let (mut column_constraints, table_constraints) = self
                .table_constraints(name, &mut keymap, &mut fk_targets)
                .await?;
            let mut columns = self.columns(name).await?;

            for col in &mut columns {
                if let Some(extra) = column_constraints.remove(&lower(&col.name)) {
                    col.constraints.extend(extra);
                }
                fix_serial(col);
            }

            tables.push(TableDef {
                name: name.clone(),
                columns,
                constraints: table_constraints,
                indexes: Vec::new(),
            });
        }

        resolve_references(&mut tables, &keymap, &fk_targets)?;

        for i in 0..tables.len() {
            self.ensure_live()?;
            let indexes = self.indexes(&tables[i]).await?;
            tables[i].indexes = indexes;
        }

        Ok(tables)
    }

    fn ensure_live(&self) -> Result<(), DumpError> {
        if self.cancel.is_cancelled() {
            Err(DumpError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn table_names(&self) -> Result<Vec<String>, DumpError> {
        let rows = self
            .client
            .query(
                "select table_name from information_schema.tables \
                 where table_schema = 'public' and table_name <> $1 \
                 order by table_name",
                &[&history::LOG_TABLE],
            )
            .await?;

        Ok(rows.iter().map(|r| r.get("table_name")).collect())
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnDef>, DumpError> {
        let rows = self
            .client
            .query(
                "select column_name, column_default, is_nullable, data_type, udt_name, \
                        character_maximum_length, numeric_precision, numeric_scale \
                 from information_schema.columns \
                 where table_schema = 'public' and table_name = $1 \
                 order by ordinal_position",
                &[&table],
            )
            .await?;

        let mut columns = Vec::with_capacity(rows.len());

        for row in rows {
            let name: String = row.get("column_name");
            let data_type: String = row.get("data_type");
            let udt_name: String = row.get("udt_name");

            // Enum and array columns report placeholder type names that the
            // SQL parser cannot handle; fall back to the underlying udt.
            let parsed = match data_type.as_str() {
                "USER-DEFINED" | "ARRAY" => Type::Custom(udt_name),
                other => parser::parse_data_type(other)?,
            };
            let data_type = enrich_type(
                parsed,
                row.get("character_maximum_length"),
                row.get("numeric_precision"),
                row.get("numeric_scale"),
            );

            let default = match row.get::<_, Option<String>>("column_default") {
                Some(text) => Some(parser::parse_expr(&text)?),
                None => None,
            };

            let mut constraints = Vec::new();
            let is_nullable: String = row.get("is_nullable");
            if is_nullable.eq_ignore_ascii_case("NO") {
                constraints.push(ColumnConstraint::unnamed(ColumnConstraintSpec::NotNull));
            }

            columns.push(ColumnDef {
                name,
                data_type,
                default,
                constraints,
            });
        }

        Ok(columns)
    }

    /// Read the table's constraints, splitting them into column-level
    /// (single-column) and table-level (multi-column) sets.
    ///
    /// Returns `(lowercased column name → constraints, table constraints)`
    /// and records every (constraint, column) row in the key map.
    async fn table_constraints(
        &self,
        table: &str,
        keymap: &mut Keymap,
        fk_targets: &mut HashMap<String, String>,
    ) -> Result<(HashMap<String, Vec<ColumnConstraint>>, Vec<TableConstraint>), DumpError> {
        // Multi-column constraints are recognized by counting rows per
        // constraint name before reading the rows themselves.
        let counts = self
            .client
            .query(
                "select count(table_constraints.constraint_name) as column_count, \
                        table_constraints.constraint_name as constraint_name \
                 from information_schema.table_constraints \
                 left join information_schema.referential_constraints \
                        on referential_constraints.constraint_name = table_constraints.constraint_name \
                 join information_schema.constraint_column_usage \
                        on constraint_column_usage.constraint_name = table_constraints.constraint_name \
                 where table_constraints.table_schema = 'public' \
                   and table_constraints.table_name = $1 \
                 group by table_constraints.constraint_name",
                &[&table],
            )
            .await?;

        let mut groups: HashMap<String, Vec<ConstraintRow>> = HashMap::new();
        for row in &counts {
            let count: i64 = row.get("column_count");
            if count > 1 {
                groups.insert(row.get("constraint_name"), Vec::new());
            }
        }

        let rows = self
            .client
            .query(
                "select constraint_column_usage.column_name, \
                        table_constraints.constraint_name, \
                        table_constraints.constraint_type, \
                        table_constraints.table_name, \
                        referential_constraints.unique_constraint_name \
                 from information_schema.table_constraints \
                 left join information_schema.referential_constraints \
                        on referential_constraints.constraint_name = table_constraints.constraint_name \
                 join information_schema.constraint_column_usage \
                        on constraint_column_usage.constraint_name = table_constraints.constraint_name \
                 where table_constraints.table_schema = 'public' \
                   and table_constraints.table_name = $1 \
                 order by table_constraints.constraint_name",
                &[&table],
            )
            .await?;

        let mut column_constraints: HashMap<String, Vec<ColumnConstraint>> = HashMap::new();

        for row in rows {
            let row = ConstraintRow {
                column_name: row.get("column_name"),
                constraint_name: row.get("constraint_name"),
                constraint_type: row.get("constraint_type"),
                table_name: row.get("table_name"),
                unique_constraint_name: row.get("unique_constraint_name"),
            };

            keymap
                .entry(lower(&row.constraint_name))
                .or_default()
                .push(KeyTarget {
                    table: row.table_name.clone(),
                    column: row.column_name.clone(),
                });
            if let Some(unique) = &row.unique_constraint_name {
                fk_targets.insert(lower(&row.constraint_name), unique.clone());
            }

            if let Some(group) = groups.get_mut(&row.constraint_name) {
                group.push(row);
                continue;
            }

            let spec = match row.constraint_type.as_str() {
                // Targets are back-patched from the key map once every
                // table has been collected.
                "FOREIGN KEY" => ColumnConstraintSpec::References {
                    table: String::new(),
                    columns: Vec::new(),
                },
                "UNIQUE" => ColumnConstraintSpec::Unique { is_primary: false },
                "PRIMARY KEY" => ColumnConstraintSpec::Unique { is_primary: true },
                other => {
                    return Err(DumpError::UnknownConstraint {
                        table: table.to_string(),
                        kind: other.to_string(),
                    });
                }
            };

            column_constraints
                .entry(lower(&row.column_name))
                .or_default()
                .push(ColumnConstraint {
                    name: Some(row.constraint_name),
                    spec,
                });
        }

        let mut names: Vec<&String> = groups.keys().collect();
        names.sort();

        let mut table_constraints = Vec::new();
        for name in names {
            let group = &groups[name];
            let Some(first) = group.first() else {
                continue;
            };
            let columns: Vec<String> = group.iter().map(|r| r.column_name.clone()).collect();

            let spec = match first.constraint_type.as_str() {
                "FOREIGN KEY" => TableConstraintSpec::Referential {
                    columns,
                    key_expr: crate::ast::ReferenceKeyExpr {
                        table: String::new(),
                        columns: Vec::new(),
                    },
                },
                "UNIQUE" => TableConstraintSpec::Unique {
                    is_primary: false,
                    columns,
                },
                "PRIMARY KEY" => TableConstraintSpec::Unique {
                    is_primary: true,
                    columns,
                },
                other => {
                    return Err(DumpError::UnknownConstraint {
                        table: table.to_string(),
                        kind: other.to_string(),
                    });
                }
            };

            table_constraints.push(TableConstraint {
                name: Some(name.clone()),
                spec,
            });
        }

        Ok((column_constraints, table_constraints))
    }

    async fn indexes(&self, table: &TableDef) -> Result<Vec<CreateIndex>, DumpError> {
        let rows = self
            .client
            .query(
                "select schemaname, tablename, indexname, indexdef, tablespace \
                 from pg_indexes where tablename = $1",
                &[&table.name],
            )
            .await?;

        let mut indexes = Vec::new();
        for row in rows {
            let indexdef: String = row.get("indexdef");
            let stmt = parser::parse_index_def(&indexdef)?;

            if is_implied_by_constraint(&stmt, table) {
                tracing::debug!(index = %stmt.name, table = %table.name, "skipping constraint-implied index");
                continue;
            }
            indexes.push(stmt);
        }

        Ok(indexes)
    }
}

/// Back-patch foreign-key targets using the key map.
///
/// Each FK row carries the name of the PK/UNIQUE constraint it references;
/// that constraint's key-map entries are the referenced table and columns.
fn resolve_references(
    tables: &mut [TableDef],
    keymap: &Keymap,
    fk_targets: &HashMap<String, String>,
) -> Result<(), DumpError> {
    for table in tables.iter_mut() {
        for col in &mut table.columns {
            for con in &mut col.constraints {
                if !matches!(con.spec, ColumnConstraintSpec::References { .. }) {
                    continue;
                }
                let name = con.name.clone().unwrap_or_default();
                let targets = lookup_targets(&name, keymap, fk_targets)?;
                let [target] = targets else {
                    return Err(DumpError::UnresolvedReference(name));
                };
                if let ColumnConstraintSpec::References { table, columns } = &mut con.spec {
                    *table = target.table.clone();
                    *columns = vec![target.column.clone()];
                }
            }
        }

        for con in &mut table.constraints {
            if !matches!(con.spec, TableConstraintSpec::Referential { .. }) {
                continue;
            }
            let name = con.name.clone().unwrap_or_default();
            let targets = lookup_targets(&name, keymap, fk_targets)?;
            let Some(first) = targets.first() else {
                return Err(DumpError::UnresolvedReference(name));
            };
            if let TableConstraintSpec::Referential { key_expr, .. } = &mut con.spec {
                key_expr.table = first.table.clone();
                key_expr.columns = targets.iter().map(|t| t.column.clone()).collect();
            }
        }
    }

    Ok(())
}

fn lookup_targets<'k>(
    fk_name: &str,
    keymap: &'k Keymap,
    fk_targets: &HashMap<String, String>,
) -> Result<&'k [KeyTarget], DumpError> {
    let unique = fk_targets
        .get(&lower(fk_name))
        .ok_or_else(|| DumpError::UnresolvedReference(fk_name.to_string()))?;
    keymap
        .get(&lower(unique))
        .map(|v| v.as_slice())
        .ok_or_else(|| DumpError::UnresolvedReference(fk_name.to_string()))
}

/// Apply the size/precision/scale the column row reports on top of the
/// parsed type. `data_type` text never carries modifiers
/// (`character varying`, not `character varying(255)`).
fn enrich_type(
    data_type: Type,
    char_len: Option<i32>,
    precision: Option<i32>,
    scale: Option<i32>,
) -> Type {
    match data_type {
        Type::Varchar { .. } => Type::Varchar {
            size: char_len.map(|v| v as u32),
        },
        Type::Char { .. } => Type::Char {
            size: char_len.map(|v| v as u32),
        },
        Type::Decimal { .. } => Type::Decimal {
            precision: precision.map(|v| v as u32),
            scale: scale.map(|v| v as u32),
        },
        other => other,
    }
}

/// Rewrite `int`/`bigint` + `nextval(...)` default as the serial
/// pseudo-type with no default, undoing how PostgreSQL materializes
/// SERIAL columns.
fn fix_serial(col: &mut ColumnDef) {
    if !col.default.as_ref().is_some_and(Expr::is_sequence_call) {
        return;
    }
    let serial = match col.data_type {
        Type::Int => "serial",
        Type::BigInt => "bigserial",
        _ => return,
    };
    col.data_type = Type::Custom(serial.to_string());
    col.default = None;
}

/// An index is dropped from the dump when a unique or primary-key
/// constraint already implies it: a single-column UNIQUE index whose
/// column carries a unique constraint, or a multi-column UNIQUE index
/// matching a unique table constraint as an order-insensitive column set.
fn is_implied_by_constraint(index: &CreateIndex, table: &TableDef) -> bool {
    if !index.unique {
        return false;
    }

    if let [column] = index.columns.as_slice() {
        return table.get_column(column).is_some_and(|c| {
            c.constraints
                .iter()
                .any(|cc| matches!(cc.spec, ColumnConstraintSpec::Unique { .. }))
        });
    }

    table.constraints.iter().any(|tc| {
        matches!(&tc.spec, TableConstraintSpec::Unique { columns, .. }
            if same_column_set(&index.columns, columns))
    })
}

fn same_column_set(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a: Vec<String> = a.iter().map(|s| lower(s)).collect();
    let mut b: Vec<String> = b.iter().map(|s| lower(s)).collect();
    a.sort();
    b.sort();
    a == b
}

fn lower(s: &str) -> String {
    s.to_ascii_lowercase()
}
