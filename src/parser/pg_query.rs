//! pg_query AST to internal AST conversion.
//!
//! Converts the pg_query protobuf AST into the planner's [`crate::ast`]
//! model. Handles type canonicalization (pg_query reports `int4`,
//! `varchar`, ...) and constraint normalization. Statements with no
//! planner mapping become [`Statement::Ignored`] rather than errors —
//! callers decide whether that is acceptable.

use crate::ast::{
    AlterColumnOp, AlterTable, AlterTableAction, ColumnConstraint, ColumnConstraintSpec, ColumnDef,
    CreateIndex, CreateTable, DropIndex, DropTable, Expr, ReferenceKeyExpr, Statement,
    TableConstraint, TableConstraintSpec, TableElement, Type,
};
use crate::parser::ParseError;
use pg_query::NodeEnum;

/// Parse a SQL source string into internal statements.
///
/// Each SQL statement in the source converts to the most specific
/// [`Statement`] possible. A multi-action `ALTER TABLE` or a multi-target
/// `DROP TABLE` expands to one statement per action/target.
pub fn parse_statements(source: &str) -> Result<Vec<Statement>, ParseError> {
    let result = pg_query::parse(source).map_err(|e| ParseError::Sql(e.to_string()))?;

    let mut statements = Vec::new();

    for raw_stmt in &result.protobuf.stmts {
        let start = raw_stmt.stmt_location as usize;
        let end = if raw_stmt.stmt_len > 0 {
            start + raw_stmt.stmt_len as usize
        } else {
            source.len()
        };
        let raw_sql = source.get(start..end).unwrap_or("").to_string();

        match raw_stmt.stmt.as_ref().and_then(|s| s.node.as_ref()) {
            Some(node) => statements.extend(convert_node(node, &raw_sql)),
            None => statements.push(Statement::Ignored { raw_sql }),
        }
    }

    Ok(statements)
}

/// Parse a bare data-type string, e.g. `character varying` or `numeric`.
///
/// information_schema reports column types as text, not as DDL, so the
/// fragment is wrapped in a synthetic CREATE TABLE and the type is pulled
/// back out of the parsed column.
pub fn parse_data_type(input: &str) -> Result<Type, ParseError> {
    let sql = format!("CREATE TABLE _probe (_c {})", input);
    let result = pg_query::parse(&sql).map_err(|e| ParseError::Sql(e.to_string()))?;

    let column_type = result
        .protobuf
        .stmts
        .first()
        .and_then(|s| s.stmt.as_ref())
        .and_then(|s| s.node.as_ref())
        .and_then(|n| match n {
            NodeEnum::CreateStmt(create) => create.table_elts.first(),
            _ => None,
        })
        .and_then(|elt| match elt.node.as_ref() {
            Some(NodeEnum::ColumnDef(col)) => Some(convert_type(col.type_name.as_ref())),
            _ => None,
        });

    column_type.ok_or_else(|| ParseError::NotADataType {
        input: input.to_string(),
    })
}

/// Parse a bare expression string, e.g. a `column_default` value.
///
/// Wraps the fragment in `SELECT ...` and converts the single target
/// expression — the same trick [`deparse_node`] uses in reverse.
pub fn parse_expr(input: &str) -> Result<Expr, ParseError> {
    let sql = format!("SELECT {}", input);
    let result = pg_query::parse(&sql).map_err(|e| ParseError::Sql(e.to_string()))?;

    let expr = result
        .protobuf
        .stmts
        .first()
        .and_then(|s| s.stmt.as_ref())
        .and_then(|s| s.node.as_ref())
        .and_then(|n| match n {
            NodeEnum::SelectStmt(select) => select.target_list.first(),
            _ => None,
        })
        .and_then(|t| match t.node.as_ref() {
            Some(NodeEnum::ResTarget(res)) => res.val.as_deref(),
            _ => None,
        })
        .map(convert_expr);

    expr.ok_or_else(|| ParseError::NotAnExpression {
        input: input.to_string(),
    })
}

/// Parse a `pg_indexes.indexdef` value into a [`CreateIndex`].
pub fn parse_index_def(input: &str) -> Result<CreateIndex, ParseError> {
    let mut statements = parse_statements(input)?;
    match statements.pop() {
        Some(Statement::CreateIndex(idx)) if statements.is_empty() => Ok(idx),
        _ => Err(ParseError::NotAnIndex {
            input: input.to_string(),
        }),
    }
}

/// Convert one pg_query node into zero or more statements.
fn convert_node(node: &NodeEnum, raw_sql: &str) -> Vec<Statement> {
    match node {
        NodeEnum::CreateStmt(create) => vec![convert_create_table(create)],
        NodeEnum::AlterTableStmt(alter) => convert_alter_table(alter, raw_sql),
        NodeEnum::IndexStmt(idx) => vec![convert_create_index(idx)],
        NodeEnum::DropStmt(drop) => convert_drop_stmt(drop, raw_sql),
        _ => vec![Statement::Ignored {
            raw_sql: raw_sql.to_string(),
        }],
    }
}

fn convert_create_table(create: &pg_query::protobuf::CreateStmt) -> Statement {
    let name = relation_name(create.relation.as_ref());
    let mut elements = Vec::new();

    for elt in &create.table_elts {
        match elt.node.as_ref() {
            Some(NodeEnum::ColumnDef(col)) => {
                elements.push(TableElement::Column(convert_column_def(col)));
            }
            Some(NodeEnum::Constraint(con)) => {
                if let Some(tc) = convert_table_constraint(con) {
                    elements.push(TableElement::Constraint(tc));
                }
            }
            _ => {}
        }
    }

    Statement::CreateTable(CreateTable { name, elements })
}

fn convert_column_def(col: &pg_query::protobuf::ColumnDef) -> ColumnDef {
    let mut def = ColumnDef {
        name: col.colname.clone(),
        data_type: convert_type(col.type_name.as_ref()),
        default: None,
        constraints: Vec::new(),
    };

    for con_node in &col.constraints {
        let con = match con_node.node.as_ref() {
            Some(NodeEnum::Constraint(c)) => c,
            _ => continue,
        };
        let name = optional_name(&con.conname);

        match con.contype() {
            pg_query::protobuf::ConstrType::ConstrNotnull => {
                def.constraints.push(ColumnConstraint {
                    name,
                    spec: ColumnConstraintSpec::NotNull,
                });
            }
            pg_query::protobuf::ConstrType::ConstrDefault => {
                def.default = con.raw_expr.as_deref().map(convert_expr);
            }
            pg_query::protobuf::ConstrType::ConstrPrimary => {
                def.constraints.push(ColumnConstraint {
                    name,
                    spec: ColumnConstraintSpec::Unique { is_primary: true },
                });
            }
            pg_query::protobuf::ConstrType::ConstrUnique => {
                def.constraints.push(ColumnConstraint {
                    name,
                    spec: ColumnConstraintSpec::Unique { is_primary: false },
                });
            }
            pg_query::protobuf::ConstrType::ConstrForeign => {
                def.constraints.push(ColumnConstraint {
                    name,
                    spec: ColumnConstraintSpec::References {
                        table: relation_name(con.pktable.as_ref()),
                        columns: extract_string_list(&con.pk_attrs),
                    },
                });
            }
            pg_query::protobuf::ConstrType::ConstrCheck => {
                let expr = con
                    .raw_expr
                    .as_deref()
                    .map(deparse_node)
                    .unwrap_or_default();
                def.constraints.push(ColumnConstraint {
                    name,
                    spec: ColumnConstraintSpec::Check { expr },
                });
            }
            other => {
                tracing::warn!(column = %col.colname, kind = ?other, "skipping unmodelled column constraint");
            }
        }
    }

    def
}

fn convert_table_constraint(con: &pg_query::protobuf::Constraint) -> Option<TableConstraint> {
    let name = optional_name(&con.conname);

    let spec = match con.contype() {
        pg_query::protobuf::ConstrType::ConstrPrimary => TableConstraintSpec::Unique {
            is_primary: true,
            columns: extract_string_list(&con.keys),
        },
        pg_query::protobuf::ConstrType::ConstrUnique => TableConstraintSpec::Unique {
            is_primary: false,
            columns: extract_string_list(&con.keys),
        },
        pg_query::protobuf::ConstrType::ConstrForeign => TableConstraintSpec::Referential {
            columns: extract_string_list(&con.fk_attrs),
            key_expr: ReferenceKeyExpr {
                table: relation_name(con.pktable.as_ref()),
                columns: extract_string_list(&con.pk_attrs),
            },
        },
        pg_query::protobuf::ConstrType::ConstrCheck => TableConstraintSpec::Check {
            expr: con
                .raw_expr
                .as_deref()
                .map(deparse_node)
                .unwrap_or_default(),
        },
        other => {
            tracing::warn!(kind = ?other, "skipping unmodelled table constraint");
            return None;
        }
    };

    Some(TableConstraint { name, spec })
}

fn convert_alter_table(
    alter: &pg_query::protobuf::AlterTableStmt,
    raw_sql: &str,
) -> Vec<Statement> {
    // ALTER INDEX arrives as an AlterTableStmt with objtype = ObjectIndex.
    if alter.objtype() != pg_query::protobuf::ObjectType::ObjectTable {
        return vec![Statement::Ignored {
            raw_sql: raw_sql.to_string(),
        }];
    }

    let table = relation_name(alter.relation.as_ref());
    let mut statements = Vec::new();

    for cmd_node in &alter.cmds {
        let cmd = match cmd_node.node.as_ref() {
            Some(NodeEnum::AlterTableCmd(c)) => c,
            _ => continue,
        };

        match convert_alter_cmd(cmd) {
            Some(action) => statements.push(Statement::AlterTable(AlterTable {
                table: table.clone(),
                action,
            })),
            None => statements.push(Statement::Ignored {
                raw_sql: raw_sql.to_string(),
            }),
        }
    }

    statements
}

/// Map a single ALTER TABLE command. Returns `None` for commands the
/// planner does not model (SET STORAGE, OWNER TO, triggers, ...).
fn convert_alter_cmd(cmd: &pg_query::protobuf::AlterTableCmd) -> Option<AlterTableAction> {
    match cmd.subtype() {
        pg_query::protobuf::AlterTableType::AtAddColumn => {
            match cmd.def.as_ref().and_then(|d| d.node.as_ref()) {
                Some(NodeEnum::ColumnDef(col)) => Some(AlterTableAction::AddColumn {
                    column: convert_column_def(col),
                }),
                _ => None,
            }
        }
        pg_query::protobuf::AlterTableType::AtDropColumn => Some(AlterTableAction::DropColumn {
            name: cmd.name.clone(),
        }),
        pg_query::protobuf::AlterTableType::AtAddConstraint => {
            match cmd.def.as_ref().and_then(|d| d.node.as_ref()) {
                Some(NodeEnum::Constraint(con)) => convert_table_constraint(con)
                    .map(|constraint| AlterTableAction::AddConstraint { constraint }),
                _ => None,
            }
        }
        pg_query::protobuf::AlterTableType::AtDropConstraint => {
            Some(AlterTableAction::DropConstraint {
                name: cmd.name.clone(),
            })
        }
        pg_query::protobuf::AlterTableType::AtAlterColumnType => {
            let data_type = cmd
                .def
                .as_ref()
                .and_then(|d| d.node.as_ref())
                .and_then(|n| match n {
                    NodeEnum::ColumnDef(col) => Some(convert_type(col.type_name.as_ref())),
                    _ => None,
                })?;
            Some(AlterTableAction::AlterColumn {
                column: cmd.name.clone(),
                op: AlterColumnOp::SetType { data_type },
            })
        }
        pg_query::protobuf::AlterTableType::AtSetNotNull => Some(AlterTableAction::AlterColumn {
            column: cmd.name.clone(),
            op: AlterColumnOp::SetNotNull,
        }),
        pg_query::protobuf::AlterTableType::AtDropNotNull => Some(AlterTableAction::AlterColumn {
            column: cmd.name.clone(),
            op: AlterColumnOp::DropNotNull,
        }),
        pg_query::protobuf::AlterTableType::AtColumnDefault => {
            let op = match cmd.def.as_deref() {
                Some(node) => node.node.as_ref().map(|n| AlterColumnOp::SetDefault {
                    default: convert_expr_enum(n),
                })?,
                None => AlterColumnOp::DropDefault,
            };
            Some(AlterTableAction::AlterColumn {
                column: cmd.name.clone(),
                op,
            })
        }
        _ => None,
    }
}

fn convert_create_index(idx: &pg_query::protobuf::IndexStmt) -> Statement {
    let columns = idx
        .index_params
        .iter()
        .filter_map(|p| match p.node.as_ref() {
            Some(NodeEnum::IndexElem(elem)) => {
                if elem.name.is_empty() {
                    // Expression index element, kept as deparsed SQL text.
                    elem.expr.as_deref().map(deparse_node)
                } else {
                    Some(elem.name.clone())
                }
            }
            _ => None,
        })
        .collect();

    Statement::CreateIndex(CreateIndex {
        name: idx.idxname.clone(),
        table: relation_name(idx.relation.as_ref()),
        columns,
        unique: idx.unique,
        method: optional_name(&idx.access_method),
    })
}

/// Expand `DROP TABLE a, b` / `DROP INDEX i, j` into one statement per target.
fn convert_drop_stmt(drop: &pg_query::protobuf::DropStmt, raw_sql: &str) -> Vec<Statement> {
    let names = drop.objects.iter().filter_map(|obj| match obj.node.as_ref() {
        Some(NodeEnum::List(list)) => list.items.iter().rev().find_map(|i| match i.node.as_ref() {
            Some(NodeEnum::String(s)) => Some(s.sval.clone()),
            _ => None,
        }),
        _ => None,
    });

    match drop.remove_type() {
        pg_query::protobuf::ObjectType::ObjectTable => names
            .map(|name| {
                Statement::DropTable(DropTable {
                    name,
                    if_exists: drop.missing_ok,
                })
            })
            .collect(),
        pg_query::protobuf::ObjectType::ObjectIndex => names
            .map(|name| Statement::DropIndex(DropIndex { name }))
            .collect(),
        _ => vec![Statement::Ignored {
            raw_sql: raw_sql.to_string(),
        }],
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Map a pg_query `TypeName` to the internal [`Type`].
///
/// Canonical name extraction takes the LAST element of `TypeName.names[]`,
/// which normalizes `pg_catalog.`-qualified aliases automatically. The
/// serial pseudo-types are kept as opaque custom types — that is also the
/// shape the catalog reader reconstructs for sequence-backed columns.
fn convert_type(tn: Option<&pg_query::protobuf::TypeName>) -> Type {
    let Some(tn) = tn else {
        return Type::Custom("unknown".to_string());
    };

    let canonical = tn
        .names
        .iter()
        .rev()
        .find_map(|n| match n.node.as_ref() {
            Some(NodeEnum::String(s)) => Some(s.sval.to_lowercase()),
            _ => None,
        })
        .unwrap_or_else(|| "unknown".to_string());

    let mods = extract_type_modifiers(&tn.typmods);
    let size = mods.first().map(|m| *m as u32);

    match canonical.as_str() {
        "int2" | "smallint" => Type::SmallInt,
        "int4" | "int" | "integer" => Type::Int,
        "int8" | "bigint" => Type::BigInt,
        "float4" | "real" => Type::Real,
        "float8" => Type::Double,
        "bool" | "boolean" => Type::Boolean,
        "text" => Type::Text,
        "varchar" => Type::Varchar { size },
        "bpchar" | "char" | "character" => Type::Char { size },
        "numeric" | "decimal" => Type::Decimal {
            precision: size,
            scale: mods.get(1).map(|m| *m as u32),
        },
        "date" => Type::Date,
        "time" | "timetz" => Type::Time,
        "timestamp" => Type::Timestamp { with_tz: false },
        "timestamptz" => Type::Timestamp { with_tz: true },
        "uuid" => Type::Uuid,
        "json" => Type::Json,
        "jsonb" => Type::Jsonb,
        "bytea" => Type::Bytea,
        other => Type::Custom(other.to_string()),
    }
}

/// Extract integer modifiers from `TypeName.typmods[]`:
/// `varchar(100)` → `[100]`, `numeric(10,2)` → `[10, 2]`.
fn extract_type_modifiers(typmods: &[pg_query::protobuf::Node]) -> Vec<i64> {
    let mut mods = Vec::new();
    for node in typmods {
        match node.node.as_ref() {
            Some(NodeEnum::Integer(i)) => mods.push(i.ival as i64),
            Some(NodeEnum::AConst(ac)) => {
                if let Some(pg_query::protobuf::a_const::Val::Ival(i)) = &ac.val {
                    mods.push(i.ival as i64);
                }
            }
            _ => {}
        }
    }
    mods
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

fn convert_expr(node: &pg_query::protobuf::Node) -> Expr {
    match node.node.as_ref() {
        Some(n) => convert_expr_enum(n),
        None => Expr::Null,
    }
}

fn convert_expr_enum(node: &NodeEnum) -> Expr {
    match node {
        NodeEnum::AConst(ac) => match ac.val.as_ref() {
            Some(pg_query::protobuf::a_const::Val::Ival(i)) => Expr::Number(i.ival.to_string()),
            Some(pg_query::protobuf::a_const::Val::Fval(f)) => Expr::Number(f.fval.clone()),
            Some(pg_query::protobuf::a_const::Val::Sval(s)) => Expr::StringLit(s.sval.clone()),
            Some(pg_query::protobuf::a_const::Val::Boolval(b)) => Expr::Bool(b.boolval),
            Some(pg_query::protobuf::a_const::Val::Bsval(s)) => Expr::Number(s.bsval.clone()),
            None => Expr::Null,
        },
        NodeEnum::FuncCall(fc) => {
            let name = fc
                .funcname
                .iter()
                .rev()
                .find_map(|n| match n.node.as_ref() {
                    Some(NodeEnum::String(s)) => Some(s.sval.clone()),
                    _ => None,
                })
                .unwrap_or_else(|| "unknown".to_string());
            let args = fc.args.iter().map(deparse_node).collect();
            Expr::FunctionCall { name, args }
        }
        other => Expr::Raw(deparse_enum(other)),
    }
}

/// Deparse an arbitrary expression node back to SQL text.
///
/// pg_query can only deparse whole statements, so the node is grafted into
/// the target list of a trivial SELECT and the prefix stripped afterwards.
fn deparse_node(node: &pg_query::protobuf::Node) -> String {
    match node.node.as_ref() {
        Some(n) => deparse_enum(n),
        None => "NULL".to_string(),
    }
}

fn deparse_enum(node: &NodeEnum) -> String {
    let mut parse_result = match pg_query::parse("SELECT NULL") {
        Ok(pr) => pr,
        Err(_) => return format!("{:?}", node),
    };

    if let Some(stmt) = parse_result.protobuf.stmts.first_mut()
        && let Some(ref mut stmt_node) = stmt.stmt
        && let Some(NodeEnum::SelectStmt(ref mut select)) = stmt_node.node
        && let Some(first_target) = select.target_list.first_mut()
        && let Some(NodeEnum::ResTarget(ref mut res)) = first_target.node
    {
        res.val = Some(Box::new(pg_query::protobuf::Node {
            node: Some(node.clone()),
        }));
    }

    match pg_query::deparse(&parse_result.protobuf) {
        Ok(sql) => sql.strip_prefix("SELECT ").unwrap_or(&sql).to_string(),
        Err(_) => format!("{:?}", node),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Unqualified relation name. The engine plans within a single schema, so
/// `public.users` and `users` are the same object.
fn relation_name(rel: Option<&pg_query::protobuf::RangeVar>) -> String {
    match rel {
        Some(r) => r.relname.clone(),
        None => "unknown".to_string(),
    }
}

fn extract_string_list(nodes: &[pg_query::protobuf::Node]) -> Vec<String> {
    nodes
        .iter()
        .filter_map(|n| match n.node.as_ref() {
            Some(NodeEnum::String(s)) => Some(s.sval.clone()),
            _ => None,
        })
        .collect()
}

fn optional_name(name: &str) -> Option<String> {
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(sql: &str) -> Statement {
        let mut statements = parse_statements(sql).expect("parse failed");
        assert_eq!(statements.len(), 1, "expected one statement from {sql:?}");
        statements.pop().unwrap()
    }

    #[test]
    fn test_parse_create_table() {
        let stmt = parse_one("create table test1(id int primary key, name varchar not null);");
        let Statement::CreateTable(ct) = stmt else {
            panic!("expected CreateTable, got {stmt:?}");
        };
        assert_eq!(ct.name, "test1");
        assert_eq!(ct.elements.len(), 2);

        let id = ct.columns().next().unwrap();
        assert_eq!(id.name, "id");
        assert_eq!(id.data_type, Type::Int);
        assert_eq!(
            id.constraints[0].spec,
            ColumnConstraintSpec::Unique { is_primary: true }
        );
    }

    #[test]
    fn test_parse_create_table_roundtrips() {
        let stmt = parse_one("CREATE TABLE test1 (id int PRIMARY KEY, name varchar NOT NULL)");
        assert_eq!(
            stmt.to_sql(),
            "CREATE TABLE test1 (id int PRIMARY KEY, name varchar NOT NULL)"
        );
    }

    #[test]
    fn test_parse_serial_is_custom() {
        let stmt = parse_one("create table t(id serial primary key);");
        let Statement::CreateTable(ct) = stmt else {
            panic!("expected CreateTable");
        };
        assert_eq!(
            ct.columns().next().unwrap().data_type,
            Type::Custom("serial".into())
        );
    }

    #[test]
    fn test_parse_column_references() {
        let stmt = parse_one("ALTER TABLE test2 ADD COLUMN t1_ref int REFERENCES test1(id)");
        let Statement::AlterTable(at) = stmt else {
            panic!("expected AlterTable");
        };
        assert_eq!(at.table, "test2");
        let AlterTableAction::AddColumn { column } = &at.action else {
            panic!("expected AddColumn");
        };
        assert_eq!(
            column.constraints[0].spec,
            ColumnConstraintSpec::References {
                table: "test1".into(),
                columns: vec!["id".into()],
            }
        );
        assert_eq!(
            at.to_string(),
            "ALTER TABLE test2 ADD COLUMN t1_ref int REFERENCES test1(id)"
        );
    }

    #[test]
    fn test_parse_table_constraint() {
        let stmt = parse_one(
            "CREATE TABLE test3 (id int primary key, t2_ref int, \
             CONSTRAINT t2_ref FOREIGN KEY(t2_ref) REFERENCES test2(id));",
        );
        let Statement::CreateTable(ct) = stmt else {
            panic!("expected CreateTable");
        };
        let constraint = ct
            .elements
            .iter()
            .find_map(|e| match e {
                TableElement::Constraint(c) => Some(c),
                _ => None,
            })
            .expect("missing table constraint");
        assert_eq!(constraint.name.as_deref(), Some("t2_ref"));
        assert_eq!(
            constraint.spec,
            TableConstraintSpec::Referential {
                columns: vec!["t2_ref".into()],
                key_expr: ReferenceKeyExpr {
                    table: "test2".into(),
                    columns: vec!["id".into()],
                },
            }
        );
    }

    #[test]
    fn test_parse_alter_column_variants() {
        let cases = [
            (
                "ALTER TABLE t ALTER COLUMN name TYPE varchar",
                AlterColumnOp::SetType {
                    data_type: Type::Varchar { size: None },
                },
            ),
            ("ALTER TABLE t ALTER COLUMN name SET NOT NULL", AlterColumnOp::SetNotNull),
            ("ALTER TABLE t ALTER COLUMN name DROP NOT NULL", AlterColumnOp::DropNotNull),
            (
                "ALTER TABLE t ALTER COLUMN id SET DEFAULT 1",
                AlterColumnOp::SetDefault {
                    default: Expr::Number("1".into()),
                },
            ),
            ("ALTER TABLE t ALTER COLUMN id DROP DEFAULT", AlterColumnOp::DropDefault),
        ];

        for (sql, expected) in cases {
            let Statement::AlterTable(at) = parse_one(sql) else {
                panic!("expected AlterTable from {sql:?}");
            };
            let AlterTableAction::AlterColumn { op, .. } = at.action else {
                panic!("expected AlterColumn from {sql:?}");
            };
            assert_eq!(op, expected, "for {sql:?}");
        }
    }

    #[test]
    fn test_parse_drop_statements() {
        assert_eq!(
            parse_one("DROP TABLE test2;"),
            Statement::DropTable(DropTable {
                name: "test2".into(),
                if_exists: false,
            })
        );
        assert_eq!(
            parse_one("DROP INDEX idx_users_email;"),
            Statement::DropIndex(DropIndex {
                name: "idx_users_email".into(),
            })
        );
    }

    #[test]
    fn test_parse_multi_target_drop() {
        let statements = parse_statements("DROP TABLE IF EXISTS a, b;").unwrap();
        assert_eq!(statements.len(), 2);
        assert!(matches!(
            &statements[0],
            Statement::DropTable(DropTable { name, if_exists: true }) if name == "a"
        ));
    }

    #[test]
    fn test_parse_index_def_from_catalog() {
        let idx = parse_index_def("CREATE UNIQUE INDEX test1_pkey ON public.test1 USING btree (id)")
            .unwrap();
        assert_eq!(idx.name, "test1_pkey");
        assert_eq!(idx.table, "test1");
        assert_eq!(idx.columns, vec!["id".to_string()]);
        assert!(idx.unique);
        assert_eq!(idx.method.as_deref(), Some("btree"));
    }

    #[test]
    fn test_parse_data_types() {
        assert_eq!(parse_data_type("integer").unwrap(), Type::Int);
        assert_eq!(parse_data_type("bigint").unwrap(), Type::BigInt);
        assert_eq!(
            parse_data_type("character varying").unwrap(),
            Type::Varchar { size: None }
        );
        assert_eq!(
            parse_data_type("timestamp with time zone").unwrap(),
            Type::Timestamp { with_tz: true }
        );
        assert_eq!(
            parse_data_type("numeric").unwrap(),
            Type::Decimal { precision: None, scale: None }
        );
        assert_eq!(parse_data_type("double precision").unwrap(), Type::Double);
    }

    #[test]
    fn test_parse_expr_shapes() {
        assert_eq!(parse_expr("1").unwrap(), Expr::Number("1".into()));
        assert_eq!(parse_expr("'active'").unwrap(), Expr::StringLit("active".into()));
        assert_eq!(parse_expr("true").unwrap(), Expr::Bool(true));

        let nextval = parse_expr("nextval('test1_id_seq'::regclass)").unwrap();
        assert!(nextval.is_sequence_call(), "got {nextval:?}");

        let now = parse_expr("now()").unwrap();
        assert_eq!(
            now,
            Expr::FunctionCall { name: "now".into(), args: vec![] }
        );
    }

    #[test]
    fn test_unmapped_statement_is_ignored() {
        let stmt = parse_one("GRANT SELECT ON test1 TO reader;");
        assert!(matches!(stmt, Statement::Ignored { .. }));
    }
}
