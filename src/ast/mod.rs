//! Internal SQL AST for the DDL subset the engine plans with.
//!
//! The AST decouples the planner from the SQL parser. It represents only
//! the statements the engine diffs and emits — CREATE/DROP TABLE,
//! ALTER TABLE, CREATE/DROP INDEX — not the full PostgreSQL grammar.
//! Every node renders itself back to SQL via [`fmt::Display`] / [`to_sql`].
//!
//! [`to_sql`]: Statement::to_sql

use std::fmt;

/// A parsed SQL statement mapped to a high-level DDL operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTable),
    AlterTable(AlterTable),
    CreateIndex(CreateIndex),
    DropTable(DropTable),
    DropIndex(DropIndex),
    /// SQL that parsed successfully but has no planner mapping
    /// (e.g., GRANT, COMMENT ON, DML). Not an error at parse time.
    Ignored { raw_sql: String },
}

impl Statement {
    pub fn to_sql(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::CreateTable(s) => s.fmt(f),
            Statement::AlterTable(s) => s.fmt(f),
            Statement::CreateIndex(s) => s.fmt(f),
            Statement::DropTable(s) => s.fmt(f),
            Statement::DropIndex(s) => s.fmt(f),
            Statement::Ignored { raw_sql } => write!(f, "{}", raw_sql.trim()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: String,
    pub elements: Vec<TableElement>,
}

impl CreateTable {
    /// Iterator over the column definitions, skipping table constraints.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.elements.iter().filter_map(|e| match e {
            TableElement::Column(c) => Some(c),
            TableElement::Constraint(_) => None,
        })
    }
}

impl fmt::Display for CreateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE TABLE {} (", self.name)?;
        for (i, elem) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            elem.fmt(f)?;
        }
        write!(f, ")")
    }
}

/// One element of a CREATE TABLE body: a column or a table-level constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum TableElement {
    Column(ColumnDef),
    Constraint(TableConstraint),
}

impl fmt::Display for TableElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableElement::Column(c) => c.fmt(f),
            TableElement::Constraint(c) => c.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: Type,
    pub default: Option<Expr>,
    pub constraints: Vec<ColumnConstraint>,
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)?;
        if let Some(default) = &self.default {
            write!(f, " DEFAULT {}", default)?;
        }
        for c in &self.constraints {
            write!(f, " {}", c)?;
        }
        Ok(())
    }
}

/// A constraint attached to a single column, optionally named.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnConstraint {
    pub name: Option<String>,
    pub spec: ColumnConstraintSpec,
}

impl ColumnConstraint {
    pub fn unnamed(spec: ColumnConstraintSpec) -> Self {
        Self { name: None, spec }
    }
}

impl fmt::Display for ColumnConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "CONSTRAINT {} ", name)?;
        }
        self.spec.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnConstraintSpec {
    NotNull,
    Unique {
        is_primary: bool,
    },
    References {
        table: String,
        columns: Vec<String>,
    },
    Check {
        expr: String,
    },
}

impl fmt::Display for ColumnConstraintSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnConstraintSpec::NotNull => write!(f, "NOT NULL"),
            ColumnConstraintSpec::Unique { is_primary: true } => write!(f, "PRIMARY KEY"),
            ColumnConstraintSpec::Unique { is_primary: false } => write!(f, "UNIQUE"),
            ColumnConstraintSpec::References { table, columns } => {
                write!(f, "REFERENCES {}({})", table, columns.join(", "))
            }
            ColumnConstraintSpec::Check { expr } => write!(f, "CHECK ({})", expr),
        }
    }
}

/// A table-level (usually multi-column) constraint, optionally named.
#[derive(Debug, Clone, PartialEq)]
pub struct TableConstraint {
    pub name: Option<String>,
    pub spec: TableConstraintSpec,
}

impl fmt::Display for TableConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "CONSTRAINT {} ", name)?;
        }
        self.spec.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraintSpec {
    Unique {
        is_primary: bool,
        columns: Vec<String>,
    },
    Referential {
        columns: Vec<String>,
        key_expr: ReferenceKeyExpr,
    },
    Check {
        expr: String,
    },
}

impl fmt::Display for TableConstraintSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableConstraintSpec::Unique {
                is_primary: true,
                columns,
            } => write!(f, "PRIMARY KEY({})", columns.join(", ")),
            TableConstraintSpec::Unique {
                is_primary: false,
                columns,
            } => write!(f, "UNIQUE({})", columns.join(", ")),
            TableConstraintSpec::Referential { columns, key_expr } => {
                write!(f, "FOREIGN KEY({}) {}", columns.join(", "), key_expr)
            }
            TableConstraintSpec::Check { expr } => write!(f, "CHECK ({})", expr),
        }
    }
}

/// The referenced side of a foreign-key constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceKeyExpr {
    pub table: String,
    pub columns: Vec<String>,
}

impl fmt::Display for ReferenceKeyExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "REFERENCES {}({})", self.table, self.columns.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterTable {
    pub table: String,
    pub action: AlterTableAction,
}

impl fmt::Display for AlterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ALTER TABLE {} {}", self.table, self.action)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterTableAction {
    AddColumn { column: ColumnDef },
    DropColumn { name: String },
    AddConstraint { constraint: TableConstraint },
    DropConstraint { name: String },
    AlterColumn { column: String, op: AlterColumnOp },
}

impl fmt::Display for AlterTableAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlterTableAction::AddColumn { column } => write!(f, "ADD COLUMN {}", column),
            AlterTableAction::DropColumn { name } => write!(f, "DROP COLUMN {}", name),
            AlterTableAction::AddConstraint { constraint } => write!(f, "ADD {}", constraint),
            AlterTableAction::DropConstraint { name } => write!(f, "DROP CONSTRAINT {}", name),
            AlterTableAction::AlterColumn { column, op } => {
                write!(f, "ALTER COLUMN {} {}", column, op)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterColumnOp {
    SetType { data_type: Type },
    SetNotNull,
    DropNotNull,
    SetDefault { default: Expr },
    DropDefault,
}

impl fmt::Display for AlterColumnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlterColumnOp::SetType { data_type } => write!(f, "TYPE {}", data_type),
            AlterColumnOp::SetNotNull => write!(f, "SET NOT NULL"),
            AlterColumnOp::DropNotNull => write!(f, "DROP NOT NULL"),
            AlterColumnOp::SetDefault { default } => write!(f, "SET DEFAULT {}", default),
            AlterColumnOp::DropDefault => write!(f, "DROP DEFAULT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndex {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub unique: bool,
    /// Access method from `USING`, e.g. `btree`. Omitted when not written.
    pub method: Option<String>,
}

impl fmt::Display for CreateIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE ")?;
        if self.unique {
            write!(f, "UNIQUE ")?;
        }
        write!(f, "INDEX {} ON {}", self.name, self.table)?;
        if let Some(method) = &self.method {
            write!(f, " USING {}", method)?;
        }
        write!(f, " ({})", self.columns.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropTable {
    pub name: String,
    pub if_exists: bool,
}

impl fmt::Display for DropTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DROP TABLE ")?;
        if self.if_exists {
            write!(f, "IF EXISTS ")?;
        }
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropIndex {
    pub name: String,
}

impl fmt::Display for DropIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DROP INDEX {}", self.name)
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A column data type.
///
/// Built-in types compare structurally. [`Type::Custom`] is opaque — two
/// custom types are the same iff their names match case-insensitively,
/// which callers must check via [`Type::equivalent`].
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    SmallInt,
    Int,
    BigInt,
    Real,
    Double,
    Boolean,
    Text,
    Varchar { size: Option<u32> },
    Char { size: Option<u32> },
    Decimal { precision: Option<u32>, scale: Option<u32> },
    Date,
    Time,
    Timestamp { with_tz: bool },
    Uuid,
    Json,
    Jsonb,
    Bytea,
    Custom(String),
}

impl Type {
    /// Structural equality with the two opaque-type carve-outs:
    /// custom types compare by case-insensitive name, and the serial
    /// pseudo-types are interchangeable with their backing integer type
    /// (PostgreSQL materializes `serial` as `int` + sequence default, and
    /// there is no `ALTER COLUMN ... TYPE serial`).
    pub fn equivalent(&self, other: &Type) -> bool {
        use Type::*;
        match (self, other) {
            (Custom(a), Custom(b)) => a.eq_ignore_ascii_case(b),
            (Custom(c), Int) | (Int, Custom(c)) => c.eq_ignore_ascii_case("serial"),
            (Custom(c), BigInt) | (BigInt, Custom(c)) => c.eq_ignore_ascii_case("bigserial"),
            (Custom(c), SmallInt) | (SmallInt, Custom(c)) => c.eq_ignore_ascii_case("smallserial"),
            _ => self == other,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::SmallInt => write!(f, "smallint"),
            Type::Int => write!(f, "int"),
            Type::BigInt => write!(f, "bigint"),
            Type::Real => write!(f, "real"),
            Type::Double => write!(f, "double precision"),
            Type::Boolean => write!(f, "boolean"),
            Type::Text => write!(f, "text"),
            Type::Varchar { size: Some(n) } => write!(f, "varchar({})", n),
            Type::Varchar { size: None } => write!(f, "varchar"),
            Type::Char { size: Some(n) } => write!(f, "char({})", n),
            Type::Char { size: None } => write!(f, "char"),
            Type::Decimal { precision, scale } => match (precision, scale) {
                (Some(p), Some(s)) => write!(f, "numeric({}, {})", p, s),
                (Some(p), None) => write!(f, "numeric({})", p),
                _ => write!(f, "numeric"),
            },
            Type::Date => write!(f, "date"),
            Type::Time => write!(f, "time"),
            Type::Timestamp { with_tz: true } => write!(f, "timestamp with time zone"),
            Type::Timestamp { with_tz: false } => write!(f, "timestamp"),
            Type::Uuid => write!(f, "uuid"),
            Type::Json => write!(f, "json"),
            Type::Jsonb => write!(f, "jsonb"),
            Type::Bytea => write!(f, "bytea"),
            Type::Custom(name) => write!(f, "{}", name),
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

/// A default-value expression.
///
/// Only the shapes the planner needs are modelled; anything else is kept
/// as deparsed SQL text and re-emitted verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(String),
    StringLit(String),
    Bool(bool),
    Null,
    /// A function call; arguments are kept as deparsed SQL text.
    FunctionCall { name: String, args: Vec<String> },
    /// An expression with no dedicated shape, as deparsed SQL text.
    Raw(String),
}

impl Expr {
    /// True for `nextval(...)` defaults, i.e. a sequence-backed column.
    pub fn is_sequence_call(&self) -> bool {
        matches!(self, Expr::FunctionCall { name, .. } if name.eq_ignore_ascii_case("nextval"))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::StringLit(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Expr::Bool(true) => write!(f, "TRUE"),
            Expr::Bool(false) => write!(f, "FALSE"),
            Expr::Null => write!(f, "NULL"),
            Expr::FunctionCall { name, args } => write!(f, "{}({})", name, args.join(", ")),
            Expr::Raw(s) => write!(f, "{}", s),
        }
    }
}

// ---------------------------------------------------------------------------
// Test builders — centralise AST construction so adding a field only
// requires changing one place.
// ---------------------------------------------------------------------------

#[cfg(test)]
impl ColumnDef {
    /// Minimal column: nullable, no default, no constraints.
    pub fn test(name: impl Into<String>, data_type: Type) -> Self {
        Self {
            name: name.into(),
            data_type,
            default: None,
            constraints: vec![],
        }
    }

    pub fn with_default(mut self, default: Expr) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_not_null(mut self) -> Self {
        self.constraints
            .push(ColumnConstraint::unnamed(ColumnConstraintSpec::NotNull));
        self
    }

    pub fn with_primary_key(mut self) -> Self {
        self.constraints
            .push(ColumnConstraint::unnamed(ColumnConstraintSpec::Unique {
                is_primary: true,
            }));
        self
    }

    pub fn with_references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.constraints
            .push(ColumnConstraint::unnamed(ColumnConstraintSpec::References {
                table: table.into(),
                columns: vec![column.into()],
            }));
        self
    }
}

#[cfg(test)]
impl CreateTable {
    /// Minimal CREATE TABLE: no elements.
    pub fn test(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elements: vec![],
        }
    }

    pub fn with_columns(mut self, columns: Vec<ColumnDef>) -> Self {
        self.elements
            .extend(columns.into_iter().map(TableElement::Column));
        self
    }

    pub fn with_constraint(mut self, constraint: TableConstraint) -> Self {
        self.elements.push(TableElement::Constraint(constraint));
        self
    }
}
