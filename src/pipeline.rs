//! Planning pipeline — composes dump, diff, graph, and sort.
//!
//! The [`Pipeline`] owns the flow shared by the CLI commands: introspect
//! the live schema, diff it against the desired one, and order the
//! resulting batch so referenced objects exist before referencing ones.
//! Applying is per-statement by design — partial progress stays observable
//! instead of disappearing into a rolled-back transaction.

use thiserror::Error;
use tokio_postgres::Client;
use tokio_util::sync::CancellationToken;

use crate::ast::Statement;
use crate::catalog::reader::{CatalogReader, DumpError};
use crate::catalog::TableDef;
use crate::diff::{self, SchemaDiff, TargetSchema};
use crate::graph;
use crate::graph::toposort::{self, CycleError};
use crate::inverse::{self, InverseError};
use crate::parser::{self, ParseError};

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Dump(#[from] DumpError),

    #[error(transparent)]
    Cycle(#[from] CycleError),

    #[error("database error: {0}")]
    Db(#[from] tokio_postgres::Error),
}

/// An ordered diff batch plus the observed schema it was computed against.
/// The observed schema is what inverse synthesis recovers payloads from.
#[derive(Debug)]
pub struct Plan {
    pub diffs: Vec<SchemaDiff>,
    pub current: Vec<TableDef>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }

    /// The inverse of one diff in this plan.
    pub fn inverse_of(&self, diff: &SchemaDiff) -> Result<SchemaDiff, InverseError> {
        inverse::inverse(diff, &self.current)
    }
}

/// Parse desired-schema SQL into a [`TargetSchema`].
///
/// Only CREATE TABLE and CREATE INDEX participate; anything else in the
/// file is skipped so a pg_dump-flavored schema file still loads.
pub fn load_target_schema(sql: &str) -> Result<TargetSchema, ParseError> {
    let mut target = TargetSchema::default();

    for statement in parser::parse_statements(sql)? {
        match statement {
            Statement::CreateTable(table) => target.tables.push(table),
            Statement::CreateIndex(index) => target.indexes.push(index),
            other => {
                tracing::debug!(statement = %other, "skipping non-schema statement in target");
            }
        }
    }

    Ok(target)
}

pub struct Pipeline<'a> {
    client: &'a Client,
    cancel: CancellationToken,
}

impl<'a> Pipeline<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self {
            client,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(client: &'a Client, cancel: CancellationToken) -> Self {
        Self { client, cancel }
    }

    /// Dump the live schema, diff it against `target`, and return the
    /// batch in topological order.
    pub async fn plan(&self, target: &TargetSchema) -> Result<Plan, PlanError> {
        let reader = CatalogReader::with_cancellation(self.client, self.cancel.clone());
        let current = reader.dump().await?;

        let diffs = diff::diff(target, &current);
        let ordered = toposort::resolve(graph::build_graph(diffs))?;

        Ok(Plan {
            diffs: ordered.into_iter().map(|n| n.diff).collect(),
            current,
        })
    }

    /// Execute the plan statement by statement, in order.
    pub async fn apply(&self, plan: &Plan) -> Result<(), PlanError> {
        for diff in &plan.diffs {
            let sql = diff.to_sql();
            tracing::info!(%sql, "applying");
            self.client.batch_execute(&sql).await?;
        }
        Ok(())
    }
}
