//! Validation and selective commit of an approval round.

use super::{ApprovalBatch, ApprovalError, ApprovalItem, ApprovalItemId, Decision, DecisionSet};
use crate::changeset::TableChangeset;
use crate::context::{ExecutionContext, Phase};
use crate::error::{Result, StageError};
use crate::results::ResultsPayload;
use serde::{Deserialize, Serialize};
use stagecraft_catalog::{Table, Value};
use tracing::{info, warn};

/// What committing one item did to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitEffect {
    Created,
    Replaced,
    Dropped,
    Untouched,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub item: ApprovalItemId,
    pub table: String,
    pub approved: usize,
    pub rejected: usize,
    pub pending: usize,
    pub effect: CommitEffect,
}

/// Summary of a committed approval round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReport {
    pub batch: String,
    pub stage: String,
    pub items: Vec<ItemOutcome>,
}

impl CommitReport {
    /// Whether any table changed.
    pub fn changed(&self) -> bool {
        self.items
            .iter()
            .any(|i| i.effect != CommitEffect::Untouched)
    }
}

/// Outcome of resolving a pending round: the commit report plus the results
/// deferred when the round was opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalResponse {
    pub report: CommitReport,
    pub results: Option<ResultsPayload>,
}

/// Apply `decisions` to a copy of `batch`.
///
/// Every decision is checked before anything is returned: one key naming an
/// unknown item or row fails the whole set. Fields the submission omits stay
/// `Pending`.
pub fn apply_decisions(
    batch: &ApprovalBatch,
    decisions: &DecisionSet,
) -> std::result::Result<ApprovalBatch, ApprovalError> {
    let mut decided = batch.clone();
    for (key, decision) in decisions.iter() {
        let item = decided
            .item_mut(key.item)
            .ok_or(ApprovalError::UnknownItem(key.item))?;
        item.decide(*key, *decision)?;
    }
    Ok(decided)
}

/// Commit the approved subset of a decided batch.
///
/// The changeset is cleared and re-staged from the batch, so mutations made
/// after the batch was frozen never reach the catalog.
pub fn commit(batch: &ApprovalBatch, tables: &mut TableChangeset) -> Result<CommitReport> {
    tables.clear();
    let staged = tables
        .refresh_base()
        .map_err(StageError::from)
        .and_then(|()| stage_approved(batch, tables));
    let outcomes = match staged {
        Ok(outcomes) => outcomes,
        Err(e) => {
            tables.clear();
            return Err(e);
        }
    };

    if let Err(e) = tables.flush() {
        tables.clear();
        return Err(e.into());
    }

    let report = CommitReport {
        batch: batch.id.to_string(),
        stage: batch.stage.clone(),
        items: outcomes,
    };
    info!(
        batch = %report.batch,
        stage = %report.stage,
        items = report.items.len(),
        changed = report.changed(),
        "Committed approval round"
    );
    Ok(report)
}

/// Stage the approved subset of every item.
fn stage_approved(batch: &ApprovalBatch, tables: &mut TableChangeset) -> Result<Vec<ItemOutcome>> {
    let mut outcomes = Vec::with_capacity(batch.items.len());
    for item in &batch.items {
        let outcome = match item {
            ApprovalItem::TableCreate {
                id,
                table,
                rows,
                decisions,
            } => {
                let approved = item.approved_rows();
                let effect = if approved.is_empty() {
                    CommitEffect::Untouched
                } else {
                    let effect = if tables.is_persisted(table) {
                        CommitEffect::Replaced
                    } else {
                        CommitEffect::Created
                    };
                    tables.set(table.clone(), rows.select_rows(&approved)?);
                    effect
                };
                ItemOutcome {
                    item: *id,
                    table: table.clone(),
                    approved: approved.len(),
                    rejected: count(decisions, Decision::Rejected),
                    pending: count(decisions, Decision::Pending),
                    effect,
                }
            }
            ApprovalItem::RowAddition {
                id,
                table,
                rows,
                decisions,
                ..
            } => {
                let approved = item.approved_rows();
                let effect = if approved.is_empty() {
                    CommitEffect::Untouched
                } else if tables.is_persisted(table) {
                    // Appended to whatever the table holds now
                    let mut current = tables.get(table)?.into_owned();
                    for index in &approved {
                        current.push_row(rows.rows()[*index].clone())?;
                    }
                    tables.set(table.clone(), current);
                    CommitEffect::Replaced
                } else {
                    warn!(table = %table, "Table removed before its rows were approved");
                    tables.set(table.clone(), rows.select_rows(&approved)?);
                    CommitEffect::Created
                };
                ItemOutcome {
                    item: *id,
                    table: table.clone(),
                    approved: approved.len(),
                    rejected: count(decisions, Decision::Rejected),
                    pending: count(decisions, Decision::Pending),
                    effect,
                }
            }
            ApprovalItem::SchemaChange {
                id,
                table,
                added_columns,
                rows,
                decisions,
            } => {
                let effect = if item.approved_rows().is_empty() {
                    CommitEffect::Untouched
                } else {
                    let effect = if tables.is_persisted(table) {
                        CommitEffect::Replaced
                    } else {
                        CommitEffect::Created
                    };
                    tables.set(table.clone(), blank_unapproved(rows, added_columns, decisions)?);
                    effect
                };
                ItemOutcome {
                    item: *id,
                    table: table.clone(),
                    approved: count(decisions, Decision::Approved),
                    rejected: count(decisions, Decision::Rejected),
                    pending: count(decisions, Decision::Pending),
                    effect,
                }
            }
            ApprovalItem::TableDelete {
                id,
                table,
                decision,
                ..
            } => {
                let effect = match decision {
                    Decision::Approved if tables.is_persisted(table) => {
                        tables.delete(table)?;
                        CommitEffect::Dropped
                    }
                    Decision::Approved => {
                        warn!(table = %table, "Approved delete of a table that no longer exists");
                        CommitEffect::Untouched
                    }
                    Decision::Rejected | Decision::Pending => CommitEffect::Untouched,
                };
                ItemOutcome {
                    item: *id,
                    table: table.clone(),
                    approved: usize::from(*decision == Decision::Approved),
                    rejected: usize::from(*decision == Decision::Rejected),
                    pending: usize::from(*decision == Decision::Pending),
                    effect,
                }
            }
        };
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

/// Copy of `rows` with the `added` cells of every unapproved row set to null.
fn blank_unapproved(rows: &Table, added: &[String], decisions: &[Decision]) -> Result<Table> {
    let blank: Vec<usize> = added.iter().filter_map(|c| rows.column_index(c)).collect();
    let mut out = Table::new(rows.columns().iter().cloned())?;
    for (row, decision) in rows.rows().iter().zip(decisions) {
        let mut row = row.clone();
        if *decision != Decision::Approved {
            for &col in &blank {
                row[col] = Value::Null;
            }
        }
        out.push_row(row)?;
    }
    Ok(out)
}

fn count(decisions: &[Decision], wanted: Decision) -> usize {
    decisions.iter().filter(|d| **d == wanted).count()
}

/// Resolve the round held by `ctx` with the decisions in its submission.
///
/// Validation failures leave `ctx` untouched so the round can be answered
/// again. Once validation passes the round is consumed whether or not the
/// commit succeeds.
pub fn resolve(ctx: &mut ExecutionContext, tables: &mut TableChangeset) -> Result<ApprovalResponse> {
    if ctx.phase() != Phase::ApprovalHandling {
        return Err(StageError::precondition(format!(
            "approval resolved during {:?} phase",
            ctx.phase()
        )));
    }
    let batch = ctx.pending_batch().ok_or(ApprovalError::NoPendingBatch)?;
    let decisions = DecisionSet::from_submission(ctx.submission())?;
    let decided = apply_decisions(batch, &decisions)?;

    let committed = commit(&decided, tables);
    let results = ctx.deferred_results.take();
    ctx.reset();

    Ok(ApprovalResponse {
        report: committed?,
        results,
    })
}
