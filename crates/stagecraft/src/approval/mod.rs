//! Approval Pipeline
//!
//! Gates staged table changes behind human review.
//!
//! # Flow
//!
//! 1. A stage body calls `request_approval()` while handling a submission.
//!    The tool's [`TableChangeset`] is frozen into an [`ApprovalBatch`]: one
//!    `TableDelete` item per table marked for deletion, then one item per
//!    staged snapshot with a decision per row. A snapshot is compared with
//!    the persisted table of the same name:
//!    - same columns, persisted rows kept as a prefix: `RowAddition`, one
//!      decision per appended row, keyed by the row's final index;
//!    - same rows, persisted columns kept and new ones added:
//!      `SchemaChange`, one decision per row;
//!    - anything else: `TableCreate`, one decision per row.
//!
//!    The changeset is not flushed.
//! 2. The reviewer answers through decision fields named
//!    `approve_<item>` (deletes) or `approve_<item>_<row>` (rows),
//!    with values `approve`, `reject`, `pending` or `ignore`.
//! 3. Decisions are validated as a whole, then the approved subset is
//!    committed: exactly the approved rows of each create (original order),
//!    the approved rows appended after the current contents of the table,
//!    the new cells of approved rows for a schema change, and each approved
//!    delete.
//!
//! A decision field that is absent resolves to `Pending`, and pending rows
//! or deletes are never committed.

mod form;
mod pipeline;
mod store;

pub use form::{ApprovalEntry, ApprovalForm, RowEntry};
pub use pipeline::{
    apply_decisions, commit, resolve, ApprovalResponse, CommitEffect, CommitReport, ItemOutcome,
};
pub use store::{PendingApproval, PendingApprovalStore};

use crate::changeset::{self, TableChangeset};
use crate::form::Submission;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stagecraft_catalog::Table;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// Prefix of every decision field.
pub const DECISION_KEY_PREFIX: &str = "approve_";

/// Approval errors. A batch either passes validation as a whole or is not
/// applied at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApprovalError {
    #[error("No approval is pending")]
    NoPendingBatch,

    #[error("An approval is pending for stage '{0}'; resolve it first")]
    BatchPending(String),

    #[error("Approval was already requested in this submission")]
    AlreadyRequested,

    #[error("Unknown approval item: {0}")]
    UnknownItem(ApprovalItemId),

    #[error("Approval item {item} has no row {row}")]
    UnknownRow { item: ApprovalItemId, row: usize },

    #[error("Approval item {item} is decided per row; use approve_{item}_<row>")]
    RowDecisionRequired { item: ApprovalItemId },

    #[error("Malformed decision field: {0}")]
    MalformedKey(String),

    #[error("Invalid decision '{value}' for {key}")]
    InvalidDecision { key: String, value: String },

    #[error("Approval item {item} was already decided")]
    AlreadyDecided { item: ApprovalItemId },

    #[error("Approval store error: {0}")]
    Store(String),
}

/// Reviewer decision on one row or table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl Decision {
    /// Parse a submitted decision value. `ignore` is an alias of `pending`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "approve" => Some(Self::Approved),
            "reject" => Some(Self::Rejected),
            "pending" | "ignore" => Some(Self::Pending),
            _ => None,
        }
    }

    /// The submitted form of this decision.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approve",
            Self::Rejected => "reject",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Move to `next`. Pending may become anything; a terminal decision
    /// only accepts itself.
    fn transition(&mut self, next: Decision, item: ApprovalItemId) -> Result<(), ApprovalError> {
        if self.is_terminal() && *self != next {
            return Err(ApprovalError::AlreadyDecided { item });
        }
        *self = next;
        Ok(())
    }
}

/// Position of an item within its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalItemId(pub u32);

impl fmt::Display for ApprovalItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique batch identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub String);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One reviewable change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApprovalItem {
    /// Create or replace `table` with the approved subset of `rows`.
    TableCreate {
        id: ApprovalItemId,
        table: String,
        rows: Table,
        decisions: Vec<Decision>,
    },
    /// Append the approved subset of `rows` to `table`, which held
    /// `base_len` rows at freeze time. Row keys start at `base_len`.
    RowAddition {
        id: ApprovalItemId,
        table: String,
        base_len: usize,
        rows: Table,
        decisions: Vec<Decision>,
    },
    /// Add `added_columns` to `table`. `rows` is the full staged snapshot;
    /// a row keeps its new cells only when approved.
    SchemaChange {
        id: ApprovalItemId,
        table: String,
        added_columns: Vec<String>,
        rows: Table,
        decisions: Vec<Decision>,
    },
    /// Drop `table`. `preview` is its persisted content at freeze time.
    TableDelete {
        id: ApprovalItemId,
        table: String,
        preview: Option<Table>,
        decision: Decision,
    },
}

impl ApprovalItem {
    /// Review item for staging `staged` over `persisted`.
    fn for_save(id: ApprovalItemId, table: &str, staged: &Table, persisted: Option<&Table>) -> Self {
        let table = table.to_string();
        if let Some(base) = persisted {
            if let Some(rows) = appended_rows(base, staged) {
                return Self::RowAddition {
                    id,
                    table,
                    base_len: base.len(),
                    decisions: vec![Decision::Pending; rows.len()],
                    rows,
                };
            }
            if let Some(added_columns) = added_columns(base, staged) {
                return Self::SchemaChange {
                    id,
                    table,
                    added_columns,
                    decisions: vec![Decision::Pending; staged.len()],
                    rows: staged.clone(),
                };
            }
        }
        Self::TableCreate {
            id,
            table,
            decisions: vec![Decision::Pending; staged.len()],
            rows: staged.clone(),
        }
    }

    pub fn id(&self) -> ApprovalItemId {
        match self {
            Self::TableCreate { id, .. }
            | Self::RowAddition { id, .. }
            | Self::SchemaChange { id, .. }
            | Self::TableDelete { id, .. } => *id,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Self::TableCreate { table, .. }
            | Self::RowAddition { table, .. }
            | Self::SchemaChange { table, .. }
            | Self::TableDelete { table, .. } => table,
        }
    }

    /// Key of the first row and the per-row decisions. `None` for deletes.
    fn row_decisions(&self) -> Option<(usize, &[Decision])> {
        match self {
            Self::TableCreate { decisions, .. } | Self::SchemaChange { decisions, .. } => {
                Some((0, decisions.as_slice()))
            }
            Self::RowAddition {
                base_len,
                decisions,
                ..
            } => Some((*base_len, decisions.as_slice())),
            Self::TableDelete { .. } => None,
        }
    }

    /// Every decision field this item expects.
    pub fn decision_keys(&self) -> Vec<DecisionKey> {
        match self.row_decisions() {
            Some((first, decisions)) => (first..first + decisions.len())
                .map(|r| DecisionKey::row(self.id(), r))
                .collect(),
            None => vec![DecisionKey::item(self.id())],
        }
    }

    /// Positions in the item's `rows` of approved rows, in order. Empty for
    /// deletes.
    pub fn approved_rows(&self) -> Vec<usize> {
        match self.row_decisions() {
            Some((_, decisions)) => decisions
                .iter()
                .enumerate()
                .filter(|(_, d)| **d == Decision::Approved)
                .map(|(i, _)| i)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Record `decision` for the field addressed by `key`.
    pub fn decide(&mut self, key: DecisionKey, decision: Decision) -> Result<(), ApprovalError> {
        let item = self.id();
        match (self, key.row) {
            (Self::TableDelete { decision: slot, .. }, None) => slot.transition(decision, item),
            (Self::TableDelete { .. }, Some(row)) => Err(ApprovalError::UnknownRow { item, row }),
            (_, None) => Err(ApprovalError::RowDecisionRequired { item }),
            (
                Self::TableCreate { decisions, .. } | Self::SchemaChange { decisions, .. },
                Some(row),
            ) => decide_row(decisions, 0, row, decision, item),
            (
                Self::RowAddition {
                    base_len,
                    decisions,
                    ..
                },
                Some(row),
            ) => decide_row(decisions, *base_len, row, decision, item),
        }
    }
}

fn decide_row(
    decisions: &mut [Decision],
    first: usize,
    row: usize,
    decision: Decision,
    item: ApprovalItemId,
) -> Result<(), ApprovalError> {
    let slot = row
        .checked_sub(first)
        .and_then(|i| decisions.get_mut(i))
        .ok_or(ApprovalError::UnknownRow { item, row })?;
    slot.transition(decision, item)
}

/// Rows `staged` adds after an unchanged copy of `base`.
fn appended_rows(base: &Table, staged: &Table) -> Option<Table> {
    if staged.columns() != base.columns()
        || staged.len() <= base.len()
        || &staged.rows()[..base.len()] != base.rows()
    {
        return None;
    }
    let appended: Vec<usize> = (base.len()..staged.len()).collect();
    staged.select_rows(&appended).ok()
}

/// Columns `staged` adds to `base` while keeping every row and every
/// existing cell.
fn added_columns(base: &Table, staged: &Table) -> Option<Vec<String>> {
    if staged.len() != base.len() || staged.columns().len() <= base.columns().len() {
        return None;
    }
    for column in base.columns() {
        match (base.column_values(column), staged.column_values(column)) {
            (Ok(old), Ok(new)) if old == new => {}
            _ => return None,
        }
    }
    Some(
        staged
            .columns()
            .iter()
            .filter(|c| base.column_index(c).is_none())
            .cloned()
            .collect(),
    )
}

/// A frozen, reviewable snapshot of a changeset's staged mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalBatch {
    pub id: BatchId,
    /// Stage whose submission produced the batch
    pub stage: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<ApprovalItem>,
}

impl ApprovalBatch {
    /// Freeze the staged changes of `tables`, deletes first.
    ///
    /// Returns `None` when nothing is staged. Staged snapshots of persisted
    /// tables are read back to classify the change.
    pub fn freeze(stage: &str, tables: &TableChangeset) -> changeset::Result<Option<Self>> {
        if !tables.has_pending() {
            return Ok(None);
        }

        let mut items = Vec::new();
        let mut next = 0u32;
        let mut next_id = || {
            let id = ApprovalItemId(next);
            next += 1;
            id
        };

        for name in tables.pending_deletes() {
            let preview = match tables.catalog().read(name) {
                Ok(table) => Some(table),
                Err(e) => {
                    warn!(table = %name, error = %e, "Could not read table for deletion preview");
                    None
                }
            };
            items.push(ApprovalItem::TableDelete {
                id: next_id(),
                table: name.clone(),
                preview,
                decision: Decision::Pending,
            });
        }
        for (name, staged) in tables.pending_saves() {
            let persisted = if tables.is_persisted(name) {
                Some(tables.catalog().read(name)?)
            } else {
                None
            };
            items.push(ApprovalItem::for_save(
                next_id(),
                name,
                staged,
                persisted.as_ref(),
            ));
        }

        Ok(Some(Self {
            id: BatchId::new(),
            stage: stage.to_string(),
            created_at: Utc::now(),
            items,
        }))
    }

    pub fn item(&self, id: ApprovalItemId) -> Option<&ApprovalItem> {
        self.items.iter().find(|i| i.id() == id)
    }

    pub fn item_mut(&mut self, id: ApprovalItemId) -> Option<&mut ApprovalItem> {
        self.items.iter_mut().find(|i| i.id() == id)
    }

    /// Every decision field of the batch, item by item.
    pub fn decision_keys(&self) -> Vec<DecisionKey> {
        self.items.iter().flat_map(|i| i.decision_keys()).collect()
    }
}

/// Address of one decision field: an item, and a row for creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DecisionKey {
    pub item: ApprovalItemId,
    pub row: Option<usize>,
}

impl DecisionKey {
    pub fn item(item: ApprovalItemId) -> Self {
        Self { item, row: None }
    }

    pub fn row(item: ApprovalItemId, row: usize) -> Self {
        Self {
            item,
            row: Some(row),
        }
    }

    /// Parse a field name.
    ///
    /// Returns `Ok(None)` for fields that are not decision fields, and an
    /// error for fields with the decision prefix that do not parse.
    pub fn parse(field: &str) -> Result<Option<Self>, ApprovalError> {
        let Some(rest) = field.strip_prefix(DECISION_KEY_PREFIX) else {
            return Ok(None);
        };
        let malformed = || ApprovalError::MalformedKey(field.to_string());
        let mut parts = rest.split('_');
        let item = parts
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .map(ApprovalItemId)
            .ok_or_else(malformed)?;
        let row = match parts.next() {
            None => None,
            Some(p) => Some(p.parse::<usize>().map_err(|_| malformed())?),
        };
        if parts.next().is_some() {
            return Err(malformed());
        }
        Ok(Some(Self { item, row }))
    }
}

impl fmt::Display for DecisionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "{}{}_{}", DECISION_KEY_PREFIX, self.item, row),
            None => write!(f, "{}{}", DECISION_KEY_PREFIX, self.item),
        }
    }
}

/// Decisions read from one approval submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionSet {
    decisions: BTreeMap<DecisionKey, Decision>,
}

impl DecisionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every decision field of `submission`; other fields are
    /// ignored.
    pub fn from_submission(submission: &Submission) -> Result<Self, ApprovalError> {
        let mut set = Self::new();
        for (field, values) in submission.iter() {
            let Some(key) = DecisionKey::parse(field)? else {
                continue;
            };
            let decision = match values {
                [value] => Decision::parse(value),
                _ => None,
            }
            .ok_or_else(|| ApprovalError::InvalidDecision {
                key: field.to_string(),
                value: values.join(", "),
            })?;
            set.insert(key, decision);
        }
        Ok(set)
    }

    fn uniform(batch: &ApprovalBatch, decision: Decision) -> Self {
        Self {
            decisions: batch
                .decision_keys()
                .into_iter()
                .map(|k| (k, decision))
                .collect(),
        }
    }

    /// Approve every row and delete of `batch`.
    pub fn approve_all(batch: &ApprovalBatch) -> Self {
        Self::uniform(batch, Decision::Approved)
    }

    pub fn reject_all(batch: &ApprovalBatch) -> Self {
        Self::uniform(batch, Decision::Rejected)
    }

    pub fn pend_all(batch: &ApprovalBatch) -> Self {
        Self::uniform(batch, Decision::Pending)
    }

    pub fn insert(&mut self, key: DecisionKey, decision: Decision) {
        self.decisions.insert(key, decision);
    }

    pub fn get(&self, key: &DecisionKey) -> Option<Decision> {
        self.decisions.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DecisionKey, &Decision)> {
        self.decisions.iter()
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// The submission a reviewer would send for these decisions.
    pub fn to_submission(&self) -> Submission {
        self.decisions
            .iter()
            .map(|(k, d)| (k.to_string(), d.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecraft_catalog::MemoryCatalog;

    fn staged() -> TableChangeset {
        let catalog = MemoryCatalog::new().with_table(
            "Old",
            Table::new(["a"]).unwrap().with_row(["x"]).unwrap(),
        );
        let mut tables = TableChangeset::open(Box::new(catalog)).unwrap();
        tables.set(
            "Names",
            Table::new(["First Name"])
                .unwrap()
                .with_row(["Oski"])
                .unwrap()
                .with_row(["Bear"])
                .unwrap(),
        );
        tables.delete("Old").unwrap();
        tables
    }

    #[test]
    fn test_decision_parse() {
        assert_eq!(Decision::parse("approve"), Some(Decision::Approved));
        assert_eq!(Decision::parse("reject"), Some(Decision::Rejected));
        assert_eq!(Decision::parse("pending"), Some(Decision::Pending));
        assert_eq!(Decision::parse("ignore"), Some(Decision::Pending));
        assert_eq!(Decision::parse("yes"), None);
    }

    #[test]
    fn test_decision_key_round_trip() {
        let key = DecisionKey::parse("approve_3_1").unwrap().unwrap();
        assert_eq!(key, DecisionKey::row(ApprovalItemId(3), 1));
        assert_eq!(key.to_string(), "approve_3_1");
        assert_eq!(
            DecisionKey::parse("approve_0").unwrap(),
            Some(DecisionKey::item(ApprovalItemId(0)))
        );
        assert_eq!(DecisionKey::parse("component_0").unwrap(), None);
    }

    #[test]
    fn test_decision_key_malformed() {
        for field in ["approve_", "approve_x", "approve_1_y", "approve_1_2_3"] {
            assert_eq!(
                DecisionKey::parse(field),
                Err(ApprovalError::MalformedKey(field.to_string()))
            );
        }
    }

    #[test]
    fn test_freeze_orders_deletes_first() {
        let batch = ApprovalBatch::freeze("s", &staged()).unwrap().unwrap();
        assert_eq!(batch.items.len(), 2);
        match &batch.items[0] {
            ApprovalItem::TableDelete { id, table, preview, decision } => {
                assert_eq!(*id, ApprovalItemId(0));
                assert_eq!(table, "Old");
                assert_eq!(preview.as_ref().unwrap().len(), 1);
                assert_eq!(*decision, Decision::Pending);
            }
            other => panic!("expected delete, got {:?}", other),
        }
        match &batch.items[1] {
            ApprovalItem::TableCreate { id, decisions, .. } => {
                assert_eq!(*id, ApprovalItemId(1));
                assert_eq!(decisions, &vec![Decision::Pending; 2]);
            }
            other => panic!("expected create, got {:?}", other),
        }
    }

    #[test]
    fn test_freeze_empty_changeset() {
        let tables = TableChangeset::open(Box::new(MemoryCatalog::new())).unwrap();
        assert!(ApprovalBatch::freeze("s", &tables).unwrap().is_none());
    }

    #[test]
    fn test_single_terminal_transition() {
        let mut batch = ApprovalBatch::freeze("s", &staged()).unwrap().unwrap();
        let item = batch.item_mut(ApprovalItemId(0)).unwrap();
        let key = DecisionKey::item(ApprovalItemId(0));
        item.decide(key, Decision::Approved).unwrap();
        item.decide(key, Decision::Approved).unwrap();
        assert_eq!(
            item.decide(key, Decision::Rejected),
            Err(ApprovalError::AlreadyDecided {
                item: ApprovalItemId(0)
            })
        );
    }

    #[test]
    fn test_decide_shape_mismatch() {
        let mut batch = ApprovalBatch::freeze("s", &staged()).unwrap().unwrap();
        let create = batch.item_mut(ApprovalItemId(1)).unwrap();
        assert_eq!(
            create.decide(DecisionKey::item(ApprovalItemId(1)), Decision::Approved),
            Err(ApprovalError::RowDecisionRequired {
                item: ApprovalItemId(1)
            })
        );
        assert_eq!(
            create.decide(DecisionKey::row(ApprovalItemId(1), 5), Decision::Approved),
            Err(ApprovalError::UnknownRow {
                item: ApprovalItemId(1),
                row: 5
            })
        );
    }

    #[test]
    fn test_decision_set_from_submission() {
        let submission = Submission::new()
            .with("approve_1_0", "approve")
            .with("approve_1_1", "ignore")
            .with("component_9", "Submit");
        let set = DecisionSet::from_submission(&submission).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.get(&DecisionKey::row(ApprovalItemId(1), 1)),
            Some(Decision::Pending)
        );
    }

    #[test]
    fn test_decision_set_invalid_value() {
        let submission = Submission::new().with("approve_0", "maybe");
        assert_eq!(
            DecisionSet::from_submission(&submission),
            Err(ApprovalError::InvalidDecision {
                key: "approve_0".to_string(),
                value: "maybe".to_string()
            })
        );
    }

    #[test]
    fn test_approve_all_covers_every_field() {
        let batch = ApprovalBatch::freeze("s", &staged()).unwrap().unwrap();
        let submission = DecisionSet::approve_all(&batch).to_submission();
        let keys: Vec<&str> = submission.keys().collect();
        assert_eq!(keys, vec!["approve_0", "approve_1_0", "approve_1_1"]);
        assert!(submission.iter().all(|(_, v)| v == ["approve".to_string()]));
    }

    #[test]
    fn test_batch_json_is_tagged() {
        let batch = ApprovalBatch::freeze("s", &staged()).unwrap().unwrap();
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["items"][0]["kind"], "table_delete");
        assert_eq!(json["items"][1]["kind"], "table_create");
        assert_eq!(json["items"][1]["rows"]["rows"][0][0], "Oski");
        let back: ApprovalBatch = serde_json::from_value(json).unwrap();
        assert_eq!(back.items[1].table(), "Names");
        assert_eq!(
            back.item(ApprovalItemId(1)).map(|i| i.decision_keys().len()),
            Some(2)
        );
    }

    fn names(rows: &[&str]) -> Table {
        let mut table = Table::new(["First Name"]).unwrap();
        for r in rows {
            table = table.with_row([*r]).unwrap();
        }
        table
    }

    fn frozen_over(persisted: Table, staged: Table) -> ApprovalItem {
        let catalog = MemoryCatalog::new().with_table("Names", persisted);
        let mut tables = TableChangeset::open(Box::new(catalog)).unwrap();
        tables.set("Names", staged);
        let mut batch = ApprovalBatch::freeze("s", &tables).unwrap().unwrap();
        batch.items.remove(0)
    }

    #[test]
    fn test_appended_rows_freeze_as_row_addition() {
        let item = frozen_over(names(&["Oski", "Carol"]), names(&["Oski", "Carol", "Steve"]));
        match &item {
            ApprovalItem::RowAddition {
                base_len, rows, ..
            } => {
                assert_eq!(*base_len, 2);
                assert_eq!(rows, &names(&["Steve"]));
            }
            other => panic!("expected row addition, got {:?}", other),
        }
        let keys: Vec<String> = item.decision_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["approve_0_2"]);
    }

    #[test]
    fn test_row_addition_keys_are_absolute() {
        let mut item = frozen_over(names(&["Oski", "Carol"]), names(&["Oski", "Carol", "Steve"]));
        let id = ApprovalItemId(0);
        assert_eq!(
            item.decide(DecisionKey::row(id, 0), Decision::Approved),
            Err(ApprovalError::UnknownRow { item: id, row: 0 })
        );
        assert_eq!(
            item.decide(DecisionKey::row(id, 3), Decision::Approved),
            Err(ApprovalError::UnknownRow { item: id, row: 3 })
        );
        item.decide(DecisionKey::row(id, 2), Decision::Approved).unwrap();
        assert_eq!(item.approved_rows(), vec![0]);
    }

    #[test]
    fn test_added_column_freezes_as_schema_change() {
        let persisted = names(&["Oski", "Carol"]);
        let staged = Table::new(["First Name", "Age"])
            .unwrap()
            .with_row(["Oski", "21"])
            .unwrap()
            .with_row(["Carol", "30"])
            .unwrap();
        match frozen_over(persisted, staged) {
            ApprovalItem::SchemaChange {
                added_columns,
                decisions,
                ..
            } => {
                assert_eq!(added_columns, vec!["Age".to_string()]);
                assert_eq!(decisions.len(), 2);
            }
            other => panic!("expected schema change, got {:?}", other),
        }
    }

    #[test]
    fn test_rewritten_rows_freeze_as_create() {
        for staged in [names(&["Carol", "Oski", "Steve"]), names(&["Oski"])] {
            let item = frozen_over(names(&["Oski", "Carol"]), staged);
            assert!(matches!(item, ApprovalItem::TableCreate { .. }), "{:?}", item);
        }

        // A changed existing cell is not a pure column addition
        let staged = Table::new(["First Name", "Age"])
            .unwrap()
            .with_row(["Oskar", "21"])
            .unwrap()
            .with_row(["Carol", "30"])
            .unwrap();
        let item = frozen_over(names(&["Oski", "Carol"]), staged);
        assert!(matches!(item, ApprovalItem::TableCreate { .. }));
    }
}
