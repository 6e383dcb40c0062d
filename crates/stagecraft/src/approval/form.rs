//! The review form shown in place of results when approval is requested.

use super::{ApprovalBatch, ApprovalItem, ApprovalItemId, BatchId, DecisionKey};
use serde::{Deserialize, Serialize};
use stagecraft_catalog::{Table, Value};

/// Everything a reviewer needs to decide a batch, with the exact decision
/// field names to submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalForm {
    pub batch: BatchId,
    pub stage: String,
    pub entries: Vec<ApprovalEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApprovalEntry {
    TableCreate {
        item: ApprovalItemId,
        table: String,
        columns: Vec<String>,
        rows: Vec<RowEntry>,
    },
    /// Rows appended after `existing_rows` unchanged rows.
    RowAddition {
        item: ApprovalItemId,
        table: String,
        columns: Vec<String>,
        existing_rows: usize,
        rows: Vec<RowEntry>,
    },
    SchemaChange {
        item: ApprovalItemId,
        table: String,
        columns: Vec<String>,
        added_columns: Vec<String>,
        rows: Vec<RowEntry>,
    },
    TableDelete {
        item: ApprovalItemId,
        table: String,
        field: String,
        preview: Option<Table>,
    },
}

/// One row under review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowEntry {
    pub field: String,
    pub index: usize,
    pub values: Vec<Value>,
}

/// One entry per row, keyed from `first`.
fn row_entries(id: ApprovalItemId, rows: &Table, first: usize) -> Vec<RowEntry> {
    rows.rows()
        .iter()
        .enumerate()
        .map(|(offset, values)| RowEntry {
            field: DecisionKey::row(id, first + offset).to_string(),
            index: first + offset,
            values: values.clone(),
        })
        .collect()
}

impl ApprovalForm {
    pub fn from_batch(batch: &ApprovalBatch) -> Self {
        let entries = batch
            .items
            .iter()
            .map(|item| match item {
                ApprovalItem::TableCreate { id, table, rows, .. } => ApprovalEntry::TableCreate {
                    item: *id,
                    table: table.clone(),
                    columns: rows.columns().to_vec(),
                    rows: row_entries(*id, rows, 0),
                },
                ApprovalItem::RowAddition {
                    id,
                    table,
                    base_len,
                    rows,
                    ..
                } => ApprovalEntry::RowAddition {
                    item: *id,
                    table: table.clone(),
                    columns: rows.columns().to_vec(),
                    existing_rows: *base_len,
                    rows: row_entries(*id, rows, *base_len),
                },
                ApprovalItem::SchemaChange {
                    id,
                    table,
                    added_columns,
                    rows,
                    ..
                } => ApprovalEntry::SchemaChange {
                    item: *id,
                    table: table.clone(),
                    columns: rows.columns().to_vec(),
                    added_columns: added_columns.clone(),
                    rows: row_entries(*id, rows, 0),
                },
                ApprovalItem::TableDelete {
                    id, table, preview, ..
                } => ApprovalEntry::TableDelete {
                    item: *id,
                    table: table.clone(),
                    field: DecisionKey::item(*id).to_string(),
                    preview: preview.clone(),
                },
            })
            .collect();

        Self {
            batch: batch.id.clone(),
            stage: batch.stage.clone(),
            entries,
        }
    }

    /// Every decision field of the form, in display order.
    pub fn field_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .flat_map(|entry| match entry {
                ApprovalEntry::TableCreate { rows, .. }
                | ApprovalEntry::RowAddition { rows, .. }
                | ApprovalEntry::SchemaChange { rows, .. } => {
                    rows.iter().map(|r| r.field.as_str()).collect::<Vec<_>>()
                }
                ApprovalEntry::TableDelete { field, .. } => vec![field.as_str()],
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changeset::TableChangeset;
    use stagecraft_catalog::MemoryCatalog;

    #[test]
    fn test_form_fields_match_batch_keys() {
        let catalog = MemoryCatalog::new().with_table("Old", Table::new(["a"]).unwrap());
        let mut tables = TableChangeset::open(Box::new(catalog)).unwrap();
        tables.delete("Old").unwrap();
        tables.set(
            "Names",
            Table::new(["n"])
                .unwrap()
                .with_row(["Oski"])
                .unwrap()
                .with_row(["Bear"])
                .unwrap(),
        );
        let batch = ApprovalBatch::freeze("demo", &tables).unwrap().unwrap();
        let form = ApprovalForm::from_batch(&batch);

        let expected: Vec<String> = batch.decision_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(form.field_names(), expected);
        assert_eq!(form.field_names(), vec!["approve_0", "approve_1_0", "approve_1_1"]);
        assert_eq!(form.stage, "demo");
    }

    #[test]
    fn test_row_addition_entry_uses_final_row_index() {
        let names = Table::new(["n"]).unwrap().with_row(["Oski"]).unwrap();
        let catalog = MemoryCatalog::new().with_table("Names", names.clone());
        let mut tables = TableChangeset::open(Box::new(catalog)).unwrap();
        tables.set("Names", names.with_row(["Steve"]).unwrap());
        let batch = ApprovalBatch::freeze("demo", &tables).unwrap().unwrap();
        let form = ApprovalForm::from_batch(&batch);

        assert_eq!(form.field_names(), vec!["approve_0_1"]);
        match &form.entries[0] {
            ApprovalEntry::RowAddition {
                existing_rows,
                rows,
                ..
            } => {
                assert_eq!(*existing_rows, 1);
                assert_eq!(rows[0].index, 1);
                assert_eq!(rows[0].values, vec![Value::from("Steve")]);
            }
            other => panic!("expected row addition, got {:?}", other),
        }
    }
}
