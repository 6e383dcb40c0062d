//! End-to-end approval rounds through `Tool`.

use stagecraft::approval::{CommitEffect, DecisionSet};
use stagecraft::{
    ApprovalError, Decision, ResultsPayload, StageError, StageOutcome, Submission, Tool,
};
use stagecraft_catalog::{JsonDirCatalog, Table, TableCatalog, Value};
use stagecraft_test_utils::{
    existing_table, fields, names_table, people_table, seeded_catalog, TempCatalog, EXISTING,
    NAMES, PEOPLE,
};

fn two_rows() -> Table {
    Table::new(["First Name"])
        .unwrap()
        .with_row(["Ada"])
        .unwrap()
        .with_row(["Grace"])
        .unwrap()
}

fn tool_with(catalog: Box<dyn TableCatalog>) -> Tool {
    let mut tool = Tool::new("flow", catalog).unwrap();
    tool.add_stage("create", |s| {
        if s.submitted() {
            s.tables().set("Names", two_rows());
            s.request_approval()?;
            s.show_results(ResultsPayload::new("Created"));
        }
        Ok(())
    })
    .unwrap();
    tool.add_stage("create_three", |s| {
        if s.submitted() {
            s.tables().set("Trio", people_table());
            s.request_approval()?;
        }
        Ok(())
    })
    .unwrap();
    tool.add_stage("append", |s| {
        if s.submitted() {
            let mut names = s.tables().get(NAMES)?.into_owned();
            names.push_row(vec![Value::from("Steve")])?;
            s.tables().set(NAMES, names);
            s.request_approval()?;
        }
        Ok(())
    })
    .unwrap();
    tool.add_stage("drop_gated", |s| {
        let target = s.table_selector("Table")?;
        if s.submitted() {
            let name = target.get()?.name.clone();
            s.tables().delete(&name)?;
            s.request_approval()?;
        }
        Ok(())
    })
    .unwrap();
    tool.add_stage("drop_ungated", |s| {
        if s.submitted() {
            s.tables().delete(EXISTING)?;
        }
        Ok(())
    })
    .unwrap();
    tool
}

#[test]
fn test_approve_first_row_reject_second() {
    let tool = tool_with(Box::new(seeded_catalog()));
    let response = tool.submit("create", Submission::new()).unwrap();
    let StageOutcome::Approval { form } = response.outcome else {
        panic!("expected an approval form");
    };
    assert_eq!(form.field_names(), vec!["approve_0_0", "approve_0_1"]);

    // Nothing is persisted before the round is resolved
    assert_eq!(tool.read_table(NAMES).unwrap(), names_table());

    let response = tool
        .approve(Submission::from_pairs(fields([
            ("approve_0_0", "approve"),
            ("approve_0_1", "reject"),
        ])))
        .unwrap();

    assert!(tool.tables().unwrap().contains(NAMES));
    let table = tool.read_table(NAMES).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.row(0).unwrap(), two_rows().row(0).unwrap());
    assert_eq!(response.report.items[0].approved, 1);
    assert_eq!(response.report.items[0].rejected, 1);
    assert_eq!(response.report.items[0].effect, CommitEffect::Replaced);
    assert_eq!(response.results.unwrap().title, "Created");
}

#[test]
fn test_approved_append_keeps_existing_rows() {
    let tool = tool_with(Box::new(seeded_catalog()));
    let response = tool.submit("append", Submission::new()).unwrap();
    let StageOutcome::Approval { form } = response.outcome else {
        panic!("expected an approval form");
    };
    assert_eq!(form.field_names(), vec!["approve_0_2"]);

    let response = tool
        .approve(Submission::new().with("approve_0_2", "approve"))
        .unwrap();

    let expected = names_table()
        .with_row(["Steve"])
        .unwrap();
    assert_eq!(tool.read_table(NAMES).unwrap(), expected);
    assert_eq!(response.report.items[0].effect, CommitEffect::Replaced);
}

#[test]
fn test_rejected_append_keeps_table() {
    let tool = tool_with(Box::new(seeded_catalog()));
    tool.submit("append", Submission::new()).unwrap();
    tool.approve(Submission::new().with("approve_0_2", "reject"))
        .unwrap();
    assert_eq!(tool.read_table(NAMES).unwrap(), names_table());
}

#[test]
fn test_mixed_row_decisions_keep_order() {
    let tool = tool_with(Box::new(seeded_catalog()));
    tool.submit("create_three", Submission::new()).unwrap();
    tool.approve(Submission::from_pairs(fields([
        ("approve_0_0", "approve"),
        ("approve_0_1", "reject"),
        ("approve_0_2", "approve"),
    ])))
    .unwrap();

    let trio = tool.read_table("Trio").unwrap();
    let people = people_table();
    assert_eq!(trio.len(), 2);
    assert_eq!(trio.row(0).unwrap(), people.row(0).unwrap());
    assert_eq!(trio.row(1).unwrap(), people.row(2).unwrap());
}

#[test]
fn test_missing_decisions_stay_pending() {
    let tool = tool_with(Box::new(seeded_catalog()));
    tool.submit("create_three", Submission::new()).unwrap();
    let response = tool
        .approve(Submission::from_pairs(fields([("approve_0_1", "approve")])))
        .unwrap();

    assert_eq!(response.report.items[0].pending, 2);
    let trio = tool.read_table("Trio").unwrap();
    assert_eq!(trio.len(), 1);
    assert_eq!(trio.cell(0, "First Name").unwrap(), &Value::from("Carol"));
}

#[test]
fn test_reject_all_creates_nothing() {
    let tool = tool_with(Box::new(seeded_catalog()));
    tool.submit("create_three", Submission::new()).unwrap();
    let batch = tool.pending_batch().unwrap().unwrap();
    let response = tool
        .approve(DecisionSet::reject_all(&batch).to_submission())
        .unwrap();
    assert!(!response.report.changed());
    assert!(!tool.tables().unwrap().contains("Trio"));
}

#[test]
fn test_rejected_delete_leaves_table_unchanged() {
    let temp = TempCatalog::seeded([(EXISTING, existing_table())]).unwrap();
    let file_before = std::fs::read_dir(temp.tables_dir())
        .unwrap()
        .map(|e| std::fs::read(e.unwrap().path()).unwrap())
        .collect::<Vec<_>>();

    let tool = tool_with(Box::new(temp.open().unwrap()));
    tool.submit(
        "drop_gated",
        Submission::from_pairs(fields([("component_0", EXISTING)])),
    )
    .unwrap();
    tool.approve(Submission::from_pairs(fields([("approve_0", "reject")])))
        .unwrap();

    let file_after = std::fs::read_dir(temp.tables_dir())
        .unwrap()
        .map(|e| std::fs::read(e.unwrap().path()).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(file_before, file_after);
    assert!(tool.pending_batch().unwrap().is_none());

    let reopened = temp.open().unwrap();
    assert_eq!(reopened.read(EXISTING).unwrap(), existing_table());
}

#[test]
fn test_approved_delete_drops_table() {
    let tool = tool_with(Box::new(seeded_catalog()));
    tool.submit(
        "drop_gated",
        Submission::from_pairs(fields([("component_0", PEOPLE)])),
    )
    .unwrap();
    let response = tool
        .approve(Submission::new().with("approve_0", Decision::Approved.as_str()))
        .unwrap();
    assert_eq!(response.report.items[0].effect, CommitEffect::Dropped);
    assert!(!tool.tables().unwrap().contains(PEOPLE));
}

#[test]
fn test_ungated_delete_flushes() {
    let tool = tool_with(Box::new(seeded_catalog()));
    let response = tool.submit("drop_ungated", Submission::new()).unwrap();
    assert!(matches!(response.outcome, StageOutcome::Results { .. }));
    assert!(!tool.tables().unwrap().contains(EXISTING));
}

#[test]
fn test_invalid_batch_applies_nothing() {
    let tool = tool_with(Box::new(seeded_catalog()));
    tool.submit("create", Submission::new()).unwrap();

    let err = tool
        .approve(Submission::from_pairs(fields([
            ("approve_0_0", "approve"),
            ("approve_0_7", "approve"),
        ])))
        .unwrap_err();
    assert!(matches!(
        err,
        StageError::Approval(ApprovalError::UnknownRow { .. })
    ));
    assert_eq!(tool.read_table(NAMES).unwrap(), names_table());

    // The round is still open and can be resolved properly
    let batch = tool.pending_batch().unwrap().unwrap();
    tool.approve(DecisionSet::approve_all(&batch).to_submission())
        .unwrap();
    assert_eq!(tool.read_table(NAMES).unwrap(), two_rows());
}

#[test]
fn test_unknown_decision_value_rejected() {
    let tool = tool_with(Box::new(seeded_catalog()));
    tool.submit("create", Submission::new()).unwrap();
    let err = tool
        .approve(Submission::new().with("approve_0_0", "maybe"))
        .unwrap_err();
    assert!(matches!(
        err,
        StageError::Approval(ApprovalError::InvalidDecision { .. })
    ));
}

#[test]
fn test_pending_round_survives_restart() {
    let temp = TempCatalog::new().unwrap();
    let open = || {
        let catalog = JsonDirCatalog::open(temp.tables_dir()).unwrap();
        tool_with(Box::new(catalog))
            .with_approval_store(temp.approvals_dir())
            .unwrap()
    };

    open().submit("create", Submission::new()).unwrap();

    let tool = open();
    let form = tool.pending_approval().unwrap().unwrap();
    assert_eq!(form.stage, "create");
    let err = tool.submit("create", Submission::new()).unwrap_err();
    assert!(matches!(
        err,
        StageError::Approval(ApprovalError::BatchPending(_))
    ));

    tool.approve(Submission::new().with("approve_0_1", "approve"))
        .unwrap();
    let names = open().read_table(NAMES).unwrap();
    assert_eq!(names.len(), 1);
    assert_eq!(names.cell(0, "First Name").unwrap(), &Value::from("Grace"));
}
