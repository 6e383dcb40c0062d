//! Demo stages served by the binary.

use anyhow::Result;
use stagecraft::config::StagecraftConfig;
use stagecraft::schema::FormSchema;
use stagecraft::{ResultsPayload, StageError, Tool, ValueType};
use stagecraft_catalog::{Table, Value};

pub const CREATE_TABLE: &str = "table_results";
pub const APPEND_ROW: &str = "append_to_table";
pub const DELETE_TABLE: &str = "delete_table";
pub const SUM: &str = "sum";

/// Table written by the create stage.
pub const FIRST_NAMES: &str = "First Names";

pub fn build_tool(config: &StagecraftConfig) -> Result<Tool> {
    let mut tool = Tool::from_config("approvals_demo", config)?;
    register(&mut tool)?;
    Ok(tool)
}

pub fn register(tool: &mut Tool) -> stagecraft::Result<()> {
    tool.add_stage(CREATE_TABLE, |s| {
        s.text("Creating and displaying a table to approve")?;
        if !s.submitted() {
            return Ok(());
        }
        let table = Table::from_lists(vec![
            vec!["First Name".to_string()],
            vec!["Oski".to_string()],
            vec!["Carol".to_string()],
        ])?;
        s.tables().set(FIRST_NAMES, table.clone());
        s.request_approval()?;
        s.show_results(ResultsPayload::new("Created table").table(
            "Created table:",
            FIRST_NAMES,
            table,
        ));
        Ok(())
    })?;

    tool.add_stage(APPEND_ROW, |s| {
        let target = s.table_selector("Select table")?;
        let values = s.user_input("Row values, one per column", ValueType::List)?;
        if !s.submitted() {
            return Ok(());
        }
        let choice = target.get()?;
        let row: Vec<Value> = values
            .get()?
            .as_list()
            .unwrap_or_default()
            .iter()
            .map(|v| Value::Text(v.clone()))
            .collect();

        let mut table = s.tables().get(&choice.name)?.into_owned();
        table.push_row(row)?;
        s.tables().set(choice.name.clone(), table.clone());
        s.request_approval()?;
        s.show_results(ResultsPayload::new("Appended row").table(
            "Appended to table:",
            choice.name.clone(),
            table,
        ));
        Ok(())
    })?;

    tool.add_stage(DELETE_TABLE, |s| {
        let target = s.table_selector("Table to delete")?;
        if !s.submitted() {
            return Ok(());
        }
        let name = target.get()?.name.clone();
        s.tables().delete(&name)?;
        s.request_approval()?;
        s.show_results(ResultsPayload::new("Deleted table").text("Deleted", name));
        Ok(())
    })?;

    let sum = FormSchema::new()
        .text("intro", "Add two numbers")
        .user_input("a", "First number", ValueType::Float)
        .user_input("b", "Second number", ValueType::Float)
        .submit("go", "Add");
    tool.add_declared_stage(SUM, sum, |s, form| {
        let a = form.value("a")?.as_f64();
        let b = form.value("b")?.as_f64();
        let (Some(a), Some(b)) = (a, b) else {
            return Err(StageError::precondition("sum inputs must be numbers"));
        };
        s.show_results(ResultsPayload::new("Sum").value("a + b", a + b));
        Ok(())
    })?;

    Ok(())
}
