//! Command handlers for the stagecraft binary.
//!
//! Every command prints one JSON document on stdout.

pub mod demos;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::json;
use stagecraft::approval::{DecisionKey, DecisionSet};
use stagecraft::{Decision, Submission, Tool};

/// `--approve-all` / `--reject-all`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkDecision {
    None,
    ApproveAll,
    RejectAll,
}

impl BulkDecision {
    pub fn from_flags(approve_all: bool, reject_all: bool) -> Self {
        match (approve_all, reject_all) {
            (true, _) => Self::ApproveAll,
            (_, true) => Self::RejectAll,
            _ => Self::None,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", output);
    Ok(())
}

/// Split `key=value`. The value may itself contain `=`.
pub fn parse_pair(raw: &str) -> Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => bail!("Expected key=value, got '{}'", raw),
    }
}

/// Build a submission from repeated `--field key=value` arguments.
pub fn parse_fields(fields: &[String]) -> Result<Submission> {
    let mut submission = Submission::new();
    for raw in fields {
        let (key, value) = parse_pair(raw)?;
        submission.insert(key, value);
    }
    Ok(submission)
}

pub fn stages(tool: &Tool) -> Result<()> {
    print_json(&json!({
        "tool": tool.name(),
        "stages": tool.stage_names(),
    }))
}

pub fn layout(tool: &Tool, stage: &str) -> Result<()> {
    let layout = tool.layout(stage)?;
    print_json(&layout)
}

pub fn submit(tool: &Tool, stage: &str, fields: &[String]) -> Result<()> {
    let submission = parse_fields(fields)?;
    let response = tool.submit(stage, submission)?;
    for message in response.messages() {
        eprintln!("Invalid input: {}", message);
    }
    print_json(&response)
}

pub fn pending(tool: &Tool) -> Result<()> {
    match tool.pending_approval()? {
        Some(form) => print_json(&form),
        None => print_json(&json!({ "pending": null })),
    }
}

/// Resolve the open round. Explicit `--decision` values override the bulk
/// flag for their key.
pub fn approve(tool: &Tool, decisions: &[String], bulk: BulkDecision) -> Result<()> {
    let batch = tool
        .pending_batch()?
        .context("No approval is pending; submit a gated stage first")?;

    let mut set = match bulk {
        BulkDecision::ApproveAll => DecisionSet::approve_all(&batch),
        BulkDecision::RejectAll => DecisionSet::reject_all(&batch),
        BulkDecision::None => DecisionSet::new(),
    };
    for raw in decisions {
        let (field, value) = parse_pair(raw)?;
        let key = DecisionKey::parse(field)?
            .with_context(|| format!("'{}' is not a decision key", field))?;
        let decision = Decision::parse(value)
            .with_context(|| format!("Unknown decision '{}' for {}", value, field))?;
        set.insert(key, decision);
    }

    let response = tool.approve(set.to_submission())?;
    print_json(&response)
}

pub fn tables(tool: &Tool) -> Result<()> {
    let names = tool.tables()?;
    print_json(&json!({ "tables": names }))
}

pub fn show(tool: &Tool, table: &str) -> Result<()> {
    let snapshot = tool
        .read_table(table)
        .with_context(|| format!("Failed to read table '{}'", table))?;
    print_json(&json!({ "name": table, "table": snapshot }))
}
