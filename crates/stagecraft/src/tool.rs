//! A tool: named stages over one table catalog.
//!
//! All mutable state of a tool (the changeset, cached layouts and the open
//! approval round) sits behind a single mutex. Each request holds it for its
//! whole cycle, so build, handle and flush (or build, handle, approve and
//! commit) never interleave with another request on the same tool.

use crate::approval::{
    self, ApprovalBatch, ApprovalError, ApprovalForm, ApprovalResponse, PendingApproval,
    PendingApprovalStore,
};
use crate::changeset::TableChangeset;
use crate::component::Layout;
use crate::config::StagecraftConfig;
use crate::context::ExecutionContext;
use crate::error::{Result, StageError};
use crate::form::Submission;
use crate::schema::{FormSchema, HydratedForm};
use crate::stage::{Stage, StageOutcome, StageResponse, StageScope};
use stagecraft_catalog::{Table, TableCatalog};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};

struct ToolState {
    tables: TableChangeset,
    layouts: HashMap<String, Layout>,
    pending: Option<PendingApproval>,
    store: Option<PendingApprovalStore>,
}

impl ToolState {
    fn save_pending(&self) -> Result<()> {
        if let (Some(store), Some(pending)) = (&self.store, &self.pending) {
            store.save(pending).map_err(store_error)?;
        }
        Ok(())
    }

    fn close_round(&mut self) -> Result<()> {
        self.pending = None;
        self.layouts.clear();
        if let Some(store) = &self.store {
            store.clear().map_err(store_error)?;
        }
        Ok(())
    }
}

fn store_error(e: anyhow::Error) -> StageError {
    ApprovalError::Store(format!("{e:#}")).into()
}

pub struct Tool {
    name: String,
    stages: Vec<Stage>,
    state: Mutex<ToolState>,
}

impl Tool {
    pub fn new(name: impl Into<String>, catalog: Box<dyn TableCatalog>) -> Result<Self> {
        let name = name.into();
        let tables = TableChangeset::open(catalog)?;
        info!(tool = %name, "Opened tool");
        Ok(Self {
            name,
            stages: Vec::new(),
            state: Mutex::new(ToolState {
                tables,
                layouts: HashMap::new(),
                pending: None,
                store: None,
            }),
        })
    }

    /// Open a tool with the configured catalog and approval store.
    pub fn from_config(name: impl Into<String>, config: &StagecraftConfig) -> Result<Self> {
        let catalog = config.open_catalog().map_err(anyhow::Error::from)?;
        let tool = Self::new(name, catalog)?;
        match &config.approvals.dir {
            Some(dir) => tool.with_approval_store(dir.clone()),
            None => Ok(tool),
        }
    }

    /// Persist the open approval round under `dir`, resuming one left by an
    /// earlier process.
    pub fn with_approval_store(mut self, dir: impl Into<PathBuf>) -> Result<Self> {
        let store = PendingApprovalStore::new(dir).map_err(store_error)?;
        let pending = store.load().map_err(store_error)?;
        let state = self.state.get_mut().map_err(|_| StageError::LockPoisoned)?;
        if let Some(pending) = &pending {
            info!(
                tool = %self.name,
                batch = %pending.batch.id,
                stage = %pending.batch.stage,
                dir = %store.dir().display(),
                "Resumed pending approval"
            );
        }
        state.pending = pending;
        state.store = Some(store);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a stage body.
    pub fn add_stage<F>(&mut self, name: impl Into<String>, body: F) -> Result<()>
    where
        F: Fn(&mut StageScope<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.insert(Stage::new(name, body))
    }

    /// Register a stage described by `schema`.
    pub fn add_declared_stage<F>(
        &mut self,
        name: impl Into<String>,
        schema: FormSchema,
        handler: F,
    ) -> Result<()>
    where
        F: Fn(&mut StageScope<'_>, &HydratedForm) -> Result<()> + Send + Sync + 'static,
    {
        self.insert(schema.into_stage(name, handler)?)
    }

    fn insert(&mut self, stage: Stage) -> Result<()> {
        if self.stages.iter().any(|s| s.name() == stage.name()) {
            return Err(StageError::DuplicateStage(stage.name().to_string()));
        }
        self.stages.push(stage);
        Ok(())
    }

    /// Stage names in registration order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::name).collect()
    }

    fn stage(&self, name: &str) -> Result<&Stage> {
        self.stages
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| StageError::UnknownStage(name.to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, ToolState>> {
        self.state.lock().map_err(|_| StageError::LockPoisoned)
    }

    /// The layout of `stage`. Cached until persisted tables change.
    pub fn layout(&self, stage: &str) -> Result<Layout> {
        let stage = self.stage(stage)?;
        let mut state = self.lock()?;
        if let Some(layout) = state.layouts.get(stage.name()) {
            return Ok(layout.clone());
        }
        let mut ctx = ExecutionContext::layout(stage.name());
        let layout = stage.layout(&mut ctx, &mut state.tables)?;
        state
            .layouts
            .insert(stage.name().to_string(), layout.clone());
        Ok(layout)
    }

    /// Handle a submission of `stage`.
    pub fn submit(&self, stage: &str, submission: Submission) -> Result<StageResponse> {
        let stage = self.stage(stage)?;
        let mut guard = self.lock()?;
        let state = &mut *guard;
        if let Some(pending) = &state.pending {
            return Err(ApprovalError::BatchPending(pending.batch.stage.clone()).into());
        }

        let mut ctx = ExecutionContext::handling(stage.name(), submission);
        let response = stage.handle(&mut ctx, &mut state.tables)?;

        if let Some((batch, deferred_results)) = ctx.take_pending() {
            state.pending = Some(PendingApproval {
                batch,
                deferred_results,
            });
            if let Err(e) = state.save_pending() {
                state.pending = None;
                state.tables.clear();
                return Err(e);
            }
        } else if matches!(response.outcome, StageOutcome::Results { .. }) {
            state.layouts.clear();
        }

        info!(tool = %self.name, stage = %stage.name(), "Handled submission");
        Ok(response)
    }

    /// Resolve the open approval round with the decisions in `submission`.
    ///
    /// An invalid set of decisions leaves the round open. Once the decisions
    /// validate the round is closed, even if the commit fails.
    pub fn approve(&self, submission: Submission) -> Result<ApprovalResponse> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let pending = state.pending.clone().ok_or(ApprovalError::NoPendingBatch)?;
        let mut ctx = ExecutionContext::approval_handling(
            pending.batch,
            pending.deferred_results,
            submission,
        );

        match approval::resolve(&mut ctx, &mut state.tables) {
            Ok(response) => {
                state.close_round()?;
                Ok(response)
            }
            Err(StageError::Approval(e)) => {
                warn!(tool = %self.name, error = %e, "Rejected approval submission");
                Err(e.into())
            }
            Err(e) => {
                error!(tool = %self.name, error = %e, "Approval commit failed; round discarded");
                state.tables.clear();
                if let Err(clear) = state.close_round() {
                    warn!(error = %clear, "Could not remove stored approval");
                }
                Err(e)
            }
        }
    }

    /// The open round's review form.
    pub fn pending_approval(&self) -> Result<Option<ApprovalForm>> {
        let state = self.lock()?;
        Ok(state
            .pending
            .as_ref()
            .map(|p| ApprovalForm::from_batch(&p.batch)))
    }

    /// The open round's batch.
    pub fn pending_batch(&self) -> Result<Option<ApprovalBatch>> {
        let state = self.lock()?;
        Ok(state.pending.as_ref().map(|p| p.batch.clone()))
    }

    /// Names of the persisted tables.
    pub fn tables(&self) -> Result<BTreeSet<String>> {
        let state = self.lock()?;
        Ok(state.tables.catalog().list_names()?)
    }

    /// A persisted table.
    pub fn read_table(&self, name: &str) -> Result<Table> {
        let state = self.lock()?;
        Ok(state.tables.catalog().read(name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::DecisionSet;
    use crate::results::ResultsPayload;
    use stagecraft_catalog::MemoryCatalog;
    use tempfile::TempDir;

    fn gated_tool() -> Tool {
        let mut tool = Tool::new("demo", Box::new(MemoryCatalog::new())).unwrap();
        tool.add_stage("Create", |s| {
            if s.submitted() {
                s.tables().set(
                    "Names",
                    Table::new(["n"])?.with_row(["Oski"])?.with_row(["Bear"])?,
                );
                s.request_approval()?;
                s.show_results(ResultsPayload::new("Created"));
            }
            Ok(())
        })
        .unwrap();
        tool
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let mut tool = gated_tool();
        let err = tool.add_stage("Create", |_| Ok(())).unwrap_err();
        assert!(matches!(err, StageError::DuplicateStage(_)));
    }

    #[test]
    fn test_unknown_stage() {
        let tool = gated_tool();
        assert!(matches!(
            tool.layout("Nope"),
            Err(StageError::UnknownStage(_))
        ));
    }

    #[test]
    fn test_submit_blocked_while_pending() {
        let tool = gated_tool();
        tool.submit("Create", Submission::new()).unwrap();
        assert!(tool.pending_approval().unwrap().is_some());

        let err = tool.submit("Create", Submission::new()).unwrap_err();
        assert!(matches!(
            err,
            StageError::Approval(ApprovalError::BatchPending(_))
        ));
    }

    #[test]
    fn test_invalid_decisions_keep_round_open() {
        let tool = gated_tool();
        tool.submit("Create", Submission::new()).unwrap();

        let err = tool
            .approve(Submission::new().with("approve_9_0", "approve"))
            .unwrap_err();
        assert!(matches!(
            err,
            StageError::Approval(ApprovalError::UnknownItem(_))
        ));
        assert!(tool.pending_batch().unwrap().is_some());
        assert!(tool.tables().unwrap().is_empty());
    }

    #[test]
    fn test_failed_flush_does_not_block_later_submissions() {
        let mut tool = Tool::new("demo", Box::new(MemoryCatalog::new())).unwrap();
        tool.add_stage("bad", |s| {
            if s.submitted() {
                s.tables().set("good", Table::new(["n"])?.with_row(["x"])?);
                s.tables().set("  ", Table::new(["n"])?);
            }
            Ok(())
        })
        .unwrap();
        tool.add_stage("noop", |_| Ok(())).unwrap();

        let err = tool.submit("bad", Submission::new()).unwrap_err();
        assert!(matches!(
            err,
            StageError::Changeset(crate::changeset::ChangesetError::Catalog(
                stagecraft_catalog::CatalogError::InvalidName(_)
            ))
        ));
        assert!(tool.tables().unwrap().is_empty());

        let response = tool.submit("noop", Submission::new()).unwrap();
        assert!(matches!(response.outcome, StageOutcome::Results { .. }));
        assert!(!tool.tables().unwrap().contains("good"));
    }

    #[test]
    fn test_approve_without_round() {
        let tool = gated_tool();
        assert!(matches!(
            tool.approve(Submission::new()),
            Err(StageError::Approval(ApprovalError::NoPendingBatch))
        ));
    }

    #[test]
    fn test_round_survives_restart_with_store() {
        let temp_dir = TempDir::new().unwrap();
        let catalog_dir = temp_dir.path().join("tables");
        let approvals_dir = temp_dir.path().join("approvals");

        let open = || {
            let mut tool = Tool::new(
                "demo",
                Box::new(stagecraft_catalog::JsonDirCatalog::open(&catalog_dir).unwrap()),
            )
            .unwrap()
            .with_approval_store(&approvals_dir)
            .unwrap();
            tool.add_stage("Create", |s| {
                if s.submitted() {
                    s.tables()
                        .set("Names", Table::new(["n"])?.with_row(["Oski"])?);
                    s.request_approval()?;
                }
                Ok(())
            })
            .unwrap();
            tool
        };

        open().submit("Create", Submission::new()).unwrap();

        let tool = open();
        let batch = tool.pending_batch().unwrap().unwrap();
        let response = tool
            .approve(DecisionSet::approve_all(&batch).to_submission())
            .unwrap();
        assert!(response.report.changed());
        assert_eq!(tool.read_table("Names").unwrap().len(), 1);
        assert!(open().pending_batch().unwrap().is_none());
    }
}
