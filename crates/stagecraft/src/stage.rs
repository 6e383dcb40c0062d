//! Two-phase stage execution.
//!
//! A stage body is one function that serves as both the form description
//! and the submission handler. The runner calls it twice:
//!
//! - **Layout**: every component records a render instruction and gets the
//!   next identity. Inputs carry no value.
//! - **Handling**: identities are handed out again in the same order and
//!   every input hydrates from the submitted field under its identity.
//!   [`StageScope::submitted`] is true only here, and gates business logic.
//!
//! ```rust,ignore
//! let stage = Stage::new("Add Numbers", |s| {
//!     let a = s.user_input("First number", ValueType::Integer)?;
//!     let b = s.user_input("Second number", ValueType::Integer)?;
//!     if s.submitted() {
//!         let sum = a.get()?.as_i64().unwrap_or(0) + b.get()?.as_i64().unwrap_or(0);
//!         s.show_results(ResultsPayload::new("Sum").value("Result", sum));
//!     }
//!     Ok(())
//! });
//! ```
//!
//! The body must create the same components in the same order in both
//! passes; see [`crate::component`].

use crate::approval::{ApprovalBatch, ApprovalError, ApprovalForm};
use crate::changeset::TableChangeset;
use crate::component::{
    ColumnRef, ComponentId, ComponentKind, Input, InputState, Layout, LayoutDetail, TableChoice,
    TableOption,
};
use crate::context::{ExecutionContext, Phase};
use crate::error::{Result, StageError};
use crate::form::FieldValue;
use crate::hydrate::{self, InputError, InputValue, ValueType};
use crate::results::ResultsPayload;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Signature of a stage body.
pub type StageBody = dyn Fn(&mut StageScope<'_>) -> Result<()> + Send + Sync;

/// What a stage body sees while it runs.
pub struct StageScope<'a> {
    ctx: &'a mut ExecutionContext,
    tables: &'a mut TableChangeset,
}

impl<'a> StageScope<'a> {
    pub fn new(ctx: &'a mut ExecutionContext, tables: &'a mut TableChangeset) -> Self {
        Self { ctx, tables }
    }

    pub fn phase(&self) -> Phase {
        self.ctx.phase()
    }

    pub fn stage(&self) -> &str {
        self.ctx.stage()
    }

    /// True only while handling a submission.
    pub fn submitted(&self) -> bool {
        self.ctx.submitted()
    }

    /// Static text.
    pub fn text(&mut self, text: &str) -> Result<ComponentId> {
        let phase = self.ctx.phase;
        self.ctx
            .registry
            .register(phase, ComponentKind::Text, text, || Ok(LayoutDetail::Text))
    }

    /// A free-form input coerced to `expected`.
    pub fn user_input(&mut self, label: &str, expected: ValueType) -> Result<Input<InputValue>> {
        let phase = self.ctx.phase;
        let id = self.ctx.registry.register(phase, ComponentKind::UserInput, label, || {
            Ok(LayoutDetail::Input { expected })
        })?;
        self.hydrate(id, label, |id, raw, _| Ok(hydrate::coerce(id, raw, expected)))
    }

    /// A choice among fixed options.
    pub fn selector<I, S>(&mut self, label: &str, options: I) -> Result<Input<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options: Vec<String> = options.into_iter().map(Into::into).collect();
        let phase = self.ctx.phase;
        let detail_options = options.clone();
        let id = self.ctx.registry.register(phase, ComponentKind::Selector, label, || {
            Ok(LayoutDetail::Options {
                options: detail_options,
            })
        })?;
        self.hydrate(id, label, |id, raw, _| {
            Ok(hydrate::resolve_option(id, raw, &options))
        })
    }

    /// A choice among the visible tables.
    ///
    /// Names resolve through the changeset, so tables staged earlier in the
    /// same pass are selectable and tables marked for deletion are not.
    pub fn table_selector(&mut self, label: &str) -> Result<Input<TableChoice>> {
        let phase = self.ctx.phase;
        let tables = &*self.tables;
        let id = self
            .ctx
            .registry
            .register(phase, ComponentKind::TableSelector, label, || {
                let mut options = Vec::new();
                for name in tables.names() {
                    let columns = tables.columns(&name)?;
                    options.push(TableOption { name, columns });
                }
                Ok(LayoutDetail::Tables { tables: options })
            })?;
        self.hydrate(id, label, hydrate::resolve_table)
    }

    /// A column of the table picked by `table`.
    pub fn column_selector(
        &mut self,
        label: &str,
        table: &Input<TableChoice>,
    ) -> Result<Input<ColumnRef>> {
        let phase = self.ctx.phase;
        let table_selector = table.id().clone();
        let id = self
            .ctx
            .registry
            .register(phase, ComponentKind::ColumnSelector, label, || {
                Ok(LayoutDetail::Column { table_selector })
            })?;
        self.hydrate(id, label, |id, raw, _| {
            Ok(match table.state() {
                InputState::Ready(choice) => hydrate::resolve_column(id, raw, choice),
                InputState::Invalid(_) | InputState::Unbound => Err(InputError::NoTableSelected {
                    component: id.to_string(),
                    table_selector: table.id().to_string(),
                }),
            })
        })
    }

    /// An explicit submit control. One is synthesized when the body adds
    /// none.
    pub fn submit(&mut self, label: &str) -> Result<ComponentId> {
        let phase = self.ctx.phase;
        self.ctx
            .registry
            .register(phase, ComponentKind::Submit, label, || Ok(LayoutDetail::Submit))
    }

    /// Overlay-aware table access.
    pub fn tables(&mut self) -> &mut TableChangeset {
        &mut *self.tables
    }

    /// Gate this submission's table changes behind human approval.
    ///
    /// During layout this only records the intent. While handling, the
    /// staged changes are frozen into a batch and the submission answers
    /// with an approval form; nothing is written until the batch is
    /// resolved. With nothing staged there is nothing to review and the
    /// stage completes normally.
    pub fn request_approval(&mut self) -> Result<()> {
        match self.ctx.phase {
            Phase::Layout => {
                self.ctx.approval_requested = true;
                Ok(())
            }
            Phase::Handling => {
                if self.ctx.approval_requested {
                    return Err(ApprovalError::AlreadyRequested.into());
                }
                self.ctx.approval_requested = true;
                match ApprovalBatch::freeze(&self.ctx.stage, &*self.tables)? {
                    Some(batch) => {
                        info!(
                            stage = %self.ctx.stage,
                            batch = %batch.id,
                            items = batch.items.len(),
                            "Froze changes for approval"
                        );
                        self.ctx.pending_batch = Some(batch);
                    }
                    None => debug!(stage = %self.ctx.stage, "Approval requested with nothing staged"),
                }
                Ok(())
            }
            Phase::ApprovalHandling => Err(StageError::precondition(
                "request_approval called while resolving an approval",
            )),
        }
    }

    /// Show `payload` once the submission completes.
    ///
    /// Ignored during layout. After approval was requested in this pass the
    /// payload is held back until the approval is resolved.
    pub fn show_results(&mut self, payload: ResultsPayload) {
        match self.ctx.phase {
            Phase::Handling if self.ctx.pending_batch.is_some() => {
                self.ctx.deferred_results = Some(payload);
            }
            Phase::Handling => self.ctx.results = Some(payload),
            Phase::Layout | Phase::ApprovalHandling => {}
        }
    }

    /// Build an input handle for `id`. Values are only looked up while
    /// handling; recoverable problems are recorded on the context and the
    /// pass continues.
    fn hydrate<T, F>(&mut self, id: ComponentId, label: &str, resolve: F) -> Result<Input<T>>
    where
        F: FnOnce(
            &ComponentId,
            &FieldValue,
            &TableChangeset,
        ) -> Result<std::result::Result<T, InputError>>,
    {
        if self.ctx.phase != Phase::Handling {
            return Ok(Input::unbound(id, label));
        }
        let raw = hydrate::submitted_value(&self.ctx.submission, &id)?;
        let value = resolve(&id, &raw, &*self.tables)?;
        match &value {
            Ok(_) => debug!(component = %id, "Hydrated input"),
            Err(e) => {
                warn!(component = %id, error = %e, "Rejected submitted value");
                self.ctx.input_errors.push(e.clone());
            }
        }
        Ok(Input::hydrated(id, label, value))
    }
}

/// Result of handling one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageOutcome {
    /// Changes were written. `None` when the body showed nothing.
    Results { results: Option<ResultsPayload> },
    /// Changes await review.
    Approval { form: ApprovalForm },
    /// A submitted value was unusable; nothing was written.
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResponse {
    pub stage: String,
    pub outcome: StageOutcome,
    /// User-facing problems with submitted values
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_errors: Vec<InputError>,
}

impl StageResponse {
    pub fn messages(&self) -> Vec<String> {
        self.input_errors.iter().map(ToString::to_string).collect()
    }
}

/// A named stage.
pub struct Stage {
    name: String,
    body: Box<StageBody>,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage").field("name", &self.name).finish()
    }
}

impl Stage {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut StageScope<'_>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: Box::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the layout pass.
    ///
    /// Layout must not change tables; anything staged during the pass is
    /// discarded unless changes were already pending beforehand.
    pub fn layout(&self, ctx: &mut ExecutionContext, tables: &mut TableChangeset) -> Result<Layout> {
        self.expect_phase(ctx, Phase::Layout)?;
        ctx.reset();
        let was_clean = !tables.has_pending();

        let outcome = (self.body)(&mut StageScope::new(ctx, tables));
        if was_clean && tables.has_pending() {
            warn!(stage = %self.name, "Discarding table changes staged during layout");
            tables.clear();
        }
        outcome?;

        let nodes = ctx.registry.finish_layout();
        debug!(stage = %self.name, components = nodes.len(), "Built layout");
        Ok(Layout {
            stage: self.name.clone(),
            nodes,
        })
    }

    /// Run the handling pass over the submission held by `ctx`.
    ///
    /// Without an approval gate the changeset is flushed when the body
    /// succeeds. With one, the frozen batch and any deferred results stay on
    /// `ctx` for the caller to hold until the round is resolved. A failed
    /// body discards every staged change.
    pub fn handle(
        &self,
        ctx: &mut ExecutionContext,
        tables: &mut TableChangeset,
    ) -> Result<StageResponse> {
        self.expect_phase(ctx, Phase::Handling)?;
        ctx.registry.reset();
        ctx.approval_requested = false;
        ctx.pending_batch = None;
        ctx.results = None;
        ctx.deferred_results = None;
        ctx.input_errors.clear();

        let outcome = (self.body)(&mut StageScope::new(ctx, tables));

        match outcome {
            Ok(()) => {}
            Err(StageError::Input(e)) => {
                tables.clear();
                ctx.pending_batch = None;
                ctx.deferred_results = None;
                if !ctx.input_errors.contains(&e) {
                    ctx.input_errors.push(e);
                }
                info!(
                    stage = %self.name,
                    errors = ctx.input_errors.len(),
                    "Submission rejected"
                );
                return Ok(StageResponse {
                    stage: self.name.clone(),
                    outcome: StageOutcome::Invalid,
                    input_errors: std::mem::take(&mut ctx.input_errors),
                });
            }
            Err(e) => {
                tables.clear();
                ctx.pending_batch = None;
                ctx.deferred_results = None;
                return Err(e);
            }
        }

        let outcome = match &ctx.pending_batch {
            Some(batch) => StageOutcome::Approval {
                form: ApprovalForm::from_batch(batch),
            },
            None => {
                tables.flush()?;
                StageOutcome::Results {
                    results: ctx.results.take(),
                }
            }
        };
        Ok(StageResponse {
            stage: self.name.clone(),
            outcome,
            input_errors: std::mem::take(&mut ctx.input_errors),
        })
    }

    fn expect_phase(&self, ctx: &ExecutionContext, phase: Phase) -> Result<()> {
        if ctx.phase() != phase {
            return Err(StageError::precondition(format!(
                "stage '{}' run with a {:?} context, expected {:?}",
                self.name,
                ctx.phase(),
                phase
            )));
        }
        Ok(())
    }
}
