//! Per-request execution state.
//!
//! One [`ExecutionContext`] is created for every stage execution and handed
//! to the stage body explicitly; nothing about the current request lives in
//! process-wide state.

use crate::approval::ApprovalBatch;
use crate::component::ComponentRegistry;
use crate::form::Submission;
use crate::hydrate::InputError;
use crate::results::ResultsPayload;
use serde::{Deserialize, Serialize};

/// Which pass of a stage is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Building the form: components record render instructions.
    Layout,
    /// Handling a submission: components hydrate from the submitted fields.
    Handling,
    /// Resolving a pending approval round.
    ApprovalHandling,
}

/// State of one stage execution.
#[derive(Debug)]
pub struct ExecutionContext {
    pub(crate) stage: String,
    pub(crate) phase: Phase,
    pub(crate) submission: Submission,
    pub(crate) registry: ComponentRegistry,
    pub(crate) approval_requested: bool,
    pub(crate) pending_batch: Option<ApprovalBatch>,
    pub(crate) results: Option<ResultsPayload>,
    pub(crate) deferred_results: Option<ResultsPayload>,
    pub(crate) input_errors: Vec<InputError>,
}

impl ExecutionContext {
    fn new(stage: &str, phase: Phase, submission: Submission) -> Self {
        Self {
            stage: stage.to_string(),
            phase,
            submission,
            registry: ComponentRegistry::new(),
            approval_requested: false,
            pending_batch: None,
            results: None,
            deferred_results: None,
            input_errors: Vec::new(),
        }
    }

    pub fn layout(stage: &str) -> Self {
        Self::new(stage, Phase::Layout, Submission::new())
    }

    pub fn handling(stage: &str, submission: Submission) -> Self {
        Self::new(stage, Phase::Handling, submission)
    }

    /// Context for resolving `batch`, carrying the results deferred when
    /// the batch was frozen.
    pub fn approval_handling(
        batch: ApprovalBatch,
        deferred_results: Option<ResultsPayload>,
        submission: Submission,
    ) -> Self {
        let mut ctx = Self::new(&batch.stage, Phase::ApprovalHandling, submission);
        ctx.pending_batch = Some(batch);
        ctx.deferred_results = deferred_results;
        ctx
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    /// True only while handling a submission.
    pub fn submitted(&self) -> bool {
        self.phase == Phase::Handling
    }

    pub fn approval_requested(&self) -> bool {
        self.approval_requested
    }

    pub fn pending_batch(&self) -> Option<&ApprovalBatch> {
        self.pending_batch.as_ref()
    }

    pub fn input_errors(&self) -> &[InputError] {
        &self.input_errors
    }

    /// Remove the frozen batch and its deferred results.
    pub fn take_pending(&mut self) -> Option<(ApprovalBatch, Option<ResultsPayload>)> {
        let batch = self.pending_batch.take()?;
        Some((batch, self.deferred_results.take()))
    }

    /// Clear everything accumulated by a run so the next one starts clean.
    pub fn reset(&mut self) {
        self.registry.reset();
        self.submission = Submission::new();
        self.approval_requested = false;
        self.pending_batch = None;
        self.results = None;
        self.deferred_results = None;
        self.input_errors.clear();
    }
}
