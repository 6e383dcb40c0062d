//! Stagecraft: stages, table changesets and approvals for low-code tools
//!
//! A tool is a set of named stages. Each stage is one body that describes
//! its form and handles the submission of that form, manipulating named
//! tables through a copy-on-write changeset that is either flushed or held
//! back for human approval.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Tool (one mutex per tool)                                    │
//! │                                                              │
//! │  layout ─► Stage (Layout)   ─► ComponentRegistry ─► Layout   │
//! │  submit ─► Stage (Handling) ─► hydrate ─► TableChangeset     │
//! │                                   │            │             │
//! │                          flush ◄──┘            └─► freeze    │
//! │                                                    │         │
//! │  approve ─► resolve ─► commit approved subset ◄────┘         │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//!                stagecraft_catalog::TableCatalog
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use stagecraft::{Submission, Tool, ValueType};
//! use stagecraft_catalog::{MemoryCatalog, Table};
//!
//! let mut tool = Tool::new("demo", Box::new(MemoryCatalog::new()))?;
//! tool.add_stage("Add Person", |s| {
//!     let name = s.user_input("Name", ValueType::Text)?;
//!     if s.submitted() {
//!         let table = Table::new(["Name"])?.with_row([name.get()?.to_cell()])?;
//!         s.tables().set("People", table);
//!         s.request_approval()?;
//!     }
//!     Ok(())
//! })?;
//!
//! let layout = tool.layout("Add Person")?;
//! let response = tool.submit("Add Person", Submission::new().with("component_0", "Oski"))?;
//! ```

pub mod approval;
pub mod changeset;
pub mod component;
pub mod config;
pub mod context;
mod error;
pub mod form;
pub mod hydrate;
pub mod results;
pub mod schema;
pub mod stage;
pub mod tool;

pub use approval::{
    ApprovalBatch, ApprovalError, ApprovalForm, ApprovalItem, ApprovalResponse, CommitReport,
    Decision, DecisionSet,
};
pub use changeset::{ChangesetError, TableChangeset};
pub use component::{ColumnRef, ComponentId, Input, Layout, TableChoice};
pub use context::{ExecutionContext, Phase};
pub use error::{Result, StageError};
pub use form::{FieldValue, Submission};
pub use hydrate::{InputError, InputValue, ValueType};
pub use results::ResultsPayload;
pub use schema::{FormSchema, HydratedForm};
pub use stage::{Stage, StageOutcome, StageResponse, StageScope};
pub use tool::Tool;
