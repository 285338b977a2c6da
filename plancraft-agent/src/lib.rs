//! # plancraft Agent
//!
//! Two agents around a human:
//! 1. The planning agent turns requirements into a Markdown plan
//! 2. The plan is saved under `plans/` with a timestamped name
//! 3. A human reviews and edits it, then approves or quits
//! 4. The developer agent reads the edited plan and emits files
//! 5. Files are split on `=== FILE: path ===` markers and written under `output/`
//!
//! Agents are prompt templates; the workflow is two sequential model calls.

mod output;
mod plan;
mod prompt;
mod review;
mod workflow;

pub use output::{
    parse_generated_files, safe_relative_path, GeneratedFile, OutputWriter, ParsedOutput,
    WriteReport, FILE_MARKER,
};
pub use plan::{PlanEntry, PlanStore, PLAN_PREFIX};
pub use prompt::{development_prompt, planning_prompt, AgentProfile, PLAN_SECTIONS, SUMMARY_FILE};
pub use review::{ask, AutoApprove, ConsoleReview, ReviewDecision, ReviewGate};
pub use workflow::{Workflow, WorkflowConfig, WorkflowOutcome};
