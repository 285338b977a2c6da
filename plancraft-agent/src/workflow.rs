//! Workflow implementation - plan, human review, develop

use crate::output::{OutputWriter, WriteReport};
use crate::plan::PlanStore;
use crate::prompt::{development_prompt, planning_prompt, AgentProfile};
use crate::review::{ReviewDecision, ReviewGate};
use chrono::Local;
use plancraft_error::{Error, Result};
use plancraft_llm::{ChatMessage, CompletionRequest, FinishReason, LlmProvider, UsageTracker};
use std::path::{Path, PathBuf};

/// Per-call model settings
#[derive(Debug, Clone, Default)]
pub struct WorkflowConfig {
    /// Overrides the provider's default model
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

/// How a full run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    Completed { plan: PathBuf, report: WriteReport },
    /// The operator quit at the review gate; the plan is kept
    Cancelled { plan: PathBuf },
}

/// Runs the planning and developer agents against one provider
pub struct Workflow<P> {
    provider: P,
    plans: PlanStore,
    output: OutputWriter,
    config: WorkflowConfig,
    usage: UsageTracker,
}

impl<P: LlmProvider> Workflow<P> {
    pub fn new(provider: P, plans: PlanStore, output: OutputWriter) -> Self {
        Self {
            provider,
            plans,
            output,
            config: WorkflowConfig::default(),
            usage: UsageTracker::new(),
        }
    }

    pub fn with_config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn plans(&self) -> &PlanStore {
        &self.plans
    }

    pub fn output(&self) -> &OutputWriter {
        &self.output
    }

    /// Token usage of every call made so far
    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// Planning phase: requirements in, saved plan path out.
    pub async fn plan(&mut self, requirements: &str) -> Result<PathBuf> {
        if requirements.trim().is_empty() {
            return Err(Error::invalid_argument("requirements are empty").with_operation("workflow::plan"));
        }

        tracing::info!("planning phase started");
        let now = Local::now();
        let task = planning_prompt(requirements);
        let plan = self.invoke(&AgentProfile::planner(), task, "workflow::plan").await?;

        let path = self.plans.save_at(&plan, now)?;
        tracing::info!(plan = %path.display(), "planning phase completed");
        Ok(path)
    }

    /// Development phase: read the (possibly edited) plan, write generated files.
    pub async fn develop(&mut self, plan_path: &Path) -> Result<WriteReport> {
        let plan = PlanStore::load(plan_path).map_err(|e| e.with_operation("workflow::develop"))?;

        tracing::info!(plan = %plan_path.display(), "development phase started");
        let task = development_prompt(plan_path, &plan);
        let response = self.invoke(&AgentProfile::developer(), task, "workflow::develop").await?;

        let report = self
            .output
            .write_response(&response, Local::now())
            .map_err(|e| e.with_operation("workflow::develop"))?;
        if report.written.is_empty() {
            tracing::warn!(rejected = report.rejected.len(), "no files were written");
        }
        tracing::info!(
            written = report.written.len(),
            rejected = report.rejected.len(),
            "development phase completed"
        );
        Ok(report)
    }

    /// Full workflow. The plan is on disk before the gate is consulted.
    pub async fn run<G: ReviewGate>(&mut self, requirements: &str, gate: &mut G) -> Result<WorkflowOutcome> {
        let plan = self.plan(requirements).await?;

        match gate.review(&plan)? {
            ReviewDecision::Quit => {
                tracing::info!(plan = %plan.display(), "workflow cancelled at review");
                Ok(WorkflowOutcome::Cancelled { plan })
            }
            ReviewDecision::Approve => {
                let report = self.develop(&plan).await?;
                Ok(WorkflowOutcome::Completed { plan, report })
            }
        }
    }

    /// One agent call: persona as system message, task as user message.
    async fn invoke(&mut self, profile: &AgentProfile, task: String, operation: &'static str) -> Result<String> {
        let mut request = CompletionRequest::new(vec![
            ChatMessage::system(profile.system_prompt()),
            ChatMessage::user(task),
        ]);
        if let Some(model) = &self.config.model {
            request = request.with_model(model.clone());
        }
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string());
        tracing::debug!(agent = profile.role, provider = self.provider.name(), %model, "invoking agent");

        let response = self.provider.complete(request).await.map_err(|e| {
            Error::from(e)
                .with_operation(operation)
                .with_context("agent", profile.role)
                .with_context("model", model.clone())
        })?;

        self.usage.track(&model, &response.usage);
        tracing::info!(
            agent = profile.role,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "agent responded"
        );
        if response.finish_reason == FinishReason::Length {
            tracing::warn!(agent = profile.role, "response hit the token limit and may be truncated");
        }

        response.into_text().map_err(|e| {
            Error::from(e)
                .with_operation(operation)
                .with_context("agent", profile.role)
        })
    }
}
