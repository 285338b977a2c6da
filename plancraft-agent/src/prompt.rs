//! Prompt templates for the planning and developer agents

use crate::output::FILE_MARKER;
use std::path::Path;

/// Sections every implementation plan is asked to cover, in order.
pub const PLAN_SECTIONS: [(&str, &str); 12] = [
    ("Project Overview", "Clear summary of what will be built"),
    ("Technical Stack", "Recommended technologies, frameworks, and libraries"),
    ("Architecture", "High-level system design and component interactions"),
    ("File Structure", "Complete directory and file organization"),
    ("Database Design", "Schema, relationships, and data models (if applicable)"),
    ("API Design", "Endpoints, request/response formats (if applicable)"),
    ("Implementation Steps", "Ordered list of development phases"),
    ("Key Components", "Detailed breakdown of each major component"),
    ("Dependencies", "External libraries and their purposes"),
    ("Configuration", "Environment variables, settings, and deployment notes"),
    ("Testing Strategy", "Unit tests, integration tests, and testing approach"),
    ("Potential Challenges", "Known issues and proposed solutions"),
];

/// Name of the summary file the developer agent is asked to produce.
pub const SUMMARY_FILE: &str = "SUMMARY.md";

/// Persona sent as the system message of an agent's call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentProfile {
    pub role: &'static str,
    pub goal: &'static str,
    pub backstory: &'static str,
}

impl AgentProfile {
    pub fn planner() -> Self {
        Self {
            role: "Senior Technical Planner",
            goal: "Create comprehensive, detailed technical implementation plans that can be \
                   easily understood and modified by humans before development",
            backstory: "You are a senior software architect with 15+ years of experience in \
                        planning and designing software systems. You excel at breaking down \
                        complex requirements into clear, actionable implementation plans. You \
                        understand that your plans will be reviewed and potentially modified by \
                        humans before implementation, so you make them detailed yet flexible.",
        }
    }

    pub fn developer() -> Self {
        Self {
            role: "Senior Full-Stack Developer",
            goal: "Implement high-quality code exactly according to the approved technical plan",
            backstory: "You are an expert full-stack developer who excels at following detailed \
                        specifications. You read technical plans carefully and implement them \
                        precisely. You write clean, well-documented, production-ready code.",
        }
    }

    pub fn system_prompt(&self) -> String {
        format!(
            "You are a {}.\n\n{}\n\nYour goal: {}",
            self.role, self.backstory, self.goal
        )
    }
}

/// Task for the planning agent.
pub fn planning_prompt(requirements: &str) -> String {
    let sections: String = PLAN_SECTIONS
        .iter()
        .enumerate()
        .map(|(i, (title, detail))| format!("{}. **{}**: {}\n", i + 1, title, detail))
        .collect();

    format!(
        r#"Create a comprehensive technical implementation plan for the following requirements:

{requirements}

Your plan should include:
{sections}
Respond with the plan only, as a Markdown document. It will be saved to a file for review.

Make the plan detailed enough that a developer can implement it without guessing,
but structured so a human can easily review and modify it."#,
        requirements = requirements.trim(),
        sections = sections,
    )
}

/// Task for the developer agent, with the approved plan inlined.
pub fn development_prompt(plan_file: &Path, plan: &str) -> String {
    format!(
        r#"Implement the complete solution described by the approved implementation plan below
(read from {plan_file}).

Instructions:
1. Read and understand the entire plan thoroughly
2. Follow the plan exactly as specified
3. Create all files and directories as outlined
4. Implement all features and functionality described
5. Include proper error handling and logging
6. Add comprehensive comments and documentation
7. Follow the coding standards mentioned in the plan
8. Create a {summary} file explaining what was implemented and how to run/use it

If any part of the plan is unclear or missing details, do not guess: list the open
questions in {summary}.

Output format: emit every file as a marker line followed by the file's content.
The marker line is exactly

{marker} relative/path/to/file ===

Paths are relative to the project root. Do not use absolute paths or "..".
Write nothing outside of file blocks.

--- APPROVED PLAN ---
{plan}
--- END OF PLAN ---"#,
        plan_file = plan_file.display(),
        summary = SUMMARY_FILE,
        marker = FILE_MARKER,
        plan = plan.trim_end(),
    )
}
