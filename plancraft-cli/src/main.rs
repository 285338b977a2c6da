//! # plancraft CLI
//!
//! Plan with an LLM, review the plan by hand, then let a second call write the code.
//!
//! Usage:
//!   plancraft [REQUIREMENTS...]
//!   plancraft develop [PLAN]
//!   plancraft plans
//!
//! Examples:
//!   plancraft "A todo app with a REST API and SQLite storage"
//!   plancraft develop plans/implementation_plan_20250114_093012.md
//!   plancraft --provider anthropic --yes "A CLI that renames photos by EXIF date"

mod config;

use clap::{Parser, Subcommand};
use config::ProviderSettings;
use plancraft_agent::{
    ask, AutoApprove, ConsoleReview, OutputWriter, PlanStore, ReviewGate, Workflow,
    WorkflowConfig, WorkflowOutcome, WriteReport,
};
use plancraft_error::{Error, Result};
use plancraft_llm::{Provider, ProviderType};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "plancraft")]
#[command(author, version, about = "plancraft - plan with an LLM, review by hand, then generate code")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// What to build (when not using subcommands)
    #[arg(trailing_var_arg = true)]
    requirements: Vec<String>,

    /// Directory for plan documents
    #[arg(long, global = true, env = "PLANCRAFT_PLANS_DIR", default_value = "plans")]
    plans_dir: PathBuf,

    /// Directory for generated files
    #[arg(long, global = true, env = "PLANCRAFT_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Completion backend: openai or anthropic
    #[arg(long, global = true, env = "PLANCRAFT_PROVIDER", default_value = "openai")]
    provider: ProviderType,

    /// Model name (defaults to the provider's default)
    #[arg(short, long, global = true, env = "PLANCRAFT_MODEL")]
    model: Option<String>,

    /// API base URL, for OpenAI-compatible servers
    #[arg(long, global = true, env = "PLANCRAFT_BASE_URL")]
    base_url: Option<String>,

    /// HTTP timeout per model call, in seconds
    #[arg(long, global = true, env = "PLANCRAFT_TIMEOUT_SECS", default_value = "300")]
    timeout_secs: u64,

    /// Sampling temperature
    #[arg(long, global = true)]
    temperature: Option<f32>,

    /// Output token budget per call
    #[arg(long, global = true)]
    max_tokens: Option<usize>,

    /// Approve the plan without stopping for review
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    /// Enable verbose output (debug logs, full error details)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - only print results
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan, review, then develop
    Run {
        /// What to build
        #[arg(trailing_var_arg = true)]
        requirements: Vec<String>,
    },
    /// Develop from an existing plan (defaults to the newest one)
    Develop {
        /// Path to the plan file
        plan: Option<PathBuf>,
    },
    /// List saved plans, newest first
    Plans,
}

fn init_logging(verbose: bool, quiet: bool) {
    let default = if verbose {
        "warn,plancraft=debug,plancraft_agent=debug,plancraft_llm=debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn fail(error: Error, verbose: bool) -> ! {
    if verbose {
        eprintln!("Error: {:?}", error);
    } else {
        eprintln!("Error: {}", error);
    }
    std::process::exit(1);
}

impl Cli {
    fn settings(&self) -> ProviderSettings {
        ProviderSettings {
            provider: self.provider,
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout_secs,
        }
    }

    fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            model: None,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Check the API key, then set up directories and the provider.
    fn workflow(&self) -> Result<Workflow<Provider>> {
        let provider_config = self.settings().from_env()?;
        let plans = PlanStore::new(&self.plans_dir)?;
        let output = OutputWriter::new(&self.output_dir)?;
        let provider = Provider::from_config(provider_config)?;
        Ok(Workflow::new(provider, plans, output).with_config(self.workflow_config()))
    }
}

fn print_report(report: &WriteReport, output_dir: &Path) {
    println!("\nDevelopment phase completed.");
    println!("Wrote {} file(s) under {}:", report.written.len(), output_dir.display());
    for path in &report.written {
        println!("  - {}", path.display());
    }
    for path in &report.rejected {
        eprintln!("  skipped unsafe path: {}", path);
    }
}

fn print_usage(workflow: &Workflow<Provider>) {
    let usage = workflow.usage();
    println!(
        "Tokens used: {} ({} prompt, {} completion) over {} call(s)",
        usage.total_tokens(),
        usage.total_prompt_tokens,
        usage.total_completion_tokens,
        usage.total_calls
    );
}

async fn run_workflow(cli: &Cli, requirements: Vec<String>) -> Result<()> {
    let mut workflow = cli.workflow()?;

    if !cli.quiet {
        println!("plancraft - plan, review, develop");
        println!("The plan is written to a file you can review and edit before any code is generated.");
    }

    let mut requirements = requirements.join(" ");
    if requirements.trim().is_empty() {
        let stdin = std::io::stdin();
        let answer = ask(&mut stdin.lock(), &mut std::io::stdout(), "\nDescribe what you want to build: ")?;
        requirements = answer.unwrap_or_default();
    }
    if requirements.trim().is_empty() {
        return Err(Error::invalid_argument("please provide some requirements").with_operation("cli::run"));
    }

    if !cli.quiet {
        println!("\nStarting planning phase...");
    }

    let mut gate: Box<dyn ReviewGate> = if cli.yes {
        Box::new(AutoApprove)
    } else {
        Box::new(ConsoleReview::stdio())
    };
    let outcome = workflow.run(&requirements, &mut gate).await?;

    match outcome {
        WorkflowOutcome::Completed { plan, report } => {
            if !cli.quiet {
                println!("\nPlan: {}", plan.display());
            }
            print_report(&report, workflow.output().dir());
        }
        WorkflowOutcome::Cancelled { plan } => {
            println!("\nWorkflow cancelled. The plan is kept at {}", plan.display());
            println!("Resume later with: plancraft develop {}", plan.display());
        }
    }

    if !cli.quiet {
        print_usage(&workflow);
    }
    Ok(())
}

async fn run_develop(cli: &Cli, plan: Option<PathBuf>) -> Result<()> {
    let mut workflow = cli.workflow()?;

    let plan = match plan {
        Some(plan) => plan,
        None => workflow.plans().latest()?.ok_or_else(|| {
            Error::invalid_argument("no plan given and none found")
                .with_operation("cli::develop")
                .with_context("plans_dir", workflow.plans().dir().display().to_string())
        })?,
    };

    if !cli.quiet {
        println!("Starting development phase with plan: {}", plan.display());
    }

    let report = workflow.develop(&plan).await?;
    print_report(&report, workflow.output().dir());

    if !cli.quiet {
        print_usage(&workflow);
    }
    Ok(())
}

fn list_plans(cli: &Cli) -> Result<()> {
    let store = PlanStore::new(&cli.plans_dir)?;
    let plans = store.list()?;

    println!("Plans in {}:", store.dir().display());
    if plans.is_empty() {
        println!("  (no plans found)");
    }
    for entry in plans {
        println!("  - {} ({} bytes)", entry.path.display(), entry.size);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // Before parsing, so flag env fallbacks see .env values
    let dotenv = config::load_dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match dotenv {
        Ok(Some(path)) => tracing::debug!(path = %path.display(), "loaded environment file"),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env file"),
    }

    let result = match &cli.command {
        Some(Commands::Plans) => list_plans(&cli),
        Some(Commands::Develop { plan }) => run_develop(&cli, plan.clone()).await,
        Some(Commands::Run { requirements }) => run_workflow(&cli, requirements.clone()).await,
        None => run_workflow(&cli, cli.requirements.clone()).await,
    };

    if let Err(e) = result {
        fail(e, cli.verbose);
    }
}
