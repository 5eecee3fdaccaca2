use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use codeloom_core::config::{AppConfig, CheckpointConfig};
use codeloom_core::traits::GenerationService;
use codeloom_core::types::{ApprovalStatus, RunId};
use codeloom_flow::{ApprovalBroker, CheckpointStore, Engine, RunConfig, RunOutcome, WorkflowState};
use codeloom_llm::ThrottledService;

#[derive(Parser)]
#[command(
    name = "codeloom",
    version,
    about = "Multi-agent code generation and review workflows"
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "codeloom.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full workflow for a task description
    Generate {
        /// The task to hand to the workflow
        task: String,

        #[command(flatten)]
        opts: RunOpts,
    },
    /// Review code from a file
    Review {
        /// File containing the code to review
        file: PathBuf,

        #[command(flatten)]
        opts: RunOpts,
    },
    /// Add documentation to code from a file
    Document {
        /// File containing the code to document
        file: PathBuf,

        #[command(flatten)]
        opts: RunOpts,
    },
    /// Check configuration, credentials, and resumable runs
    Status,
}

#[derive(Args)]
struct RunOpts {
    /// Override the configured model
    #[arg(short, long)]
    model: Option<String>,

    /// Save output to a file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    /// Pause for human approval before finishing
    #[arg(short, long)]
    interactive: bool,
}

#[derive(Clone, Copy, PartialEq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
    Pretty,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("codeloom=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    config.apply_env_overrides();

    match cli.command {
        Commands::Generate { task, opts } => run_workflow(&config, task, opts, false).await,
        Commands::Review { file, opts } => {
            let code = std::fs::read_to_string(&file)?;
            let task = format!("Please review this code for improvements:\n\n```\n{code}\n```");
            run_workflow(&config, task, opts, false).await
        }
        Commands::Document { file, opts } => {
            let code = std::fs::read_to_string(&file)?;
            let task = format!("Add comprehensive documentation to this code:\n\n```\n{code}\n```");
            run_workflow(&config, task, opts, true).await
        }
        Commands::Status => show_status(&config, &cli.config),
    }
}

async fn run_workflow(
    config: &AppConfig,
    task: String,
    opts: RunOpts,
    artifact_only: bool,
) -> anyhow::Result<()> {
    let interactive = opts.interactive || config.flow.interactive;

    let service: Arc<dyn GenerationService> = Arc::new(ThrottledService::new(
        codeloom_llm::create_service(&config.model),
        config.flow.max_concurrent_requests,
    ));
    let checkpoints = open_checkpoint_store(&config.checkpoint)?;
    let engine = Engine::standard(service, config.model.clone(), checkpoints);

    let run_id = RunId::new();
    let mut run_config = RunConfig::from_flow(&config.flow);
    run_config.interactive = interactive;
    run_config.model = opts.model.clone();

    // Ctrl-C stops the run at the next step boundary; the checkpoint keeps
    // it resumable.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping after the current step");
                cancel.cancel();
            }
        });
    }

    if interactive {
        spawn_approval_prompt(engine.approvals(), run_id.clone());
    }

    info!(run = %run_id, "dispatching task");
    match engine
        .run_cancellable(&run_id, &task, run_config, cancel)
        .await
    {
        Ok(outcome) => render_outcome(&outcome, opts.format, opts.output.as_deref(), artifact_only),
        Err(err) => {
            report_partial_state(&err.state);
            Err(err.into())
        }
    }
}

/// Read a y/N answer from stdin and feed it to the approval broker. A
/// closed stream resolves to rejection.
fn spawn_approval_prompt(approvals: Arc<ApprovalBroker>, run_id: RunId) {
    tokio::spawn(async move {
        let answer = tokio::task::spawn_blocking(|| {
            print!("Approve the final artifact? [y/N] ");
            let _ = io::stdout().flush();
            let mut line = String::new();
            match io::stdin().lock().read_line(&mut line) {
                Ok(0) | Err(_) => None,
                Ok(_) => Some(line),
            }
        })
        .await
        .ok()
        .flatten();

        let status = match answer {
            Some(line) if line.trim().eq_ignore_ascii_case("y") => ApprovalStatus::Approved,
            _ => ApprovalStatus::Rejected,
        };
        approvals.respond(&run_id, status).await;
    });
}

fn render_outcome(
    outcome: &RunOutcome,
    format: OutputFormat,
    output: Option<&Path>,
    artifact_only: bool,
) -> anyhow::Result<()> {
    if artifact_only {
        if let (Some(path), Some(artifact)) = (output, outcome.documented_artifact.as_deref()) {
            std::fs::write(path, artifact)?;
            println!("Documented artifact saved to {}", path.display());
            return Ok(());
        }
    }

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(outcome)?,
        OutputFormat::Text => text_format(outcome),
        OutputFormat::Pretty => pretty_format(outcome),
    };

    match output {
        Some(path) => {
            // Pretty decoration doesn't belong in a file
            let contents = if format == OutputFormat::Pretty {
                text_format(outcome)
            } else {
                rendered
            };
            std::fs::write(path, contents)?;
            println!("Output saved to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn text_format(outcome: &RunOutcome) -> String {
    let na = "N/A";
    let mut out = String::new();
    out.push_str(&format!(
        "Decision: {}\n",
        outcome.decision.map(|d| d.as_str()).unwrap_or(na)
    ));
    out.push_str(&format!(
        "Generated Code:\n{}\n",
        outcome.generated_artifact.as_deref().unwrap_or(na)
    ));
    out.push_str(&format!(
        "Review Feedback:\n{}\n",
        outcome.review_feedback.as_deref().unwrap_or(na)
    ));
    out.push_str(&format!(
        "Documented Code:\n{}\n",
        outcome.documented_artifact.as_deref().unwrap_or(na)
    ));
    out.push_str(&format!(
        "Approval Status: {}\n",
        outcome.approval_status.map(|s| s.as_str()).unwrap_or(na)
    ));
    out
}

fn pretty_format(outcome: &RunOutcome) -> String {
    let mut out = String::new();

    if let Some(decision) = outcome.decision {
        out.push_str(&section("Orchestrator decision", decision.as_str()));
    }
    if let Some(code) = outcome.generated_artifact.as_deref() {
        out.push_str(&section("Generated code", code));
    }
    if let Some(feedback) = outcome.review_feedback.as_deref() {
        out.push_str(&section("Review feedback", feedback));
    }
    if let Some(docs) = outcome.documented_artifact.as_deref() {
        // Skip the duplicate when documentation didn't change anything
        if outcome.generated_artifact.as_deref() != Some(docs) {
            out.push_str(&section("Final artifact", docs));
        }
    }
    if let Some(status) = outcome.approval_status {
        out.push_str(&section("Approval status", status.as_str()));
    }

    out.trim_end().to_string()
}

fn section(title: &str, body: &str) -> String {
    format!("── {title} ──\n{body}\n\n")
}

fn report_partial_state(state: &WorkflowState) {
    let mut populated = Vec::new();
    if state.routing_decision.is_some() {
        populated.push("routingDecision");
    }
    if state.generated_artifact.is_some() {
        populated.push("generatedArtifact");
    }
    if state.review_feedback.is_some() {
        populated.push("reviewFeedback");
    }
    if state.documented_artifact.is_some() {
        populated.push("documentedArtifact");
    }

    if populated.is_empty() {
        warn!("run failed before producing any output");
    } else {
        warn!(
            fields = %populated.join(", "),
            "run failed; partial state preserved"
        );
    }
}

fn show_status(config: &AppConfig, config_path: &Path) -> anyhow::Result<()> {
    struct Check {
        label: &'static str,
        ok: bool,
        detail: String,
    }

    let mut checks = Vec::new();

    checks.push(if config_path.exists() {
        Check {
            label: "Config",
            ok: true,
            detail: config_path.display().to_string(),
        }
    } else {
        Check {
            label: "Config",
            ok: true,
            detail: "built-in defaults".to_string(),
        }
    });

    let has_key = config
        .model
        .api_key
        .as_ref()
        .is_some_and(|k| !k.is_empty() && !k.starts_with("${"));
    checks.push(Check {
        label: "API Key",
        ok: has_key,
        detail: if has_key {
            format!("configured for {} ({})", config.model.model_id, config.model.provider)
        } else {
            format!("no API key set for provider '{}'", config.model.provider)
        },
    });

    let mut resumable = Vec::new();
    checks.push(match open_checkpoint_store(&config.checkpoint) {
        Ok(Some(store)) => {
            resumable = store.list().unwrap_or_default();
            Check {
                label: "Checkpoints",
                ok: true,
                detail: format!("{} resumable run(s)", resumable.len()),
            }
        }
        Ok(None) => Check {
            label: "Checkpoints",
            ok: true,
            detail: "disabled".to_string(),
        },
        Err(e) => Check {
            label: "Checkpoints",
            ok: false,
            detail: e.to_string(),
        },
    });

    let mut issues = 0;
    for check in &checks {
        let icon = if check.ok { "[OK]" } else { "[!!]" };
        println!("  {} {}: {}", icon, check.label, check.detail);
        if !check.ok {
            issues += 1;
        }
    }

    if !resumable.is_empty() {
        println!();
        println!("  Resumable runs:");
        for record in &resumable {
            println!(
                "    {} — interrupted after '{}' ({})",
                record.run_id,
                record.step,
                record.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
    }

    println!();
    println!("  {} checked, {} issue(s) found", checks.len(), issues);
    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    if path.exists() {
        return Ok(AppConfig::load(path)?);
    }

    // Fall back to the home config, then to built-in defaults
    if let Some(home) = home_dir() {
        let home_config = home.join(".codeloom").join("config.toml");
        if home_config.exists() {
            return Ok(AppConfig::load(&home_config)?);
        }
    }
    Ok(AppConfig::default())
}

fn open_checkpoint_store(
    config: &CheckpointConfig,
) -> anyhow::Result<Option<Arc<CheckpointStore>>> {
    if !config.enabled {
        return Ok(None);
    }
    let path = match &config.path {
        Some(p) => PathBuf::from(p),
        None => home_dir()
            .map(|h| h.join(".codeloom").join("checkpoints.db"))
            .unwrap_or_else(|| PathBuf::from("codeloom-checkpoints.db")),
    };
    Ok(Some(Arc::new(CheckpointStore::open(&path)?)))
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
