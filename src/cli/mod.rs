//! Top-level CLI parsing and command execution (spec §4.12): a thin driver
//! over the orchestrator, not the HTTP submission surface, which stays out
//! of scope. Markdown output by default, `--json` for the typed state.

use clap::{Parser, Subcommand};
use uuid::Uuid;

pub mod health;

use crate::config::Config;
use crate::error::RepurposeError;
use crate::model::{RunRequest, RunStatus};
use crate::orchestrator::Orchestrator;

#[derive(Parser, Debug)]
#[command(
    name = "repurposer",
    about = "Orchestrated drug-repurposing discovery pipeline",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON instead of Markdown
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a run and drive it to completion
    Run {
        /// Disease or condition to investigate (e.g. "melanoma")
        #[arg(long)]
        indication: String,
        /// Target geography/market (e.g. "US", "EU", "global")
        #[arg(long)]
        geography: String,
        /// Minimum clinical trial phase for a candidate to qualify (1-4, default 1)
        #[arg(long)]
        min_phase: Option<u8>,
        /// Exclude non-oral (injectable/infused) candidates
        #[arg(long)]
        oral_only: bool,
        /// Exclude biologic modalities (antibodies, peptides, proteins)
        #[arg(long)]
        exclude_biologics: bool,
        /// Exclude candidates with a HIGH patent-risk tier instead of merely down-ranking them
        #[arg(long)]
        strict_fto: bool,
    },
    /// Print a run's metadata and derived counters
    Status {
        run_id: Uuid,
    },
    /// Print a run's rendered report
    Report {
        run_id: Uuid,
    },
    /// Dump a run's full persisted state
    State {
        run_id: Uuid,
    },
    /// Check connectivity to every configured collaborator
    Health,
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String, RepurposeError> {
    serde_json::to_string_pretty(value).map_err(|err| RepurposeError::ApiJson { api: "cli".to_string(), source: err })
}

fn status_markdown(metadata: &crate::model::RunMetadata) -> String {
    let mut out = format!("# Run {}\n\n", metadata.run_id);
    out.push_str(&format!("- Indication: {}\n", metadata.indication));
    out.push_str(&format!("- Geography: {}\n", metadata.geography));
    out.push_str(&format!("- Status: {:?}\n", metadata.status));
    out.push_str(&format!("- Created: {}\n", metadata.created_at));
    if let Some(started) = metadata.started_at {
        out.push_str(&format!("- Started: {started}\n"));
    }
    if let Some(completed) = metadata.completed_at {
        out.push_str(&format!("- Completed: {completed}\n"));
    }
    if let Some(err) = &metadata.error_message {
        out.push_str(&format!("- Error: {err}\n"));
    }
    if let Some(report) = &metadata.report_path {
        out.push_str(&format!("- Report: {report}\n"));
    }
    out
}

/// Parses and executes one CLI invocation, returning the rendered string the
/// caller prints to stdout. Follows the teacher's pattern of centralizing
/// dispatch in one `run` function rather than scattering `match` arms across
/// `main.rs`.
pub async fn run(cli: Cli, config: &Config) -> anyhow::Result<String> {
    let orchestrator = Orchestrator::new(config).await?;

    match cli.command {
        Commands::Run {
            indication,
            geography,
            min_phase,
            oral_only,
            exclude_biologics,
            strict_fto,
        } => {
            let request = RunRequest::validate(indication, geography, min_phase, oral_only, exclude_biologics, strict_fto)?;
            let run_id = orchestrator.start(request).await?;
            orchestrator.drive(run_id).await?;
            let metadata = orchestrator.store().load_metadata(run_id).await?;

            if cli.json {
                let state = orchestrator.store().load_state(run_id).await?;
                Ok(to_pretty_json(&state)?)
            } else {
                let mut out = status_markdown(&metadata);
                if metadata.status == RunStatus::Succeeded {
                    let state = orchestrator.store().load_state(run_id).await?;
                    out.push_str(&format!("\n## Ranked Candidates ({})\n\n", state.ranked.len()));
                    out.push_str("| Rank | Drug | Tier | Final Score |\n");
                    out.push_str("|------|------|------|-------------|\n");
                    for ranked in state.ranked.iter().take(20) {
                        out.push_str(&format!(
                            "| {} | {} | {:?} | {:.1} |\n",
                            ranked.rank, ranked.candidate.drug_name, ranked.tier, ranked.final_score
                        ));
                    }
                }
                Ok(out)
            }
        }

        Commands::Status { run_id } => {
            let metadata = orchestrator.store().load_metadata(run_id).await?;
            if cli.json {
                Ok(to_pretty_json(&metadata)?)
            } else {
                let mut out = status_markdown(&metadata);
                if let Ok(state) = orchestrator.store().load_state(run_id).await {
                    out.push_str(&format!("\n- Candidates found: {}\n", state.candidates.len()));
                    let trials_count = state.trials.as_ref().map(|t| t.per_candidate.len()).unwrap_or(0);
                    out.push_str(&format!("- Trials count: {trials_count}\n"));
                }
                Ok(out)
            }
        }

        Commands::Report { run_id } => {
            let metadata = orchestrator.store().load_metadata(run_id).await?;
            let Some(report_path) = &metadata.report_path else {
                return Err(RepurposeError::NotFound {
                    entity: "report".to_string(),
                    id: run_id.to_string(),
                    suggestion: Some("the run has not yet completed successfully".to_string()),
                }
                .into());
            };
            let bytes = tokio::fs::read(report_path).await?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }

        Commands::State { run_id } => {
            // spec §4.12: dumps `state.json` verbatim, `--json` is a no-op here.
            let state = orchestrator.store().load_state(run_id).await?;
            Ok(to_pretty_json(&state)?)
        }

        Commands::Health => {
            let report = health::check(config).await?;
            if cli.json {
                Ok(to_pretty_json(&report)?)
            } else {
                Ok(report.to_markdown())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_markdown_includes_error_when_failed() {
        let mut metadata = crate::model::RunMetadata::new("melanoma".into(), "US".into());
        metadata.mark_failed("disease not found".into());
        let out = status_markdown(&metadata);
        assert!(out.contains("Error: disease not found"));
    }

    #[test]
    fn status_markdown_omits_optional_lines_when_absent() {
        let metadata = crate::model::RunMetadata::new("melanoma".into(), "US".into());
        let out = status_markdown(&metadata);
        assert!(!out.contains("- Error:"));
        assert!(!out.contains("- Started:"));
    }
}
