use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use case_timeline_lib::config;
use case_timeline_lib::db::{
    get_case, import_case, list_scenario_versions, open_database, SqliteCaseStore,
};
use case_timeline_lib::models::{Case, ScenarioStats, SectionMap};
use case_timeline_lib::pipeline::refine::{LlmClient, LlmDecisionRefiner, OllamaClient};
use case_timeline_lib::pipeline::ScenarioPipeline;
use case_timeline_lib::pipeline_config::PipelineConfig;

#[derive(Debug, Parser)]
#[command(name = "case-timeline", version, about = "Build versioned scenario timelines from ethics case narratives")]
struct Cli {
    /// SQLite database holding cases and their metadata.
    #[arg(long, short = 'd', env = "CASE_TIMELINE_DB", value_name = "FILE", global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import a case from a JSON object of section name to text.
    Import {
        #[arg(value_name = "SECTIONS_JSON")]
        sections: PathBuf,
        /// Case title. Defaults to the file stem.
        #[arg(long, short = 't')]
        title: Option<String>,
    },
    /// Run the pipeline on a case and print the resulting version.
    Run {
        case_id: Uuid,
        /// Append a new version even if nothing changed.
        #[arg(long, default_value_t = false)]
        overwrite: bool,
    },
    /// List stored scenario versions for a case.
    History { case_id: Uuid },
}

#[derive(Serialize)]
struct RunSummary<'a> {
    case_id: Uuid,
    version_number: u32,
    appended: bool,
    hash: &'a str,
    stats: ScenarioStats,
    ordering: &'a [String],
    decisions: Vec<DecisionSummary<'a>>,
}

#[derive(Serialize)]
struct DecisionSummary<'a> {
    event_id: &'a str,
    text: &'a str,
    refined: bool,
    options: Vec<&'a str>,
}

fn main() -> anyhow::Result<()> {
    case_timeline_lib::init_tracing();
    let cli = Cli::parse();

    let db_path = cli.db.unwrap_or_else(config::default_database_path);
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let conn = open_database(&db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;

    match cli.command {
        Command::Import { sections, title } => {
            let id = import_sections(&conn, &sections, title)?;
            println!("{id}");
        }
        Command::Run { case_id, overwrite } => {
            let config = PipelineConfig::from_env();
            let mut pipeline = ScenarioPipeline::new(SqliteCaseStore::new(conn), config.clone());
            if config.refinement.enabled {
                if let Some(refiner) = build_refiner(&config)? {
                    pipeline = pipeline.with_refiner(Box::new(refiner));
                }
            }

            let outcome = pipeline.run(&case_id, overwrite)?;
            let v = &outcome.version;
            let summary = RunSummary {
                case_id: v.case_id,
                version_number: v.version_number,
                appended: outcome.appended,
                hash: &v.hash,
                stats: v.stats,
                ordering: &v.ordering,
                decisions: v
                    .events
                    .iter()
                    .filter(|e| e.is_decision())
                    .map(|e| DecisionSummary {
                        event_id: &e.id,
                        text: &e.text,
                        refined: e.refined.unwrap_or(false),
                        options: e
                            .options
                            .iter()
                            .flatten()
                            .map(|o| o.label.as_str())
                            .collect(),
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::History { case_id } => {
            if get_case(&conn, &case_id)?.is_none() {
                bail!("case {case_id} not found");
            }
            for v in list_scenario_versions(&conn, &case_id)? {
                println!(
                    "v{}\t{}\tevents={}\tdecisions={}\tsentences={}\t{}",
                    v.version_number,
                    v.generated_at.format("%Y-%m-%d %H:%M:%S"),
                    v.stats.event_count,
                    v.stats.decision_count,
                    v.stats.sentence_count,
                    v.hash
                );
            }
        }
    }

    Ok(())
}

fn import_sections(
    conn: &rusqlite::Connection,
    path: &Path,
    title: Option<String>,
) -> anyhow::Result<Uuid> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let sections: SectionMap = serde_json::from_str(&raw)
        .with_context(|| format!("{} must be a JSON object of section name to text", path.display()))?;

    let case = Case {
        id: Uuid::new_v4(),
        title: title.unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Untitled case".into())
        }),
        created_at: chrono::Local::now().naive_local(),
    };
    import_case(conn, &case, &sections)?;
    tracing::info!(case_id = %case.id, sections = sections.len(), "case imported");
    Ok(case.id)
}

/// Ollama-backed refiner, or `None` when the configured model is not served.
fn build_refiner(config: &PipelineConfig) -> anyhow::Result<Option<LlmDecisionRefiner>> {
    let settings = &config.refinement;
    let client = OllamaClient::from_config(settings)?;

    match client.is_model_available(&settings.model) {
        Ok(true) => Ok(Some(LlmDecisionRefiner::new(Box::new(client), &settings.model))),
        Ok(false) => {
            tracing::warn!(model = %settings.model, "refinement model not available, skipping");
            Ok(None)
        }
        Err(e) => {
            tracing::warn!(error = %e, "refinement server unreachable, skipping");
            Ok(None)
        }
    }
}
