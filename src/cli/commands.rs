//! CLI command definitions for tenthman.
//!
//! `debate` runs a full debate and writes its artifacts; `models` lists the
//! free models available to participants.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{load_dotenv, ConfigError, DebateSettings, DOTENV_FILE, ENV_API_KEY};
use crate::debate::{DebateEngine, EngineConfig, LlmJudge, Participant};
use crate::llm::{LlmProvider, OpenRouterProvider};
use crate::models::ModelRegistry;
use crate::output::{
    create_output_dir, format_verdict, generate_slug, OutputWriter, TerminalObserver,
};

/// Names handed to debaters in order; later debaters are numbered.
const DEBATER_NAMES: [&str; 9] = [
    "Alice", "Bob", "Carol", "Dave", "Eve", "Frank", "Grace", "Heidi", "Ivan",
];

/// Multi-agent debate orchestrator using the Tenth Man Rule.
#[derive(Parser, Debug)]
#[command(name = "tenthman")]
#[command(about = "Multi-agent debate orchestrator using the Tenth Man Rule")]
#[command(version)]
#[command(
    long_about = "tenthman runs multi-agent debates using free LLM models via OpenRouter.\n\nIf nine people agree, the tenth is obligated to argue the contrary position.\n\nExample usage:\n  tenthman debate --topic \"Remote work beats office work\" --agents 5"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// OpenRouter API key (overrides OPENROUTER_API_KEY).
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Output directory for results [default: output].
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Number of debate agents, minimum 3 [default: 9].
    #[arg(long, global = true)]
    pub agents: Option<usize>,

    /// Minimum debate rounds before the consensus check [default: 5].
    #[arg(long, global = true)]
    pub min_rounds: Option<u32>,

    /// Maximum debate rounds [default: 15].
    #[arg(long, global = true)]
    pub max_rounds: Option<u32>,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Run a multi-agent debate on a topic.
    Debate(DebateArgs),

    /// List the free models participants can use.
    Models,
}

/// Arguments for `tenthman debate`.
#[derive(Parser, Debug)]
pub struct DebateArgs {
    /// Debate topic.
    #[arg(short, long)]
    pub topic: String,

    /// Output folder name (default: slug of the topic).
    #[arg(short, long)]
    pub name: Option<String>,
}

impl Cli {
    /// Applies command-line flags on top of `base`.
    pub fn apply_overrides(&self, mut settings: DebateSettings) -> DebateSettings {
        if let Some(key) = &self.api_key {
            settings.api_key = Some(key.clone());
        }
        if let Some(dir) = &self.output_dir {
            settings.output_dir = dir.clone();
        }
        if let Some(agents) = self.agents {
            settings.agents = agents;
        }
        if let Some(min_rounds) = self.min_rounds {
            settings.min_rounds = min_rounds;
        }
        if let Some(max_rounds) = self.max_rounds {
            settings.max_rounds = max_rounds;
        }
        if let Commands::Debate(args) = &self.command {
            settings.topic = args.topic.clone();
            settings.name = args.name.clone();
        }
        settings
    }

    /// API key from `--api-key`, falling back to `OPENROUTER_API_KEY` read
    /// through `lookup`. No other variable is consulted.
    pub fn resolve_api_key<F>(&self, lookup: F) -> Result<String, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.api_key
            .clone()
            .or_else(|| lookup(ENV_API_KEY))
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(ENV_API_KEY.to_string()))
    }
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    load_dotenv(DOTENV_FILE);

    match &cli.command {
        Commands::Debate(_) => run_debate_command(&cli).await,
        Commands::Models => run_models_command(&cli).await,
    }
}

/// Builds debaters for the given models, one per model.
pub fn build_participants(models: &[String]) -> Vec<Participant> {
    models
        .iter()
        .enumerate()
        .map(|(i, model)| {
            let id = i as u32 + 1;
            let name = DEBATER_NAMES
                .get(i)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("Agent-{id}"));
            Participant::debater(id, name, model.clone())
        })
        .collect()
}

/// Output folder slug: `--name` when given, else the topic. Both are
/// slugified so the folder always lands directly under the output directory.
pub fn output_slug(settings: &DebateSettings) -> String {
    generate_slug(settings.name.as_deref().unwrap_or(&settings.topic))
}

/// Cancels `cancel` on Ctrl+C.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            cancel.cancel();
        }
    });
}

// ============================================================================
// Debate Command Implementation
// ============================================================================

async fn run_debate_command(cli: &Cli) -> anyhow::Result<()> {
    let settings = cli.apply_overrides(DebateSettings::from_env()?);
    settings.validate()?;
    let api_key = settings.api_key()?.to_string();

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let provider = Arc::new(OpenRouterProvider::new(api_key)?);
    let registry = ModelRegistry::with_fallback(provider.list_models(&cancel).await);

    let selected = registry.select(settings.agents + 1);
    if selected.len() <= settings.agents {
        anyhow::bail!("No free models available");
    }
    let participants = build_participants(&selected[..settings.agents]);
    let judge_model = selected[0].clone();
    let contrarian_model = selected[settings.agents].clone();
    info!(
        judge = %judge_model,
        contrarian = %contrarian_model,
        free_models = registry.free_models().len(),
        "Models assigned"
    );

    let out_dir = create_output_dir(&settings.output_dir, &output_slug(&settings))?;
    let writer = Arc::new(OutputWriter::new(&out_dir));

    println!("Debate: {}", settings.topic);
    println!(
        "Agents: {} | Rounds: {}-{} | Output: {}\n",
        settings.agents,
        settings.min_rounds,
        settings.max_rounds,
        out_dir.display()
    );

    let llm: Arc<dyn LlmProvider> = provider;
    let judge = Arc::new(LlmJudge::new(llm.clone(), judge_model));
    let config = EngineConfig::new(settings.min_rounds, settings.max_rounds)
        .with_contrarian_model(contrarian_model);
    let mut engine = DebateEngine::new(&settings.topic, participants, llm, judge, config)
        .with_observer(Box::new(TerminalObserver::new().with_writer(writer.clone())));

    let result = match engine.run(&cancel).await {
        Ok(result) => result,
        Err(e) => {
            if let Err(write_err) = writer.write_json(engine.transcript()) {
                warn!(error = %write_err, "Failed to save partial transcript");
            }
            if let Err(log_err) = writer.log(&format!("Debate aborted: {e}")) {
                warn!(error = %log_err, "Failed to append to debate log");
            }
            return Err(anyhow::Error::new(e).context("debate"));
        }
    };

    writer
        .write_json(&result.transcript)
        .context("writing transcript")?;
    writer
        .write_markdown(&result.transcript, result.verdict.as_ref())
        .context("writing report")?;

    println!();
    match &result.verdict {
        Some(verdict) => println!("{}", format_verdict(verdict)),
        None => println!("No consensus checkpoint was reached."),
    }
    println!("\nDebate complete. Output saved to: {}", out_dir.display());
    Ok(())
}

// ============================================================================
// Models Command Implementation
// ============================================================================

async fn run_models_command(cli: &Cli) -> anyhow::Result<()> {
    let api_key = cli.resolve_api_key(|key| std::env::var(key).ok())?;

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let provider = OpenRouterProvider::new(api_key)?;
    let models = provider
        .list_models(&cancel)
        .await
        .context("fetching model list")?;
    let registry = ModelRegistry::new(models);

    if registry.is_empty() {
        println!("No free models available.");
        return Ok(());
    }

    println!("Free models ({}):", registry.free_models().len());
    for model in registry.free_models() {
        if model.name.is_empty() {
            println!("  {}", model.id);
        } else {
            println!("  {:<45} {}", model.id, model.name);
        }
    }
    Ok(())
}
