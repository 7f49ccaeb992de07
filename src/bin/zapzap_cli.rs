//! `zapzap-cli`: genetic HardVince parameter optimizer and DRL training
//! driver (spec §6).
//!
//! Both subcommands install a `tracing-subscriber` `EnvFilter` subscriber
//! (`RUST_LOG=zapzap_cli=info,zapzap_engine=info` by default) and report
//! failures through `anyhow`, exiting non-zero on error per spec §7.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use zapzap_engine::training::{
    CurriculumConfig, CurriculumPhase, ModelIO, ModelMetadata, Orchestrator, OrchestratorConfig,
    OrchestratorEvent, OptimizerConfig, TrainingConfig,
};
use zapzap_engine::training::GeneticOptimizer;

#[derive(Parser)]
#[command(
    name = "zapzap-cli",
    about = "ZapZap genetic parameter optimizer and DRL training driver"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evolve `HardVince` parameters with a genetic algorithm.
    Optimize(OptimizeArgs),
    /// Drive the DRL training orchestrator (worker pool + curriculum + PER).
    Train(TrainArgs),
}

#[derive(clap::Args)]
struct OptimizeArgs {
    #[arg(long, default_value_t = 50)]
    generations: usize,
    #[arg(long, default_value_t = 40)]
    population: usize,
    #[arg(long, default_value_t = 4)]
    elite: usize,
    #[arg(long = "mutation", default_value_t = 0.15)]
    mutation: f32,
    #[arg(long = "mutation-range", default_value_t = 0.25)]
    mutation_range: f32,
    #[arg(long = "crossover", default_value_t = 0.7)]
    crossover: f32,
    #[arg(long = "games", default_value_t = 2000)]
    games: usize,
    #[arg(long, default_value_t = num_cpus::get())]
    workers: usize,
    #[arg(long, default_value = "optimized_params.json")]
    output: PathBuf,
    #[arg(long, default_value_t = 0x5eed_0123)]
    seed: u64,
}

#[derive(clap::Args)]
struct TrainArgs {
    /// Total self-play games to run before stopping.
    #[arg(long, default_value_t = 10_000)]
    games: u64,

    /// Fixed opponent table for non-curriculum runs, e.g. `hard,hard,random`
    /// (seat 0 is always the learner). Ignored when `--curriculum` is set.
    #[arg(long, value_delimiter = ',', default_value = "hard,hard,hard")]
    strategies: Vec<String>,

    /// Present for compatibility with the spec's flag set: the orchestrator
    /// always trains a DRL policy in seat 0, so this is accepted but has no
    /// additional effect.
    #[arg(long)]
    drl: bool,

    /// Pre-fill the replay buffer with HardVince expert demonstrations
    /// before any self-play.
    #[arg(long)]
    pretrain: bool,

    #[arg(long = "pretrain-games", default_value_t = 5_000)]
    pretrain_games: usize,

    /// Advance through the full random -> hard -> hard_vince -> thibot ->
    /// self_play curriculum instead of the fixed `--strategies` table.
    #[arg(long)]
    curriculum: bool,

    #[arg(long = "curriculum-win-rate", default_value_t = 0.55)]
    curriculum_win_rate: f32,

    #[arg(long = "curriculum-min-games", default_value_t = 500)]
    curriculum_min_games: usize,

    #[arg(long = "curriculum-max-games", default_value_t = 20_000)]
    curriculum_max_games: usize,

    /// Directory to write the trained model artifact to (`weights.json` +
    /// `config.json`).
    #[arg(long, default_value = "model_output")]
    output: PathBuf,

    /// Resume from a previously saved model directory, if present.
    #[arg(long)]
    resume_from: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("zapzap_cli=info".parse()?))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Optimize(args) => run_optimize(args),
        Command::Train(args) => run_train(args),
    }
}

fn run_optimize(args: OptimizeArgs) -> Result<()> {
    if args.elite >= args.population {
        bail!("--elite ({}) must be smaller than --population ({})", args.elite, args.population);
    }

    let config = OptimizerConfig {
        generations: args.generations,
        population: args.population,
        elite: args.elite,
        mutation_rate: args.mutation,
        mutation_range: args.mutation_range,
        crossover_rate: args.crossover,
        games_per_eval: args.games,
        workers: args.workers.max(1),
        seed: args.seed,
    };

    info!(
        generations = config.generations,
        population = config.population,
        games_per_eval = config.games_per_eval,
        "starting genetic optimization"
    );

    // GeneticOptimizer parallelizes fitness evaluation via rayon's default
    // global pool; size it to --workers for this run.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()
        .context("failed to build rayon thread pool")?;

    let result = pool.install(|| {
        let mut optimizer = GeneticOptimizer::new(config);
        optimizer.run()
    });

    info!(
        baseline_fitness = result.baseline.fitness,
        optimized_fitness = result.optimized.fitness,
        "optimization complete"
    );

    let json = serde_json::to_string_pretty(&result).context("failed to serialize optimizer result")?;
    std::fs::write(&args.output, json)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(output = %args.output.display(), "wrote optimizer result");

    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    let mut training = TrainingConfig::default();

    let curriculum = if args.curriculum {
        CurriculumConfig {
            win_rate_threshold: args.curriculum_win_rate,
            min_games_per_phase: args.curriculum_min_games,
            max_games_per_phase: args.curriculum_max_games,
            ..CurriculumConfig::default()
        }
    } else {
        // A single, non-advancing phase built from the user's fixed table
        // (seat 0 is the learner; the rest are the opponent pool).
        let opponents: Vec<String> = args.strategies.iter().skip(1).cloned().collect();
        let opponents = if opponents.is_empty() { vec!["hard".to_string()] } else { opponents };
        CurriculumConfig {
            phases: vec![CurriculumPhase { name: "fixed".to_string(), opponent_strategies: opponents }],
            win_rate_threshold: 1.1, // unreachable: never advance past the only phase
            min_games_per_phase: args.games as usize,
            max_games_per_phase: args.games as usize,
        }
    };

    let (prefill_fraction, prefill_games) = if args.pretrain {
        (0.3, args.pretrain_games)
    } else {
        (0.0, 0)
    };

    training.games_per_batch = training.games_per_batch.min(args.games.max(1) as usize);

    let orchestrator_config = OrchestratorConfig {
        training,
        curriculum,
        imitation_prefill_fraction: prefill_fraction,
        imitation_max_games: prefill_games,
        ..OrchestratorConfig::default()
    };

    let mut orchestrator = Orchestrator::new(orchestrator_config);

    if let Some(resume_dir) = &args.resume_from {
        if ModelIO::model_exists(resume_dir.to_string_lossy().as_ref()) {
            let (weights, _metadata) = ModelIO::load_weights(resume_dir.to_string_lossy().as_ref())
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("failed to load checkpoint from {}", resume_dir.display()))?;
            orchestrator.load_weights(&weights);
            info!(dir = %resume_dir.display(), "resumed weights from checkpoint");
        } else {
            info!(dir = %resume_dir.display(), "no checkpoint found, starting from scratch");
        }
    }

    info!(
        games = args.games,
        curriculum = args.curriculum,
        pretrain = args.pretrain,
        drl = args.drl,
        "starting training run"
    );

    let final_state = orchestrator
        .run(args.games, |event| log_event(&event))
        .context("training run failed")?;

    let weights = orchestrator.weights_flat();
    let metadata = ModelMetadata {
        version: env!("CARGO_PKG_VERSION").to_string(),
        input_dim: 45,
        hidden_dim: 128,
        value_hidden: 64,
        advantage_hidden: 32,
        training_steps: final_state.steps,
        games_played: final_state.games_played,
        final_epsilon: final_state.epsilon,
        avg_loss: final_state.avg_loss,
        win_rate: final_state.win_rate,
        timestamp: String::new(),
    };

    ModelIO::save_weights(args.output.to_string_lossy().as_ref(), &weights, Some(metadata))
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("failed to save model to {}", args.output.display()))?;

    info!(
        output = %args.output.display(),
        games_played = final_state.games_played,
        win_rate = final_state.win_rate,
        "training complete"
    );

    Ok(())
}

fn log_event(event: &OrchestratorEvent) {
    match event {
        OrchestratorEvent::ImitationPrefillComplete { transitions_added, training_loss } => {
            info!(transitions_added, training_loss, "imitation pre-fill complete");
        }
        OrchestratorEvent::BatchComplete { games_played, phase, win_rate, avg_loss, buffer_size } => {
            info!(games_played, phase, win_rate, avg_loss, buffer_size, "batch complete");
        }
        OrchestratorEvent::PhaseAdvanced { phase, win_rate, games_played } => {
            info!(phase, win_rate, games_played, "curriculum phase advanced");
        }
        OrchestratorEvent::WorkerError { worker_id, reason } => {
            tracing::warn!(worker_id, reason, "worker batch failed");
        }
        OrchestratorEvent::TrainingComplete { games_played } => {
            info!(games_played, "training loop finished");
        }
    }
}
