//! Training orchestrator: worker pool, curriculum advancement and imitation
//! pre-fill driving `Trainer` end to end.
//!
//! Each worker owns a `HeadlessGameEngine` on its own OS thread and talks to
//! the orchestrator over a pair of `mpsc` channels (`WorkerRequest` in,
//! `WorkerResponse` out) rather than sharing any state - the only data that
//! crosses a thread boundary is a flat weight vector and a batch of
//! collected transitions. The orchestrator itself owns the single `Trainer`
//! (replay buffer + online/target networks) and never touches a worker's
//! `HeadlessGameEngine` directly.

use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::{EngineError, EngineResult};
use crate::headless_engine::{GameResult, HeadlessGameEngine, StrategyType};
use crate::training::config::{CurriculumConfig, CurriculumPhase, TrainingConfig};
use crate::training::trainer::{Trainer, TrainingState};
use crate::training::transition::Transition;

/// Request sent from the orchestrator to a worker thread.
enum WorkerRequest {
    Init {
        worker_id: usize,
    },
    RunBatch {
        games: usize,
        opponent_strategies: Vec<StrategyType>,
        weights: Vec<f32>,
        epsilon: f32,
        seed: u64,
    },
    Shutdown,
}

/// Response sent from a worker thread back to the orchestrator.
enum WorkerResponse {
    Ready { worker_id: usize },
    BatchComplete {
        worker_id: usize,
        transitions: Vec<Transition>,
        results: Vec<GameResult>,
    },
    Error { worker_id: usize, reason: String },
}

struct WorkerHandle {
    id: usize,
    to_worker: Sender<WorkerRequest>,
    from_worker: Receiver<WorkerResponse>,
    thread: Option<JoinHandle<()>>,
}

fn worker_loop(worker_id: usize, rx: Receiver<WorkerRequest>, tx: Sender<WorkerResponse>) {
    while let Ok(request) = rx.recv() {
        match request {
            WorkerRequest::Init { worker_id: id } => {
                let _ = tx.send(WorkerResponse::Ready { worker_id: id });
            }
            WorkerRequest::RunBatch {
                games,
                opponent_strategies,
                weights,
                epsilon,
                seed,
            } => {
                let mut strategies = Vec::with_capacity(opponent_strategies.len() + 1);
                strategies.push(StrategyType::DRL);
                strategies.extend(opponent_strategies);

                let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    let mut transitions = Vec::new();
                    let mut results = Vec::with_capacity(games);
                    for game_index in 0..games {
                        let mut engine =
                            HeadlessGameEngine::with_seed(strategies.clone(), seed.wrapping_add(game_index as u64));
                        engine.set_drl_weights(&weights);
                        engine.set_drl_epsilon(epsilon);
                        let (result, game_transitions) = engine.run_game_with_collection(0);
                        results.push(result);
                        transitions.extend(game_transitions);
                    }
                    (transitions, results)
                }));

                match outcome {
                    Ok((transitions, results)) => {
                        let _ = tx.send(WorkerResponse::BatchComplete { worker_id, transitions, results });
                    }
                    Err(payload) => {
                        let reason = payload
                            .downcast_ref::<&str>()
                            .map(|s| s.to_string())
                            .or_else(|| payload.downcast_ref::<String>().cloned())
                            .unwrap_or_else(|| "worker thread panicked".to_string());
                        let _ = tx.send(WorkerResponse::Error { worker_id, reason });
                    }
                }
            }
            WorkerRequest::Shutdown => break,
        }
    }
}

/// Progress events emitted during `Orchestrator::run`, for CLI/log reporting.
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    /// Expert (HardVince) demonstrations were added to the replay buffer
    /// before any network training happened.
    ImitationPrefillComplete { transitions_added: usize, training_loss: f32 },
    /// A batch of games finished across all workers and the trainer took
    /// `train_steps_per_batch` optimization steps.
    BatchComplete {
        games_played: u64,
        phase: String,
        win_rate: f32,
        avg_loss: f32,
        buffer_size: usize,
    },
    /// The curriculum advanced to the next opponent phase.
    PhaseAdvanced { phase: String, win_rate: f32, games_played: u64 },
    /// A worker reported a batch failure; the batch's transitions are
    /// discarded and the worker keeps running (it will pick up the next
    /// `RunBatch` request normally).
    WorkerError { worker_id: usize, reason: String },
    /// `run` reached its game target or was asked to stop.
    TrainingComplete { games_played: u64 },
}

/// Orchestrator configuration: worker pool sizing, batching cadence and the
/// imitation pre-fill budget.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    pub training: TrainingConfig,
    pub curriculum: CurriculumConfig,
    /// Number of worker threads running games concurrently.
    pub num_workers: usize,
    /// Games each worker plays per dispatched batch.
    pub games_per_batch: usize,
    /// Trainer optimization steps run after each batch of games completes.
    pub train_steps_per_batch: usize,
    /// How long the orchestrator waits for a worker's batch before treating
    /// it as failed.
    pub worker_timeout: Duration,
    /// Fraction of buffer capacity to fill with expert transitions before
    /// training starts. 0.0 disables imitation pre-fill entirely.
    pub imitation_prefill_fraction: f32,
    /// Hard cap on imitation games played, regardless of the fraction above.
    pub imitation_max_games: usize,
    /// Trainer steps run against the pre-filled buffer before self-play
    /// begins (epsilon has no effect on these - they only touch the buffer
    /// already collected).
    pub imitation_train_steps: usize,
    /// RNG seed for per-batch game seeds and worker ordering.
    pub seed: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            training: TrainingConfig::default(),
            curriculum: CurriculumConfig::default(),
            num_workers: num_cpus::get().max(1),
            games_per_batch: 20,
            train_steps_per_batch: 4,
            worker_timeout: Duration::from_secs(120),
            imitation_prefill_fraction: 0.3,
            imitation_max_games: 5_000,
            imitation_train_steps: 200,
            seed: 0x0beef_001,
        }
    }
}

impl OrchestratorConfig {
    /// Cheap config for smoke-testing the orchestrator loop end to end.
    pub fn fast() -> Self {
        Self {
            training: TrainingConfig::fast(),
            num_workers: 1,
            games_per_batch: 2,
            train_steps_per_batch: 1,
            worker_timeout: Duration::from_secs(10),
            imitation_prefill_fraction: 0.0,
            imitation_max_games: 0,
            imitation_train_steps: 0,
            ..Default::default()
        }
    }
}

fn strategy_type_from_name(name: &str) -> StrategyType {
    match name {
        "random" => StrategyType::Random,
        "hard" => StrategyType::Hard,
        "hard_vince" => StrategyType::HardVince,
        "thibot" => StrategyType::Thibot,
        "drl" => StrategyType::DRL,
        _ => StrategyType::Hard,
    }
}

/// Build the `count` opponent seats for a curriculum phase, cycling through
/// its named strategies if there are fewer than `count` of them.
fn build_opponents(phase: &CurriculumPhase, count: usize) -> Vec<StrategyType> {
    if phase.opponent_strategies.is_empty() {
        return vec![StrategyType::Hard; count];
    }
    (0..count)
        .map(|i| strategy_type_from_name(&phase.opponent_strategies[i % phase.opponent_strategies.len()]))
        .collect()
}

/// Drives DRL training: spawns a worker pool, pre-fills the replay buffer
/// with HardVince expert demonstrations, then alternates dispatching
/// self-play/curriculum batches with `Trainer` optimization steps until the
/// requested number of games has been played.
pub struct Orchestrator {
    config: OrchestratorConfig,
    trainer: Trainer,
    workers: Vec<WorkerHandle>,
    phase_index: usize,
    games_in_phase: u64,
    wins_in_phase: u64,
    games_played: u64,
    rng: SmallRng,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        let trainer = Trainer::new(config.training.clone());
        let workers = Self::spawn_workers(config.num_workers.max(1));
        let seed = config.seed;
        Self {
            config,
            trainer,
            workers,
            phase_index: 0,
            games_in_phase: 0,
            wins_in_phase: 0,
            games_played: 0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn spawn_workers(count: usize) -> Vec<WorkerHandle> {
        (0..count)
            .map(|id| {
                let (to_worker_tx, to_worker_rx) = mpsc::channel();
                let (from_worker_tx, from_worker_rx) = mpsc::channel();
                let thread = thread::Builder::new()
                    .name(format!("zapzap-worker-{id}"))
                    .spawn(move || worker_loop(id, to_worker_rx, from_worker_tx))
                    .expect("failed to spawn worker thread");
                WorkerHandle {
                    id,
                    to_worker: to_worker_tx,
                    from_worker: from_worker_rx,
                    thread: Some(thread),
                }
            })
            .collect()
    }

    fn init_workers(&self) -> EngineResult<()> {
        for worker in &self.workers {
            worker
                .to_worker
                .send(WorkerRequest::Init { worker_id: worker.id })
                .map_err(|_| EngineError::WorkerError {
                    worker_id: worker.id,
                    reason: "channel closed before init".to_string(),
                })?;
        }
        for worker in &self.workers {
            match worker.from_worker.recv_timeout(self.config.worker_timeout) {
                Ok(WorkerResponse::Ready { .. }) => {}
                Ok(_) => {
                    return Err(EngineError::WorkerError {
                        worker_id: worker.id,
                        reason: "unexpected response during init".to_string(),
                    })
                }
                Err(_) => {
                    return Err(EngineError::WorkerError {
                        worker_id: worker.id,
                        reason: "worker did not become ready in time".to_string(),
                    })
                }
            }
        }
        Ok(())
    }

    fn shutdown_workers(&mut self) {
        for worker in &self.workers {
            let _ = worker.to_worker.send(WorkerRequest::Shutdown);
        }
        for worker in &mut self.workers {
            if let Some(handle) = worker.thread.take() {
                let _ = handle.join();
            }
        }
    }

    /// Run HardVince self-play games and record the expert's own plays as
    /// `PlayType` transitions, filling the replay buffer up to
    /// `imitation_prefill_fraction * buffer_capacity` (or `imitation_max_games`
    /// games, whichever comes first), then take a fixed number of trainer
    /// steps against that buffer before any self-play begins.
    fn prefill_imitation_buffer(&mut self) -> usize {
        let target_transitions =
            (self.config.training.buffer_capacity as f32 * self.config.imitation_prefill_fraction) as usize;
        if target_transitions == 0 || self.config.imitation_max_games == 0 {
            return 0;
        }

        let mut added = 0usize;
        let mut seed = self.config.seed ^ 0x5e1f_1177;
        for _ in 0..self.config.imitation_max_games {
            if added >= target_transitions {
                break;
            }
            let strategies = vec![StrategyType::HardVince; 4];
            let mut engine = HeadlessGameEngine::with_seed(strategies, seed);
            seed = seed.wrapping_add(1);
            let (_, transitions) = engine.run_expert_game_with_collection(0);
            added += transitions.len();
            for transition in transitions {
                self.trainer.add_transition(transition);
            }
        }

        added
    }

    /// Run the full training loop, dispatching batches to the worker pool
    /// and advancing the curriculum, until `total_games` self-play games
    /// have been completed or the trainer's stop flag is set.
    pub fn run(&mut self, total_games: u64, mut on_event: impl FnMut(OrchestratorEvent)) -> EngineResult<TrainingState> {
        let imitation_added = self.prefill_imitation_buffer();
        if imitation_added > 0 {
            let (loss, steps) = self
                .trainer
                .train_steps(self.config.imitation_train_steps, 0);
            let avg_loss = if steps > 0 { loss / steps as f32 } else { 0.0 };
            on_event(OrchestratorEvent::ImitationPrefillComplete {
                transitions_added: imitation_added,
                training_loss: avg_loss,
            });
        }

        self.init_workers()?;

        while self.games_played < total_games && !self.trainer.stop_flag().load(Ordering::SeqCst) {
            let phase = self.config.curriculum.phase_at(self.phase_index).clone();
            let opponents = build_opponents(&phase, 3);
            let weights = self.trainer.get_weights_flat();
            let epsilon = self.config.training.get_epsilon(self.games_played as usize);

            for worker in &self.workers {
                let seed: u64 = self.rng.gen();
                worker
                    .to_worker
                    .send(WorkerRequest::RunBatch {
                        games: self.config.games_per_batch,
                        opponent_strategies: opponents.clone(),
                        weights: weights.clone(),
                        epsilon,
                        seed,
                    })
                    .map_err(|_| EngineError::WorkerError {
                        worker_id: worker.id,
                        reason: "channel closed before batch dispatch".to_string(),
                    })?;
            }

            let mut batch_games = 0u64;
            let mut batch_wins = 0u64;
            for worker in &self.workers {
                match worker.from_worker.recv_timeout(self.config.worker_timeout) {
                    Ok(WorkerResponse::BatchComplete { transitions, results, .. }) => {
                        for transition in transitions {
                            self.trainer.add_transition(transition);
                        }
                        for result in &results {
                            batch_games += 1;
                            if result.winner == 0 {
                                batch_wins += 1;
                            }
                        }
                    }
                    Ok(WorkerResponse::Error { worker_id, reason }) => {
                        on_event(OrchestratorEvent::WorkerError { worker_id, reason });
                    }
                    Ok(WorkerResponse::Ready { .. }) => {}
                    Err(_) => {
                        on_event(OrchestratorEvent::WorkerError {
                            worker_id: worker.id,
                            reason: "batch timed out".to_string(),
                        });
                    }
                }
            }

            self.games_played += batch_games;
            self.games_in_phase += batch_games;
            self.wins_in_phase += batch_wins;

            let (total_loss, steps) = self
                .trainer
                .train_steps(self.config.train_steps_per_batch, self.games_played);
            let avg_loss = if steps > 0 { total_loss / steps as f32 } else { 0.0 };

            let win_rate = if self.games_in_phase > 0 {
                self.wins_in_phase as f32 / self.games_in_phase as f32
            } else {
                0.0
            };

            on_event(OrchestratorEvent::BatchComplete {
                games_played: self.games_played,
                phase: phase.name.clone(),
                win_rate,
                avg_loss,
                buffer_size: self.trainer.buffer_size(),
            });

            let curriculum = &self.config.curriculum;
            let cleared_threshold =
                self.games_in_phase >= curriculum.min_games_per_phase as u64 && win_rate >= curriculum.win_rate_threshold;
            let hit_cap = self.games_in_phase >= curriculum.max_games_per_phase as u64;
            if (cleared_threshold || hit_cap) && self.phase_index + 1 < curriculum.phases.len() {
                self.phase_index += 1;
                self.games_in_phase = 0;
                self.wins_in_phase = 0;
                on_event(OrchestratorEvent::PhaseAdvanced {
                    phase: curriculum.phase_at(self.phase_index).name.clone(),
                    win_rate,
                    games_played: self.games_played,
                });
            }

            if batch_games == 0 {
                // Every worker in this batch failed; avoid spinning forever.
                break;
            }
        }

        self.shutdown_workers();
        on_event(OrchestratorEvent::TrainingComplete { games_played: self.games_played });
        Ok(self.trainer.get_state())
    }

    /// Current curriculum phase name.
    pub fn current_phase_name(&self) -> &str {
        &self.config.curriculum.phase_at(self.phase_index).name
    }

    /// Total self-play games completed so far.
    pub fn games_played(&self) -> u64 {
        self.games_played
    }

    /// Snapshot of the trainer's shared progress state.
    pub fn training_state(&self) -> TrainingState {
        self.trainer.get_state()
    }

    /// Flat online-network weights, for checkpointing via `ModelIO`.
    pub fn weights_flat(&self) -> Vec<f32> {
        self.trainer.get_weights_flat()
    }

    /// Load weights into the trainer (e.g. resuming from a checkpoint). Also
    /// re-syncs the target network.
    pub fn load_weights(&mut self, weights: &[f32]) {
        self.trainer.set_weights_flat(weights);
    }

    /// Request a graceful stop; `run` returns after the in-flight batch.
    pub fn request_stop(&self) {
        self.trainer.request_stop();
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.shutdown_workers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_type_from_name() {
        assert_eq!(strategy_type_from_name("hard_vince"), StrategyType::HardVince);
        assert_eq!(strategy_type_from_name("thibot"), StrategyType::Thibot);
        assert_eq!(strategy_type_from_name("unknown"), StrategyType::Hard);
    }

    #[test]
    fn test_build_opponents_cycles_short_phase_list() {
        let phase = CurriculumPhase {
            name: "random".to_string(),
            opponent_strategies: vec!["random".to_string()],
        };
        let opponents = build_opponents(&phase, 3);
        assert_eq!(opponents.len(), 3);
        assert!(opponents.iter().all(|s| *s == StrategyType::Random));
    }

    #[test]
    fn test_build_opponents_empty_falls_back_to_hard() {
        let phase = CurriculumPhase { name: "empty".to_string(), opponent_strategies: vec![] };
        let opponents = build_opponents(&phase, 3);
        assert_eq!(opponents, vec![StrategyType::Hard, StrategyType::Hard, StrategyType::Hard]);
    }

    #[test]
    fn test_orchestrator_config_fast_is_cheap() {
        let fast = OrchestratorConfig::fast();
        assert_eq!(fast.num_workers, 1);
        assert_eq!(fast.imitation_prefill_fraction, 0.0);
    }

    #[test]
    fn test_orchestrator_new_spawns_and_drops_cleanly() {
        let orchestrator = Orchestrator::new(OrchestratorConfig::fast());
        assert_eq!(orchestrator.games_played(), 0);
        assert_eq!(orchestrator.current_phase_name(), "random");
        // Dropping joins worker threads via Shutdown without a running loop.
    }

    #[test]
    fn test_orchestrator_runs_small_batch() {
        let mut orchestrator = Orchestrator::new(OrchestratorConfig::fast());
        let mut events = Vec::new();
        let result = orchestrator.run(2, |event| events.push(event));
        assert!(result.is_ok());
        assert!(orchestrator.games_played() >= 2 || events.iter().any(|e| matches!(e, OrchestratorEvent::WorkerError { .. })));
        assert!(events.iter().any(|e| matches!(e, OrchestratorEvent::TrainingComplete { .. })));
    }
}
