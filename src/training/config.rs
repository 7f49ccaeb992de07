//! Training configuration

use serde::{Deserialize, Serialize};

/// Training hyperparameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainingConfig {
    // Network architecture
    pub input_dim: usize,
    pub hidden_dim: usize,
    pub value_hidden: usize,
    pub advantage_hidden: usize,

    // Training hyperparameters
    pub learning_rate: f64,
    pub gamma: f32,
    pub batch_size: usize,
    pub gradient_clip: f32,

    // Replay buffer
    pub buffer_capacity: usize,
    pub per_alpha: f32,
    pub per_beta_start: f32,
    pub per_beta_end: f32,
    pub per_epsilon: f32,

    // Exploration
    pub epsilon_start: f32,
    pub epsilon_end: f32,
    pub epsilon_decay_steps: usize,

    // Training loop
    pub games_per_batch: usize,
    pub train_interval: usize,
    pub target_update_freq: usize,
    pub save_interval: usize,

    // Parallelization
    pub num_workers: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            // Network architecture (matches JS DuelingDQN)
            input_dim: 45,
            hidden_dim: 128,
            value_hidden: 64,
            advantage_hidden: 32,

            // Training hyperparameters
            learning_rate: 0.0005,
            gamma: 0.99,
            batch_size: 64,
            gradient_clip: 1.0,

            // Replay buffer
            buffer_capacity: 1_000_000,
            per_alpha: 0.6,
            per_beta_start: 0.4,
            per_beta_end: 1.0,
            per_epsilon: 0.01,

            // Exploration
            epsilon_start: 1.0,
            epsilon_end: 0.01,
            epsilon_decay_steps: 100_000,

            // Training loop
            games_per_batch: 100,
            train_interval: 10,
            target_update_freq: 1000,
            save_interval: 10_000,

            // Parallelization
            num_workers: num_cpus::get(),
        }
    }
}

impl TrainingConfig {
    /// Create config optimized for fast iteration
    pub fn fast() -> Self {
        Self {
            buffer_capacity: 100_000,
            games_per_batch: 50,
            train_interval: 5,
            epsilon_decay_steps: 50_000,
            save_interval: 5_000,
            ..Default::default()
        }
    }

    /// Create config for production training
    pub fn production() -> Self {
        Self {
            buffer_capacity: 2_000_000,
            games_per_batch: 200,
            train_interval: 20,
            epsilon_decay_steps: 200_000,
            save_interval: 25_000,
            ..Default::default()
        }
    }

    /// Calculate epsilon for given step
    pub fn get_epsilon(&self, step: usize) -> f32 {
        let ratio = (step as f32 / self.epsilon_decay_steps as f32).min(1.0);
        self.epsilon_start + (self.epsilon_end - self.epsilon_start) * ratio
    }

    /// Calculate beta for given step (PER annealing)
    pub fn get_beta(&self, step: usize) -> f32 {
        let ratio = (step as f32 / self.epsilon_decay_steps as f32).min(1.0);
        self.per_beta_start + (self.per_beta_end - self.per_beta_start) * ratio
    }
}

/// Genetic-algorithm hyperparameters for tuning `HardVinceParams`.
///
/// This is the struct the CLI's `clap` flags populate for the `optimize`
/// subcommand; see `training::optimizer`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Number of generations to evolve.
    pub generations: usize,
    /// Population size per generation.
    pub population: usize,
    /// Number of top individuals carried over unchanged each generation.
    pub elite: usize,
    /// Per-gene mutation probability.
    pub mutation_rate: f32,
    /// Maximum fractional perturbation applied to a mutated gene.
    pub mutation_range: f32,
    /// Probability that a child gene is blended from both parents rather
    /// than inherited from one.
    pub crossover_rate: f32,
    /// Games played per individual per generation to estimate fitness.
    pub games_per_eval: usize,
    /// Worker threads used to parallelize fitness evaluation.
    pub workers: usize,
    /// RNG seed for reproducible evolution runs.
    pub seed: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            generations: 50,
            population: 40,
            elite: 4,
            mutation_rate: 0.15,
            mutation_range: 0.25,
            crossover_rate: 0.7,
            games_per_eval: 2000,
            workers: num_cpus::get(),
            seed: 0x5eed_0123,
        }
    }
}

impl OptimizerConfig {
    /// Cheap config for smoke-testing the optimizer loop end to end.
    pub fn fast() -> Self {
        Self {
            generations: 3,
            population: 8,
            elite: 1,
            games_per_eval: 40,
            ..Default::default()
        }
    }
}

/// Curriculum phase boundaries for the DRL training orchestrator (§4.8).
///
/// The orchestrator advances to the next phase once the learner's win rate
/// against the current opponent mix clears `win_rate_threshold` over at
/// least `min_games_per_phase` games, or once `max_games_per_phase` is hit
/// regardless of win rate (a safety valve against a stuck curriculum).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CurriculumConfig {
    /// Opponent strategy pool for each phase, easiest first.
    pub phases: Vec<CurriculumPhase>,
    /// Win rate (0.0-1.0) required to advance past a phase.
    pub win_rate_threshold: f32,
    /// Minimum games played in a phase before advancement is considered.
    pub min_games_per_phase: usize,
    /// Hard cap on games in a phase before it advances unconditionally.
    pub max_games_per_phase: usize,
}

/// One stage of the curriculum: which strategies the learner plays against.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CurriculumPhase {
    pub name: String,
    pub opponent_strategies: Vec<String>,
}

impl Default for CurriculumConfig {
    fn default() -> Self {
        Self {
            phases: vec![
                CurriculumPhase {
                    name: "random".to_string(),
                    opponent_strategies: vec!["random".to_string()],
                },
                CurriculumPhase {
                    name: "hard".to_string(),
                    opponent_strategies: vec!["hard".to_string()],
                },
                CurriculumPhase {
                    name: "hard_vince".to_string(),
                    opponent_strategies: vec!["hard_vince".to_string()],
                },
                CurriculumPhase {
                    name: "thibot".to_string(),
                    opponent_strategies: vec!["thibot".to_string()],
                },
                CurriculumPhase {
                    name: "self_play".to_string(),
                    opponent_strategies: vec!["drl".to_string()],
                },
            ],
            win_rate_threshold: 0.55,
            min_games_per_phase: 500,
            max_games_per_phase: 20_000,
        }
    }
}

impl CurriculumConfig {
    /// Phase index a given 0-based phase count has reached, clamped to the
    /// last phase once the curriculum is exhausted.
    pub fn phase_at(&self, index: usize) -> &CurriculumPhase {
        let clamped = index.min(self.phases.len().saturating_sub(1));
        &self.phases[clamped]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.input_dim, 45);
        assert_eq!(config.batch_size, 64);
        assert!(config.num_workers > 0);
    }

    #[test]
    fn test_epsilon_decay() {
        let config = TrainingConfig::default();

        // Start
        assert!((config.get_epsilon(0) - 1.0).abs() < 0.001);

        // End
        assert!((config.get_epsilon(100_000) - 0.01).abs() < 0.001);

        // Middle
        let mid = config.get_epsilon(50_000);
        assert!(mid > 0.01 && mid < 1.0);
    }

    #[test]
    fn test_beta_annealing() {
        let config = TrainingConfig::default();

        assert!((config.get_beta(0) - 0.4).abs() < 0.001);
        assert!((config.get_beta(100_000) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_optimizer_config_default() {
        let config = OptimizerConfig::default();
        assert!(config.elite < config.population);
        assert!(config.workers > 0);
    }

    #[test]
    fn test_optimizer_config_fast_is_cheaper() {
        let fast = OptimizerConfig::fast();
        let full = OptimizerConfig::default();
        assert!(fast.generations < full.generations);
        assert!(fast.games_per_eval < full.games_per_eval);
    }

    #[test]
    fn test_curriculum_phase_at_clamps() {
        let curriculum = CurriculumConfig::default();
        let last = curriculum.phases.len() - 1;
        assert_eq!(curriculum.phase_at(last).name, curriculum.phase_at(last + 10).name);
        assert_eq!(curriculum.phase_at(0).name, "random");
    }
}
