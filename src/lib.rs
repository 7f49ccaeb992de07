//! ZapZap game engine — deterministic headless simulation, a heuristic bot
//! catalog, and a DRL training stack (genetic parameter search + worker-pool
//! orchestrated Double DQN).
//!
//! The embeddable API is the three free functions at the bottom of this
//! file (`run_game`, `run_round`, `apply_action`); everything else is
//! exposed for callers that want finer-grained control (the CLI, the
//! genetic optimizer, the training orchestrator).

#![deny(clippy::all)]

pub mod card_analyzer;
pub mod error;
pub mod fast_dqn;
pub mod feature_extractor;
pub mod game_state;
pub mod headless_engine;
pub mod strategies;
pub mod training;

pub use error::{EngineError, EngineResult};
pub use game_state::GameState;
pub use headless_engine::{GameResult, HeadlessGameEngine, PlayerAction, StrategyType};

/// Run a complete game with the given seat strategies and RNG seed,
/// returning the winner, final scores, and round count (spec §6).
pub fn run_game(strategies: Vec<StrategyType>, seed: u64) -> GameResult {
    HeadlessGameEngine::with_seed(strategies, seed).run_game()
}

/// Run a single round to completion from `state`, using `strategies` for
/// each seat and `seed` for card shuffling (spec §6).
///
/// Each call builds a fresh engine, so its RNG stream is independent of any
/// prior round; games driven round-by-round through this function should
/// vary `seed` themselves (e.g. `base_seed + round_number`) to avoid
/// replaying the same shuffle every round.
pub fn run_round(state: GameState, strategies: Vec<StrategyType>, seed: u64) -> GameState {
    let round_number = state.round_number;
    HeadlessGameEngine::with_seed(strategies, seed).run_round_public(state, round_number)
}

/// Apply one explicit player decision to a paused game state (spec §6).
///
/// `strategies`/`seed` are only used to construct the engine instance that
/// carries out the mechanical state transition (deck shuffles on deal,
/// reshuffles on an empty deck); they do not influence which action is
/// taken - that's entirely determined by `action`.
pub fn apply_action(
    state: GameState,
    strategies: Vec<StrategyType>,
    seed: u64,
    player: u8,
    action: PlayerAction,
) -> GameState {
    HeadlessGameEngine::with_seed(strategies, seed).apply_action(state, player, action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_game_is_deterministic_for_a_given_seed() {
        let strategies = vec![StrategyType::Hard, StrategyType::Hard, StrategyType::Random, StrategyType::Thibot];
        let a = run_game(strategies.clone(), 1234);
        let b = run_game(strategies, 1234);
        assert_eq!(a.winner, b.winner);
        assert_eq!(a.final_scores, b.final_scores);
        assert_eq!(a.total_rounds, b.total_rounds);
    }

    #[test]
    fn test_run_round_deals_a_hand() {
        let state = GameState::new(4);
        let strategies = vec![StrategyType::Hard; 4];
        let next = run_round(state, strategies, 7);
        let dealt: usize = next.hands.iter().map(|h| h.len()).sum();
        assert!(dealt > 0, "run_round should have dealt cards to at least one seat");
    }

    #[test]
    fn test_apply_action_select_hand_size_deals_cards() {
        let state = GameState::new(2);
        let strategies = vec![StrategyType::Hard, StrategyType::Hard];
        let next = apply_action(state, strategies, 99, 0, PlayerAction::SelectHandSize(5));
        assert_eq!(next.hands[0].len(), 5);
    }
}
