//! HardVinceStrategy - parametric rule-based bot, the target of genetic search.
//!
//! Unlike `HardBotStrategy` (a fixed single-pass greedy scorer), every term in
//! HardVince's play/zapzap/draw scoring is gated behind a named weight in
//! [`HardVinceParams`]. `training::optimizer` mutates these weights across a
//! population and selects by win rate; this module only defines the decision
//! surface and the parameter's default values and search bounds.

use super::BotStrategy;
use crate::card_analyzer;
use crate::game_state::GameState;
use smallvec::SmallVec;

/// Tunable weight with a constraint interval expressed as a multiplier band
/// around its default value, e.g. `(0.5, 1.5)` allows the genetic optimizer
/// to explore 50%-150% of the shipped default.
#[derive(Debug, Clone, Copy)]
pub struct ParamBound {
    pub min_mult: f32,
    pub max_mult: f32,
}

impl ParamBound {
    const fn new(min_mult: f32, max_mult: f32) -> Self {
        Self { min_mult, max_mult }
    }
}

/// Number of tunable weights in [`HardVinceParams`].
pub const PARAM_COUNT: usize = 35;

/// Stable, documented order for (de)serializing the parameter vector. Index
/// `i` here corresponds to field `i` in [`HardVinceParams::to_vector`].
pub const PARAM_NAMES: [&str; PARAM_COUNT] = [
    "play_size_weight",
    "golden_joker_penalty",
    "joker_in_set_base_penalty",
    "joker_in_set_opponent_scale",
    "joker_in_sequence_base_penalty",
    "joker_in_sequence_opponent_scale",
    "setup_combo_bonus_weight",
    "setup_combo_min_opponent_hand",
    "early_game_min_hand_size",
    "early_game_mid_rank_bonus",
    "early_game_mid_rank_min",
    "early_game_mid_rank_max",
    "early_game_high_pair_break_penalty",
    "early_game_high_pair_rank_min",
    "high_threat_hand_size",
    "high_threat_residual_penalty_weight",
    "zapzap_hard_refuse_value",
    "zapzap_defensive_risk_threshold",
    "zapzap_risk_opponent_hand_weight",
    "zapzap_risk_tracked_card_weight",
    "zapzap_early_round_cutoff",
    "zapzap_mid_round_cutoff",
    "zapzap_early_value_max",
    "zapzap_mid_value_max",
    "zapzap_late_value_max",
    "draw_golden_value_threshold",
    "draw_low_hand_value_threshold",
    "draw_counter_zapzap_joker_bonus",
    "draw_combo_bonus_weight",
    "draw_low_point_bonus_weight",
    "draw_same_rank_bonus_weight",
    "draw_seen_penalty_weight",
    "draw_marginal_threshold",
    "draw_deck_joker_expected_value",
    "draw_deck_baseline_expected_value",
];

/// HardVince's ~35 tunable weights. All fields are `f32` (including the ones
/// that read as integer thresholds in the spec) so the whole struct can be
/// treated as one flat gene vector by the genetic optimizer; call sites round
/// where an integer count or round number is actually needed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HardVinceParams {
    // --- Play scoring ---
    /// Coefficient on play size in the base score (`spec: 0.5`).
    pub play_size_weight: f32,
    /// Subtracted when a play includes a joker during golden score.
    pub golden_joker_penalty: f32,
    /// Base adjustment for playing a joker as part of a same-rank set.
    pub joker_in_set_base_penalty: f32,
    /// Scales the set-joker adjustment by `(min_opponent_hand_size)`.
    pub joker_in_set_opponent_scale: f32,
    /// Base adjustment for playing a joker as part of a run.
    pub joker_in_sequence_base_penalty: f32,
    /// Scales the sequence-joker adjustment by `(min_opponent_hand_size)`.
    pub joker_in_sequence_opponent_scale: f32,
    /// Weight on the "combines with a card an opponent just drew" bonus.
    pub setup_combo_bonus_weight: f32,
    /// Only grant the setup-combo bonus when an opponent's hand is at most
    /// this large (small hands signal the combo will matter soon).
    pub setup_combo_min_opponent_hand: f32,
    /// Hand size every active player must have for "early game" bonuses to
    /// apply (spec: all players >= 5 cards).
    pub early_game_min_hand_size: f32,
    /// Bonus for playing an intermediate-rank card in the early game.
    pub early_game_mid_rank_bonus: f32,
    /// Lowest rank index (0=A) counted as "intermediate" (spec: 5).
    pub early_game_mid_rank_min: f32,
    /// Highest rank index counted as "intermediate" (spec: 9).
    pub early_game_mid_rank_max: f32,
    /// Penalty for breaking up a high-rank pair in the early game.
    pub early_game_high_pair_break_penalty: f32,
    /// Lowest rank index considered "high" for the break penalty.
    pub early_game_high_pair_rank_min: f32,
    /// Opponent hand size at or below which they're a "high threat".
    pub high_threat_hand_size: f32,
    /// Weight on the residual-hand-value penalty against a high threat.
    pub high_threat_residual_penalty_weight: f32,

    // --- ZapZap ---
    /// Always call at this eligibility value regardless of risk (spec: 0).
    pub zapzap_hard_refuse_value: f32,
    /// Risk score above which ZapZap is refused unless value <= 2.
    pub zapzap_defensive_risk_threshold: f32,
    /// Contribution of a small opponent hand to the tracked risk score.
    pub zapzap_risk_opponent_hand_weight: f32,
    /// Contribution of tracked (known-low) opponent cards to risk score.
    pub zapzap_risk_tracked_card_weight: f32,
    /// Rounds `<= this` are "early game" for the zapzap aggressiveness curve.
    pub zapzap_early_round_cutoff: f32,
    /// Rounds `<= this` (and `> early`) are "mid game".
    pub zapzap_mid_round_cutoff: f32,
    /// Max eligibility value willing to call in early game.
    pub zapzap_early_value_max: f32,
    /// Max eligibility value willing to call in mid game.
    pub zapzap_mid_value_max: f32,
    /// Max eligibility value willing to call in late game.
    pub zapzap_late_value_max: f32,

    // --- Draw source ---
    /// In golden score, hoard a joker if hand value is at or below this.
    pub draw_golden_value_threshold: f32,
    /// Outside golden score, take a joker from played if hand value is at or
    /// below this (counter-ZapZap setup).
    pub draw_low_hand_value_threshold: f32,
    /// Extra marginal-value bonus for a joker under the low-hand-value rule.
    pub draw_counter_zapzap_joker_bonus: f32,
    /// Weight on new multi-card combos a candidate card would create.
    pub draw_combo_bonus_weight: f32,
    /// Weight on the low-point bonus (`13 - points`) for a candidate card.
    pub draw_low_point_bonus_weight: f32,
    /// Weight on the same-rank-already-in-hand bonus.
    pub draw_same_rank_bonus_weight: f32,
    /// Weight on the penalty for same-rank cards already seen (dead ranks).
    pub draw_seen_penalty_weight: f32,
    /// Required margin of a played card's value over the deck's expected
    /// value before it's preferred to a random deck draw.
    pub draw_marginal_threshold: f32,
    /// Expected value assigned to drawing an unseen joker from the deck.
    pub draw_deck_joker_expected_value: f32,
    /// Baseline expected value of a random deck draw before rank weighting.
    pub draw_deck_baseline_expected_value: f32,
}

impl Default for HardVinceParams {
    fn default() -> Self {
        Self {
            play_size_weight: 0.5,
            golden_joker_penalty: 18.0,
            joker_in_set_base_penalty: 4.0,
            joker_in_set_opponent_scale: 1.5,
            joker_in_sequence_base_penalty: 3.0,
            joker_in_sequence_opponent_scale: 1.2,
            setup_combo_bonus_weight: 2.5,
            setup_combo_min_opponent_hand: 4.0,
            early_game_min_hand_size: 5.0,
            early_game_mid_rank_bonus: 3.0,
            early_game_mid_rank_min: 4.0,
            early_game_mid_rank_max: 8.0,
            early_game_high_pair_break_penalty: 6.0,
            early_game_high_pair_rank_min: 9.0,
            high_threat_hand_size: 2.0,
            high_threat_residual_penalty_weight: 0.8,

            zapzap_hard_refuse_value: 0.0,
            zapzap_defensive_risk_threshold: 6.0,
            zapzap_risk_opponent_hand_weight: 2.0,
            zapzap_risk_tracked_card_weight: 1.5,
            zapzap_early_round_cutoff: 2.0,
            zapzap_mid_round_cutoff: 4.0,
            zapzap_early_value_max: 2.0,
            zapzap_mid_value_max: 3.0,
            zapzap_late_value_max: 4.0,

            draw_golden_value_threshold: 5.0,
            draw_low_hand_value_threshold: 4.0,
            draw_counter_zapzap_joker_bonus: 15.0,
            draw_combo_bonus_weight: 10.0,
            draw_low_point_bonus_weight: 1.0,
            draw_same_rank_bonus_weight: 6.0,
            draw_seen_penalty_weight: 3.0,
            draw_marginal_threshold: 4.0,
            draw_deck_joker_expected_value: 30.0,
            draw_deck_baseline_expected_value: 5.0,
        }
    }
}

impl HardVinceParams {
    /// Flatten into a gene vector in [`PARAM_NAMES`] order.
    pub fn to_vector(&self) -> Vec<f32> {
        vec![
            self.play_size_weight,
            self.golden_joker_penalty,
            self.joker_in_set_base_penalty,
            self.joker_in_set_opponent_scale,
            self.joker_in_sequence_base_penalty,
            self.joker_in_sequence_opponent_scale,
            self.setup_combo_bonus_weight,
            self.setup_combo_min_opponent_hand,
            self.early_game_min_hand_size,
            self.early_game_mid_rank_bonus,
            self.early_game_mid_rank_min,
            self.early_game_mid_rank_max,
            self.early_game_high_pair_break_penalty,
            self.early_game_high_pair_rank_min,
            self.high_threat_hand_size,
            self.high_threat_residual_penalty_weight,
            self.zapzap_hard_refuse_value,
            self.zapzap_defensive_risk_threshold,
            self.zapzap_risk_opponent_hand_weight,
            self.zapzap_risk_tracked_card_weight,
            self.zapzap_early_round_cutoff,
            self.zapzap_mid_round_cutoff,
            self.zapzap_early_value_max,
            self.zapzap_mid_value_max,
            self.zapzap_late_value_max,
            self.draw_golden_value_threshold,
            self.draw_low_hand_value_threshold,
            self.draw_counter_zapzap_joker_bonus,
            self.draw_combo_bonus_weight,
            self.draw_low_point_bonus_weight,
            self.draw_same_rank_bonus_weight,
            self.draw_seen_penalty_weight,
            self.draw_marginal_threshold,
            self.draw_deck_joker_expected_value,
            self.draw_deck_baseline_expected_value,
        ]
    }

    /// Rebuild from a gene vector produced by [`Self::to_vector`]. Panics if
    /// `v.len() != PARAM_COUNT` - the optimizer never produces a short vector.
    pub fn from_vector(v: &[f32]) -> Self {
        assert_eq!(v.len(), PARAM_COUNT, "HardVince gene vector has the wrong length");
        Self {
            play_size_weight: v[0],
            golden_joker_penalty: v[1],
            joker_in_set_base_penalty: v[2],
            joker_in_set_opponent_scale: v[3],
            joker_in_sequence_base_penalty: v[4],
            joker_in_sequence_opponent_scale: v[5],
            setup_combo_bonus_weight: v[6],
            setup_combo_min_opponent_hand: v[7],
            early_game_min_hand_size: v[8],
            early_game_mid_rank_bonus: v[9],
            early_game_mid_rank_min: v[10],
            early_game_mid_rank_max: v[11],
            early_game_high_pair_break_penalty: v[12],
            early_game_high_pair_rank_min: v[13],
            high_threat_hand_size: v[14],
            high_threat_residual_penalty_weight: v[15],
            zapzap_hard_refuse_value: v[16],
            zapzap_defensive_risk_threshold: v[17],
            zapzap_risk_opponent_hand_weight: v[18],
            zapzap_risk_tracked_card_weight: v[19],
            zapzap_early_round_cutoff: v[20],
            zapzap_mid_round_cutoff: v[21],
            zapzap_early_value_max: v[22],
            zapzap_mid_value_max: v[23],
            zapzap_late_value_max: v[24],
            draw_golden_value_threshold: v[25],
            draw_low_hand_value_threshold: v[26],
            draw_counter_zapzap_joker_bonus: v[27],
            draw_combo_bonus_weight: v[28],
            draw_low_point_bonus_weight: v[29],
            draw_same_rank_bonus_weight: v[30],
            draw_seen_penalty_weight: v[31],
            draw_marginal_threshold: v[32],
            draw_deck_joker_expected_value: v[33],
            draw_deck_baseline_expected_value: v[34],
        }
    }

    /// Constraint interval per gene, aligned to [`PARAM_NAMES`]/[`Self::to_vector`].
    /// Thresholds that read as small integer counts (round cutoffs, rank
    /// bounds, hand-size thresholds) get a tight absolute band instead of a
    /// multiplier, since a 50% swing on "round 2" isn't meaningful.
    pub fn bounds() -> [ParamBound; PARAM_COUNT] {
        use ParamBound as B;
        [
            B::new(0.3, 3.0),   // play_size_weight
            B::new(0.0, 3.0),   // golden_joker_penalty
            B::new(0.0, 3.0),   // joker_in_set_base_penalty
            B::new(0.0, 3.0),   // joker_in_set_opponent_scale
            B::new(0.0, 3.0),   // joker_in_sequence_base_penalty
            B::new(0.0, 3.0),   // joker_in_sequence_opponent_scale
            B::new(0.2, 4.0),   // setup_combo_bonus_weight
            B::new(0.5, 1.5),   // setup_combo_min_opponent_hand
            B::new(0.8, 1.2),   // early_game_min_hand_size
            B::new(0.0, 3.0),   // early_game_mid_rank_bonus
            B::new(0.5, 1.5),   // early_game_mid_rank_min
            B::new(0.8, 1.3),   // early_game_mid_rank_max
            B::new(0.0, 3.0),   // early_game_high_pair_break_penalty
            B::new(0.8, 1.2),   // early_game_high_pair_rank_min
            B::new(0.5, 2.0),   // high_threat_hand_size
            B::new(0.0, 3.0),   // high_threat_residual_penalty_weight
            B::new(1.0, 1.0),   // zapzap_hard_refuse_value (fixed at 0 by spec)
            B::new(0.3, 3.0),   // zapzap_defensive_risk_threshold
            B::new(0.0, 3.0),   // zapzap_risk_opponent_hand_weight
            B::new(0.0, 3.0),   // zapzap_risk_tracked_card_weight
            B::new(0.5, 2.0),   // zapzap_early_round_cutoff
            B::new(0.5, 2.0),   // zapzap_mid_round_cutoff
            B::new(0.5, 2.5),   // zapzap_early_value_max
            B::new(0.5, 1.7),   // zapzap_mid_value_max
            B::new(0.5, 1.5),   // zapzap_late_value_max
            B::new(0.2, 1.2),   // draw_golden_value_threshold
            B::new(0.2, 1.5),   // draw_low_hand_value_threshold
            B::new(0.0, 3.0),   // draw_counter_zapzap_joker_bonus
            B::new(0.2, 4.0),   // draw_combo_bonus_weight
            B::new(0.0, 4.0),   // draw_low_point_bonus_weight
            B::new(0.0, 4.0),   // draw_same_rank_bonus_weight
            B::new(0.0, 4.0),   // draw_seen_penalty_weight
            B::new(0.2, 4.0),   // draw_marginal_threshold
            B::new(0.3, 2.0),   // draw_deck_joker_expected_value
            B::new(0.2, 3.0),   // draw_deck_baseline_expected_value
        ]
    }

    /// Absolute `(min, max)` range per gene, computed from [`Self::bounds`]
    /// against the default vector. Genetic crossover/mutation clamps here.
    pub fn absolute_bounds() -> [(f32, f32); PARAM_COUNT] {
        let defaults = Self::default().to_vector();
        let bounds = Self::bounds();
        let mut out = [(0.0f32, 0.0f32); PARAM_COUNT];
        for i in 0..PARAM_COUNT {
            let d = defaults[i];
            let b = bounds[i];
            if d == 0.0 {
                // Multiplying zero never explores; fall back to a small
                // absolute window so the gene can still move.
                out[i] = (-1.0 * b.max_mult, 1.0 * b.max_mult);
            } else if d > 0.0 {
                out[i] = (d * b.min_mult, d * b.max_mult);
            } else {
                out[i] = (d * b.max_mult, d * b.min_mult);
            }
        }
        out
    }
}

/// Per-player tracked ZapZap-risk signal, fed by observing how early/often
/// opponents have called in this game.
#[derive(Debug, Clone, Default)]
struct OpponentRiskTracker {
    /// Monotonically-increasing risk score per opponent slot.
    risk: [f32; crate::game_state::MAX_PLAYERS],
}

/// HardVince - the genetically-tunable parametric bot.
pub struct HardVinceStrategy {
    params: HardVinceParams,
    rng_state: u64,
    risk: std::cell::RefCell<OpponentRiskTracker>,
}

impl HardVinceStrategy {
    pub fn new() -> Self {
        Self::with_params(HardVinceParams::default())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            params: HardVinceParams::default(),
            rng_state: seed,
            risk: std::cell::RefCell::new(OpponentRiskTracker::default()),
        }
    }

    pub fn with_params(params: HardVinceParams) -> Self {
        Self {
            params,
            rng_state: 0x5eed_1234_dead_beef,
            risk: std::cell::RefCell::new(OpponentRiskTracker::default()),
        }
    }

    fn next_random(&mut self) -> u64 {
        let mut x = self.rng_state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng_state = x;
        x
    }

    fn min_opponent_hand_size(&self, state: &GameState) -> usize {
        (0..state.player_count)
            .filter(|&i| i != state.current_turn && !state.is_eliminated(i))
            .map(|i| state.hands[i as usize].len())
            .min()
            .unwrap_or(usize::MAX)
    }

    /// Tracked defensive-risk score: rises when opponents sit on small hands
    /// or are known (via card tracking) to hold low cards.
    fn defensive_risk(&self, state: &GameState) -> f32 {
        let p = &self.params;
        let mut risk = 0.0f32;
        for i in 0..state.player_count {
            if i == state.current_turn || state.is_eliminated(i) {
                continue;
            }
            let hand_size = state.hands[i as usize].len() as f32;
            if hand_size <= 4.0 {
                risk += p.zapzap_risk_opponent_hand_weight * (5.0 - hand_size).max(0.0);
            }
            let tracked = state.card_tracker.taken_count[i as usize] as f32;
            risk += p.zapzap_risk_tracked_card_weight * tracked;
        }
        risk += self.risk.borrow().risk.iter().sum::<f32>();
        risk
    }

    fn score_play(&self, play: &[u8], hand: &[u8], state: &GameState) -> f32 {
        let p = &self.params;
        let remaining: SmallVec<[u8; 10]> = hand.iter().filter(|c| !play.contains(c)).copied().collect();
        let remaining_value = card_analyzer::calculate_hand_value(&remaining, false) as f32;

        let mut score = -remaining_value + p.play_size_weight * play.len() as f32;

        let has_joker = play.iter().any(|&c| card_analyzer::is_joker(c));
        if has_joker && state.is_golden_score {
            score -= p.golden_joker_penalty;
        }

        let min_opp = self.min_opponent_hand_size(state) as f32;
        if has_joker {
            if play.len() >= 3 && card_analyzer::is_run(play) {
                score -= p.joker_in_sequence_base_penalty + p.joker_in_sequence_opponent_scale * min_opp.recip().max(0.1);
            } else if play.len() >= 2 {
                score -= p.joker_in_set_base_penalty + p.joker_in_set_opponent_scale * min_opp.recip().max(0.1);
            }
        }

        // Setup-combo bonus: does the residual hand combine with a card an
        // opponent is known to be holding (taken from the played pile)?
        if min_opp <= p.setup_combo_min_opponent_hand {
            for i in 0..state.player_count {
                if i == state.current_turn || state.is_eliminated(i) {
                    continue;
                }
                let known = state.get_player_known_cards(i);
                for &known_card in &known {
                    if card_analyzer::would_complete_pair(&remaining, known_card)
                        || card_analyzer::would_complete_sequence(&remaining, known_card)
                    {
                        score += p.setup_combo_bonus_weight;
                    }
                }
            }
        }

        let all_players_deep = (0..state.player_count)
            .filter(|&i| !state.is_eliminated(i))
            .all(|i| state.hands[i as usize].len() as f32 >= p.early_game_min_hand_size);
        if all_players_deep {
            for &c in play {
                if card_analyzer::is_joker(c) {
                    continue;
                }
                let rank = card_analyzer::get_rank(c) as f32;
                if rank >= p.early_game_mid_rank_min && rank <= p.early_game_mid_rank_max {
                    score += p.early_game_mid_rank_bonus;
                }
            }
            // Penalize breaking a high-rank pair: a high card is played
            // alone while its rank-mate stays in the remaining hand.
            for &c in play {
                if card_analyzer::is_joker(c) || play.len() > 1 {
                    continue;
                }
                let rank = card_analyzer::get_rank(c);
                if rank as f32 >= p.early_game_high_pair_rank_min
                    && remaining.iter().any(|&r| !card_analyzer::is_joker(r) && card_analyzer::get_rank(r) == rank)
                {
                    score -= p.early_game_high_pair_break_penalty;
                }
            }
        }

        if min_opp <= p.high_threat_hand_size {
            score -= p.high_threat_residual_penalty_weight * remaining_value;
        }

        score
    }
}

impl Default for HardVinceStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl BotStrategy for HardVinceStrategy {
    fn select_play(&self, hand: &[u8], state: &GameState) -> Option<SmallVec<[u8; 8]>> {
        let plays = card_analyzer::find_all_valid_plays(hand);
        if plays.is_empty() {
            return None;
        }

        plays
            .into_iter()
            .max_by(|a, b| {
                self.score_play(a, hand, state)
                    .partial_cmp(&self.score_play(b, hand, state))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    fn should_zapzap(&self, hand: &[u8], state: &GameState) -> bool {
        let p = &self.params;
        let value = card_analyzer::calculate_hand_value(hand, false) as f32;

        if value > 5.0 {
            return false;
        }
        if value <= p.zapzap_hard_refuse_value {
            return true;
        }

        let risk = self.defensive_risk(state);
        if risk >= p.zapzap_defensive_risk_threshold {
            return value <= 2.0;
        }

        let round = state.round_number as f32;
        let max_value = if round <= p.zapzap_early_round_cutoff {
            p.zapzap_early_value_max
        } else if round <= p.zapzap_mid_round_cutoff {
            p.zapzap_mid_value_max
        } else {
            p.zapzap_late_value_max
        };
        value <= max_value
    }

    fn select_draw_source(&self, hand: &[u8], last_cards_played: &[u8], state: &GameState) -> bool {
        let p = &self.params;
        if last_cards_played.is_empty() {
            return true;
        }

        let hand_value = card_analyzer::calculate_hand_value(hand, false) as f32;

        // Hoard jokers in golden score.
        if state.is_golden_score && hand_value <= p.draw_golden_value_threshold {
            if let Some(&joker) = last_cards_played.iter().find(|&&c| card_analyzer::is_joker(c)) {
                let _ = joker;
                return false;
            }
        }

        // Counter-ZapZap joker hoarding when our own hand is already low.
        if hand_value <= p.draw_low_hand_value_threshold {
            if last_cards_played.iter().any(|&c| card_analyzer::is_joker(c)) {
                return false;
            }
        }

        // Marginal-value comparison against expected deck draw.
        let mut best_card_value = f32::MIN;
        for &card in last_cards_played {
            let mut hypothetical: SmallVec<[u8; 10]> = hand.iter().copied().collect();
            hypothetical.push(card);
            let original_multi = card_analyzer::find_all_valid_plays(hand)
                .iter()
                .filter(|p| p.len() > 1)
                .count();
            let new_multi = card_analyzer::find_all_valid_plays(&hypothetical)
                .iter()
                .filter(|p| p.len() > 1 && p.contains(&card))
                .count();
            let combo_bonus = (new_multi as f32 - original_multi as f32).max(0.0) * p.draw_combo_bonus_weight;

            let points = card_analyzer::get_card_points(card) as f32;
            let low_point_bonus = (13.0 - points) * p.draw_low_point_bonus_weight;

            let rank = card_analyzer::get_rank(card);
            let same_rank_in_hand = hand
                .iter()
                .filter(|&&c| !card_analyzer::is_joker(c) && card_analyzer::get_rank(c) == rank)
                .count() as f32;
            let same_rank_bonus = same_rank_in_hand * p.draw_same_rank_bonus_weight;

            let seen = state.count_visible_rank(rank) as f32;
            let seen_penalty = seen * p.draw_seen_penalty_weight;

            let card_value = combo_bonus + low_point_bonus + same_rank_bonus - seen_penalty;
            if card_value > best_card_value {
                best_card_value = card_value;
            }
        }

        let has_joker_available = last_cards_played.iter().any(|&c| card_analyzer::is_joker(c));
        let deck_expected_value = if has_joker_available {
            p.draw_deck_joker_expected_value.min(p.draw_deck_baseline_expected_value)
        } else {
            p.draw_deck_baseline_expected_value
        };

        best_card_value > deck_expected_value + p.draw_marginal_threshold
    }

    fn select_hand_size(&self, _active_player_count: u8, is_golden_score: bool) -> u8 {
        if is_golden_score {
            5
        } else {
            5
        }
    }
}

impl HardVinceStrategy {
    pub fn select_hand_size_mut(&mut self, _active_player_count: u8, is_golden_score: bool) -> u8 {
        if is_golden_score {
            5 + (self.next_random() % 3) as u8
        } else {
            4 + (self.next_random() % 3) as u8
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_roundtrip_vector() {
        let params = HardVinceParams::default();
        let v = params.to_vector();
        assert_eq!(v.len(), PARAM_COUNT);
        let rebuilt = HardVinceParams::from_vector(&v);
        assert_eq!(params, rebuilt);
    }

    #[test]
    fn test_bounds_contain_defaults() {
        let bounds = HardVinceParams::absolute_bounds();
        let defaults = HardVinceParams::default().to_vector();
        for i in 0..PARAM_COUNT {
            let (lo, hi) = bounds[i];
            assert!(
                defaults[i] >= lo.min(hi) - 1e-6 && defaults[i] <= lo.max(hi) + 1e-6,
                "gene {} ({}) default {} outside bound ({}, {})",
                i,
                PARAM_NAMES[i],
                defaults[i],
                lo,
                hi
            );
        }
    }

    #[test]
    fn test_select_play_nonempty_hand() {
        let strategy = HardVinceStrategy::new();
        let state = GameState::new(4);
        let hand = vec![0, 13, 5, 18];
        assert!(strategy.select_play(&hand, &state).is_some());
    }

    #[test]
    fn test_should_zapzap_hard_refuse_at_zero() {
        let strategy = HardVinceStrategy::new();
        let state = GameState::new(4);
        assert!(strategy.should_zapzap(&[52, 53], &state));
    }

    #[test]
    fn test_should_zapzap_above_five_is_false() {
        let strategy = HardVinceStrategy::new();
        let state = GameState::new(4);
        assert!(!strategy.should_zapzap(&[10, 11], &state));
    }

    #[test]
    fn test_select_draw_source_defaults_to_deck_when_empty() {
        let strategy = HardVinceStrategy::new();
        let state = GameState::new(4);
        assert!(strategy.select_draw_source(&[0, 1], &[], &state));
    }
}
