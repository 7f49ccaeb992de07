//! CardAnalyzer - high-performance card analysis for ZapZap
//!
//! Cards are encoded 0-53: suit = id / 13 for 0-51 (spades, hearts, clubs,
//! diamonds in that order), rank = id % 13 (0=A..12=K). 52 and 53 are jokers.

use crate::game_state::GameState;
use smallvec::SmallVec;
use std::collections::HashSet;

/// First joker card id.
pub const JOKER_START: u8 = 52;

/// Point value per rank, indexed 0=A..12=K.
const CARD_POINTS: [u8; 13] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13];

/// Point value of a card. Jokers score 0 here; penalty scoring for jokers is
/// applied only by [`calculate_hand_value`] in `penalty_mode`.
#[inline(always)]
pub fn get_card_points(card_id: u8) -> u8 {
    if card_id >= JOKER_START {
        return 0;
    }
    CARD_POINTS[(card_id % 13) as usize]
}

/// Card rank (0-12), 255 for jokers.
#[inline(always)]
pub fn get_rank(card_id: u8) -> u8 {
    if card_id >= JOKER_START {
        return 255;
    }
    card_id % 13
}

/// Card suit (0-3), 255 for jokers.
#[inline(always)]
pub fn get_suit(card_id: u8) -> u8 {
    if card_id >= JOKER_START {
        return 255;
    }
    card_id / 13
}

#[inline(always)]
pub fn is_joker(card_id: u8) -> bool {
    card_id >= JOKER_START
}

/// Sum of point values. Jokers contribute 25 when `penalty_mode` is set
/// (end-of-round scoring), 0 otherwise (ZapZap eligibility).
#[inline]
pub fn calculate_hand_value(hand: &[u8], penalty_mode: bool) -> u16 {
    hand.iter()
        .map(|&c| {
            if is_joker(c) {
                if penalty_mode { 25 } else { 0 }
            } else {
                get_card_points(c) as u16
            }
        })
        .sum()
}

/// End-of-round penalty score for a hand: 0 for the hand(s) with the
/// minimum eligibility value, penalty-mode value (joker=25) otherwise.
#[inline]
pub fn calculate_hand_score(hand: &[u8], is_lowest: bool) -> u16 {
    if is_lowest {
        0
    } else {
        calculate_hand_value(hand, true)
    }
}

/// `calculate_hand_value(hand, false) <= 5`.
#[inline]
pub fn can_call_zapzap(hand: &[u8]) -> bool {
    calculate_hand_value(hand, false) <= 5
}

/// Valid same-rank combination (pair/set): >= 2 cards, all non-joker cards
/// share a rank, jokers wildcard.
pub fn is_valid_same_rank(cards: &[u8]) -> bool {
    if cards.len() < 2 {
        return false;
    }

    let mut target_rank: Option<u8> = None;
    for &card in cards {
        if !is_joker(card) {
            let rank = get_rank(card);
            match target_rank {
                None => target_rank = Some(rank),
                Some(r) if r != rank => return false,
                _ => {}
            }
        }
    }
    true
}

/// Valid run: >= 3 cards, non-jokers share a suit, gaps in the sorted ranks
/// are fillable exactly by the available jokers. No wrap-around.
pub fn is_valid_sequence(cards: &[u8]) -> bool {
    if cards.len() < 3 {
        return false;
    }

    let mut normal_cards: SmallVec<[u8; 10]> = SmallVec::new();
    let mut joker_count = 0;
    let mut target_suit: Option<u8> = None;

    for &card in cards {
        if is_joker(card) {
            joker_count += 1;
        } else {
            let suit = get_suit(card);
            match target_suit {
                None => target_suit = Some(suit),
                Some(s) if s != suit => return false,
                _ => {}
            }
            normal_cards.push(get_rank(card));
        }
    }

    if normal_cards.is_empty() {
        return true;
    }

    normal_cards.sort_unstable();
    let mut gaps_needed = 0usize;
    for i in 1..normal_cards.len() {
        let diff = normal_cards[i] as i16 - normal_cards[i - 1] as i16 - 1;
        if diff > 0 {
            gaps_needed += diff as usize;
        } else if diff < 0 {
            return false; // duplicate rank, never a valid run
        }
    }

    gaps_needed <= joker_count
}

pub fn is_single(cards: &[u8]) -> bool {
    cards.len() == 1
}

pub fn is_set(cards: &[u8]) -> bool {
    cards.len() >= 2 && is_valid_same_rank(cards)
}

pub fn is_run(cards: &[u8]) -> bool {
    cards.len() >= 3 && is_valid_sequence(cards)
}

pub fn is_valid_play(cards: &[u8]) -> bool {
    match cards.len() {
        0 => false,
        1 => true,
        _ => is_valid_same_rank(cards) || is_valid_sequence(cards),
    }
}

/// Every valid same-rank play (size >= 2) obtainable from the hand.
pub fn find_same_rank_plays(hand: &[u8]) -> Vec<SmallVec<[u8; 8]>> {
    if hand.len() < 2 {
        return Vec::new();
    }

    let mut plays = Vec::with_capacity(20);

    let jokers: SmallVec<[u8; 2]> = hand.iter().filter(|&&c| is_joker(c)).copied().collect();
    let mut by_rank: [SmallVec<[u8; 4]>; 13] = Default::default();

    for &card in hand {
        if !is_joker(card) {
            by_rank[get_rank(card) as usize].push(card);
        }
    }

    for cards in &by_rank {
        if cards.len() >= 2 {
            plays.push(cards.clone().into_iter().collect());

            for j in 1..=jokers.len().min(4 - cards.len()) {
                let mut play: SmallVec<[u8; 8]> = cards.iter().copied().collect();
                play.extend(jokers.iter().take(j).copied());
                plays.push(play);
            }
        } else if cards.len() == 1 && !jokers.is_empty() {
            for j in 1..=jokers.len() {
                let mut play: SmallVec<[u8; 8]> = SmallVec::new();
                play.push(cards[0]);
                play.extend(jokers.iter().take(j).copied());
                plays.push(play);
            }
        }
    }

    plays
}

/// Every valid run (size >= 3), including every sub-range and each joker
/// assignment that fills its gaps.
pub fn find_sequence_plays(hand: &[u8]) -> Vec<SmallVec<[u8; 8]>> {
    if hand.len() < 3 {
        return Vec::new();
    }

    let mut plays = Vec::with_capacity(20);

    let jokers: SmallVec<[u8; 2]> = hand.iter().filter(|&&c| is_joker(c)).copied().collect();
    let mut by_suit: [SmallVec<[u8; 13]>; 4] = Default::default();

    for &card in hand {
        if !is_joker(card) {
            by_suit[get_suit(card) as usize].push(card);
        }
    }

    for cards in &mut by_suit {
        if cards.len() + jokers.len() < 3 {
            continue;
        }

        cards.sort_unstable_by_key(|&c| get_rank(c));

        for start in 0..cards.len() {
            for end in (start + 3)..=cards.len() {
                let subset = &cards[start..end];

                let mut gaps_needed = 0usize;
                for i in 1..subset.len() {
                    let diff = get_rank(subset[i]) as i16 - get_rank(subset[i - 1]) as i16 - 1;
                    if diff > 0 {
                        gaps_needed += diff as usize;
                    }
                }

                if gaps_needed <= jokers.len() {
                    if gaps_needed == 0 {
                        plays.push(subset.iter().copied().collect());
                    } else {
                        let mut play: SmallVec<[u8; 8]> = subset.iter().copied().collect();
                        play.extend(jokers.iter().take(gaps_needed).copied());
                        plays.push(play);
                    }
                }
            }
        }
    }

    plays
}

/// Every valid play in the hand: every single, every same-rank play, every
/// run. Deduplicated by card-id set.
pub fn find_all_valid_plays(hand: &[u8]) -> Vec<SmallVec<[u8; 8]>> {
    if hand.is_empty() {
        return Vec::new();
    }

    let mut plays = Vec::with_capacity(hand.len() + 40);

    for &card in hand {
        let mut play: SmallVec<[u8; 8]> = SmallVec::new();
        play.push(card);
        plays.push(play);
    }

    plays.extend(find_same_rank_plays(hand));
    plays.extend(find_sequence_plays(hand));

    let mut seen: HashSet<SmallVec<[u8; 8]>> = HashSet::with_capacity(plays.len());
    let mut deduped = Vec::with_capacity(plays.len());
    for mut play in plays {
        play.sort_unstable();
        if seen.insert(play.clone()) {
            deduped.push(play);
        }
    }
    deduped
}

fn remaining_after(hand: &[u8], play: &[u8]) -> SmallVec<[u8; 10]> {
    hand.iter().filter(|c| !play.contains(c)).copied().collect()
}

/// The play whose removal most reduces hand value. Ties broken by larger
/// play size, then lower leftover hand value.
pub fn find_max_point_play(hand: &[u8]) -> Option<SmallVec<[u8; 8]>> {
    let plays = find_all_valid_plays(hand);

    plays.into_iter().max_by(|a, b| {
        let a_points: u32 = a.iter().map(|&c| get_card_points(c) as u32).sum();
        let b_points: u32 = b.iter().map(|&c| get_card_points(c) as u32).sum();
        a_points
            .cmp(&b_points)
            .then_with(|| a.len().cmp(&b.len()))
            .then_with(|| {
                let a_left = calculate_hand_value(&remaining_after(hand, a), false);
                let b_left = calculate_hand_value(&remaining_after(hand, b), false);
                b_left.cmp(&a_left) // lower leftover wins, so reverse the natural order
            })
    })
}

/// Would drawing `card` let the hand form a same-rank play (size >= 2) that
/// includes it? A joker already in hand always completes a pair.
pub fn would_complete_pair(hand: &[u8], card: u8) -> bool {
    if is_joker(card) {
        return !hand.is_empty();
    }
    let rank = get_rank(card);
    hand.iter().any(|&c| is_joker(c) || get_rank(c) == rank)
}

/// Would drawing `card` let the hand form a run (size >= 3) that includes it?
pub fn would_complete_sequence(hand: &[u8], card: u8) -> bool {
    let mut hypothetical: SmallVec<[u8; 10]> = hand.iter().copied().collect();
    hypothetical.push(card);
    find_sequence_plays(&hypothetical)
        .iter()
        .any(|play| play.contains(&card))
}

/// How valuable is it to keep `card` in hand? Higher means keep, lower means
/// discard. Jokers are effectively never discarded.
pub fn card_keep_score(card: u8, hand: &[u8], state: &GameState) -> i32 {
    if is_joker(card) {
        return 10_000;
    }

    let rank = get_rank(card);
    let points = get_card_points(card) as i32;
    let mut score = -points;

    let same_rank_in_hand = hand
        .iter()
        .filter(|&&c| !is_joker(c) && c != card && get_rank(c) == rank)
        .count() as i32;
    if same_rank_in_hand >= 1 {
        score += 50 * same_rank_in_hand;
    }

    score += state.count_drawable_rank(rank) as i32 * 5;

    if would_complete_pair(hand, card) || would_complete_sequence(hand, card) {
        score += 20;
    }

    score
}

/// Multi-turn planning helper: is there a card in `last_cards_played` that,
/// if taken next turn, lets some sacrifice now set up a bigger future play?
/// Returns `(sacrifice_card, take_card, future_value)` for the best such
/// setup found.
pub fn find_setup_play(hand: &[u8], last_cards_played: &[u8]) -> Option<(u8, u8, i32)> {
    let mut best: Option<(u8, u8, i32)> = None;

    for &take_card in last_cards_played {
        let mut hypothetical: SmallVec<[u8; 10]> = hand.iter().copied().collect();
        hypothetical.push(take_card);

        for play in find_all_valid_plays(&hypothetical) {
            if play.len() < 2 || !play.contains(&take_card) {
                continue;
            }

            let Some(sacrifice_card) = hand
                .iter()
                .filter(|c| !play.contains(c))
                .copied()
                .min_by_key(|&c| get_card_points(c))
            else {
                continue;
            };

            let future_value = play.iter().map(|&c| get_card_points(c) as i32).sum::<i32>() * 2
                + play.len() as i32 * 5;

            if best.map_or(true, |(_, _, v)| future_value > v) {
                best = Some((sacrifice_card, take_card, future_value));
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_card_points() {
        assert_eq!(get_card_points(0), 1);
        assert_eq!(get_card_points(1), 2);
        assert_eq!(get_card_points(9), 10);
        assert_eq!(get_card_points(10), 11);
        assert_eq!(get_card_points(11), 12);
        assert_eq!(get_card_points(12), 13);
        assert_eq!(get_card_points(52), 0);
        assert_eq!(get_card_points(53), 0);
    }

    #[test]
    fn test_calculate_hand_value_literal() {
        assert_eq!(calculate_hand_value(&[0, 14, 28], false), 6);
        assert_eq!(calculate_hand_value(&[52, 41, 1], true), 30);
        assert_eq!(calculate_hand_value(&[52, 53], false), 0);
    }

    #[test]
    fn test_can_call_zapzap() {
        assert!(!can_call_zapzap(&[0, 1, 2]));
        assert!(can_call_zapzap(&[0, 1]));
        assert!(can_call_zapzap(&[52, 53, 0]));
        assert!(!can_call_zapzap(&[9, 10]));
    }

    #[test]
    fn test_is_valid_same_rank() {
        assert!(is_valid_same_rank(&[0, 13]));
        assert!(is_valid_same_rank(&[0, 13, 26]));
        assert!(!is_valid_same_rank(&[0, 1]));
        assert!(is_valid_same_rank(&[0, 52]));
    }

    #[test]
    fn test_is_valid_sequence() {
        assert!(is_valid_sequence(&[0, 1, 2]));
        assert!(!is_valid_sequence(&[0, 1]));
        assert!(!is_valid_sequence(&[0, 1, 15]));
        assert!(is_valid_sequence(&[0, 2, 52]));
        assert!(!is_valid_sequence(&[11, 12, 0])); // Q-K-A invalid, no wrap
    }

    #[test]
    fn test_find_all_valid_plays_no_duplicates() {
        let hand = vec![0, 1, 2, 13];
        let plays = find_all_valid_plays(&hand);
        assert!(plays.len() >= 6);
        assert!(plays.iter().any(|p| p.len() == 1 && p[0] == 0));
        assert!(plays.iter().any(|p| p.len() == 2 && p.contains(&0) && p.contains(&13)));
        assert!(plays
            .iter()
            .any(|p| p.len() == 3 && p.contains(&0) && p.contains(&1) && p.contains(&2)));

        let mut seen = HashSet::new();
        for play in &plays {
            let mut sorted = play.clone();
            sorted.sort_unstable();
            assert!(seen.insert(sorted), "duplicate play found: {:?}", play);
        }
        for play in &plays {
            assert!(is_valid_play(play));
        }
    }

    #[test]
    fn test_would_complete_pair_and_sequence() {
        assert!(would_complete_pair(&[0], 13)); // both aces
        assert!(!would_complete_pair(&[0], 1));
        assert!(would_complete_sequence(&[0, 1], 2)); // completes A-2-3
        assert!(!would_complete_sequence(&[0, 1], 20));
    }

    #[test]
    fn test_card_keep_score_joker_never_discarded() {
        let state = GameState::new(4);
        assert_eq!(card_keep_score(52, &[52, 0], &state), 10_000);
    }

    #[test]
    fn test_find_max_point_play_tie_break() {
        let hand = vec![12, 25, 0]; // K-spades, K-hearts, A-spades
        let play = find_max_point_play(&hand).unwrap();
        assert!(play.len() == 2 && play.contains(&12) && play.contains(&25));
    }
}
