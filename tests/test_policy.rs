//! Tests for the normal-form → tabular policy converter.
//!
//! Covers the cursor contract between the legal-action mask and the
//! behavioral sequence, the per-row normalisation, dimension checks, and
//! realization equivalence on Kuhn poker.

use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use mmd_sweep::config::Paths;
use mmd_sweep::engine::{GameEngine, MixedProfile, StrategyId};
use mmd_sweep::error::{MmdError, MmdResult};
use mmd_sweep::game_tree::{kuhn_poker, Node, TreeEngine, TreeGame};
use mmd_sweep::games::GameKind;
use mmd_sweep::policy::{convert, fill_from_behavior, ROW_SUM_EPS};

// ---------------------------------------------------------------------------
// Helper: single-decision engine with a configurable mask
// ---------------------------------------------------------------------------

/// One decision point; pure strategy `k` always plays action `k`.
struct OneShotEngine {
    actions: usize,
    mask: Vec<Vec<bool>>,
}

impl OneShotEngine {
    fn new(actions: usize) -> Self {
        OneShotEngine {
            actions,
            mask: vec![vec![true; actions]],
        }
    }
}

impl GameEngine for OneShotEngine {
    fn pure_strategies(&self, _game: GameKind) -> MmdResult<Vec<StrategyId>> {
        Ok((0..self.actions).map(|a| StrategyId::new(0, vec![a])).collect())
    }

    fn mixed_to_behavior(&self, _game: GameKind, profile: &MixedProfile) -> MmdResult<Vec<f64>> {
        let total = profile.player_mass(0);
        Ok((0..self.actions)
            .map(|a| profile.weight(&StrategyId::new(0, vec![a])) / total)
            .collect())
    }

    fn legal_actions_mask(&self, _game: GameKind) -> MmdResult<Vec<Vec<bool>>> {
        Ok(self.mask.clone())
    }
}

fn kuhn_engine() -> TreeEngine {
    // No tree files here, so Kuhn resolves to the built-in tree.
    TreeEngine::new(&Paths::new(std::env::temp_dir().join("mmd_policy_no_games")))
}

// ---------------------------------------------------------------------------
// Cursor contract
// ---------------------------------------------------------------------------

#[test]
fn test_two_action_example() {
    let engine = OneShotEngine::new(2);
    let policy = convert(&engine, GameKind::Kuhn, &[0.3, 0.7]).unwrap();
    assert_eq!(policy.num_rows(), 1);
    assert_abs_diff_eq!(policy.row(0)[0], 0.3, epsilon = 1e-12);
    assert_abs_diff_eq!(policy.row(0)[1], 0.7, epsilon = 1e-12);
}

#[test]
fn test_random_masks_consume_sequence_exactly() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let rows = rng.gen_range(1..12);
        let cols = rng.gen_range(1..6);
        let mask: Vec<Vec<bool>> = (0..rows)
            .map(|_| {
                let mut row: Vec<bool> = (0..cols).map(|_| rng.gen_bool(0.6)).collect();
                let forced = rng.gen_range(0..cols);
                row[forced] = true;
                row
            })
            .collect();
        let legal: usize = mask.iter().flatten().filter(|&&b| b).count();
        // Distinct values reveal where each entry landed.
        let behavior: Vec<f64> = (1..=legal).map(|i| i as f64).collect();

        let policy = fill_from_behavior(mask.clone(), &behavior).unwrap();

        let mut next = 1.0;
        for (mask_row, prob_row) in mask.iter().zip(&policy.action_probabilities) {
            for (&is_legal, &p) in mask_row.iter().zip(prob_row) {
                if is_legal {
                    assert_eq!(p, next);
                    next += 1.0;
                } else {
                    assert_eq!(p, 0.0);
                }
            }
        }
        assert_eq!(next as usize, legal + 1);
    }
}

#[test]
fn test_behavior_one_short_is_alignment_error() {
    let mut engine = OneShotEngine::new(2);
    engine.mask = vec![vec![true, true, true]];
    let err = convert(&engine, GameKind::Kuhn, &[0.5, 0.5]).unwrap_err();
    assert!(matches!(err, MmdError::Alignment { available: 2, .. }), "{}", err);
}

#[test]
fn test_behavior_one_long_is_alignment_error() {
    let mut engine = OneShotEngine::new(3);
    engine.mask = vec![vec![true, false, true]];
    let err = convert(&engine, GameKind::Kuhn, &[0.2, 0.3, 0.5]).unwrap_err();
    assert!(
        matches!(err, MmdError::Alignment { consumed: 2, available: 3 }),
        "{}",
        err
    );
}

#[test]
fn test_strategy_length_mismatch() {
    let engine = OneShotEngine::new(2);
    for bad in [vec![1.0], vec![0.2, 0.3, 0.5]] {
        let err = convert(&engine, GameKind::Kuhn, &bad).unwrap_err();
        assert!(
            matches!(err, MmdError::DimensionMismatch { expected: 2, got } if got == bad.len()),
            "{}",
            err
        );
    }
}

#[test]
fn test_kuhn_full_strategic_form_is_rejected() {
    // 64 + 64 entries is the unreduced form; the engine lists 27 + 64.
    let err = convert(&kuhn_engine(), GameKind::Kuhn, &vec![1.0 / 64.0; 128]).unwrap_err();
    assert!(matches!(err, MmdError::DimensionMismatch { expected: 91, got: 128 }));
}

// ---------------------------------------------------------------------------
// Kuhn poker
// ---------------------------------------------------------------------------

#[test]
fn test_kuhn_uniform_reduced_strategy() {
    let mut weights = vec![1.0 / 27.0; 27];
    weights.extend(vec![1.0 / 64.0; 64]);
    let policy = convert(&kuhn_engine(), GameKind::Kuhn, &weights).unwrap();
    assert_eq!(policy.num_rows(), 12);

    // Two of player 0's three options per card start with a pass.
    for (i, row) in policy.action_probabilities.iter().enumerate() {
        let expected = if i < 6 && i % 2 == 0 { [2.0 / 3.0, 1.0 / 3.0] } else { [0.5, 0.5] };
        assert_abs_diff_eq!(row[0], expected[0], epsilon = 1e-12);
        assert_abs_diff_eq!(row[1], expected[1], epsilon = 1e-12);
    }
    assert!(policy.degenerate_rows().is_empty());
}

#[test]
fn test_kuhn_always_bet_leaves_unreached_rows_empty() {
    // Strategy 26 is player 0 betting with every card, 90 is player 1 betting everywhere.
    let mut weights = vec![0.0; 91];
    weights[26] = 1.0;
    weights[90] = 1.0;
    let policy = convert(&kuhn_engine(), GameKind::Kuhn, &weights).unwrap();
    assert!(policy.check_rows(ROW_SUM_EPS).is_ok());

    // Player 0 never passes first, so its three pass-then-facing-a-bet rows are unreached.
    let degenerate = policy.degenerate_rows();
    assert_eq!(degenerate.len(), 3);
    for (i, row) in policy.action_probabilities.iter().enumerate() {
        if degenerate.contains(&i) {
            assert_eq!(row, &vec![0.0, 0.0]);
        } else {
            assert_eq!(row, &vec![0.0, 1.0]);
        }
    }
}

#[test]
fn test_kuhn_random_profiles_sum_to_one() {
    let engine = kuhn_engine();
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20 {
        let weights = random_profile(&mut rng, 27, 64);
        let policy = convert(&engine, GameKind::Kuhn, &weights).unwrap();
        for sum in policy.row_sums() {
            assert_abs_diff_eq!(sum, 1.0, epsilon = ROW_SUM_EPS);
        }
    }
}

#[test]
fn test_kuhn_behavior_is_realization_equivalent() {
    let game = kuhn_poker();
    let strategies = game.pure_strategies();
    let mut rng = StdRng::seed_from_u64(2024);

    for _ in 0..10 {
        let weights = random_profile(&mut rng, 27, 64);
        let profile = MixedProfile::from_enumeration(&strategies, &weights).unwrap();
        let behavior = game.behavior(&profile).unwrap();

        let mut mixed = Vec::new();
        let mut behavioral = Vec::new();
        leaf_probabilities(
            &game,
            &game.root,
            1.0,
            &mut Vec::new(),
            &profile,
            &behavior,
            &mut mixed,
            &mut behavioral,
        );

        assert_eq!(mixed.len(), 30);
        for (m, b) in mixed.iter().zip(&behavioral) {
            assert_abs_diff_eq!(*m, *b, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(mixed.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Random weights, normalised separately for each player's block.
fn random_profile(rng: &mut StdRng, n0: usize, n1: usize) -> Vec<f64> {
    let mut block = |n: usize| {
        let raw: Vec<f64> = (0..n).map(|_| rng.gen_range(0.01..1.0)).collect();
        let total: f64 = raw.iter().sum();
        raw.into_iter().map(|w| w / total).collect::<Vec<_>>()
    };
    let mut weights = block(n0);
    weights.extend(block(n1));
    weights
}

/// Probability of every leaf under the mixed profile and under the behavior
/// strategy derived from it, in tree order.
#[allow(clippy::too_many_arguments)]
fn leaf_probabilities(
    game: &TreeGame,
    node: &Node,
    chance: f64,
    path: &mut Vec<(usize, usize)>,
    profile: &MixedProfile,
    behavior: &[f64],
    mixed: &mut Vec<f64>,
    behavioral: &mut Vec<f64>,
) {
    match node {
        Node::Terminal { .. } => {
            let mut reach = chance;
            for player in 0..2 {
                let local = game.player_infosets(player);
                let mass: f64 = profile
                    .iter()
                    .filter(|(s, _)| s.player == player)
                    .filter(|(s, _)| {
                        path.iter()
                            .filter(|(i, _)| game.infosets[*i].player == player)
                            .all(|&(i, k)| {
                                let pos = local.iter().position(|&x| x == i).unwrap();
                                s.choices[pos] == k
                            })
                    })
                    .map(|(_, w)| w)
                    .sum();
                reach *= mass;
            }
            mixed.push(reach);

            let offsets = behavior_offsets(game);
            let b: f64 = path.iter().map(|&(i, k)| behavior[offsets[i] + k]).product();
            behavioral.push(chance * b);
        }
        Node::Chance { outcomes } => {
            for (p, child) in outcomes {
                leaf_probabilities(
                    game,
                    child,
                    chance * p,
                    path,
                    profile,
                    behavior,
                    mixed,
                    behavioral,
                );
            }
        }
        Node::Decision { infoset, children } => {
            for (k, child) in children.iter().enumerate() {
                path.push((*infoset, k));
                leaf_probabilities(game, child, chance, path, profile, behavior, mixed, behavioral);
                path.pop();
            }
        }
    }
}

/// Start of each decision point's block in the behavioral sequence.
fn behavior_offsets(game: &TreeGame) -> Vec<usize> {
    let mut offsets = vec![0; game.infosets.len()];
    let mut next = 0;
    for i in game.row_order() {
        offsets[i] = next;
        next += game.infosets[i].actions.len();
    }
    offsets
}
