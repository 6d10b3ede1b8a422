//! Normal-form reference solution → tabular behavioral policy.
//!
//! Layout: the policy is a dense `rows × columns` table, one row per decision
//! point and one column per action, with a legality mask of the same shape.
//! The engine's behavioral sequence fills the legal cells in row-major order:
//!
//!   for row in rows { for col in columns { if mask[row][col] { take next } } }
//!
//! Illegal cells stay at zero and do not consume a value. The whole sequence
//! must be consumed exactly.

use serde::{Deserialize, Serialize};

use crate::engine::{GameEngine, MixedProfile};
use crate::error::{MmdError, MmdResult};
use crate::games::GameKind;

/// Tolerance for the per-row normalisation check.
pub const ROW_SUM_EPS: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularPolicy {
    pub legal_actions_mask: Vec<Vec<bool>>,
    pub action_probabilities: Vec<Vec<f64>>,
}

impl TabularPolicy {
    /// All-zero policy with the given mask.
    pub fn zeros(legal_actions_mask: Vec<Vec<bool>>) -> Self {
        let action_probabilities = legal_actions_mask
            .iter()
            .map(|row| vec![0.0; row.len()])
            .collect();
        TabularPolicy {
            legal_actions_mask,
            action_probabilities,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.legal_actions_mask.len()
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.action_probabilities[row]
    }

    /// Sum of probabilities over the legal cells of each row.
    pub fn row_sums(&self) -> Vec<f64> {
        self.legal_actions_mask
            .iter()
            .zip(&self.action_probabilities)
            .map(|(mask, probs)| {
                mask.iter()
                    .zip(probs)
                    .filter(|(&legal, _)| legal)
                    .map(|(_, p)| p)
                    .sum()
            })
            .collect()
    }

    /// Rows carrying no probability mass. The engine reports these for
    /// decision points the profile never reaches.
    pub fn degenerate_rows(&self) -> Vec<usize> {
        self.row_sums()
            .iter()
            .enumerate()
            .filter(|(_, &sum)| sum.abs() <= ROW_SUM_EPS)
            .map(|(row, _)| row)
            .collect()
    }

    /// Every row must sum to 1 within `eps`, or be degenerate. A NaN sum is
    /// neither.
    pub fn check_rows(&self, eps: f64) -> MmdResult<()> {
        for (row, sum) in self.row_sums().into_iter().enumerate() {
            if !(sum.abs() <= eps || (sum - 1.0).abs() <= eps) {
                return Err(MmdError::RowSum { row, sum });
            }
        }
        Ok(())
    }
}

/// Place `behavior` into the legal cells of `mask`, row-major.
pub fn fill_from_behavior(mask: Vec<Vec<bool>>, behavior: &[f64]) -> MmdResult<TabularPolicy> {
    let mut policy = TabularPolicy::zeros(mask);
    let mut idx = 0;

    for (legal_row, prob_row) in policy
        .legal_actions_mask
        .iter()
        .zip(policy.action_probabilities.iter_mut())
    {
        for (&legal, cell) in legal_row.iter().zip(prob_row.iter_mut()) {
            if !legal {
                continue;
            }
            *cell = *behavior.get(idx).ok_or_else(|| MmdError::Alignment {
                consumed: idx + 1,
                available: behavior.len(),
            })?;
            idx += 1;
        }
    }

    if idx != behavior.len() {
        return Err(MmdError::Alignment {
            consumed: idx,
            available: behavior.len(),
        });
    }
    Ok(policy)
}

/// Convert a normal-form strategy (one weight per pure strategy, in engine
/// enumeration order) into the equivalent tabular behavioral policy.
pub fn convert<E: GameEngine + ?Sized>(
    engine: &E,
    game: GameKind,
    normal_form_strategy: &[f64],
) -> MmdResult<TabularPolicy> {
    let strategies = engine.pure_strategies(game)?;
    let profile = MixedProfile::from_enumeration(&strategies, normal_form_strategy)?;
    let behavior = engine.mixed_to_behavior(game, &profile)?;
    let mask = engine.legal_actions_mask(game)?;

    let policy = fill_from_behavior(mask, &behavior)?;
    log::debug!(
        "{}: {} pure strategies -> {} behavioral entries over {} decision points",
        game,
        strategies.len(),
        behavior.len(),
        policy.num_rows(),
    );
    Ok(policy)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
