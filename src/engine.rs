//! Boundary to the extensive-form game engine.
//!
//! The converter only ever talks to a game through [`GameEngine`]. The engine
//! owns three independently produced orderings (pure strategies, behavioral
//! probabilities, legal-action rows); the converter relies on the last two
//! agreeing and checks that they do.

use std::collections::BTreeMap;

use crate::error::{MmdError, MmdResult};
use crate::games::GameKind;

/// Action slot of a decision point the strategy's own earlier choices cut
/// off. Reduced strategies leave these open; the slot never matches an action.
pub const UNREACHED: usize = usize::MAX;

/// Identity of one pure strategy: the owning player and the action index it
/// picks at each of that player's decision points, [`UNREACHED`] where it
/// picks none.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StrategyId {
    pub player: usize,
    pub choices: Vec<usize>,
}

impl StrategyId {
    pub fn new(player: usize, choices: Vec<usize>) -> Self {
        StrategyId { player, choices }
    }
}

/// Weights over pure strategies keyed by identity, never by position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MixedProfile {
    weights: BTreeMap<StrategyId, f64>,
}

impl MixedProfile {
    /// Assign `weights[i]` to `strategies[i]`. `strategies` must be the
    /// engine's enumeration, in the engine's order. Weights must be finite and
    /// non-negative.
    pub fn from_enumeration(strategies: &[StrategyId], weights: &[f64]) -> MmdResult<Self> {
        if strategies.len() != weights.len() {
            return Err(MmdError::DimensionMismatch {
                expected: strategies.len(),
                got: weights.len(),
            });
        }
        if let Some((position, &weight)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(MmdError::InvalidWeight { position, weight });
        }
        let weights = strategies
            .iter()
            .cloned()
            .zip(weights.iter().copied())
            .collect();
        Ok(MixedProfile { weights })
    }

    /// Weight of `strategy`; strategies absent from the profile weigh zero.
    pub fn weight(&self, strategy: &StrategyId) -> f64 {
        self.weights.get(strategy).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StrategyId, f64)> {
        self.weights.iter().map(|(s, &w)| (s, w))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Total weight assigned to `player`'s strategies.
    pub fn player_mass(&self, player: usize) -> f64 {
        self.iter()
            .filter(|(s, _)| s.player == player)
            .map(|(_, w)| w)
            .sum()
    }
}

/// Extensive-form game engine, loaded by game descriptor.
pub trait GameEngine {
    /// Pure strategies of all players, player 0 first, in enumeration order.
    fn pure_strategies(&self, game: GameKind) -> MmdResult<Vec<StrategyId>>;

    /// Behavior-equivalent strategy of `profile` as a flat sequence of
    /// per-action probabilities, grouped by decision point.
    fn mixed_to_behavior(&self, game: GameKind, profile: &MixedProfile) -> MmdResult<Vec<f64>>;

    /// Legal-action mask, one row per decision point, one column per action.
    fn legal_actions_mask(&self, game: GameKind) -> MmdResult<Vec<Vec<bool>>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_is_keyed_by_identity() {
        let strategies = vec![
            StrategyId::new(0, vec![1]),
            StrategyId::new(0, vec![0]),
            StrategyId::new(1, vec![]),
        ];
        let profile = MixedProfile::from_enumeration(&strategies, &[0.9, 0.1, 1.0]).unwrap();
        assert_eq!(profile.weight(&StrategyId::new(0, vec![1])), 0.9);
        assert_eq!(profile.weight(&StrategyId::new(0, vec![0])), 0.1);
        assert_eq!(profile.weight(&StrategyId::new(0, vec![2])), 0.0);
        assert!((profile.player_mass(0) - 1.0).abs() < 1e-12);
        assert_eq!(profile.len(), 3);
    }

    #[test]
    fn nan_weight_rejected() {
        let strategies = vec![StrategyId::new(0, vec![0]), StrategyId::new(0, vec![1])];
        let err = MixedProfile::from_enumeration(&strategies, &[0.5, f64::NAN]).unwrap_err();
        assert!(matches!(err, MmdError::InvalidWeight { position: 1, .. }));
        let err = MixedProfile::from_enumeration(&strategies, &[-0.5, 1.5]).unwrap_err();
        assert!(matches!(err, MmdError::InvalidWeight { position: 0, .. }));
    }

    #[test]
    fn length_mismatch_rejected() {
        let strategies = vec![StrategyId::new(0, vec![0])];
        let err = MixedProfile::from_enumeration(&strategies, &[0.5, 0.5]).unwrap_err();
        assert!(matches!(err, MmdError::DimensionMismatch { expected: 1, got: 2 }));
    }
}
