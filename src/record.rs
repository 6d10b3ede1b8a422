use serde::{Deserialize, Serialize};

use crate::games::GameKind;

/// Output of one solver run, as persisted in the result cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub inverse_alpha: u32,
    pub alpha: f64,
    /// Sequence-form reference strategies of both players, present only when
    /// the run tracked divergence against a reference solution.
    pub solutions: Option<Vec<Vec<f64>>>,
    pub divergences: Vec<f64>,
    pub gap: Vec<f64>,
}

impl ExperimentRecord {
    pub fn new(inverse_alpha: u32) -> Self {
        ExperimentRecord {
            inverse_alpha,
            alpha: alpha_for(inverse_alpha),
            solutions: None,
            divergences: Vec::new(),
            gap: Vec::new(),
        }
    }

    /// Number of solver iterations the record covers.
    pub fn iterations(&self) -> usize {
        self.divergences.len().max(self.gap.len())
    }

    pub fn final_divergence(&self) -> Option<f64> {
        self.divergences.last().copied()
    }

    pub fn final_gap(&self) -> Option<f64> {
        self.gap.last().copied()
    }
}

pub fn alpha_for(inverse_alpha: u32) -> f64 {
    1.0 / inverse_alpha as f64
}

/// Records of one sweep, in the order the sweep was defined.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepResults {
    pub game: GameKind,
    pub records: Vec<ExperimentRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_solver_output_without_reference() {
        let json = r#"{"inverse_alpha": 5, "alpha": 0.2, "solutions": null,
                       "divergences": [], "gap": [0.5, 0.25, 0.125]}"#;
        let record: ExperimentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.inverse_alpha, 5);
        assert!(record.solutions.is_none());
        assert_eq!(record.iterations(), 3);
        assert_eq!(record.final_gap(), Some(0.125));
        assert_eq!(record.final_divergence(), None);
    }

    #[test]
    fn alpha_is_reciprocal() {
        assert_eq!(ExperimentRecord::new(4).alpha, 0.25);
        assert_eq!(alpha_for(20), 0.05);
    }
}
