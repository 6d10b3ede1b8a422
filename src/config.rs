//! Experiment definitions and the on-disk data layout.
//!
//! The configuration is built once (from the defaults or a JSON file), validated,
//! and then passed by reference to the runner. Nothing here is mutated after
//! `validate` succeeds.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MmdError, MmdResult};
use crate::games::GameKind;

const GAMBIT_SOL_DIR: &str = "gambit/sf_qres";
const GAMBIT_GAME_DIR: &str = "gambit/gambit_games";
const MMD_RESULTS_DIR: &str = "mmd";
const FIGURE_DIR: &str = "figures";

// ---------------------------------------------------------------------------
// Data layout
// ---------------------------------------------------------------------------

/// Root of every artifact the sweep reads or writes.
#[derive(Debug, Clone)]
pub struct Paths {
    pub root: PathBuf,
}

impl Paths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Paths { root: root.into() }
    }

    /// Normal-form reference solutions (`*_sf.csv`).
    pub fn reference_dir(&self) -> PathBuf {
        self.root.join(GAMBIT_SOL_DIR)
    }

    /// Serialized game trees used to interpret reference solutions.
    pub fn game_dir(&self) -> PathBuf {
        self.root.join(GAMBIT_GAME_DIR)
    }

    /// Cached solver results.
    pub fn results_dir(&self) -> PathBuf {
        self.root.join(MMD_RESULTS_DIR)
    }

    pub fn figure_dir(&self) -> PathBuf {
        self.root.join(FIGURE_DIR)
    }
}

impl Default for Paths {
    fn default() -> Self {
        Paths::new("data")
    }
}

// ---------------------------------------------------------------------------
// Experiments
// ---------------------------------------------------------------------------

/// One parameter sweep over a single game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSpec {
    pub game: GameKind,
    pub inverse_alphas: Vec<u32>,
    /// Iteration count per inverse-alpha, parallel to `inverse_alphas`.
    pub iterations: Vec<usize>,
    pub load_qre: bool,
    pub compute_gap: bool,
}

impl ExperimentSpec {
    pub fn new(
        game: GameKind,
        inverse_alphas: Vec<u32>,
        iterations: usize,
        load_qre: bool,
        compute_gap: bool,
    ) -> Self {
        let iterations = vec![iterations; inverse_alphas.len()];
        ExperimentSpec {
            game,
            inverse_alphas,
            iterations,
            load_qre,
            compute_gap,
        }
    }

    /// `(inverse_alpha, iterations)` pairs in sweep order.
    pub fn points(&self) -> Vec<(u32, usize)> {
        self.inverse_alphas
            .iter()
            .copied()
            .zip(self.iterations.iter().copied())
            .collect()
    }

    pub fn validate(&self) -> MmdResult<()> {
        if self.inverse_alphas.len() != self.iterations.len() {
            return Err(MmdError::InvalidConfig(format!(
                "{}: {} inverse alphas but {} iteration counts",
                self.game,
                self.inverse_alphas.len(),
                self.iterations.len()
            )));
        }
        if self.inverse_alphas.is_empty() {
            return Err(MmdError::InvalidConfig(format!("{}: empty sweep", self.game)));
        }
        let mut seen = HashSet::new();
        for &inverse_alpha in &self.inverse_alphas {
            if inverse_alpha == 0 {
                return Err(MmdError::InvalidConfig(format!(
                    "{}: inverse alpha must be positive",
                    self.game
                )));
            }
            // Workers in one batch share the cache; keys must not collide.
            if !seen.insert(inverse_alpha) {
                return Err(MmdError::InvalidConfig(format!(
                    "{}: inverse alpha {} appears twice",
                    self.game, inverse_alpha
                )));
            }
        }
        if self.load_qre && self.game.reference_game_file().is_none() {
            return Err(MmdError::NoReference(self.game));
        }
        Ok(())
    }
}

/// Command used to launch one solver run. Flags are appended per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl Default for SolverCommand {
    fn default() -> Self {
        SolverCommand {
            program: "python".to_string(),
            args: vec!["scripts/run_experiment.py".to_string()],
            working_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub experiments: Vec<ExperimentSpec>,
    #[serde(default)]
    pub solver: SolverCommand,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        let sweep = vec![2, 5, 10, 20];
        ExperimentConfig {
            experiments: vec![
                ExperimentSpec::new(GameKind::Kuhn, sweep.clone(), 20_000, true, true),
                ExperimentSpec::new(GameKind::DarkHex, sweep.clone(), 20_000, true, true),
                ExperimentSpec::new(GameKind::Leduc, sweep.clone(), 30_000, false, true),
                ExperimentSpec::new(GameKind::LiarsDice, sweep, 30_000, false, true),
            ],
            solver: SolverCommand::default(),
        }
    }
}

impl ExperimentConfig {
    /// Read and validate a JSON configuration file.
    pub fn load(path: &Path) -> MmdResult<Self> {
        if !path.exists() {
            return Err(MmdError::NotFound { path: path.to_path_buf() });
        }
        let json = std::fs::read_to_string(path)?;
        let config: ExperimentConfig =
            serde_json::from_str(&json).map_err(|e| MmdError::MalformedData {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MmdResult<()> {
        if self.solver.program.trim().is_empty() {
            return Err(MmdError::InvalidConfig("solver program is empty".to_string()));
        }
        for experiment in &self.experiments {
            experiment.validate()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
