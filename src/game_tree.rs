//! Explicit two-player extensive-form game trees.
//!
//! `TreeGame` is the in-process implementation of the game engine boundary:
//! it enumerates pure strategies, converts mixed profiles to behavioral
//! strategies, and exposes the legal-action mask. Kuhn poker is built in;
//! other games are read from JSON tree files in the data directory.
//!
//! Orderings (all three must agree for the policy converter):
//!   - pure strategies: the reduced strategic form, player 0 then player 1.
//!     A player's strategies fix an action only at the decision points their
//!     own earlier choices leave reachable; the rest hold [`UNREACHED`].
//!     They are listed by a depth-first walk of the tree that follows every
//!     chance and opponent branch in order but only the chosen branch at the
//!     player's own nodes. The first decision point the walk meets varies
//!     slowest, and actions are tried in column order. This is the order
//!     Gambit lists strategies in, so reference files index the same list.
//!   - behavior: player 0's decision points then player 1's, each in
//!     declaration order, one entry per legal action in column order.
//!   - mask rows: same decision point order as behavior.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::config::Paths;
use crate::engine::{GameEngine, MixedProfile, StrategyId, UNREACHED};
use crate::error::{MmdError, MmdResult};
use crate::games::GameKind;

pub const NUM_PLAYERS: usize = 2;

const PROB_EPS: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Tree types
// ---------------------------------------------------------------------------

/// A decision point: histories its player cannot tell apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoSet {
    pub player: usize,
    pub label: String,
    /// Legal action columns, strictly increasing.
    pub actions: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Terminal { payoffs: [f64; NUM_PLAYERS] },
    Chance { outcomes: Vec<(f64, Node)> },
    /// `children[k]` follows the `k`-th legal action of `infoset`.
    Decision { infoset: usize, children: Vec<Node> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeGame {
    pub name: String,
    /// Width of the action space (columns of the legal-action mask).
    pub num_actions: usize,
    pub infosets: Vec<InfoSet>,
    pub root: Node,
}

/// A player's own prior choices on the way to a decision point, as
/// `(infoset, action index)` pairs.
type Sequence = Vec<(usize, usize)>;

impl TreeGame {
    /// Read and validate a tree from a JSON file.
    pub fn load(path: &Path) -> MmdResult<TreeGame> {
        if !path.exists() {
            return Err(MmdError::NotFound { path: path.to_path_buf() });
        }
        let json = std::fs::read_to_string(path)?;
        let game: TreeGame = serde_json::from_str(&json).map_err(|e| MmdError::MalformedData {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        game.validate()?;
        Ok(game)
    }

    pub fn save(&self, path: &Path) -> MmdResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    /// Decision points of `player`, in declaration order.
    pub fn player_infosets(&self, player: usize) -> Vec<usize> {
        self.infosets
            .iter()
            .enumerate()
            .filter(|(_, info)| info.player == player)
            .map(|(i, _)| i)
            .collect()
    }

    /// Decision points in mask-row (and behavior) order.
    pub fn row_order(&self) -> Vec<usize> {
        (0..NUM_PLAYERS).flat_map(|p| self.player_infosets(p)).collect()
    }

    pub fn validate(&self) -> MmdResult<()> {
        for (i, info) in self.infosets.iter().enumerate() {
            if info.player >= NUM_PLAYERS {
                return Err(invalid(format!(
                    "infoset {} ({}) has player {}",
                    i, info.label, info.player
                )));
            }
            if info.actions.is_empty() {
                return Err(invalid(format!("infoset {} ({}) has no actions", i, info.label)));
            }
            if !info.actions.windows(2).all(|w| w[0] < w[1]) {
                return Err(invalid(format!(
                    "infoset {} ({}) actions not increasing",
                    i, info.label
                )));
            }
            if info.actions.iter().any(|&a| a >= self.num_actions) {
                return Err(invalid(format!(
                    "infoset {} ({}) uses an action outside 0..{}",
                    i, info.label, self.num_actions
                )));
            }
        }
        check_node(self, &self.root)?;
        self.sequences().map(|_| ())
    }

    /// Prior own sequence of every decision point. Fails if two histories in
    /// one decision point disagree (imperfect recall) or if a decision point
    /// never occurs in the tree.
    fn sequences(&self) -> MmdResult<Vec<Sequence>> {
        let mut seen: Vec<Option<Sequence>> = vec![None; self.infosets.len()];
        let mut paths: [Sequence; NUM_PLAYERS] = [Vec::new(), Vec::new()];
        collect_sequences(self, &self.root, &mut paths, &mut seen)?;

        seen.into_iter()
            .enumerate()
            .map(|(i, seq)| {
                seq.ok_or_else(|| {
                    invalid(format!("infoset {} ({}) is never reached", i, self.infosets[i].label))
                })
            })
            .collect()
    }

    /// Reduced pure strategies of both players, player 0 first.
    pub fn pure_strategies(&self) -> Vec<StrategyId> {
        let local = self.local_positions();
        let mut strategies = Vec::new();
        for player in 0..NUM_PLAYERS {
            let mut choices = vec![None; self.player_infosets(player).len()];
            let mut pending = vec![&self.root];
            self.reduced_strategies(player, &local, &mut pending, &mut choices, &mut strategies);
        }
        strategies
    }

    /// Position of every decision point among its player's decision points.
    fn local_positions(&self) -> Vec<usize> {
        let mut local = vec![0; self.infosets.len()];
        for player in 0..NUM_PLAYERS {
            for (pos, i) in self.player_infosets(player).into_iter().enumerate() {
                local[i] = pos;
            }
        }
        local
    }

    /// Depth-first walk over `pending` (top = next node). Branches on the
    /// player's own decision points the first time each is met; a complete
    /// walk emits one strategy.
    fn reduced_strategies<'a>(
        &'a self,
        player: usize,
        local: &[usize],
        pending: &mut Vec<&'a Node>,
        choices: &mut [Option<usize>],
        out: &mut Vec<StrategyId>,
    ) {
        let Some(node) = pending.pop() else {
            let fixed = choices.iter().map(|c| c.unwrap_or(UNREACHED)).collect();
            out.push(StrategyId::new(player, fixed));
            return;
        };
        let base = pending.len();

        match node {
            Node::Terminal { .. } => self.reduced_strategies(player, local, pending, choices, out),
            Node::Chance { outcomes } => {
                pending.extend(outcomes.iter().rev().map(|(_, child)| child));
                self.reduced_strategies(player, local, pending, choices, out);
            }
            Node::Decision { infoset, children } if self.infosets[*infoset].player == player => {
                let slot = local[*infoset];
                let chosen = choices[slot];
                match chosen {
                    // Met before on this walk: perfect recall makes the choice binding.
                    Some(k) => {
                        pending.push(&children[k]);
                        self.reduced_strategies(player, local, pending, choices, out);
                    }
                    None => {
                        for (k, child) in children.iter().enumerate() {
                            choices[slot] = Some(k);
                            pending.push(child);
                            self.reduced_strategies(player, local, pending, choices, out);
                            pending.truncate(base);
                        }
                        choices[slot] = None;
                    }
                }
            }
            Node::Decision { children, .. } => {
                pending.extend(children.iter().rev());
                self.reduced_strategies(player, local, pending, choices, out);
            }
        }

        pending.truncate(base);
        pending.push(node);
    }

    /// Realization-equivalent behavioral strategy of `profile`.
    ///
    /// At decision point `I` of player `p`, the probability of action `a` is
    /// the weight of `p`'s strategies that reach `I` and play `a` there,
    /// divided by the weight of those that reach `I`. When no weighted
    /// strategy reaches `I` the whole decision point is reported as zeros.
    pub fn behavior(&self, profile: &MixedProfile) -> MmdResult<Vec<f64>> {
        let sequences = self.sequences()?;

        let local = self.local_positions();
        let counts: Vec<usize> = (0..NUM_PLAYERS).map(|p| self.player_infosets(p).len()).collect();

        for (strategy, _) in profile.iter() {
            if strategy.player >= NUM_PLAYERS || strategy.choices.len() != counts[strategy.player] {
                return Err(MmdError::DimensionMismatch {
                    expected: counts.get(strategy.player).copied().unwrap_or(0),
                    got: strategy.choices.len(),
                });
            }
        }

        let mut behavior = Vec::new();
        for i in self.row_order() {
            let info = &self.infosets[i];
            let mut numer = vec![0.0; info.actions.len()];
            let mut denom = 0.0;

            for (strategy, weight) in profile.iter().filter(|(s, _)| s.player == info.player) {
                let reaches = sequences[i]
                    .iter()
                    .all(|&(prior, action)| strategy.choices[local[prior]] == action);
                if !reaches {
                    continue;
                }
                let choice = strategy.choices[local[i]];
                if choice >= numer.len() {
                    return Err(MmdError::InvalidTree(format!(
                        "strategy {:?} leaves reachable decision point {} ({}) without an action",
                        strategy.choices, i, info.label
                    )));
                }
                denom += weight;
                numer[choice] += weight;
            }

            if denom > 0.0 {
                behavior.extend(numer.iter().map(|n| n / denom));
            } else {
                behavior.extend(std::iter::repeat(0.0).take(numer.len()));
            }
        }
        Ok(behavior)
    }

    pub fn legal_actions_mask(&self) -> Vec<Vec<bool>> {
        self.row_order()
            .into_iter()
            .map(|i| {
                let mut row = vec![false; self.num_actions];
                for &a in &self.infosets[i].actions {
                    row[a] = true;
                }
                row
            })
            .collect()
    }
}

fn invalid(msg: String) -> MmdError {
    MmdError::InvalidTree(msg)
}

fn check_node(game: &TreeGame, node: &Node) -> MmdResult<()> {
    match node {
        Node::Terminal { payoffs } => {
            if (payoffs[0] + payoffs[1]).abs() > PROB_EPS {
                return Err(invalid(format!("terminal payoffs {:?} are not zero-sum", payoffs)));
            }
            Ok(())
        }
        Node::Chance { outcomes } => {
            if outcomes.is_empty() {
                return Err(invalid("chance node without outcomes".to_string()));
            }
            if outcomes.iter().any(|(p, _)| *p < 0.0) {
                return Err(invalid("negative chance probability".to_string()));
            }
            let total: f64 = outcomes.iter().map(|(p, _)| p).sum();
            if (total - 1.0).abs() > PROB_EPS {
                return Err(invalid(format!("chance probabilities sum to {}", total)));
            }
            outcomes.iter().try_for_each(|(_, child)| check_node(game, child))
        }
        Node::Decision { infoset, children } => {
            let info = game
                .infosets
                .get(*infoset)
                .ok_or_else(|| invalid(format!("unknown infoset {}", infoset)))?;
            if children.len() != info.actions.len() {
                return Err(invalid(format!(
                    "infoset {} ({}) has {} actions but node has {} children",
                    infoset,
                    info.label,
                    info.actions.len(),
                    children.len()
                )));
            }
            children.iter().try_for_each(|child| check_node(game, child))
        }
    }
}

fn collect_sequences(
    game: &TreeGame,
    node: &Node,
    paths: &mut [Sequence; NUM_PLAYERS],
    seen: &mut [Option<Sequence>],
) -> MmdResult<()> {
    match node {
        Node::Terminal { .. } => Ok(()),
        Node::Chance { outcomes } => outcomes
            .iter()
            .try_for_each(|(_, child)| collect_sequences(game, child, paths, seen)),
        Node::Decision { infoset, children } => {
            let player = game.infosets[*infoset].player;
            match &seen[*infoset] {
                Some(seq) if *seq != paths[player] => {
                    return Err(invalid(format!(
                        "infoset {} ({}) violates perfect recall",
                        infoset, game.infosets[*infoset].label
                    )));
                }
                Some(_) => {}
                None => seen[*infoset] = Some(paths[player].clone()),
            }
            for (k, child) in children.iter().enumerate() {
                paths[player].push((*infoset, k));
                collect_sequences(game, child, paths, seen)?;
                paths[player].pop();
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Building trees
// ---------------------------------------------------------------------------

/// Registers decision points by label, in first-seen order.
#[derive(Default)]
struct TreeBuilder {
    infosets: Vec<InfoSet>,
    index: HashMap<String, usize>,
}

impl TreeBuilder {
    fn infoset(&mut self, player: usize, label: String, actions: Vec<usize>) -> usize {
        if let Some(&i) = self.index.get(&label) {
            return i;
        }
        let i = self.infosets.len();
        self.index.insert(label.clone(), i);
        self.infosets.push(InfoSet { player, label, actions });
        i
    }
}

const KUHN_PASS: usize = 0;
const KUHN_BET: usize = 1;

/// Three-card Kuhn poker: J/Q/K, ante 1, one bet of 1.
pub fn kuhn_poker() -> TreeGame {
    let mut builder = TreeBuilder::default();
    let mut outcomes = Vec::new();
    for c0 in 0..3 {
        for c1 in (0..3).filter(|&c| c != c0) {
            outcomes.push((1.0 / 6.0, kuhn_subtree(&mut builder, [c0, c1], "")));
        }
    }
    TreeGame {
        name: "kuhn_poker".to_string(),
        num_actions: 2,
        infosets: builder.infosets,
        root: Node::Chance { outcomes },
    }
}

fn kuhn_subtree(builder: &mut TreeBuilder, cards: [usize; 2], history: &str) -> Node {
    let showdown = |stake: f64| {
        if cards[0] > cards[1] {
            [stake, -stake]
        } else {
            [-stake, stake]
        }
    };
    let payoffs = match history {
        "pp" => Some(showdown(1.0)),
        "pbb" | "bb" => Some(showdown(2.0)),
        "pbp" => Some([-1.0, 1.0]),
        "bp" => Some([1.0, -1.0]),
        _ => None,
    };
    if let Some(payoffs) = payoffs {
        return Node::Terminal { payoffs };
    }

    let player = history.len() % 2;
    let infoset = builder.infoset(
        player,
        format!("{}{}", cards[player], history),
        vec![KUHN_PASS, KUHN_BET],
    );
    let children = ["p", "b"]
        .iter()
        .map(|a| kuhn_subtree(builder, cards, &format!("{}{}", history, a)))
        .collect();
    Node::Decision { infoset, children }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Game engine over `TreeGame`s, resolved per game and kept in memory.
pub struct TreeEngine {
    game_dir: PathBuf,
    loaded: Mutex<HashMap<GameKind, Arc<TreeGame>>>,
}

impl TreeEngine {
    pub fn new(paths: &Paths) -> Self {
        TreeEngine {
            game_dir: paths.game_dir(),
            loaded: Mutex::new(HashMap::new()),
        }
    }

    pub fn tree_path(&self, game: GameKind) -> MmdResult<PathBuf> {
        let file = game.reference_game_file().ok_or(MmdError::NoReference(game))?;
        Ok(self.game_dir.join(format!("{}.json", file)))
    }

    /// Tree file from the data directory, falling back to the built-in tree
    /// for Kuhn poker.
    pub fn load(&self, game: GameKind) -> MmdResult<Arc<TreeGame>> {
        let mut loaded = self
            .loaded
            .lock()
            .map_err(|_| MmdError::Pool("game cache lock poisoned".to_string()))?;
        if let Some(tree) = loaded.get(&game) {
            return Ok(Arc::clone(tree));
        }

        let path = self.tree_path(game)?;
        let tree = if !path.exists() && game == GameKind::Kuhn {
            kuhn_poker()
        } else {
            TreeGame::load(&path)?
        };
        log::debug!(
            "{} ({}): loaded tree with {} decision points",
            game,
            game.engine_string(),
            tree.infosets.len()
        );

        let tree = Arc::new(tree);
        loaded.insert(game, Arc::clone(&tree));
        Ok(tree)
    }
}

impl GameEngine for TreeEngine {
    fn pure_strategies(&self, game: GameKind) -> MmdResult<Vec<StrategyId>> {
        Ok(self.load(game)?.pure_strategies())
    }

    fn mixed_to_behavior(&self, game: GameKind, profile: &MixedProfile) -> MmdResult<Vec<f64>> {
        self.load(game)?.behavior(profile)
    }

    fn legal_actions_mask(&self, game: GameKind) -> MmdResult<Vec<Vec<bool>>> {
        Ok(self.load(game)?.legal_actions_mask())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
