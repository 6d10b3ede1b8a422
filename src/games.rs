//! Supported games and the naming conventions every artifact derives from.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    #[value(name = "kuhn")]
    Kuhn,
    #[value(name = "dark_hex")]
    DarkHex,
    #[value(name = "leduc")]
    Leduc,
    #[value(name = "liars_dice")]
    LiarsDice,
}

impl GameKind {
    pub const ALL: [GameKind; 4] = [
        GameKind::Kuhn,
        GameKind::DarkHex,
        GameKind::Leduc,
        GameKind::LiarsDice,
    ];

    /// Key passed to the solver's `--game` flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::Kuhn => "kuhn",
            GameKind::DarkHex => "dark_hex",
            GameKind::Leduc => "leduc",
            GameKind::LiarsDice => "liars_dice",
        }
    }

    pub fn from_str(s: &str) -> Option<GameKind> {
        GameKind::ALL.into_iter().find(|g| g.as_str() == s)
    }

    /// Load string understood by the game engine.
    pub fn engine_string(&self) -> &'static str {
        match self {
            GameKind::Kuhn => "kuhn_poker",
            GameKind::DarkHex => "dark_hex(board_size=2,gameversion=adh)",
            GameKind::Leduc => "leduc_poker",
            GameKind::LiarsDice => "liars_dice(dice_sides=4)",
        }
    }

    /// Short name shared by reference files, result records and figures.
    pub fn file_name(&self) -> &'static str {
        match self {
            GameKind::Kuhn => "kuhn_poker",
            GameKind::DarkHex => "dark_hex",
            GameKind::Leduc => "leduc_poker",
            GameKind::LiarsDice => "liars_dice",
        }
    }

    /// Name of the game file the normal-form reference was solved on.
    /// `None` for games without a reference solution.
    pub fn reference_game_file(&self) -> Option<&'static str> {
        match self {
            GameKind::Kuhn => Some("kuhn_poker"),
            GameKind::DarkHex => Some("dark_hex(num_rows=2,num_cols=2,gameversion=adh)"),
            GameKind::Leduc | GameKind::LiarsDice => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            GameKind::Kuhn => "Kuhn Poker",
            GameKind::DarkHex => "Dark Hex",
            GameKind::Leduc => "Leduc Poker",
            GameKind::LiarsDice => "Liar's Dice",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
