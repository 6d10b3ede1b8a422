//! Reference solutions exported by the normal-form QRE solver.
//!
//! A reference file is a CSV trace of the QRE path; only its final line is the
//! solution. The first column of that line is a label (the lambda value on the
//! path) and the rest are pure-strategy weights in the engine's enumeration
//! order.

use std::path::{Path, PathBuf};

use crate::config::Paths;
use crate::error::{MmdError, MmdResult};
use crate::games::GameKind;

const REFERENCE_SUFFIX: &str = "_sf.csv";

/// File name of the reference solution for one sweep point,
/// e.g. `kuhn_poker10_sf.csv`.
pub fn reference_file_name(game: GameKind, inverse_alpha: u32) -> String {
    format!("{}{}{}", game.file_name(), inverse_alpha, REFERENCE_SUFFIX)
}

pub fn reference_path(paths: &Paths, game: GameKind, inverse_alpha: u32) -> PathBuf {
    paths.reference_dir().join(reference_file_name(game, inverse_alpha))
}

/// Recover the game and alpha a reference file was solved for.
pub fn parse_reference_filename(name: &str) -> Option<(GameKind, f64)> {
    let stem = name.strip_suffix(REFERENCE_SUFFIX)?;
    GameKind::ALL.into_iter().find_map(|game| {
        let inverse_alpha: f64 = stem.strip_prefix(game.file_name())?.parse().ok()?;
        if inverse_alpha > 0.0 {
            Some((game, 1.0 / inverse_alpha))
        } else {
            None
        }
    })
}

/// Parse the normal-form strategy stored on the last line of `path`.
pub fn read_normal_form_strategy(path: &Path) -> MmdResult<Vec<f64>> {
    if !path.exists() {
        return Err(MmdError::NotFound { path: path.to_path_buf() });
    }
    let contents = std::fs::read_to_string(path)?;
    parse_last_line(&contents).map_err(|detail| MmdError::MalformedData {
        path: path.to_path_buf(),
        detail,
    })
}

fn parse_last_line(contents: &str) -> Result<Vec<f64>, String> {
    let last_line = contents
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| "file has no data line".to_string())?;

    last_line
        .split(',')
        .skip(1)
        .enumerate()
        .map(|(i, field)| {
            let weight = field
                .trim()
                .parse::<f64>()
                .map_err(|e| format!("field {} ({:?}): {}", i + 1, field, e))?;
            if !weight.is_finite() || weight < 0.0 {
                return Err(format!("field {} ({:?}) is not a probability weight", i + 1, field));
            }
            Ok(weight)
        })
        .collect()
}

/// Load the reference normal-form strategy for one sweep point.
pub fn load_reference_strategy(
    paths: &Paths,
    game: GameKind,
    inverse_alpha: u32,
) -> MmdResult<Vec<f64>> {
    let path = reference_path(paths, game, inverse_alpha);
    log::debug!("reading reference solution {}", path.display());
    read_normal_form_strategy(&path)
}

/// Reference files present in the data directory, sorted by name.
pub fn list_references(paths: &Paths) -> MmdResult<Vec<(String, GameKind, f64)>> {
    let dir = paths.reference_dir();
    if !dir.exists() {
        return Err(MmdError::NotFound { path: dir });
    }
    let mut found = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if let Some((game, alpha)) = parse_reference_filename(&name) {
            found.push((name, game, alpha));
        }
    }
    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
