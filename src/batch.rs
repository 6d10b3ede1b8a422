//! Parallel sweep runner: one cached solver run per (inverse alpha, iterations)
//! pair, fanned out over a fixed-width worker pool.
//!
//! Results come back in sweep order whatever order workers finish in. The first
//! failing point aborts the sweep; there is no partial result.

use std::time::Instant;

use colored::Colorize;
use rayon::prelude::*;

use crate::cache::{CacheKey, ExperimentCache, ResultStore};
use crate::config::{ExperimentConfig, ExperimentSpec, Paths};
use crate::display::sweep_table;
use crate::error::{MmdError, MmdResult};
use crate::plot::{plot_divergence, plot_gap};
use crate::record::SweepResults;
use crate::solver::{SolverLauncher, SolverRequest};

// ---------------------------------------------------------------------------
// Single sweep
// ---------------------------------------------------------------------------

pub fn run_sweep<S, L>(
    experiment: &ExperimentSpec,
    cores: usize,
    cache: &ExperimentCache<S>,
    launcher: &L,
) -> MmdResult<SweepResults>
where
    S: ResultStore,
    L: SolverLauncher,
{
    experiment.validate()?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cores.max(1))
        .build()
        .map_err(|e| MmdError::Pool(e.to_string()))?;

    let points = experiment.points();
    let records = pool.install(|| {
        points
            .par_iter()
            .map(|&(inverse_alpha, iterations)| {
                let key = CacheKey::new(experiment.game, inverse_alpha);
                let request = SolverRequest {
                    game: experiment.game,
                    inverse_alpha,
                    iterations,
                    load_qre: experiment.load_qre,
                    compute_gap: experiment.compute_gap,
                };
                cache.get_or_compute(&key, || launcher.launch(&request))
            })
            .collect::<MmdResult<Vec<_>>>()
    })?;

    Ok(SweepResults {
        game: experiment.game,
        records,
    })
}

/// Cached records of a sweep, without launching anything. Fails on the first
/// point that has not been computed.
pub fn collect_cached<S: ResultStore>(
    experiment: &ExperimentSpec,
    cache: &ExperimentCache<S>,
) -> MmdResult<SweepResults> {
    let records = experiment
        .inverse_alphas
        .iter()
        .map(|&inverse_alpha| {
            let key = CacheKey::new(experiment.game, inverse_alpha);
            cache.get(&key)?.ok_or_else(|| MmdError::NotFound {
                path: cache.store().location(&key).into(),
            })
        })
        .collect::<MmdResult<Vec<_>>>()?;
    Ok(SweepResults {
        game: experiment.game,
        records,
    })
}

// ---------------------------------------------------------------------------
// All experiments
// ---------------------------------------------------------------------------

/// Run every configured sweep, print its summary and render its plots.
pub fn run_experiments<S, L>(
    config: &ExperimentConfig,
    paths: &Paths,
    cores: usize,
    cache: &ExperimentCache<S>,
    launcher: &L,
) -> MmdResult<Vec<SweepResults>>
where
    S: ResultStore,
    L: SolverLauncher,
{
    config.validate()?;
    let batch_start = Instant::now();
    let mut all = Vec::with_capacity(config.experiments.len());

    for (i, experiment) in config.experiments.iter().enumerate() {
        println!();
        println!(
            "  [{}/{}] {} | 1/alpha {:?} | {} workers",
            i + 1,
            config.experiments.len(),
            experiment.game.display_name().bold(),
            experiment.inverse_alphas,
            cores,
        );

        let sweep_start = Instant::now();
        let sweep = run_sweep(experiment, cores, cache, launcher)?;
        println!("  done ({:.1}s)", sweep_start.elapsed().as_secs_f64());
        println!("{}", sweep_table(&sweep));

        render_plots(experiment, &sweep, paths)?;
        all.push(sweep);
    }

    println!();
    println!(
        "  {} Complete: {} sweeps, {:.1} min total",
        "MMD".bold(),
        all.len().to_string().bold(),
        batch_start.elapsed().as_secs_f64() / 60.0,
    );
    println!();
    Ok(all)
}

/// Render the charts an experiment asks for.
pub fn render_plots(
    experiment: &ExperimentSpec,
    sweep: &SweepResults,
    paths: &Paths,
) -> MmdResult<()> {
    if experiment.load_qre {
        if let Some(path) = plot_divergence(sweep, paths)? {
            println!("  Divergence plot: {}", path.display().to_string().dimmed());
        }
    }
    if experiment.compute_gap {
        if let Some(path) = plot_gap(sweep, paths)? {
            println!("  Gap plot: {}", path.display().to_string().dimmed());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
