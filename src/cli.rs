use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

use crate::batch::{collect_cached, render_plots, run_experiments};
use crate::cache::{DiskStore, ExperimentCache};
use crate::config::{ExperimentConfig, Paths};
use crate::display::{
    policy_table, print_error, print_section, print_success, references_table, sweep_table,
};
use crate::equilibrium::{list_references, load_reference_strategy, reference_path};
use crate::error::{MmdError, MmdResult};
use crate::game_tree::TreeEngine;
use crate::games::GameKind;
use crate::policy::{convert, ROW_SUM_EPS};
use crate::solver::SubprocessLauncher;

#[derive(Parser)]
#[command(
    name = "mmd",
    version,
    about = "Regularization sweeps for MMD with dilated entropy, compared against normal-form QRE references."
)]
struct Cli {
    /// Root of the data directory (reference solutions, results, figures)
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,
    /// JSON experiment configuration (defaults to the built-in experiments)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every configured sweep, reusing cached results, then plot
    Run {
        /// Number of solver runs in flight at once
        #[arg(short, long, default_value = "1")]
        cores: usize,
    },
    /// Re-render plots from cached results only
    Plot,
    /// Convert a reference solution into a tabular behavioral policy
    Reference {
        /// Game the reference was solved for
        #[arg(short, long)]
        game: GameKind,
        /// Inverse of the regularization parameter
        #[arg(short, long)]
        inverse_alpha: u32,
        /// Write the policy as JSON instead of printing it
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// List reference solutions in the data directory
    References,
}

pub fn run() {
    let cli = Cli::parse();
    dispatch(cli);
}

pub fn run_with_args(args: Vec<String>) {
    let cli = Cli::parse_from(args);
    dispatch(cli);
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let config = ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    // A second initialisation (e.g. run_with_args in tests) keeps the first logger.
    let _ = TermLogger::init(level, config, TerminalMode::Mixed, ColorChoice::Auto);
}

fn dispatch(cli: Cli) {
    init_logger(cli.verbose);
    let paths = Paths::new(&cli.data_dir);

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Run { cores } => cmd_run(&config, &paths, cores),
        Commands::Plot => cmd_plot(&config, &paths),
        Commands::Reference {
            game,
            inverse_alpha,
            out,
        } => cmd_reference(&paths, game, inverse_alpha, out.as_deref()),
        Commands::References => cmd_references(&paths),
    });

    if let Err(e) = result {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> MmdResult<ExperimentConfig> {
    match path {
        Some(path) => ExperimentConfig::load(path),
        None => {
            let config = ExperimentConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn cmd_run(config: &ExperimentConfig, paths: &Paths, cores: usize) -> MmdResult<()> {
    if cores == 0 {
        return Err(MmdError::InvalidConfig("--cores must be at least 1".to_string()));
    }
    println!();
    println!(
        "  {} {} experiments | data: {} | solver: {}",
        "MMD".bold(),
        config.experiments.len(),
        paths.root.display(),
        config.solver.program,
    );

    let cache = ExperimentCache::new(DiskStore::new(paths));
    let launcher = SubprocessLauncher::new(config.solver.clone());
    run_experiments(config, paths, cores, &cache, &launcher)?;
    Ok(())
}

fn cmd_plot(config: &ExperimentConfig, paths: &Paths) -> MmdResult<()> {
    let cache = ExperimentCache::new(DiskStore::new(paths));
    for experiment in &config.experiments {
        let sweep = collect_cached(experiment, &cache)?;
        println!("{}", sweep_table(&sweep));
        render_plots(experiment, &sweep, paths)?;
    }
    Ok(())
}

fn cmd_reference(
    paths: &Paths,
    game: GameKind,
    inverse_alpha: u32,
    out: Option<&Path>,
) -> MmdResult<()> {
    let strategy = load_reference_strategy(paths, game, inverse_alpha)?;
    let engine = TreeEngine::new(paths);
    let policy = convert(&engine, game, &strategy)?;
    policy.check_rows(ROW_SUM_EPS)?;

    let unreached = policy.degenerate_rows();
    if !unreached.is_empty() {
        log::warn!(
            "{}: {} decision points unreached by the reference (rows {:?})",
            game,
            unreached.len(),
            unreached
        );
    }

    match out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_string(&policy)?)?;
            print_success(&format!(
                "Wrote {} x {} policy to {}",
                policy.num_rows(),
                policy.legal_actions_mask.first().map_or(0, |r| r.len()),
                path.display()
            ));
        }
        None => {
            print_section(
                "Reference",
                &reference_path(paths, game, inverse_alpha).display().to_string(),
            );
            println!("{}", policy_table(game, &policy));
        }
    }
    Ok(())
}

fn cmd_references(paths: &Paths) -> MmdResult<()> {
    let references = list_references(paths)?;
    if references.is_empty() {
        println!("  No reference solutions in {}", paths.reference_dir().display());
        return Ok(());
    }
    println!("{}", references_table(&references));
    Ok(())
}
