//! End-to-end runs of the `mmd` subcommands against a scratch data directory.

use mmd_sweep::cli::run_with_args;
use mmd_sweep::config::Paths;
use mmd_sweep::equilibrium::reference_path;
use mmd_sweep::games::GameKind;
use mmd_sweep::policy::{TabularPolicy, ROW_SUM_EPS};

fn args(list: &[&str]) -> Vec<String> {
    std::iter::once("mmd")
        .chain(list.iter().copied())
        .map(String::from)
        .collect()
}

#[test]
fn reference_command_writes_policy_json() {
    let root = std::env::temp_dir().join(format!("mmd_cli_reference_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&root);
    let paths = Paths::new(&root);
    std::fs::create_dir_all(paths.reference_dir()).unwrap();

    let mut weights = vec![(1.0 / 27.0).to_string(); 27];
    weights.extend(vec![(1.0 / 64.0).to_string(); 64]);
    std::fs::write(
        reference_path(&paths, GameKind::Kuhn, 5),
        format!("4.2,{}\n", weights.join(",")),
    )
    .unwrap();

    let out = root.join("policies").join("kuhn5.json");
    run_with_args(args(&[
        "--data-dir",
        root.to_str().unwrap(),
        "reference",
        "--game",
        "kuhn",
        "--inverse-alpha",
        "5",
        "--out",
        out.to_str().unwrap(),
    ]));

    let json = std::fs::read_to_string(&out).unwrap();
    let policy: TabularPolicy = serde_json::from_str(&json).unwrap();
    assert_eq!(policy.num_rows(), 12);
    assert!(policy.check_rows(ROW_SUM_EPS).is_ok());

    // Listing sees the same reference.
    run_with_args(args(&["--data-dir", root.to_str().unwrap(), "references"]));
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn plot_command_renders_cached_sweeps() {
    let root = std::env::temp_dir().join(format!("mmd_cli_plot_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&root);
    let results = root.join("mmd");
    std::fs::create_dir_all(&results).unwrap();

    for ia in [2, 10] {
        let record = format!(
            r#"{{"inverse_alpha": {}, "alpha": {}, "solutions": null, "divergences": [], "gap": [0.5, 0.1, 0.01]}}"#,
            ia,
            1.0 / ia as f64
        );
        std::fs::write(results.join(format!("leduc_poker%{}.json", ia)), record).unwrap();
    }
    let config = root.join("config.json");
    std::fs::write(
        &config,
        r#"{"experiments": [{"game": "leduc", "inverse_alphas": [2, 10], "iterations": [3, 3],
            "load_qre": false, "compute_gap": true}]}"#,
    )
    .unwrap();

    run_with_args(args(&[
        "--data-dir",
        root.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "plot",
    ]));
    assert!(root.join("figures").join("leduc_poker_gap.svg").exists());
    let _ = std::fs::remove_dir_all(&root);
}
