use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use crate::games::GameKind;
use crate::policy::TabularPolicy;
use crate::record::SweepResults;

fn fmt_metric(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.3e}", v),
        None => "-".dimmed().to_string(),
    }
}

/// Summary of a sweep: one row per inverse alpha.
pub fn sweep_table(sweep: &SweepResults) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("1/α".bold().to_string()),
        Cell::new("α").set_alignment(CellAlignment::Right),
        Cell::new("Iterations").set_alignment(CellAlignment::Right),
        Cell::new("Divergence").set_alignment(CellAlignment::Right),
        Cell::new("Gap").set_alignment(CellAlignment::Right),
    ]);

    for record in &sweep.records {
        table.add_row(vec![
            Cell::new(record.inverse_alpha.to_string()),
            Cell::new(format!("{:.3}", record.alpha)).set_alignment(CellAlignment::Right),
            Cell::new(record.iterations().to_string()).set_alignment(CellAlignment::Right),
            Cell::new(fmt_metric(record.final_divergence())).set_alignment(CellAlignment::Right),
            Cell::new(fmt_metric(record.final_gap())).set_alignment(CellAlignment::Right),
        ]);
    }

    format!("  {}\n{}", sweep.game.display_name().bold(), table)
}

/// Tabular policy with illegal cells dimmed and unreached rows flagged.
pub fn policy_table(game: GameKind, policy: &TabularPolicy) -> String {
    let width = policy
        .legal_actions_mask
        .iter()
        .map(|row| row.len())
        .max()
        .unwrap_or(0);
    let degenerate = policy.degenerate_rows();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    let mut header = vec![Cell::new("Row")];
    for a in 0..width {
        header.push(Cell::new(format!("a{}", a)).set_alignment(CellAlignment::Center));
    }
    table.set_header(header);

    for (i, (mask, probs)) in policy
        .legal_actions_mask
        .iter()
        .zip(&policy.action_probabilities)
        .enumerate()
    {
        let label = if degenerate.contains(&i) {
            format!("{} (unreached)", i).dimmed().to_string()
        } else {
            i.to_string()
        };
        let mut row = vec![Cell::new(label)];
        for (&legal, &p) in mask.iter().zip(probs) {
            let cell = if !legal {
                "·".dimmed().to_string()
            } else if p > 0.7 {
                format!("{:.4}", p).green().to_string()
            } else if p > 0.3 {
                format!("{:.4}", p).yellow().to_string()
            } else {
                format!("{:.4}", p)
            };
            row.push(Cell::new(cell).set_alignment(CellAlignment::Right));
        }
        table.add_row(row);
    }

    format!("  {} reference policy\n{}", game.display_name().bold(), table)
}

pub fn references_table(references: &[(String, GameKind, f64)]) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("File"),
        Cell::new("Game"),
        Cell::new("α").set_alignment(CellAlignment::Right),
    ]);
    for (name, game, alpha) in references {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(game.display_name()),
            Cell::new(format!("{:.3}", alpha)).set_alignment(CellAlignment::Right),
        ]);
    }
    table.to_string()
}

pub fn print_section(title: &str, content: &str) {
    println!("\n{}", title.cyan().bold());
    println!("  {}", content);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}

pub fn print_success(msg: &str) {
    println!("{}", msg.green().bold());
}
