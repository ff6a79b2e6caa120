//! One-shot and offline commands.

use crate::config::Settings;
use crate::export::export_table_csv;
use crate::turn::{run_turn, TurnOutcome};
use anyhow::Context;
use edx_chart::select;
use edx_core::extract::extract;
use edx_core::intent::QueryIntent;
use edx_core::table::ValueTable;
use edx_data::normalize::normalize;
use log::info;
use std::path::Path;

/// Run one turn against the hosted services and print the result.
pub async fn run_ask(
    settings: &Settings,
    query: &str,
    no_map: bool,
    table_csv: Option<&Path>,
) -> anyhow::Result<()> {
    let collaborators = settings.collaborators(!no_map)?;
    let outcome = run_turn(query, &collaborators).await;
    print_outcome(&outcome)?;
    if let (TurnOutcome::Answered(answer), Some(path)) = (&outcome, table_csv) {
        export_table_csv(&answer.table, path)?;
    }
    Ok(())
}

pub fn run_parse(query: &str) -> anyhow::Result<()> {
    let intent = QueryIntent::parse(query);
    println!("{}", serde_json::to_string_pretty(&intent)?);
    Ok(())
}

/// Extract, normalize and chart a saved values reply without any network call.
pub fn run_extract(query: &str, reply_file: &Path, table_csv: Option<&Path>) -> anyhow::Result<()> {
    let intent = QueryIntent::parse(query);
    if intent.has_no_states() {
        anyhow::bail!(crate::turn::MISSING_STATE);
    }
    let reply = std::fs::read_to_string(reply_file)
        .with_context(|| format!("Failed to read {}", reply_file.display()))?;

    let mut table = ValueTable::new(&intent);
    let applied = table.apply(&extract(&reply, &intent.metrics, &intent.states));
    info!("Applied {} values from {}", applied, reply_file.display());
    normalize(&mut table, intent.is_land_cover());

    print!("{}", table.to_grammar_text());
    let empty = table.empty_cells();
    if !empty.is_empty() {
        let cells: Vec<String> = empty.iter().map(|(s, y)| format!("{} {}", s, y)).collect();
        println!("No values for: {}", cells.join(", "));
    }
    let charts = select(&table, &intent, query);
    if charts.is_empty() {
        println!("{}", crate::turn::NO_VISUALIZATIONS);
    }
    for chart in &charts {
        println!("{}", chart.to_json()?);
    }
    if let Some(path) = table_csv {
        export_table_csv(&table, path)?;
    }
    Ok(())
}

pub fn print_outcome(outcome: &TurnOutcome) -> anyhow::Result<()> {
    match outcome {
        TurnOutcome::Rejected(message) | TurnOutcome::Failed(message) => println!("{}", message),
        TurnOutcome::Answered(answer) => {
            println!("{}", answer.report);
            for chart in &answer.charts {
                println!("{}", chart.to_json()?);
            }
            if let Some(notice) = &answer.notice {
                println!("{}", notice);
            }
            if let Some(map) = answer.map.describe() {
                println!("{}", map);
            }
        }
    }
    Ok(())
}
