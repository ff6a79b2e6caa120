//! CSV export of a finished value table.

use anyhow::Context;
use edx_core::table::ValueTable;
use edx_utils::fmt::three_decimals;
use log::info;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Write `state,year,<metric>...` rows, one per table cell.
pub fn write_table_csv<W: Write>(table: &ValueTable, writer: W) -> anyhow::Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut header = vec!["state".to_string(), "year".to_string()];
    header.extend(table.metrics().iter().map(|m| m.name().to_string()));
    wtr.write_record(&header)?;

    let mut rows = 0;
    for (state, year, values) in table.cells() {
        let mut record = vec![state.name().to_string(), year.to_string()];
        record.extend(values.iter().map(|v| three_decimals(*v)));
        wtr.write_record(&record)?;
        rows += 1;
    }
    wtr.flush()?;
    Ok(rows)
}

pub fn export_table_csv(table: &ValueTable, path: &Path) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let rows = write_table_csv(table, file)?;
    info!("Wrote {} rows to {}", rows, path.display());
    Ok(())
}
