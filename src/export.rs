use std::{io::Write, path::Path};

use anyhow::{Context, Result};

use crate::{io_utils, validate::ValidatedRow};

/// Writes `rows` under the canonical `columns` header, cells rendered in
/// their coerced form. Returns the number of data rows written.
pub fn write_rows<W: Write>(
    writer: &mut csv::Writer<W>,
    columns: &[String],
    rows: &[&ValidatedRow],
) -> Result<usize> {
    writer
        .write_record(columns)
        .context("Writing export header")?;
    for row in rows {
        let record = row
            .cells
            .iter()
            .map(|cell| cell.as_ref().map(|value| value.as_display()).unwrap_or_default())
            .collect::<Vec<_>>();
        writer
            .write_record(&record)
            .with_context(|| format!("Writing source line {}", row.line))?;
    }
    writer.flush().context("Flushing export")?;
    Ok(rows.len())
}

pub fn export_to_path(
    path: Option<&Path>,
    delimiter: u8,
    columns: &[String],
    rows: &[&ValidatedRow],
) -> Result<usize> {
    let mut writer = io_utils::open_csv_writer(path, delimiter)?;
    write_rows(&mut writer, columns, rows)
}
