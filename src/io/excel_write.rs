use std::path::Path;

use rust_xlsxwriter::Workbook;

use crate::error::Result;
use crate::model::{COLUMNS, USERS_SHEET, UserRecord};

/// Writes the user records to a single-sheet workbook at the given path,
/// overwriting any existing file. Header row first, one data row per user,
/// no index column.
pub fn write_records(path: &Path, records: &[UserRecord]) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(USERS_SHEET)?;

    for (col_idx, header) in COLUMNS.iter().enumerate() {
        worksheet.write_string(0, col_idx as u16, *header)?;
    }

    for (row_idx, record) in records.iter().enumerate() {
        for (col_idx, cell) in record.to_row().iter().enumerate() {
            worksheet.write_string((row_idx + 1) as u32, col_idx as u16, cell)?;
        }
    }

    let mut table = rust_xlsxwriter::Table::new();
    table.set_autofilter(true);
    let col_end = (COLUMNS.len() as u16).saturating_sub(1);
    let row_end = if records.is_empty() {
        0
    } else {
        records.len() as u32
    };
    worksheet.add_table(0, 0, row_end, col_end, &table)?;

    workbook.save(path)?;
    Ok(())
}
