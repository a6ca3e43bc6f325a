use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};

use crate::error::{Result, ToolError};
use crate::model::{Action, RowInput, USERS_SHEET, split_list};

/// Reads applier rows from a workbook following the conventions produced by
/// the [`excel_write`](crate::io::excel_write) module.
///
/// Columns are resolved by header name, so their order is not significant.
/// `UserName` is required; absent `Action`/`NewGroups`/`NewPolicies` columns
/// are tolerated and read as empty.
pub fn read_rows(path: &Path) -> Result<Vec<RowInput>> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = read_required_sheet(&mut workbook, USERS_SHEET)?;

    let mut row_iter = range.rows();
    let headers: Vec<String> = match row_iter.next() {
        Some(first_row) => first_row
            .iter()
            .map(|cell| cell_to_string(Some(cell)))
            .collect(),
        None => Vec::new(),
    };

    let column = |name: &str| headers.iter().position(|header| header == name);
    let user_col = column("UserName")
        .ok_or_else(|| ToolError::InvalidWorkbook("missing 'UserName' column".to_string()))?;
    let action_col = column("Action");
    let groups_col = column("NewGroups");
    let policies_col = column("NewPolicies");

    let cell = |row: &[DataType], index: Option<usize>| {
        index
            .map(|index| cell_to_string(row.get(index)))
            .unwrap_or_default()
    };

    let mut rows = Vec::new();
    for row in row_iter {
        let user_name = cell_to_string(row.get(user_col));
        if user_name.is_empty() {
            continue;
        }
        rows.push(RowInput {
            user_name,
            action: Action::parse(&cell(row, action_col)),
            new_groups: split_list(&cell(row, groups_col)),
            new_policies: split_list(&cell(row, policies_col)),
        });
    }
    Ok(rows)
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<calamine::Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| ToolError::InvalidWorkbook(format!("missing sheet '{name}'")))?;
    let range = range_result.map_err(ToolError::from)?;
    Ok(range)
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
