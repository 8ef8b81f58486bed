//! Stateless helpers: coordinate allocation, naming and width estimation.

use crate::conf::{
    C_REPORT_FILE_EXT, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    N_ROW_DATA_START, N_ROW_HEADER, TUP_EXCEL_ILLEGAL,
};
use crate::spec::{EnumRowLayout, EnumScanType, ReportError, SpecCellCoordinate, SpecColumnSchema};

////////////////////////////////////////////////////////////////////////////////
// #region CoordinateAllocation

/// Convert a 1-based column index into its letter name (`1 -> A`, `27 -> AA`).
pub fn derive_column_name(col: usize) -> Result<String, ReportError> {
    if col == 0 || col > N_NCOLS_EXCEL_MAX {
        return Err(ReportError::CellAddress {
            col,
            row: 0,
            reason: format!("column must be within 1..={N_NCOLS_EXCEL_MAX}"),
        });
    }

    let mut l_chars = Vec::new();
    let mut n_rest = col;
    while n_rest > 0 {
        let n_rem = (n_rest - 1) % 26;
        l_chars.push((b'A' + n_rem as u8) as char);
        n_rest = (n_rest - 1) / 26;
    }
    Ok(l_chars.into_iter().rev().collect())
}

/// Convert 1-based `(col, row)` into an `A1`-style cell name.
pub fn derive_cell_name(col: usize, row: usize) -> Result<String, ReportError> {
    if row == 0 || row > N_NROWS_EXCEL_MAX {
        return Err(ReportError::CellAddress {
            col,
            row,
            reason: format!("row must be within 1..={N_NROWS_EXCEL_MAX}"),
        });
    }
    let c_col = derive_column_name(col).map_err(|_| ReportError::CellAddress {
        col,
        row,
        reason: format!("column must be within 1..={N_NCOLS_EXCEL_MAX}"),
    })?;
    Ok(format!("{c_col}{row}"))
}

/// Build a validated coordinate for 1-based `(col, row)`.
pub fn derive_cell_coordinate(col: usize, row: usize) -> Result<SpecCellCoordinate, ReportError> {
    let name = derive_cell_name(col, row)?;
    Ok(SpecCellCoordinate { col, row, name })
}

/// Allocate the first cell of the data row for record `idx_record` of a group.
///
/// `n_offset` is the number of records in all preceding groups and is ignored
/// for [`EnumRowLayout::GroupLocal`]. Rows beyond `n_rows_max` are rejected.
pub fn allocate_row_coordinate(
    rule_row_layout: EnumRowLayout,
    n_offset: usize,
    idx_record: usize,
    n_rows_max: usize,
) -> Result<SpecCellCoordinate, ReportError> {
    let n_row_local = idx_record.checked_add(N_ROW_DATA_START);
    let n_row = match rule_row_layout {
        EnumRowLayout::Stacked => n_row_local.and_then(|n| n.checked_add(n_offset)),
        EnumRowLayout::GroupLocal => n_row_local,
    }
    .ok_or_else(|| ReportError::CellAddress {
        col: 1,
        row: usize::MAX,
        reason: "row index overflow".to_string(),
    })?;

    if n_row > n_rows_max {
        return Err(ReportError::CellAddress {
            col: 1,
            row: n_row,
            reason: format!("row exceeds limit {n_rows_max}"),
        });
    }
    derive_cell_coordinate(1, n_row)
}

/// Header cells of `schema` as `(coordinate, label)` pairs on the header row.
pub fn derive_header_cells(
    schema: &SpecColumnSchema,
) -> Result<Vec<(SpecCellCoordinate, &'static str)>, ReportError> {
    schema
        .columns
        .iter()
        .enumerate()
        .map(|(n_idx, c_label)| Ok((derive_cell_coordinate(n_idx + 1, N_ROW_HEADER)?, *c_label)))
        .collect()
}

/// Convert 1-based row to the zero-based row number used by the encoder.
pub fn cast_row_num(row: usize) -> Result<u32, ReportError> {
    row.checked_sub(1)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| ReportError::CellAddress {
            col: 0,
            row,
            reason: "row index overflow".to_string(),
        })
}

/// Convert 1-based column to the zero-based column number used by the encoder.
pub fn cast_col_num(col: usize) -> Result<u16, ReportError> {
    col.checked_sub(1)
        .and_then(|n| u16::try_from(n).ok())
        .ok_or_else(|| ReportError::CellAddress {
            col,
            row: 0,
            reason: "column index overflow".to_string(),
        })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Naming

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Artifact file name suffix, e.g. `-vulnerability.xlsx`.
pub fn derive_report_file_suffix(scan_type: EnumScanType) -> String {
    format!("-{}.{C_REPORT_FILE_EXT}", scan_type.as_str())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Width

/// Estimate displayed width units of a text cell; non-ASCII counts wider.
pub fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
