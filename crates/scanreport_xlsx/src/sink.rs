//! Workbook sinks: the cell-level encoder seam used by the report writer.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet, XlsxError};

use crate::conf::N_ROW_HEADER;
use crate::spec::{
    EnumAutofitColumnsRule, EnumCellValue, ReportError, SpecAutofitCellsPolicy, SpecCellCoordinate,
    SpecCellFormat, SpecReportOptions,
};
use crate::util::{cast_col_num, cast_row_num, estimate_unicode_string_width, sanitize_sheet_name};

/// Cell-level workbook encoder.
///
/// Coordinates are 1-based. The export pipeline calls [`SheetSink::close`]
/// exactly once on every path after the sink was created, including failed
/// header writes and failed saves.
pub trait SheetSink {
    /// Write one value at `coordinate`.
    fn set_cell(
        &mut self,
        sheet_name: &str,
        coordinate: &SpecCellCoordinate,
        value: &EnumCellValue,
    ) -> Result<(), ReportError>;

    /// Write `values` left to right starting at `coordinate_start`.
    fn set_row(
        &mut self,
        sheet_name: &str,
        coordinate_start: &SpecCellCoordinate,
        values: &[EnumCellValue],
    ) -> Result<(), ReportError>;

    /// Persist the workbook to `path`.
    fn save_as(&mut self, path: &Path) -> Result<(), ReportError>;

    /// Release the workbook. Idempotent.
    fn close(&mut self) -> Result<(), ReportError>;
}

////////////////////////////////////////////////////////////////////////////////
// #region XlsxSheetSink

/// [`SheetSink`] backed by an in-memory `rust_xlsxwriter` workbook with one sheet.
pub struct XlsxSheetSink {
    workbook: Workbook,
    sheet_name: String,
    fmt_header: Format,
    fmt_body: Format,
    policy_autofit: SpecAutofitCellsPolicy,
    l_width_by_col_header: Vec<usize>,
    l_width_by_col_body: Vec<usize>,
    n_rows_seen_body: usize,
    if_closed: bool,
}

impl XlsxSheetSink {
    /// Create a workbook holding the configured sheet.
    pub fn new(options: &SpecReportOptions) -> Result<Self, ReportError> {
        let sheet_name = sanitize_sheet_name(&options.sheet_name, "_");
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet_name).map_err(derive_xlsx_error)?;
        if options.if_freeze_header {
            worksheet
                .set_freeze_panes(cast_row_num(N_ROW_HEADER + 1)?, 0)
                .map_err(derive_xlsx_error)?;
        }

        Ok(Self {
            workbook,
            sheet_name,
            fmt_header: derive_rust_xlsx_format(&options.fmt_header),
            fmt_body: derive_rust_xlsx_format(&options.fmt_body),
            policy_autofit: options.policy_autofit.clone(),
            l_width_by_col_header: Vec::new(),
            l_width_by_col_body: Vec::new(),
            n_rows_seen_body: 0,
            if_closed: false,
        })
    }

    /// Name of the single worksheet.
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    fn worksheet(&mut self, sheet_name: &str) -> Result<&mut Worksheet, ReportError> {
        if self.if_closed {
            return Err(ReportError::Workbook(
                "Cannot write after close().".to_string(),
            ));
        }
        self.workbook
            .worksheet_from_name(sheet_name)
            .map_err(derive_xlsx_error)
    }

    fn record_width(&mut self, coordinate: &SpecCellCoordinate, value: &EnumCellValue) {
        let n_idx_col = coordinate.col.saturating_sub(1);
        let n_width = estimate_unicode_string_width(&value.to_display_text());
        let l_widths = if coordinate.row == N_ROW_HEADER {
            &mut self.l_width_by_col_header
        } else {
            &mut self.l_width_by_col_body
        };
        if l_widths.len() <= n_idx_col {
            l_widths.resize(n_idx_col + 1, 0);
        }
        l_widths[n_idx_col] = usize::max(l_widths[n_idx_col], n_width);
    }

    fn is_body_width_sampled(&self) -> bool {
        matches!(
            self.policy_autofit.rule_columns,
            EnumAutofitColumnsRule::Body | EnumAutofitColumnsRule::All
        ) && self
            .policy_autofit
            .height_body_inferred_max
            .is_none_or(|n_max| self.n_rows_seen_body < n_max)
    }

    fn apply_autofit(&mut self) -> Result<(), ReportError> {
        let policy = self.policy_autofit.clone();
        if matches!(policy.rule_columns, EnumAutofitColumnsRule::None) {
            return Ok(());
        }

        let n_min = usize::max(1, policy.width_cell_min);
        let n_max = usize::min(255, usize::max(n_min, policy.width_cell_max));
        let n_cols = usize::max(
            self.l_width_by_col_header.len(),
            self.l_width_by_col_body.len(),
        );
        let l_widths_final: Vec<usize> = (0..n_cols)
            .map(|n_idx_col| {
                let n_header = self.l_width_by_col_header.get(n_idx_col).copied().unwrap_or(0);
                let n_body = self.l_width_by_col_body.get(n_idx_col).copied().unwrap_or(0);
                let n_width_recorded = match policy.rule_columns {
                    EnumAutofitColumnsRule::Header | EnumAutofitColumnsRule::None => n_header,
                    EnumAutofitColumnsRule::Body => n_body,
                    EnumAutofitColumnsRule::All => usize::max(n_header, n_body),
                };
                usize::min(
                    n_max,
                    usize::max(n_min, n_width_recorded + policy.width_cell_padding),
                )
            })
            .collect();

        let sheet_name = self.sheet_name.clone();
        let worksheet = self.worksheet(&sheet_name)?;
        for (n_idx_col, n_width) in l_widths_final.into_iter().enumerate() {
            worksheet
                .set_column_width(cast_col_num(n_idx_col + 1)?, n_width as f64)
                .map_err(derive_xlsx_error)?;
        }
        Ok(())
    }
}

impl SheetSink for XlsxSheetSink {
    fn set_cell(
        &mut self,
        sheet_name: &str,
        coordinate: &SpecCellCoordinate,
        value: &EnumCellValue,
    ) -> Result<(), ReportError> {
        let format = if coordinate.row == N_ROW_HEADER {
            self.fmt_header.clone()
        } else {
            self.fmt_body.clone()
        };
        let worksheet = self.worksheet(sheet_name)?;
        write_cell_with_format(worksheet, coordinate.row, coordinate.col, value, &format)?;
        self.record_width(coordinate, value);
        Ok(())
    }

    fn set_row(
        &mut self,
        sheet_name: &str,
        coordinate_start: &SpecCellCoordinate,
        values: &[EnumCellValue],
    ) -> Result<(), ReportError> {
        let if_sample_width = self.is_body_width_sampled();
        let fmt_body = self.fmt_body.clone();
        let worksheet = self.worksheet(sheet_name)?;
        for (n_idx, value) in values.iter().enumerate() {
            write_cell_with_format(
                worksheet,
                coordinate_start.row,
                coordinate_start.col + n_idx,
                value,
                &fmt_body,
            )?;
        }

        if if_sample_width {
            for (n_idx, value) in values.iter().enumerate() {
                let coordinate = SpecCellCoordinate {
                    col: coordinate_start.col + n_idx,
                    row: coordinate_start.row,
                    name: String::new(),
                };
                self.record_width(&coordinate, value);
            }
            self.n_rows_seen_body += 1;
        }
        Ok(())
    }

    fn save_as(&mut self, path: &Path) -> Result<(), ReportError> {
        self.apply_autofit()?;
        self.workbook
            .save(path)
            .map_err(|err| ReportError::Persistence {
                path: path.to_path_buf(),
                message: err.to_string(),
            })
    }

    fn close(&mut self) -> Result<(), ReportError> {
        self.if_closed = true;
        Ok(())
    }
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row: usize,
    col: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), ReportError> {
    let n_row = cast_row_num(row)?;
    let n_col = cast_col_num(col)?;
    match value {
        EnumCellValue::None => {
            worksheet
                .write_blank(n_row, n_col, format)
                .map_err(derive_xlsx_error)?;
        }
        EnumCellValue::String(val) => {
            worksheet
                .write_string_with_format(n_row, n_col, val, format)
                .map_err(derive_xlsx_error)?;
        }
        EnumCellValue::Number(val) => {
            worksheet
                .write_number_with_format(n_row, n_col, *val, format)
                .map_err(derive_xlsx_error)?;
        }
        EnumCellValue::Boolean(val) => {
            worksheet
                .write_boolean_with_format(n_row, n_col, *val, format)
                .map_err(derive_xlsx_error)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();
    if let Some(c_font) = &spec.font_name {
        format = format.set_font_name(c_font.as_str());
    }
    if let Some(n_size) = spec.font_size {
        format = format.set_font_size(n_size as f64);
    }
    if spec.bold == Some(true) {
        format = format.set_bold();
    }
    if spec.text_wrap == Some(true) {
        format = format.set_text_wrap();
    }
    if let Some(c_color) = &spec.font_color {
        format = format.set_font_color(c_color.as_str());
    }

    // Unknown alignment names leave the encoder default in place.
    let l_aligns = [
        spec.align.as_deref().and_then(parse_horizontal_align),
        spec.valign.as_deref().and_then(parse_vertical_align),
    ];
    for align in l_aligns.into_iter().flatten() {
        format = format.set_align(align);
    }
    format
}

fn parse_horizontal_align(name: &str) -> Option<FormatAlign> {
    match name.trim().to_ascii_lowercase().as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "justify" => Some(FormatAlign::Justify),
        _ => None,
    }
}

fn parse_vertical_align(name: &str) -> Option<FormatAlign> {
    match name.trim().to_ascii_lowercase().as_str() {
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn derive_xlsx_error(err: XlsxError) -> ReportError {
    ReportError::Workbook(err.to_string())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region MemorySheetSink

/// [`SheetSink`] keeping cells in memory; `save_as` writes the grid as JSON.
///
/// Useful for previews and for asserting on exact cell placement.
#[derive(Debug, Default, Clone)]
pub struct MemorySheetSink {
    dict_cells: BTreeMap<String, BTreeMap<(usize, usize), EnumCellValue>>,
    l_paths_saved: Vec<PathBuf>,
    if_closed: bool,
}

impl MemorySheetSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value at 1-based `(row, col)`.
    pub fn cell(&self, sheet_name: &str, row: usize, col: usize) -> Option<&EnumCellValue> {
        self.dict_cells
            .get(sheet_name)
            .and_then(|dict_sheet| dict_sheet.get(&(row, col)))
    }

    /// Highest written row, 0 when the sheet is empty.
    pub fn n_rows(&self, sheet_name: &str) -> usize {
        self.dict_cells
            .get(sheet_name)
            .and_then(|dict_sheet| dict_sheet.keys().map(|(n_row, _)| *n_row).max())
            .unwrap_or(0)
    }

    /// Row `row` as values from column 1 to the last written column.
    pub fn row_values(&self, sheet_name: &str, row: usize) -> Vec<EnumCellValue> {
        let Some(dict_sheet) = self.dict_cells.get(sheet_name) else {
            return vec![];
        };
        let n_cols = dict_sheet
            .range((row, 0)..=(row, usize::MAX))
            .map(|((_, n_col), _)| *n_col)
            .max()
            .unwrap_or(0);
        (1..=n_cols)
            .map(|n_col| {
                dict_sheet
                    .get(&(row, n_col))
                    .cloned()
                    .unwrap_or(EnumCellValue::None)
            })
            .collect()
    }

    /// Every row from 1 to [`Self::n_rows`].
    pub fn rows(&self, sheet_name: &str) -> Vec<Vec<EnumCellValue>> {
        (1..=self.n_rows(sheet_name))
            .map(|n_row| self.row_values(sheet_name, n_row))
            .collect()
    }

    /// Paths passed to successful `save_as` calls.
    pub fn paths_saved(&self) -> &[PathBuf] {
        &self.l_paths_saved
    }

    pub fn is_closed(&self) -> bool {
        self.if_closed
    }

    fn check_open(&self) -> Result<(), ReportError> {
        if self.if_closed {
            return Err(ReportError::Workbook(
                "Cannot write after close().".to_string(),
            ));
        }
        Ok(())
    }
}

impl SheetSink for MemorySheetSink {
    fn set_cell(
        &mut self,
        sheet_name: &str,
        coordinate: &SpecCellCoordinate,
        value: &EnumCellValue,
    ) -> Result<(), ReportError> {
        self.check_open()?;
        self.dict_cells
            .entry(sheet_name.to_string())
            .or_default()
            .insert((coordinate.row, coordinate.col), value.clone());
        Ok(())
    }

    fn set_row(
        &mut self,
        sheet_name: &str,
        coordinate_start: &SpecCellCoordinate,
        values: &[EnumCellValue],
    ) -> Result<(), ReportError> {
        self.check_open()?;
        let dict_sheet = self.dict_cells.entry(sheet_name.to_string()).or_default();
        for (n_idx, value) in values.iter().enumerate() {
            dict_sheet.insert(
                (coordinate_start.row, coordinate_start.col + n_idx),
                value.clone(),
            );
        }
        Ok(())
    }

    fn save_as(&mut self, path: &Path) -> Result<(), ReportError> {
        let dict_grid: BTreeMap<&str, Vec<Vec<EnumCellValue>>> = self
            .dict_cells
            .keys()
            .map(|c_sheet| (c_sheet.as_str(), self.rows(c_sheet)))
            .collect();
        let v_json = serde_json::to_vec_pretty(&dict_grid).map_err(|err| {
            ReportError::Persistence {
                path: path.to_path_buf(),
                message: err.to_string(),
            }
        })?;
        fs::write(path, v_json).map_err(|err| ReportError::Persistence {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        self.l_paths_saved.push(path.to_path_buf());
        Ok(())
    }

    fn close(&mut self) -> Result<(), ReportError> {
        self.if_closed = true;
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::derive_cell_coordinate;

    #[test]
    fn memory_sink_tracks_rows_and_gaps() {
        let mut sink = MemorySheetSink::new();
        sink.set_row(
            "Sheet1",
            &derive_cell_coordinate(1, 2).unwrap(),
            &[EnumCellValue::from("a"), EnumCellValue::Number(1.0)],
        )
        .unwrap();
        sink.set_cell(
            "Sheet1",
            &derive_cell_coordinate(3, 1).unwrap(),
            &EnumCellValue::from("h3"),
        )
        .unwrap();

        assert_eq!(sink.n_rows("Sheet1"), 2);
        assert_eq!(
            sink.row_values("Sheet1", 1),
            vec![
                EnumCellValue::None,
                EnumCellValue::None,
                EnumCellValue::from("h3")
            ]
        );
        assert_eq!(sink.cell("Sheet1", 2, 2), Some(&EnumCellValue::Number(1.0)));
        assert_eq!(sink.n_rows("Other"), 0);
    }

    #[test]
    fn memory_sink_rejects_writes_after_close() {
        let mut sink = MemorySheetSink::new();
        sink.close().unwrap();
        assert!(sink.is_closed());
        let err = sink
            .set_cell(
                "Sheet1",
                &derive_cell_coordinate(1, 1).unwrap(),
                &EnumCellValue::None,
            )
            .unwrap_err();
        assert!(matches!(err, ReportError::Workbook(_)));
    }

    #[test]
    fn memory_sink_saves_json_grid() {
        let dir = tempfile::tempdir().unwrap();
        let path_out = dir.path().join("grid.json");
        let mut sink = MemorySheetSink::new();
        sink.set_row(
            "Sheet1",
            &derive_cell_coordinate(1, 1).unwrap(),
            &[EnumCellValue::from("x"), EnumCellValue::Boolean(true)],
        )
        .unwrap();
        sink.save_as(&path_out).unwrap();

        let v_json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path_out).unwrap()).unwrap();
        assert_eq!(v_json, serde_json::json!({"Sheet1": [["x", true]]}));
        assert_eq!(sink.paths_saved(), &[path_out]);
    }

    #[test]
    fn xlsx_sink_writes_a_zip_container() {
        let dir = tempfile::tempdir().unwrap();
        let path_out = dir.path().join("out.xlsx");
        let options = SpecReportOptions {
            sheet_name: "Find/ings".to_string(),
            ..Default::default()
        };
        let mut sink = XlsxSheetSink::new(&options).unwrap();
        assert_eq!(sink.sheet_name(), "Find_ings");

        sink.set_cell(
            "Find_ings",
            &derive_cell_coordinate(1, 1).unwrap(),
            &EnumCellValue::from("cve_id"),
        )
        .unwrap();
        sink.set_row(
            "Find_ings",
            &derive_cell_coordinate(1, 2).unwrap(),
            &[
                EnumCellValue::from("CVE-1"),
                EnumCellValue::Number(2.5),
                EnumCellValue::Boolean(false),
                EnumCellValue::None,
            ],
        )
        .unwrap();
        sink.save_as(&path_out).unwrap();
        sink.close().unwrap();

        let v_bytes = std::fs::read(&path_out).unwrap();
        assert!(v_bytes.starts_with(b"PK"));
    }

    #[test]
    fn alignment_names_map_per_axis() {
        assert_eq!(parse_horizontal_align(" Center "), Some(FormatAlign::Center));
        assert_eq!(parse_horizontal_align("vcenter"), None);
        assert_eq!(parse_vertical_align("center"), Some(FormatAlign::VerticalCenter));
        assert_eq!(parse_vertical_align("left"), None);
    }

    #[test]
    fn xlsx_sink_rejects_unknown_sheet() {
        let mut sink = XlsxSheetSink::new(&SpecReportOptions::default()).unwrap();
        let err = sink
            .set_cell(
                "Missing",
                &derive_cell_coordinate(1, 1).unwrap(),
                &EnumCellValue::None,
            )
            .unwrap_err();
        assert!(matches!(err, ReportError::Workbook(_)));
    }
}
