//! Worksheet writer: header, node-grouped row streaming and persistence.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use crate::conf::C_REPORT_FILE_PREFIX;
use crate::projection::ScanRecord;
use crate::report::{ReportExport, ReportExportBuilder};
use crate::sink::SheetSink;
use crate::source::ScanDataSource;
use crate::spec::{
    EnumScanType, ReportError, SpecColumnSchema, SpecNodeWiseScanData, SpecReportOptions,
    SpecReportParams,
};
use crate::util::{
    allocate_row_coordinate, derive_header_cells, derive_report_file_suffix, sanitize_sheet_name,
};

/// Export one scan type end to end.
///
/// 1. Fetch data; a failure aborts before any workbook exists.
/// 2. Create the sink through `create_sink`.
/// 3. Write header and rows via [`write_scan_rows`].
/// 4. Persist to a fresh `report-<random>-<scan_type>.xlsx` temp file.
/// 5. Close the sink. This runs on every exit path once the sink exists.
pub fn export_scan_report<R, S, K, F>(
    source: &S,
    params: &SpecReportParams,
    options: &SpecReportOptions,
    create_sink: F,
) -> Result<ReportExport, ReportError>
where
    R: ScanRecord,
    S: ScanDataSource + ?Sized,
    K: SheetSink,
    F: FnOnce(&SpecReportOptions) -> Result<K, ReportError>,
{
    options.validate()?;

    let data = R::fetch(source, params).map_err(|err| {
        tracing::error!(scan_type = %R::SCAN_TYPE, error = %err, "failed to get scan data");
        ReportError::Fetch {
            scan_type: R::SCAN_TYPE,
            source: err,
        }
    })?;

    let mut sink = create_sink(options)?;
    let result_written = write_and_persist(&data, &mut sink, options);
    let result_closed = sink.close();

    let (mut builder, path_file_out) = match result_written {
        Ok(written) => written,
        Err(err) => {
            if let Err(err_close) = result_closed {
                tracing::error!(error = %err_close, "failed to close workbook");
            }
            return Err(err);
        }
    };
    if let Err(err) = result_closed {
        tracing::error!(error = %err, "failed to close workbook");
        builder.add_warning(format!("Failed to close workbook: {err}"));
    }

    let report = builder.build(path_file_out);
    tracing::info!("{report}");
    Ok(report)
}

fn write_and_persist<R, K>(
    data: &SpecNodeWiseScanData<R>,
    sink: &mut K,
    options: &SpecReportOptions,
) -> Result<(ReportExportBuilder, PathBuf), ReportError>
where
    R: ScanRecord,
    K: SheetSink,
{
    let builder = write_scan_rows(data, sink, options)?;
    let path_file_out = persist_report(sink, R::SCAN_TYPE, options)?;
    Ok((builder, path_file_out))
}

/// Write the header and every record of `data` into `sink`.
///
/// Rows follow fetch order. Records whose coordinate cannot be allocated, or
/// whose row cannot be written, are logged and recorded as skipped; header
/// failures are fatal.
pub fn write_scan_rows<R, K>(
    data: &SpecNodeWiseScanData<R>,
    sink: &mut K,
    options: &SpecReportOptions,
) -> Result<ReportExportBuilder, ReportError>
where
    R: ScanRecord,
    K: SheetSink,
{
    let schema = R::schema();
    let sheet_name = sanitize_sheet_name(&options.sheet_name, "_");
    write_header(sink, &sheet_name, schema)?;

    let rule_row_layout = options
        .rule_row_layout
        .unwrap_or_else(|| R::SCAN_TYPE.row_layout());
    let mut builder = ReportExportBuilder::new(R::SCAN_TYPE, &sheet_name);
    let mut set_rows_written = BTreeSet::new();

    let mut n_offset = 0usize;
    for (idx_group, group) in data.scan_data.iter().enumerate() {
        builder.add_group();
        tracing::debug!(
            node_id = %group.scan_info.node_id,
            records = group.scan_results.len(),
            offset = n_offset,
            "writing node group"
        );

        for (idx_record, record) in group.scan_results.iter().enumerate() {
            builder.add_record();

            let coordinate = match allocate_row_coordinate(
                rule_row_layout,
                n_offset,
                idx_record,
                options.n_rows_max,
            ) {
                Ok(coordinate) => coordinate,
                Err(err) => {
                    tracing::warn!(
                        node_id = %group.scan_info.node_id,
                        idx_record,
                        error = %err,
                        "error generating cell name"
                    );
                    builder.add_skipped(
                        idx_group,
                        idx_record,
                        &group.scan_info.node_id,
                        err.to_string(),
                    );
                    continue;
                }
            };

            let l_values = record.project_row(&group.scan_info);
            if l_values.len() != schema.width() {
                let reason = format!(
                    "row has {} values, schema {:?} has {} columns",
                    l_values.len(),
                    schema.name,
                    schema.width()
                );
                tracing::warn!(node_id = %group.scan_info.node_id, idx_record, "{reason}");
                builder.add_skipped(idx_group, idx_record, &group.scan_info.node_id, reason);
                continue;
            }

            if let Err(err) = sink.set_row(&sheet_name, &coordinate, &l_values) {
                tracing::warn!(
                    node_id = %group.scan_info.node_id,
                    cell = %coordinate.name,
                    error = %err,
                    "failed to write row"
                );
                builder.add_skipped(
                    idx_group,
                    idx_record,
                    &group.scan_info.node_id,
                    err.to_string(),
                );
                continue;
            }

            if !set_rows_written.insert(coordinate.row) {
                builder.add_warning(format!(
                    "Row {} overwritten by node {:?} record {idx_record}.",
                    coordinate.row, group.scan_info.node_id
                ));
            }
            builder.add_written();
        }

        n_offset += group.scan_results.len();
    }

    Ok(builder)
}

fn write_header<K: SheetSink>(
    sink: &mut K,
    sheet_name: &str,
    schema: &SpecColumnSchema,
) -> Result<(), ReportError> {
    for (coordinate, c_label) in derive_header_cells(schema)? {
        sink.set_cell(sheet_name, &coordinate, &c_label.into())?;
    }
    Ok(())
}

/// Save `sink` into a new uniquely named file; the file is removed again if
/// saving fails.
fn persist_report<K: SheetSink>(
    sink: &mut K,
    scan_type: EnumScanType,
    options: &SpecReportOptions,
) -> Result<PathBuf, ReportError> {
    let path_dir_out = options.dir_temp.clone().unwrap_or_else(std::env::temp_dir);
    let c_suffix = derive_report_file_suffix(scan_type);

    let file_temp = tempfile::Builder::new()
        .prefix(C_REPORT_FILE_PREFIX)
        .suffix(&c_suffix)
        .tempfile_in(&path_dir_out)
        .map_err(|err| {
            tracing::error!(
                dir = %path_dir_out.display(),
                error = %err,
                "failed to create temp file"
            );
            ReportError::Persistence {
                path: path_dir_out.clone(),
                message: err.to_string(),
            }
        })?;
    let (_, path_file_out) = file_temp.keep().map_err(|err| ReportError::Persistence {
        path: err.file.path().to_path_buf(),
        message: err.error.to_string(),
    })?;

    if let Err(err) = sink.save_as(&path_file_out) {
        tracing::error!(path = %path_file_out.display(), error = %err, "failed to save xlsx file");
        if let Err(err_rm) = fs::remove_file(&path_file_out) {
            tracing::warn!(
                path = %path_file_out.display(),
                error = %err_rm,
                "failed to remove partial report"
            );
        }
        return Err(match err {
            ReportError::Persistence { .. } => err,
            other => ReportError::Persistence {
                path: path_file_out,
                message: other.to_string(),
            },
        });
    }

    Ok(path_file_out)
}
