//! `scanreport_xlsx`:
//! XLSX export of node-grouped security scan results.
//!
//! Layout:
//! - `conf`       : Excel limits, column schemas and default presets
//! - `spec`       : request, record, option and error models
//! - `util`       : pure coordinate and naming helpers
//! - `projection` : per-scan-type record to row mapping
//! - `source`     : scan data source capability
//! - `sink`       : workbook encoders
//! - `writer`     : header/row streaming and artifact persistence
//! - `report`     : export outcome and builder
//! - `dispatch`   : scan type selection and public entry points
pub mod conf;
pub mod dispatch;
pub mod projection;
pub mod report;
pub mod sink;
pub mod source;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, SCHEMA_CLOUD_COMPLIANCE,
    SCHEMA_COMPLIANCE, SCHEMA_MALWARE, SCHEMA_SECRET, SCHEMA_VULNERABILITY, TUP_EXCEL_ILLEGAL,
    derive_default_report_options, select_column_schema,
};
pub use dispatch::{ReportGenerator, generate_report, generate_report_with_sink};
pub use projection::ScanRecord;
pub use report::{ReportExport, ReportExportBuilder, SpecSkippedRow};
pub use sink::{MemorySheetSink, SheetSink, XlsxSheetSink};
pub use source::{JsonDirDataSource, ScanDataSource};
pub use spec::{
    BoxError, EnumAutofitColumnsRule, EnumCellValue, EnumRowLayout, EnumScanType, ReportError,
    SpecAutofitCellsPolicy, SpecCellCoordinate, SpecCellFormat, SpecCloudCompliance,
    SpecColumnSchema, SpecCompliance, SpecMalware, SpecNodeScanGroup, SpecNodeWiseScanData,
    SpecReportFilters, SpecReportOptions, SpecReportParams, SpecScanInfo, SpecSecret,
    SpecVulnerability,
};
pub use util::{allocate_row_coordinate, derive_cell_name, derive_column_name, sanitize_sheet_name};
pub use writer::{export_scan_report, write_scan_rows};
