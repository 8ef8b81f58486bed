//! Report constants, column schemas and default preset factories.

use crate::spec::{
    EnumScanType, SpecAutofitCellsPolicy, SpecCellFormat, SpecColumnSchema, SpecReportOptions,
};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// 1-based header row.
pub const N_ROW_HEADER: usize = 1;
/// 1-based first data row.
pub const N_ROW_DATA_START: usize = 2;

/// Sheet every exporter writes to.
pub const C_SHEET_NAME_DEFAULT: &str = "Sheet1";
/// Artifact file name prefix (`report-<random>-<scan_type>.xlsx`).
pub const C_REPORT_FILE_PREFIX: &str = "report-";
/// Artifact file extension.
pub const C_REPORT_FILE_EXT: &str = "xlsx";

////////////////////////////////////////////////////////////////////////////////
// #region ColumnSchemas

pub static TUP_COLUMNS_VULNERABILITY: [&str; 17] = [
    "@timestamp",
    "cve_attack_vector",
    "cve_caused_by_package",
    "cve_container_image",
    "scan_id",
    "cve_container_image_id",
    "cve_cvss_score",
    "cve_description",
    "cve_fixed_in",
    "cve_id",
    "cve_link",
    "cve_severity",
    "cve_overall_score",
    "cve_type",
    "host",
    "host_name",
    "masked",
];

pub static TUP_COLUMNS_SECRET: [&str; 9] = [
    "Filename",
    "Content",
    "Name",
    "Rule",
    "Severity",
    "Node Name",
    "Container Name",
    "Kubernetes Cluster Name",
    "Signature",
];

pub static TUP_COLUMNS_MALWARE: [&str; 11] = [
    "Rule Name",
    "Severity",
    "Meta",
    "Meta Rules",
    "File Severity Score",
    "File Severity",
    "Summary",
    "Node Name",
    "Container Name",
    "Kubernetes Cluster Name",
    "NodeType",
];

/// Shared by compliance and cloud compliance exports.
pub static TUP_COLUMNS_COMPLIANCE: [&str; 15] = [
    "@timestamp",
    "compliance_check_type",
    "count",
    "doc_id",
    "host",
    "host_name",
    "masked",
    "node_id",
    "node_name",
    "node_type",
    "status",
    "test_category",
    "test_desc",
    "test_info",
    "test_number",
];

pub static SCHEMA_VULNERABILITY: SpecColumnSchema = SpecColumnSchema {
    name: "vulnerability",
    columns: &TUP_COLUMNS_VULNERABILITY,
};

pub static SCHEMA_SECRET: SpecColumnSchema = SpecColumnSchema {
    name: "secret",
    columns: &TUP_COLUMNS_SECRET,
};

pub static SCHEMA_MALWARE: SpecColumnSchema = SpecColumnSchema {
    name: "malware",
    columns: &TUP_COLUMNS_MALWARE,
};

pub static SCHEMA_COMPLIANCE: SpecColumnSchema = SpecColumnSchema {
    name: "compliance",
    columns: &TUP_COLUMNS_COMPLIANCE,
};

/// Cloud compliance records differ in shape but keep the compliance header.
pub static SCHEMA_CLOUD_COMPLIANCE: SpecColumnSchema = SpecColumnSchema {
    name: "cloud_compliance",
    columns: &TUP_COLUMNS_COMPLIANCE,
};

/// Look up the column schema of a scan type.
pub fn select_column_schema(scan_type: EnumScanType) -> &'static SpecColumnSchema {
    match scan_type {
        EnumScanType::Vulnerability => &SCHEMA_VULNERABILITY,
        EnumScanType::Secret => &SCHEMA_SECRET,
        EnumScanType::Malware => &SCHEMA_MALWARE,
        EnumScanType::Compliance => &SCHEMA_COMPLIANCE,
        EnumScanType::CloudCompliance => &SCHEMA_CLOUD_COMPLIANCE,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Presets

/// Default header row format.
pub fn derive_default_header_format() -> SpecCellFormat {
    derive_default_body_format().with_(SpecCellFormat {
        bold: Some(true),
        align: Some("center".to_string()),
        ..Default::default()
    })
}

/// Default data row format.
pub fn derive_default_body_format() -> SpecCellFormat {
    SpecCellFormat {
        font_name: Some("Calibri".to_string()),
        font_size: Some(11),
        align: Some("left".to_string()),
        valign: Some("vcenter".to_string()),
        ..Default::default()
    }
}

/// Build default export options.
pub fn derive_default_report_options() -> SpecReportOptions {
    SpecReportOptions {
        sheet_name: C_SHEET_NAME_DEFAULT.to_string(),
        dir_temp: None,
        n_rows_max: N_NROWS_EXCEL_MAX,
        fmt_header: derive_default_header_format(),
        fmt_body: derive_default_body_format(),
        policy_autofit: SpecAutofitCellsPolicy::default(),
        rule_row_layout: None,
        if_freeze_header: true,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
