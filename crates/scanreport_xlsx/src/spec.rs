//! Shared report specification models, options and top-level error types.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::conf::{N_NROWS_EXCEL_MAX, N_ROW_DATA_START, derive_default_report_options};

/// Boxed error returned by data-source implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

////////////////////////////////////////////////////////////////////////////////
// #region ScanTypes

/// Scan kinds that can be exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumScanType {
    /// CVE findings.
    Vulnerability,
    /// Leaked secret findings.
    Secret,
    /// Malware rule hits.
    Malware,
    /// Host/cluster compliance check outcomes.
    Compliance,
    /// Cloud account compliance check outcomes.
    CloudCompliance,
}

impl EnumScanType {
    /// Every exportable scan type, in dispatch order.
    pub const ALL: [EnumScanType; 5] = [
        EnumScanType::Vulnerability,
        EnumScanType::Secret,
        EnumScanType::Malware,
        EnumScanType::Compliance,
        EnumScanType::CloudCompliance,
    ];

    /// Stable snake_case identifier, also used in artifact names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vulnerability => "vulnerability",
            Self::Secret => "secret",
            Self::Malware => "malware",
            Self::Compliance => "compliance",
            Self::CloudCompliance => "cloud_compliance",
        }
    }

    /// Default row layout for this scan type.
    ///
    /// Cloud compliance rows restart at the first data row for every node
    /// group; all other types stack groups with a running offset.
    pub fn row_layout(&self) -> EnumRowLayout {
        match self {
            Self::CloudCompliance => EnumRowLayout::GroupLocal,
            _ => EnumRowLayout::Stacked,
        }
    }
}

impl fmt::Display for EnumScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnumScanType {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let c_norm = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match c_norm.as_str() {
            "vulnerability" => Ok(Self::Vulnerability),
            "secret" => Ok(Self::Secret),
            "malware" => Ok(Self::Malware),
            "compliance" => Ok(Self::Compliance),
            "cloud_compliance" | "cloudcompliance" => Ok(Self::CloudCompliance),
            _ => Err(ReportError::UnknownScanType(s.to_string())),
        }
    }
}

/// How the row of a record is derived from its group position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumRowLayout {
    /// `row = offset + idx + 2`; groups occupy contiguous, disjoint row ranges.
    #[default]
    Stacked,
    /// `row = idx + 2`; every group starts again at the first data row.
    GroupLocal,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportParams

/// Filters attached to a report request.
///
/// Only `scan_type` is interpreted by the export core; the remaining fields
/// are forwarded untouched to the data source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecReportFilters {
    /// Requested scan type (e.g. `"vulnerability"`).
    pub scan_type: String,
    /// Node types to include (`host`, `container`, `container_image`, ...).
    pub node_type: Vec<String>,
    /// Severities (or check types, for compliance) to include.
    pub severity_or_check_type: Vec<String>,
    /// Restrict to a single scan.
    pub scan_id: Option<String>,
    /// Include nodes that are no longer reporting.
    pub include_dead_nodes: bool,
    /// Only the most exploitable findings.
    pub most_exploitable_report: bool,
    /// Free-form field filters.
    pub advanced_report_filters: BTreeMap<String, Vec<String>>,
}

/// One report request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecReportParams {
    /// Caller-side report identifier.
    pub report_id: String,
    /// Requested artifact type.
    pub report_type: String,
    /// Lower bound of the scan time window (epoch ms, 0 = unbounded).
    pub from_timestamp: i64,
    /// Upper bound of the scan time window (epoch ms, 0 = unbounded).
    pub to_timestamp: i64,
    /// Report filters.
    pub filters: SpecReportFilters,
}

impl Default for SpecReportParams {
    fn default() -> Self {
        Self {
            report_id: String::new(),
            report_type: "xlsx".to_string(),
            from_timestamp: 0,
            to_timestamp: 0,
            filters: SpecReportFilters::default(),
        }
    }
}

impl SpecReportParams {
    /// Build params requesting `scan_type` with no other filters.
    pub fn for_scan_type(scan_type: impl Into<String>) -> Self {
        Self {
            filters: SpecReportFilters {
                scan_type: scan_type.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ScanData

/// Identifying metadata of one scanned node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecScanInfo {
    pub scan_id: String,
    pub node_id: String,
    pub node_name: String,
    pub host_name: String,
    pub container_name: String,
    pub kubernetes_cluster_name: String,
    pub node_type: String,
    /// Last update of the scan, epoch milliseconds.
    pub updated_at: i64,
}

/// All findings of one scan against one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecNodeScanGroup<R> {
    #[serde(default)]
    pub scan_info: SpecScanInfo,
    #[serde(default = "Vec::new")]
    pub scan_results: Vec<R>,
}

/// Node-grouped scan results as returned by a data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecNodeWiseScanData<R> {
    #[serde(default = "Vec::new")]
    pub scan_data: Vec<SpecNodeScanGroup<R>>,
}

impl<R> Default for SpecNodeWiseScanData<R> {
    fn default() -> Self {
        Self {
            scan_data: Vec::new(),
        }
    }
}

impl<R> SpecNodeWiseScanData<R> {
    /// Total number of finding records across all groups.
    pub fn cnt_records(&self) -> usize {
        self.scan_data
            .iter()
            .map(|group| group.scan_results.len())
            .sum()
    }

    /// `true` when there are no node groups at all.
    pub fn is_empty(&self) -> bool {
        self.scan_data.is_empty()
    }
}

/// One CVE finding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecVulnerability {
    pub cve_id: String,
    pub cve_severity: String,
    pub cve_cvss_score: f64,
    pub cve_overall_score: f64,
    pub cve_fixed_in: String,
    pub cve_description: String,
    pub cve_link: String,
    pub cve_attack_vector: String,
    pub cve_caused_by_package: String,
    pub cve_type: String,
    pub masked: bool,
}

/// One leaked-secret finding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecSecret {
    pub full_filename: String,
    pub matched_content: String,
    pub name: String,
    pub rule_id: String,
    /// Severity label.
    pub level: String,
    pub signature_to_match: String,
}

/// One malware rule hit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecMalware {
    pub rule_name: String,
    pub rule_id: String,
    pub severity_score: f64,
    pub file_sev_score: f64,
    pub file_severity: String,
    pub summary: String,
}

/// One host/cluster compliance check outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecCompliance {
    pub compliance_check_type: String,
    pub compliance_node_id: String,
    pub compliance_node_type: String,
    pub status: String,
    pub test_category: String,
    pub test_desc: String,
    pub test_info: String,
    pub test_number: String,
    pub masked: bool,
}

/// One cloud account compliance check outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecCloudCompliance {
    pub compliance_check_type: String,
    pub node_id: String,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub title: String,
    pub control_id: String,
    pub masked: bool,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellSpecification

/// Normalized cell value emitted by row projections.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EnumCellValue {
    /// Blank cell.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Boolean(bool),
}

impl EnumCellValue {
    /// Borrow the text of a string cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Display text used for width estimation.
    pub fn to_display_text(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::String(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<&String> for EnumCellValue {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<f64> for EnumCellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for EnumCellValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for EnumCellValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// 1-based worksheet coordinate with its `A1`-style name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecCellCoordinate {
    /// 1-based column index.
    pub col: usize,
    /// 1-based row index.
    pub row: usize,
    /// Cell name, e.g. `A2`.
    pub name: String,
}

/// Fixed ordered header of one scan type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecColumnSchema {
    /// Schema identifier.
    pub name: &'static str,
    /// Header labels in column order (column 1 first).
    pub columns: &'static [&'static str],
}

impl SpecColumnSchema {
    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Header label of 1-based column `col`.
    pub fn label(&self, col: usize) -> Option<&'static str> {
        col.checked_sub(1)
            .and_then(|n_idx| self.columns.get(n_idx))
            .copied()
    }

    /// 1-based column of header `label`.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c_col| *c_col == label)
            .map(|n_idx| n_idx + 1)
    }
}

/// Cell format specification, overlayable like the xlsxwriter property map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Horizontal alignment: general, left, center, right or justify.
    pub align: Option<String>,
    /// Vertical alignment: top, bottom or vcenter.
    pub valign: Option<String>,
    /// Text wrap.
    pub text_wrap: Option<bool>,
    /// Font color.
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            text_wrap: other.text_wrap.or(self.text_wrap),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportOptions

/// Autofit rule for column width inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumAutofitColumnsRule {
    /// Disable autofit.
    None,
    /// Infer width from header cells only (default).
    #[default]
    Header,
    /// Infer width from body cells only.
    Body,
    /// Infer width from both header and body cells.
    All,
}

/// Column autofit policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecAutofitCellsPolicy {
    /// Autofit width inference rule.
    pub rule_columns: EnumAutofitColumnsRule,
    /// Max body rows inspected when body-based inference is active.
    pub height_body_inferred_max: Option<usize>,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            rule_columns: EnumAutofitColumnsRule::Header,
            height_body_inferred_max: Some(20_000),
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Options for one export call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecReportOptions {
    /// Worksheet name shared by every exporter.
    pub sheet_name: String,
    /// Directory for artifacts; system temp dir when `None`.
    pub dir_temp: Option<PathBuf>,
    /// Highest row (1-based, header included) a record may be written to.
    pub n_rows_max: usize,
    /// Header row format.
    pub fmt_header: SpecCellFormat,
    /// Data row format.
    pub fmt_body: SpecCellFormat,
    /// Column autofit policy.
    pub policy_autofit: SpecAutofitCellsPolicy,
    /// Force a row layout for every scan type.
    pub rule_row_layout: Option<EnumRowLayout>,
    /// Freeze the header row.
    pub if_freeze_header: bool,
}

impl Default for SpecReportOptions {
    fn default() -> Self {
        derive_default_report_options()
    }
}

impl SpecReportOptions {
    /// Check option invariants before any work is done.
    pub fn validate(&self) -> Result<(), ReportError> {
        if self.sheet_name.trim().is_empty() {
            return Err(ReportError::InvalidOptions(
                "sheet_name must not be empty.".to_string(),
            ));
        }
        if self.n_rows_max < N_ROW_DATA_START {
            return Err(ReportError::InvalidOptions(format!(
                "n_rows_max must be >= {N_ROW_DATA_START}."
            )));
        }
        if self.n_rows_max > N_NROWS_EXCEL_MAX {
            return Err(ReportError::InvalidOptions(format!(
                "n_rows_max must be <= {N_NROWS_EXCEL_MAX}."
            )));
        }
        if self.policy_autofit.width_cell_min == 0 {
            return Err(ReportError::InvalidOptions(
                "policy_autofit.width_cell_min must be >= 1.".to_string(),
            ));
        }
        if self.policy_autofit.width_cell_max < self.policy_autofit.width_cell_min {
            return Err(ReportError::InvalidOptions(
                "policy_autofit.width_cell_max must be >= policy_autofit.width_cell_min."
                    .to_string(),
            ));
        }
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Export failures.
///
/// `CellAddress` is only fatal when returned directly from the coordinate
/// helpers; inside the writer it is recorded as a skipped row.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Unknown scan type: {0:?}")]
    UnknownScanType(String),

    #[error("Failed to fetch {scan_type} data: {source}")]
    Fetch {
        scan_type: EnumScanType,
        #[source]
        source: BoxError,
    },

    #[error("Invalid cell coordinate (col={col}, row={row}): {reason}")]
    CellAddress {
        col: usize,
        row: usize,
        reason: String,
    },

    #[error("Failed to persist report {path:?}: {message}")]
    Persistence { path: PathBuf, message: String },

    #[error("xlsx write error: {0}")]
    Workbook(String),

    #[error("Invalid report options: {0}")]
    InvalidOptions(String),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
