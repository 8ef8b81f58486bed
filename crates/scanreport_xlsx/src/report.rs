//! Export report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::spec::EnumScanType;

/// One record that was not written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSkippedRow {
    /// 0-based node group index in fetch order.
    pub idx_group: usize,
    /// 0-based record index within the group.
    pub idx_record: usize,
    /// Node id of the group.
    pub node_id: String,
    /// Why the row was dropped.
    pub reason: String,
}

/// Outcome of one export: the artifact path plus counters and diagnostics.
#[derive(Debug, Clone)]
pub struct ReportExport {
    /// Persisted artifact; owned by the caller from here on.
    pub path: PathBuf,
    pub scan_type: EnumScanType,
    pub sheet_name: String,
    /// Node groups seen.
    pub cnt_groups: u64,
    /// Finding records seen.
    pub cnt_records: u64,
    /// Data rows written.
    pub cnt_rows_written: u64,
    /// Records dropped by coordinate or row-write failures.
    pub rows_skipped: Vec<SpecSkippedRow>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl ReportExport {
    pub fn skipped_count(&self) -> usize {
        self.rows_skipped.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_groups".to_string(), self.cnt_groups);
        dict_counts.insert("cnt_records".to_string(), self.cnt_records);
        dict_counts.insert("cnt_rows_written".to_string(), self.cnt_rows_written);
        dict_counts.insert("cnt_skipped".to_string(), self.skipped_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} scan_type={} groups={} records={} written={} skipped={} warnings={} path={}",
            self.scan_type,
            dict_counts["cnt_groups"],
            dict_counts["cnt_records"],
            dict_counts["cnt_rows_written"],
            dict_counts["cnt_skipped"],
            dict_counts["cnt_warnings"],
            self.path.display()
        )
    }
}

impl fmt::Display for ReportExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[XLSX]"))
    }
}

/// Mutable accumulator used while rows are streamed.
#[derive(Debug, Clone)]
pub struct ReportExportBuilder {
    pub scan_type: EnumScanType,
    pub sheet_name: String,
    pub cnt_groups: u64,
    pub cnt_records: u64,
    pub cnt_rows_written: u64,
    pub rows_skipped: Vec<SpecSkippedRow>,
    pub warnings: Vec<String>,
}

impl ReportExportBuilder {
    pub fn new(scan_type: EnumScanType, sheet_name: &str) -> Self {
        Self {
            scan_type,
            sheet_name: sheet_name.to_string(),
            cnt_groups: 0,
            cnt_records: 0,
            cnt_rows_written: 0,
            rows_skipped: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_group(&mut self) {
        self.cnt_groups += 1;
    }

    pub fn add_record(&mut self) {
        self.cnt_records += 1;
    }

    pub fn add_written(&mut self) {
        self.cnt_rows_written += 1;
    }

    pub fn add_skipped(
        &mut self,
        idx_group: usize,
        idx_record: usize,
        node_id: &str,
        reason: String,
    ) {
        self.rows_skipped.push(SpecSkippedRow {
            idx_group,
            idx_record,
            node_id: node_id.to_string(),
            reason,
        });
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Finalize into an immutable report for the persisted artifact.
    pub fn build(self, path: PathBuf) -> ReportExport {
        ReportExport {
            path,
            scan_type: self.scan_type,
            sheet_name: self.sheet_name,
            cnt_groups: self.cnt_groups,
            cnt_records: self.cnt_records,
            cnt_rows_written: self.cnt_rows_written,
            rows_skipped: self.rows_skipped,
            warnings: self.warnings,
        }
    }
}
