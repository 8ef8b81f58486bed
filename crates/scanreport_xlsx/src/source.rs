//! Scan data sources.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::spec::{
    BoxError, EnumScanType, SpecCloudCompliance, SpecCompliance, SpecMalware,
    SpecNodeWiseScanData, SpecReportParams, SpecSecret, SpecVulnerability,
};

/// Capability returning node-grouped scan results for report params.
///
/// Implementations may block on I/O; cancellation and retries are their
/// concern, the export pipeline calls each method at most once per export.
pub trait ScanDataSource {
    fn get_vulnerability_data(
        &self,
        params: &SpecReportParams,
    ) -> Result<SpecNodeWiseScanData<SpecVulnerability>, BoxError>;

    fn get_secret_data(
        &self,
        params: &SpecReportParams,
    ) -> Result<SpecNodeWiseScanData<SpecSecret>, BoxError>;

    fn get_malware_data(
        &self,
        params: &SpecReportParams,
    ) -> Result<SpecNodeWiseScanData<SpecMalware>, BoxError>;

    fn get_compliance_data(
        &self,
        params: &SpecReportParams,
    ) -> Result<SpecNodeWiseScanData<SpecCompliance>, BoxError>;

    fn get_cloud_compliance_data(
        &self,
        params: &SpecReportParams,
    ) -> Result<SpecNodeWiseScanData<SpecCloudCompliance>, BoxError>;
}

/// Reads `<dir>/<scan_type>.json` documents shaped as `{"scan_data": [...]}`.
///
/// `filters.node_type` and `filters.scan_id` narrow the node groups; all
/// other filters are ignored.
#[derive(Debug, Clone)]
pub struct JsonDirDataSource {
    dir_data: PathBuf,
}

impl JsonDirDataSource {
    pub fn new(dir_data: impl AsRef<Path>) -> Self {
        Self {
            dir_data: dir_data.as_ref().to_path_buf(),
        }
    }

    /// Document path for `scan_type`.
    pub fn path_for(&self, scan_type: EnumScanType) -> PathBuf {
        self.dir_data.join(format!("{}.json", scan_type.as_str()))
    }

    fn read<R: DeserializeOwned>(
        &self,
        scan_type: EnumScanType,
        params: &SpecReportParams,
    ) -> Result<SpecNodeWiseScanData<R>, BoxError> {
        let path_file = self.path_for(scan_type);
        let file = File::open(&path_file)
            .map_err(|err| format!("Failed to open {}: {err}", path_file.display()))?;
        let mut data: SpecNodeWiseScanData<R> = serde_json::from_reader(BufReader::new(file))
            .map_err(|err| format!("Failed to parse {}: {err}", path_file.display()))?;

        let filters = &params.filters;
        data.scan_data.retain(|group| {
            let if_node_type_ok = filters.node_type.is_empty()
                || filters.node_type.contains(&group.scan_info.node_type);
            let if_scan_id_ok = filters
                .scan_id
                .as_ref()
                .is_none_or(|c_scan_id| *c_scan_id == group.scan_info.scan_id);
            if_node_type_ok && if_scan_id_ok
        });

        tracing::debug!(
            scan_type = %scan_type,
            path = %path_file.display(),
            groups = data.scan_data.len(),
            "loaded scan data"
        );
        Ok(data)
    }
}

impl ScanDataSource for JsonDirDataSource {
    fn get_vulnerability_data(
        &self,
        params: &SpecReportParams,
    ) -> Result<SpecNodeWiseScanData<SpecVulnerability>, BoxError> {
        self.read(EnumScanType::Vulnerability, params)
    }

    fn get_secret_data(
        &self,
        params: &SpecReportParams,
    ) -> Result<SpecNodeWiseScanData<SpecSecret>, BoxError> {
        self.read(EnumScanType::Secret, params)
    }

    fn get_malware_data(
        &self,
        params: &SpecReportParams,
    ) -> Result<SpecNodeWiseScanData<SpecMalware>, BoxError> {
        self.read(EnumScanType::Malware, params)
    }

    fn get_compliance_data(
        &self,
        params: &SpecReportParams,
    ) -> Result<SpecNodeWiseScanData<SpecCompliance>, BoxError> {
        self.read(EnumScanType::Compliance, params)
    }

    fn get_cloud_compliance_data(
        &self,
        params: &SpecReportParams,
    ) -> Result<SpecNodeWiseScanData<SpecCloudCompliance>, BoxError> {
        self.read(EnumScanType::CloudCompliance, params)
    }
}
