//! Per scan type row projections.
//!
//! Each finding record type knows its scan type, its column schema, how to be
//! fetched from a [`ScanDataSource`], and how to flatten itself (plus the
//! enclosing node's [`SpecScanInfo`]) into cell values in schema order.

use crate::conf::{
    SCHEMA_CLOUD_COMPLIANCE, SCHEMA_COMPLIANCE, SCHEMA_MALWARE, SCHEMA_SECRET,
    SCHEMA_VULNERABILITY,
};
use crate::source::ScanDataSource;
use crate::spec::{
    BoxError, EnumCellValue, EnumScanType, SpecCloudCompliance, SpecColumnSchema, SpecCompliance,
    SpecMalware, SpecNodeWiseScanData, SpecReportParams, SpecScanInfo, SpecSecret,
    SpecVulnerability,
};

/// A finding record that can be exported as one worksheet row.
pub trait ScanRecord: Sized {
    /// Scan type this record belongs to.
    const SCAN_TYPE: EnumScanType;

    /// Column schema; [`Self::project_row`] output must match its width and order.
    fn schema() -> &'static SpecColumnSchema;

    /// Flatten the record into cell values in schema order.
    fn project_row(&self, scan_info: &SpecScanInfo) -> Vec<EnumCellValue>;

    /// Fetch node-grouped records of this type.
    fn fetch<S: ScanDataSource + ?Sized>(
        source: &S,
        params: &SpecReportParams,
    ) -> Result<SpecNodeWiseScanData<Self>, BoxError>;
}

/// Empty-string placeholder for header columns with no source field.
fn placeholder() -> EnumCellValue {
    EnumCellValue::String(String::new())
}

impl ScanRecord for SpecVulnerability {
    const SCAN_TYPE: EnumScanType = EnumScanType::Vulnerability;

    fn schema() -> &'static SpecColumnSchema {
        &SCHEMA_VULNERABILITY
    }

    /// `cve_container_image`/`_id` carry the node name and id; both host
    /// columns carry the host name.
    fn project_row(&self, scan_info: &SpecScanInfo) -> Vec<EnumCellValue> {
        vec![
            scan_info.updated_at.into(),
            (&self.cve_attack_vector).into(),
            (&self.cve_caused_by_package).into(),
            (&scan_info.node_name).into(),
            (&scan_info.scan_id).into(),
            (&scan_info.node_id).into(),
            self.cve_cvss_score.into(),
            (&self.cve_description).into(),
            (&self.cve_fixed_in).into(),
            (&self.cve_id).into(),
            (&self.cve_link).into(),
            (&self.cve_severity).into(),
            self.cve_overall_score.into(),
            (&self.cve_type).into(),
            (&scan_info.host_name).into(),
            (&scan_info.host_name).into(),
            self.masked.into(),
        ]
    }

    fn fetch<S: ScanDataSource + ?Sized>(
        source: &S,
        params: &SpecReportParams,
    ) -> Result<SpecNodeWiseScanData<Self>, BoxError> {
        source.get_vulnerability_data(params)
    }
}

impl ScanRecord for SpecSecret {
    const SCAN_TYPE: EnumScanType = EnumScanType::Secret;

    fn schema() -> &'static SpecColumnSchema {
        &SCHEMA_SECRET
    }

    fn project_row(&self, scan_info: &SpecScanInfo) -> Vec<EnumCellValue> {
        vec![
            (&self.full_filename).into(),
            (&self.matched_content).into(),
            (&self.name).into(),
            (&self.rule_id).into(),
            (&self.level).into(),
            (&scan_info.node_name).into(),
            (&scan_info.container_name).into(),
            (&scan_info.kubernetes_cluster_name).into(),
            (&self.signature_to_match).into(),
        ]
    }

    fn fetch<S: ScanDataSource + ?Sized>(
        source: &S,
        params: &SpecReportParams,
    ) -> Result<SpecNodeWiseScanData<Self>, BoxError> {
        source.get_secret_data(params)
    }
}

impl ScanRecord for SpecMalware {
    const SCAN_TYPE: EnumScanType = EnumScanType::Malware;

    fn schema() -> &'static SpecColumnSchema {
        &SCHEMA_MALWARE
    }

    /// `Severity` carries the numeric score, `Meta` is blank and `Meta Rules`
    /// carries the rule id.
    fn project_row(&self, scan_info: &SpecScanInfo) -> Vec<EnumCellValue> {
        vec![
            (&self.rule_name).into(),
            self.severity_score.into(),
            placeholder(),
            (&self.rule_id).into(),
            self.file_sev_score.into(),
            (&self.file_severity).into(),
            (&self.summary).into(),
            (&scan_info.node_name).into(),
            (&scan_info.container_name).into(),
            (&scan_info.kubernetes_cluster_name).into(),
            (&scan_info.node_type).into(),
        ]
    }

    fn fetch<S: ScanDataSource + ?Sized>(
        source: &S,
        params: &SpecReportParams,
    ) -> Result<SpecNodeWiseScanData<Self>, BoxError> {
        source.get_malware_data(params)
    }
}

impl ScanRecord for SpecCompliance {
    const SCAN_TYPE: EnumScanType = EnumScanType::Compliance;

    fn schema() -> &'static SpecColumnSchema {
        &SCHEMA_COMPLIANCE
    }

    /// `count` and `doc_id` have no source field and stay blank.
    fn project_row(&self, scan_info: &SpecScanInfo) -> Vec<EnumCellValue> {
        vec![
            scan_info.updated_at.into(),
            (&self.compliance_check_type).into(),
            placeholder(),
            placeholder(),
            (&scan_info.host_name).into(),
            (&scan_info.host_name).into(),
            self.masked.into(),
            (&self.compliance_node_id).into(),
            (&scan_info.node_name).into(),
            (&self.compliance_node_type).into(),
            (&self.status).into(),
            (&self.test_category).into(),
            (&self.test_desc).into(),
            (&self.test_info).into(),
            (&self.test_number).into(),
        ]
    }

    fn fetch<S: ScanDataSource + ?Sized>(
        source: &S,
        params: &SpecReportParams,
    ) -> Result<SpecNodeWiseScanData<Self>, BoxError> {
        source.get_compliance_data(params)
    }
}

impl ScanRecord for SpecCloudCompliance {
    const SCAN_TYPE: EnumScanType = EnumScanType::CloudCompliance;

    fn schema() -> &'static SpecColumnSchema {
        &SCHEMA_CLOUD_COMPLIANCE
    }

    /// Mapped onto the compliance header: `node_type` carries the check type,
    /// `test_category` the record type, `test_desc`/`test_info` the
    /// description and title, `test_number` the control id.
    fn project_row(&self, scan_info: &SpecScanInfo) -> Vec<EnumCellValue> {
        vec![
            scan_info.updated_at.into(),
            (&self.compliance_check_type).into(),
            placeholder(),
            placeholder(),
            (&scan_info.host_name).into(),
            (&scan_info.host_name).into(),
            self.masked.into(),
            (&self.node_id).into(),
            (&scan_info.node_name).into(),
            (&self.compliance_check_type).into(),
            (&self.status).into(),
            (&self.kind).into(),
            (&self.description).into(),
            (&self.title).into(),
            (&self.control_id).into(),
        ]
    }

    fn fetch<S: ScanDataSource + ?Sized>(
        source: &S,
        params: &SpecReportParams,
    ) -> Result<SpecNodeWiseScanData<Self>, BoxError> {
        source.get_cloud_compliance_data(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_info() -> SpecScanInfo {
        SpecScanInfo {
            scan_id: "scan-1".to_string(),
            node_id: "node-1".to_string(),
            node_name: "nginx:latest".to_string(),
            host_name: "host-a".to_string(),
            container_name: "web".to_string(),
            kubernetes_cluster_name: "prod".to_string(),
            node_type: "container_image".to_string(),
            updated_at: 1_700_000_000_000,
        }
    }

    fn value_at<R: ScanRecord>(row: &[EnumCellValue], label: &str) -> EnumCellValue {
        let n_col = R::schema().position(label).expect("label in schema");
        row[n_col - 1].clone()
    }

    #[test]
    fn vulnerability_fields_land_under_their_headers() {
        let record = SpecVulnerability {
            cve_id: "CVE-2023-0001".to_string(),
            cve_severity: "critical".to_string(),
            cve_cvss_score: 9.8,
            masked: true,
            ..Default::default()
        };
        let row = record.project_row(&scan_info());

        assert_eq!(row.len(), SpecVulnerability::schema().width());
        assert_eq!(
            value_at::<SpecVulnerability>(&row, "cve_id"),
            EnumCellValue::from("CVE-2023-0001")
        );
        assert_eq!(
            value_at::<SpecVulnerability>(&row, "cve_severity"),
            EnumCellValue::from("critical")
        );
        assert_eq!(
            value_at::<SpecVulnerability>(&row, "cve_cvss_score"),
            EnumCellValue::Number(9.8)
        );
        assert_eq!(
            value_at::<SpecVulnerability>(&row, "@timestamp"),
            EnumCellValue::Number(1_700_000_000_000.0)
        );
        assert_eq!(
            value_at::<SpecVulnerability>(&row, "cve_container_image"),
            EnumCellValue::from("nginx:latest")
        );
        assert_eq!(
            value_at::<SpecVulnerability>(&row, "cve_container_image_id"),
            EnumCellValue::from("node-1")
        );
        assert_eq!(
            value_at::<SpecVulnerability>(&row, "host_name"),
            EnumCellValue::from("host-a")
        );
        assert_eq!(
            value_at::<SpecVulnerability>(&row, "masked"),
            EnumCellValue::Boolean(true)
        );
    }

    #[test]
    fn secret_row_carries_node_context() {
        let record = SpecSecret {
            full_filename: "/etc/app/.env".to_string(),
            rule_id: "aws-key".to_string(),
            level: "high".to_string(),
            ..Default::default()
        };
        let row = record.project_row(&scan_info());

        assert_eq!(row.len(), 9);
        assert_eq!(row[0], EnumCellValue::from("/etc/app/.env"));
        assert_eq!(
            value_at::<SpecSecret>(&row, "Severity"),
            EnumCellValue::from("high")
        );
        assert_eq!(
            value_at::<SpecSecret>(&row, "Container Name"),
            EnumCellValue::from("web")
        );
        assert_eq!(
            value_at::<SpecSecret>(&row, "Kubernetes Cluster Name"),
            EnumCellValue::from("prod")
        );
    }

    #[test]
    fn malware_row_uses_score_and_blank_meta() {
        let record = SpecMalware {
            rule_name: "eicar".to_string(),
            rule_id: "r-42".to_string(),
            severity_score: 7.5,
            ..Default::default()
        };
        let row = record.project_row(&scan_info());

        assert_eq!(row.len(), 11);
        assert_eq!(
            value_at::<SpecMalware>(&row, "Severity"),
            EnumCellValue::Number(7.5)
        );
        assert_eq!(value_at::<SpecMalware>(&row, "Meta"), EnumCellValue::from(""));
        assert_eq!(
            value_at::<SpecMalware>(&row, "Meta Rules"),
            EnumCellValue::from("r-42")
        );
        assert_eq!(
            value_at::<SpecMalware>(&row, "NodeType"),
            EnumCellValue::from("container_image")
        );
    }

    #[test]
    fn compliance_row_has_two_blank_placeholders() {
        let record = SpecCompliance {
            compliance_check_type: "cis".to_string(),
            test_number: "1.2.3".to_string(),
            ..Default::default()
        };
        let row = record.project_row(&scan_info());

        assert_eq!(row.len(), 15);
        assert_eq!(
            value_at::<SpecCompliance>(&row, "count"),
            EnumCellValue::from("")
        );
        assert_eq!(
            value_at::<SpecCompliance>(&row, "doc_id"),
            EnumCellValue::from("")
        );
        assert_eq!(
            value_at::<SpecCompliance>(&row, "test_number"),
            EnumCellValue::from("1.2.3")
        );
    }

    #[test]
    fn cloud_compliance_maps_onto_compliance_header() {
        let record = SpecCloudCompliance {
            compliance_check_type: "pci".to_string(),
            node_id: "arn:aws:s3:::bucket".to_string(),
            kind: "s3".to_string(),
            title: "Bucket is public".to_string(),
            control_id: "s3.1".to_string(),
            ..Default::default()
        };
        let row = record.project_row(&scan_info());

        assert_eq!(row.len(), SpecCloudCompliance::schema().width());
        assert_eq!(
            value_at::<SpecCloudCompliance>(&row, "node_id"),
            EnumCellValue::from("arn:aws:s3:::bucket")
        );
        assert_eq!(
            value_at::<SpecCloudCompliance>(&row, "node_type"),
            EnumCellValue::from("pci")
        );
        assert_eq!(
            value_at::<SpecCloudCompliance>(&row, "test_category"),
            EnumCellValue::from("s3")
        );
        assert_eq!(
            value_at::<SpecCloudCompliance>(&row, "test_info"),
            EnumCellValue::from("Bucket is public")
        );
        assert_eq!(
            value_at::<SpecCloudCompliance>(&row, "test_number"),
            EnumCellValue::from("s3.1")
        );
    }

    #[test]
    fn projection_does_not_touch_record() {
        let record = SpecSecret {
            name: "token".to_string(),
            ..Default::default()
        };
        let before = record.clone();
        let _ = record.project_row(&scan_info());
        assert_eq!(record, before);
    }
}
