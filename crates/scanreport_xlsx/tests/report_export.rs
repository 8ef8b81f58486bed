use std::fs;
use std::path::Path;

use scanreport_xlsx::{
    EnumScanType, JsonDirDataSource, MemorySheetSink, ReportError, ReportGenerator,
    SCHEMA_COMPLIANCE, SCHEMA_MALWARE, SCHEMA_SECRET, SCHEMA_VULNERABILITY, SpecReportOptions,
    SpecReportParams, generate_report, generate_report_with_sink, select_column_schema,
};
use serde_json::{Value, json};

fn write_fixture(dir: &Path, scan_type: EnumScanType, doc: Value) {
    fs::write(
        dir.join(format!("{}.json", scan_type.as_str())),
        serde_json::to_vec(&doc).unwrap(),
    )
    .unwrap();
}

fn write_all_fixtures(dir: &Path) {
    write_fixture(
        dir,
        EnumScanType::Vulnerability,
        json!({"scan_data": [
            {"scan_info": {"scan_id": "vs-1", "node_id": "img-1", "node_name": "nginx:1.25",
                           "host_name": "node-a", "node_type": "container_image",
                           "updated_at": 1700000000000_i64},
             "scan_results": [
                {"cve_id": "CVE-2023-0001", "cve_severity": "critical", "cve_cvss_score": 9.8,
                 "cve_caused_by_package": "openssl:3.0.1"},
                {"cve_id": "CVE-2023-0002", "cve_severity": "low", "masked": true}
             ]},
            {"scan_info": {"scan_id": "vs-2", "node_id": "host-1", "node_name": "node-b",
                           "node_type": "host"},
             "scan_results": [{"cve_id": "CVE-2022-1111", "cve_severity": "medium"}]}
        ]}),
    );
    write_fixture(
        dir,
        EnumScanType::Secret,
        json!({"scan_data": [
            {"scan_info": {"node_name": "node-a", "container_name": "api",
                           "kubernetes_cluster_name": "prod"},
             "scan_results": [{"full_filename": "/etc/app/.env", "name": "AWS key",
                               "rule_id": "aws-1", "level": "high",
                               "signature_to_match": "AKIA"}]}
        ]}),
    );
    write_fixture(
        dir,
        EnumScanType::Malware,
        json!({"scan_data": [
            {"scan_info": {"node_name": "node-a", "node_type": "host"},
             "scan_results": [{"rule_name": "eicar", "rule_id": "r-42", "severity_score": 7.5,
                               "file_sev_score": 6.0, "file_severity": "high",
                               "summary": "test file"}]}
        ]}),
    );
    write_fixture(
        dir,
        EnumScanType::Compliance,
        json!({"scan_data": [
            {"scan_info": {"node_name": "node-a", "host_name": "node-a"},
             "scan_results": [{"compliance_check_type": "cis", "status": "pass",
                               "test_number": "1.1.1"},
                              {"compliance_check_type": "cis", "status": "fail",
                               "test_number": "1.1.2"}]}
        ]}),
    );
    write_fixture(
        dir,
        EnumScanType::CloudCompliance,
        json!({"scan_data": [
            {"scan_info": {"node_name": "aws-123"},
             "scan_results": [{"compliance_check_type": "cis", "node_id": "aws-123",
                               "type": "iam", "control_id": "1.4", "status": "alarm"}]}
        ]}),
    );
}

fn options_in(dir: &Path) -> SpecReportOptions {
    SpecReportOptions {
        dir_temp: Some(dir.to_path_buf()),
        ..Default::default()
    }
}

/// Export through the in-memory sink and read back its JSON grid artifact.
fn export_grid(
    dir_data: &Path,
    dir_out: &Path,
    scan_type: &str,
) -> (scanreport_xlsx::ReportExport, Vec<Vec<Value>>) {
    let source = JsonDirDataSource::new(dir_data);
    let report = generate_report_with_sink(
        &source,
        &SpecReportParams::for_scan_type(scan_type),
        &options_in(dir_out),
        |_| Ok(MemorySheetSink::new()),
    )
    .unwrap();
    let v_grid: Value = serde_json::from_slice(&fs::read(&report.path).unwrap()).unwrap();
    let l_rows = serde_json::from_value(v_grid["Sheet1"].clone()).unwrap();
    (report, l_rows)
}

fn column(schema_label: &str, labels: &[&str]) -> usize {
    labels.iter().position(|c| *c == schema_label).unwrap()
}

#[test]
fn every_scan_type_exports_a_real_workbook() {
    let dir_data = tempfile::tempdir().unwrap();
    let dir_out = tempfile::tempdir().unwrap();
    write_all_fixtures(dir_data.path());
    let generator = ReportGenerator::with_options(
        JsonDirDataSource::new(dir_data.path()),
        options_in(dir_out.path()),
    );

    for scan_type in EnumScanType::ALL {
        let report = generator
            .generate(&SpecReportParams::for_scan_type(scan_type.as_str()))
            .unwrap();

        assert_eq!(report.scan_type, scan_type);
        assert_eq!(report.path.parent(), Some(dir_out.path()));
        let c_name = report.path.file_name().unwrap().to_string_lossy().to_string();
        assert!(c_name.starts_with("report-"), "{c_name}");
        assert!(
            c_name.ends_with(&format!("-{}.xlsx", scan_type.as_str())),
            "{c_name}"
        );
        assert!(fs::read(&report.path).unwrap().starts_with(b"PK"));
        assert!(report.rows_skipped.is_empty());
    }

    assert_eq!(fs::read_dir(dir_out.path()).unwrap().count(), 5);
}

#[test]
fn vulnerability_rows_follow_fetch_order() {
    let dir_data = tempfile::tempdir().unwrap();
    let dir_out = tempfile::tempdir().unwrap();
    write_all_fixtures(dir_data.path());

    let (report, l_rows) = export_grid(dir_data.path(), dir_out.path(), "vulnerability");
    let labels = SCHEMA_VULNERABILITY.columns;

    assert_eq!(report.cnt_groups, 2);
    assert_eq!(report.cnt_rows_written, 3);
    assert_eq!(l_rows.len(), 4);
    assert_eq!(l_rows[0], labels.iter().map(|c| json!(c)).collect::<Vec<_>>());

    let n_id = column("cve_id", labels);
    assert_eq!(l_rows[1][n_id], json!("CVE-2023-0001"));
    assert_eq!(l_rows[2][n_id], json!("CVE-2023-0002"));
    assert_eq!(l_rows[3][n_id], json!("CVE-2022-1111"));
    assert_eq!(l_rows[1][column("cve_severity", labels)], json!("critical"));
    assert_eq!(l_rows[1][column("cve_cvss_score", labels)], json!(9.8));
    assert_eq!(l_rows[1][column("cve_container_image", labels)], json!("nginx:1.25"));
    assert_eq!(l_rows[1][column("cve_container_image_id", labels)], json!("img-1"));
    assert_eq!(l_rows[1][column("@timestamp", labels)], json!(1700000000000.0));
    assert_eq!(l_rows[2][column("masked", labels)], json!(true));
    assert_eq!(l_rows[3][column("scan_id", labels)], json!("vs-2"));
}

#[test]
fn secret_malware_and_compliance_columns() {
    let dir_data = tempfile::tempdir().unwrap();
    let dir_out = tempfile::tempdir().unwrap();
    write_all_fixtures(dir_data.path());

    let (_, l_rows) = export_grid(dir_data.path(), dir_out.path(), "secret");
    let labels = SCHEMA_SECRET.columns;
    assert_eq!(l_rows[1][column("Filename", labels)], json!("/etc/app/.env"));
    assert_eq!(l_rows[1][column("Severity", labels)], json!("high"));
    assert_eq!(l_rows[1][column("Kubernetes Cluster Name", labels)], json!("prod"));
    assert_eq!(l_rows[1][column("Signature", labels)], json!("AKIA"));

    let (_, l_rows) = export_grid(dir_data.path(), dir_out.path(), "malware");
    let labels = SCHEMA_MALWARE.columns;
    assert_eq!(l_rows[1][column("Severity", labels)], json!(7.5));
    assert_eq!(l_rows[1][column("Meta", labels)], json!(""));
    assert_eq!(l_rows[1][column("Meta Rules", labels)], json!("r-42"));
    assert_eq!(l_rows[1][column("NodeType", labels)], json!("host"));

    let (report, l_rows) = export_grid(dir_data.path(), dir_out.path(), "compliance");
    let labels = SCHEMA_COMPLIANCE.columns;
    assert_eq!(report.cnt_rows_written, 2);
    assert_eq!(l_rows[1][column("count", labels)], json!(""));
    assert_eq!(l_rows[1][column("doc_id", labels)], json!(""));
    assert_eq!(l_rows[2][column("status", labels)], json!("fail"));
    assert_eq!(l_rows[2][column("test_number", labels)], json!("1.1.2"));
}

#[test]
fn cloud_compliance_uses_compliance_header() {
    let dir_data = tempfile::tempdir().unwrap();
    let dir_out = tempfile::tempdir().unwrap();
    write_all_fixtures(dir_data.path());

    let (report, l_rows) = export_grid(dir_data.path(), dir_out.path(), "cloud_compliance");
    let labels = select_column_schema(EnumScanType::CloudCompliance).columns;

    assert_eq!(labels, SCHEMA_COMPLIANCE.columns);
    assert_eq!(report.cnt_rows_written, 1);
    assert_eq!(l_rows[1][column("test_category", labels)], json!("iam"));
    assert_eq!(l_rows[1][column("test_number", labels)], json!("1.4"));
    assert_eq!(l_rows[1][column("node_id", labels)], json!("aws-123"));
}

#[test]
fn empty_result_set_gives_header_only_sheet() {
    let dir_data = tempfile::tempdir().unwrap();
    let dir_out = tempfile::tempdir().unwrap();
    write_fixture(dir_data.path(), EnumScanType::Malware, json!({"scan_data": []}));

    let (report, l_rows) = export_grid(dir_data.path(), dir_out.path(), "malware");
    assert_eq!(report.cnt_groups, 0);
    assert_eq!(report.cnt_rows_written, 0);
    assert_eq!(l_rows.len(), 1);
    assert_eq!(l_rows[0].len(), SCHEMA_MALWARE.width());
}

#[test]
fn unknown_scan_type_and_missing_data_leave_no_artifact() {
    let dir_data = tempfile::tempdir().unwrap();
    let dir_out = tempfile::tempdir().unwrap();
    let source = JsonDirDataSource::new(dir_data.path());
    let options = options_in(dir_out.path());

    let err = generate_report(&source, &SpecReportParams::for_scan_type("unknown"), &options)
        .unwrap_err();
    assert!(matches!(err, ReportError::UnknownScanType(_)));

    let err = generate_report(&source, &SpecReportParams::for_scan_type("secret"), &options)
        .unwrap_err();
    assert!(matches!(
        err,
        ReportError::Fetch {
            scan_type: EnumScanType::Secret,
            ..
        }
    ));

    assert_eq!(fs::read_dir(dir_out.path()).unwrap().count(), 0);
}
