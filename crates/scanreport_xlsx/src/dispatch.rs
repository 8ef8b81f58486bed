//! Report dispatch: scan type selection and the public entry points.

use crate::projection::ScanRecord;
use crate::report::ReportExport;
use crate::sink::{SheetSink, XlsxSheetSink};
use crate::source::ScanDataSource;
use crate::spec::{
    EnumScanType, ReportError, SpecCloudCompliance, SpecCompliance, SpecMalware,
    SpecReportOptions, SpecReportParams, SpecSecret, SpecVulnerability,
};
use crate::writer::export_scan_report;

/// Generate the XLSX report requested by `params`.
///
/// Returns the export report whose `path` is the artifact; the caller owns the
/// file from then on. Unknown scan types fail before any fetch or file.
pub fn generate_report<S>(
    source: &S,
    params: &SpecReportParams,
    options: &SpecReportOptions,
) -> Result<ReportExport, ReportError>
where
    S: ScanDataSource + ?Sized,
{
    generate_report_with_sink(source, params, options, XlsxSheetSink::new)
}

/// Same as [`generate_report`] with a caller-provided workbook sink.
pub fn generate_report_with_sink<S, K, F>(
    source: &S,
    params: &SpecReportParams,
    options: &SpecReportOptions,
    create_sink: F,
) -> Result<ReportExport, ReportError>
where
    S: ScanDataSource + ?Sized,
    K: SheetSink,
    F: FnOnce(&SpecReportOptions) -> Result<K, ReportError>,
{
    let enum_scan_type = params
        .filters
        .scan_type
        .parse::<EnumScanType>()
        .inspect_err(|err| tracing::error!(error = %err, "report generation rejected"))?;

    match enum_scan_type {
        EnumScanType::Vulnerability => {
            dispatch::<SpecVulnerability, _, _, _>(source, params, options, create_sink)
        }
        EnumScanType::Secret => {
            dispatch::<SpecSecret, _, _, _>(source, params, options, create_sink)
        }
        EnumScanType::Malware => {
            dispatch::<SpecMalware, _, _, _>(source, params, options, create_sink)
        }
        EnumScanType::Compliance => {
            dispatch::<SpecCompliance, _, _, _>(source, params, options, create_sink)
        }
        EnumScanType::CloudCompliance => {
            dispatch::<SpecCloudCompliance, _, _, _>(source, params, options, create_sink)
        }
    }
}

fn dispatch<R, S, K, F>(
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
    tracing::debug!(
        scan_type = %R::SCAN_TYPE,
        report_id = %params.report_id,
        "generating xlsx report"
    );
    export_scan_report::<R, S, K, F>(source, params, options, create_sink)
}

/// Reusable generator bound to one data source and one set of options.
///
/// Holds no mutable state, so one generator can serve concurrent exports when
/// the source is `Sync`.
#[derive(Debug, Clone)]
pub struct ReportGenerator<S> {
    source: S,
    options: SpecReportOptions,
}

impl<S: ScanDataSource> ReportGenerator<S> {
    pub fn new(source: S) -> Self {
        Self::with_options(source, SpecReportOptions::default())
    }

    pub fn with_options(source: S, options: SpecReportOptions) -> Self {
        Self { source, options }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn options(&self) -> &SpecReportOptions {
        &self.options
    }

    /// See [`generate_report`].
    pub fn generate(&self, params: &SpecReportParams) -> Result<ReportExport, ReportError> {
        generate_report(&self.source, params, &self.options)
    }

    /// See [`generate_report_with_sink`].
    pub fn generate_with_sink<K, F>(
        &self,
        params: &SpecReportParams,
        create_sink: F,
    ) -> Result<ReportExport, ReportError>
    where
        K: SheetSink,
        F: FnOnce(&SpecReportOptions) -> Result<K, ReportError>,
    {
        generate_report_with_sink(&self.source, params, &self.options, create_sink)
    }
}
