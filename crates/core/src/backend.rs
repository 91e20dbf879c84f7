//! Backend capabilities consumed by the console.
//!
//! The traits describe *what* the console asks of the laboratory backend, not how it is reached.
//! `snplab-client` implements them over HTTP; tests implement them in memory.

use crate::catalogue::{Record, ResourceKind};
use crate::error::LabResult;
use crate::models::{ReferenceMarker, ReportDetail, ReportPayload, ReportSummary, Subject};
use crate::schema::ColumnSchema;
use snplab_types::{GenotypeId, MarkerId, NonEmptyText, ReportId, SubjectId};

/// Report reads and writes used by the composer and the report desk.
#[allow(async_fn_in_trait)]
pub trait ReportBackend {
    /// Reference markers with their embedded genotype options.
    async fn reference_markers(&self) -> LabResult<Vec<ReferenceMarker>>;

    /// Stored results and metadata of one report.
    async fn report_detail(&self, report: ReportId) -> LabResult<ReportDetail>;

    /// Interpretation text for a (marker, genotype) pair.
    async fn interpretation(&self, marker: MarkerId, genotype: GenotypeId) -> LabResult<String>;

    /// Create a report. Returns the new id when the backend reports one.
    async fn create_report(&self, payload: &ReportPayload) -> LabResult<Option<ReportId>>;

    /// Replace an existing report; `payload.id` must be set.
    async fn update_report(&self, payload: &ReportPayload) -> LabResult<()>;

    async fn delete_report(&self, report: ReportId) -> LabResult<()>;

    /// Rendered PDF document bytes.
    async fn render_report_pdf(&self, report: ReportId) -> LabResult<Vec<u8>>;

    async fn subjects(&self) -> LabResult<Vec<Subject>>;

    async fn subject_reports(&self, subject: SubjectId) -> LabResult<Vec<ReportSummary>>;
}

/// Generic record CRUD over the catalogue endpoints.
#[allow(async_fn_in_trait)]
pub trait ResourceBackend {
    async fn list_records(&self, kind: ResourceKind) -> LabResult<Vec<Record>>;

    async fn record_schema(&self, kind: ResourceKind) -> LabResult<Vec<ColumnSchema>>;

    /// Returns the created record id when the backend reports one.
    async fn create_record(&self, kind: ResourceKind, record: &Record) -> LabResult<Option<i64>>;

    async fn update_record(&self, kind: ResourceKind, id: i64, record: &Record) -> LabResult<()>;

    async fn delete_record(&self, kind: ResourceKind, id: i64) -> LabResult<()>;
}

/// Credential exchange.
#[allow(async_fn_in_trait)]
pub trait AuthBackend {
    /// Exchange a username and password for a bearer token.
    async fn login(&self, username: &NonEmptyText, password: &NonEmptyText) -> LabResult<String>;
}
