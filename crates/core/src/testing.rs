//! In-memory report backend shared by the composer and desk tests.

use crate::backend::ReportBackend;
use crate::error::{LabError, LabResult};
use crate::models::{
    GenotypeOption, ReferenceMarker, ReportDetail, ReportPayload, ReportSummary, StoredResult,
    Subject,
};
use chrono::NaiveDate;
use snplab_types::{GenotypeId, MarkerId, ReportId, SubjectId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteFailure {
    None,
    Backend,
    Unauthorized,
}

/// Marker `i` is named `rs{i}` and accepts genotype `i * 10` (`G{i}`). Interpretations read
/// `rs{marker}/{genotype}`. Created reports get id 500.
#[derive(Debug)]
pub struct FakeReports {
    markers: Vec<ReferenceMarker>,
    details: HashMap<ReportId, ReportDetail>,
    subjects: Vec<Subject>,
    summaries: HashMap<SubjectId, Vec<ReportSummary>>,
    pdf: Vec<u8>,
    fail_markers: bool,
    fail_interpretations: bool,
    deny_interpretations: bool,
    interpretation_calls: AtomicUsize,
    fail_reads: bool,
    write_failure: WriteFailure,
    write_message: String,
    created: Mutex<Vec<ReportPayload>>,
    updated: Mutex<Vec<ReportPayload>>,
    deleted: Mutex<Vec<ReportId>>,
}

impl FakeReports {
    pub fn with_markers(count: i64) -> Self {
        let markers = (1..=count)
            .map(|i| ReferenceMarker {
                id: MarkerId::new(i),
                name: format!("rs{i}"),
                genotypes: vec![GenotypeOption {
                    id: GenotypeId::new(i * 10),
                    name: format!("G{i}"),
                }],
            })
            .collect();
        Self {
            markers,
            details: HashMap::new(),
            subjects: Vec::new(),
            summaries: HashMap::new(),
            pdf: b"%PDF-1.4 fake".to_vec(),
            fail_markers: false,
            fail_interpretations: false,
            deny_interpretations: false,
            interpretation_calls: AtomicUsize::new(0),
            fail_reads: false,
            write_failure: WriteFailure::None,
            write_message: String::new(),
            created: Mutex::new(Vec::new()),
            updated: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_extra_option(mut self, marker: i64, genotype: i64, name: &str) -> Self {
        if let Some(m) = self.markers.iter_mut().find(|m| m.id.get() == marker) {
            m.genotypes.push(GenotypeOption {
                id: GenotypeId::new(genotype),
                name: name.to_string(),
            });
        }
        self
    }

    pub fn with_stored_report(mut self, report: i64, results: &[(i64, i64)]) -> Self {
        let id = ReportId::new(report);
        let results = results
            .iter()
            .map(|&(m, g)| StoredResult {
                reference_snp_id: MarkerId::new(m),
                genotype_id: GenotypeId::new(g),
                genotype_name: None,
            })
            .collect();
        self.details.insert(
            id,
            ReportDetail {
                id,
                subject: None,
                report_date: NaiveDate::from_ymd_opt(2024, 1, 15),
                sampling_date: None,
                observations: Some("stored".into()),
                results,
            },
        );
        self
    }

    pub fn with_subject(mut self, id: i64, name: &str, reports: &[i64]) -> Self {
        let subject = SubjectId::new(id);
        self.subjects.push(Subject {
            id: subject,
            document: Some(format!("{}", 1000 + id)),
            document_type: Some("C.C".into()),
            name: Some(name.to_string()),
            last_names: None,
        });
        self.summaries.insert(
            subject,
            reports
                .iter()
                .map(|&r| ReportSummary {
                    id: ReportId::new(r),
                    report_date: NaiveDate::from_ymd_opt(2024, 2, 1),
                    sampling_date: None,
                    observations: None,
                })
                .collect(),
        );
        self
    }

    pub fn failing_markers(mut self) -> Self {
        self.fail_markers = true;
        self
    }

    pub fn failing_interpretations(mut self) -> Self {
        self.fail_interpretations = true;
        self
    }

    /// Interpretation lookups answer as if the session had been revoked.
    pub fn unauthorized_interpretations(mut self) -> Self {
        self.deny_interpretations = true;
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_writes(mut self, message: &str) -> Self {
        self.write_failure = WriteFailure::Backend;
        self.write_message = message.to_string();
        self
    }

    pub fn unauthorized_writes(mut self) -> Self {
        self.write_failure = WriteFailure::Unauthorized;
        self
    }

    pub fn created(&self) -> Vec<ReportPayload> {
        self.created.lock().unwrap().clone()
    }

    pub fn updated(&self) -> Vec<ReportPayload> {
        self.updated.lock().unwrap().clone()
    }

    pub fn interpretation_calls(&self) -> usize {
        self.interpretation_calls.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<ReportId> {
        self.deleted.lock().unwrap().clone()
    }

    fn check_write(&self) -> LabResult<()> {
        match self.write_failure {
            WriteFailure::None => Ok(()),
            WriteFailure::Backend => Err(LabError::Backend {
                status: 409,
                message: self.write_message.clone(),
            }),
            WriteFailure::Unauthorized => Err(LabError::Unauthorized),
        }
    }

    fn check_read(&self) -> LabResult<()> {
        if self.fail_reads {
            Err(LabError::Transport("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

impl ReportBackend for FakeReports {
    async fn reference_markers(&self) -> LabResult<Vec<ReferenceMarker>> {
        if self.fail_markers {
            return Err(LabError::Transport("connection refused".into()));
        }
        Ok(self.markers.clone())
    }

    async fn report_detail(&self, report: ReportId) -> LabResult<ReportDetail> {
        self.details.get(&report).cloned().ok_or(LabError::Backend {
            status: 404,
            message: "report not found".into(),
        })
    }

    async fn interpretation(&self, marker: MarkerId, genotype: GenotypeId) -> LabResult<String> {
        self.interpretation_calls.fetch_add(1, Ordering::SeqCst);
        if self.deny_interpretations {
            return Err(LabError::Unauthorized);
        }
        if self.fail_interpretations {
            return Err(LabError::Timeout(30));
        }
        Ok(format!("rs{}/{}", marker.get(), genotype.get()))
    }

    async fn create_report(&self, payload: &ReportPayload) -> LabResult<Option<ReportId>> {
        self.check_write()?;
        self.created.lock().unwrap().push(payload.clone());
        Ok(Some(ReportId::new(500)))
    }

    async fn update_report(&self, payload: &ReportPayload) -> LabResult<()> {
        self.check_write()?;
        self.updated.lock().unwrap().push(payload.clone());
        Ok(())
    }

    async fn delete_report(&self, report: ReportId) -> LabResult<()> {
        self.check_write()?;
        self.deleted.lock().unwrap().push(report);
        Ok(())
    }

    async fn render_report_pdf(&self, report: ReportId) -> LabResult<Vec<u8>> {
        self.check_read()?;
        if !self.summaries.values().flatten().any(|s| s.id == report) {
            return Err(LabError::Backend {
                status: 404,
                message: "report not found".into(),
            });
        }
        Ok(self.pdf.clone())
    }

    async fn subjects(&self) -> LabResult<Vec<Subject>> {
        self.check_read()?;
        Ok(self.subjects.clone())
    }

    async fn subject_reports(&self, subject: SubjectId) -> LabResult<Vec<ReportSummary>> {
        self.check_read()?;
        let deleted = self.deleted();
        Ok(self
            .summaries
            .get(&subject)
            .map(|rows| {
                rows.iter()
                    .filter(|r| !deleted.contains(&r.id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
