//! Report desk: the subject and report lists around the composer.

use crate::backend::ReportBackend;
use crate::composer::{ReportComposer, SubmitOutcome};
use crate::constants::{
    MSG_DATA_LOAD_FAILED, MSG_PDF_FAILED, MSG_REPORT_DELETED, MSG_SESSION_EXPIRED,
    PROMPT_DELETE_REPORT,
};
use crate::error::{LabError, LabResult};
use crate::feedback::{Confirm, Notification, NotificationSink};
use crate::models::{ReportSummary, Subject};
use crate::session::SessionProvider;
use chrono::{DateTime, NaiveDate, Utc};
use snplab_types::{ReportId, SubjectId};
use std::sync::Arc;

/// A rendered report document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub report: ReportId,
    pub bytes: Vec<u8>,
}

impl RenderedReport {
    /// Suggested file name, `report-<id>.pdf`.
    pub fn file_name(&self) -> String {
        format!("report-{}.pdf", self.report)
    }
}

pub struct ReportDesk<B, S, N> {
    backend: Arc<B>,
    session: Arc<S>,
    sink: Arc<N>,
    subjects: Vec<Subject>,
    selected: Option<SubjectId>,
    reports: Vec<ReportSummary>,
}

impl<B, S, N> ReportDesk<B, S, N>
where
    B: ReportBackend + 'static,
    S: SessionProvider,
    N: NotificationSink,
{
    pub fn new(backend: Arc<B>, session: Arc<S>, sink: Arc<N>) -> Self {
        Self {
            backend,
            session,
            sink,
            subjects: Vec::new(),
            selected: None,
            reports: Vec::new(),
        }
    }

    /// Fetch the subject list. On failure the previous list is kept.
    pub async fn load_subjects(&mut self) -> LabResult<()> {
        match self.backend.subjects().await {
            Ok(subjects) => {
                tracing::debug!("loaded {} subjects", subjects.len());
                self.subjects = subjects;
                Ok(())
            }
            Err(e) => {
                tracing::error!("failed to load subjects: {}", e);
                self.report_failure(&e, MSG_DATA_LOAD_FAILED);
                Err(e)
            }
        }
    }

    /// Make `subject` current and fetch its reports.
    pub async fn select_subject(&mut self, subject: SubjectId) -> LabResult<()> {
        self.selected = Some(subject);
        self.refresh_reports().await
    }

    /// Select the signed-in user's own subject, read from the `id` claim of the session token,
    /// and fetch its reports.
    ///
    /// # Errors
    ///
    /// - [`LabError::MissingToken`] or [`LabError::Unauthorized`] without a valid session
    /// - [`LabError::MalformedToken`] if the token carries no user id
    /// - any error from fetching the report list
    pub async fn select_own_subject(&mut self, now: DateTime<Utc>) -> LabResult<SubjectId> {
        let subject = self.session.claims(now).and_then(|claims| {
            claims
                .id
                .ok_or_else(|| LabError::MalformedToken("no user id claim".into()))
        });
        let subject = match subject {
            Ok(subject) => subject,
            Err(e) => {
                tracing::warn!("cannot determine the signed-in user: {}", e);
                self.report_failure(&e, MSG_SESSION_EXPIRED);
                return Err(e);
            }
        };
        tracing::debug!("signed-in user is subject {}", subject);
        self.select_subject(subject).await?;
        Ok(subject)
    }

    /// Re-fetch the selected subject's reports. On failure the list is emptied.
    pub async fn refresh_reports(&mut self) -> LabResult<()> {
        let subject = self
            .selected
            .ok_or(LabError::InvalidPhase("without a selected subject"))?;
        match self.backend.subject_reports(subject).await {
            Ok(reports) => {
                tracing::debug!("subject {} has {} reports", subject, reports.len());
                self.reports = reports;
                Ok(())
            }
            Err(e) => {
                tracing::error!("failed to load reports for subject {}: {}", subject, e);
                self.reports.clear();
                self.report_failure(&e, MSG_DATA_LOAD_FAILED);
                Err(e)
            }
        }
    }

    /// Build and load a composer for the selected subject.
    ///
    /// Load problems are reflected in the returned composer's state (and already notified), so
    /// the only error here is a missing subject.
    pub async fn open_composer(
        &self,
        target: Option<ReportId>,
        today: NaiveDate,
    ) -> LabResult<ReportComposer<B, S, N>> {
        let subject = self
            .selected
            .ok_or(LabError::InvalidPhase("without a selected subject"))?;
        let mut composer = ReportComposer::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.session),
            Arc::clone(&self.sink),
            subject,
            today,
        );
        if let Err(e) = composer.load(target).await {
            tracing::warn!("composer opened in degraded state: {}", e);
        }
        Ok(composer)
    }

    /// Submit `composer` and refresh the report list once the backend accepts it.
    pub async fn commit(
        &mut self,
        composer: &mut ReportComposer<B, S, N>,
        confirm: &impl Confirm,
    ) -> LabResult<SubmitOutcome> {
        let outcome = composer.submit(confirm).await?;
        if let SubmitOutcome::Committed { .. } = outcome {
            // The list is stale either way; a failed refresh has already been notified.
            let _ = self.refresh_reports().await;
        }
        Ok(outcome)
    }

    /// Delete `report` after confirmation. Returns `false` if the user declined.
    pub async fn delete_report(
        &mut self,
        report: ReportId,
        confirm: &impl Confirm,
    ) -> LabResult<bool> {
        if !confirm.confirm(PROMPT_DELETE_REPORT) {
            return Ok(false);
        }
        match self.backend.delete_report(report).await {
            Ok(()) => {
                tracing::info!("deleted report {}", report);
                self.sink.notify(Notification::success(MSG_REPORT_DELETED));
                if self.selected.is_some() {
                    let _ = self.refresh_reports().await;
                }
                Ok(true)
            }
            Err(e) => {
                tracing::error!("failed to delete report {}: {}", report, e);
                let message = e.user_message();
                self.report_failure(&e, &message);
                Err(e)
            }
        }
    }

    pub async fn render_pdf(&self, report: ReportId) -> LabResult<RenderedReport> {
        match self.backend.render_report_pdf(report).await {
            Ok(bytes) => {
                tracing::info!("rendered report {} ({} bytes)", report, bytes.len());
                Ok(RenderedReport { report, bytes })
            }
            Err(e) => {
                tracing::error!("failed to render report {}: {}", report, e);
                self.report_failure(&e, MSG_PDF_FAILED);
                Err(e)
            }
        }
    }

    /// Render one of the currently listed reports; anything else is refused without a request.
    pub async fn render_listed_pdf(&self, report: ReportId) -> LabResult<RenderedReport> {
        if !self.reports.iter().any(|r| r.id == report) {
            return Err(LabError::InvalidInput(format!(
                "report {report} is not in the current list"
            )));
        }
        self.render_pdf(report).await
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn subject(&self, id: SubjectId) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.id == id)
    }

    pub fn selected(&self) -> Option<SubjectId> {
        self.selected
    }

    pub fn reports(&self) -> &[ReportSummary] {
        &self.reports
    }

    fn report_failure(&self, err: &LabError, message: &str) {
        if err.is_authorization() {
            self.session.clear();
            self.sink.notify(Notification::error(MSG_SESSION_EXPIRED));
        } else {
            self.sink.notify(Notification::error(message));
        }
    }
}
