//! Report composition workflow.
//!
//! A [`ReportComposer`] assembles one subject's report: it loads the reference markers (and,
//! when editing, the stored report), holds the [`Draft`] of genotype selections and the report
//! metadata, resolves interpretations per marker, and finally validates and commits the report.
//!
//! ## Phases
//!
//! ```text
//! LoadingReference ──load──▶ Editing ──submit──▶ Submitting ──ok──▶ Closed
//!        ▲                     │   ▲                  │
//!        └──────retarget───────┘   └──────error───────┘
//! ```
//!
//! An authorization failure at any point clears the session and closes the composer.
//!
//! ## Interpretations
//!
//! Selecting a genotype returns a [`PendingInterpretation`] ticket. The ticket is turned into an
//! owned future with [`ReportComposer::fetch_interpretation`], which does not borrow the
//! composer, so several fetches can be outstanding while the user keeps editing. Replies are fed
//! back through [`ReportComposer::apply_interpretation`] in whatever order they complete; only
//! the latest request per marker is honoured.

use crate::backend::ReportBackend;
use crate::constants::{
    MSG_INTERPRETATION_FAILED, MSG_REFERENCE_LOAD_FAILED, MSG_REPORT_CREATED,
    MSG_REPORT_LOAD_FAILED, MSG_REPORT_UPDATED, MSG_SESSION_EXPIRED, PROMPT_INCOMPLETE,
};
use crate::draft::{Draft, DraftEntry};
use crate::error::{LabError, LabResult};
use crate::feedback::{Confirm, Notification, NotificationSink};
use crate::interpretation::{
    ApplyOutcome, Interpretation, InterpretationCache, PendingInterpretation,
};
use crate::models::{ReferenceMarker, ReportMetadata, ReportPayload};
use crate::session::SessionProvider;
use chrono::NaiveDate;
use snplab_types::{GenotypeId, MarkerId, ReportId, SubjectId};
use std::future::Future;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerPhase {
    LoadingReference,
    Editing,
    Submitting,
    Closed,
}

impl ComposerPhase {
    fn describe(&self) -> &'static str {
        match self {
            ComposerPhase::LoadingReference => "while reference data is loading",
            ComposerPhase::Editing => "while editing",
            ComposerPhase::Submitting => "while a submission is in flight",
            ComposerPhase::Closed => "after the composer has closed",
        }
    }
}

/// A metadata edit. Applying one has no side effect beyond the field update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataField {
    ReportDate(NaiveDate),
    SamplingDate(Option<NaiveDate>),
    Observations(String),
}

/// Whether a commit created a new report or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitKind {
    Created,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The backend accepted the report; the parent should refresh its list.
    Committed {
        kind: CommitKind,
        report: Option<ReportId>,
        entries: usize,
    },
    /// The user declined to submit an incomplete draft.
    Cancelled,
}

/// The reply to one interpretation request.
#[derive(Debug)]
pub struct InterpretationReply {
    pub ticket: PendingInterpretation,
    pub result: LabResult<String>,
}

pub struct ReportComposer<B, S, N> {
    backend: Arc<B>,
    session: Arc<S>,
    sink: Arc<N>,
    phase: ComposerPhase,
    today: NaiveDate,
    markers: Option<Vec<ReferenceMarker>>,
    draft: Draft,
    interpretations: InterpretationCache,
    metadata: ReportMetadata,
}

impl<B, S, N> ReportComposer<B, S, N>
where
    B: ReportBackend + 'static,
    S: SessionProvider,
    N: NotificationSink,
{
    /// Create a composer for `subject`. Call [`load`](Self::load) before editing.
    ///
    /// `today` becomes the default report date.
    pub fn new(
        backend: Arc<B>,
        session: Arc<S>,
        sink: Arc<N>,
        subject: SubjectId,
        today: NaiveDate,
    ) -> Self {
        Self {
            backend,
            session,
            sink,
            phase: ComposerPhase::LoadingReference,
            today,
            markers: None,
            draft: Draft::default(),
            interpretations: InterpretationCache::new(),
            metadata: ReportMetadata::new(subject, today),
        }
    }

    // ========================================================================
    // LOADING
    // ========================================================================

    /// Load reference markers and, if `target` is set, the stored report to edit.
    ///
    /// Failures degrade rather than abort:
    /// - reference markers unavailable: an error is notified, the draft is empty and submission
    ///   is disabled; the error is returned
    /// - stored report unavailable: an error is notified and editing starts from an empty
    ///   draft that still updates `target`; `Ok` is returned
    ///
    /// Pre-filled selections have their interpretations fetched before this returns.
    pub async fn load(&mut self, target: Option<ReportId>) -> LabResult<()> {
        self.expect_phase(ComposerPhase::LoadingReference)?;
        let subject = self.metadata.subject;
        self.interpretations.reset();
        self.metadata = ReportMetadata::new(subject, self.today);
        self.metadata.existing_report = target;

        let markers = match self.backend.reference_markers().await {
            Ok(markers) => markers,
            Err(e) => {
                tracing::error!("failed to load reference markers: {}", e);
                self.markers = None;
                self.draft = Draft::default();
                if self.handle_auth_failure(&e) {
                    return Err(e);
                }
                self.sink
                    .notify(Notification::error(MSG_REFERENCE_LOAD_FAILED));
                self.phase = ComposerPhase::Editing;
                return Err(e);
            }
        };
        tracing::debug!("loaded {} reference markers", markers.len());

        self.draft = Draft::empty_for(&markers);
        if let Some(report) = target {
            match self.backend.report_detail(report).await {
                Ok(detail) => {
                    let (draft, dropped) = Draft::from_stored(&markers, &detail.results);
                    if dropped > 0 {
                        tracing::warn!(
                            "report {} had {} stale result(s) that were dropped",
                            report,
                            dropped
                        );
                    }
                    self.draft = draft;
                    self.metadata = ReportMetadata::from_detail(subject, &detail, self.today);
                }
                Err(e) => {
                    tracing::error!("failed to load report {}: {}", report, e);
                    if self.handle_auth_failure(&e) {
                        return Err(e);
                    }
                    self.sink.notify(Notification::error(MSG_REPORT_LOAD_FAILED));
                }
            }
        }

        self.markers = Some(markers);
        self.phase = ComposerPhase::Editing;

        let prefilled: Vec<(MarkerId, GenotypeId)> = self
            .draft
            .entries()
            .filter_map(|(m, e)| e.genotype_id.map(|g| (m, g)))
            .collect();
        for (marker, genotype) in prefilled {
            let ticket = self.interpretations.begin(marker, genotype);
            let reply = self.fetch_interpretation(ticket).await;
            self.apply_interpretation(reply);
            if self.phase == ComposerPhase::Closed {
                return Err(LabError::Unauthorized);
            }
        }

        Ok(())
    }

    /// Switch to a different report (or a new one) and reload. The current draft is discarded.
    pub async fn retarget(&mut self, target: Option<ReportId>) -> LabResult<()> {
        self.expect_phase(ComposerPhase::Editing)?;
        tracing::info!("retargeting composer to report {:?}", target);
        self.phase = ComposerPhase::LoadingReference;
        self.draft = Draft::default();
        self.markers = None;
        self.load(target).await
    }

    // ========================================================================
    // EDITING
    // ========================================================================

    /// Record `genotype` for `marker` and start resolving its interpretation.
    ///
    /// Nothing changes if the marker is unknown or the genotype is not one of its options.
    pub fn select_genotype(
        &mut self,
        marker: MarkerId,
        genotype: GenotypeId,
    ) -> LabResult<PendingInterpretation> {
        self.expect_phase(ComposerPhase::Editing)?;
        let option = self
            .marker(marker)
            .ok_or(LabError::UnknownMarker(marker))?
            .option(genotype)
            .cloned()
            .ok_or(LabError::GenotypeNotAllowed { marker, genotype })?;

        self.draft.set(marker, &option);
        Ok(self.interpretations.begin(marker, genotype))
    }

    /// Return `marker` to unselected and drop its interpretation.
    pub fn clear_genotype(&mut self, marker: MarkerId) -> LabResult<()> {
        self.expect_phase(ComposerPhase::Editing)?;
        if !self.draft.unset(marker) {
            return Err(LabError::UnknownMarker(marker));
        }
        self.interpretations.invalidate(marker);
        Ok(())
    }

    /// Build the request for `ticket` as an owned future.
    pub fn fetch_interpretation(
        &self,
        ticket: PendingInterpretation,
    ) -> impl Future<Output = InterpretationReply> + 'static {
        let backend = Arc::clone(&self.backend);
        async move {
            let result = backend
                .interpretation(ticket.marker(), ticket.genotype())
                .await;
            InterpretationReply { ticket, result }
        }
    }

    /// Store a reply if it answers the latest request for its marker.
    pub fn apply_interpretation(&mut self, reply: InterpretationReply) -> ApplyOutcome {
        if self.phase == ComposerPhase::Closed {
            return ApplyOutcome::Superseded;
        }
        let InterpretationReply { ticket, result } = reply;
        match result {
            Ok(text) => {
                let outcome = self.interpretations.resolve(ticket, text);
                if outcome == ApplyOutcome::Superseded {
                    tracing::debug!(
                        "discarding superseded interpretation marker={} seq={}",
                        ticket.marker(),
                        ticket.seq()
                    );
                }
                outcome
            }
            Err(e) => {
                let outcome = self.interpretations.fail(ticket);
                if outcome == ApplyOutcome::Applied {
                    tracing::warn!(
                        "interpretation for marker {} genotype {} failed: {}",
                        ticket.marker(),
                        ticket.genotype(),
                        e
                    );
                    if !self.handle_auth_failure(&e) {
                        self.sink
                            .notify(Notification::error(MSG_INTERPRETATION_FAILED));
                    }
                }
                outcome
            }
        }
    }

    /// Select, fetch and apply in one step.
    pub async fn choose_genotype(
        &mut self,
        marker: MarkerId,
        genotype: GenotypeId,
    ) -> LabResult<ApplyOutcome> {
        let ticket = self.select_genotype(marker, genotype)?;
        let reply = self.fetch_interpretation(ticket).await;
        Ok(self.apply_interpretation(reply))
    }

    pub fn set_metadata(&mut self, field: MetadataField) -> LabResult<()> {
        self.expect_phase(ComposerPhase::Editing)?;
        match field {
            MetadataField::ReportDate(date) => self.metadata.report_date = date,
            MetadataField::SamplingDate(date) => self.metadata.sampling_date = date,
            MetadataField::Observations(text) => self.metadata.observations = text,
        }
        Ok(())
    }

    // ========================================================================
    // VALIDATION AND COMMIT
    // ========================================================================

    /// True when reference data is loaded and every marker has a genotype.
    pub fn can_submit(&self) -> bool {
        self.markers.is_some() && self.draft.is_complete()
    }

    /// The body that [`submit`](Self::submit) would send: metadata plus filled entries only.
    pub fn payload(&self) -> ReportPayload {
        ReportPayload {
            id: self.metadata.existing_report,
            user: self.metadata.subject,
            report_date: self.metadata.report_date,
            sampling_date: self.metadata.sampling_date,
            observations: self.metadata.observations.clone(),
            detail: self.draft.selections(),
        }
    }

    /// Validate and send the report.
    ///
    /// An incomplete draft is only sent if `confirm` accepts the prompt; declining returns
    /// [`SubmitOutcome::Cancelled`] and leaves everything as it was.
    ///
    /// # Errors
    ///
    /// - [`LabError::InvalidPhase`] outside of editing
    /// - [`LabError::ReferenceUnavailable`] if reference markers never loaded
    /// - the backend error, after notifying it; the draft is left intact for a retry
    pub async fn submit(&mut self, confirm: &impl Confirm) -> LabResult<SubmitOutcome> {
        self.expect_phase(ComposerPhase::Editing)?;
        if self.markers.is_none() {
            return Err(LabError::ReferenceUnavailable);
        }

        if !self.draft.is_complete() {
            let missing = self.draft.missing().len();
            tracing::info!("draft incomplete ({} missing); asking for confirmation", missing);
            if !confirm.confirm(PROMPT_INCOMPLETE) {
                return Ok(SubmitOutcome::Cancelled);
            }
        }

        let payload = self.payload();
        let entries = payload.entry_count();
        self.phase = ComposerPhase::Submitting;

        let result = match payload.id {
            Some(id) => self
                .backend
                .update_report(&payload)
                .await
                .map(|()| (CommitKind::Updated, Some(id))),
            None => self
                .backend
                .create_report(&payload)
                .await
                .map(|id| (CommitKind::Created, id)),
        };

        match result {
            Ok((kind, report)) => {
                tracing::info!(
                    "report {:?} {:?} for subject {} with {} entries",
                    report,
                    kind,
                    payload.user,
                    entries
                );
                self.draft.clear();
                self.interpretations.reset();
                self.phase = ComposerPhase::Closed;
                let message = match kind {
                    CommitKind::Created => MSG_REPORT_CREATED,
                    CommitKind::Updated => MSG_REPORT_UPDATED,
                };
                self.sink.notify(Notification::success(message));
                Ok(SubmitOutcome::Committed {
                    kind,
                    report,
                    entries,
                })
            }
            Err(e) => {
                tracing::error!("failed to submit report: {}", e);
                self.phase = ComposerPhase::Editing;
                if !self.handle_auth_failure(&e) {
                    self.sink.notify(Notification::error(e.user_message()));
                }
                Err(e)
            }
        }
    }

    /// Discard everything. Late interpretation replies are ignored from here on.
    pub fn close(&mut self) {
        self.phase = ComposerPhase::Closed;
        self.markers = None;
        self.draft = Draft::default();
        self.interpretations.reset();
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn phase(&self) -> ComposerPhase {
        self.phase
    }

    /// `None` if reference markers failed to load or the composer was closed.
    pub fn markers(&self) -> Option<&[ReferenceMarker]> {
        self.markers.as_deref()
    }

    pub fn marker(&self, id: MarkerId) -> Option<&ReferenceMarker> {
        self.markers.as_ref()?.iter().find(|m| m.id == id)
    }

    /// Find a marker by its display name, ignoring ASCII case.
    pub fn marker_by_name(&self, name: &str) -> Option<&ReferenceMarker> {
        self.markers
            .as_ref()?
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn entry(&self, marker: MarkerId) -> Option<&DraftEntry> {
        self.draft.entry(marker)
    }

    pub fn interpretation(&self, marker: MarkerId) -> &Interpretation {
        self.interpretations.get(marker)
    }

    pub fn metadata(&self) -> &ReportMetadata {
        &self.metadata
    }

    fn expect_phase(&self, wanted: ComposerPhase) -> LabResult<()> {
        if self.phase == wanted {
            Ok(())
        } else {
            Err(LabError::InvalidPhase(self.phase.describe()))
        }
    }

    /// Clear the session and close if `err` is an authorization failure.
    fn handle_auth_failure(&mut self, err: &LabError) -> bool {
        if !err.is_authorization() {
            return false;
        }
        tracing::warn!("session rejected; closing composer");
        self.session.clear();
        self.sink.notify(Notification::error(MSG_SESSION_EXPIRED));
        self.close();
        true
    }
}
