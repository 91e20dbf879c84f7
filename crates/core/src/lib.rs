//! # SNP Lab Core
//!
//! Core workflow logic for the SNP Lab console.
//!
//! This crate contains the report composition workflow and its supporting state:
//! - Reference marker loading and the per-marker genotype [`draft`]
//! - Interpretation resolution with out-of-order reply handling
//! - Report validation, confirmation and commit
//! - The report desk and catalogue controllers around the composer
//!
//! **No transport concerns**: HTTP, bearer headers and response decoding belong in
//! `snplab-client`, which implements the [`backend`] traits.

pub mod backend;
pub mod catalogue;
pub mod composer;
pub mod config;
pub mod constants;
pub mod desk;
pub mod draft;
pub mod error;
pub mod feedback;
pub mod interpretation;
pub mod models;
pub mod schema;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{AuthBackend, ReportBackend, ResourceBackend};
pub use catalogue::{CatalogueController, FormMode, OptionSource, Record, ResourceKind};
pub use composer::{
    CommitKind, ComposerPhase, InterpretationReply, MetadataField, ReportComposer, SubmitOutcome,
};
pub use config::ClientConfig;
pub use desk::{RenderedReport, ReportDesk};
pub use draft::{Draft, DraftEntry};
pub use error::{ErrorCategory, LabError, LabResult};
pub use feedback::{Confirm, Notification, NotificationSink, Severity};
pub use interpretation::{ApplyOutcome, Interpretation, PendingInterpretation};
pub use models::{
    GenotypeOption, ReferenceMarker, ReportDetail, ReportMetadata, ReportPayload, ReportSummary,
    Subject,
};
pub use session::{FileSession, MemorySession, SessionProvider};
