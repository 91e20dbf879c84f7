//! Constants used throughout the SNP Lab core crate.
//!
//! Endpoint paths are relative to the configured API base URL.

/// Default backend base URL when none is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";

/// Default HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default location of the persisted bearer token, relative to the working directory.
pub const DEFAULT_TOKEN_FILE: &str = ".snplab-token";

/// Reference markers with their genotype options; also the create/update/delete report endpoint.
pub const REPORT_ENDPOINT: &str = "report";

/// Prefix for a subject's report list: `report/userReports/{subject}`.
pub const SUBJECT_REPORTS_ENDPOINT: &str = "report/userReports";

/// Prefix for interpretation lookups: `interpretation/{marker}/{genotype}`.
pub const INTERPRETATION_ENDPOINT: &str = "interpretation";

/// Prefix for PDF rendering: `generate-report/{report}`.
pub const GENERATE_REPORT_ENDPOINT: &str = "generate-report";

/// Subjects (laboratory clients) are served by the users resource.
pub const SUBJECTS_ENDPOINT: &str = "users/user";

/// Credential exchange.
pub const LOGIN_ENDPOINT: &str = "users/login";

/// Identity document kinds a subject can be registered with.
pub const DOCUMENT_TYPES: &[&str] = &["C.C", "Pasaporte"];

/// Suffix appended to a resource endpoint to fetch its column schema.
pub const SCHEMA_SUFFIX: &str = "schema";

pub const MSG_SESSION_EXPIRED: &str = "Your session has ended, please sign in again";
pub const MSG_GENERIC_FAILURE: &str = "Something went wrong, please try again later";
pub const MSG_REPORT_CREATED: &str = "Report created";
pub const MSG_REPORT_UPDATED: &str = "Report updated";
pub const MSG_REPORT_DELETED: &str = "Report deleted";
pub const MSG_REFERENCE_LOAD_FAILED: &str = "Reference markers could not be loaded";
pub const MSG_REPORT_LOAD_FAILED: &str = "The stored report could not be loaded, starting empty";
pub const MSG_INTERPRETATION_FAILED: &str = "Interpretation could not be loaded";
pub const MSG_DATA_LOAD_FAILED: &str = "Error loading data, please try again later";
pub const MSG_PDF_FAILED: &str = "Error generating the report, please try again";

pub const PROMPT_INCOMPLETE: &str = "Some markers have no genotype selected. Submit anyway?";
pub const PROMPT_DELETE_REPORT: &str = "Do you want to delete this report?";
