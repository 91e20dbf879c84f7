//! `snplab` command-line console.
//!
//! Drives the SNP Lab backend from a terminal: sign in, browse subjects and reports, compose or
//! edit a genotype report, render it to PDF, and maintain the reference catalogue.

mod console;

use anyhow::{Context, bail};
use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use console::{ConsoleConfirm, ConsoleSink};
use snplab_client::HttpBackend;
use snplab_core::catalogue::record_id;
use snplab_core::config::timeout_from_env_value;
use snplab_core::constants::{DEFAULT_API_URL, DEFAULT_TOKEN_FILE};
use snplab_core::session::decode_claims;
use snplab_core::{
    AuthBackend, CatalogueController, ClientConfig, ComposerPhase, FileSession, FormMode,
    Interpretation, LabError, MetadataField, ReferenceMarker, ReportBackend, ReportComposer,
    ReportDesk, ReportSummary, ResourceKind, SessionProvider, SubmitOutcome,
};
use snplab_types::{GenotypeId, MarkerId, NonEmptyText, ReportId, SubjectId};
use std::path::PathBuf;
use std::sync::Arc;

type Backend = HttpBackend<FileSession>;
type Composer = ReportComposer<Backend, FileSession, ConsoleSink>;

#[derive(Parser)]
#[command(name = "snplab")]
#[command(about = "SNP Lab genotype report console")]
struct Cli {
    /// Answer yes to every confirmation prompt
    #[arg(long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session token
    Login {
        username: String,
        /// Password (falls back to SNPLAB_PASSWORD)
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored session token
    Logout,
    /// Show the claims of the stored session token
    Whoami,
    /// List subjects
    Subjects,
    /// List reference markers and their genotype options
    Markers,
    /// List a subject's reports
    Reports { subject: SubjectId },
    /// Compose a new report, or edit an existing one with --report
    Compose {
        subject: SubjectId,
        /// Existing report to edit
        #[arg(long)]
        report: Option<ReportId>,
        /// MARKER=GENOTYPE, by name or id (repeatable)
        #[arg(long = "set", value_name = "MARKER=GENOTYPE")]
        selections: Vec<String>,
        /// MARKER to leave unselected (repeatable)
        #[arg(long = "clear", value_name = "MARKER")]
        cleared: Vec<String>,
        /// Report date, YYYY-MM-DD
        #[arg(long)]
        report_date: Option<NaiveDate>,
        /// Sampling date, YYYY-MM-DD
        #[arg(long)]
        sampling_date: Option<NaiveDate>,
        #[arg(long)]
        observations: Option<String>,
        /// Print the request body instead of submitting
        #[arg(long)]
        dry_run: bool,
    },
    /// Look up the interpretation of one marker/genotype pair
    Interpretation {
        marker: MarkerId,
        genotype: GenotypeId,
    },
    /// Delete a report
    DeleteReport { report: ReportId },
    /// List the signed-in user's own reports, optionally rendering one of them
    MyReports {
        /// Report to render to PDF
        #[arg(long)]
        render: Option<ReportId>,
        /// Output file (default: report-<id>.pdf)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Render a report to PDF
    RenderPdf {
        report: ReportId,
        /// Output file (default: report-<id>.pdf)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Maintain reference catalogue resources
    Catalogue {
        #[command(subcommand)]
        command: CatalogueCommands,
    },
}

#[derive(Subcommand)]
enum CatalogueCommands {
    /// List rows as JSON lines, with related ids shown by name
    List {
        kind: ResourceKind,
        /// Only rows with this text in some column
        #[arg(long)]
        search: Option<String>,
    },
    /// Show the form fields of a resource
    Schema { kind: ResourceKind },
    /// Create a row, or update one with --id
    Save {
        kind: ResourceKind,
        #[arg(long)]
        id: Option<i64>,
        /// FIELD=VALUE (repeatable)
        #[arg(long = "field", value_name = "FIELD=VALUE")]
        fields: Vec<String>,
    },
    /// Delete a row
    Delete { kind: ResourceKind, id: i64 },
}

/// Main entry point for the SNP Lab console
///
/// # Environment Variables
/// - `SNPLAB_API_URL`: backend base URL (default: "http://localhost:3001/api")
/// - `SNPLAB_TIMEOUT_SECS`: request timeout in seconds (default: 30)
/// - `SNPLAB_TOKEN_FILE`: where the session token is kept (default: ".snplab-token")
///
/// # Errors
/// Returns an error if configuration is invalid, no valid session exists for a command that
/// needs one, or the requested operation fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("snplab=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = config_from_env()?;
    tracing::debug!("using backend {}", cfg.api_url());

    let session = Arc::new(FileSession::new(cfg.token_file()));
    let sink = Arc::new(ConsoleSink);
    let confirm = ConsoleConfirm {
        assume_yes: cli.yes,
    };
    let backend = Arc::new(HttpBackend::new(cfg, session.clone())?);

    match cli.command {
        Commands::Login { username, password } => {
            let password = match password {
                Some(p) => p,
                None => std::env::var("SNPLAB_PASSWORD")
                    .context("pass --password or set SNPLAB_PASSWORD")?,
            };
            let username = NonEmptyText::new(&username).context("username cannot be blank")?;
            let password = NonEmptyText::new(&password).context("password cannot be blank")?;
            let token = backend.login(&username, &password).await?;
            session.store(&token)?;
            println!("Signed in as {username}");
        }
        Commands::Logout => {
            session.clear();
            println!("Signed out");
        }
        Commands::Whoami => {
            let token = session.token().context("not signed in")?;
            let claims = decode_claims(&token)?;
            println!(
                "id: {}",
                claims.id.map(|id| id.to_string()).unwrap_or_else(|| "-".into())
            );
            println!("role: {}", claims.role.as_deref().unwrap_or("-"));
            println!("expired: {}", claims.is_expired_at(Utc::now()));
        }
        Commands::Subjects => {
            require_session(session.as_ref())?;
            let mut desk = ReportDesk::new(backend, session, sink);
            desk.load_subjects().await?;
            for subject in desk.subjects() {
                println!("{}\t{}", subject.id, subject.display_label());
            }
        }
        Commands::Markers => {
            require_session(session.as_ref())?;
            for marker in backend.reference_markers().await? {
                println!("{}\t{}\t{}", marker.id, marker.name, genotype_list(&marker));
            }
        }
        Commands::Reports { subject } => {
            require_session(session.as_ref())?;
            let mut desk = ReportDesk::new(backend, session, sink);
            desk.select_subject(subject).await?;
            print_reports(desk.reports());
        }
        Commands::Compose {
            subject,
            report,
            selections,
            cleared,
            report_date,
            sampling_date,
            observations,
            dry_run,
        } => {
            require_session(session.as_ref())?;
            let mut desk = ReportDesk::new(backend, session, sink);
            desk.select_subject(subject).await?;
            let mut composer = desk.open_composer(report, Local::now().date_naive()).await?;
            if composer.phase() == ComposerPhase::Closed {
                bail!("session ended; sign in again");
            }
            if composer.markers().is_none() {
                bail!("reference markers are unavailable");
            }

            apply_edits(&mut composer, &selections, &cleared).await?;
            if let Some(date) = report_date {
                composer.set_metadata(MetadataField::ReportDate(date))?;
            }
            if sampling_date.is_some() {
                composer.set_metadata(MetadataField::SamplingDate(sampling_date))?;
            }
            if let Some(text) = observations {
                composer.set_metadata(MetadataField::Observations(text))?;
            }

            print_draft(&composer);
            if dry_run {
                println!("{}", serde_json::to_string_pretty(&composer.payload())?);
                return Ok(());
            }

            match desk.commit(&mut composer, &confirm).await? {
                SubmitOutcome::Committed { report, entries, .. } => {
                    let id = report.map(|r| r.to_string()).unwrap_or_else(|| "?".into());
                    println!("Saved report {id} with {entries} entries");
                }
                SubmitOutcome::Cancelled => println!("Not submitted"),
            }
        }
        Commands::Interpretation { marker, genotype } => {
            require_session(session.as_ref())?;
            println!("{}", backend.interpretation(marker, genotype).await?);
        }
        Commands::DeleteReport { report } => {
            require_session(session.as_ref())?;
            let mut desk = ReportDesk::new(backend, session, sink);
            if !desk.delete_report(report, &confirm).await? {
                println!("Not deleted");
            }
        }
        Commands::MyReports { render, output } => {
            require_session(session.as_ref())?;
            let mut desk = ReportDesk::new(backend, session, sink);
            desk.select_own_subject(Utc::now()).await?;
            match render {
                Some(report) => {
                    let rendered = desk.render_listed_pdf(report).await?;
                    let path = output.unwrap_or_else(|| rendered.file_name().into());
                    write_pdf(&rendered.bytes, path)?;
                }
                None => print_reports(desk.reports()),
            }
        }
        Commands::RenderPdf { report, output } => {
            require_session(session.as_ref())?;
            let desk = ReportDesk::new(backend, session, sink);
            let rendered = desk.render_pdf(report).await?;
            let path = output.unwrap_or_else(|| rendered.file_name().into());
            write_pdf(&rendered.bytes, path)?;
        }
        Commands::Catalogue { command } => {
            require_session(session.as_ref())?;
            run_catalogue(command, backend, sink, &confirm).await?;
        }
    }

    Ok(())
}

fn config_from_env() -> anyhow::Result<ClientConfig> {
    let api_url = std::env::var("SNPLAB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
    let timeout = timeout_from_env_value(std::env::var("SNPLAB_TIMEOUT_SECS").ok())?;
    let token_file = std::env::var("SNPLAB_TOKEN_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_TOKEN_FILE));
    Ok(ClientConfig::new(&api_url, timeout, token_file)?)
}

/// Fail early unless a usable token is stored. Expired tokens are removed.
fn require_session(session: &impl SessionProvider) -> anyhow::Result<()> {
    match session.valid_token(Utc::now()) {
        Ok(_) => Ok(()),
        Err(LabError::MissingToken) => bail!("not signed in; run `snplab login <username>`"),
        Err(_) => bail!("session expired; run `snplab login <username>`"),
    }
}

fn print_reports(reports: &[ReportSummary]) {
    for report in reports {
        println!(
            "{}\t{}\t{}",
            report.id,
            format_date(report.report_date),
            report.observations.as_deref().unwrap_or("")
        );
    }
}

fn write_pdf(bytes: &[u8], path: PathBuf) -> anyhow::Result<()> {
    std::fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn apply_edits(
    composer: &mut Composer,
    selections: &[String],
    cleared: &[String],
) -> anyhow::Result<()> {
    let mut tickets = Vec::new();
    for raw in selections {
        let (marker, genotype) = raw
            .split_once('=')
            .with_context(|| format!("expected MARKER=GENOTYPE, got {raw:?}"))?;
        let (marker, genotype) = resolve_selection(composer, marker, genotype)?;
        tickets.push(composer.select_genotype(marker, genotype)?);
    }
    for raw in cleared {
        let marker = resolve_marker(composer, raw)?.id;
        composer.clear_genotype(marker)?;
    }

    let replies: Vec<_> = tickets
        .into_iter()
        .map(|t| composer.fetch_interpretation(t))
        .collect();
    for reply in replies {
        let reply = reply.await;
        composer.apply_interpretation(reply);
    }
    Ok(())
}

fn resolve_marker<'a>(composer: &'a Composer, raw: &str) -> anyhow::Result<&'a ReferenceMarker> {
    let by_id = raw
        .trim()
        .parse::<MarkerId>()
        .ok()
        .and_then(|id| composer.marker(id));
    by_id
        .or_else(|| composer.marker_by_name(raw))
        .with_context(|| format!("unknown marker {raw:?}"))
}

fn resolve_selection(
    composer: &Composer,
    marker: &str,
    genotype: &str,
) -> anyhow::Result<(MarkerId, GenotypeId)> {
    let marker = resolve_marker(composer, marker)?;
    let wanted = genotype.trim();
    let option = marker
        .genotypes
        .iter()
        .find(|g| g.name.eq_ignore_ascii_case(wanted) || g.id.to_string() == wanted)
        .with_context(|| {
            format!(
                "{} has no genotype {wanted:?} (options: {})",
                marker.name,
                genotype_list(marker)
            )
        })?;
    Ok((marker.id, option.id))
}

fn print_draft(composer: &Composer) {
    let Some(markers) = composer.markers() else {
        return;
    };
    for marker in markers {
        let selected = composer
            .entry(marker.id)
            .and_then(|e| e.genotype_name.clone())
            .unwrap_or_else(|| "-".into());
        let text = match composer.interpretation(marker.id) {
            Interpretation::Resolved(text) => text.as_str(),
            Interpretation::Loading => "(loading)",
            Interpretation::Absent => "",
        };
        println!("{}\t{}\t{}", marker.name, selected, text);
    }
    let missing = composer.draft().missing().len();
    if missing > 0 {
        println!("{missing} marker(s) without a genotype");
    }
}

async fn run_catalogue(
    command: CatalogueCommands,
    backend: Arc<Backend>,
    sink: Arc<ConsoleSink>,
    confirm: &ConsoleConfirm,
) -> anyhow::Result<()> {
    match command {
        CatalogueCommands::List { kind, search } => {
            let mut controller = CatalogueController::new(backend, sink, kind);
            controller.load_schema().await?;
            controller.load().await?;
            for record in controller.search(search.as_deref().unwrap_or("")) {
                println!("{}", serde_json::Value::Object(record));
            }
        }
        CatalogueCommands::Schema { kind } => {
            let mut controller = CatalogueController::new(backend, sink, kind);
            for field in controller.load_schema().await?.fields() {
                let required = if field.required { "required" } else { "optional" };
                let choices = field
                    .options
                    .iter()
                    .map(|o| format!("{}={}", o.value, o.label))
                    .collect::<Vec<_>>()
                    .join(", ");
                println!(
                    "{}\t{}\t{}\t{}",
                    field.name,
                    field.kind.display_name(),
                    required,
                    choices
                );
            }
        }
        CatalogueCommands::Save { kind, id, fields } => {
            let mut controller = CatalogueController::new(backend, sink, kind);
            controller.load_schema().await?;
            controller.load().await?;

            let mut values = match id {
                Some(id) => controller
                    .records()
                    .iter()
                    .find(|r| record_id(r) == Some(id))
                    .cloned()
                    .with_context(|| format!("no {} with id {id}", kind.entity_name()))?,
                None => controller.schema().blank_record(),
            };
            for raw in &fields {
                let (name, value) = raw
                    .split_once('=')
                    .with_context(|| format!("expected FIELD=VALUE, got {raw:?}"))?;
                values.insert(name.trim().to_string(), field_value(value));
            }

            match id {
                Some(id) => controller.begin_update(id)?,
                None => controller.begin_create(),
            }
            match controller.submit(&values).await? {
                FormMode::Create => println!("Created {}", kind.entity_name()),
                FormMode::Update(id) => println!("Updated {} {id}", kind.entity_name()),
            }
        }
        CatalogueCommands::Delete { kind, id } => {
            let mut controller = CatalogueController::new(backend, sink, kind);
            if !controller.delete(id, confirm).await? {
                println!("Not deleted");
            }
        }
    }
    Ok(())
}

/// Integers are sent as numbers so foreign-key columns round-trip; everything else as text.
fn field_value(raw: &str) -> serde_json::Value {
    match raw.trim().parse::<i64>() {
        Ok(n) => serde_json::Value::from(n),
        Err(_) => serde_json::Value::String(raw.to_string()),
    }
}

fn genotype_list(marker: &ReferenceMarker) -> String {
    marker
        .genotypes
        .iter()
        .map(|g| format!("{}={}", g.id, g.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".into())
}
