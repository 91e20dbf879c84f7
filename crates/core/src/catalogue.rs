//! Catalogue maintenance: list, create, update and delete reference data.
//!
//! Every catalogue screen of the console follows the same pattern, so one
//! [`CatalogueController`] drives them all, parameterised by [`ResourceKind`]. The controller
//! keeps the loaded rows, the form schema and the row selected for editing; the front end only
//! renders and forwards user intent.

use crate::backend::ResourceBackend;
use crate::error::{LabError, LabResult};
use crate::feedback::{Confirm, Notification, NotificationSink};
use crate::schema::{normalize_record, value_text, FieldOption, FormSchema};
use serde_json::Value;
use std::sync::Arc;

/// A catalogue row as the backend serves it.
pub type Record = serde_json::Map<String, Value>;

/// The catalogue resources the console maintains.
///
/// This enum is deliberately *closed*; each variant owns its endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    ReferenceSnp,
    Genotype,
    GenotypeBySnp,
    GenotypeEffect,
    Interpretation,
    User,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::ReferenceSnp,
        ResourceKind::Genotype,
        ResourceKind::GenotypeBySnp,
        ResourceKind::GenotypeEffect,
        ResourceKind::Interpretation,
        ResourceKind::User,
    ];

    pub fn endpoint(&self) -> &'static str {
        match self {
            ResourceKind::ReferenceSnp => "referenceSnp",
            ResourceKind::Genotype => "genotype",
            ResourceKind::GenotypeBySnp => "genotypesByReferenceSnp",
            ResourceKind::GenotypeEffect => "genotypeEffect",
            ResourceKind::Interpretation => "interpretation",
            ResourceKind::User => crate::constants::SUBJECTS_ENDPOINT,
        }
    }

    /// Singular noun used in notifications.
    pub fn entity_name(&self) -> &'static str {
        match self {
            ResourceKind::ReferenceSnp => "reference SNP",
            ResourceKind::Genotype => "genotype",
            ResourceKind::GenotypeBySnp => "genotype association",
            ResourceKind::GenotypeEffect => "genotype effect",
            ResourceKind::Interpretation => "interpretation",
            ResourceKind::User => "user",
        }
    }

    /// Select columns of this resource and where their choices come from.
    pub fn option_sources(&self) -> &'static [(&'static str, OptionSource)] {
        const SNP: (&str, OptionSource) = (
            "reference_snp_id",
            OptionSource::Resource {
                kind: ResourceKind::ReferenceSnp,
                label: "rs_name",
            },
        );
        const GENOTYPE: (&str, OptionSource) = (
            "genotype_id",
            OptionSource::Resource {
                kind: ResourceKind::Genotype,
                label: "genotype_name",
            },
        );
        const DOCUMENT_TYPE: (&str, OptionSource) = (
            "document_type",
            OptionSource::Fixed(crate::constants::DOCUMENT_TYPES),
        );
        match self {
            ResourceKind::Genotype | ResourceKind::GenotypeEffect => &[SNP],
            ResourceKind::GenotypeBySnp | ResourceKind::Interpretation => &[SNP, GENOTYPE],
            ResourceKind::User => &[DOCUMENT_TYPE],
            ResourceKind::ReferenceSnp => &[],
        }
    }
}

/// Where the choices of a select column come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSource {
    /// Rows of another resource: the row id is stored, the `label` column is shown.
    Resource {
        kind: ResourceKind,
        label: &'static str,
    },
    /// A fixed list of values that are shown as they are.
    Fixed(&'static [&'static str]),
}

impl std::str::FromStr for ResourceKind {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.endpoint().eq_ignore_ascii_case(wanted) || k.cli_name() == wanted)
            .ok_or_else(|| LabError::InvalidInput(format!("unknown resource: {wanted:?}")))
    }
}

impl ResourceKind {
    /// Kebab-case name used on the command line.
    pub fn cli_name(&self) -> &'static str {
        match self {
            ResourceKind::ReferenceSnp => "snps",
            ResourceKind::Genotype => "genotypes",
            ResourceKind::GenotypeBySnp => "genotypes-by-snp",
            ResourceKind::GenotypeEffect => "genotype-effects",
            ResourceKind::Interpretation => "interpretations",
            ResourceKind::User => "users",
        }
    }
}

/// Extract the numeric `id` of a record, accepting numbers and numeric strings.
pub fn record_id(record: &Record) -> Option<i64> {
    match record.get("id")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Whether the form is creating a new row or editing an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Update(i64),
}

/// Drives one catalogue screen.
pub struct CatalogueController<B, N> {
    backend: Arc<B>,
    sink: Arc<N>,
    kind: ResourceKind,
    records: Vec<Record>,
    schema: FormSchema,
    mode: Option<FormMode>,
}

impl<B, N> CatalogueController<B, N>
where
    B: ResourceBackend,
    N: NotificationSink,
{
    pub fn new(backend: Arc<B>, sink: Arc<N>, kind: ResourceKind) -> Self {
        Self {
            backend,
            sink,
            kind,
            records: Vec::new(),
            schema: FormSchema::default(),
            mode: None,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn mode(&self) -> Option<FormMode> {
        self.mode
    }

    /// Fetch the rows. On failure the previous rows are kept and an error is notified.
    pub async fn load(&mut self) -> LabResult<()> {
        match self.backend.list_records(self.kind).await {
            Ok(records) => {
                tracing::debug!("loaded {} {} rows", records.len(), self.kind.endpoint());
                self.records = records;
                Ok(())
            }
            Err(e) => {
                tracing::error!("failed to load {}: {}", self.kind.endpoint(), e);
                self.notify_failure(&e, format!("Error loading {}s", self.kind.entity_name()));
                Err(e)
            }
        }
    }

    /// Fetch and map the column schema, then the choices of every select column.
    ///
    /// A failure in either step keeps the previous schema and is notified.
    pub async fn load_schema(&mut self) -> LabResult<&FormSchema> {
        let sources = self.kind.option_sources();
        let columns = match self.backend.record_schema(self.kind).await {
            Ok(columns) => columns,
            Err(e) => {
                tracing::error!("failed to load {} schema: {}", self.kind.endpoint(), e);
                self.notify_failure(&e, crate::constants::MSG_DATA_LOAD_FAILED.to_string());
                return Err(e);
            }
        };

        let select_columns: Vec<&str> = sources.iter().map(|(column, _)| *column).collect();
        let mut schema = FormSchema::from_columns(&columns, &select_columns);
        for (column, source) in sources {
            if schema.field(column).is_none() {
                continue;
            }
            match self.load_options(*source).await {
                Ok(options) => schema.set_options(column, options),
                Err(e) => {
                    tracing::error!("failed to load choices for {}: {}", column, e);
                    self.notify_failure(&e, crate::constants::MSG_DATA_LOAD_FAILED.to_string());
                    return Err(e);
                }
            }
        }

        self.schema = schema;
        Ok(&self.schema)
    }

    async fn load_options(&self, source: OptionSource) -> LabResult<Vec<FieldOption>> {
        match source {
            OptionSource::Fixed(values) => Ok(values
                .iter()
                .map(|v| FieldOption::new(Value::from(*v), *v))
                .collect()),
            OptionSource::Resource { kind, label } => {
                let rows = self.backend.list_records(kind).await?;
                Ok(rows
                    .iter()
                    .filter_map(|row| {
                        let id = record_id(row)?;
                        let text = row
                            .get(label)
                            .and_then(value_text)
                            .unwrap_or_else(|| id.to_string());
                        Some(FieldOption::new(Value::from(id), text))
                    })
                    .collect())
            }
        }
    }

    /// `record` with select values replaced by their labels, for display.
    ///
    /// Values with no matching choice are left as they are.
    pub fn display_record(&self, record: &Record) -> Record {
        record
            .iter()
            .map(|(name, value)| {
                let shown = self
                    .schema
                    .label_for(name, value)
                    .map(Value::from)
                    .unwrap_or_else(|| value.clone());
                (name.clone(), shown)
            })
            .collect()
    }

    /// Loaded rows, as displayed, whose text contains `needle` in any column.
    ///
    /// The match is case-sensitive; a blank needle returns every row.
    pub fn search(&self, needle: &str) -> Vec<Record> {
        let needle = needle.trim();
        self.records
            .iter()
            .map(|r| self.display_record(r))
            .filter(|r| {
                needle.is_empty()
                    || r
                        .values()
                        .filter_map(value_text)
                        .any(|text| text.contains(needle))
            })
            .collect()
    }

    pub fn begin_create(&mut self) {
        self.mode = Some(FormMode::Create);
    }

    pub fn begin_update(&mut self, id: i64) -> LabResult<()> {
        if !self.records.iter().any(|r| record_id(r) == Some(id)) {
            return Err(LabError::InvalidInput(format!(
                "no {} with id {id}",
                self.kind.entity_name()
            )));
        }
        self.mode = Some(FormMode::Update(id));
        Ok(())
    }

    pub fn close_form(&mut self) {
        self.mode = None;
    }

    /// Validate and persist the open form, then reload.
    ///
    /// # Errors
    ///
    /// - [`LabError::InvalidPhase`] if no form is open
    /// - [`LabError::FormInvalid`] if a required field is blank (nothing is sent)
    /// - any backend error (notified; the form stays open)
    pub async fn submit(&mut self, values: &Record) -> LabResult<FormMode> {
        let mode = self.mode.ok_or(LabError::InvalidPhase("without an open form"))?;
        self.schema.validate(values)?;

        let mut body = normalize_record(values);
        let entity = self.kind.entity_name();
        let result = match mode {
            FormMode::Create => {
                body.remove("id");
                self.backend.create_record(self.kind, &body).await.map(|id| {
                    tracing::info!("created {} id={:?}", entity, id);
                })
            }
            FormMode::Update(id) => {
                body.insert("id".into(), Value::from(id));
                self.backend.update_record(self.kind, id, &body).await
            }
        };

        let verb = match mode {
            FormMode::Create => "create",
            FormMode::Update(_) => "update",
        };
        if let Err(e) = result {
            tracing::error!("failed to {} {}: {}", verb, entity, e);
            self.notify_failure(&e, format!("Error trying to {verb} {entity}"));
            return Err(e);
        }

        self.mode = None;
        // A failed reload is already notified by `load`.
        let _ = self.load().await;
        self.sink.notify(Notification::success(format!(
            "{} {}d successfully",
            capitalise(entity),
            verb
        )));
        Ok(mode)
    }

    /// Confirm and delete one row, then reload. Returns `false` if the user declined.
    pub async fn delete(&mut self, id: i64, confirm: &impl Confirm) -> LabResult<bool> {
        let entity = self.kind.entity_name();
        if !confirm.confirm(&format!("Do you want to delete this {entity}?")) {
            return Ok(false);
        }

        if let Err(e) = self.backend.delete_record(self.kind, id).await {
            tracing::error!("failed to delete {} {}: {}", entity, id, e);
            self.notify_failure(&e, format!("Error trying to delete {entity}"));
            return Err(e);
        }

        let _ = self.load().await;
        self.sink.notify(Notification::success(format!(
            "{} deleted successfully",
            capitalise(entity)
        )));
        Ok(true)
    }

    fn notify_failure(&self, err: &LabError, fallback: String) {
        let message = match err {
            LabError::Backend { .. } | LabError::Unauthorized | LabError::MissingToken => {
                err.user_message()
            }
            _ => fallback,
        };
        self.sink.notify(Notification::error(message));
    }
}

fn capitalise(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
