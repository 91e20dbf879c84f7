//! Catalogue form schema.
//!
//! The backend describes each resource's columns at `<endpoint>/schema`. Those descriptors are
//! mapped once onto [`FieldKind`] so the rest of the console works with a closed set of field
//! shapes.

use crate::catalogue::Record;
use crate::error::{LabError, LabResult};
use serde::Deserialize;
use serde_json::Value;
use snplab_types::FieldKind;

/// Column descriptor as served by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnSchema {
    pub column_name: String,
    #[serde(default, rename = "type")]
    pub column_type: Option<String>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub disabled: Option<bool>,
    #[serde(default)]
    pub config: Option<ColumnConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ColumnConfig {
    #[serde(default)]
    pub multiline: Option<bool>,
}

/// Name fragments that mark a text column as long-form.
const LONG_TEXT_HINTS: &[&str] = &["interpretation", "descripcion", "description"];

impl ColumnSchema {
    /// Map this column onto a [`FieldKind`].
    ///
    /// `has_options` is true when the caller can supply a list of choices for the column.
    pub fn field_kind(&self, has_options: bool) -> FieldKind {
        if self.column_name == "id" {
            return FieldKind::Identifier;
        }
        let column_type = self
            .column_type
            .as_deref()
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if column_type == "select" || has_options {
            return FieldKind::SingleSelect;
        }
        if column_type == "date" {
            return FieldKind::Date;
        }

        let name = self.column_name.to_ascii_lowercase();
        let multiline = self
            .config
            .as_ref()
            .and_then(|c| c.multiline)
            .unwrap_or(false);
        if column_type == "text" && (multiline || LONG_TEXT_HINTS.iter().any(|h| name.contains(h)))
        {
            return FieldKind::LongText;
        }
        FieldKind::Text
    }
}

/// One choice of a select field: the stored value and the text shown for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOption {
    pub value: Value,
    pub label: String,
}

impl FieldOption {
    pub fn new(value: Value, label: impl Into<String>) -> Self {
        Self {
            value,
            label: label.into(),
        }
    }

    /// Whether `value` selects this option. Numbers and numeric strings compare equal.
    pub fn matches(&self, value: &Value) -> bool {
        match (value_text(&self.value), value_text(value)) {
            (Some(a), Some(b)) => a.trim() == b.trim(),
            _ => false,
        }
    }
}

/// One renderable, validatable form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub disabled: bool,
    /// Allowed values of a select field. Empty means unrestricted.
    pub options: Vec<FieldOption>,
}

impl FormField {
    pub fn option_for(&self, value: &Value) -> Option<&FieldOption> {
        self.options.iter().find(|o| o.matches(value))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSchema {
    fields: Vec<FormField>,
}

impl FormSchema {
    /// Build a schema from backend columns.
    ///
    /// `select_columns` names the columns the caller has options for; they become
    /// [`FieldKind::SingleSelect`]. Every column is required unless it says `required: false`.
    pub fn from_columns(columns: &[ColumnSchema], select_columns: &[&str]) -> Self {
        let fields = columns
            .iter()
            .map(|c| {
                let kind = c.field_kind(select_columns.contains(&c.column_name.as_str()));
                FormField {
                    name: c.column_name.clone(),
                    kind,
                    required: c.required != Some(false),
                    disabled: c.disabled.unwrap_or(false) || !kind.is_user_editable(),
                    options: Vec::new(),
                }
            })
            .collect();
        Self { fields }
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Attach the choices of a select field. Unknown field names are ignored.
    pub fn set_options(&mut self, name: &str, options: Vec<FieldOption>) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
            field.options = options;
        }
    }

    /// Display text of `value` in the select field `name`, if it is one of its choices.
    pub fn label_for(&self, name: &str, value: &Value) -> Option<&str> {
        self.field(name)?
            .option_for(value)
            .map(|o| o.label.as_str())
    }

    /// A blank record: every field present with an empty string.
    pub fn blank_record(&self) -> Record {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), Value::String(String::new())))
            .collect()
    }

    /// Check that every required, user-editable field has a non-blank value and that every
    /// filled select field holds one of its choices.
    ///
    /// # Errors
    ///
    /// - [`LabError::FormInvalid`] listing blank required fields in schema order
    /// - [`LabError::InvalidChoice`] listing select fields whose value is not a choice
    pub fn validate(&self, values: &Record) -> LabResult<()> {
        let editable = || self.fields.iter().filter(|f| f.kind.is_user_editable());

        let missing: Vec<String> = editable()
            .filter(|f| f.required && is_blank(values.get(&f.name)))
            .map(|f| f.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(LabError::FormInvalid(missing));
        }

        let invalid: Vec<String> = editable()
            .filter(|f| !f.options.is_empty())
            .filter(|f| match values.get(&f.name) {
                Some(v) if !is_blank(Some(v)) => f.option_for(v).is_none(),
                _ => false,
            })
            .map(|f| f.name.clone())
            .collect();
        if !invalid.is_empty() {
            return Err(LabError::InvalidChoice(invalid));
        }
        Ok(())
    }
}

/// Replace `null` values with empty strings, as the backend expects.
pub fn normalize_record(values: &Record) -> Record {
    values
        .iter()
        .map(|(k, v)| {
            let v = if v.is_null() {
                Value::String(String::new())
            } else {
                v.clone()
            };
            (k.clone(), v)
        })
        .collect()
}

/// Plain text of a scalar value; `None` for nulls, arrays and objects.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}
