//! Wire and domain types for reference markers, reports and subjects.
//!
//! Field names follow the backend's JSON (`rs_name`, `genotype_id`, `reportDate`, ...) through
//! serde renames so the Rust side can use descriptive names.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use snplab_types::{GenotypeId, MarkerId, ReportId, SubjectId};
use std::collections::BTreeMap;

/// One allowed genotype result for a reference marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenotypeOption {
    #[serde(rename = "genotype_id")]
    pub id: GenotypeId,
    #[serde(rename = "genotype_name")]
    pub name: String,
}

/// A reference SNP together with the ordered genotype options it accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceMarker {
    pub id: MarkerId,
    #[serde(rename = "rs_name")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub genotypes: Vec<GenotypeOption>,
}

impl ReferenceMarker {
    pub fn option(&self, genotype: GenotypeId) -> Option<&GenotypeOption> {
        self.genotypes.iter().find(|g| g.id == genotype)
    }
}

/// One row of a subject's report list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub id: ReportId,
    #[serde(default, alias = "reportDate", with = "lenient_date")]
    pub report_date: Option<NaiveDate>,
    #[serde(default, alias = "samplingDate", with = "lenient_date")]
    pub sampling_date: Option<NaiveDate>,
    #[serde(default)]
    pub observations: Option<String>,
}

/// A persisted marker result inside a stored report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResult {
    pub reference_snp_id: MarkerId,
    pub genotype_id: GenotypeId,
    #[serde(default)]
    pub genotype_name: Option<String>,
}

/// A stored report as returned for editing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDetail {
    pub id: ReportId,
    #[serde(default, rename = "user")]
    pub subject: Option<SubjectId>,
    #[serde(default, alias = "reportDate", with = "lenient_date")]
    pub report_date: Option<NaiveDate>,
    #[serde(default, alias = "samplingDate", with = "lenient_date")]
    pub sampling_date: Option<NaiveDate>,
    #[serde(default)]
    pub observations: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub results: Vec<StoredResult>,
}

/// Top-level report fields edited alongside the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMetadata {
    pub subject: SubjectId,
    pub report_date: NaiveDate,
    pub sampling_date: Option<NaiveDate>,
    pub observations: String,
    /// Present when editing; decides between update and create.
    pub existing_report: Option<ReportId>,
}

impl ReportMetadata {
    /// Metadata for a brand new report dated `today`.
    pub fn new(subject: SubjectId, today: NaiveDate) -> Self {
        Self {
            subject,
            report_date: today,
            sampling_date: None,
            observations: String::new(),
            existing_report: None,
        }
    }

    /// Metadata for editing `detail`; missing stored dates fall back to `today`.
    pub fn from_detail(subject: SubjectId, detail: &ReportDetail, today: NaiveDate) -> Self {
        Self {
            subject,
            report_date: detail.report_date.unwrap_or(today),
            sampling_date: detail.sampling_date,
            observations: detail.observations.clone().unwrap_or_default(),
            existing_report: Some(detail.id),
        }
    }
}

/// Full replacement body sent on create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ReportId>,
    pub user: SubjectId,
    #[serde(rename = "reportDate")]
    pub report_date: NaiveDate,
    #[serde(
        rename = "samplingDate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sampling_date: Option<NaiveDate>,
    #[serde(default)]
    pub observations: String,
    pub detail: BTreeMap<MarkerId, GenotypeId>,
}

impl ReportPayload {
    pub fn entry_count(&self) -> usize {
        self.detail.len()
    }

    pub fn is_update(&self) -> bool {
        self.id.is_some()
    }
}

/// A laboratory client; reports are scoped to one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub last_names: Option<String>,
}

impl Subject {
    /// `"<document> - <name> <last_names>"`, with missing parts left blank.
    pub fn display_label(&self) -> String {
        format!(
            "{} - {} {}",
            self.document.as_deref().unwrap_or(""),
            self.name.as_deref().unwrap_or(""),
            self.last_names.as_deref().unwrap_or("")
        )
        .trim_end()
        .to_string()
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Dates arrive either as `YYYY-MM-DD` or as full RFC 3339 timestamps from the database layer.
/// Only the calendar date is kept.
mod lenient_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        let Some(raw) = raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let head = raw.get(..10).unwrap_or(&raw);
        NaiveDate::parse_from_str(head, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid date {raw:?}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_marker_parses_backend_shape() {
        let json = r#"[
            {"id": 1, "rs_name": "rs1801133", "genotypes": [
                {"genotype_id": 10, "genotype_name": "CC"},
                {"genotype_id": 11, "genotype_name": "CT"}
            ]},
            {"id": 2, "rs_name": "rs4680", "genotypes": null},
            {"id": 3, "rs_name": "rs762551"}
        ]"#;
        let markers: Vec<ReferenceMarker> = serde_json::from_str(json).unwrap();
        assert_eq!(markers.len(), 3);
        assert_eq!(markers[0].name, "rs1801133");
        assert_eq!(markers[0].genotypes[1].name, "CT");
        assert!(markers[1].genotypes.is_empty());
        assert!(markers[2].genotypes.is_empty());
        assert_eq!(
            markers[0].option(GenotypeId::new(11)).map(|g| g.name.as_str()),
            Some("CT")
        );
        assert!(markers[0].option(GenotypeId::new(99)).is_none());
    }

    #[test]
    fn report_summary_accepts_timestamps_and_plain_dates() {
        let json = r#"[
            {"id": 5, "report_date": "2024-03-09T05:00:00.000Z", "observations": null},
            {"id": 6, "reportDate": "2024-04-01", "samplingDate": ""}
        ]"#;
        let rows: Vec<ReportSummary> = serde_json::from_str(json).unwrap();
        assert_eq!(rows[0].report_date, NaiveDate::from_ymd_opt(2024, 3, 9));
        assert_eq!(rows[1].report_date, NaiveDate::from_ymd_opt(2024, 4, 1));
        assert_eq!(rows[1].sampling_date, None);
    }

    #[test]
    fn payload_uses_backend_field_names() {
        let mut detail = BTreeMap::new();
        detail.insert(MarkerId::new(1), GenotypeId::new(10));
        let payload = ReportPayload {
            id: None,
            user: SubjectId::new(4),
            report_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            sampling_date: None,
            observations: "fasting".into(),
            detail,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "user": 4,
                "reportDate": "2024-05-02",
                "observations": "fasting",
                "detail": {"1": 10}
            })
        );
        assert!(!payload.is_update());
    }

    #[test]
    fn subject_label_tolerates_missing_parts() {
        let subject = Subject {
            id: SubjectId::new(1),
            document: Some("1020".into()),
            document_type: None,
            name: Some("Ana".into()),
            last_names: None,
        };
        assert_eq!(subject.display_label(), "1020 - Ana");
    }
}
