//! Structured-output normalization
//!
//! Turns raw language-model text into a validated [`StructuredNote`]:
//! strip an optional markdown code fence, parse the JSON, then check it
//! against the note shape. The result is all-or-nothing.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use crate::error::NoteError;
use crate::note::{
    Condition, LabResult, Medication, PatientInfo, PlanItem, StructuredNote, VitalSign,
    null_as_empty,
};

const FENCE: &str = "```";

/// Remove a surrounding triple-backtick fence and its language label.
///
/// Text that does not start with a fence is only trimmed.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix(FENCE) else {
        return trimmed;
    };
    let inner = inner.trim_end();
    let inner = inner.strip_suffix(FENCE).unwrap_or(inner);

    // A label such as `json` sits directly after the opening fence
    let label_len = inner
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+')))
        .unwrap_or(inner.len());
    let rest = &inner[label_len..];
    if label_len > 0 && rest.starts_with(|c: char| c.is_whitespace() || c == '{' || c == '[') {
        rest.trim()
    } else {
        inner.trim()
    }
}

/// Parse and validate model output into a [`StructuredNote`].
///
/// Code fields are never taken from the model; they stay `None` until
/// enrichment fills them in.
pub fn normalize(raw: &str) -> Result<StructuredNote, NoteError> {
    let payload = strip_code_fence(raw);

    let value: JsonValue =
        serde_json::from_str(payload).map_err(|source| NoteError::StructureParse {
            raw: raw.to_string(),
            source,
        })?;

    if !value.is_object() {
        return Err(NoteError::validation(
            ".",
            format!("expected a JSON object, found {}", kind_of(&value)),
        ));
    }

    let parsed: RawNote = serde_path_to_error::deserialize(value).map_err(|err| {
        let field = err.path().to_string();
        NoteError::validation(field, err.into_inner().to_string())
    })?;

    let note = parsed.into_note();
    validate(&note)?;
    Ok(note)
}

/// Check the constraints serde cannot express: required names are non-blank.
pub fn validate(note: &StructuredNote) -> Result<(), NoteError> {
    let required = note
        .conditions
        .iter()
        .enumerate()
        .map(|(i, c)| (format!("conditions[{i}].name"), &c.name))
        .chain(
            note.medications
                .iter()
                .enumerate()
                .map(|(i, m)| (format!("medications[{i}].name"), &m.name)),
        )
        .chain(
            note.vitals
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("vitals[{i}].type"), &v.kind)),
        )
        .chain(
            note.labs
                .iter()
                .enumerate()
                .map(|(i, l)| (format!("labs[{i}].name"), &l.name)),
        );

    for (field, text) in required {
        if text.trim().is_empty() {
            return Err(NoteError::validation(field, "must not be blank"));
        }
    }
    Ok(())
}

fn kind_of(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

// Model-facing shape. Identical to the entity graph minus the code fields.

#[derive(Deserialize)]
struct RawNote {
    #[serde(default)]
    patient: Option<PatientInfo>,
    #[serde(default, deserialize_with = "null_as_empty")]
    conditions: Vec<RawCondition>,
    #[serde(default, deserialize_with = "null_as_empty")]
    medications: Vec<RawMedication>,
    #[serde(default, deserialize_with = "null_as_empty")]
    vitals: Vec<RawVital>,
    #[serde(default, deserialize_with = "null_as_empty")]
    labs: Vec<RawLab>,
    #[serde(default, deserialize_with = "null_as_empty")]
    plan: Vec<PlanItem>,
}

#[derive(Deserialize)]
struct RawCondition {
    name: String,
}

#[derive(Deserialize)]
struct RawMedication {
    name: String,
    #[serde(default)]
    dose: Option<String>,
    #[serde(default)]
    route: Option<String>,
    #[serde(default)]
    frequency: Option<String>,
}

#[derive(Deserialize)]
struct RawVital {
    #[serde(rename = "type")]
    kind: String,
    #[serde(deserialize_with = "text_or_number")]
    value: String,
    #[serde(default)]
    unit: Option<String>,
}

#[derive(Deserialize)]
struct RawLab {
    name: String,
    #[serde(default, deserialize_with = "optional_text_or_number")]
    value: Option<String>,
    #[serde(default)]
    unit: Option<String>,
}

impl RawNote {
    fn into_note(self) -> StructuredNote {
        StructuredNote {
            patient: self.patient,
            conditions: self
                .conditions
                .into_iter()
                .map(|c| Condition {
                    name: c.name,
                    icd10_code: None,
                })
                .collect(),
            medications: self
                .medications
                .into_iter()
                .map(|m| Medication {
                    name: m.name,
                    dose: m.dose,
                    route: m.route,
                    frequency: m.frequency,
                    rxnorm_code: None,
                })
                .collect(),
            vitals: self
                .vitals
                .into_iter()
                .map(|v| VitalSign {
                    kind: v.kind,
                    value: v.value,
                    unit: v.unit,
                })
                .collect(),
            labs: self
                .labs
                .into_iter()
                .map(|l| LabResult {
                    name: l.name,
                    value: l.value,
                    unit: l.unit,
                })
                .collect(),
            plan: self.plan,
        }
    }
}

/// Measurement values are free text, but models often emit bare numbers.
fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) => Ok(s),
        JsonValue::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "invalid type: {}, expected a string or number",
            kind_of(&other)
        ))),
    }
}

fn optional_text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::Null => Ok(None),
        JsonValue::String(s) => Ok(Some(s)),
        JsonValue::Number(n) => Ok(Some(n.to_string())),
        other => Err(D::Error::custom(format!(
            "invalid type: {}, expected a string, number or null",
            kind_of(&other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY: &str =
        r#"{"patient":null,"conditions":[],"medications":[],"vitals":[],"labs":[],"plan":[]}"#;

    #[test]
    fn fenced_empty_payload_normalizes() {
        let raw = format!("```json\n{EMPTY}\n```");
        let note = normalize(&raw).unwrap();
        assert!(note.patient.is_none());
        assert!(note.is_empty());
    }

    #[test]
    fn strips_plain_fence_and_whitespace() {
        assert_eq!(strip_code_fence("  ```\n{\"a\":1}\n```  "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```JSON{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("\n{\"a\":1}\n"), "{\"a\":1}");
    }

    #[test]
    fn bare_word_without_payload_is_not_a_label() {
        assert_eq!(strip_code_fence("```null```"), "null");
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let note = normalize(r#"{"conditions":[{"name":"asthma"}]}"#).unwrap();
        assert_eq!(note.conditions.len(), 1);
        assert!(note.patient.is_none());
        assert!(note.medications.is_empty());
        assert!(note.labs.is_empty());
    }

    #[test]
    fn unbalanced_braces_fail_to_parse() {
        let raw = r#"{"conditions":[{"name":"asthma"}]"#;
        match normalize(raw) {
            Err(NoteError::StructureParse { raw: kept, .. }) => assert_eq!(kept, raw),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn wrong_type_reports_field_path() {
        let raw = r#"{"medications":[{"name":"aspirin"},{"name":"metformin","dose":500}]}"#;
        match normalize(raw) {
            Err(NoteError::StructureValidation { field, .. }) => {
                assert_eq!(field, "medications[1].dose")
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn integral_float_age_normalizes() {
        let note = normalize(r#"{"patient":{"age":58.0}}"#).unwrap();
        assert_eq!(note.patient.unwrap().age, Some(58));
    }

    #[test]
    fn negative_age_is_rejected() {
        let err = normalize(r#"{"patient":{"age":-3}}"#).unwrap_err();
        assert!(matches!(err, NoteError::StructureValidation { ref field, .. } if field == "patient.age"));
    }

    #[test]
    fn top_level_array_is_rejected() {
        let err = normalize("[]").unwrap_err();
        assert!(matches!(err, NoteError::StructureValidation { .. }));
    }

    #[test]
    fn numeric_measurements_become_text() {
        let note = normalize(
            r#"{"vitals":[{"type":"temperature","value":38.5,"unit":"C"}],
                "labs":[{"name":"HbA1c","value":7,"unit":"%"},{"name":"culture","value":null}]}"#,
        )
        .unwrap();
        assert_eq!(note.vitals[0].value, "38.5");
        assert_eq!(note.labs[0].value.as_deref(), Some("7"));
        assert_eq!(note.labs[1].value, None);
    }

    #[test]
    fn model_supplied_codes_are_dropped() {
        let note = normalize(
            r#"{"conditions":[{"name":"hypertension","icd10_code":"I10"}],
                "medications":[{"name":"lisinopril","rxnorm_code":"29046"}]}"#,
        )
        .unwrap();
        assert_eq!(note.conditions[0].icd10_code, None);
        assert_eq!(note.medications[0].rxnorm_code, None);
    }

    #[test]
    fn blank_required_name_is_rejected() {
        let err = normalize(r#"{"labs":[{"name":"  "}]}"#).unwrap_err();
        assert!(matches!(err, NoteError::StructureValidation { ref field, .. } if field == "labs[0].name"));
    }

    #[test]
    fn empty_plan_description_is_allowed() {
        let note = normalize(r#"{"plan":[{"description":""}]}"#).unwrap();
        assert_eq!(note.plan.len(), 1);
    }
}
