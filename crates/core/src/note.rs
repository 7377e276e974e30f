//! Entity graph extracted from a clinical note

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::Value as JsonValue;

/// Demographics of the note's subject
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "whole_number")]
    pub age: Option<u32>,
    /// Free text; normalized to the FHIR gender vocabulary at mapping time
    #[serde(default)]
    pub sex: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    #[serde(default)]
    pub icd10_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    #[serde(default)]
    pub dose: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub rxnorm_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitalSign {
    /// e.g. "blood pressure"
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabResult {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanItem {
    pub description: String,
}

/// Aggregate root of the entity graph.
///
/// Every list is always present. A missing key and an explicit `null`
/// both deserialize to an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredNote {
    #[serde(default)]
    pub patient: Option<PatientInfo>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub medications: Vec<Medication>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub vitals: Vec<VitalSign>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub labs: Vec<LabResult>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub plan: Vec<PlanItem>,
}

impl StructuredNote {
    /// True when nothing at all was extracted
    pub fn is_empty(&self) -> bool {
        self.patient.is_none()
            && self.conditions.is_empty()
            && self.medications.is_empty()
            && self.vitals.is_empty()
            && self.labs.is_empty()
            && self.plan.is_empty()
    }
}

pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Ages arrive as `58` or `58.0`; fractional and negative values are rejected.
fn whole_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let n = match JsonValue::deserialize(deserializer)? {
        JsonValue::Null => return Ok(None),
        JsonValue::Number(n) => n,
        other => {
            return Err(D::Error::custom(format!(
                "invalid type: {other}, expected a whole number"
            )));
        }
    };

    let whole = match (n.as_u64(), n.as_f64()) {
        (Some(u), _) => u32::try_from(u).ok(),
        (None, Some(f)) if f.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&f) => {
            Some(f as u32)
        }
        _ => None,
    };
    whole
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("invalid value: {n}, expected a whole number")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integral_float_age_is_accepted() {
        let info: PatientInfo = serde_json::from_value(json!({"age": 58.0})).unwrap();
        assert_eq!(info.age, Some(58));

        let info: PatientInfo = serde_json::from_value(json!({"age": null})).unwrap();
        assert_eq!(info.age, None);
        let info: PatientInfo = serde_json::from_value(json!({})).unwrap();
        assert_eq!(info.age, None);
    }

    #[test]
    fn fractional_or_textual_age_is_rejected() {
        assert!(serde_json::from_value::<PatientInfo>(json!({"age": 58.5})).is_err());
        assert!(serde_json::from_value::<PatientInfo>(json!({"age": -1.0})).is_err());
        assert!(serde_json::from_value::<PatientInfo>(json!({"age": "fifty"})).is_err());
    }

    #[test]
    fn missing_and_null_lists_become_empty() {
        let note: StructuredNote =
            serde_json::from_value(json!({"conditions": null, "patient": null})).unwrap();
        assert!(note.is_empty());
        assert!(note.conditions.is_empty());
        assert!(note.plan.is_empty());
    }

    #[test]
    fn codes_serialize_as_explicit_null() {
        let note = StructuredNote {
            conditions: vec![Condition {
                name: "asthma".to_string(),
                icd10_code: None,
            }],
            ..Default::default()
        };
        let value = serde_json::to_value(&note).unwrap();
        assert!(value["conditions"][0]["icd10_code"].is_null());
        assert!(value["conditions"][0].as_object().unwrap().contains_key("icd10_code"));
        assert_eq!(value["labs"], json!([]));
    }

    #[test]
    fn vital_kind_uses_type_key() {
        let vital: VitalSign =
            serde_json::from_value(json!({"type": "pulse", "value": "72", "unit": "bpm"})).unwrap();
        assert_eq!(vital.kind, "pulse");
        assert_eq!(serde_json::to_value(&vital).unwrap()["type"], "pulse");
    }
}
