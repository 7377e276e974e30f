//! FHIR-like resource records emitted by the mapper
//!
//! These are deliberately thin: only the elements the mapper fills in are
//! modelled, and field order is the serialized order.

use serde::{Deserialize, Serialize};

/// A resource inside a bundle, tagged by `resourceType`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "resourceType")]
pub enum Resource {
    Patient(Patient),
    Condition(Condition),
    MedicationRequest(MedicationRequest),
    Observation(Observation),
    CarePlan(CarePlan),
}

impl Resource {
    pub fn id(&self) -> &str {
        match self {
            Resource::Patient(r) => &r.id,
            Resource::Condition(r) => &r.id,
            Resource::MedicationRequest(r) => &r.id,
            Resource::Observation(r) => &r.id,
            Resource::CarePlan(r) => &r.id,
        }
    }

    pub fn resource_type(&self) -> &'static str {
        match self {
            Resource::Patient(_) => "Patient",
            Resource::Condition(_) => "Condition",
            Resource::MedicationRequest(_) => "MedicationRequest",
            Resource::Observation(_) => "Observation",
            Resource::CarePlan(_) => "CarePlan",
        }
    }
}

/// FHIR administrative gender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AdministrativeGender {
    Male,
    Female,
    Other,
    Unknown,
}

impl AdministrativeGender {
    /// Case-insensitive exact match; anything else is `Unknown`
    pub fn from_free_text(text: &str) -> Self {
        match text.to_lowercase().as_str() {
            "male" => Self::Male,
            "female" => Self::Female,
            "other" => Self::Other,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reference {
    pub reference: String,
}

impl Reference {
    pub fn to(resource_type: &str, id: &str) -> Self {
        Self {
            reference: format!("{resource_type}/{id}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Coding {
    pub system: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeableConcept {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,
}

impl CodeableConcept {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            coding: Vec::new(),
        }
    }

    /// Attach a coding unless the code is absent or empty
    pub fn with_code(mut self, system: &str, code: Option<&str>) -> Self {
        if let Some(code) = code.filter(|c| !c.is_empty()) {
            self.coding.push(Coding {
                system: system.to_string(),
                code: code.to_string(),
            });
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HumanName {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub url: String,
    pub value_integer: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dosage {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<AdministrativeGender>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension: Vec<Extension>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub id: String,
    pub subject: Reference,
    pub clinical_status: CodeableConcept,
    pub verification_status: CodeableConcept,
    pub code: CodeableConcept,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRequest {
    pub id: String,
    pub subject: Reference,
    pub status: String,
    pub intent: String,
    pub medication_codeable_concept: CodeableConcept,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dosage_instruction: Vec<Dosage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: String,
    pub status: String,
    pub subject: Reference,
    pub code: CodeableConcept,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_string: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CarePlan {
    pub id: String,
    pub subject: Reference,
    pub status: String,
    pub intent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
