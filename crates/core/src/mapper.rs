//! Rule-based mapping from a [`StructuredNote`] to a FHIR collection Bundle
//!
//! Output order is Patient, Conditions, MedicationRequests, Observations
//! (vitals then labs), CarePlan. Ids are synthesized per note, so the same
//! input always yields the same bundle.

use crate::bundle::Bundle;
use crate::error::NoteError;
use crate::note::{LabResult, Medication, PatientInfo, PlanItem, StructuredNote, VitalSign};
use crate::resources::{
    self as fhir, AdministrativeGender, CodeableConcept, Dosage, Extension, HumanName, Reference,
    Resource,
};

pub const PATIENT_ID: &str = "patient-1";
pub const CAREPLAN_ID: &str = "careplan-1";
pub const ICD10_CM_SYSTEM: &str = "http://hl7.org/fhir/sid/icd-10-cm";
pub const RXNORM_SYSTEM: &str = "http://www.nlm.nih.gov/research/umls/rxnorm";
pub const PATIENT_AGE_EXTENSION: &str = "http://hl7.org/fhir/StructureDefinition/patient-age";

const PLAN_SEPARATOR: &str = " | ";

/// Map a note to a Bundle.
///
/// Fails only with [`NoteError::Mapping`] when a required name is blank,
/// which the normalizer already rejects.
pub fn to_bundle(note: &StructuredNote) -> Result<Bundle, NoteError> {
    let mut resources = Vec::with_capacity(
        1 + note.conditions.len() + note.medications.len() + note.vitals.len() + note.labs.len() + 1,
    );

    resources.push(Resource::Patient(patient(note.patient.as_ref())));

    for (n, condition) in note.conditions.iter().enumerate() {
        let name = required("condition name", &condition.name)?;
        resources.push(Resource::Condition(fhir::Condition {
            id: format!("condition-{}", n + 1),
            subject: subject(),
            clinical_status: CodeableConcept::text("active"),
            verification_status: CodeableConcept::text("confirmed"),
            code: CodeableConcept::text(name)
                .with_code(ICD10_CM_SYSTEM, condition.icd10_code.as_deref()),
        }));
    }

    for (n, medication) in note.medications.iter().enumerate() {
        resources.push(Resource::MedicationRequest(medication_request(n + 1, medication)?));
    }

    // One counter spans vitals and labs
    let mut observation_no = 0usize;
    for vital in &note.vitals {
        observation_no += 1;
        resources.push(Resource::Observation(vital_observation(observation_no, vital)?));
    }
    for lab in &note.labs {
        observation_no += 1;
        resources.push(Resource::Observation(lab_observation(observation_no, lab)?));
    }

    if !note.plan.is_empty() {
        resources.push(Resource::CarePlan(care_plan(&note.plan)));
    }

    Ok(Bundle::collection(resources))
}

fn subject() -> Reference {
    Reference::to("Patient", PATIENT_ID)
}

fn required<'a>(what: &str, text: &'a str) -> Result<&'a str, NoteError> {
    if text.trim().is_empty() {
        return Err(NoteError::Mapping(format!("{what} is blank")));
    }
    Ok(text)
}

fn present(text: &Option<String>) -> Option<&str> {
    text.as_deref().filter(|s| !s.is_empty())
}

fn patient(info: Option<&PatientInfo>) -> fhir::Patient {
    let mut patient = fhir::Patient {
        id: PATIENT_ID.to_string(),
        name: Vec::new(),
        gender: None,
        extension: Vec::new(),
    };

    let Some(info) = info else {
        return patient;
    };

    if let Some(name) = present(&info.name) {
        patient.name.push(HumanName {
            text: name.to_string(),
        });
    }
    if let Some(sex) = present(&info.sex) {
        patient.gender = Some(AdministrativeGender::from_free_text(sex));
    }
    // No birth date in the graph, so age travels as an extension
    if let Some(age) = info.age {
        patient.extension.push(Extension {
            url: PATIENT_AGE_EXTENSION.to_string(),
            value_integer: age,
        });
    }
    patient
}

fn medication_request(n: usize, medication: &Medication) -> Result<fhir::MedicationRequest, NoteError> {
    let name = required("medication name", &medication.name)?;

    // Route is not part of the dosage text
    let parts: Vec<&str> = [present(&medication.dose), present(&medication.frequency)]
        .into_iter()
        .flatten()
        .collect();
    let dosage_instruction = if parts.is_empty() {
        Vec::new()
    } else {
        vec![Dosage {
            text: parts.join(" "),
        }]
    };

    Ok(fhir::MedicationRequest {
        id: format!("medreq-{n}"),
        subject: subject(),
        status: "active".to_string(),
        intent: "order".to_string(),
        medication_codeable_concept: CodeableConcept::text(name)
            .with_code(RXNORM_SYSTEM, medication.rxnorm_code.as_deref()),
        dosage_instruction,
    })
}

fn vital_observation(n: usize, vital: &VitalSign) -> Result<fhir::Observation, NoteError> {
    let kind = required("vital sign type", &vital.kind)?;
    Ok(observation(
        format!("observation-vital-{n}"),
        kind,
        Some(&vital.value),
        &vital.unit,
    ))
}

fn lab_observation(n: usize, lab: &LabResult) -> Result<fhir::Observation, NoteError> {
    let name = required("lab name", &lab.name)?;
    Ok(observation(
        format!("observation-lab-{n}"),
        name,
        lab.value.as_ref(),
        &lab.unit,
    ))
}

fn observation(
    id: String,
    display: &str,
    value: Option<&String>,
    unit: &Option<String>,
) -> fhir::Observation {
    let value_string = value.map(|value| match present(unit) {
        Some(unit) => format!("{value} {unit}"),
        None => value.clone(),
    });

    fhir::Observation {
        id,
        status: "final".to_string(),
        subject: subject(),
        code: CodeableConcept::text(display),
        value_string,
    }
}

fn care_plan(plan: &[PlanItem]) -> fhir::CarePlan {
    let descriptions: Vec<&str> = plan
        .iter()
        .map(|item| item.description.as_str())
        .filter(|d| !d.is_empty())
        .collect();

    fhir::CarePlan {
        id: CAREPLAN_ID.to_string(),
        subject: subject(),
        status: "active".to_string(),
        intent: "plan".to_string(),
        description: (!descriptions.is_empty()).then(|| descriptions.join(PLAN_SEPARATOR)),
    }
}
