//! note2fhir-core: clinical note entity graph and FHIR mapping
//!
//! This crate holds the IO-free parts of the pipeline: the entity graph,
//! normalization of language-model output into it, and the rule-based
//! mapping of an enriched graph into a FHIR collection Bundle.

pub mod bundle;
pub mod error;
pub mod mapper;
pub mod normalize;
pub mod note;
pub mod outcome;
pub mod resources;

pub use bundle::{Bundle, BundleEntry, BundleType};
pub use error::NoteError;
pub use mapper::to_bundle;
pub use normalize::{normalize, strip_code_fence, validate};
pub use note::{Condition, LabResult, Medication, PatientInfo, PlanItem, StructuredNote, VitalSign};
pub use outcome::{IssueSeverity, IssueType, OperationOutcome, OperationOutcomeIssue};
pub use resources::Resource;
