use serde::{Deserialize, Serialize};

use crate::resources::Resource;

/// FHIR Bundle types; notes are always mapped to a collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BundleType {
    Collection,
}

/// FHIR Bundle resource (simplified)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: String,

    #[serde(rename = "type")]
    pub bundle_type: BundleType,

    pub entry: Vec<BundleEntry>,
}

/// A single bundle entry wrapping one resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    pub resource: Resource,
}

impl BundleEntry {
    pub fn new(resource: Resource) -> Self {
        Self { resource }
    }
}

impl Bundle {
    /// Create a collection bundle, keeping entries in the given order
    pub fn collection(resources: Vec<Resource>) -> Self {
        Self {
            resource_type: "Bundle".to_string(),
            bundle_type: BundleType::Collection,
            entry: resources.into_iter().map(BundleEntry::new).collect(),
        }
    }

    /// Iterate over the wrapped resources
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.entry.iter().map(|e| &e.resource)
    }
}
