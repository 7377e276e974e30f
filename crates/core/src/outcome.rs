use serde::{Deserialize, Serialize};

/// Severity of the issue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Fatal,
    Error,
}

/// Type of issue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum IssueType {
    Invalid,
    Structure,
    Invariant,
    Processing,
    Throttled,
    Transient,
}

/// FHIR OperationOutcome, used for every error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    pub resource_type: String,
    pub issue: Vec<OperationOutcomeIssue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationOutcomeIssue {
    pub severity: IssueSeverity,
    pub code: IssueType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
    /// Paths of the offending elements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expression: Vec<String>,
}

impl OperationOutcome {
    fn single(issue: OperationOutcomeIssue) -> Self {
        Self {
            resource_type: "OperationOutcome".to_string(),
            issue: vec![issue],
        }
    }

    /// Error-severity outcome with the given issue type
    pub fn error(code: IssueType, diagnostics: &str) -> Self {
        Self::single(OperationOutcomeIssue {
            severity: IssueSeverity::Error,
            code,
            diagnostics: Some(diagnostics.to_string()),
            expression: Vec::new(),
        })
    }

    pub fn invalid(diagnostics: &str) -> Self {
        Self::error(IssueType::Invalid, diagnostics)
    }

    /// Structural problem located at `path`
    pub fn structure(path: &str, diagnostics: &str) -> Self {
        Self::single(OperationOutcomeIssue {
            severity: IssueSeverity::Error,
            code: IssueType::Structure,
            diagnostics: Some(diagnostics.to_string()),
            expression: vec![path.to_string()],
        })
    }

    /// Invariant violation inside the server itself
    pub fn fatal(diagnostics: &str) -> Self {
        Self::single(OperationOutcomeIssue {
            severity: IssueSeverity::Fatal,
            code: IssueType::Invariant,
            diagnostics: Some(diagnostics.to_string()),
            expression: Vec::new(),
        })
    }
}
