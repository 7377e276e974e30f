//! HTTP clients for the NLM terminology services

use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value as JsonValue;

use super::{LookupError, TerminologyLookup};

/// Build the HTTP client shared by the lookup clients.
///
/// Idle connections are not kept, so nothing carries over between notes.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(0)
        .user_agent(concat!("note2fhir/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// ICD-10-CM search via `clinicaltables.nlm.nih.gov/api/icd10cm/v3/search`
#[derive(Clone)]
pub struct Icd10Client {
    http: reqwest::Client,
    url: String,
}

impl Icd10Client {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    /// Best ICD-10-CM code for a condition name
    pub async fn search(&self, term: &str) -> Result<Option<String>, LookupError> {
        let request = self
            .http
            .get(&self.url)
            .query(&[("sf", "code,name"), ("terms", term), ("maxList", "1")]);
        let body = get_json(request).await?;
        parse_icd10_response(&body)
    }
}

impl TerminologyLookup for Icd10Client {
    fn system(&self) -> &'static str {
        "icd10cm"
    }

    fn lookup<'a>(&'a self, term: &'a str) -> BoxFuture<'a, Result<Option<String>, LookupError>> {
        self.search(term).boxed()
    }
}

/// RxNorm concept lookup via `rxnav.nlm.nih.gov/REST/rxcui.json`
#[derive(Clone)]
pub struct RxNormClient {
    http: reqwest::Client,
    url: String,
}

impl RxNormClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    /// RxCUI for a medication name
    pub async fn search(&self, term: &str) -> Result<Option<String>, LookupError> {
        let request = self.http.get(&self.url).query(&[("name", term)]);
        let body = get_json(request).await?;
        parse_rxnorm_response(&body)
    }
}

impl TerminologyLookup for RxNormClient {
    fn system(&self) -> &'static str {
        "rxnorm"
    }

    fn lookup<'a>(&'a self, term: &'a str) -> BoxFuture<'a, Result<Option<String>, LookupError>> {
        self.search(term).boxed()
    }
}

async fn get_json(request: reqwest::RequestBuilder) -> Result<JsonValue, LookupError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(LookupError::Status(status.as_u16()));
    }
    Ok(response.json().await?)
}

/// Read the first code from a Clinical Tables response.
///
/// The body is `[total, codes, extra, [[code, name], ...]]`.
pub fn parse_icd10_response(body: &JsonValue) -> Result<Option<String>, LookupError> {
    let pairs = body
        .get(3)
        .and_then(JsonValue::as_array)
        .ok_or(LookupError::Shape("no [code, name] list at index 3"))?;

    let Some(first) = pairs.first() else {
        return Ok(None);
    };

    let code = first
        .get(0)
        .and_then(JsonValue::as_str)
        .ok_or(LookupError::Shape("first pair has no string code"))?;

    Ok(non_empty(code))
}

/// Read the first RxCUI from an RxNav response.
///
/// The body is `{"idGroup": {"rxnormId": ["..."]}}`; RxNav omits
/// `rxnormId` when nothing matched.
pub fn parse_rxnorm_response(body: &JsonValue) -> Result<Option<String>, LookupError> {
    let body = body
        .as_object()
        .ok_or(LookupError::Shape("expected a JSON object"))?;

    let Some(ids) = body.get("idGroup").and_then(|group| group.get("rxnormId")) else {
        return Ok(None);
    };

    let ids = ids
        .as_array()
        .ok_or(LookupError::Shape("rxnormId is not a list"))?;

    match ids.first() {
        None => Ok(None),
        Some(id) => id
            .as_str()
            .map(non_empty)
            .ok_or(LookupError::Shape("rxnormId entry is not a string")),
    }
}

fn non_empty(code: &str) -> Option<String> {
    (!code.is_empty()).then(|| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn icd10_first_pair_code() {
        let body = json!([2, ["I10", "I15.0"], null, [["I10", "Essential (primary) hypertension"]]]);
        assert_eq!(parse_icd10_response(&body).unwrap().as_deref(), Some("I10"));
    }

    #[test]
    fn icd10_empty_result_is_no_match() {
        assert_eq!(parse_icd10_response(&json!([0, [], null, []])).unwrap(), None);
    }

    #[test]
    fn icd10_malformed_body_is_an_error() {
        assert!(parse_icd10_response(&json!({"error": "bad"})).is_err());
        assert!(parse_icd10_response(&json!([1, ["I10"], null])).is_err());
        assert!(parse_icd10_response(&json!([1, ["I10"], null, [[10]]])).is_err());
    }

    #[test]
    fn rxnorm_first_id() {
        let body = json!({"idGroup": {"name": "lisinopril", "rxnormId": ["29046", "1"]}});
        assert_eq!(parse_rxnorm_response(&body).unwrap().as_deref(), Some("29046"));
    }

    #[test]
    fn codes_are_returned_verbatim() {
        let body = json!([1, [" I10 "], null, [[" I10 ", "Essential (primary) hypertension"]]]);
        assert_eq!(parse_icd10_response(&body).unwrap().as_deref(), Some(" I10 "));

        let body = json!({"idGroup": {"rxnormId": ["29046\n"]}});
        assert_eq!(parse_rxnorm_response(&body).unwrap().as_deref(), Some("29046\n"));

        assert_eq!(parse_icd10_response(&json!([1, [""], null, [["", "x"]]])).unwrap(), None);
    }

    #[test]
    fn rxnorm_missing_ids_is_no_match() {
        assert_eq!(parse_rxnorm_response(&json!({"idGroup": {"name": "zzz"}})).unwrap(), None);
        assert_eq!(parse_rxnorm_response(&json!({})).unwrap(), None);
        assert_eq!(parse_rxnorm_response(&json!({"idGroup": {"rxnormId": []}})).unwrap(), None);
    }

    #[test]
    fn rxnorm_malformed_body_is_an_error() {
        assert!(parse_rxnorm_response(&json!([])).is_err());
        assert!(parse_rxnorm_response(&json!({"idGroup": {"rxnormId": "29046"}})).is_err());
    }
}
