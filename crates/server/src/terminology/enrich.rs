//! Concurrent, fail-soft code enrichment of a [`StructuredNote`]

use std::sync::Arc;
use std::time::Duration;

use note2fhir_core::StructuredNote;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::{LookupError, TerminologyLookup};

/// Result of looking up one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(String),
    /// The service answered but had no match (or the name was blank)
    NoMatch,
    /// The lookup failed; the reason is for logs only
    Failed(String),
}

impl LookupOutcome {
    pub fn code(&self) -> Option<&str> {
        match self {
            LookupOutcome::Found(code) => Some(code),
            LookupOutcome::NoMatch | LookupOutcome::Failed(_) => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            LookupOutcome::Found(_) => "found",
            LookupOutcome::NoMatch => "no_match",
            LookupOutcome::Failed(_) => "failed",
        }
    }
}

/// Per-entity outcomes, index-aligned with the note's lists
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub conditions: Vec<LookupOutcome>,
    pub medications: Vec<LookupOutcome>,
}

impl EnrichmentReport {
    fn all(&self) -> impl Iterator<Item = &LookupOutcome> {
        self.conditions.iter().chain(&self.medications)
    }

    pub fn found(&self) -> usize {
        self.all().filter(|o| matches!(o, LookupOutcome::Found(_))).count()
    }

    pub fn failed(&self) -> usize {
        self.all().filter(|o| matches!(o, LookupOutcome::Failed(_))).count()
    }
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Condition(usize),
    Medication(usize),
}

type LookupTasks = JoinSet<(Target, LookupOutcome)>;

/// Fills `icd10_code` on conditions and `rxnorm_code` on medications
#[derive(Clone)]
pub struct Enricher {
    icd10: Arc<dyn TerminologyLookup>,
    rxnorm: Arc<dyn TerminologyLookup>,
    concurrency: usize,
    timeout: Duration,
}

impl Enricher {
    pub fn new(
        icd10: Arc<dyn TerminologyLookup>,
        rxnorm: Arc<dyn TerminologyLookup>,
        concurrency: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            icd10,
            rxnorm,
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    /// Look up every condition and medication and write the codes back.
    ///
    /// Never fails: each entity ends up with a code or `None`. Lookups run
    /// as independent tasks, at most `concurrency` at a time; dropping the
    /// returned future aborts any still in flight.
    pub async fn enrich(&self, mut note: StructuredNote) -> (StructuredNote, EnrichmentReport) {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = LookupTasks::new();

        // `None` means not looked up yet
        let mut conditions: Vec<Option<LookupOutcome>> = vec![None; note.conditions.len()];
        let mut medications: Vec<Option<LookupOutcome>> = vec![None; note.medications.len()];

        for (i, condition) in note.conditions.iter().enumerate() {
            if condition.name.trim().is_empty() {
                conditions[i] = Some(LookupOutcome::NoMatch);
            } else {
                self.spawn_lookup(&mut tasks, &permits, Target::Condition(i), &self.icd10, &condition.name);
            }
        }
        for (i, medication) in note.medications.iter().enumerate() {
            if medication.name.trim().is_empty() {
                medications[i] = Some(LookupOutcome::NoMatch);
            } else {
                self.spawn_lookup(&mut tasks, &permits, Target::Medication(i), &self.rxnorm, &medication.name);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((Target::Condition(i), outcome)) => conditions[i] = Some(outcome),
                Ok((Target::Medication(i), outcome)) => medications[i] = Some(outcome),
                Err(e) => tracing::error!(error = %e, "Terminology lookup task did not finish"),
            }
        }

        let report = EnrichmentReport {
            conditions: conditions.into_iter().map(settle).collect(),
            medications: medications.into_iter().map(settle).collect(),
        };

        for (condition, outcome) in note.conditions.iter_mut().zip(&report.conditions) {
            condition.icd10_code = outcome.code().map(str::to_string);
        }
        for (medication, outcome) in note.medications.iter_mut().zip(&report.medications) {
            medication.rxnorm_code = outcome.code().map(str::to_string);
        }

        tracing::info!(
            conditions = report.conditions.len(),
            medications = report.medications.len(),
            found = report.found(),
            failed = report.failed(),
            "Terminology enrichment finished"
        );

        (note, report)
    }

    fn spawn_lookup(
        &self,
        tasks: &mut LookupTasks,
        permits: &Arc<Semaphore>,
        target: Target,
        service: &Arc<dyn TerminologyLookup>,
        term: &str,
    ) {
        let service = Arc::clone(service);
        let permits = Arc::clone(permits);
        let term = term.to_string();
        let timeout = self.timeout;

        tasks.spawn(async move {
            let outcome = match permits.acquire_owned().await {
                Ok(_permit) => lookup_once(service.as_ref(), &term, timeout).await,
                Err(_) => LookupOutcome::Failed("lookup limiter closed".to_string()),
            };
            (target, outcome)
        });
    }
}

/// A panicked or aborted task still yields a definite outcome
fn settle(outcome: Option<LookupOutcome>) -> LookupOutcome {
    outcome.unwrap_or_else(|| LookupOutcome::Failed("lookup did not complete".to_string()))
}

async fn lookup_once(service: &dyn TerminologyLookup, term: &str, timeout: Duration) -> LookupOutcome {
    let result = match tokio::time::timeout(timeout, service.lookup(term)).await {
        Ok(result) => result,
        Err(_) => Err(LookupError::Timeout(timeout)),
    };

    let outcome = match result {
        Ok(Some(code)) => {
            tracing::debug!(system = service.system(), term, code = %code, "Terminology match");
            LookupOutcome::Found(code)
        }
        Ok(None) => {
            tracing::debug!(system = service.system(), term, "No terminology match");
            LookupOutcome::NoMatch
        }
        Err(e) => {
            tracing::warn!(system = service.system(), term, error = %e, "Terminology lookup failed");
            LookupOutcome::Failed(e.to_string())
        }
    };

    metrics::counter!(
        "terminology_lookups_total",
        "system" => service.system(),
        "outcome" => outcome.label()
    )
    .increment(1);

    outcome
}
