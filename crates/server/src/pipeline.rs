//! Note processing pipeline: model → normalize → enrich → map

use std::sync::Arc;

use note2fhir_core::{Bundle, NoteError, StructuredNote, normalize, to_bundle};
use thiserror::Error;

use crate::ai::prompts::{
    STRUCTURING_SYSTEM_PROMPT, SUMMARY_SYSTEM_PROMPT, structuring_user_prompt, summary_user_prompt,
};
use crate::ai::{ClaudeClient, CompletionModel, LlmError, TokenUsage};
use crate::config::Config;
use crate::terminology::{EnrichmentReport, Enricher, Icd10Client, RxNormClient, client::http_client};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("note text is empty")]
    EmptyNote,

    #[error("language model is not configured")]
    LlmUnavailable,

    #[error("language model call failed: {0}")]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Note(#[from] NoteError),
}

/// Structured, enriched output for one note
#[derive(Debug, Clone)]
pub struct Extraction {
    pub structured: StructuredNote,
    pub enrichment: EnrichmentReport,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone)]
pub struct Summary {
    pub text: String,
    pub usage: TokenUsage,
}

/// Everything the full workflow produces for one note
#[derive(Debug, Clone)]
pub struct WorkflowOutput {
    pub summary: String,
    pub structured: StructuredNote,
    pub fhir: Bundle,
    pub usage: TokenUsage,
}

#[derive(Clone)]
pub struct NotePipeline {
    llm: Option<Arc<dyn CompletionModel>>,
    enricher: Enricher,
    structure_retries: u32,
}

impl NotePipeline {
    pub fn new(llm: Option<Arc<dyn CompletionModel>>, enricher: Enricher) -> Self {
        Self {
            llm,
            enricher,
            structure_retries: 0,
        }
    }

    /// Re-ask the model up to `retries` more times when its output does not normalize
    pub fn with_structure_retries(mut self, retries: u32) -> Self {
        self.structure_retries = retries;
        self
    }

    /// Wire up the real model and terminology clients
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let llm = match &config.anthropic_api_key {
            Some(key) => {
                let client = ClaudeClient::new(
                    key.clone(),
                    &config.anthropic_base_url,
                    config.llm_model.clone(),
                    config.llm_timeout(),
                )?;
                Some(Arc::new(client) as Arc<dyn CompletionModel>)
            }
            None => None,
        };

        let http = http_client(config.lookup_timeout())?;
        let enricher = Enricher::new(
            Arc::new(Icd10Client::new(http.clone(), config.icd10_url.clone())),
            Arc::new(RxNormClient::new(http, config.rxnorm_url.clone())),
            config.lookup_concurrency,
            config.lookup_timeout(),
        );

        Ok(Self::new(llm, enricher).with_structure_retries(config.structure_retries))
    }

    pub fn llm_configured(&self) -> bool {
        self.llm.is_some()
    }

    fn model(&self) -> Result<&dyn CompletionModel, PipelineError> {
        self.llm.as_deref().ok_or(PipelineError::LlmUnavailable)
    }

    /// Ask the model for the note's structure and normalize the answer
    async fn structure(&self, note: &str) -> Result<(StructuredNote, TokenUsage), PipelineError> {
        let llm = self.model()?;
        let prompt = structuring_user_prompt(note);
        let mut usage = TokenUsage::default();

        let mut attempt = 0;
        loop {
            let completion = llm.complete(STRUCTURING_SYSTEM_PROMPT, &prompt).await?;
            usage += completion.usage;

            match normalize(&completion.text) {
                Ok(structured) => return Ok((structured, usage)),
                Err(e) if attempt < self.structure_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "Model output did not normalize, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Structure a note and enrich it with terminology codes
    pub async fn extract(&self, note: &str) -> Result<Extraction, PipelineError> {
        let note = non_blank(note)?;
        let (structured, usage) = self.structure(note).await?;

        tracing::info!(
            conditions = structured.conditions.len(),
            medications = structured.medications.len(),
            vitals = structured.vitals.len(),
            labs = structured.labs.len(),
            plan = structured.plan.len(),
            "Note structured"
        );

        let (structured, enrichment) = self.enricher.enrich(structured).await;
        Ok(Extraction {
            structured,
            enrichment,
            usage,
        })
    }

    /// Short bullet summary of a note
    pub async fn summarize(&self, note: &str) -> Result<Summary, PipelineError> {
        let note = non_blank(note)?;
        let completion = self
            .model()?
            .complete(SUMMARY_SYSTEM_PROMPT, &summary_user_prompt(note))
            .await?;
        Ok(Summary {
            text: completion.text.trim().to_string(),
            usage: completion.usage,
        })
    }

    /// Summary plus extraction, mapped to a Bundle
    pub async fn run(&self, note: &str) -> Result<WorkflowOutput, PipelineError> {
        let note = non_blank(note)?;
        let (summary, extraction) = tokio::try_join!(self.summarize(note), self.extract(note))?;

        let fhir = to_bundle(&extraction.structured)?;

        let mut usage = summary.usage;
        usage += extraction.usage;

        Ok(WorkflowOutput {
            summary: summary.text,
            structured: extraction.structured,
            fhir,
            usage,
        })
    }
}

fn non_blank(note: &str) -> Result<&str, PipelineError> {
    let note = note.trim();
    if note.is_empty() {
        return Err(PipelineError::EmptyNote);
    }
    Ok(note)
}
