//! Boundary to the OCR and LLM collaborators.
//!
//! The collaborators themselves live outside this crate. What is here is the
//! contract they are called through, the cleanup of their replies and the
//! per-job pipeline that ties a template to an uploaded file.

use serde::{Deserialize, Serialize};

use crate::normalizer::FieldNormalizer;
use crate::rules::RuleBook;
use crate::semantic::{ExtractedFieldSet, Template};

/// Text the pipeline continues on when OCR fails.
pub const OCR_FALLBACK_TEXT: &str = "OCR failed; no text could be extracted from the uploaded file.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrOutput {
    pub text: String,
    pub token_count: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Field extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Malformed extraction response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("Extraction response is not a JSON object")]
    NotAnObject,
}

pub trait TextExtractor {
    fn extract_text(&self, file: &[u8]) -> Result<OcrOutput, CollaboratorError>;
}

pub trait FieldExtractor {
    /// Raw reply for `text`, expected to be a JSON object keyed by
    /// `field_names`, possibly wrapped in a code fence.
    fn extract_fields(&self, text: &str, field_names: &[String]) -> Result<String, CollaboratorError>;
}

/// Removes a surrounding Markdown code fence (with or without a language tag).
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parses an extraction reply into an ordered field set.
///
/// With `allowed`, keys outside the list are dropped and logged. Corrupted
/// keys are kept for the normalizer to deal with.
pub fn parse_field_response(raw: &str, allowed: Option<&[String]>) -> Result<ExtractedFieldSet, CollaboratorError> {
    let body = strip_code_fences(raw);
    let value: serde_json::Value = serde_json::from_str(body)?;
    if !value.is_object() {
        return Err(CollaboratorError::NotAnObject);
    }
    // a second pass keeps the reply's key order
    let parsed: ExtractedFieldSet = serde_json::from_str(body)?;

    let mut set = ExtractedFieldSet::new();
    for (key, value) in parsed.iter() {
        let outside = allowed.is_some_and(|names| !key.starts_with('_') && !names.contains(key));
        if outside {
            tracing::warn!(field = %key, "extraction returned a field outside the requested list");
            continue;
        }
        set.insert(key.clone(), value.clone());
    }
    Ok(set)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Pending,
    Completed,
    Failed(String),
}

/// One uploaded file processed against one template.
#[derive(Debug, Clone, Default)]
pub struct ProcessingJob {
    pub id: String,
    pub template_id: String,
    pub status: JobStatus,
    pub ocr_text: String,
    pub used_ocr_fallback: bool,
    pub fields: ExtractedFieldSet,
}

impl ProcessingJob {
    pub fn new(id: impl Into<String>, template: &Template) -> Self {
        Self {
            id: id.into(),
            template_id: template.id().to_string(),
            ..Self::default()
        }
    }

    /// OCR, extraction and normalization for `file`. Only the template's
    /// own field names are kept.
    ///
    /// An OCR failure is survivable: the job goes on with
    /// [`OCR_FALLBACK_TEXT`]. An extraction failure marks the job failed and
    /// leaves the field set empty.
    pub fn run<O, L>(&mut self, template: &Template, file: &[u8], ocr: &O, llm: &L, rules: &RuleBook) -> &JobStatus
    where
        O: TextExtractor + ?Sized,
        L: FieldExtractor + ?Sized,
    {
        match ocr.extract_text(file) {
            Ok(output) => {
                tracing::debug!(job = %self.id, tokens = output.token_count, "OCR finished");
                self.ocr_text = output.text;
                self.used_ocr_fallback = false;
            }
            Err(e) => {
                tracing::warn!(job = %self.id, error = %e, "OCR failed, continuing on fallback text");
                self.ocr_text = OCR_FALLBACK_TEXT.to_string();
                self.used_ocr_fallback = true;
            }
        }

        let field_names = template.field_names();
        let parsed = llm
            .extract_fields(&self.ocr_text, &field_names)
            .and_then(|raw| parse_field_response(&raw, Some(field_names.as_slice())));

        match parsed {
            Ok(raw_fields) => {
                let aux = (!self.used_ocr_fallback).then_some(self.ocr_text.as_str());
                let normalized = FieldNormalizer::new(rules).normalize(&raw_fields, aux);
                // repaired aliases may name fields the template never asked for
                self.fields = normalized
                    .iter()
                    .filter(|(name, _)| {
                        let requested = field_names.contains(*name);
                        if !requested {
                            tracing::debug!(job = %self.id, field = %name, "dropping unrequested field");
                        }
                        requested
                    })
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect();
                self.status = JobStatus::Completed;
            }
            Err(e) => {
                tracing::warn!(job = %self.id, error = %e, "field extraction failed");
                self.fields = ExtractedFieldSet::new();
                self.status = JobStatus::Failed(e.to_string());
            }
        }

        &self.status
    }
}
