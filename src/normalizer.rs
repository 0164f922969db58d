//! Canonicalisation of extracted field sets.
//!
//! Upstream extraction sometimes returns keys that an earlier templating pass
//! mangled (`_ph__5085_`). Those are mapped back to canonical names, or
//! dropped when unknown. Running the normalizer on its own output changes
//! nothing.

use crate::rules::RuleBook;
use crate::semantic::{ExtractedFieldSet, FieldValue};

/// Leading character of every mangled key.
pub const CORRUPTION_SENTINEL: char = '_';

#[derive(Debug, Clone, Copy)]
pub struct FieldNormalizer<'a> {
    rules: &'a RuleBook,
}

impl<'a> FieldNormalizer<'a> {
    pub fn new(rules: &'a RuleBook) -> Self {
        Self { rules }
    }

    /// Canonical copy of `raw`. `aux_text` is the raw OCR text, used to
    /// recover derivable fields the extraction missed.
    pub fn normalize(&self, raw: &ExtractedFieldSet, aux_text: Option<&str>) -> ExtractedFieldSet {
        let mut canonical = ExtractedFieldSet::new();

        for (key, value) in raw.iter() {
            if !key.starts_with(CORRUPTION_SENTINEL) {
                canonical.insert(key.clone(), value.clone());
            }
        }

        for (key, value) in raw.iter() {
            if !key.starts_with(CORRUPTION_SENTINEL) {
                continue;
            }
            match self.rules.canonical_for_alias(key) {
                Some(name) if !canonical.contains_key(name) => {
                    canonical.insert(name, value.clone());
                }
                Some(name) => {
                    tracing::debug!(key = %key, canonical = name, "corrupted key shadowed by canonical key");
                }
                None => {
                    tracing::debug!(key = %key, "dropping unmapped corrupted key");
                }
            }
        }

        self.coerce_booleans(&mut canonical);

        if let Some(text) = aux_text {
            self.backfill(&mut canonical, text);
        }

        canonical
    }

    fn coerce_booleans(&self, set: &mut ExtractedFieldSet) {
        for field in self.rules.fields() {
            let Some((positive, negative)) = &field.boolean_labels else {
                continue;
            };
            if let Some(FieldValue::Bool(flag)) = set.get(&field.name) {
                let label = if *flag { positive } else { negative };
                set.insert(field.name.clone(), label.clone());
            }
        }
    }

    fn backfill(&self, set: &mut ExtractedFieldSet, text: &str) {
        for field in self.rules.fields() {
            let Some(pattern) = &field.backfill else {
                continue;
            };
            let missing = set.get(&field.name).is_none_or(FieldValue::is_empty);
            if !missing {
                continue;
            }
            if let Some(found) = pattern.captures(text).and_then(|caps| caps.get(1)) {
                tracing::debug!(field = %field.name, value = found.as_str(), "backfilled from OCR text");
                set.insert(field.name.clone(), found.as_str().trim());
            }
        }
    }
}
