use std::collections::HashSet;

use regex::Regex;

use crate::rules::RuleBook;
use crate::semantic::{ExtractedFieldSet, FieldValue};
use crate::utility::spaced;

pub const PATTERN_SCORE: u32 = 100;
pub const TOKEN_SCORE: u32 = 20;
pub const NEGATIVE_RESULT_SCORE: u32 = 15;
pub const NUMERIC_SCORE: u32 = 10;
pub const DATE_SCORE: u32 = 25;

/// Relevance of an extracted field to the text around a slot.
#[derive(Debug)]
pub struct ContextScorer<'a> {
    rules: &'a RuleBook,
    negative_result: Regex,
    date_token: Regex,
    date_keyword: Regex,
}

impl<'a> ContextScorer<'a> {
    pub fn new(rules: &'a RuleBook) -> Self {
        Self {
            rules,
            negative_result: Regex::new(r"(?i)\b(?:negative|absent|not\s+detected|nil|none|free\s+from)\b")
                .unwrap(),
            date_token: Regex::new(
                r"(?i)\b\d{1,4}[-/.]\d{1,2}[-/.]\d{1,4}\b|\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?\s+\d{2,4}\b|\b\d{1,2}\s+(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\b",
            )
            .unwrap(),
            date_keyword: Regex::new(r"(?i)date|manufactur|expir|retest|\bmfg\b|\bexp\b").unwrap(),
        }
    }

    /// Additive score; 0 means the field has nothing to do with the context.
    pub fn score(&self, context: &str, field: &str, value: &FieldValue) -> u32 {
        let mut score = 0;

        for rule in self.rules.semantic_rules() {
            if rule.covers(field) && rule.pattern.is_match(context) {
                score += PATTERN_SCORE;
            }
        }

        let lowered = context.to_lowercase();
        let cleaned = spaced(&field.to_lowercase());
        for token in cleaned.split_whitespace() {
            if token.chars().count() > 2 && lowered.contains(token) {
                score += TOKEN_SCORE;
            }
        }

        match value {
            FieldValue::Bool(_) if self.negative_result.is_match(context) => {
                score += NEGATIVE_RESULT_SCORE;
            }
            FieldValue::Number(_) if context.chars().any(|c| c.is_ascii_digit() || c == '%') => {
                score += NUMERIC_SCORE;
            }
            FieldValue::String(s) if self.date_token.is_match(s) && self.date_keyword.is_match(context) => {
                score += DATE_SCORE;
            }
            _ => {}
        }

        score
    }

    /// Best field for `context` among those not in `exclude`.
    ///
    /// The strictly highest score wins; on ties the earlier field in set order
    /// stays. `None` when every candidate scores 0.
    pub fn best<'f>(
        &self,
        context: &str,
        fields: &'f ExtractedFieldSet,
        exclude: &HashSet<String>,
    ) -> Option<(&'f str, u32)> {
        let mut best: Option<(&'f str, u32)> = None;

        for (name, value) in fields.iter() {
            if exclude.contains(name) {
                continue;
            }
            let score = self.score(context, name, value);
            if score > best.map_or(0, |(_, s)| s) {
                best = Some((name.as_str(), score));
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_scorer<T>(f: impl FnOnce(&ContextScorer) -> T) -> T {
        let rules = RuleBook::builtin();
        let scorer = ContextScorer::new(&rules);
        f(&scorer)
    }

    #[test]
    fn test_pattern_and_token_components() {
        with_scorer(|scorer| {
            let value = FieldValue::from("1.70 x 10⁶");
            // rule +100, "molecular" +20, "weight" +20
            assert_eq!(scorer.score("Molecular weight", "molecular_weight", &value), 140);
            assert_eq!(scorer.score("Molecular weight", "batch_number", &"25042211".into()), 0);
            // alias key of the same rule
            assert_eq!(scorer.score("| M.W. | | ", "mw", &value), 100);
        });
    }

    #[test]
    fn test_value_type_components() {
        with_scorer(|scorer| {
            assert_eq!(scorer.score("Result: Negative", "flag", &FieldValue::Bool(true)), 15);
            assert_eq!(scorer.score("Result: positive", "flag", &FieldValue::Bool(true)), 0);
            assert_eq!(scorer.score("≤ 10 %", "reading", &FieldValue::from(8i64)), 10);
            assert_eq!(scorer.score("see below", "reading", &FieldValue::from(8i64)), 0);
            assert_eq!(scorer.score("Date of issue", "issued", &"2025-04-22".into()), 25);
            assert_eq!(scorer.score("Date of issue", "issued", &"22 April 2025".into()), 25);
            assert_eq!(scorer.score("Remarks", "issued", &"2025-04-22".into()), 0);
        });
    }

    #[test]
    fn test_short_tokens_do_not_count() {
        with_scorer(|scorer| {
            // "ph" is two characters, only the rule fires
            assert_eq!(scorer.score("pH", "ph", &"6.8".into()), 100);
            // "ph" inside another field name is not a key match
            assert_eq!(scorer.score("pH", "staphylococcus_aureus", &"Negative".into()), 0);
        });
    }

    #[test]
    fn test_plural_field_names_hit_their_rule() {
        with_scorer(|scorer| {
            let context = "| Protein | ≤0.1% | ";
            assert_eq!(scorer.score(context, "proteins", &"0.05%".into()), 100);
            // rule +100, "protein" +20
            assert_eq!(scorer.score(context, "protein", &"0.05%".into()), 120);

            let fields: ExtractedFieldSet = [("batch_number", "25042211"), ("proteins", "0.05%")]
                .into_iter()
                .collect();
            assert_eq!(scorer.best(context, &fields, &HashSet::new()), Some(("proteins", 100)));
        });
    }

    #[test]
    fn test_best_prefers_highest_then_first() {
        with_scorer(|scorer| {
            let fields: ExtractedFieldSet = [
                ("batch_number", "25042211"),
                ("molecular_weight", "1.70 x 10⁶"),
            ]
            .into_iter()
            .collect();
            let none = HashSet::new();
            assert_eq!(scorer.best("Molecular weight", &fields, &none), Some(("molecular_weight", 140)));
            assert_eq!(scorer.best("Remarks", &fields, &none), None);

            let tied: ExtractedFieldSet = [("first", "a"), ("second", "b")].into_iter().collect();
            assert_eq!(scorer.best("first second", &tied, &none), Some(("first", 20)));

            let mut used = HashSet::new();
            used.insert("molecular_weight".to_string());
            assert_eq!(scorer.best("Molecular weight", &fields, &used), None);
        });
    }
}
