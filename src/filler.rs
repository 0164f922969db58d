//! Document-order substitution of matched values into a template.

use std::collections::HashSet;

use regex::Regex;

use crate::rules::RuleBook;
use crate::scorer::ContextScorer;
use crate::semantic::{
    ExtractedFieldSet, FieldValue, MatchPolicy, MatchResult, MatchSource, PlaceholderSlot, SlotOrigin,
    Template,
};

/// Shown in previews where no value was found.
pub const EMPTY_MARKER: &str = "[EMPTY]";
/// Written into rendered documents where no value was found.
pub const RENDER_EMPTY: &str = "\u{2014}";

pub const COMPLIES: &str = "Complies";
pub const NON_COMPLIANT: &str = "Non-compliant";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    #[default]
    Preview,
    Render,
}

/// How a `true`/`false` test result is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BooleanRendering {
    /// `Complies` / `Non-compliant`, or the field's own label pair.
    #[default]
    Label,
    /// A passing result is replaced by the specification printed on the
    /// slot's row, e.g. `≤10%`.
    NearestSpecification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FillOptions {
    pub policy: MatchPolicy,
    pub mode: RenderMode,
    pub booleans: BooleanRendering,
}

impl FillOptions {
    pub fn preview() -> Self {
        Self {
            policy: MatchPolicy::NonConsuming,
            mode: RenderMode::Preview,
            booleans: BooleanRendering::Label,
        }
    }

    pub fn render() -> Self {
        Self {
            mode: RenderMode::Render,
            ..Self::preview()
        }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_booleans(mut self, booleans: BooleanRendering) -> Self {
        self.booleans = booleans;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillOutcome {
    pub text: String,
    pub matches: Vec<MatchResult>,
}

impl FillOutcome {
    pub fn unmatched_slots(&self) -> impl Iterator<Item = &MatchResult> {
        self.matches.iter().filter(|m| m.field.is_none())
    }
}

#[derive(Debug)]
pub struct SequentialFiller<'a> {
    rules: &'a RuleBook,
    scorer: ContextScorer<'a>,
    cell_delimiters: Regex,
    specification: Regex,
}

impl<'a> SequentialFiller<'a> {
    pub fn new(rules: &'a RuleBook) -> Self {
        Self {
            rules,
            scorer: ContextScorer::new(rules),
            cell_delimiters: Regex::new(r"[|:\t]").unwrap(),
            specification: Regex::new(r"(?i)[0-9≤≥<>%]|negative|absent|not\s+detected").unwrap(),
        }
    }

    /// Picks a field for every slot, in document order.
    ///
    /// A field whose key equals the slot name is taken first; otherwise the
    /// scorer ranks the remaining fields against the slot context. Slots
    /// without any context fall back to document order, which always
    /// consumes. Catalog fallback slots only ever take their own field.
    pub fn match_slots(
        &self,
        slots: &[PlaceholderSlot],
        fields: &ExtractedFieldSet,
        policy: MatchPolicy,
    ) -> Vec<MatchResult> {
        let mut consumed: HashSet<String> = HashSet::new();
        let mut taken_in_order: HashSet<String> = HashSet::new();
        let mut results = Vec::with_capacity(slots.len());

        for slot in slots {
            let context = slot.local_context();

            let named = fields
                .get(&slot.name)
                .filter(|_| !consumed.contains(&slot.name));

            let result = if let Some(value) = named {
                MatchResult {
                    slot_index: slot.index,
                    field: Some(slot.name.clone()),
                    score: self.scorer.score(&context, &slot.name, value),
                    source: MatchSource::Named,
                }
            } else if slot.origin == SlotOrigin::Fallback {
                MatchResult::unmatched(slot.index)
            } else if slot.has_context() {
                match self.scorer.best(&context, fields, &consumed) {
                    Some((field, score)) => MatchResult {
                        slot_index: slot.index,
                        field: Some(field.to_string()),
                        score,
                        source: MatchSource::Scored,
                    },
                    None => MatchResult::unmatched(slot.index),
                }
            } else {
                let next = fields
                    .keys()
                    .find(|k| !consumed.contains(*k) && !taken_in_order.contains(*k))
                    .cloned();
                match next {
                    Some(field) => {
                        tracing::warn!(
                            slot = slot.index,
                            field = %field,
                            "no context for slot, filled in document order"
                        );
                        taken_in_order.insert(field.clone());
                        MatchResult {
                            slot_index: slot.index,
                            field: Some(field),
                            score: 0,
                            source: MatchSource::Positional,
                        }
                    }
                    None => MatchResult::unmatched(slot.index),
                }
            };

            if policy == MatchPolicy::Consuming {
                if let Some(field) = &result.field {
                    consumed.insert(field.clone());
                }
            }

            tracing::debug!(
                slot = slot.index,
                name = %slot.name,
                field = ?result.field,
                score = result.score,
                source = ?result.source,
                "slot matched"
            );
            results.push(result);
        }

        results
    }

    /// Substitutes every slot of `template`. Never fails: slots without a
    /// value get the empty marker of the chosen mode.
    pub fn fill(&self, template: &Template, fields: &ExtractedFieldSet, options: FillOptions) -> FillOutcome {
        let slots = template.slots();
        let matches = self.match_slots(slots, fields, options.policy);
        let content = template.content();

        let mut text = String::with_capacity(content.len());
        let mut appended = Vec::new();
        let mut cursor = 0;

        for (slot, result) in slots.iter().zip(&matches) {
            let value = result.field.as_deref().and_then(|f| fields.get(f));
            let rendered = self.format_value(slot, result.field.as_deref(), value, options);

            match &slot.span {
                Some(span) if span.start >= cursor => {
                    text.push_str(&content[cursor..span.start]);
                    if span.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(&rendered);
                    cursor = span.end;
                }
                Some(_) => {}
                None => appended.push((slot, rendered)),
            }
        }
        text.push_str(&content[cursor..]);

        if !appended.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            for (slot, rendered) in appended {
                let label = self
                    .rules
                    .field(&slot.name)
                    .map(|f| f.display_label.as_str())
                    .unwrap_or(slot.name.as_str());
                text.push_str(&format!("{}: {}\n", label, rendered));
            }
        }

        FillOutcome { text, matches }
    }

    /// The text written for one slot. Strings are never altered.
    pub fn format_value(
        &self,
        slot: &PlaceholderSlot,
        field: Option<&str>,
        value: Option<&FieldValue>,
        options: FillOptions,
    ) -> String {
        let empty = match options.mode {
            RenderMode::Preview => EMPTY_MARKER,
            RenderMode::Render => RENDER_EMPTY,
        };

        let Some(value) = value.filter(|v| !v.is_empty()) else {
            return empty.to_string();
        };

        match value {
            FieldValue::Null => empty.to_string(),
            FieldValue::Bool(flag) => self.format_bool(slot, field, *flag, options.booleans),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::String(s) => s.clone(),
        }
    }

    fn format_bool(&self, slot: &PlaceholderSlot, field: Option<&str>, flag: bool, style: BooleanRendering) -> String {
        if flag && style == BooleanRendering::NearestSpecification {
            if let Some(spec) = self.nearest_specification(slot) {
                return spec;
            }
        }

        let labels = field
            .and_then(|f| self.rules.field(f))
            .and_then(|f| f.boolean_labels.as_ref());
        match (labels, flag) {
            (Some((yes, _)), true) => yes.clone(),
            (Some((_, no)), false) => no.clone(),
            (None, true) => COMPLIES.to_string(),
            (None, false) => NON_COMPLIANT.to_string(),
        }
    }

    /// Closest cell on the slot's own line that reads like a specification.
    fn nearest_specification(&self, slot: &PlaceholderSlot) -> Option<String> {
        if slot.origin == SlotOrigin::Fallback {
            return None;
        }
        let line_before = slot
            .context_before
            .rsplit('\n')
            .next()
            .unwrap_or_default();
        let line_after = slot.context_after.split('\n').next().unwrap_or_default();

        let before: Vec<&str> = self.cell_delimiters.split(line_before).collect();
        let after: Vec<&str> = self.cell_delimiters.split(line_after).collect();

        // the first cell before the slot is usually the row label
        before
            .iter()
            .skip(1)
            .rev()
            .chain(after.iter())
            .map(|cell| cell.trim())
            .find(|cell| !cell.is_empty() && self.specification.is_match(cell))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::PlaceholderLocator;
    use crate::namer::PlaceholderNamer;
    use crate::utility::content_id;

    fn template(rules: &RuleBook, text: &str) -> Template {
        let mut slots = PlaceholderLocator::with_defaults(rules).locate(text);
        PlaceholderNamer::new(rules).name_all(text, &mut slots);
        Template::new(content_id(text), text.to_string(), slots)
    }

    #[test]
    fn test_named_fill() {
        let rules = RuleBook::builtin();
        let filler = SequentialFiller::new(&rules);
        let tpl = template(&rules, "Batch Number: {}\npH {}");
        let fields: ExtractedFieldSet = [("batch_number", "25042211"), ("ph", "6.8")].into_iter().collect();

        let out = filler.fill(&tpl, &fields, FillOptions::preview());
        assert_eq!(out.text, "Batch Number: 25042211\npH 6.8");
        assert!(out.matches.iter().all(|m| m.source == MatchSource::Named));
    }

    #[test]
    fn test_scored_fill_when_names_differ() {
        let rules = RuleBook::builtin();
        let filler = SequentialFiller::new(&rules);
        let tpl = template(&rules, "| Loss on drying | ≤10% | {} |\n| Heavy metals | ≤20 ppm | {} |");
        let fields: ExtractedFieldSet = [("lod", "4.1%"), ("heavy_metal", "<10 ppm")].into_iter().collect();

        let out = filler.fill(&tpl, &fields, FillOptions::render());
        assert_eq!(out.text, "| Loss on drying | ≤10% | 4.1% |\n| Heavy metals | ≤20 ppm | <10 ppm |");
        assert!(out.matches.iter().all(|m| m.source == MatchSource::Scored && m.score >= 100));
    }

    #[test]
    fn test_empty_markers_per_mode() {
        let rules = RuleBook::builtin();
        let filler = SequentialFiller::new(&rules);
        let tpl = template(&rules, "Remarks: {}\nBatch Number: {}");
        let fields: ExtractedFieldSet = [("batch_number", FieldValue::from("")), ("x", FieldValue::Null)]
            .into_iter()
            .collect();

        let preview = filler.fill(&tpl, &fields, FillOptions::preview());
        assert_eq!(preview.text, "Remarks: [EMPTY]\nBatch Number: [EMPTY]");
        assert_eq!(preview.unmatched_slots().count(), 1);

        let render = filler.fill(&tpl, &fields, FillOptions::render());
        assert_eq!(render.text, "Remarks: \u{2014}\nBatch Number: \u{2014}");
    }

    #[test]
    fn test_value_formatting() {
        let rules = RuleBook::builtin();
        let filler = SequentialFiller::new(&rules);
        let tpl = template(&rules, "| Loss on drying | ≤10% | {} |");
        let slot = &tpl.slots()[0];
        let opts = FillOptions::preview();

        let number: FieldValue = serde_json::from_str("95.50").unwrap();
        assert_eq!(filler.format_value(slot, Some("n"), Some(&number), opts), "95.5");
        assert_eq!(filler.format_value(slot, Some("n"), Some(&FieldValue::from(12i64)), opts), "12");
        assert_eq!(filler.format_value(slot, Some("b"), Some(&true.into()), opts), "Complies");
        assert_eq!(filler.format_value(slot, Some("b"), Some(&false.into()), opts), "Non-compliant");
        assert_eq!(
            filler.format_value(slot, Some("appearance"), Some(&false.into()), opts),
            "Not a white solid powder"
        );
        assert_eq!(filler.format_value(slot, None, None, opts), "[EMPTY]");

        let spec = opts.with_booleans(BooleanRendering::NearestSpecification);
        assert_eq!(filler.format_value(slot, Some("b"), Some(&true.into()), spec), "≤10%");
        assert_eq!(filler.format_value(slot, Some("b"), Some(&false.into()), spec), "Non-compliant");
    }

    #[test]
    fn test_nearest_specification_after_insertion_point() {
        let rules = RuleBook::builtin();
        let filler = SequentialFiller::new(&rules);
        let tpl = template(&rules, "| E. coli | Negative | |\n| pH | 5.0-8.5 | |");
        let fields: ExtractedFieldSet = [("escherichia_coli", FieldValue::Bool(true)), ("ph", "6.8".into())]
            .into_iter()
            .collect();
        let opts = FillOptions::preview().with_booleans(BooleanRendering::NearestSpecification);

        let out = filler.fill(&tpl, &fields, opts);
        assert_eq!(out.text, "| E. coli | Negative | Negative |\n| pH | 5.0-8.5 | 6.8 |");
    }

    #[test]
    fn test_rows_without_markers_fill_their_result_cell() {
        let rules = RuleBook::builtin();
        let filler = SequentialFiller::new(&rules);
        let tpl = template(&rules, "| pH | 5.0-8.5 | |\n| Protein | ≤0.1% | |");
        let fields: ExtractedFieldSet = [("ph", "6.8"), ("protein", "0.02%")].into_iter().collect();

        let out = filler.fill(&tpl, &fields, FillOptions::render());
        assert_eq!(out.text, "| pH | 5.0-8.5 | 6.8 |\n| Protein | ≤0.1% | 0.02% |");
    }

    #[test]
    fn test_strings_are_verbatim() {
        let rules = RuleBook::builtin();
        let filler = SequentialFiller::new(&rules);
        let tpl = template(&rules, "Molecular weight: {}\nContent: {}");
        let fields: ExtractedFieldSet = [
            ("molecular_weight", "1.70 x 10^6 Da"),
            ("sodium_hyaluronate_content", "≥ 95.0 %"),
        ]
        .into_iter()
        .collect();

        let out = filler.fill(&tpl, &fields, FillOptions::render());
        assert_eq!(out.text, "Molecular weight: 1.70 x 10^6 Da\nContent: ≥ 95.0 %");
    }

    #[test]
    fn test_consuming_policy_prevents_reuse() {
        let rules = RuleBook::builtin();
        let filler = SequentialFiller::new(&rules);
        let tpl = template(&rules, "Batch Number: {}\nBatch Number: {}");
        let fields: ExtractedFieldSet = [("batch_number", "25042211")].into_iter().collect();

        let shared = filler.fill(&tpl, &fields, FillOptions::preview());
        assert_eq!(shared.text, "Batch Number: 25042211\nBatch Number: 25042211");

        let consumed = filler.fill(&tpl, &fields, FillOptions::preview().with_policy(MatchPolicy::Consuming));
        assert_eq!(consumed.text, "Batch Number: 25042211\nBatch Number: [EMPTY]");
    }

    #[test]
    fn test_positional_fallback_without_context() {
        let rules = RuleBook::builtin();
        let filler = SequentialFiller::new(&rules);
        let tpl = template(&rules, "{}\n{}");
        let fields: ExtractedFieldSet = [("alpha", "1"), ("beta", "2")].into_iter().collect();

        let out = filler.fill(&tpl, &fields, FillOptions::preview());
        assert_eq!(out.text, "1\n2");
        assert!(out.matches.iter().all(|m| m.source == MatchSource::Positional));
    }

    #[test]
    fn test_fallback_slots_are_appended() {
        let rules = RuleBook::builtin();
        let filler = SequentialFiller::new(&rules);
        let tpl = template(&rules, "Certificate");
        let fields: ExtractedFieldSet = [("ph", "6.8")].into_iter().collect();

        let out = filler.fill(&tpl, &fields, FillOptions::render());
        assert!(out.text.starts_with("Certificate\nProduct name: \u{2014}\n"));
        assert!(out.text.contains("\npH: 6.8\n"));
        assert_eq!(out.matches.len(), 16);
    }
}
