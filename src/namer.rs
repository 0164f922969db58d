//! Turns located slots into snake_case field names.
//!
//! Naming is total: a strategy's own guess wins, then the label written
//! before the marker (a known row label in the same row beats a nearer
//! specification cell), then a known row label on the same line, then the
//! previous and next non-empty lines, and finally a synthetic `field_<n>`.

use regex::Regex;

use crate::rules::RuleBook;
use crate::semantic::PlaceholderSlot;
use crate::utility::{chars_back, chars_forward, spaced, to_snake_case};

/// Characters of surrounding text the namer may look at on either side.
pub const NAMING_WINDOW: usize = 200;

#[derive(Debug)]
pub struct PlaceholderNamer<'a> {
    rules: &'a RuleBook,
    delimiters: Regex,
    marker: Regex,
}

impl<'a> PlaceholderNamer<'a> {
    pub fn new(rules: &'a RuleBook) -> Self {
        Self {
            rules,
            // colon, pipe, tab or a run of spaces
            delimiters: Regex::new(r"[:|\t]| {2,}").unwrap(),
            marker: Regex::new(r"\{[ \t]*\}").unwrap(),
        }
    }

    /// Names every slot in place. Unnamed slots are numbered from 1 in
    /// document order.
    pub fn name_all(&self, text: &str, slots: &mut [PlaceholderSlot]) {
        let mut unnamed = 0;
        for slot in slots.iter_mut() {
            slot.name = match self.name_slot(text, slot) {
                Some(name) => name,
                None => {
                    unnamed += 1;
                    format!("field_{}", unnamed)
                }
            };
        }
    }

    /// The name for one slot, or `None` when only a synthetic name fits.
    pub fn name_slot(&self, text: &str, slot: &PlaceholderSlot) -> Option<String> {
        if let Some(candidate) = &slot.candidate_name {
            let cleaned = to_snake_case(candidate);
            if !cleaned.is_empty() {
                return Some(self.canonicalize(cleaned));
            }
        }

        let span = slot.span.as_ref()?;
        let window_start = chars_back(text, span.start, NAMING_WINDOW, 0);
        let window_end = chars_forward(text, span.end, NAMING_WINDOW, text.len());
        let before = &text[window_start..span.start];
        let after = &text[span.end..window_end];

        let (earlier_lines, line_prefix) = match before.rfind('\n') {
            Some(nl) => (&before[..nl], &before[nl + 1..]),
            None => ("", before),
        };

        if let Some(name) = self.direct_label(line_prefix) {
            return Some(name);
        }

        if let Some(name) = self.known_label(line_prefix) {
            return Some(name);
        }

        if let Some(line) = earlier_lines.lines().rev().find(|l| !l.trim().is_empty()) {
            if let Some(name) = self.segment_label(line, true) {
                return Some(name);
            }
        }

        let following = after.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
        if let Some(line) = following.lines().find(|l| !l.trim().is_empty()) {
            if let Some(name) = self.segment_label(line, false) {
                return Some(name);
            }
        }

        None
    }

    /// Label written immediately before the marker on its line, ignoring
    /// anything up to an earlier marker on the same line.
    fn direct_label(&self, line_prefix: &str) -> Option<String> {
        let own_part = self.marker.split(line_prefix).last().unwrap_or(line_prefix);
        self.segment_label(own_part, true)
    }

    /// First (or, with `from_end`, last) delimited segment that contains a
    /// letter. Bare specification cells such as `≤10%` are skipped, and a
    /// segment that is a whole catalog label wins over nearer free text.
    fn segment_label(&self, line: &str, from_end: bool) -> Option<String> {
        let mut candidates: Vec<String> = self
            .delimiters
            .split(line)
            .filter(|segment| segment.chars().any(char::is_alphabetic))
            .map(to_snake_case)
            .filter(|cleaned| !cleaned.is_empty())
            .collect();
        if from_end {
            candidates.reverse();
        }

        candidates
            .iter()
            .find_map(|cleaned| self.rules.canonical_for_label(&spaced(cleaned)))
            .map(str::to_string)
            .or_else(|| candidates.into_iter().next())
    }

    /// Nearest catalog row label in the line, by canonical name.
    fn known_label(&self, line_prefix: &str) -> Option<String> {
        self.rules
            .fields()
            .iter()
            .filter_map(|field| {
                field
                    .label
                    .find_iter(line_prefix)
                    .last()
                    .map(|m| (m.start(), field.name.as_str()))
            })
            .max_by_key(|(start, _)| *start)
            .map(|(_, name)| name.to_string())
    }

    fn canonicalize(&self, cleaned: String) -> String {
        match self.rules.canonical_for_label(&spaced(&cleaned)) {
            Some(canonical) => canonical.to_string(),
            None => cleaned,
        }
    }
}
